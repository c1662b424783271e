//! Classification, ordering and placement of built series.

use nalgebra::Vector4;

use dicom_series::config::SeriesOptions;
use dicom_series::enums::SliceDirection;
use dicom_series::geometry::{PixelTransform, TransformUnavailable};
use dicom_series::record::SliceRecord;
use dicom_series::series::{Series, SeriesError};

use super::test_utils::{CORONAL, series_of, slice_at, z_sequence};

#[test]
fn test_axial_slices_sorted_ascending_with_positive_sense() {
    let mut series = series_of([slice_at(10.0, 1), slice_at(0.0, 2), slice_at(5.0, 3)]);
    series.build_series().unwrap();

    assert_eq!(z_sequence(&series), vec![0.0, 5.0, 10.0]);
    assert_eq!(series.slice_dir(), SliceDirection::Axial);
    assert!(series.slice_sense());
    assert!(!series.is_multi_frame());
    assert_eq!(series.number_of_frames(), 3);
}

#[test]
fn test_coronal_slices_have_negative_sense() {
    let coronal = |y: f64, instance: i32| SliceRecord {
        image_position: Some([0.0, y, 0.0]),
        image_orientation: Some(CORONAL),
        ..slice_at(0.0, instance)
    };
    let mut series = series_of([coronal(10.0, 1), coronal(0.0, 2), coronal(5.0, 3)]);
    series.build_series().unwrap();

    assert_eq!(series.slice_dir(), SliceDirection::Coronal);
    let y: Vec<_> = series
        .images()
        .iter()
        .filter_map(|r| r.image_position.map(|p| p[1]))
        .collect();
    assert_eq!(y, vec![0.0, 5.0, 10.0]);
    assert!(!series.slice_sense());
}

#[test]
fn test_get_order_maps_insertion_order_to_final_positions() {
    let zs = [3.0, -1.0, 7.0, 0.5, 2.0];
    let mut series = series_of(
        zs.iter()
            .enumerate()
            .map(|(i, &z)| slice_at(z, i as i32 + 1)),
    );
    series.build_series().unwrap();

    let order = series.get_order();
    let images = series.images();
    for (original, position) in order.iter().enumerate() {
        let position = position.expect("every record keeps a position");
        assert_eq!(images[position].instance_number, Some(original as i32 + 1));
        assert_eq!(images[position].index, Some(position));
    }
}

#[test]
fn test_identical_positions_form_implicit_timeseries() {
    let mut series = series_of((1..=8).map(|i| slice_at(5.0, i)));
    series.build_series().unwrap();

    assert!(series.is_implicit_timeseries());
    assert_eq!(series.number_of_frames(), 8);
    assert_eq!(series.images().len(), 8);
    assert!(series.get_order().iter().all(Option::is_some));
}

#[test]
fn test_repeated_slab_orders_time_major() {
    // two time points over three slices, acquired in shuffled order
    let records = [
        (2.0, 1),
        (0.0, 2),
        (1.0, 3),
        (0.0, 4),
        (2.0, 5),
        (1.0, 6),
    ];
    let mut series = series_of(records.iter().map(|&(z, i)| slice_at(z, i)));
    series.build_series().unwrap();

    assert!(series.is_implicit_timeseries());
    assert_eq!(series.number_of_frames(), 2);
    assert_eq!(z_sequence(&series), vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0]);
    let instances: Vec<_> = series
        .images()
        .iter()
        .map(|r| r.instance_number)
        .collect();
    assert_eq!(
        instances,
        vec![Some(2), Some(3), Some(1), Some(4), Some(6), Some(5)]
    );
}

#[test]
fn test_ordering_is_deterministic() {
    let forward: Vec<_> = (0..6).map(|i| slice_at(i as f64 * 1.5, i)).collect();
    let mut backward = forward.clone();
    backward.reverse();

    let mut a = series_of(forward.clone());
    let mut b = series_of(backward);
    let mut c = series_of(forward);
    a.build_series().unwrap();
    b.build_series().unwrap();
    c.build_series().unwrap();

    assert_eq!(z_sequence(&a), z_sequence(&b));
    assert_eq!(a.get_order(), c.get_order());

    // rebuilding yields the same sequence
    a.build_series().unwrap();
    assert_eq!(a.get_order(), c.get_order());
}

#[test]
fn test_explicit_ordering_keeps_insertion_order() {
    let mut series = series_of([slice_at(10.0, 1), slice_at(0.0, 2), slice_at(5.0, 3)])
        .with_options(
            SeriesOptions::default()
                .with_explicit_ordering(true)
                .with_explicit_spacing(2.5),
        );
    series.build_series().unwrap();

    assert_eq!(z_sequence(&series), vec![10.0, 0.0, 5.0]);
    assert!(!series.slice_sense());

    let m = series.get_mat4_pix_to_pat().unwrap().to_matrix();
    assert_eq!(m.column(2).into_owned(), Vector4::new(0.0, 0.0, 2.5, 0.0));
}

#[test]
fn test_duplicate_sort_keys_collapse_to_latest() {
    let timed = |z: f64, instance: i32| SliceRecord {
        temporal_position: Some(1),
        temporal_number: Some(2),
        ..slice_at(z, instance)
    };
    let mut series = series_of([timed(1.0, 1), timed(1.0, 2), timed(2.0, 3)]);
    series.build_series().unwrap();

    assert_eq!(series.get_order(), vec![None, Some(0), Some(1)]);
    let instances: Vec<_> = series
        .images()
        .iter()
        .map(|r| r.instance_number)
        .collect();
    assert_eq!(instances, vec![Some(2), Some(3)]);
    assert_eq!(series.images_original_order().len(), 3);
}

#[test]
fn test_single_slice_transform_steps_by_thickness() {
    let record = SliceRecord {
        slice_thickness: Some(2.0),
        image_position: Some([-5.0, 3.0, 7.0]),
        ..slice_at(0.0, 1)
    };
    let mut series = series_of([record]);
    series.build_series().unwrap();

    let PixelTransform::Affine(m) = series.get_mat4_pix_to_pat().unwrap() else {
        panic!("axial slice should have a transform");
    };
    assert_eq!(m.column(0).into_owned(), Vector4::new(1.0, 0.0, 0.0, 0.0));
    assert_eq!(m.column(1).into_owned(), Vector4::new(0.0, 1.0, 0.0, 0.0));
    assert_eq!(m.column(2).into_owned(), Vector4::new(0.0, 0.0, 2.0, 0.0));
    assert_eq!(m.column(3).into_owned(), Vector4::new(-5.0, 3.0, 7.0, 1.0));
}

#[test]
fn test_stack_transform_spans_first_to_last_slice() {
    let mut series = series_of([slice_at(8.0, 1), slice_at(0.0, 2), slice_at(4.0, 3)]);
    series.build_series().unwrap();

    let m = series.get_mat4_pix_to_pat().unwrap().to_matrix();
    assert_eq!(m.column(2).into_owned(), Vector4::new(0.0, 0.0, 4.0, 0.0));
    assert_eq!(m.column(3).into_owned(), Vector4::new(0.0, 0.0, 0.0, 1.0));
}

#[test]
fn test_missing_orientation_has_no_transform() {
    let unoriented = SliceRecord {
        image_orientation: None,
        ..slice_at(0.0, 1)
    };
    let mut series = series_of([unoriented]);
    series.build_series().unwrap();

    let transform = series.get_mat4_pix_to_pat().unwrap();
    assert_eq!(
        transform,
        PixelTransform::Unavailable(TransformUnavailable::MissingOrientation)
    );
    assert_eq!(series.slice_dir(), SliceDirection::Unknown);
}

#[test]
fn test_unbuilt_series_refuses_transform() {
    let series = series_of([slice_at(0.0, 1)]);
    assert!(matches!(series.get_mat4_pix_to_pat(), Err(SeriesError::NotBuilt)));
    assert!(matches!(Series::new().build_series(), Err(SeriesError::Empty)));
}
