//! Frame assembly: order, caching, single flight and failures.

use std::sync::Arc;

use nalgebra::Vector4;

use dicom_series::codec::DecodeError;
use dicom_series::config::SeriesOptions;
use dicom_series::record::SliceRecord;
use dicom_series::series::SeriesError;

use super::test_utils::{
    CountingDecoder, mock_slice_at, native_record, placed, registry_with, series_of, slice_at,
};

#[tokio::test]
async fn test_native_frames_concatenate_in_final_order() {
    let mut series = series_of([slice_at(2.0, 30), slice_at(0.0, 10), slice_at(1.0, 20)]);
    series.build_series().unwrap();

    let frames = series.goc_frames().await.unwrap();
    assert_eq!(frames.dim(), (3, 2, 2));
    assert_eq!(frames.frame_no, -1);
    assert!(frames.visible);

    let expected: Vec<u8> = [10u8, 20, 30].iter().flat_map(|&v| [v; 4]).collect();
    assert_eq!(&frames.pixel_data[..], &expected[..]);
}

#[tokio::test]
async fn test_order_survives_decode_latency() {
    let decoder = CountingDecoder::new().with_reverse_latency(20);
    let mut series = series_of((1..=5).map(|i| mock_slice_at(i as f64, i)))
        .with_registry(registry_with(decoder.clone()));
    series.build_series().unwrap();

    let frames = series.goc_frames().await.unwrap();
    let firsts: Vec<u8> = frames.pixel_data.chunks(4).map(|frame| frame[0]).collect();
    assert_eq!(firsts, vec![1, 2, 3, 4, 5]);
    assert_eq!(decoder.calls(), 5);
}

#[tokio::test]
async fn test_goc_frames_returns_cached_result() {
    let decoder = CountingDecoder::new();
    let mut series = series_of((1..=4).map(|i| mock_slice_at(i as f64, i)))
        .with_registry(registry_with(decoder.clone()));
    series.build_series().unwrap();

    let first = series.goc_frames().await.unwrap();
    let second = series.goc_frames().await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(decoder.calls(), 4);
}

#[tokio::test]
async fn test_concurrent_goc_frames_share_one_assembly() {
    let decoder = CountingDecoder::new().with_reverse_latency(10);
    let mut series = series_of((1..=3).map(|i| mock_slice_at(i as f64, i)))
        .with_registry(registry_with(decoder.clone()));
    series.build_series().unwrap();

    let (a, b, c) = tokio::join!(series.goc_frames(), series.goc_frames(), series.goc_frames());
    let (a, b, c) = (a.unwrap(), b.unwrap(), c.unwrap());

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&b, &c));
    assert_eq!(decoder.calls(), 3);
}

#[tokio::test]
async fn test_get_frames_reassembles() {
    let decoder = CountingDecoder::new();
    let mut series = series_of((1..=2).map(|i| mock_slice_at(i as f64, i)))
        .with_registry(registry_with(decoder.clone()));
    series.build_series().unwrap();

    let cached = series.goc_frames().await.unwrap();
    let rebuilt = series.get_frames().await.unwrap();

    assert!(!Arc::ptr_eq(&cached, &rebuilt));
    assert_eq!(cached.pixel_data, rebuilt.pixel_data);
    assert_eq!(decoder.calls(), 4);
}

#[tokio::test]
async fn test_decode_failure_aborts_assembly() {
    let decoder = CountingDecoder::new().failing_on(2);
    let mut series = series_of((1..=3).map(|i| mock_slice_at(i as f64, i)))
        .with_registry(registry_with(decoder.clone()));
    series.build_series().unwrap();

    let err = series.goc_frames().await.unwrap_err();
    assert!(matches!(err, SeriesError::Decode(DecodeError::External(_))));
    assert!(err.to_string().contains("instance 2"));

    // nothing was cached, so the next call decodes again
    let calls = decoder.calls();
    assert!(series.goc_frames().await.is_err());
    assert!(decoder.calls() > calls);
}

#[tokio::test]
async fn test_unknown_transfer_syntax_fails() {
    let mut series = series_of([mock_slice_at(0.0, 1)]);
    series.build_series().unwrap();

    let err = series.goc_frames().await.unwrap_err();
    assert!(matches!(
        err,
        SeriesError::Decode(DecodeError::UnsupportedTransferSyntax(_))
    ));
}

#[tokio::test]
async fn test_unbuilt_series_has_no_frames() {
    let series = series_of([slice_at(0.0, 1)]);
    assert!(matches!(series.goc_frames().await, Err(SeriesError::NotBuilt)));
}

#[tokio::test]
async fn test_mosaic_tiles_become_frames() {
    // 4x4 mosaic of four 2x2 tiles, sample value = tile index
    #[rustfmt::skip]
    let pixels = vec![
        0, 0, 1, 1,
        0, 0, 1, 1,
        2, 2, 3, 3,
        2, 2, 3, 3,
    ];
    let record = SliceRecord {
        image_type: vec!["ORIGINAL".into(), "PRIMARY".into(), "M".into(), "MOSAIC".into()],
        mosaic_rows: 2,
        mosaic_cols: 2,
        ..placed(native_record(4, 4, 1, pixels), 0.0, 1)
    };
    let mut series = series_of([record]);
    series.build_series().unwrap();
    assert!(series.is_mosaic());
    assert!(series.slice_sense());

    let frames = series.goc_frames().await.unwrap();
    assert_eq!(frames.dim(), (4, 2, 2));
    assert_eq!(
        &frames.pixel_data[..],
        &[0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]
    );
    // mosaics have no placement
    assert!(!frames.transform.is_available());
}

#[tokio::test]
async fn test_multi_frame_volume_decodes_once() {
    let pixels = [7u8, 8, 9].iter().flat_map(|&v| [v; 4]).collect();
    let record = SliceRecord {
        slice_location_vector: Some(vec![0.0, 2.0, 4.0]),
        ..placed(native_record(2, 2, 3, pixels), 10.0, 1)
    };
    let mut series = series_of([record]).with_options(SeriesOptions::default());
    series.build_series().unwrap();
    assert!(series.is_multi_frame_volume());

    let frames = series.goc_frames().await.unwrap();
    assert_eq!(frames.dim(), (3, 2, 2));
    assert_eq!(frames.pixel_data.len(), 12);
    assert_eq!(frames.pixel_data[8], 9);

    let m = frames.mat4_pix_to_pat;
    assert_eq!(m.column(2).into_owned(), Vector4::new(0.0, 0.0, 2.0, 0.0));
    assert_eq!(m.column(3).into_owned(), Vector4::new(0.0, 0.0, 10.0, 1.0));

    let array = frames.to_ndarray::<u8>().unwrap();
    assert_eq!(array[[1, 1, 1, 0]], 8);
}

#[tokio::test]
async fn test_explicit_spacing_is_carried_on_frames() {
    let mut series = series_of([slice_at(0.0, 1), slice_at(1.0, 2)]);
    series
        .build_series_with(
            SeriesOptions::default()
                .with_explicit_ordering(true)
                .with_explicit_spacing(3.0),
        )
        .unwrap();

    let frames = series.goc_frames().await.unwrap();
    assert_eq!(frames.slice_spacing_hint, Some(3.0));
    let patient = frames.pixel_to_patient(nalgebra::Vector3::new(1.0, 1.0, 1.0));
    assert_eq!(patient, nalgebra::Vector3::new(1.0, 1.0, 3.0));
}

#[tokio::test]
async fn test_decoded_samples_stay_on_records() {
    let mut series = series_of([slice_at(1.0, 4), slice_at(0.0, 3)]);
    series.build_series().unwrap();
    assert!(series.images().iter().all(|r| r.source.as_ref().unwrap().decoded().is_none()));

    let cached = series.goc_frames().await.unwrap();
    for record in series.images() {
        let decoded = record.source.as_ref().unwrap().decoded().unwrap();
        assert_eq!(&decoded[..], &[record.instance_number.unwrap() as u8; 4]);
    }

    let rebuilt = series.get_frames().await.unwrap();
    assert_eq!(cached.pixel_data, rebuilt.pixel_data);
    assert_eq!(&rebuilt.pixel_data[..], &[3, 3, 3, 3, 4, 4, 4, 4]);
}
