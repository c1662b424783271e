//! Pixel to patient placement of an ordered series.
//!
//! The affine maps `(column, row, frame, 1)` to patient coordinates
//! `(x, y, z, 1)`: x grows to the patient's left, y to posterior and z to
//! the head.

use nalgebra::{Matrix4, Vector3};
use tracing::{debug, warn};

use crate::classify::Classification;
use crate::config::SeriesOptions;
use crate::record::SliceRecord;

/// Why no placement could be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformUnavailable {
    /// The first record has no image orientation.
    MissingOrientation,
    /// Multi-frame layouts other than a single-instance volume.
    UnsupportedLayout,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelTransform {
    Affine(Matrix4<f64>),
    Unavailable(TransformUnavailable),
}

impl PixelTransform {
    /// Matrix form for consumers that always need one: identity when the
    /// orientation is missing, all zeros for unsupported layouts.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        match self {
            PixelTransform::Affine(m) => *m,
            PixelTransform::Unavailable(TransformUnavailable::MissingOrientation) => {
                Matrix4::identity()
            }
            PixelTransform::Unavailable(TransformUnavailable::UnsupportedLayout) => {
                Matrix4::zeros()
            }
        }
    }

    pub fn affine(&self) -> Option<&Matrix4<f64>> {
        match self {
            PixelTransform::Affine(m) => Some(m),
            PixelTransform::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, PixelTransform::Affine(_))
    }
}

/// Build the placement of `records`, already in final order.
///
/// The slice step spans the first record to the last slice of the stack.
/// For an implicit timeseries only the first time point is measured: its
/// `records.len() / number_of_frames` slices, from `records[0]` to
/// `records[slices - 1]`. A single slice per time point steps by the slice
/// thickness along the normal.
pub fn build_pixel_to_patient(
    records: &[&SliceRecord],
    classification: &Classification,
    options: &SeriesOptions,
) -> PixelTransform {
    let Some(first) = records.first() else {
        return PixelTransform::Unavailable(TransformUnavailable::MissingOrientation);
    };
    let origin = first.position().unwrap_or_else(Vector3::zeros);

    // far corner of the stack and the number of slices between both ends
    let (last, slices) = if classification.is_multi_frame_volume {
        let z_max = first
            .frames_position_z_range()
            .map_or(origin.z, |(_, hi)| hi);
        (
            Vector3::new(origin.x, origin.y, z_max),
            classification.number_of_frames as usize,
        )
    } else if !classification.is_multi_frame {
        let slices = classification
            .slices_per_frame(records.len())
            .clamp(1, records.len());
        let last = records[slices - 1].position().unwrap_or_else(Vector3::zeros);
        (last, slices)
    } else {
        warn!(
            mosaic = classification.is_mosaic,
            timeseries = classification.is_multi_frame_timeseries,
            "No pixel to patient transform for this multi-frame layout"
        );
        return PixelTransform::Unavailable(TransformUnavailable::UnsupportedLayout);
    };

    let (Some(row_dir), Some(col_dir)) = (first.row_direction(), first.column_direction()) else {
        debug!("Image orientation missing, no pixel to patient transform");
        return PixelTransform::Unavailable(TransformUnavailable::MissingOrientation);
    };
    let spacing = first.pixel_spacing.unwrap_or([1.0, 1.0]);
    let normal = row_dir
        .cross(&col_dir)
        .try_normalize(f64::EPSILON)
        .unwrap_or_else(Vector3::zeros);

    let step = match options.spacing_hint() {
        Some(spacing) if options.explicit_ordering => normal * spacing,
        _ if slices <= 1 => normal * first.slice_thickness.unwrap_or(1.0),
        _ => (last - origin) / (slices - 1) as f64,
    };

    let mut m = Matrix4::zeros();
    m.fixed_view_mut::<3, 1>(0, 0).copy_from(&(row_dir * spacing[0]));
    m.fixed_view_mut::<3, 1>(0, 1).copy_from(&(col_dir * spacing[1]));
    m.fixed_view_mut::<3, 1>(0, 2).copy_from(&step);
    m.fixed_view_mut::<3, 1>(0, 3).copy_from(&origin);
    m[(3, 3)] = 1.0;
    PixelTransform::Affine(m)
}
