//! Series shape classification.
//!
//! DICOM has several inconsistent ways of saying "this is a 3D/4D data set":
//! mosaics, multi-frame instances with or without frame times, a single
//! multi-frame volume, or many single-frame instances stacked at the same
//! location. [`classify`] applies one fixed priority order to decide which
//! one a record list is.

use tracing::debug;

use crate::record::SliceRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub is_mosaic: bool,
    pub is_elscint: bool,
    pub is_compressed: bool,
    pub is_multi_frame: bool,
    pub is_multi_frame_volume: bool,
    pub is_multi_frame_timeseries: bool,
    pub is_implicit_timeseries: bool,
    /// Logical slice or time point count.
    pub number_of_frames: u32,
    /// Frames physically decodable from one record.
    pub number_of_frames_in_file: u32,
}

/// Classify records that all belong to one series. Returns `None` for an
/// empty list.
pub fn classify(records: &[SliceRecord]) -> Option<Classification> {
    let first = records.first()?;

    let mut c = Classification {
        is_mosaic: first.is_mosaic(),
        is_elscint: first.is_elscint(),
        is_compressed: first.is_compressed(),
        number_of_frames: first.number_of_frames,
        number_of_frames_in_file: first.implicit_frame_count(),
        ..Default::default()
    };

    c.is_multi_frame = c.number_of_frames > 1
        || (c.is_mosaic && first.mosaic_rows * first.mosaic_cols > 1);

    if c.is_multi_frame {
        if c.is_mosaic || first.frame_time() > 0.0 {
            c.is_multi_frame_timeseries = true;
        } else if c.number_of_frames > 1 && records.len() == 1 {
            // one instance holding a whole volume, e.g. RT dose
            c.is_multi_frame_volume = true;
        } else {
            c.is_multi_frame_timeseries = true;
        }
    } else {
        c.number_of_frames = records.len() as u32;
    }

    // many single frames sharing one location are time points; without a
    // position every record shares the empty signature
    let widened = !c.is_multi_frame && first.image_position.is_some();
    if !c.is_mosaic && (c.number_of_frames <= 1 || widened) {
        let signature = first.position_signature();
        let same_location = records
            .iter()
            .filter(|record| record.position_signature() == signature)
            .count() as u32;
        if same_location > 1 {
            c.is_implicit_timeseries = true;
            c.number_of_frames = same_location;
        }
    }

    debug!(
        records = records.len(),
        frames = c.number_of_frames,
        frames_in_file = c.number_of_frames_in_file,
        mosaic = c.is_mosaic,
        multi_frame = c.is_multi_frame,
        volume = c.is_multi_frame_volume,
        timeseries = c.is_multi_frame_timeseries,
        implicit_timeseries = c.is_implicit_timeseries,
        "Classified series"
    );
    Some(c)
}

impl Classification {
    /// Distinct spatial positions per time point.
    pub fn slices_per_frame(&self, record_count: usize) -> usize {
        if self.is_implicit_timeseries && self.number_of_frames > 0 {
            record_count / self.number_of_frames as usize
        } else {
            self.number_of_frames as usize
        }
    }
}
