//! A series of slice records and the volume built from them.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::classify::{Classification, classify};
use crate::codec::{CodecRegistry, DecodeError};
use crate::config::SeriesOptions;
use crate::enums::SliceDirection;
use crate::frame_set::AssembledFrameSet;
use crate::geometry::{PixelTransform, build_pixel_to_patient};
use crate::ordering::{order_records, resolve_slice_sense};
use crate::record::SliceRecord;

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("Series holds no records")]
    Empty,

    #[error("Series must be built before use")]
    NotBuilt,

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Records sharing one series id.
///
/// Records are kept in the order they were added. [`Series::build_series`]
/// classifies them and computes the final slice/time sequence; frames are
/// decoded on first request and cached until invalidated.
#[derive(Debug, Default)]
pub struct Series {
    records: Vec<SliceRecord>,
    /// Indices into `records`, in final order.
    order: Vec<usize>,
    classification: Classification,
    slice_dir: SliceDirection,
    slice_sense: bool,
    built: bool,
    options: SeriesOptions,
    registry: Arc<CodecRegistry>,
    frames: OnceCell<Arc<AssembledFrameSet>>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: SeriesOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_registry(mut self, registry: Arc<CodecRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn add_image(&mut self, record: SliceRecord) {
        self.records.push(record);
        self.built = false;
        self.invalidate_frames();
    }

    /// Whether `record` belongs here. An empty series accepts any record.
    pub fn matches_series(&self, record: &SliceRecord) -> bool {
        self.records
            .first()
            .is_none_or(|first| first.series_id == record.series_id)
    }

    /// Classify and order the records with the options of this series.
    pub fn build_series(&mut self) -> Result<(), SeriesError> {
        let first = self.records.first().ok_or(SeriesError::Empty)?;
        let classification = classify(&self.records).ok_or(SeriesError::Empty)?;
        let slice_dir = first.acquired_slice_direction();

        let order = if self.options.explicit_ordering {
            (0..self.records.len()).collect()
        } else {
            order_records(&self.records, classification.number_of_frames, slice_dir)
        };

        let (Some(&head), Some(&tail)) = (order.first(), order.last()) else {
            return Err(SeriesError::Empty);
        };
        self.slice_sense = resolve_slice_sense(
            &self.records[head],
            &self.records[tail],
            &classification,
            slice_dir,
            self.options.explicit_ordering,
        );

        for record in &mut self.records {
            record.index = None;
        }
        for (position, &i) in order.iter().enumerate() {
            self.records[i].index = Some(position);
        }

        info!(
            series = %self,
            records = self.records.len(),
            ordered = order.len(),
            direction = ?slice_dir,
            sense = self.slice_sense,
            "Built series"
        );

        self.order = order;
        self.classification = classification;
        self.slice_dir = slice_dir;
        self.built = true;
        self.invalidate_frames();
        Ok(())
    }

    /// Replace the options, then build.
    pub fn build_series_with(&mut self, options: SeriesOptions) -> Result<(), SeriesError> {
        self.options = options;
        self.build_series()
    }

    /// Records in final order. Records collapsed by the ordering are left out.
    pub fn images(&self) -> Vec<&SliceRecord> {
        self.order.iter().map(|&i| &self.records[i]).collect()
    }

    pub fn images_original_order(&self) -> &[SliceRecord] {
        &self.records
    }

    /// Final position of every record, in the order records were added.
    pub fn get_order(&self) -> Vec<Option<usize>> {
        self.records.iter().map(|record| record.index).collect()
    }

    /// Series description, else the series instance UID.
    pub fn name(&self) -> Option<&str> {
        let first = self.records.first()?;
        first
            .series_description
            .as_deref()
            .or(first.series_instance_uid.as_deref())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn options(&self) -> &SeriesOptions {
        &self.options
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn slice_dir(&self) -> SliceDirection {
        self.slice_dir
    }

    /// Whether physical position increases along the final sequence.
    pub fn slice_sense(&self) -> bool {
        self.slice_sense
    }

    pub fn number_of_frames(&self) -> u32 {
        self.classification.number_of_frames
    }

    pub fn is_mosaic(&self) -> bool {
        self.classification.is_mosaic
    }

    pub fn is_multi_frame(&self) -> bool {
        self.classification.is_multi_frame
    }

    pub fn is_multi_frame_volume(&self) -> bool {
        self.classification.is_multi_frame_volume
    }

    pub fn is_multi_frame_timeseries(&self) -> bool {
        self.classification.is_multi_frame_timeseries
    }

    pub fn is_implicit_timeseries(&self) -> bool {
        self.classification.is_implicit_timeseries
    }

    pub fn get_mat4_pix_to_pat(&self) -> Result<PixelTransform, SeriesError> {
        if !self.built {
            return Err(SeriesError::NotBuilt);
        }
        Ok(build_pixel_to_patient(
            &self.images(),
            &self.classification,
            &self.options,
        ))
    }

    /// Decoded frames, assembled on the first call and shared afterwards.
    /// Concurrent first calls wait on one assembly.
    pub async fn goc_frames(&self) -> Result<Arc<AssembledFrameSet>, SeriesError> {
        if !self.built {
            return Err(SeriesError::NotBuilt);
        }
        let frames = self
            .frames
            .get_or_try_init(|| async {
                let images = self.images();
                let transform =
                    build_pixel_to_patient(&images, &self.classification, &self.options);
                let mut frames = AssembledFrameSet::assemble(
                    &images,
                    &self.classification,
                    &self.registry,
                    transform,
                )
                .await?;
                frames.slice_spacing_hint = self.options.spacing_hint();
                Ok::<_, SeriesError>(Arc::new(frames))
            })
            .await?;
        Ok(Arc::clone(frames))
    }

    /// Drop cached frames and assemble them again.
    pub async fn get_frames(&mut self) -> Result<Arc<AssembledFrameSet>, SeriesError> {
        self.invalidate_frames();
        self.goc_frames().await
    }

    pub fn invalidate_frames(&mut self) {
        self.frames.take();
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self
            .records
            .first()
            .map_or("", |first| first.series_id.as_str());
        f.write_str(id)
    }
}
