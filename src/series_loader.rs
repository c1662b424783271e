use std::{fs, path::Path, sync::Arc};

use dicom::object::{DefaultDicomObject, open_file};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::CodecRegistry;
use crate::config::SeriesOptions;
use crate::record::{RecordError, SliceRecord};
use crate::series::{Series, SeriesError};

#[derive(Debug, Error)]
pub enum SeriesLoaderError {
    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Invalid image: {0}")]
    Record(#[from] RecordError),

    #[error("Series error: {0}")]
    Series(#[from] SeriesError),
}

pub struct SeriesLoader;

impl SeriesLoader {
    /// Group DICOM objects into series and build each of them.
    ///
    /// Objects that cannot be turned into a slice record are skipped. The
    /// others are kept by their records for pixel decoding.
    ///
    /// # Errors
    ///
    /// Returns error if no object yields a valid record
    pub fn load_from_dicom_objects(
        dicom_objects: impl IntoIterator<Item = DefaultDicomObject>,
        options: &SeriesOptions,
    ) -> Result<Vec<Series>, SeriesLoaderError> {
        let mut first_error = None;
        let records: Vec<_> = dicom_objects
            .into_iter()
            .filter_map(|dicom_object| match SliceRecord::from_dicom_object(Arc::new(dicom_object)) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping image: {e}");
                    first_error.get_or_insert(e);
                    None
                }
            })
            .collect();

        if records.is_empty() {
            return Err(first_error.map_or(SeriesLoaderError::NoValidImages, Into::into));
        }

        Self::group_records(records, options, Arc::new(CodecRegistry::new()))
    }

    /// Load series from file paths, reading files in parallel.
    pub fn load_from_file_paths(
        paths: &[impl AsRef<Path> + Sync],
        options: &SeriesOptions,
    ) -> Result<Vec<Series>, SeriesLoaderError> {
        let objects: Result<Vec<_>, _> = paths
            .par_iter()
            .map(|path| open_file(path.as_ref()))
            .collect();

        Self::load_from_dicom_objects(objects?, options)
    }

    /// Load series from a directory containing .dcm files
    pub fn load_from_directory(
        path: impl AsRef<Path>,
        options: &SeriesOptions,
    ) -> Result<Vec<Series>, SeriesLoaderError> {
        let paths: Vec<_> = fs::read_dir(path.as_ref())?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
            })
            .collect();

        if paths.is_empty() {
            return Err(SeriesLoaderError::NoValidImages);
        }
        debug!(files = paths.len(), dir = %path.as_ref().display(), "Reading DICOM files");

        Self::load_from_file_paths(&paths, options)
    }

    /// Split records into series by series id, in order of first
    /// appearance, and build every series.
    pub fn group_records(
        records: impl IntoIterator<Item = SliceRecord>,
        options: &SeriesOptions,
        registry: Arc<CodecRegistry>,
    ) -> Result<Vec<Series>, SeriesLoaderError> {
        let mut series_list: Vec<Series> = Vec::new();
        for record in records {
            match series_list
                .iter_mut()
                .find(|series| series.matches_series(&record))
            {
                Some(series) => series.add_image(record),
                None => {
                    let mut series = Series::new()
                        .with_options(options.clone())
                        .with_registry(Arc::clone(&registry));
                    series.add_image(record);
                    series_list.push(series);
                }
            }
        }

        for series in &mut series_list {
            series.build_series()?;
        }
        info!(series = series_list.len(), "Loaded series");
        Ok(series_list)
    }
}
