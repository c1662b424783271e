//! # DICOM-series library
//!
//! This crate turns an unordered collection of DICOM instances into a
//! spatially and temporally coherent 3D/4D volume: one contiguous buffer of
//! decoded pixels plus the affine placing it in patient space.
//!
//! It builds on the dicom-rs ecosystem. Instances can be loaded from
//! multiple [`FileDicomObject<InMemDicomObject>`] or from a folder where
//! each ".dcm" file is read from (in parallel using rayon).
//!
//! Building a [`Series`] classifies its records as one of
//!  - a plain spatial stack
//!  - a Siemens mosaic (tiles of one frame are slices)
//!  - a single multi-frame volume
//!  - a multi-frame timeseries
//!  - an implicit timeseries (single frames repeating the same locations)
//!
//! and orders them by time point, then by position along the acquired
//! slice direction (Axial, Coronal or Sagittal). Frames are decoded
//! concurrently by dicom-rs, or by a codec registered for the transfer
//! syntax, and concatenated in series order. The result is cached per
//! series.
//!
//! # Examples
//!
//! ## Assembling every series of a directory
//!
//! ```no_run
//! # use dicom_series::{SeriesLoader, SeriesOptions};
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let series_list = SeriesLoader::load_from_directory("dicom", &SeriesOptions::default())?;
//! for series in &series_list {
//!     let frames = series.goc_frames().await?;
//!     println!("{}: {:?} frames", series.name().unwrap_or("unnamed"), frames.dim());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`FileDicomObject<InMemDicomObject>`]: https://docs.rs/dicom-object/latest/dicom_object/struct.FileDicomObject.html

pub mod aabb;
pub mod classify;
pub mod codec;
pub mod config;
pub mod enums;
pub mod frame_set;
pub mod geometry;
pub mod mosaic;
pub mod ordered_map;
pub mod ordering;
pub mod record;
pub mod series;
pub mod series_loader;

pub use aabb::AxisAlignedBox;
pub use classify::Classification;
pub use codec::{Codec, CodecRegistry, DecodeError, FrameDecoder};
pub use config::SeriesOptions;
pub use enums::{FrameSelector, SliceDirection};
pub use frame_set::{AssembledFrameSet, DisplayInfo};
pub use geometry::{PixelTransform, TransformUnavailable};
pub use ordered_map::OrderedMap;
pub use record::{PixelSource, RecordError, SliceRecord};
pub use series::{Series, SeriesError};
pub use series_loader::{SeriesLoader, SeriesLoaderError};
