//! Series building options and command-line arguments.
//!
//! Ordering behavior is passed explicitly to every [`Series`] through
//! [`SeriesOptions`] instead of living in process-wide state.
//!
//! [`Series`]: crate::series::Series

use std::path::PathBuf;

use clap::Parser;

/// Default directory scanned by the binary.
pub const DEFAULT_DICOM_DIR: &str = "dicom";

/// Options applied when a series is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesOptions {
    /// Keep records in insertion order and skip every ordering heuristic.
    pub explicit_ordering: bool,

    /// Distance in mm between slices, used with explicit ordering.
    pub explicit_spacing: Option<f64>,
}

impl SeriesOptions {
    pub fn with_explicit_ordering(mut self, enabled: bool) -> Self {
        self.explicit_ordering = enabled;
        self
    }

    pub fn with_explicit_spacing(mut self, spacing: f64) -> Self {
        self.explicit_spacing = Some(spacing);
        self
    }

    /// Explicit spacing, if set to a positive value.
    pub fn spacing_hint(&self) -> Option<f64> {
        self.explicit_spacing.filter(|s| *s > 0.0)
    }
}

/// Assemble every DICOM series found in a directory.
#[derive(Parser, Debug, Clone)]
#[command(name = "dicom-series")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the .dcm files.
    #[arg(long, default_value = DEFAULT_DICOM_DIR)]
    pub dir: PathBuf,

    /// Keep files in the order they were read.
    #[arg(long)]
    pub explicit_ordering: bool,

    /// Slice spacing in mm to use with --explicit-ordering.
    #[arg(long)]
    pub explicit_spacing: Option<f64>,
}

impl Cli {
    pub fn series_options(&self) -> SeriesOptions {
        SeriesOptions {
            explicit_ordering: self.explicit_ordering,
            explicit_spacing: self.explicit_spacing,
        }
    }
}
