use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dicom_series::{config::Cli, series_loader::SeriesLoader};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let options = cli.series_options();

    let series_list = match SeriesLoader::load_from_directory(&cli.dir, &options) {
        Ok(series_list) => series_list,
        Err(e) => {
            error!("Failed to load {}: {e}", cli.dir.display());
            std::process::exit(1);
        }
    };

    for series in &series_list {
        match series.goc_frames().await {
            Ok(frames) => {
                let bbox = frames.bounding_box();
                info!(
                    series = %series,
                    name = series.name().unwrap_or_default(),
                    dim = ?frames.dim(),
                    direction = ?series.slice_dir(),
                    transform_available = frames.transform.is_available(),
                    extent_mm = ?(bbox.width(), bbox.height(), bbox.depth()),
                    "Series ready"
                );
            }
            Err(e) => error!(series = %series, "Failed to assemble frames: {e}"),
        }
    }
}
