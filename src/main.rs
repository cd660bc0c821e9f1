use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::debug;

use prism_undistort::{
    undistort_images, undistort_reconstruction, DataSet, FsDataSet, ImageFormat,
};

/// Save radially undistorted images and the matching reconstruction.
#[derive(Parser)]
#[command(name = "prism", version)]
struct Args {
    /// Dataset to process.
    dataset: PathBuf,

    /// Use this format to export images.
    #[arg(long, value_enum, default_value_t = ImageFormatArg::Jpg)]
    image_format: ImageFormatArg,

    /// Scale exported images by this factor.
    #[arg(long, default_value_t = 1.0)]
    image_scale: f64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImageFormatArg {
    Jpg,
    Png,
}

impl From<ImageFormatArg> for ImageFormat {
    fn from(arg: ImageFormatArg) -> Self {
        match arg {
            ImageFormatArg::Jpg => ImageFormat::Jpg,
            ImageFormatArg::Png => ImageFormat::Png,
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    anyhow::ensure!(
        args.image_scale > 0.0,
        "--image-scale must be positive, got {}",
        args.image_scale
    );

    let data = FsDataSet::open(&args.dataset)
        .with_context(|| format!("opening dataset {}", args.dataset.display()))?;
    let reconstructions = data.load_reconstruction().context("loading reconstruction")?;
    let mut graph = data.load_tracks_graph().context("loading tracks graph")?;

    if let Some(reconstruction) = reconstructions.first() {
        let subshot_width = data.config().depthmap_resolution;
        let (undistorted, mapping) =
            undistort_reconstruction(reconstruction, &mut graph, subshot_width)?;
        data.save_undistorted_reconstruction(std::slice::from_ref(&undistorted))?;
        undistort_images(
            &data,
            reconstruction,
            &undistorted,
            &mapping,
            args.image_format.into(),
            args.image_scale,
            subshot_width,
            data.config().processes,
        )?;
    } else {
        debug!("No reconstruction to undistort");
    }

    data.save_undistorted_tracks_graph(&graph)?;
    Ok(())
}
