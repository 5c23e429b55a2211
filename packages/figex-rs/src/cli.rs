//! Command line arguments backing the `figex` binary.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "figex",
  about = "Extract, name and save illustrations from scanned textbook pages",
  version
)]
pub struct Args {
  #[command(subcommand)]
  pub command: Commands,

  /// Margin around each figure, in multiples of the smallest text line height
  #[arg(long, short = 'm', global = true, default_value = "3.0")]
  pub text_height_multiplier: f64,

  /// Enable debug logging
  #[arg(long, short = 'v', global = true)]
  pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Print version information
  Version,
  /// Extract the figures of a single page image
  Image {
    /// Page image to process
    path: PathBuf,

    /// Folder that receives the named figures
    #[arg(long, short = 'o', default_value = "output")]
    output: PathBuf,

    /// Write figex-report.json into the output folder
    #[arg(long)]
    report: bool,
  },
  /// Extract the figures of every page image in a folder
  Folder {
    /// Folder of page images (not searched recursively)
    dir: PathBuf,

    /// Folder that receives the named figures
    #[arg(long, short = 'o', default_value = "output")]
    output: PathBuf,

    /// Number of images processed at the same time
    #[arg(long, short = 'j', default_value = "2")]
    concurrency: usize,

    /// Write figex-report.json into the output folder
    #[arg(long)]
    report: bool,
  },
  /// Compute figure regions from a saved analysis result, without any network calls
  Regions {
    /// Page image the analysis was run on
    image: PathBuf,

    /// Analysis result JSON (the service's full response or its analyzeResult)
    #[arg(long, short = 'a')]
    analysis: PathBuf,

    /// Also crop the regions and save them as figure_<n>.jpg under this folder
    #[arg(long)]
    crop_dir: Option<PathBuf>,
  },
}
