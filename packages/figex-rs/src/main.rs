mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Args, Commands};
use figex_layout::{load_oriented, AnalysisResult, FigureRegionBuilder};
use figex_rs::{
  Config, DocumentIntelligenceClient, ExtractionReport, FigureExtractionSystem, FilenameGenerator, RunSummary,
  SaveHandler, SystemOptions,
};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "figex=info,figex_rs=info,figex_layout=info";
const VERBOSE_FILTER: &str = "figex=debug,figex_rs=debug,figex_layout=debug";

#[tokio::main]
async fn main() {
  let args = Args::parse();
  init_tracing(args.verbose);

  match run(args).await {
    Ok(true) => {}
    Ok(false) => std::process::exit(1),
    Err(e) => {
      eprintln!("Error: {e:#}");
      std::process::exit(1);
    }
  }
}

/// Logs go to stderr so `regions` output on stdout stays parseable.
/// `RUST_LOG` overrides the defaults.
fn init_tracing(verbose: bool) {
  let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

/// Returns `Ok(false)` when the run finished but some image failed.
async fn run(args: Args) -> Result<bool> {
  let multiplier = args.text_height_multiplier;
  match args.command {
    Commands::Version => {
      println!("figex {}", env!("CARGO_PKG_VERSION"));
      Ok(true)
    }
    Commands::Image { path, output, report } => {
      let options = SystemOptions {
        output_folder: output,
        text_height_multiplier: multiplier,
        max_concurrent_images: 1,
        ..Default::default()
      };
      let (system, model) = build_system(options)?;
      let outcome = system.run_single_image(&path).await?;
      println!("Saved {} figures from {}", outcome.figures.len(), path.display());
      for figure in &outcome.figures {
        println!("  {}", figure.path.display());
      }
      let summary = RunSummary {
        outcomes: vec![outcome],
      };
      if report {
        write_report(&summary, &model, multiplier, system.output_folder()).await?;
      }
      Ok(summary.success())
    }
    Commands::Folder {
      dir,
      output,
      concurrency,
      report,
    } => {
      let options = SystemOptions {
        output_folder: output,
        text_height_multiplier: multiplier,
        max_concurrent_images: concurrency,
        ..Default::default()
      };
      let (system, model) = build_system(options)?;
      let summary = system.run_folder(&dir).await?;
      println!(
        "Processed {} images: {} figures saved, {} failed",
        summary.outcomes.len(),
        summary.figures_saved(),
        summary.failed()
      );
      for outcome in summary.outcomes.iter().filter(|o| o.error.is_some()) {
        error!(
          path = %outcome.source.display(),
          "failed: {}",
          outcome.error.as_deref().unwrap_or_default()
        );
      }
      if report {
        write_report(&summary, &model, multiplier, system.output_folder()).await?;
      }
      Ok(summary.success())
    }
    Commands::Regions {
      image,
      analysis,
      crop_dir,
    } => {
      regions(&image, &analysis, crop_dir.as_deref(), multiplier).await?;
      Ok(true)
    }
  }
}

fn build_system(options: SystemOptions) -> Result<(FigureExtractionSystem<DocumentIntelligenceClient, FilenameGenerator>, String)> {
  let config = Config::from_env().context("Failed to load configuration")?;
  let analyzer = DocumentIntelligenceClient::new(&config.document_intelligence_endpoint, &config.document_intelligence_key)?;
  let namer = FilenameGenerator::from_config(&config)?;
  let model = namer.model().to_string();
  Ok((FigureExtractionSystem::new(analyzer, namer, options), model))
}

async fn write_report(summary: &RunSummary, model: &str, multiplier: f64, folder: &Path) -> Result<()> {
  let path = ExtractionReport::from_summary(summary, model, multiplier)
    .write_to(folder)
    .await?;
  info!(path = %path.display(), "wrote report");
  Ok(())
}

#[derive(Serialize)]
struct RegionOutput {
  index: usize,
  left: f64,
  top: f64,
  right: f64,
  bottom: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  file: Option<String>,
}

/// Offline region computation from a saved analysis result.
async fn regions(image_path: &Path, analysis_path: &Path, crop_dir: Option<&Path>, multiplier: f64) -> Result<()> {
  let json = tokio::fs::read_to_string(analysis_path)
    .await
    .with_context(|| format!("Failed to read {}", analysis_path.display()))?;
  let analysis = AnalysisResult::from_json(&json)?;
  let builder = FigureRegionBuilder::new().with_text_height_multiplier(multiplier);

  let image_path = image_path.to_path_buf();
  let crop_dir = crop_dir.map(Path::to_path_buf);
  let output = tokio::task::spawn_blocking(move || -> Result<Vec<RegionOutput>> {
    let source = load_oriented(&image_path).with_context(|| format!("Failed to load {}", image_path.display()))?;

    let Some(crop_dir) = crop_dir else {
      let frame = builder.rotation_frame(&analysis, source.size())?;
      let regions = builder.figure_regions(&analysis, &frame)?;
      return Ok(
        regions
          .iter()
          .enumerate()
          .map(|(index, region)| RegionOutput {
            index,
            left: region.left(),
            top: region.top(),
            right: region.right(),
            bottom: region.bottom(),
            file: None,
          })
          .collect(),
      );
    };

    let handler = SaveHandler::new(crop_dir);
    let mut output = Vec::new();
    for figure in builder.extract_figure_regions(&analysis, &source.image)? {
      let path = handler.save_figure(&figure.image, &image_path, &format!("figure_{}", figure.index + 1))?;
      output.push(RegionOutput {
        index: figure.index,
        left: figure.region.left(),
        top: figure.region.top(),
        right: figure.region.right(),
        bottom: figure.region.bottom(),
        file: Some(path.display().to_string()),
      });
    }
    Ok(output)
  })
  .await
  .context("Failed to spawn blocking task for region computation")??;

  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
