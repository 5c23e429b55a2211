//! End-to-end figure extraction: load, analyze, crop, name, save.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use figex_layout::{
    load_oriented, AnalysisInput, BoundingBox, DocumentAnalyzer, FigureRegion, FigureRegionBuilder, TraceEvent,
    TraceHook,
};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::filename_generator::FigureNamer;
use crate::save_handler::SaveHandler;
use crate::size_reducer::ImageSizeReducer;

/// File extensions picked up by folder runs (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "jfif"];

/// Options for a [`FigureExtractionSystem`].
#[derive(Debug, Clone)]
pub struct SystemOptions {
    pub output_folder: PathBuf,
    pub text_height_multiplier: f64,
    /// Maximum number of images processed concurrently by folder runs
    pub max_concurrent_images: usize,
    pub size_reducer: ImageSizeReducer,
}

impl Default for SystemOptions {
    fn default() -> Self {
        Self {
            output_folder: PathBuf::from("output"),
            text_height_multiplier: FigureRegionBuilder::DEFAULT_TEXT_HEIGHT_MULTIPLIER,
            max_concurrent_images: 2,
            size_reducer: ImageSizeReducer::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SavedFigure {
    pub index: usize,
    pub path: PathBuf,
    pub region: BoundingBox,
}

/// What happened to one source image.
#[derive(Debug, Clone)]
pub struct ImageOutcome {
    pub source: PathBuf,
    pub figures: Vec<SavedFigure>,
    pub error: Option<String>,
}

impl ImageOutcome {
    fn failed(source: PathBuf, error: String) -> Self {
        Self {
            source,
            figures: Vec::new(),
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<ImageOutcome>,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_some()).count()
    }

    pub fn figures_saved(&self) -> usize {
        self.outcomes.iter().map(|o| o.figures.len()).sum()
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }
}

/// Drives a [`DocumentAnalyzer`] and a [`FigureNamer`] over images.
pub struct FigureExtractionSystem<A, N> {
    analyzer: Arc<A>,
    namer: Arc<N>,
    builder: FigureRegionBuilder,
    size_reducer: ImageSizeReducer,
    save_handler: SaveHandler,
    max_concurrent_images: usize,
}

impl<A, N> Clone for FigureExtractionSystem<A, N> {
    fn clone(&self) -> Self {
        Self {
            analyzer: self.analyzer.clone(),
            namer: self.namer.clone(),
            builder: self.builder.clone(),
            size_reducer: self.size_reducer.clone(),
            save_handler: self.save_handler.clone(),
            max_concurrent_images: self.max_concurrent_images,
        }
    }
}

impl<A, N> FigureExtractionSystem<A, N>
where
    A: DocumentAnalyzer + 'static,
    N: FigureNamer + 'static,
{
    pub fn new(analyzer: A, namer: N, options: SystemOptions) -> Self {
        debug!(?options, "initializing figure extraction system");
        Self {
            analyzer: Arc::new(analyzer),
            namer: Arc::new(namer),
            builder: FigureRegionBuilder::new().with_text_height_multiplier(options.text_height_multiplier),
            size_reducer: options.size_reducer,
            save_handler: SaveHandler::new(options.output_folder),
            max_concurrent_images: options.max_concurrent_images.max(1),
        }
    }

    pub fn output_folder(&self) -> &Path {
        self.save_handler.output_folder()
    }

    /// Extracts, names and saves every figure of one image.
    pub async fn run_single_image(&self, image_path: &Path) -> Result<ImageOutcome> {
        info!(path = %image_path.display(), "running system for image");

        let path = image_path.to_path_buf();
        let source = tokio::task::spawn_blocking(move || load_oriented(&path))
            .await
            .context("Failed to spawn blocking task for image loading")?
            .with_context(|| format!("Failed to load {}", image_path.display()))?;

        let reducer = self.size_reducer.clone();
        let (source, upload) = tokio::task::spawn_blocking(move || {
            let upload = reducer.reduce(&source);
            (source, upload)
        })
        .await
        .context("Failed to spawn blocking task for size reduction")?;
        let upload = upload?;

        let analysis = self
            .analyzer
            .analyze(&AnalysisInput::Bytes(upload))
            .await
            .with_context(|| format!("Layout analysis failed for {}", image_path.display()))?;

        let builder = self.builder.clone().with_trace(log_trace(image_path));
        let figures = tokio::task::spawn_blocking(move || builder.extract_figure_regions(&analysis, &source.image))
            .await
            .context("Failed to spawn blocking task for figure extraction")?
            .with_context(|| format!("Figure extraction failed for {}", image_path.display()))?;

        let mut saved = Vec::with_capacity(figures.len());
        for FigureRegion { index, region, image } in figures {
            let name = self
                .namer
                .name(&image)
                .await
                .with_context(|| format!("Failed to name figure {} of {}", index + 1, image_path.display()))?;

            let handler = self.save_handler.clone();
            let source_path = image_path.to_path_buf();
            let path = tokio::task::spawn_blocking(move || handler.save_figure(&image, &source_path, &name))
                .await
                .context("Failed to spawn blocking task for saving")??;

            saved.push(SavedFigure { index, path, region });
        }

        info!(path = %image_path.display(), figures = saved.len(), "finished image");
        Ok(ImageOutcome {
            source: image_path.to_path_buf(),
            figures: saved,
            error: None,
        })
    }

    /// Processes every image directly inside `folder_path`.
    ///
    /// A failing image is logged and recorded in the summary; the rest of the
    /// folder still runs.
    pub async fn run_folder(&self, folder_path: &Path) -> Result<RunSummary> {
        let files = image_files(folder_path)?;
        info!(
            folder = %folder_path.display(),
            images = files.len(),
            concurrency = self.max_concurrent_images,
            "running system for folder"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_images));
        let total = files.len();
        let mut tasks = Vec::with_capacity(total);

        for (idx, file) in files.into_iter().enumerate() {
            let semaphore = semaphore.clone();
            let system = self.clone();
            let task_file = file.clone();

            let task = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.context("Semaphore closed")?;
                info!("Running system for file {} of {}", idx + 1, total);
                system.run_single_image(&task_file).await
            });
            tasks.push((file, task));
        }

        let mut summary = RunSummary::default();
        for (file, task) in tasks {
            let outcome = match task.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    error!(path = %file.display(), "image failed: {e:#}");
                    ImageOutcome::failed(file, format!("{e:#}"))
                }
                Err(e) => {
                    error!(path = %file.display(), "task join error: {e}");
                    ImageOutcome::failed(file, e.to_string())
                }
            };
            summary.outcomes.push(outcome);
        }

        info!(
            images = summary.outcomes.len(),
            failed = summary.failed(),
            figures = summary.figures_saved(),
            "finished folder"
        );
        Ok(summary)
    }
}

/// Image files directly inside `folder`, sorted by path.
pub fn image_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        anyhow::bail!("Input folder '{}' does not exist", folder.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(folder).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read {}", folder.display()))?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|ext| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Bridges region-building milestones into the log, tagged with the image.
fn log_trace(image_path: &Path) -> TraceHook {
    let source = image_path.display().to_string();
    Arc::new(move |event: &TraceEvent| match event {
        TraceEvent::FiguresFound { count } => info!(source = %source, "Found {count} figures"),
        TraceEvent::LineHeight { height } => info!(source = %source, "Determined line height: {height}"),
        TraceEvent::FigureGrown {
            index,
            total,
            paragraphs,
        } => info!(
            source = %source,
            "Extended figure {} of {}: {paragraphs} overlapping paragraphs",
            index + 1,
            total
        ),
        TraceEvent::FigureCropped { index, total } => {
            debug!(source = %source, "Cropped figure {} of {}", index + 1, total)
        }
    })
}
