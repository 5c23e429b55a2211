//! # figex-rs
//!
//! Pulls illustrations out of scanned textbook pages and saves each one under
//! a short descriptive name.
//!
//! ## Features
//!
//! - **Layout Analysis**: Sends each page to Azure Document Intelligence (`prebuilt-layout`)
//! - **Caption-Aware Cropping**: Grows every figure to take in the paragraphs that touch it
//! - **Rotation Handling**: Deskews pages by the detected page angle before cropping
//! - **Figure Naming**: Asks a vision model for a concise, filesystem-safe name
//! - **Folder Runs**: Processes whole folders concurrently and writes a JSON report
//!
//! ## Quick Start
//!
//! ```ignore
//! use figex_rs::prelude::*;
//!
//! let config = Config::from_env()?;
//! let analyzer = DocumentIntelligenceClient::new(
//!     &config.document_intelligence_endpoint,
//!     &config.document_intelligence_key,
//! )?;
//! let namer = FilenameGenerator::from_config(&config)?;
//!
//! let system = FigureExtractionSystem::new(analyzer, namer, SystemOptions::default());
//! let summary = system.run_folder(Path::new("scans")).await?;
//! println!("saved {} figures", summary.figures_saved());
//! ```

pub mod config;
pub mod document_intelligence;
pub mod filename_generator;
pub mod pipeline;
pub mod report;
pub mod save_handler;
pub mod size_reducer;

// Re-export commonly used types at the root level
pub use config::{Config, ConfigError};
pub use document_intelligence::DocumentIntelligenceClient;
pub use filename_generator::{sanitize_filename, FigureNamer, FilenameGenerator};
pub use pipeline::{image_files, FigureExtractionSystem, ImageOutcome, RunSummary, SavedFigure, SystemOptions};
pub use report::{ExtractionReport, FigureEntry, ImageEntry};
pub use save_handler::SaveHandler;
pub use size_reducer::ImageSizeReducer;

/// Prelude module for convenient imports
///
/// Import everything you need with:
/// ```ignore
/// use figex_rs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        image_files, sanitize_filename, Config, ConfigError, DocumentIntelligenceClient, ExtractionReport,
        FigureExtractionSystem, FigureNamer, FilenameGenerator, ImageOutcome, ImageSizeReducer, RunSummary,
        SaveHandler, SavedFigure, SystemOptions,
    };
    pub use figex_layout::{
        extend, merge_figure_with_paragraphs, overlap, rotate_points, AnalysisInput, AnalysisResult, BoundingBox,
        BoxKind, DocumentAnalyzer, FigureRegion, FigureRegionBuilder, ImageSize, LayoutError, Point, Polygon,
        RotationFrame,
    };
}
