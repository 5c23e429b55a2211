use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use figex_layout::Edges;
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::pipeline::{ImageOutcome, RunSummary};

pub const REPORT_FILE_NAME: &str = "figex-report.json";

/// A saved figure and the region it was cropped from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FigureEntry {
    pub index: usize,
    pub file: String,
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl FigureEntry {
    pub fn new(index: usize, file: &Path, region: Edges) -> Self {
        Self {
            index,
            file: file.display().to_string(),
            left: region.left,
            top: region.top,
            right: region.right,
            bottom: region.bottom,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageEntry {
    pub source: String,
    pub figures: Vec<FigureEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// JSON summary of one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionReport {
    pub version: String,
    pub generated_at: String,
    pub model: String,
    pub text_height_multiplier: f64,
    pub total_images: usize,
    pub failed_images: usize,
    pub total_figures: usize,
    pub images: Vec<ImageEntry>,
}

impl ExtractionReport {
    pub fn from_summary(summary: &RunSummary, model: &str, text_height_multiplier: f64) -> Self {
        let images: Vec<ImageEntry> = summary.outcomes.iter().map(image_entry).collect();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: Utc::now().to_rfc3339(),
            model: model.to_string(),
            text_height_multiplier,
            total_images: images.len(),
            failed_images: summary.failed(),
            total_figures: summary.figures_saved(),
            images,
        }
    }

    /// Writes the report as pretty JSON to `<folder>/figex-report.json`.
    pub async fn write_to(&self, folder: &Path) -> Result<std::path::PathBuf> {
        fs::create_dir_all(folder)
            .await
            .with_context(|| format!("Failed to create {}", folder.display()))?;
        let path = folder.join(REPORT_FILE_NAME);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

fn image_entry(outcome: &ImageOutcome) -> ImageEntry {
    ImageEntry {
        source: outcome.source.display().to_string(),
        figures: outcome
            .figures
            .iter()
            .map(|saved| FigureEntry::new(saved.index, &saved.path, saved.region.edges()))
            .collect(),
        error: outcome.error.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SavedFigure;
    use figex_layout::{BoundingBox, BoxKind};
    use std::path::PathBuf;

    fn summary() -> RunSummary {
        RunSummary {
            outcomes: vec![
                ImageOutcome {
                    source: PathBuf::from("in/page1.jpg"),
                    figures: vec![SavedFigure {
                        index: 0,
                        path: PathBuf::from("out/page1.jpg/Cell.jpg"),
                        region: BoundingBox::new(BoxKind::Figure, 1.0, 2.0, 3.0, 4.0).unwrap(),
                    }],
                    error: None,
                },
                ImageOutcome {
                    source: PathBuf::from("in/page2.jpg"),
                    figures: vec![],
                    error: Some("analysis error: timeout".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_report_counts() {
        let report = ExtractionReport::from_summary(&summary(), "gpt-4o-mini", 3.0);
        assert_eq!(report.total_images, 2);
        assert_eq!(report.failed_images, 1);
        assert_eq!(report.total_figures, 1);
        assert_eq!(report.images[0].figures[0].right, 3.0);
    }

    #[tokio::test]
    async fn test_report_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let report = ExtractionReport::from_summary(&summary(), "gpt-4o-mini", 3.0);
        let path = report.write_to(dir.path()).await.unwrap();

        let loaded: ExtractionReport = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded, report);
        assert!(loaded.images[0].error.is_none());
        assert_eq!(loaded.images[1].error.as_deref(), Some("analysis error: timeout"));
    }
}
