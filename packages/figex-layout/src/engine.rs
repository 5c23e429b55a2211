use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::analysis::AnalysisResult;

#[derive(Debug, Clone)]
pub enum AnalysisInput {
    FilePath(PathBuf),
    Bytes(Vec<u8>),
}

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("analysis error: {0}")]
    Analysis(String),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A hosted or local layout-analysis backend.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisResult, LayoutError>;
}
