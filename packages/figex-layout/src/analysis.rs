//! Parsed form of a `prebuilt-layout` analysis result.
//!
//! The service response is deserialized into loosely typed wire structs and
//! then validated into [`AnalysisResult`], so missing angles or malformed
//! polygons are reported once, at the boundary.

use serde::Deserialize;

use crate::engine::LayoutError;
use crate::region::Polygon;

/// One analyzed page: its skew angle in degrees and its text-line outlines.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedPage {
    pub angle: f64,
    pub lines: Vec<Polygon>,
}

/// Layout of one image: pages plus the document-wide figure and paragraph
/// outlines, each in the order the service reported them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisResult {
    pub pages: Vec<AnalyzedPage>,
    pub figures: Vec<Polygon>,
    pub paragraphs: Vec<Polygon>,
}

impl AnalysisResult {
    /// Parses either a full operation response (`{"status": ..., "analyzeResult": {...}}`)
    /// or a bare `analyzeResult` object.
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| LayoutError::InvalidInput(format!("malformed analysis json: {e}")))?;
        let body = match value.get("analyzeResult") {
            Some(inner) => inner.clone(),
            None => value,
        };
        let raw: RawAnalyzeResult =
            serde_json::from_value(body).map_err(|e| LayoutError::InvalidInput(format!("unexpected analysis shape: {e}")))?;
        Self::try_from(raw)
    }

    /// Angle of the first page; the whole image is rotated by it.
    pub fn page_angle(&self) -> Result<f64, LayoutError> {
        let page = self
            .pages
            .first()
            .ok_or_else(|| LayoutError::InvalidInput("analysis result has no pages".to_string()))?;
        if !page.angle.is_finite() {
            return Err(LayoutError::InvalidInput(format!("page angle is not finite: {}", page.angle)));
        }
        Ok(page.angle)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalyzeResult {
    #[serde(default)]
    pub pages: Vec<RawPage>,
    #[serde(default)]
    pub paragraphs: Vec<RawRegionEntity>,
    #[serde(default)]
    pub figures: Vec<RawRegionEntity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    pub page_number: Option<u32>,
    pub angle: Option<f64>,
    #[serde(default)]
    pub lines: Vec<RawLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLine {
    #[serde(default)]
    pub content: String,
    pub polygon: Option<Vec<f64>>,
}

/// A figure or paragraph entry; only its first bounding region is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRegionEntity {
    pub id: Option<String>,
    pub content: Option<String>,
    #[serde(default)]
    pub bounding_regions: Vec<RawBoundingRegion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBoundingRegion {
    pub page_number: Option<u32>,
    pub polygon: Vec<f64>,
}

impl TryFrom<RawAnalyzeResult> for AnalysisResult {
    type Error = LayoutError;

    fn try_from(raw: RawAnalyzeResult) -> Result<Self, Self::Error> {
        let pages = raw
            .pages
            .into_iter()
            .enumerate()
            .map(|(i, page)| {
                let number = page.page_number.unwrap_or(i as u32 + 1);
                let angle = page
                    .angle
                    .ok_or_else(|| LayoutError::InvalidInput(format!("page {number} has no angle")))?;
                let lines = page
                    .lines
                    .iter()
                    .enumerate()
                    .map(|(j, line)| {
                        let coords = line.polygon.as_deref().ok_or_else(|| {
                            LayoutError::InvalidInput(format!("line {j} on page {number} has no polygon"))
                        })?;
                        Polygon::from_coords(coords)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(AnalyzedPage { angle, lines })
            })
            .collect::<Result<Vec<_>, LayoutError>>()?;

        Ok(Self {
            pages,
            figures: first_regions("figure", &raw.figures)?,
            paragraphs: first_regions("paragraph", &raw.paragraphs)?,
        })
    }
}

fn first_regions(what: &str, entities: &[RawRegionEntity]) -> Result<Vec<Polygon>, LayoutError> {
    entities
        .iter()
        .enumerate()
        .map(|(i, entity)| {
            let region = entity
                .bounding_regions
                .first()
                .ok_or_else(|| LayoutError::InvalidInput(format!("{what} {i} has no bounding regions")))?;
            Polygon::from_coords(&region.polygon)
        })
        .collect()
}
