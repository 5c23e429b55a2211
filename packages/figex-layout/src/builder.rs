//! Turns one analysis result plus its source raster into per-figure crops.
//!
//! Each figure box is grown by a margin proportional to the smallest text line
//! on the page, then merged with every paragraph it touches so captions and
//! labels travel with the illustration.

use std::fmt;
use std::sync::Arc;

use image::DynamicImage;

use crate::analysis::AnalysisResult;
use crate::engine::LayoutError;
use crate::geometry::{extend, merge_figure_with_paragraphs, overlap};
use crate::raster::{crop_region, rotate_expand, rotated_canvas_size};
use crate::region::{BoundingBox, BoxKind, ImageSize, Polygon, RotationFrame};

/// Milestones reported to a [`TraceHook`] while regions are built.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    FiguresFound { count: usize },
    LineHeight { height: f64 },
    FigureGrown { index: usize, total: usize, paragraphs: usize },
    FigureCropped { index: usize, total: usize },
}

pub type TraceHook = Arc<dyn Fn(&TraceEvent) + Send + Sync>;

/// A final figure region and the crop taken from the rotated canvas.
#[derive(Debug, Clone)]
pub struct FigureRegion {
    /// Position of the figure in the analysis result.
    pub index: usize,
    pub region: BoundingBox,
    pub image: DynamicImage,
}

#[derive(Clone)]
pub struct FigureRegionBuilder {
    text_height_multiplier: f64,
    trace: Option<TraceHook>,
}

impl fmt::Debug for FigureRegionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FigureRegionBuilder")
            .field("text_height_multiplier", &self.text_height_multiplier)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

impl Default for FigureRegionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FigureRegionBuilder {
    pub const DEFAULT_TEXT_HEIGHT_MULTIPLIER: f64 = 3.0;
    /// Line height used when the page has no text lines.
    pub const FALLBACK_LINE_HEIGHT: f64 = 10.0;

    pub fn new() -> Self {
        Self {
            text_height_multiplier: Self::DEFAULT_TEXT_HEIGHT_MULTIPLIER,
            trace: None,
        }
    }

    pub fn with_text_height_multiplier(mut self, multiplier: f64) -> Self {
        self.text_height_multiplier = multiplier;
        self
    }

    pub fn with_trace(mut self, hook: TraceHook) -> Self {
        self.trace = Some(hook);
        self
    }

    pub fn text_height_multiplier(&self) -> f64 {
        self.text_height_multiplier
    }

    fn emit(&self, event: TraceEvent) {
        if let Some(hook) = &self.trace {
            hook(&event);
        }
    }

    /// Rotation frame for an image of `original` size analyzed as `analysis`.
    pub fn rotation_frame(&self, analysis: &AnalysisResult, original: ImageSize) -> Result<RotationFrame, LayoutError> {
        if original.is_empty() {
            return Err(LayoutError::InvalidInput(format!(
                "image has no pixels: {}x{}",
                original.width, original.height
            )));
        }
        let angle = analysis.page_angle()?;
        Ok(RotationFrame::new(angle, original, rotated_canvas_size(original, angle)))
    }

    /// Smallest line height, or [`Self::FALLBACK_LINE_HEIGHT`] without lines.
    pub fn line_height(lines: &[BoundingBox]) -> f64 {
        lines
            .iter()
            .map(BoundingBox::height)
            .reduce(f64::min)
            .unwrap_or(Self::FALLBACK_LINE_HEIGHT)
    }

    /// Final crop rectangles, one per reported figure and in report order.
    pub fn figure_regions(&self, analysis: &AnalysisResult, frame: &RotationFrame) -> Result<Vec<BoundingBox>, LayoutError> {
        let figures = boxes(BoxKind::Figure, &analysis.figures, frame)?;
        self.emit(TraceEvent::FiguresFound { count: figures.len() });
        if figures.is_empty() {
            return Ok(Vec::new());
        }

        let paragraphs = boxes(BoxKind::Paragraph, &analysis.paragraphs, frame)?;
        let lines = match analysis.pages.first() {
            Some(page) => boxes(BoxKind::Line, &page.lines, frame)?,
            None => Vec::new(),
        };
        let line_height = Self::line_height(&lines);
        self.emit(TraceEvent::LineHeight { height: line_height });

        let margin = line_height * self.text_height_multiplier;
        let total = figures.len();
        figures
            .iter()
            .enumerate()
            .map(|(index, figure)| {
                let grown = extend(figure, margin)?;
                let touching: Vec<BoundingBox> = paragraphs.iter().filter(|p| overlap(&grown, p)).copied().collect();
                self.emit(TraceEvent::FigureGrown {
                    index,
                    total,
                    paragraphs: touching.len(),
                });
                merge_figure_with_paragraphs(&grown, &touching)
            })
            .collect()
    }

    /// Rotates `image` by the page angle and crops every figure region out of
    /// the rotated canvas.
    pub fn extract_figure_regions(&self, analysis: &AnalysisResult, image: &DynamicImage) -> Result<Vec<FigureRegion>, LayoutError> {
        let frame = self.rotation_frame(analysis, ImageSize::new(image.width(), image.height()))?;
        let regions = self.figure_regions(analysis, &frame)?;
        if regions.is_empty() {
            return Ok(Vec::new());
        }

        let rotated = rotate_expand(image, frame.angle);
        let total = regions.len();
        regions
            .into_iter()
            .enumerate()
            .map(|(index, region)| {
                let image = crop_region(&rotated, &region)?;
                self.emit(TraceEvent::FigureCropped { index, total });
                Ok(FigureRegion { index, region, image })
            })
            .collect()
    }

    /// Cropped figures in the order the analysis reported them.
    pub fn extract_figures(&self, analysis: &AnalysisResult, image: &DynamicImage) -> Result<Vec<DynamicImage>, LayoutError> {
        Ok(self
            .extract_figure_regions(analysis, image)?
            .into_iter()
            .map(|figure| figure.image)
            .collect())
    }
}

fn boxes(kind: BoxKind, polygons: &[Polygon], frame: &RotationFrame) -> Result<Vec<BoundingBox>, LayoutError> {
    polygons
        .iter()
        .map(|polygon| BoundingBox::from_polygon(kind, polygon, frame))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalyzedPage;
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;

    fn page(angle: f64, lines: Vec<Polygon>) -> AnalyzedPage {
        AnalyzedPage { angle, lines }
    }

    fn line_box(top: f64, height: f64) -> BoundingBox {
        BoundingBox::new(BoxKind::Line, 0.0, top, 50.0, top + height).unwrap()
    }

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
    }

    #[test]
    fn test_line_height_is_minimum() {
        let lines = [line_box(0.0, 8.0), line_box(20.0, 5.0)];
        assert_eq!(FigureRegionBuilder::line_height(&lines), 5.0);
    }

    #[test]
    fn test_line_height_fallback() {
        assert_eq!(FigureRegionBuilder::line_height(&[]), 10.0);
    }

    #[test]
    fn test_no_figures_is_empty_success() {
        let analysis = AnalysisResult {
            pages: vec![page(0.0, vec![])],
            figures: vec![],
            paragraphs: vec![Polygon::from_rect(0.0, 0.0, 10.0, 10.0)],
        };
        let builder = FigureRegionBuilder::new();
        assert!(builder.extract_figures(&analysis, &blank(50, 50)).unwrap().is_empty());
    }

    #[test]
    fn test_missing_pages_is_invalid_input() {
        let analysis = AnalysisResult {
            pages: vec![],
            figures: vec![Polygon::from_rect(0.0, 0.0, 10.0, 10.0)],
            paragraphs: vec![],
        };
        let err = FigureRegionBuilder::new().extract_figures(&analysis, &blank(50, 50)).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput(_)));
    }

    #[test]
    fn test_non_finite_angle_is_invalid_input() {
        let analysis = AnalysisResult {
            pages: vec![page(f64::NAN, vec![])],
            figures: vec![],
            paragraphs: vec![],
        };
        let err = FigureRegionBuilder::new()
            .rotation_frame(&analysis, ImageSize::new(10, 10))
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput(_)));
    }

    #[test]
    fn test_figure_grows_over_nearby_caption() {
        // Lines of height 5 and 8 give a margin of 5 * 3 = 15.
        let analysis = AnalysisResult {
            pages: vec![page(
                0.0,
                vec![
                    Polygon::from_rect(0.0, 130.0, 60.0, 135.0),
                    Polygon::from_rect(0.0, 150.0, 60.0, 158.0),
                ],
            )],
            figures: vec![Polygon::from_rect(0.0, 0.0, 100.0, 100.0)],
            paragraphs: vec![
                Polygon::from_rect(90.0, 90.0, 120.0, 120.0),
                Polygon::from_rect(0.0, 170.0, 60.0, 190.0),
            ],
        };
        let frame = RotationFrame::identity(ImageSize::new(200, 200));
        let regions = FigureRegionBuilder::new().figure_regions(&analysis, &frame).unwrap();

        assert_eq!(regions, vec![BoundingBox::new(BoxKind::Figure, -15.0, -15.0, 120.0, 120.0).unwrap()]);
    }

    #[test]
    fn test_multiplier_controls_search_window() {
        let analysis = AnalysisResult {
            pages: vec![page(0.0, vec![])],
            figures: vec![Polygon::from_rect(50.0, 50.0, 100.0, 100.0)],
            paragraphs: vec![Polygon::from_rect(50.0, 115.0, 100.0, 130.0)],
        };
        let frame = RotationFrame::identity(ImageSize::new(200, 200));

        // Fallback line height 10: multiplier 1 gives margin 10, not enough to reach y=115.
        let narrow = FigureRegionBuilder::new()
            .with_text_height_multiplier(1.0)
            .figure_regions(&analysis, &frame)
            .unwrap();
        assert_eq!(narrow[0].bottom(), 110.0);

        let wide = FigureRegionBuilder::new().figure_regions(&analysis, &frame).unwrap();
        assert_eq!(wide[0].bottom(), 130.0);
    }

    #[test]
    fn test_negative_multiplier_is_invalid_argument() {
        let analysis = AnalysisResult {
            pages: vec![page(0.0, vec![])],
            figures: vec![Polygon::from_rect(0.0, 0.0, 10.0, 10.0)],
            paragraphs: vec![],
        };
        let frame = RotationFrame::identity(ImageSize::new(20, 20));
        let err = FigureRegionBuilder::new()
            .with_text_height_multiplier(-1.0)
            .figure_regions(&analysis, &frame)
            .unwrap_err();
        assert!(matches!(err, LayoutError::InvalidArgument(_)));
    }

    #[test]
    fn test_extract_preserves_figure_order_and_clamps() {
        let analysis = AnalysisResult {
            pages: vec![page(0.0, vec![Polygon::from_rect(0.0, 0.0, 10.0, 2.0)])],
            figures: vec![
                Polygon::from_rect(60.0, 60.0, 90.0, 80.0),
                Polygon::from_rect(0.0, 0.0, 20.0, 10.0),
            ],
            paragraphs: vec![],
        };
        let figures = FigureRegionBuilder::new()
            .extract_figure_regions(&analysis, &blank(100, 100))
            .unwrap();

        assert_eq!(figures.len(), 2);
        assert_eq!(figures[0].index, 0);
        // Margin 2 * 3 = 6 around each figure, clamped at the canvas edge.
        assert_eq!((figures[0].image.width(), figures[0].image.height()), (42, 32));
        assert_eq!((figures[1].image.width(), figures[1].image.height()), (26, 16));
    }

    #[test]
    fn test_extract_on_quarter_turned_page() {
        // The analysis reports a 90 degree page on a 200x100 image; crops come
        // from the 100x200 rotated canvas.
        let analysis = AnalysisResult {
            pages: vec![page(90.0, vec![])],
            figures: vec![Polygon::from_rect(0.0, 0.0, 40.0, 20.0)],
            paragraphs: vec![],
        };
        let builder = FigureRegionBuilder::new().with_text_height_multiplier(0.0);
        let frame = builder.rotation_frame(&analysis, ImageSize::new(200, 100)).unwrap();
        assert_eq!(frame.new_size, ImageSize::new(100, 200));

        let figures = builder.extract_figures(&analysis, &blank(200, 100)).unwrap();
        assert_eq!(figures.len(), 1);
    }

    fn red_pixels(image: &DynamicImage) -> usize {
        image.to_rgb8().pixels().filter(|p| **p == Rgb([255, 0, 0])).count()
    }

    #[test]
    fn test_crop_holds_every_figure_pixel_after_rotation() {
        let mut page_image = RgbImage::from_pixel(160, 120, Rgb([255, 255, 255]));
        for y in 40..70 {
            for x in 50..90 {
                page_image.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }
        let page_image = DynamicImage::ImageRgb8(page_image);
        let builder = FigureRegionBuilder::new().with_text_height_multiplier(0.0);

        for angle in [90.0, 7.0, -4.0, 13.0] {
            let analysis = AnalysisResult {
                pages: vec![page(angle, vec![])],
                figures: vec![Polygon::from_rect(50.0, 40.0, 90.0, 70.0)],
                paragraphs: vec![],
            };
            let on_canvas = red_pixels(&rotate_expand(&page_image, angle));
            assert!(on_canvas > 1000, "angle {angle}: {on_canvas} marker pixels");

            let figures = builder.extract_figures(&analysis, &page_image).unwrap();
            assert_eq!(figures.len(), 1);
            assert_eq!(red_pixels(&figures[0]), on_canvas, "angle {angle}");
            // Tight crop: at most the rotated marker's extent plus rounding.
            assert!(figures[0].width() < 60 && figures[0].height() < 60, "angle {angle}");
        }
    }

    #[test]
    fn test_trace_hook_sees_milestones() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let builder = FigureRegionBuilder::new().with_trace(Arc::new(move |event: &TraceEvent| {
            sink.lock().unwrap().push(event.clone());
        }));
        let analysis = AnalysisResult {
            pages: vec![page(0.0, vec![])],
            figures: vec![Polygon::from_rect(10.0, 10.0, 20.0, 20.0)],
            paragraphs: vec![],
        };
        builder.extract_figures(&analysis, &blank(100, 100)).unwrap();

        let events = seen.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                TraceEvent::FiguresFound { count: 1 },
                TraceEvent::LineHeight { height: 10.0 },
                TraceEvent::FigureGrown {
                    index: 0,
                    total: 1,
                    paragraphs: 0
                },
                TraceEvent::FigureCropped { index: 0, total: 1 },
            ]
        );
    }
}
