//! # figex-layout
//!
//! Geometry that turns a document layout analysis (rotated figure, paragraph
//! and line polygons plus a page angle) into one axis-aligned crop per figure,
//! grown to take in the caption text that belongs to it.

pub mod analysis;
pub mod builder;
pub mod engine;
pub mod geometry;
pub mod raster;
pub mod region;

pub use analysis::{AnalysisResult, AnalyzedPage};
pub use builder::{FigureRegion, FigureRegionBuilder, TraceEvent, TraceHook};
pub use engine::{AnalysisInput, DocumentAnalyzer, LayoutError};
pub use geometry::{derive_bounding_box, extend, merge_figure_with_paragraphs, overlap, rotate_points};
pub use raster::{crop_region, load_oriented, rotate_expand, rotated_canvas_size, OrientedImage};
pub use region::{BoundingBox, BoxKind, Edges, ImageSize, Point, Polygon, RotationFrame};
