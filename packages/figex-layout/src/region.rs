use serde::Serialize;

use crate::engine::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Pixel dimensions of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A detected region outline: four corners (top-left, top-right, bottom-right,
/// bottom-left) in the coordinate space of the unrotated source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Polygon {
    pub points: [Point; 4],
}

impl Polygon {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// Builds a polygon from the flat `[x0, y0, x1, y1, ...]` form the layout
    /// service reports.
    pub fn from_coords(coords: &[f64]) -> Result<Self, LayoutError> {
        if coords.len() != 8 {
            return Err(LayoutError::InvalidInput(format!(
                "polygon needs 8 coordinates, got {}",
                coords.len()
            )));
        }
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(LayoutError::InvalidInput(
                "polygon contains a non-finite coordinate".to_string(),
            ));
        }
        Ok(Self {
            points: [
                Point::new(coords[0], coords[1]),
                Point::new(coords[2], coords[3]),
                Point::new(coords[4], coords[5]),
                Point::new(coords[6], coords[7]),
            ],
        })
    }

    /// Axis-aligned rectangle as a polygon, handy for fixtures.
    pub fn from_rect(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new([
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        ])
    }
}

/// Rotation context shared by every box derived from one image: the page
/// angle reported by the layout service plus the canvas size before and after
/// rotating with expansion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RotationFrame {
    pub angle: f64,
    pub old_size: ImageSize,
    pub new_size: ImageSize,
}

impl RotationFrame {
    pub fn new(angle: f64, old_size: ImageSize, new_size: ImageSize) -> Self {
        Self {
            angle,
            old_size,
            new_size,
        }
    }

    /// Frame for an unrotated image.
    pub fn identity(size: ImageSize) -> Self {
        Self::new(0.0, size, size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxKind {
    Figure,
    Paragraph,
    Line,
}

/// Left/top/right/bottom edges of an axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edges {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// Axis-aligned rectangle tagged with the kind of layout entity it came from.
///
/// Always satisfies `left <= right` and `top <= bottom`. Geometry operations
/// return new boxes; an existing box is never modified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    kind: BoxKind,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl BoundingBox {
    pub fn new(kind: BoxKind, left: f64, top: f64, right: f64, bottom: f64) -> Result<Self, LayoutError> {
        if ![left, top, right, bottom].iter().all(|v| v.is_finite()) {
            return Err(LayoutError::InvalidInput(format!(
                "{kind:?} box has a non-finite edge"
            )));
        }
        if left > right || top > bottom {
            return Err(LayoutError::InvalidInput(format!(
                "{kind:?} box is inverted: left={left} top={top} right={right} bottom={bottom}"
            )));
        }
        Ok(Self {
            kind,
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn from_edges(kind: BoxKind, edges: Edges) -> Result<Self, LayoutError> {
        Self::new(kind, edges.left, edges.top, edges.right, edges.bottom)
    }

    /// Rotates `polygon` into the expanded canvas described by `frame` and
    /// derives the axis-aligned box from the rotated corners.
    pub fn from_polygon(kind: BoxKind, polygon: &Polygon, frame: &RotationFrame) -> Result<Self, LayoutError> {
        let rotated = crate::geometry::rotate_points(&polygon.points, frame.angle, frame.old_size, frame.new_size);
        let corners: [Point; 4] = [rotated[0], rotated[1], rotated[2], rotated[3]];
        Self::from_edges(kind, crate::geometry::derive_bounding_box(&corners))
    }

    pub fn kind(&self) -> BoxKind {
        self.kind
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn edges(&self) -> Edges {
        Edges {
            left: self.left,
            top: self.top,
            right: self.right,
            bottom: self.bottom,
        }
    }

    /// True when `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.left <= other.left && self.top <= other.top && self.right >= other.right && self.bottom >= other.bottom
    }
}
