//! Coordinate transforms and predicates over layout boxes.
//!
//! Everything here is pure: boxes go in, new boxes come out.

use crate::engine::LayoutError;
use crate::region::{BoundingBox, BoxKind, Edges, ImageSize, Point};

/// Maps points reported against the unrotated image onto the canvas produced
/// by rotating that image counter-clockwise by `angle_degrees` with expansion.
///
/// Each point is rotated about the center of the original image by
/// `-angle_degrees`, then shifted by the padding the canvas gained on each
/// side, `floor((new - old) / 2)`.
pub fn rotate_points(points: &[Point], angle_degrees: f64, old_size: ImageSize, new_size: ImageSize) -> Vec<Point> {
    let theta = -angle_degrees.to_radians();
    let (sin, cos) = theta.sin_cos();

    let center_x = f64::from(old_size.width) / 2.0;
    let center_y = f64::from(old_size.height) / 2.0;
    let bias_x = padding(old_size.width, new_size.width);
    let bias_y = padding(old_size.height, new_size.height);

    points
        .iter()
        .map(|p| {
            let dx = p.x - center_x;
            let dy = p.y - center_y;
            Point::new(
                cos * dx - sin * dy + center_x + bias_x,
                sin * dx + cos * dy + center_y + bias_y,
            )
        })
        .collect()
}

// Floor division, so a shrinking canvas still rounds toward negative infinity.
fn padding(old: u32, new: u32) -> f64 {
    (i64::from(new) - i64::from(old)).div_euclid(2) as f64
}

/// Axis-aligned edges of a rotated quadrilateral whose corners are ordered
/// top-left, top-right, bottom-right, bottom-left.
///
/// Each edge only looks at the two corners on its side. For a polygon that is
/// still noticeably skewed the result can be tighter than the true extent.
pub fn derive_bounding_box(points: &[Point; 4]) -> Edges {
    let [p0, p1, p2, p3] = points;
    Edges {
        left: p0.x.min(p3.x),
        top: p0.y.min(p1.y),
        right: p1.x.max(p2.x),
        bottom: p2.y.max(p3.y),
    }
}

/// Inclusive overlap test: touching edges count.
pub fn overlap(a: &BoundingBox, b: &BoundingBox) -> bool {
    let vertical = within(a.top(), b.top(), b.bottom()) || within(b.top(), a.top(), a.bottom());
    let horizontal = within(a.left(), b.left(), b.right()) || within(b.left(), a.left(), a.right());
    vertical && horizontal
}

fn within(value: f64, low: f64, high: f64) -> bool {
    low <= value && value <= high
}

/// Grows `bbox` by `margin` on all four sides.
pub fn extend(bbox: &BoundingBox, margin: f64) -> Result<BoundingBox, LayoutError> {
    if !margin.is_finite() || margin < 0.0 {
        return Err(LayoutError::InvalidArgument(format!(
            "margin must be a finite non-negative number, got {margin}"
        )));
    }
    BoundingBox::new(
        bbox.kind(),
        bbox.left() - margin,
        bbox.top() - margin,
        bbox.right() + margin,
        bbox.bottom() + margin,
    )
}

/// Smallest box containing `figure` and every box in `paragraphs`.
///
/// `figure` must be a [`BoxKind::Figure`] box and every paragraph a
/// [`BoxKind::Paragraph`] box.
pub fn merge_figure_with_paragraphs(figure: &BoundingBox, paragraphs: &[BoundingBox]) -> Result<BoundingBox, LayoutError> {
    if figure.kind() != BoxKind::Figure {
        return Err(LayoutError::InvalidArgument(format!(
            "figure box must be of kind Figure, got {:?}",
            figure.kind()
        )));
    }
    if let Some(stray) = paragraphs.iter().find(|p| p.kind() != BoxKind::Paragraph) {
        return Err(LayoutError::InvalidArgument(format!(
            "boxes merged into a figure must be of kind Paragraph, got {:?}",
            stray.kind()
        )));
    }

    let merged = paragraphs.iter().fold(figure.edges(), |acc, p| Edges {
        left: acc.left.min(p.left()),
        top: acc.top.min(p.top()),
        right: acc.right.max(p.right()),
        bottom: acc.bottom.max(p.bottom()),
    });
    BoundingBox::from_edges(BoxKind::Figure, merged)
}
