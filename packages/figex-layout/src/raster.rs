//! Raster side of figure extraction: orientation, rotation with canvas
//! expansion, and cropping boxes out of the rotated canvas.

use std::io::Cursor;
use std::path::Path;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};

use crate::engine::LayoutError;
use crate::region::{BoundingBox, ImageSize};

/// A decoded image with its EXIF orientation already applied.
#[derive(Debug, Clone)]
pub struct OrientedImage {
    pub image: DynamicImage,
    /// The undecoded file contents.
    pub bytes: Vec<u8>,
    /// Whether applying the orientation changed the pixel grid.
    pub reoriented: bool,
}

impl OrientedImage {
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.image.width(), self.image.height())
    }
}

pub fn load_oriented(path: &Path) -> Result<OrientedImage, LayoutError> {
    let bytes = std::fs::read(path)?;
    decode_oriented(bytes)
}

pub fn decode_oriented(bytes: Vec<u8>) -> Result<OrientedImage, LayoutError> {
    let (image, orientation) = {
        let mut decoder = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()?
            .into_decoder()?;
        let orientation = decoder.orientation()?;
        (DynamicImage::from_decoder(decoder)?, orientation)
    };
    let mut image = image;
    let reoriented = !matches!(orientation, Orientation::NoTransforms);
    if reoriented {
        image.apply_orientation(orientation);
    }
    Ok(OrientedImage {
        image,
        bytes,
        reoriented,
    })
}

// Trig terms are rounded to 15 decimals so quarter turns come out exact.
fn rotation_terms(angle_degrees: f64) -> (f64, f64) {
    let theta = -angle_degrees.to_radians();
    let round = |v: f64| (v * 1e15).round() / 1e15;
    (round(theta.cos()), round(theta.sin()))
}

/// Canvas size after rotating an image of `size` counter-clockwise by
/// `angle_degrees` with expansion, so no content is clipped.
///
/// Matches PIL's `rotate(expand=True)`: corners are rotated about the image
/// center, then the canvas spans `ceil(max) - floor(min)` on each axis.
/// Quarter turns are transposes and only swap the dimensions.
pub fn rotated_canvas_size(size: ImageSize, angle_degrees: f64) -> ImageSize {
    match quarter_turn(angle_degrees) {
        Some(0 | 180) => return size,
        Some(_) => return ImageSize::new(size.height, size.width),
        None => {}
    }
    let (cos, sin) = rotation_terms(angle_degrees);
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    let (cx, cy) = (w / 2.0, h / 2.0);
    let offset_x = cos * -cx + sin * -cy + cx;
    let offset_y = -sin * -cx + cos * -cy + cy;
    let corners = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in corners {
        let tx = cos * x + sin * y + offset_x;
        let ty = -sin * x + cos * y + offset_y;
        min_x = min_x.min(tx);
        max_x = max_x.max(tx);
        min_y = min_y.min(ty);
        max_y = max_y.max(ty);
    }
    ImageSize::new(
        (max_x.ceil() - min_x.floor()) as u32,
        (max_y.ceil() - min_y.floor()) as u32,
    )
}

fn quarter_turn(angle_degrees: f64) -> Option<u32> {
    match angle_degrees.rem_euclid(360.0) {
        a if a == 0.0 => Some(0),
        a if a == 90.0 => Some(90),
        a if a == 180.0 => Some(180),
        a if a == 270.0 => Some(270),
        _ => None,
    }
}

/// Rotates `image` counter-clockwise by `angle_degrees`, growing the canvas to
/// [`rotated_canvas_size`]. Uncovered pixels are black.
///
/// Quarter turns are lossless transposes; any other angle is warped with
/// nearest-neighbour sampling into an RGB canvas, the source center landing on
/// the canvas center.
pub fn rotate_expand(image: &DynamicImage, angle_degrees: f64) -> DynamicImage {
    match quarter_turn(angle_degrees) {
        Some(0) => return image.clone(),
        Some(90) => return image.rotate270(),
        Some(180) => return image.rotate180(),
        Some(270) => return image.rotate90(),
        _ => {}
    }

    let source = image.to_rgb8();
    let old = ImageSize::new(source.width(), source.height());
    let new = rotated_canvas_size(old, angle_degrees);

    let projection = Projection::translate(new.width as f32 / 2.0, new.height as f32 / 2.0)
        * Projection::rotate(-angle_degrees.to_radians() as f32)
        * Projection::translate(-(old.width as f32) / 2.0, -(old.height as f32) / 2.0);

    let mut canvas = RgbImage::new(new.width, new.height);
    warp_into(&source, &projection, Interpolation::Nearest, Rgb([0, 0, 0]), &mut canvas);
    DynamicImage::ImageRgb8(canvas)
}

/// Pixel rectangle `(x, y, width, height)` covered by `region` on a canvas of
/// `size`: left/top are floored, right/bottom ceiled, then clamped to the
/// canvas.
pub fn pixel_bounds(region: &BoundingBox, size: ImageSize) -> Result<(u32, u32, u32, u32), LayoutError> {
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    let left = region.left().floor().clamp(0.0, w);
    let top = region.top().floor().clamp(0.0, h);
    let right = region.right().ceil().clamp(0.0, w);
    let bottom = region.bottom().ceil().clamp(0.0, h);

    if right <= left || bottom <= top {
        return Err(LayoutError::InvalidInput(format!(
            "region ({}, {}, {}, {}) does not intersect the {}x{} canvas",
            region.left(),
            region.top(),
            region.right(),
            region.bottom(),
            size.width,
            size.height
        )));
    }
    Ok((left as u32, top as u32, (right - left) as u32, (bottom - top) as u32))
}

pub fn crop_region(image: &DynamicImage, region: &BoundingBox) -> Result<DynamicImage, LayoutError> {
    let (x, y, width, height) = pixel_bounds(region, ImageSize::new(image.width(), image.height()))?;
    Ok(image.crop_imm(x, y, width, height))
}
