//! Keeps uploads under the layout service's request size limit.

use std::io::Cursor;

use anyhow::{Context, Result};
use figex_layout::OrientedImage;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::{debug, info};

/// Upload limit of the layout service, in bytes.
pub const DOCUMENT_INTELLIGENCE_LIMIT: usize = 1024 * 1024 * 10;

/// Re-encodes images as progressively lower-quality JPEG until they fit.
#[derive(Debug, Clone)]
pub struct ImageSizeReducer {
    pub start_quality: u8,
    pub max_size: usize,
}

impl Default for ImageSizeReducer {
    fn default() -> Self {
        Self {
            start_quality: 95,
            max_size: DOCUMENT_INTELLIGENCE_LIMIT,
        }
    }
}

impl ImageSizeReducer {
    pub fn new(start_quality: u8, max_size: usize) -> Self {
        Self {
            start_quality: start_quality.clamp(1, 100),
            max_size,
        }
    }

    /// Bytes to upload for `source`.
    ///
    /// The original file is sent untouched when it is already small enough
    /// and its pixels did not need reorienting; otherwise the oriented image
    /// is re-encoded so the service sees the same pixel grid that will be
    /// cropped.
    pub fn reduce(&self, source: &OrientedImage) -> Result<Vec<u8>> {
        if source.bytes.len() < self.max_size && !source.reoriented {
            debug!(size = source.bytes.len(), "image already under upload limit");
            return Ok(source.bytes.clone());
        }
        self.fit_jpeg(&source.image)
    }

    /// Encodes `image` as JPEG, lowering quality one step at a time until the
    /// result is smaller than `max_size`.
    pub fn fit_jpeg(&self, image: &DynamicImage) -> Result<Vec<u8>> {
        let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
        let mut quality = self.start_quality;
        loop {
            let encoded = encode_jpeg(&rgb, quality)?;
            if encoded.len() < self.max_size {
                info!(size = encoded.len(), quality, "re-encoded image for upload");
                return Ok(encoded);
            }
            debug!(size = encoded.len(), quality, "still over upload limit");
            if quality <= 1 {
                anyhow::bail!(
                    "Image does not fit under {} bytes even at JPEG quality 1 ({} bytes)",
                    self.max_size,
                    encoded.len()
                );
            }
            quality -= 1;
        }
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), quality);
    image
        .write_with_encoder(encoder)
        .with_context(|| format!("Failed to encode JPEG at quality {quality}"))?;
    Ok(bytes)
}
