//! Writes named figures under a per-source-image folder without overwriting.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::{debug, info, warn};

pub const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Clone)]
pub struct SaveHandler {
    output_folder: PathBuf,
}

impl SaveHandler {
    pub fn new(output_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
        }
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    /// Folder that receives the figures of `source_image`:
    /// `<output>/<source file name>/`.
    pub fn folder_for(&self, source_image: &Path) -> PathBuf {
        let name = source_image
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "unnamed".into());
        self.output_folder.join(name)
    }

    /// Saves `figure` as `<name>.jpg`, falling back to `<name>_1.jpg`,
    /// `<name>_2.jpg`, ... when the name is taken. Returns the written path.
    pub fn save_figure(&self, figure: &DynamicImage, source_image: &Path, name: &str) -> Result<PathBuf> {
        let folder = self.folder_for(source_image);
        fs::create_dir_all(&folder).with_context(|| format!("Failed to create {}", folder.display()))?;

        let (path, file) = reserve_unique(&folder, name)?;
        debug!(path = %path.display(), "writing figure");

        if let Err(e) = write_jpeg(figure, file, &path) {
            // Release the reserved name so a retry can claim it again.
            if let Err(remove_err) = fs::remove_file(&path) {
                warn!(path = %path.display(), "failed to remove partial figure: {remove_err}");
            }
            return Err(e);
        }

        info!(path = %path.display(), source = %source_image.display(), "saved figure");
        Ok(path)
    }
}

fn write_jpeg(figure: &DynamicImage, file: File, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    DynamicImage::ImageRgb8(figure.to_rgb8())
        .write_with_encoder(encoder)
        .with_context(|| format!("Failed to encode {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Atomically claims the first free `<name>[_n].jpg` in `folder`.
fn reserve_unique(folder: &Path, name: &str) -> Result<(PathBuf, File)> {
    let mut duplicate_counter = 0u32;
    loop {
        let filename = if duplicate_counter == 0 {
            format!("{name}.jpg")
        } else {
            format!("{name}_{duplicate_counter}.jpg")
        };
        let path = folder.join(filename);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %path.display(), "name taken, trying next");
                duplicate_counter += 1;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to create {}", path.display())),
        }
    }
}
