//! Encoding composited surfaces into downloadable files.
//!
//! | Output | Encoder |
//! |---|---|
//! | Still JPEG | `image::codecs::jpeg::JpegEncoder` (RGB, quality 1-100) |
//! | Still PNG | `image::codecs::png::PngEncoder` (lossless, quality ignored) |
//! | Animation | `image::codecs::gif::GifEncoder`, infinite loop |
//! | Face thumbnail | 80×80 JPEG at quality 80 |
//!
//! Encoding happens in memory; [`EncodedMedia::save`] is the only step
//! that touches the filesystem.

use crate::masking::{Quality, clamp_to_surface};
use crate::playback::AnimationFrame;
use crate::types::Bounds;
use image::codecs::gif::{GifEncoder, Repeat};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{Delay, DynamicImage, ExtendedColorType, Frame, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filename used when the caller gives none.
pub const DEFAULT_FILENAME: &str = "masked_image";

const THUMBNAIL_SIZE: u32 = 80;
const THUMBNAIL_QUALITY: u8 = 80;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("nothing to export: surface is {width}x{height}")]
    EmptySurface { width: u32, height: u32 },
    #[error("nothing to export: no frames were rendered")]
    NoFrames,
    #[error("encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Still-image output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    #[serde(alias = "jpg")]
    Jpeg,
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Png => "png",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::Png => "image/png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub quality: Quality,
    /// Base name; the extension is added on export.
    pub filename: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Jpeg,
            quality: Quality::default(),
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

/// An encoded file, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedMedia {
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl EncodedMedia {
    /// Write the file into `dir`, creating the directory if needed.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// `stem` with `extension` appended, unless it already ends with it.
pub fn output_filename(stem: &str, extension: &str) -> String {
    let stem = stem.trim();
    let stem = if stem.is_empty() { DEFAULT_FILENAME } else { stem };
    let suffix = format!(".{extension}");
    if stem.to_ascii_lowercase().ends_with(&suffix) {
        stem.to_string()
    } else {
        format!("{stem}{suffix}")
    }
}

/// Encode a composited still.
pub fn export_still(
    surface: &RgbaImage,
    options: &ExportOptions,
) -> Result<EncodedMedia, ExportError> {
    let (width, height) = surface.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::EmptySurface { width, height });
    }

    let bytes = match options.format {
        ExportFormat::Jpeg => encode_jpeg(surface, options.quality.as_u8())?,
        ExportFormat::Png => {
            let mut buffer = Vec::new();
            PngEncoder::new(&mut buffer).write_image(
                surface.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )?;
            buffer
        }
    };

    Ok(EncodedMedia {
        filename: output_filename(&options.filename, options.format.extension()),
        mime_type: options.format.mime_type(),
        bytes,
    })
}

/// Encode rendered frames as an infinitely looping GIF.
pub fn export_video(
    frames: &[AnimationFrame],
    filename: &str,
) -> Result<EncodedMedia, ExportError> {
    let first = frames.first().ok_or(ExportError::NoFrames)?;
    let (width, height) = first.image.dimensions();
    if width == 0 || height == 0 {
        return Err(ExportError::EmptySurface { width, height });
    }

    let mut bytes = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder.set_repeat(Repeat::Infinite)?;
        for frame in frames {
            let delay = Delay::from_saturating_duration(frame.delay);
            encoder.encode_frame(Frame::from_parts(frame.image.clone(), 0, 0, delay))?;
        }
    }

    Ok(EncodedMedia {
        filename: output_filename(filename, "gif"),
        mime_type: "image/gif",
        bytes,
    })
}

/// Small square JPEG preview of a face crop. `None` when the face is off-surface.
pub fn face_thumbnail(
    original: &RgbaImage,
    bounds: &Bounds,
) -> Result<Option<Vec<u8>>, ExportError> {
    let Some(span) = clamp_to_surface(bounds, original.dimensions()) else {
        return Ok(None);
    };
    let crop = imageops::crop_imm(original, span.x, span.y, span.width, span.height).to_image();
    let thumb = imageops::resize(&crop, THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Triangle);
    Ok(Some(encode_jpeg(&thumb, THUMBNAIL_QUALITY)?))
}

fn encode_jpeg(surface: &RgbaImage, quality: u8) -> Result<Vec<u8>, ExportError> {
    let rgb = DynamicImage::ImageRgba8(surface.clone()).into_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
}
