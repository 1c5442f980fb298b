//! Input validation and decoding.
//!
//! A file is accepted when its extension maps to an allowed MIME type, its
//! content sniffs as that same type, and it is no larger than
//! [`MAX_FILE_SIZE`]. Accepted files decode into an immutable
//! [`MediaSource`]: a still RGBA surface or a sequence of animation frames.
//!
//! | Kind | MIME types |
//! |---|---|
//! | Still | `image/jpeg`, `image/png`, `image/webp` |
//! | Animation | `image/gif` |

use crate::playback::{AnimationFrame, AnimationSource, FrameSource, PlaybackError};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat, RgbaImage};
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Largest accepted input, in bytes.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub const STILL_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
pub const ANIMATION_MIME_TYPES: [&str; 1] = ["image/gif"];

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{name} is {size} bytes; the maximum is {max} bytes")]
    TooLarge { name: String, size: u64, max: u64 },
    #[error("{name}: unsupported file type {found} (expected JPEG, PNG, WebP or GIF)")]
    UnsupportedType { name: String, found: String },
    #[error("{name}: extension says {declared} but the content is {actual}")]
    TypeMismatch {
        name: String,
        declared: &'static str,
        actual: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{name}: cannot decode: {reason}")]
    Decode { name: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Still,
    Animation,
}

/// Facts about an accepted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaInfo {
    pub name: String,
    pub mime_type: &'static str,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub kind: MediaKind,
}

#[derive(Debug, Clone)]
pub enum MediaContent {
    Still(RgbaImage),
    Animation(AnimationSource),
}

/// A decoded original. Never modified after load.
#[derive(Debug, Clone)]
pub struct MediaSource {
    info: MediaInfo,
    content: MediaContent,
}

impl MediaSource {
    /// Validate and decode a file.
    pub fn load(path: &Path) -> Result<Self, ValidationError> {
        let name = display_name(path);
        let size = fs::metadata(path)?.len();
        check_size(&name, size)?;
        let declared = declared_mime(&name, path)?;

        let bytes = fs::read(path)?;
        let format = sniff(&name, &bytes, declared)?;
        let content = decode(&name, &bytes, format)?;
        let (width, height) = match &content {
            MediaContent::Still(image) => image.dimensions(),
            MediaContent::Animation(source) => source.dimensions(),
        };
        debug!(%name, mime = declared, width, height, "media loaded");

        Ok(Self {
            info: MediaInfo {
                name,
                mime_type: declared,
                size,
                width,
                height,
                kind: kind_of(declared),
            },
            content,
        })
    }

    /// Wrap an in-memory still.
    pub fn from_still(name: impl Into<String>, image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            info: MediaInfo {
                name: name.into(),
                mime_type: "image/png",
                size: image.as_raw().len() as u64,
                width,
                height,
                kind: MediaKind::Still,
            },
            content: MediaContent::Still(image),
        }
    }

    /// Wrap in-memory animation frames.
    pub fn from_frames(
        name: impl Into<String>,
        frames: Vec<AnimationFrame>,
    ) -> Result<Self, PlaybackError> {
        let source = AnimationSource::new(frames)?;
        let (width, height) = source.dimensions();
        let size = source
            .frames()
            .iter()
            .map(|f| f.image.as_raw().len() as u64)
            .sum();
        Ok(Self {
            info: MediaInfo {
                name: name.into(),
                mime_type: "image/gif",
                size,
                width,
                height,
                kind: MediaKind::Animation,
            },
            content: MediaContent::Animation(source),
        })
    }

    pub fn info(&self) -> &MediaInfo {
        &self.info
    }

    pub fn content(&self) -> &MediaContent {
        &self.content
    }

    /// The surface detection runs on: the still, or the first animation frame.
    pub fn first_frame(&self) -> &RgbaImage {
        match &self.content {
            MediaContent::Still(image) => image,
            MediaContent::Animation(source) => &source.frames()[0].image,
        }
    }
}

/// Check a file without decoding it. Returns its MIME type.
pub fn validate(path: &Path) -> Result<&'static str, ValidationError> {
    let name = display_name(path);
    check_size(&name, fs::metadata(path)?.len())?;
    let declared = declared_mime(&name, path)?;
    sniff(&name, &fs::read(path)?, declared)?;
    Ok(declared)
}

/// Allowed MIME type for the file's extension.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let format = ImageFormat::from_path(path).ok()?;
    allowed_mime(format)
}

pub fn is_allowed(mime_type: &str) -> bool {
    STILL_MIME_TYPES.contains(&mime_type) || ANIMATION_MIME_TYPES.contains(&mime_type)
}

fn allowed_mime(format: ImageFormat) -> Option<&'static str> {
    let mime = format.to_mime_type();
    is_allowed(mime).then_some(mime)
}

fn declared_mime(name: &str, path: &Path) -> Result<&'static str, ValidationError> {
    mime_from_extension(path).ok_or_else(|| ValidationError::UnsupportedType {
        name: name.to_string(),
        found: path.extension().map_or_else(
            || "(no extension)".to_string(),
            |e| format!(".{}", e.to_string_lossy()),
        ),
    })
}

fn kind_of(mime_type: &str) -> MediaKind {
    if ANIMATION_MIME_TYPES.contains(&mime_type) {
        MediaKind::Animation
    } else {
        MediaKind::Still
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn check_size(name: &str, size: u64) -> Result<(), ValidationError> {
    if size > MAX_FILE_SIZE {
        return Err(ValidationError::TooLarge {
            name: name.to_string(),
            size,
            max: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

/// Confirm the content matches the declared type.
fn sniff(name: &str, bytes: &[u8], declared: &'static str) -> Result<ImageFormat, ValidationError> {
    let format = image::guess_format(bytes).map_err(|_| ValidationError::UnsupportedType {
        name: name.to_string(),
        found: "unrecognized content".to_string(),
    })?;
    let actual = format.to_mime_type();
    if !is_allowed(actual) {
        return Err(ValidationError::UnsupportedType {
            name: name.to_string(),
            found: actual.to_string(),
        });
    }
    if actual != declared {
        return Err(ValidationError::TypeMismatch {
            name: name.to_string(),
            declared,
            actual: actual.to_string(),
        });
    }
    Ok(format)
}

fn decode(name: &str, bytes: &[u8], format: ImageFormat) -> Result<MediaContent, ValidationError> {
    let decode_error = |reason: String| ValidationError::Decode {
        name: name.to_string(),
        reason,
    };

    if format != ImageFormat::Gif {
        let image = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| decode_error(e.to_string()))?;
        return Ok(MediaContent::Still(image.to_rgba8()));
    }

    let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(|e| decode_error(e.to_string()))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|e| decode_error(e.to_string()))?;
    let frames = frames
        .into_iter()
        .map(|frame| {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let delay = Duration::from_micros(numer as u64 * 1000 / denom.max(1) as u64);
            AnimationFrame::new(frame.into_buffer(), delay)
        })
        .collect();
    let source = AnimationSource::new(frames).map_err(|e| decode_error(e.to_string()))?;
    Ok(MediaContent::Animation(source))
}

/// Resolve the output directory for a source file: next to it unless given.
pub fn default_output_dir(source: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(dir) => dir.to_path_buf(),
        None => source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}
