//! Application configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! are overridden by a user config file in the working directory (or the
//! directory given with `--config`).
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [detection]
//! engine = "auto"           # auto | accurate | lightweight
//! sensitivity = "medium"    # low | medium | high
//! max_faces = 50
//! accurate_model = "model/seeta_fd_frontal_v1.0.bin"
//! lightweight_model = "model/seeta_fd_frontal_v1.0.bin"
//!
//! [mask]
//! type = "blur"             # blur | pixelate | emoji | none
//! blur_intensity = 20       # 1-100, also drives pixelate block size
//! emoji = "😊"
//!
//! [emoji]
//! # assets = "emoji/72x72"  # Directory of Twemoji-style PNGs
//!
//! [export]
//! format = "jpeg"           # jpeg | png
//! quality = 90              # 1-100, JPEG only
//! filename = "masked_image"
//!
//! [annotations]
//! selected = "#4caf50"
//! unselected = "#2196f3"
//! line_width = 3
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [mask]
//! type = "pixelate"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::detection::{DetectionOptions, EnginePreference};
use crate::export::{DEFAULT_FILENAME, ExportFormat, ExportOptions};
use crate::masking::{AnnotationStyle, EmojiAtlas, Intensity, Quality};
use crate::types::{DEFAULT_EMOJI, MaskConfiguration, MaskType, Sensitivity};
use image::Rgba;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Model file shipped alongside the binary.
const DEFAULT_MODEL: &str = "model/seeta_fd_frontal_v1.0.bin";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Engine choice, sensitivity and model paths.
    pub detection: DetectionConfig,
    /// Initial mask settings.
    pub mask: MaskConfig,
    /// Emoji artwork location.
    pub emoji: EmojiConfig,
    /// Output encoding.
    pub export: ExportConfig,
    /// Preview outline styling.
    pub annotations: AnnotationsConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.mask.blur_intensity) {
            return Err(ConfigError::Validation(
                "mask.blur_intensity must be 1-100".into(),
            ));
        }
        if self.mask.emoji.trim().is_empty() {
            return Err(ConfigError::Validation(
                "mask.emoji must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&self.export.quality) {
            return Err(ConfigError::Validation(
                "export.quality must be 1-100".into(),
            ));
        }
        if self.detection.max_faces == 0 {
            return Err(ConfigError::Validation(
                "detection.max_faces must be at least 1".into(),
            ));
        }
        if self.annotations.line_width == 0 {
            return Err(ConfigError::Validation(
                "annotations.line_width must be at least 1".into(),
            ));
        }
        for (key, value) in [
            ("annotations.selected", &self.annotations.selected),
            ("annotations.unselected", &self.annotations.unselected),
        ] {
            if parse_hex_color(value).is_none() {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a #rgb or #rrggbb color, got {value:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn mask_configuration(&self) -> MaskConfiguration {
        MaskConfiguration {
            mask_type: self.mask.mask_type,
            blur_intensity: Intensity::new(self.mask.blur_intensity),
            emoji: self.mask.emoji.clone(),
        }
    }

    pub fn detection_options(&self) -> DetectionOptions {
        DetectionOptions {
            min_confidence: self.detection.sensitivity.min_confidence(),
            max_faces: self.detection.max_faces,
        }
    }

    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            format: self.export.format,
            quality: Quality::new(self.export.quality),
            filename: self.export.filename.clone(),
        }
    }

    /// Outline style; colours that fail to parse fall back to the defaults.
    pub fn annotation_style(&self) -> AnnotationStyle {
        let defaults = AnnotationStyle::default();
        AnnotationStyle {
            selected: parse_hex_color(&self.annotations.selected).unwrap_or(defaults.selected),
            unselected: parse_hex_color(&self.annotations.unselected)
                .unwrap_or(defaults.unselected),
            line_width: self.annotations.line_width,
        }
    }

    pub fn emoji_atlas(&self) -> EmojiAtlas {
        EmojiAtlas::new(self.emoji.assets.as_ref().map(PathBuf::from))
    }
}

/// Face detection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Which engine to bring up first.
    pub engine: EnginePreference,
    /// Minimum-confidence preset.
    pub sensitivity: Sensitivity,
    /// Keep at most this many faces, strongest first.
    pub max_faces: usize,
    /// SeetaFace model for the accurate engine.
    pub accurate_model: String,
    /// SeetaFace model for the lightweight engine.
    pub lightweight_model: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            engine: EnginePreference::Auto,
            sensitivity: Sensitivity::Medium,
            max_faces: 50,
            accurate_model: DEFAULT_MODEL.to_string(),
            lightweight_model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Initial mask settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaskConfig {
    #[serde(rename = "type")]
    pub mask_type: MaskType,
    pub blur_intensity: u32,
    pub emoji: String,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            mask_type: MaskType::Blur,
            blur_intensity: 20,
            emoji: DEFAULT_EMOJI.to_string(),
        }
    }
}

/// Emoji artwork settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmojiConfig {
    /// Directory of `<codepoints>.png` files. When absent, a drawn smiley is used.
    pub assets: Option<String>,
}

/// Output encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub quality: u32,
    pub filename: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Jpeg,
            quality: 90,
            filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

/// Preview outline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnnotationsConfig {
    pub selected: String,
    pub unselected: String,
    pub line_width: u32,
}

impl Default for AnnotationsConfig {
    fn default() -> Self {
        Self {
            selected: "#4caf50".to_string(),
            unselected: "#2196f3".to_string(),
            line_width: 3,
        }
    }
}

/// Parse `#rgb` or `#rrggbb` into an opaque colour.
pub fn parse_hex_color(value: &str) -> Option<Rgba<u8>> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut rgb = [0u8; 3];
            for (slot, c) in rgb.iter_mut().zip(hex.chars()) {
                *slot = channel(&c.to_string())? * 17;
            }
            Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
        }
        6 => Some(Rgba([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        ])),
        _ => None,
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Face Masker Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as config.toml in the working directory, or point the
# CLI at its directory with --config.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Face detection
# ---------------------------------------------------------------------------
[detection]
# auto tries the accurate engine and falls back to the lightweight one.
# accurate | lightweight pin a single engine.
engine = "auto"

# Minimum detection confidence: low (0.1), medium (0.25), high (0.5).
sensitivity = "medium"

# Keep at most this many faces, strongest first.
max_faces = 50

# SeetaFace frontal model files. Relative paths resolve against the
# working directory.
accurate_model = "model/seeta_fd_frontal_v1.0.bin"
lightweight_model = "model/seeta_fd_frontal_v1.0.bin"

# ---------------------------------------------------------------------------
# Mask applied to selected faces
# ---------------------------------------------------------------------------
[mask]
# blur | pixelate | emoji | none   ("mosaic" is accepted for pixelate)
type = "blur"

# Strength, 1-100. Drives both blur radius and pixelate block size.
blur_intensity = 20

# Glyph stamped by the emoji mask.
emoji = "😊"

# ---------------------------------------------------------------------------
# Emoji artwork
# ---------------------------------------------------------------------------
[emoji]
# Directory of PNGs named by code point, e.g. 1f60a.png (Twemoji layout).
# Without it, a drawn smiley covers the face.
# assets = "emoji/72x72"

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# jpeg | png. Animations always export as GIF.
format = "jpeg"

# JPEG quality (1 = worst, 100 = best). Ignored for PNG.
quality = 90

# Base name of the exported file; the extension is added.
filename = "masked_image"

# ---------------------------------------------------------------------------
# Preview annotations
# ---------------------------------------------------------------------------
[annotations]
selected = "#4caf50"
unselected = "#2196f3"
line_width = 3
"##
}
