//! Shared types passed between detection, masking, the session, and the CLI.
//!
//! Faces are created once per detection pass and then only their selection
//! flag changes. The mask configuration is a single session-wide value.

use crate::masking::Intensity;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identity of a detected face, unique per detection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceId(Uuid);

impl FaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Axis-aligned rectangle in source-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Length of the shorter side, never negative.
    pub fn short_side(&self) -> f64 {
        self.width.min(self.height).max(0.0)
    }

    /// Area shared with `other` (0 when disjoint).
    pub fn intersection_area(&self, other: &Bounds) -> f64 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
    }
}

/// Which detection engine produced a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Higher-accuracy engine, tried first.
    Accurate,
    /// Cheaper engine used as fallback and for cross-checking.
    Lightweight,
}

impl EngineKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EngineKind::Accurate => "accurate",
            EngineKind::Lightweight => "lightweight",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw detector hit, before de-duplication and before it gets an identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bounds: Bounds,
    /// Normalized to `[0, 1]`.
    pub confidence: f64,
}

impl Detection {
    pub fn new(bounds: Bounds, confidence: f64) -> Self {
        Self { bounds, confidence }
    }
}

/// A detected face as seen by the rest of the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub id: FaceId,
    pub bounds: Bounds,
    pub confidence: f64,
    pub detected_by: EngineKind,
    is_selected: bool,
    /// Small JPEG preview of the face crop.
    #[serde(skip)]
    pub thumbnail: Option<Vec<u8>>,
}

impl FaceRegion {
    /// Create a selected face from a detector hit.
    pub fn from_detection(detection: Detection, detected_by: EngineKind) -> Self {
        Self {
            id: FaceId::new(),
            bounds: detection.bounds,
            confidence: detection.confidence,
            detected_by,
            is_selected: true,
            thumbnail: None,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.is_selected = selected;
    }

    pub fn toggle(&mut self) {
        self.is_selected = !self.is_selected;
    }
}

/// Visual transform applied to every selected face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskType {
    #[default]
    Blur,
    #[serde(alias = "mosaic")]
    Pixelate,
    Emoji,
    None,
}

impl MaskType {
    pub const ALL: [MaskType; 4] = [
        MaskType::Blur,
        MaskType::Pixelate,
        MaskType::Emoji,
        MaskType::None,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MaskType::Blur => "blur",
            MaskType::Pixelate => "pixelate",
            MaskType::Emoji => "emoji",
            MaskType::None => "none",
        }
    }
}

impl fmt::Display for MaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emoji used by default and offered as presets.
pub const DEFAULT_EMOJI: &str = "😊";

pub const EMOJI_PRESETS: [&str; 18] = [
    "😊", "😀", "😎", "🙈", "🙂", "😺", "🌟", "⭐", "❤️", "💙", "🔵", "🟢", "🎭", "🤖",
    "👻", "💀", "🎃", "👽",
];

/// Session-wide mask settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskConfiguration {
    pub mask_type: MaskType,
    pub blur_intensity: Intensity,
    pub emoji: String,
}

impl Default for MaskConfiguration {
    fn default() -> Self {
        Self {
            mask_type: MaskType::Blur,
            blur_intensity: Intensity::new(20),
            emoji: DEFAULT_EMOJI.to_string(),
        }
    }
}

/// Named detection sensitivity, mapped onto a minimum confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl Sensitivity {
    pub const ALL: [Sensitivity; 3] = [Sensitivity::Low, Sensitivity::Medium, Sensitivity::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Sensitivity::Low => "low",
            Sensitivity::Medium => "medium",
            Sensitivity::High => "high",
        }
    }

    pub fn min_confidence(self) -> f64 {
        match self {
            Sensitivity::Low => 0.1,
            Sensitivity::Medium => 0.25,
            Sensitivity::High => 0.5,
        }
    }

    /// Human-readable name shown in the `presets` listing.
    pub fn label(self) -> &'static str {
        match self {
            Sensitivity::Low => "Low (Strict - 90%+)",
            Sensitivity::Medium => "Medium - 75%+",
            Sensitivity::High => "High (Permissive - 50%+)",
        }
    }
}
