//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Output is **face-centric, not file-centric**. Each detected face is
//! listed by its positional index, which is also the index `--deselect`
//! accepts, with its selection state, confidence and location. File paths
//! appear as secondary, indented context.
//!
//! # Output Format
//!
//! ## Detect
//!
//! ```text
//! party.jpg (1200x800, image/jpeg)
//!     Detector: accurate
//! Faces
//! 001 [x] 92% at (120, 80) 64x64
//! 002 [ ] 41% at (600, 210) 40x40 (lightweight)
//! 2 faces, 1 selected
//! ```
//!
//! ## Mask
//!
//! ```text
//! Masked 1 of 2 faces with blur (intensity 20)
//!     Output: out/masked_image.jpg (48213 bytes)
//! ```
//!
//! ## Presets
//!
//! ```text
//! Sensitivity
//!     low     Low (Strict - 90%+), min confidence 10%
//! Mask types
//!     blur, pixelate, emoji, none
//! Emoji
//!     😊 😀 😎 ...
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure and do no I/O.

use crate::media::MediaInfo;
use crate::types::{
    EMOJI_PRESETS, EngineKind, FaceRegion, MaskConfiguration, MaskType, Sensitivity,
};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// One face: index, selection box, confidence, position and size.
///
/// The engine is only named when it differs from the active one.
///
/// ```text
/// 001 [x] 92% at (120, 80) 64x64
/// ```
fn face_line(index: usize, face: &FaceRegion, active: Option<EngineKind>) -> String {
    let mark = if face.is_selected() { "x" } else { " " };
    let mut line = format!(
        "{} [{}] {:.0}% at ({:.0}, {:.0}) {:.0}x{:.0}",
        format_index(index),
        mark,
        face.confidence * 100.0,
        face.bounds.x,
        face.bounds.y,
        face.bounds.width,
        face.bounds.height,
    );
    if active != Some(face.detected_by) {
        line.push_str(&format!(" ({})", face.detected_by));
    }
    line
}

fn mask_summary(mask: &MaskConfiguration) -> String {
    match mask.mask_type {
        MaskType::Blur | MaskType::Pixelate => format!(
            "{} (intensity {})",
            mask.mask_type,
            mask.blur_intensity.value()
        ),
        MaskType::Emoji => format!("emoji {}", mask.emoji),
        MaskType::None => "no mask".to_string(),
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Format the result of a detection pass.
pub fn format_detection(
    media: &MediaInfo,
    active: Option<EngineKind>,
    faces: &[FaceRegion],
) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}x{}, {})",
        media.name, media.width, media.height, media.mime_type
    )];
    if let Some(engine) = active {
        lines.push(format!("{}Detector: {}", indent(1), engine));
    }

    if faces.is_empty() {
        lines.push("No faces detected".to_string());
        return lines;
    }

    lines.push("Faces".to_string());
    for (i, face) in faces.iter().enumerate() {
        lines.push(face_line(i + 1, face, active));
    }
    let selected = faces.iter().filter(|f| f.is_selected()).count();
    lines.push(format!("{}, {} selected", plural(faces.len(), "face"), selected));
    lines
}

pub fn print_detection(media: &MediaInfo, active: Option<EngineKind>, faces: &[FaceRegion]) {
    for line in format_detection(media, active, faces) {
        println!("{}", line);
    }
}

/// Format the result of an export.
pub fn format_export(
    output: &Path,
    bytes: usize,
    faces: &[FaceRegion],
    mask: &MaskConfiguration,
) -> Vec<String> {
    let selected = faces.iter().filter(|f| f.is_selected()).count();
    vec![
        format!(
            "Masked {} of {} with {}",
            selected,
            plural(faces.len(), "face"),
            mask_summary(mask)
        ),
        format!("{}Output: {} ({} bytes)", indent(1), output.display(), bytes),
    ]
}

pub fn print_export(
    output: &Path,
    bytes: usize,
    faces: &[FaceRegion],
    mask: &MaskConfiguration,
) {
    for line in format_export(output, bytes, faces, mask) {
        println!("{}", line);
    }
}

/// Format a written file (preview image, faces manifest, config).
pub fn format_written(what: &str, path: &Path) -> Vec<String> {
    vec![format!("Wrote {}", what), format!("{}{}", indent(1), path.display())]
}

pub fn print_written(what: &str, path: &Path) {
    for line in format_written(what, path) {
        println!("{}", line);
    }
}

/// Format the sensitivity levels, mask types and emoji presets.
pub fn format_presets() -> Vec<String> {
    let mut lines = vec!["Sensitivity".to_string()];
    for level in Sensitivity::ALL {
        lines.push(format!(
            "{}{:<8}{}, min confidence {:.0}%",
            indent(1),
            level.as_str(),
            level.label(),
            level.min_confidence() * 100.0
        ));
    }
    lines.push("Mask types".to_string());
    let types: Vec<&str> = MaskType::ALL.iter().map(|t| t.as_str()).collect();
    lines.push(format!("{}{}", indent(1), types.join(", ")));
    lines.push("Emoji".to_string());
    lines.push(format!("{}{}", indent(1), EMOJI_PRESETS.join(" ")));
    lines
}

pub fn print_presets() {
    for line in format_presets() {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
