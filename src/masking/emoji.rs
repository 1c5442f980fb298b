//! Emoji artwork lookup for the emoji stamp mask.
//!
//! Glyph artwork is read from a directory of PNG files named after the
//! glyph's code points, the convention used by Twemoji and Noto:
//! lower-case hex code points joined by `-`, with the emoji presentation
//! selector `U+FE0F` dropped (`😊` → `1f60a.png`, `❤️` → `2764.png`).
//!
//! When no artwork is available the atlas falls back to a drawn smiley
//! disc, so an emoji mask always covers the face.

use super::calculations::fit_longer_side;
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_ellipse_mut};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Edge length of the built-in fallback artwork.
const FALLBACK_SIZE: u32 = 72;

const VARIATION_SELECTOR_16: char = '\u{fe0f}';

/// Resolves glyphs to RGBA artwork, caching what it has loaded.
#[derive(Debug, Clone, Default)]
pub struct EmojiAtlas {
    assets: Option<PathBuf>,
    cache: HashMap<String, RgbaImage>,
}

impl EmojiAtlas {
    /// Atlas reading artwork from `assets` when present.
    pub fn new(assets: Option<PathBuf>) -> Self {
        Self {
            assets,
            cache: HashMap::new(),
        }
    }

    /// Atlas that only draws the fallback artwork.
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn assets_dir(&self) -> Option<&Path> {
        self.assets.as_deref()
    }

    /// File stem of the artwork for `glyph`.
    pub fn asset_name(glyph: &str) -> String {
        glyph
            .chars()
            .filter(|c| *c != VARIATION_SELECTOR_16)
            .map(|c| format!("{:x}", c as u32))
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Artwork for `glyph`, scaled so its longer side is `size` pixels.
    pub fn render(&mut self, glyph: &str, size: u32) -> RgbaImage {
        let artwork = self.artwork(glyph);
        let (w, h) = fit_longer_side(artwork.dimensions(), size);
        if (w, h) == artwork.dimensions() {
            return artwork.clone();
        }
        image::imageops::resize(artwork, w, h, FilterType::Triangle)
    }

    fn artwork(&mut self, glyph: &str) -> &RgbaImage {
        if !self.cache.contains_key(glyph) {
            let loaded = self
                .assets
                .as_deref()
                .and_then(|dir| load_artwork(dir, glyph))
                .unwrap_or_else(fallback_artwork);
            self.cache.insert(glyph.to_string(), loaded);
        }
        &self.cache[glyph]
    }
}

fn load_artwork(dir: &Path, glyph: &str) -> Option<RgbaImage> {
    let path = dir.join(format!("{}.png", EmojiAtlas::asset_name(glyph)));
    if !path.exists() {
        debug!(glyph, path = %path.display(), "no emoji artwork, using fallback");
        return None;
    }
    match image::open(&path) {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable emoji artwork, using fallback");
            None
        }
    }
}

/// Opaque smiley disc drawn when no artwork is available.
fn fallback_artwork() -> RgbaImage {
    let face = Rgba([255, 204, 77, 255]);
    let ink = Rgba([102, 69, 0, 255]);
    let c = (FALLBACK_SIZE / 2) as i32;

    let mut img = RgbaImage::new(FALLBACK_SIZE, FALLBACK_SIZE);
    draw_filled_circle_mut(&mut img, (c, c), c - 1, face);
    draw_filled_circle_mut(&mut img, (c - 11, c - 8), 5, ink);
    draw_filled_circle_mut(&mut img, (c + 11, c - 8), 5, ink);
    // Mouth: a dark ellipse with the upper half painted over.
    draw_filled_ellipse_mut(&mut img, (c, c + 12), 15, 8, ink);
    draw_filled_ellipse_mut(&mut img, (c, c + 8), 16, 7, face);
    img
}
