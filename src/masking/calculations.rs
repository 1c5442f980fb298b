//! Pure calculation functions for mask geometry.
//!
//! Everything here is free of pixel buffers so it can be unit tested on
//! plain numbers. Sizes never drop below 1.

use crate::types::Bounds;

/// Scale applied to the intensity curve when deriving the blur radius.
const BLUR_SCALE: f64 = 2.5;

/// Divisor of the face's short side for the pixel grid layered over a blur.
const BLUR_GRID_DIVISOR: f64 = 16.0;

/// Minimum number of cells per axis in the blur's pixelation pass.
const BLUR_GRID_MIN: u32 = 3;

/// Divisor of the face's short side for the base mosaic block size.
const MOSAIC_BASE_DIVISOR: f64 = 10.0;

/// Smallest mosaic block edge in pixels.
const MOSAIC_MIN_BLOCK: u32 = 2;

/// Emoji edge relative to the face's short side.
const EMOJI_SCALE: f64 = 0.9;

/// Integer pixel rectangle fully inside a surface (`x + width <= surface width`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Clamp `bounds` to a `(width, height)` surface.
///
/// Partial pixels are included (floor the origin, ceil the far edge).
/// Returns `None` when nothing of the region lies on the surface, or the
/// region is degenerate (zero/negative size, non-finite coordinates).
pub fn clamp_to_surface(bounds: &Bounds, surface: (u32, u32)) -> Option<PixelRect> {
    let (sw, sh) = surface;
    let finite = [bounds.x, bounds.y, bounds.width, bounds.height]
        .iter()
        .all(|v| v.is_finite());
    if !finite || bounds.width <= 0.0 || bounds.height <= 0.0 {
        return None;
    }

    let x0 = bounds.x.floor().max(0.0);
    let y0 = bounds.y.floor().max(0.0);
    let x1 = bounds.right().ceil().min(sw as f64);
    let y1 = bounds.bottom().ceil().min(sh as f64);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    Some(PixelRect {
        x: x0 as u32,
        y: y0 as u32,
        width: (x1 - x0) as u32,
        height: (y1 - y0) as u32,
    })
}

/// Grow `bounds` by `by` pixels on every side.
pub fn inflate(bounds: &Bounds, by: f64) -> Bounds {
    Bounds::new(
        bounds.x - by,
        bounds.y - by,
        bounds.width + by * 2.0,
        bounds.height + by * 2.0,
    )
}

/// Whether the centre of pixel `(px, py)` lies in the ellipse inscribed in `bounds`.
pub fn in_ellipse(bounds: &Bounds, px: u32, py: u32) -> bool {
    let rx = bounds.width / 2.0;
    let ry = bounds.height / 2.0;
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let dx = (px as f64 + 0.5 - (bounds.x + rx)) / rx;
    let dy = (py as f64 + 0.5 - (bounds.y + ry)) / ry;
    dx * dx + dy * dy <= 1.0
}

/// Blur radius in pixels for an intensity in `1..=100`.
///
/// Grows as `(intensity/100)^1.5 * 250`, capped at half the face's short
/// side so the radius stays proportionate to the face. Never below 1.
pub fn blur_radius(intensity: u32, region: &Bounds) -> u32 {
    let i = intensity.clamp(1, 100) as f64;
    let raw = ((i / 100.0).powf(1.5) * 100.0 * BLUR_SCALE).round() as u32;
    let cap = ((region.short_side() / 2.0).floor() as u32).max(1);
    raw.clamp(1, cap)
}

/// Cells per axis for the pixelation pass layered over a blur.
pub fn blur_pixel_grid(region: &Bounds) -> u32 {
    ((region.short_side() / BLUR_GRID_DIVISOR).floor() as u32).max(BLUR_GRID_MIN)
}

/// Mosaic block edge in pixels: scales with the face size and the intensity.
///
/// Intensity 50 gives a tenth of the short side; 100 doubles it.
pub fn mosaic_block_size(intensity: u32, region: &Bounds) -> u32 {
    let base = (region.short_side() / MOSAIC_BASE_DIVISOR).floor();
    let multiplier = intensity.clamp(1, 100) as f64 / 50.0;
    ((base * multiplier).floor() as u32).max(MOSAIC_MIN_BLOCK)
}

/// Number of mosaic cells `(columns, rows)` covering a `width × height` span.
pub fn mosaic_grid(span: (u32, u32), block: u32) -> (u32, u32) {
    let block = block.max(1);
    ((span.0 / block).max(1), (span.1 / block).max(1))
}

/// Edge length of the emoji stamp for a face.
pub fn emoji_size(region: &Bounds) -> u32 {
    ((region.short_side() * EMOJI_SCALE).round() as u32).max(1)
}

/// Size of an image scaled so its longer side equals `target`, keeping aspect.
pub fn fit_longer_side(source: (u32, u32), target: u32) -> (u32, u32) {
    let (w, h) = (source.0.max(1) as f64, source.1.max(1) as f64);
    let target = target.max(1) as f64;
    if w >= h {
        (target as u32, ((h * target / w).round() as u32).max(1))
    } else {
        (((w * target / h).round() as u32).max(1), target as u32)
    }
}
