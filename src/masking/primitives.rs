//! Region transforms applied in place to an RGBA surface.
//!
//! Masks are clipped to the ellipse inscribed in the face rectangle so they
//! read as face-shaped. The bounding-box annotator is the exception: it
//! draws an unclipped outline. Regions that fall partly or wholly outside
//! the surface are clamped; nothing here panics on odd geometry.
//!
//! | Primitive | Crate / function |
//! |---|---|
//! | Blur | `image::imageops::fast_blur` over an inflated crop, then a coarse pixel grid |
//! | Pixelate | box-filtered cell averages, nearest-neighbour fill |
//! | Emoji | [`EmojiAtlas`] artwork + `image::imageops::overlay` |
//! | Bounding box | `imageproc::drawing::draw_hollow_rect_mut` |

use super::calculations::{
    PixelRect, blur_pixel_grid, blur_radius, clamp_to_surface, emoji_size, in_ellipse, inflate,
    mosaic_block_size, mosaic_grid,
};
use super::emoji::EmojiAtlas;
use super::params::Intensity;
use crate::types::Bounds;
use image::{Rgba, RgbaImage, imageops};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// Outline colours and width for face annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationStyle {
    pub selected: Rgba<u8>,
    pub unselected: Rgba<u8>,
    pub line_width: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            selected: Rgba([0x4c, 0xaf, 0x50, 0xff]),
            unselected: Rgba([0x21, 0x96, 0xf3, 0xff]),
            line_width: 3,
        }
    }
}

/// Gaussian blur under the face ellipse, followed by a coarse pixel grid.
///
/// The blur samples a source rectangle inflated by the radius so the
/// ellipse edge does not pull in pixels from a hard crop boundary.
pub fn apply_blur(surface: &mut RgbaImage, region: &Bounds, intensity: Intensity) {
    let dims = surface.dimensions();
    let Some(span) = clamp_to_surface(region, dims) else {
        return;
    };
    let radius = blur_radius(intensity.value(), region);
    let Some(source) = clamp_to_surface(&inflate(region, radius as f64), dims) else {
        return;
    };

    let patch = imageops::crop_imm(&*surface, source.x, source.y, source.width, source.height)
        .to_image();
    let blurred = imageops::fast_blur(&patch, radius as f32);

    for y in span.y..span.bottom() {
        for x in span.x..span.right() {
            if in_ellipse(region, x, y) {
                surface.put_pixel(x, y, *blurred.get_pixel(x - source.x, y - source.y));
            }
        }
    }

    let cells = blur_pixel_grid(region);
    pixelate_span(
        surface,
        region,
        span,
        cells.min(span.width),
        cells.min(span.height),
    );
}

/// Mosaic: average blocks of the face and fill each block with its average.
pub fn apply_pixelate(surface: &mut RgbaImage, region: &Bounds, intensity: Intensity) {
    let Some(span) = clamp_to_surface(region, surface.dimensions()) else {
        return;
    };
    let block = mosaic_block_size(intensity.value(), region);
    let (cols, rows) = mosaic_grid((span.width, span.height), block);
    pixelate_span(surface, region, span, cols, rows);
}

/// Stamp `glyph` centred on the face at 90% of its short side.
///
/// The stamp never exceeds twice the surface's longer side.
pub fn apply_emoji(surface: &mut RgbaImage, region: &Bounds, glyph: &str, atlas: &mut EmojiAtlas) {
    if clamp_to_surface(region, surface.dimensions()).is_none() {
        return;
    }
    let (sw, sh) = surface.dimensions();
    let size = emoji_size(region).min(sw.max(sh).saturating_mul(2));
    let art = atlas.render(glyph, size);
    let left = (region.x + region.width / 2.0 - art.width() as f64 / 2.0).round() as i64;
    let top = (region.y + region.height / 2.0 - art.height() as f64 / 2.0).round() as i64;
    imageops::overlay(surface, &art, left, top);
}

/// Widest outline stroke drawn, in pixels.
const MAX_LINE_WIDTH: u32 = 256;

/// Outline a face, coloured by selection state.
///
/// The rectangle is first clipped to the surface grown by the stroke width,
/// so far-off or huge regions never reach the integer drawing maths.
pub fn draw_bounding_box(
    surface: &mut RgbaImage,
    region: &Bounds,
    selected: bool,
    style: &AnnotationStyle,
) {
    let finite = [region.x, region.y, region.width, region.height]
        .iter()
        .all(|v| v.is_finite());
    if !finite || region.width < 0.0 || region.height < 0.0 {
        return;
    }

    let line_width = style.line_width.clamp(1, MAX_LINE_WIDTH) as i32;
    let margin = f64::from(line_width + 1);
    let (sw, sh) = surface.dimensions();
    let x0 = region.x.round().max(-margin);
    let y0 = region.y.round().max(-margin);
    let x1 = region.right().round().min(f64::from(sw) + margin);
    let y1 = region.bottom().round().min(f64::from(sh) + margin);
    if x1 < x0 || y1 < y0 {
        return;
    }

    let color = if selected {
        style.selected
    } else {
        style.unselected
    };
    let (x, y) = (x0 as i32, y0 as i32);
    let (w, h) = ((x1 - x0) as i32, (y1 - y0) as i32);

    // Stroke centred on the rectangle edge, one ring per pixel of width.
    for ring in 0..line_width {
        let offset = ring - line_width / 2;
        let (rw, rh) = (w - 2 * offset, h - 2 * offset);
        if rw <= 0 || rh <= 0 {
            continue;
        }
        let rect = Rect::at(x + offset, y + offset).of_size(rw as u32, rh as u32);
        draw_hollow_rect_mut(surface, rect, color);
    }
}

/// Replace every in-ellipse pixel of `span` with the average of its grid cell.
fn pixelate_span(surface: &mut RgbaImage, region: &Bounds, span: PixelRect, cols: u32, rows: u32) {
    let cols = cols.clamp(1, span.width);
    let rows = rows.clamp(1, span.height);
    let cell_of = |x: u32, y: u32| -> usize {
        let cx = (x - span.x) as u64 * cols as u64 / span.width as u64;
        let cy = (y - span.y) as u64 * rows as u64 / span.height as u64;
        (cy * cols as u64 + cx) as usize
    };

    let cell_count = (cols * rows) as usize;
    let mut sums = vec![[0u64; 4]; cell_count];
    let mut counts = vec![0u64; cell_count];
    for y in span.y..span.bottom() {
        for x in span.x..span.right() {
            let cell = cell_of(x, y);
            let px = surface.get_pixel(x, y);
            for (sum, channel) in sums[cell].iter_mut().zip(px.0) {
                *sum += channel as u64;
            }
            counts[cell] += 1;
        }
    }

    let averages: Vec<Rgba<u8>> = sums
        .iter()
        .zip(&counts)
        .map(|(sum, &n)| {
            let n = n.max(1);
            Rgba(sum.map(|s| ((s + n / 2) / n) as u8))
        })
        .collect();

    for y in span.y..span.bottom() {
        for x in span.x..span.right() {
            if in_ellipse(region, x, y) {
                surface.put_pixel(x, y, averages[cell_of(x, y)]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8px black/white checkerboard; any blur visibly changes it.
    fn checkerboard(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            if (x / 8 + y / 8) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        })
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 2 % 256) as u8, (y * 2 % 256) as u8, 128, 255])
        })
    }

    #[test]
    fn blur_changes_face_interior() {
        let original = checkerboard(100, 100);
        let mut surface = original.clone();
        let region = Bounds::new(20.0, 20.0, 60.0, 60.0);
        apply_blur(&mut surface, &region, Intensity::new(50));

        let changed = (30..70)
            .flat_map(|y| (30..70).map(move |x| (x, y)))
            .filter(|&(x, y)| surface.get_pixel(x, y) != original.get_pixel(x, y))
            .count();
        assert!(changed > 800, "only {changed} pixels changed");
    }

    #[test]
    fn blur_leaves_outside_ellipse_untouched() {
        let original = checkerboard(100, 100);
        let mut surface = original.clone();
        let region = Bounds::new(20.0, 20.0, 60.0, 60.0);
        apply_blur(&mut surface, &region, Intensity::new(100));

        // Rectangle corners lie outside the inscribed ellipse.
        assert_eq!(surface.get_pixel(20, 20), original.get_pixel(20, 20));
        assert_eq!(surface.get_pixel(79, 79), original.get_pixel(79, 79));
        // Outside the rectangle entirely.
        assert_eq!(surface.get_pixel(5, 50), original.get_pixel(5, 50));
        assert_eq!(surface.get_pixel(95, 50), original.get_pixel(95, 50));
    }

    #[test]
    fn blur_is_deterministic() {
        let region = Bounds::new(10.0, 10.0, 50.0, 40.0);
        let mut a = checkerboard(80, 80);
        let mut b = checkerboard(80, 80);
        apply_blur(&mut a, &region, Intensity::new(35));
        apply_blur(&mut b, &region, Intensity::new(35));
        assert_eq!(a, b);
    }

    #[test]
    fn blur_outside_surface_is_noop() {
        let original = checkerboard(50, 50);
        let mut surface = original.clone();
        apply_blur(&mut surface, &Bounds::new(100.0, 100.0, 40.0, 40.0), Intensity::new(80));
        assert_eq!(surface, original);
    }

    #[test]
    fn blur_partially_outside_surface_does_not_panic() {
        let mut surface = checkerboard(50, 50);
        apply_blur(&mut surface, &Bounds::new(30.0, -10.0, 40.0, 40.0), Intensity::new(80));
        apply_blur(&mut surface, &Bounds::new(-5.0, 45.0, 3.0, 3.0), Intensity::new(1));
    }

    #[test]
    fn pixelate_fills_cells_uniformly() {
        let mut surface = gradient(100, 100);
        let region = Bounds::new(0.0, 0.0, 100.0, 100.0);
        apply_pixelate(&mut surface, &region, Intensity::new(50));

        // block 10 → pixels 40..50 share a cell
        assert_eq!(surface.get_pixel(41, 42), surface.get_pixel(48, 47));
        assert_ne!(surface.get_pixel(41, 42), surface.get_pixel(51, 42));
    }

    #[test]
    fn pixelate_cell_is_box_average() {
        let mut surface = gradient(100, 100);
        let original = surface.clone();
        let region = Bounds::new(0.0, 0.0, 100.0, 100.0);
        apply_pixelate(&mut surface, &region, Intensity::new(50));

        // Cell (4, 4) covers x, y in 40..50: red = 2x averages to 89.
        let px = surface.get_pixel(45, 45);
        assert_eq!(px[0], 89);
        assert_eq!(px[1], 89);
        assert_eq!(px[2], original.get_pixel(45, 45)[2]);
    }

    #[test]
    fn pixelate_respects_ellipse() {
        let original = gradient(100, 100);
        let mut surface = original.clone();
        apply_pixelate(
            &mut surface,
            &Bounds::new(0.0, 0.0, 100.0, 100.0),
            Intensity::new(100),
        );
        assert_eq!(surface.get_pixel(1, 1), original.get_pixel(1, 1));
    }

    #[test]
    fn pixelate_tiny_region_does_not_panic() {
        let mut surface = gradient(10, 10);
        apply_pixelate(&mut surface, &Bounds::new(9.5, 9.5, 0.4, 0.4), Intensity::new(100));
        apply_pixelate(&mut surface, &Bounds::new(0.0, 0.0, 1.0, 1.0), Intensity::new(1));
    }

    #[test]
    fn emoji_covers_face_centre_opaquely() {
        let mut surface = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let mut atlas = EmojiAtlas::builtin();
        apply_emoji(
            &mut surface,
            &Bounds::new(25.0, 25.0, 50.0, 50.0),
            "😊",
            &mut atlas,
        );

        let centre = surface.get_pixel(50, 50);
        assert_ne!(*centre, Rgba([0, 0, 0, 255]));
        assert_eq!(centre[3], 255);
        // Outside the stamp nothing changes.
        assert_eq!(*surface.get_pixel(5, 5), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn emoji_off_surface_is_noop() {
        let original = RgbaImage::from_pixel(20, 20, Rgba([9, 9, 9, 255]));
        let mut surface = original.clone();
        let mut atlas = EmojiAtlas::builtin();
        apply_emoji(
            &mut surface,
            &Bounds::new(-100.0, -100.0, 50.0, 50.0),
            "😊",
            &mut atlas,
        );
        assert_eq!(surface, original);
    }

    #[test]
    fn emoji_on_huge_face_is_capped_to_surface() {
        let mut surface = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let mut atlas = EmojiAtlas::builtin();
        apply_emoji(
            &mut surface,
            &Bounds::new(-1e6, -1e6, 2e6, 2e6),
            "😊",
            &mut atlas,
        );
        // 200px stamp centred on the origin covers the top-left corner.
        assert_ne!(*surface.get_pixel(10, 10), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn bounding_box_colour_follows_selection() {
        let style = AnnotationStyle::default();
        let region = Bounds::new(10.0, 10.0, 30.0, 30.0);

        let mut selected = RgbaImage::new(50, 50);
        draw_bounding_box(&mut selected, &region, true, &style);
        assert_eq!(*selected.get_pixel(10, 20), style.selected);

        let mut unselected = RgbaImage::new(50, 50);
        draw_bounding_box(&mut unselected, &region, false, &style);
        assert_eq!(*unselected.get_pixel(10, 20), style.unselected);
    }

    #[test]
    fn bounding_box_is_unfilled() {
        let mut surface = RgbaImage::new(50, 50);
        draw_bounding_box(
            &mut surface,
            &Bounds::new(10.0, 10.0, 30.0, 30.0),
            true,
            &AnnotationStyle::default(),
        );
        assert_eq!(*surface.get_pixel(25, 25), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn bounding_box_partly_outside_does_not_panic() {
        let mut surface = RgbaImage::new(20, 20);
        draw_bounding_box(
            &mut surface,
            &Bounds::new(-10.0, 15.0, 40.0, 40.0),
            false,
            &AnnotationStyle::default(),
        );
        draw_bounding_box(
            &mut surface,
            &Bounds::new(5.0, 5.0, 0.0, 0.0),
            false,
            &AnnotationStyle::default(),
        );
    }

    #[test]
    fn bounding_box_fully_outside_is_noop() {
        let original = RgbaImage::new(20, 20);
        let mut surface = original.clone();
        let style = AnnotationStyle::default();
        draw_bounding_box(&mut surface, &Bounds::new(-1e12, -1e12, 10.0, 10.0), true, &style);
        draw_bounding_box(&mut surface, &Bounds::new(1e12, 5.0, 10.0, 10.0), true, &style);
        draw_bounding_box(&mut surface, &Bounds::new(5.0, 100.0, 10.0, 10.0), true, &style);
        assert_eq!(surface, original);
    }

    #[test]
    fn bounding_box_larger_than_surface_draws_nothing_inside() {
        let mut surface = RgbaImage::new(20, 20);
        let style = AnnotationStyle::default();
        draw_bounding_box(&mut surface, &Bounds::new(0.0, 0.0, 1e12, 1e12), true, &style);
        // Top and left edges sit on the border; the rest is far away.
        assert_eq!(*surface.get_pixel(0, 10), style.selected);
        assert_eq!(*surface.get_pixel(10, 10), Rgba([0, 0, 0, 0]));
        assert_eq!(*surface.get_pixel(19, 19), Rgba([0, 0, 0, 0]));

        let mut surface = RgbaImage::new(20, 20);
        draw_bounding_box(&mut surface, &Bounds::new(-1e12, -1e12, 2e12, 2e12), true, &style);
        assert_eq!(surface, RgbaImage::new(20, 20));
    }

    #[test]
    fn bounding_box_with_huge_line_width_does_not_panic() {
        let mut surface = RgbaImage::new(20, 20);
        let style = AnnotationStyle {
            line_width: u32::MAX,
            ..AnnotationStyle::default()
        };
        draw_bounding_box(&mut surface, &Bounds::new(0.0, 0.0, 1e12, 1e12), false, &style);
        draw_bounding_box(&mut surface, &Bounds::new(-1e12, 3.0, 1e12, 1e12), false, &style);
    }
}
