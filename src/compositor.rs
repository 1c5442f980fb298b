//! Still-image compositing: original → masked (and optionally annotated) surface.
//!
//! Every pass starts from a full copy of the original, so compositing is
//! idempotent and the original is never modified. Masks are painted for
//! selected faces in array order; where selected faces overlap, the later
//! face is painted over the earlier one.

use crate::masking::{
    AnnotationStyle, EmojiAtlas, apply_blur, apply_emoji, apply_pixelate, draw_bounding_box,
};
use crate::types::{FaceRegion, MaskConfiguration, MaskType};
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("cannot composite an empty {width}x{height} surface")]
    EmptySurface { width: u32, height: u32 },
    #[error("display surface is {display:?} but the original is {original:?}")]
    SizeMismatch {
        original: (u32, u32),
        display: (u32, u32),
    },
}

/// Which layers a composite includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layers {
    /// Masks plus face outlines, for previews.
    Annotated,
    /// Masks only, for export.
    MaskOnly,
}

/// Paints masks and annotations onto a display surface.
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    atlas: EmojiAtlas,
    style: AnnotationStyle,
}

impl Compositor {
    pub fn new(atlas: EmojiAtlas, style: AnnotationStyle) -> Self {
        Self { atlas, style }
    }

    pub fn style(&self) -> &AnnotationStyle {
        &self.style
    }

    /// Re-blit `original` into `display`, then mask and annotate.
    pub fn composite(
        &mut self,
        original: &RgbaImage,
        display: &mut RgbaImage,
        faces: &[FaceRegion],
        mask: &MaskConfiguration,
        layers: Layers,
    ) -> Result<(), CompositeError> {
        let (width, height) = original.dimensions();
        if width == 0 || height == 0 {
            return Err(CompositeError::EmptySurface { width, height });
        }
        if display.dimensions() != original.dimensions() {
            return Err(CompositeError::SizeMismatch {
                original: original.dimensions(),
                display: display.dimensions(),
            });
        }

        display.copy_from_slice(original.as_raw());

        for face in faces.iter().filter(|f| f.is_selected()) {
            match mask.mask_type {
                MaskType::Blur => apply_blur(display, &face.bounds, mask.blur_intensity),
                MaskType::Pixelate => apply_pixelate(display, &face.bounds, mask.blur_intensity),
                MaskType::Emoji => apply_emoji(display, &face.bounds, &mask.emoji, &mut self.atlas),
                MaskType::None => {}
            }
        }

        if layers == Layers::Annotated {
            for face in faces {
                draw_bounding_box(display, &face.bounds, face.is_selected(), &self.style);
            }
        }
        Ok(())
    }

    /// Allocate a display surface and composite into it.
    pub fn render(
        &mut self,
        original: &RgbaImage,
        faces: &[FaceRegion],
        mask: &MaskConfiguration,
        layers: Layers,
    ) -> Result<RgbaImage, CompositeError> {
        let mut display = RgbaImage::new(original.width(), original.height());
        self.composite(original, &mut display, faces, mask, layers)?;
        Ok(display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::masking::Intensity;
    use crate::types::{Bounds, Detection, EngineKind};
    use image::Rgba;

    fn photo() -> RgbaImage {
        RgbaImage::from_fn(120, 100, |x, y| {
            if (x / 6 + y / 6) % 2 == 0 {
                Rgba([220, 40, 40, 255])
            } else {
                Rgba([20, 20, 200, 255])
            }
        })
    }

    fn face(x: f64, y: f64, side: f64) -> FaceRegion {
        FaceRegion::from_detection(
            Detection::new(Bounds::new(x, y, side, side), 0.9),
            EngineKind::Accurate,
        )
    }

    fn blur(intensity: u32) -> MaskConfiguration {
        MaskConfiguration {
            blur_intensity: Intensity::new(intensity),
            ..MaskConfiguration::default()
        }
    }

    #[test]
    fn mask_none_reproduces_original() {
        let original = photo();
        let mask = MaskConfiguration {
            mask_type: MaskType::None,
            ..MaskConfiguration::default()
        };
        let out = Compositor::default()
            .render(&original, &[face(10.0, 10.0, 50.0)], &mask, Layers::MaskOnly)
            .unwrap();
        assert_eq!(out, original);
    }

    #[test]
    fn selected_face_is_masked() {
        let original = photo();
        let out = Compositor::default()
            .render(&original, &[face(20.0, 20.0, 60.0)], &blur(50), Layers::MaskOnly)
            .unwrap();
        assert_ne!(out.get_pixel(50, 50), original.get_pixel(50, 50));
        assert_eq!(out.get_pixel(5, 5), original.get_pixel(5, 5));
    }

    #[test]
    fn deselected_faces_match_empty_face_list() {
        let original = photo();
        let mut deselected = face(20.0, 20.0, 60.0);
        deselected.set_selected(false);

        let mut compositor = Compositor::default();
        let with = compositor
            .render(&original, &[deselected], &blur(80), Layers::MaskOnly)
            .unwrap();
        let without = compositor
            .render(&original, &[], &blur(80), Layers::MaskOnly)
            .unwrap();
        assert_eq!(with, without);
        assert_eq!(with, original);
    }

    #[test]
    fn composite_is_idempotent() {
        let original = photo();
        let faces = [face(10.0, 10.0, 40.0), face(60.0, 30.0, 50.0)];
        let mut compositor = Compositor::default();
        let mut display = RgbaImage::new(120, 100);

        compositor
            .composite(&original, &mut display, &faces, &blur(40), Layers::Annotated)
            .unwrap();
        let first = display.clone();
        compositor
            .composite(&original, &mut display, &faces, &blur(40), Layers::Annotated)
            .unwrap();
        assert_eq!(display, first);
    }

    #[test]
    fn original_is_not_modified() {
        let original = photo();
        let copy = original.clone();
        Compositor::default()
            .render(&original, &[face(0.0, 0.0, 100.0)], &blur(100), Layers::Annotated)
            .unwrap();
        assert_eq!(original, copy);
    }

    #[test]
    fn annotations_only_in_annotated_layer() {
        let original = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let mask = MaskConfiguration {
            mask_type: MaskType::None,
            ..MaskConfiguration::default()
        };
        let faces = [face(20.0, 20.0, 40.0)];
        let mut compositor = Compositor::default();
        let style = *compositor.style();

        let annotated = compositor
            .render(&original, &faces, &mask, Layers::Annotated)
            .unwrap();
        assert_eq!(*annotated.get_pixel(20, 40), style.selected);

        let export = compositor
            .render(&original, &faces, &mask, Layers::MaskOnly)
            .unwrap();
        assert_eq!(export, original);
    }

    #[test]
    fn unselected_faces_are_outlined_differently() {
        let original = RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255]));
        let mut f = face(20.0, 20.0, 40.0);
        f.set_selected(false);
        let mut compositor = Compositor::default();
        let style = *compositor.style();
        let out = compositor
            .render(&original, &[f], &MaskConfiguration::default(), Layers::Annotated)
            .unwrap();
        assert_eq!(*out.get_pixel(20, 40), style.unselected);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let original = photo();
        let mut display = RgbaImage::new(10, 10);
        let err = Compositor::default()
            .composite(
                &original,
                &mut display,
                &[],
                &MaskConfiguration::default(),
                Layers::MaskOnly,
            )
            .unwrap_err();
        assert!(matches!(err, CompositeError::SizeMismatch { .. }));
    }

    #[test]
    fn empty_surface_is_an_error() {
        let err = Compositor::default()
            .render(
                &RgbaImage::new(0, 0),
                &[],
                &MaskConfiguration::default(),
                Layers::MaskOnly,
            )
            .unwrap_err();
        assert!(matches!(err, CompositeError::EmptySurface { .. }));
    }

    #[test]
    fn emoji_mask_covers_face() {
        let original = photo();
        let mask = MaskConfiguration {
            mask_type: MaskType::Emoji,
            ..MaskConfiguration::default()
        };
        let out = Compositor::default()
            .render(&original, &[face(30.0, 20.0, 60.0)], &mask, Layers::MaskOnly)
            .unwrap();
        assert_ne!(out.get_pixel(60, 50), original.get_pixel(60, 50));
    }
}
