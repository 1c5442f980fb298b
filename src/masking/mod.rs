//! Mask primitives in pure Rust, applied in place to RGBA buffers.
//!
//! | Transform | Crate / function |
//! |---|---|
//! | **Blur** | `image::imageops::fast_blur` + pixel grid |
//! | **Pixelate** | box-filtered cells |
//! | **Emoji** | PNG artwork or drawn fallback, `imageops::overlay` |
//! | **Bounding box** | `imageproc::drawing::draw_hollow_rect_mut` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for mask geometry (unit testable)
//! - **Parameters**: [`Intensity`] and [`Quality`]
//! - **Emoji**: [`EmojiAtlas`] artwork lookup
//! - **Primitives**: the transforms themselves

mod calculations;
pub mod emoji;
mod params;
pub mod primitives;

pub(crate) use calculations::clamp_to_surface;
pub use emoji::EmojiAtlas;
pub use params::{Intensity, Quality};
pub use primitives::{
    AnnotationStyle, apply_blur, apply_emoji, apply_pixelate, draw_bounding_box,
};
