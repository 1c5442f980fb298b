//! Parameter types shared by the mask primitives and the encoders.
//!
//! - [`Intensity`]: mask strength (1–100, default 20). Clamped on construction.
//! - [`Quality`]: lossy encoding quality (1–100, default 90). Clamped on construction.

/// Mask strength for blur and pixelation (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Intensity(u32);

impl Intensity {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Intensity {
    fn default() -> Self {
        Self(20)
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Value as the `u8` the JPEG encoder expects.
    pub fn as_u8(self) -> u8 {
        self.0 as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}
