//! Detector backend trait and shared types.
//!
//! The [`FaceDetector`] trait is the capability every engine provides:
//! a lifecycle (`initialize` / `dispose`) and a `detect` pass over an RGBA
//! surface. The adapter holds one backend per [`EngineKind`] and never
//! looks past this trait.
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized ──initialize──▶ Loading ──ok──▶ Ready ──dispose──▶ Disposed
//!                                  │                                  │
//!                                  └──err──▶ Error ◀──────────────────┘ (retry)
//! ```
//!
//! A failed load surfaces as [`DetectorError::Init`], never as an empty
//! result. `Error` and `Disposed` backends may be initialized again.

use crate::types::{Detection, EngineKind};
use image::RgbaImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("failed to initialize {engine} detector: {reason}")]
    Init { engine: EngineKind, reason: String },
    #[error("{engine} detection failed: {reason}")]
    Detection { engine: EngineKind, reason: String },
    #[error("no face detector has been initialized")]
    NotInitialized,
}

/// Where a backend is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendState {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Error,
    Disposed,
}

/// A face detection engine.
pub trait FaceDetector {
    /// Which engine this is.
    fn kind(&self) -> EngineKind;

    fn state(&self) -> BackendState;

    /// Load the engine's model. No-op when already ready.
    fn initialize(&mut self) -> Result<(), DetectorError>;

    fn is_ready(&self) -> bool {
        self.state() == BackendState::Ready
    }

    /// Raw detections in source-pixel coordinates, confidence in `[0, 1]`.
    ///
    /// Results are neither de-duplicated nor filtered.
    fn detect(&mut self, image: &RgbaImage) -> Result<Vec<Detection>, DetectorError>;

    /// Release the model. Safe to call in any state.
    fn dispose(&mut self);
}
