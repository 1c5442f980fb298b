//! Face detection: backends, de-duplication, and the adapter that drives them.
//!
//! | Piece | Role |
//! |---|---|
//! | [`FaceDetector`] | lifecycle + `detect` capability every engine provides |
//! | [`SeetaDetector`] | `rustface` cascades (accurate two-sweep, lightweight single-sweep) |
//! | [`nms`] | IoU, greedy NMS, confidence filter, top-N |
//! | [`DetectorAdapter`] | engine selection, auto fallback, cross-check fusion |

pub mod adapter;
pub mod backend;
pub mod nms;
pub mod seeta;

pub use adapter::{DetectionOptions, DetectorAdapter, EnginePreference};
pub use backend::{BackendState, DetectorError, FaceDetector};
pub use seeta::SeetaDetector;
