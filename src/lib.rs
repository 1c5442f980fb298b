//! # Face Masker
//!
//! Detects faces in photos and short animations and obscures the ones you
//! pick with a blur, a mosaic, or an emoji. Everything runs locally: the
//! detector is a SeetaFace cascade loaded from a model file on disk, and no
//! pixel ever leaves the process.
//!
//! # Architecture: Detect, Select, Composite, Export
//!
//! ```text
//! 1. Load      file      →  MediaSource      (validated, decoded once)
//! 2. Detect    original  →  Vec<FaceRegion>  (engine fallback + fusion)
//! 3. Select    faces     →  faces            (only selection flags change)
//! 4. Composite original  →  surface          (masks, then outlines)
//! 5. Export    surface   →  EncodedMedia     (JPEG / PNG / looping GIF)
//! ```
//!
//! The original is never written to. Every composite starts by re-blitting
//! it, so rendering twice with the same inputs gives the same pixels and a
//! deselected face is indistinguishable from a face that was never found.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Shared types: `Bounds`, `FaceRegion`, `MaskConfiguration`, engine and sensitivity enums |
//! | [`masking`] | Region transform primitives: elliptical blur, mosaic, emoji overlay, outlines |
//! | [`detection`] | Detector backends, NMS de-duplication, and the fallback/fusion adapter |
//! | [`compositor`] | Still compositor: original + faces + mask settings → display surface |
//! | [`playback`] | Frame compositor: tick-driven rendering of animations, offline recording |
//! | [`media`] | Upload validation (type, size, magic bytes) and decoding |
//! | [`export`] | Encoding composites to JPEG/PNG/GIF, face thumbnails |
//! | [`session`] | The editing session tying media, faces, detector and compositor together |
//! | [`config`] | `config.toml` loading, validation, and merging over stock defaults |
//! | [`output`] | CLI output formatting: face listings and export summaries |
//!
//! # Design Decisions
//!
//! ## Two Engines, One Cascade
//!
//! Both detector engines run the `rustface` SeetaFace cascade. The accurate
//! engine sweeps the image twice (fine and coarse windows) and merges the
//! hits; the lightweight engine does a single coarse sweep. When the
//! accurate engine finds three faces or fewer, the lightweight engine
//! cross-checks and the larger result set wins.
//!
//! ## Animations as GIF
//!
//! Animated input is decoded into frames once. The frame compositor renders
//! each frame through the same still compositor, driven by an injectable
//! tick scheduler so playback logic is testable without a clock. Export
//! records every frame and re-encodes a looping GIF with the original
//! per-frame delays.
//!
//! ## Single-Threaded Session
//!
//! Every session operation takes `&mut self`. A composite can never overlap
//! a detection pass or an engine switch, so no locking is needed.

pub mod compositor;
pub mod config;
pub mod detection;
pub mod export;
pub mod masking;
pub mod media;
pub mod output;
pub mod playback;
pub mod session;
pub mod types;
