//! Engine selection, fallback and result fusion over two backends.
//!
//! The adapter owns one backend per [`EngineKind`] and at most one of them
//! is active. A detection pass runs the active engine, de-duplicates and
//! filters its output, and when the accurate engine found only a handful
//! of faces it cross-checks with the lightweight engine and keeps the
//! larger set. Only then are [`FaceRegion`]s created, with fresh ids.

use super::backend::{DetectorError, FaceDetector};
use super::nms::{IOU_THRESHOLD, deduplicate, filter_by_confidence, truncate_to_strongest};
use super::seeta::SeetaDetector;
use crate::types::{Detection, EngineKind, FaceRegion};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Accurate results at or below this count trigger a lightweight cross-check.
const CROSS_CHECK_MAX_FACES: usize = 3;

/// Which engine to bring up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnginePreference {
    /// Accurate, falling back to lightweight once.
    #[default]
    Auto,
    Accurate,
    Lightweight,
}

/// Per-pass tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionOptions {
    pub min_confidence: f64,
    pub max_faces: usize,
}

impl Default for DetectionOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.25,
            max_faces: 50,
        }
    }
}

pub struct DetectorAdapter {
    accurate: Box<dyn FaceDetector>,
    lightweight: Box<dyn FaceDetector>,
    active: Option<EngineKind>,
}

impl DetectorAdapter {
    pub fn new(accurate: Box<dyn FaceDetector>, lightweight: Box<dyn FaceDetector>) -> Self {
        Self {
            accurate,
            lightweight,
            active: None,
        }
    }

    /// Adapter over the SeetaFace engines.
    pub fn seeta(
        accurate_model: impl Into<PathBuf>,
        lightweight_model: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            Box::new(SeetaDetector::accurate(accurate_model)),
            Box::new(SeetaDetector::lightweight(lightweight_model)),
        )
    }

    fn engine(&self, kind: EngineKind) -> &dyn FaceDetector {
        match kind {
            EngineKind::Accurate => self.accurate.as_ref(),
            EngineKind::Lightweight => self.lightweight.as_ref(),
        }
    }

    fn engine_mut(&mut self, kind: EngineKind) -> &mut dyn FaceDetector {
        match kind {
            EngineKind::Accurate => self.accurate.as_mut(),
            EngineKind::Lightweight => self.lightweight.as_mut(),
        }
    }

    /// Bring up an engine and make it active.
    ///
    /// `Auto` tries the accurate engine and, if that fails, the lightweight
    /// engine exactly once. Returns the engine that ended up active.
    pub fn initialize(
        &mut self,
        preference: EnginePreference,
    ) -> Result<EngineKind, DetectorError> {
        match preference {
            EnginePreference::Accurate => self.activate(EngineKind::Accurate),
            EnginePreference::Lightweight => self.activate(EngineKind::Lightweight),
            EnginePreference::Auto => match self.activate(EngineKind::Accurate) {
                Ok(kind) => Ok(kind),
                Err(e) => {
                    warn!(error = %e, "accurate detector unavailable, falling back to lightweight");
                    self.activate(EngineKind::Lightweight)
                }
            },
        }
    }

    fn activate(&mut self, kind: EngineKind) -> Result<EngineKind, DetectorError> {
        if let Some(current) = self.active.take() {
            if current != kind {
                debug!(from = %current, to = %kind, "disposing outgoing detector");
                self.engine_mut(current).dispose();
            }
        }
        self.engine_mut(kind).initialize()?;
        self.active = Some(kind);
        info!(engine = %kind, "face detector ready");
        Ok(kind)
    }

    pub fn is_ready(&self) -> bool {
        self.active.is_some_and(|kind| self.engine(kind).is_ready())
    }

    pub fn active(&self) -> Option<EngineKind> {
        self.active
    }

    /// Make `kind` the active engine. No-op when it already is and is ready.
    pub fn switch_backend(&mut self, kind: EngineKind) -> Result<(), DetectorError> {
        if self.active == Some(kind) && self.engine(kind).is_ready() {
            return Ok(());
        }
        self.activate(kind).map(|_| ())
    }

    /// Detect faces in `image`, strongest first.
    pub fn detect(
        &mut self,
        image: &RgbaImage,
        options: &DetectionOptions,
    ) -> Result<Vec<FaceRegion>, DetectorError> {
        let primary = self.active.ok_or(DetectorError::NotInitialized)?;
        let engine = self.engine_mut(primary);
        if !engine.is_ready() {
            debug!(engine = %primary, "re-initializing detector before detection");
            engine.initialize()?;
        }
        let raw = engine.detect(image)?;
        let raw_count = raw.len();
        let mut best = prepare(raw, options.min_confidence);
        let mut source = primary;
        debug!(engine = %primary, raw = raw_count, kept = best.len(), "detection pass");

        if primary == EngineKind::Accurate && best.len() <= CROSS_CHECK_MAX_FACES {
            match self.cross_check(image, options.min_confidence) {
                Ok(secondary) if secondary.len() > best.len() => {
                    debug!(
                        primary = best.len(),
                        secondary = secondary.len(),
                        "lightweight cross-check found more faces"
                    );
                    best = secondary;
                    source = EngineKind::Lightweight;
                }
                Ok(_) => {}
                Err(e) => warn!(
                    error = %e,
                    "lightweight cross-check failed, keeping accurate results"
                ),
            }
        }

        Ok(truncate_to_strongest(best, options.max_faces)
            .into_iter()
            .map(|d| FaceRegion::from_detection(d, source))
            .collect())
    }

    /// Run the lightweight engine alongside the accurate one.
    ///
    /// An engine brought up here is disposed again before returning.
    fn cross_check(
        &mut self,
        image: &RgbaImage,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, DetectorError> {
        let engine = self.lightweight.as_mut();
        let transient = !engine.is_ready();
        if transient {
            if let Err(e) = engine.initialize() {
                engine.dispose();
                return Err(e);
            }
        }
        let result = engine.detect(image);
        if transient {
            engine.dispose();
        }
        Ok(prepare(result?, min_confidence))
    }

    /// Dispose the active engine; the adapter is uninitialized afterwards.
    pub fn dispose(&mut self) {
        if let Some(kind) = self.active.take() {
            self.engine_mut(kind).dispose();
        }
    }
}

fn prepare(raw: Vec<Detection>, min_confidence: f64) -> Vec<Detection> {
    filter_by_confidence(deduplicate(raw, IOU_THRESHOLD), min_confidence)
}
