//! SeetaFace cascade backends via the `rustface` crate.
//!
//! Both engines load the same frontal-face model format from a file and
//! differ in how they sweep the image pyramid:
//!
//! | Engine | Sweeps |
//! |---|---|
//! | Accurate | fine (min face 20, scale 0.85, step 2) + coarse (min face 40, scale 0.7, step 4), merged by NMS |
//! | Lightweight | single (min face 40, scale 0.8, step 4) |
//!
//! Raw cascade scores are unbounded; they are mapped into `[0, 1]` with
//! `1 - exp(-score / 10)`.

use super::backend::{BackendState, DetectorError, FaceDetector};
use super::nms::{IOU_THRESHOLD, deduplicate};
use crate::types::{Bounds, Detection, EngineKind};
use image::RgbaImage;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Cascade score below which a window is not reported.
const SCORE_THRESHOLD: f64 = 2.0;

/// One pass of the sliding-window cascade over the image pyramid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub min_face_size: u32,
    pub pyramid_scale: f32,
    pub window_step: u32,
}

const FINE_SWEEP: Sweep = Sweep {
    min_face_size: 20,
    pyramid_scale: 0.85,
    window_step: 2,
};

const COARSE_SWEEP: Sweep = Sweep {
    min_face_size: 40,
    pyramid_scale: 0.7,
    window_step: 4,
};

const SINGLE_SWEEP: Sweep = Sweep {
    min_face_size: 40,
    pyramid_scale: 0.8,
    window_step: 4,
};

/// Map an unbounded cascade score into `[0, 1]`.
pub fn confidence_from_score(score: f64) -> f64 {
    if !score.is_finite() || score <= 0.0 {
        return 0.0;
    }
    (1.0 - (-score / 10.0).exp()).clamp(0.0, 1.0)
}

/// Face detector backed by a SeetaFace model file.
pub struct SeetaDetector {
    kind: EngineKind,
    model_path: PathBuf,
    sweeps: Vec<Sweep>,
    model: Option<rustface::Model>,
    state: BackendState,
}

impl SeetaDetector {
    /// Two-sweep engine merging a fine and a coarse pass.
    pub fn accurate(model_path: impl Into<PathBuf>) -> Self {
        Self::with_sweeps(
            EngineKind::Accurate,
            model_path,
            vec![FINE_SWEEP, COARSE_SWEEP],
        )
    }

    /// Single-sweep engine.
    pub fn lightweight(model_path: impl Into<PathBuf>) -> Self {
        Self::with_sweeps(EngineKind::Lightweight, model_path, vec![SINGLE_SWEEP])
    }

    pub fn with_sweeps(
        kind: EngineKind,
        model_path: impl Into<PathBuf>,
        sweeps: Vec<Sweep>,
    ) -> Self {
        Self {
            kind,
            model_path: model_path.into(),
            sweeps,
            model: None,
            state: BackendState::Uninitialized,
        }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    pub fn sweeps(&self) -> &[Sweep] {
        &self.sweeps
    }

    fn load_model(&self) -> Result<rustface::Model, String> {
        let file = File::open(&self.model_path)
            .map_err(|e| format!("{}: {e}", self.model_path.display()))?;
        rustface::read_model(BufReader::new(file))
            .map_err(|e| format!("{}: invalid model: {e}", self.model_path.display()))
    }
}

impl FaceDetector for SeetaDetector {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn state(&self) -> BackendState {
        self.state
    }

    fn initialize(&mut self) -> Result<(), DetectorError> {
        if self.state == BackendState::Ready {
            return Ok(());
        }
        self.state = BackendState::Loading;
        match self.load_model() {
            Ok(model) => {
                debug!(engine = %self.kind, path = %self.model_path.display(), "model loaded");
                self.model = Some(model);
                self.state = BackendState::Ready;
                Ok(())
            }
            Err(reason) => {
                self.model = None;
                self.state = BackendState::Error;
                Err(DetectorError::Init {
                    engine: self.kind,
                    reason,
                })
            }
        }
    }

    fn detect(&mut self, image: &RgbaImage) -> Result<Vec<Detection>, DetectorError> {
        let model = match (&self.model, self.state) {
            (Some(model), BackendState::Ready) => model,
            _ => {
                return Err(DetectorError::Detection {
                    engine: self.kind,
                    reason: "model is not loaded".to_string(),
                });
            }
        };

        let gray = image::imageops::grayscale(image);
        let (width, height) = gray.dimensions();
        let mut candidates = Vec::new();

        for sweep in &self.sweeps {
            if width < sweep.min_face_size || height < sweep.min_face_size {
                continue;
            }
            let mut detector = rustface::create_detector_with_model(model.clone());
            detector.set_min_face_size(sweep.min_face_size);
            detector.set_score_thresh(SCORE_THRESHOLD);
            detector.set_pyramid_scale_factor(sweep.pyramid_scale);
            detector.set_slide_window_step(sweep.window_step, sweep.window_step);

            let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));
            debug!(engine = %self.kind, ?sweep, found = faces.len(), "sweep complete");
            candidates.extend(faces.iter().map(|face| {
                let bbox = face.bbox();
                Detection::new(
                    Bounds::new(
                        bbox.x() as f64,
                        bbox.y() as f64,
                        bbox.width() as f64,
                        bbox.height() as f64,
                    ),
                    confidence_from_score(face.score()),
                )
            }));
        }

        if self.sweeps.len() > 1 {
            candidates = deduplicate(candidates, IOU_THRESHOLD);
        }
        Ok(candidates)
    }

    fn dispose(&mut self) {
        self.model = None;
        self.state = BackendState::Disposed;
    }
}
