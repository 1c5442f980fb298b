//! The editing session: one loaded file, its faces, and the mask settings.
//!
//! The session owns the detector adapter, the decoded original, the face
//! set and the compositor. Every operation takes `&mut self`, so a composite
//! can never overlap a detection pass or an engine switch.
//!
//! Lifecycle of the parts it holds:
//!
//! - media: replaced by [`Session::load_media`], never modified;
//! - faces: replaced wholesale by [`Session::detect_faces`] (fresh ids),
//!   cleared by a new load, otherwise only their selection flag changes;
//! - mask configuration: survives loads until reset.

use crate::compositor::{CompositeError, Compositor, Layers};
use crate::config::{AppConfig, ConfigError};
use crate::detection::{
    DetectionOptions, DetectorAdapter, DetectorError, EnginePreference,
};
use crate::export::{self, EncodedMedia, ExportError, ExportOptions};
use crate::masking::Intensity;
use crate::media::{MediaContent, MediaInfo, MediaSource, ValidationError};
use crate::playback::{self, PlaybackError};
use crate::types::{EngineKind, FaceId, FaceRegion, MaskConfiguration, MaskType, Sensitivity};
use image::RgbaImage;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Detector(#[from] DetectorError),
    #[error(transparent)]
    Composite(#[from] CompositeError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no image or animation is loaded")]
    NoMedia,
    #[error("no faces are selected for masking")]
    NothingSelected,
    #[error("no face with id {0}")]
    UnknownFace(FaceId),
    #[error("{0} is a still image, not an animation")]
    NotAnimation(String),
}

pub struct Session {
    adapter: DetectorAdapter,
    compositor: Compositor,
    options: DetectionOptions,
    mask: MaskConfiguration,
    media: Option<MediaSource>,
    faces: Vec<FaceRegion>,
}

impl Session {
    pub fn new(
        adapter: DetectorAdapter,
        compositor: Compositor,
        options: DetectionOptions,
    ) -> Self {
        Self {
            adapter,
            compositor,
            options,
            mask: MaskConfiguration::default(),
            media: None,
            faces: Vec::new(),
        }
    }

    /// Session over the SeetaFace engines, seeded from config.
    pub fn from_config(config: &AppConfig) -> Self {
        let adapter = DetectorAdapter::seeta(
            &config.detection.accurate_model,
            &config.detection.lightweight_model,
        );
        let compositor = Compositor::new(config.emoji_atlas(), config.annotation_style());
        let mut session = Self::new(adapter, compositor, config.detection_options());
        session.mask = config.mask_configuration();
        session
    }

    // ------------------------------------------------------------------
    // Detector
    // ------------------------------------------------------------------

    pub fn initialize_detector(
        &mut self,
        preference: EnginePreference,
    ) -> Result<EngineKind, SessionError> {
        Ok(self.adapter.initialize(preference)?)
    }

    pub fn switch_detector(&mut self, kind: EngineKind) -> Result<(), SessionError> {
        Ok(self.adapter.switch_backend(kind)?)
    }

    pub fn active_detector(&self) -> Option<EngineKind> {
        self.adapter.active()
    }

    pub fn detection_options(&self) -> &DetectionOptions {
        &self.options
    }

    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        self.options.min_confidence = sensitivity.min_confidence();
    }

    // ------------------------------------------------------------------
    // Media
    // ------------------------------------------------------------------

    /// Validate and decode `path`, replacing the current media and faces.
    pub fn load_media(&mut self, path: &Path) -> Result<&MediaInfo, SessionError> {
        let media = MediaSource::load(path)?;
        Ok(self.set_media(media))
    }

    /// Replace the current media with an already decoded source.
    pub fn set_media(&mut self, media: MediaSource) -> &MediaInfo {
        self.faces.clear();
        info!(name = %media.info().name, kind = ?media.info().kind, "media loaded");
        self.media.insert(media).info()
    }

    pub fn media(&self) -> Option<&MediaSource> {
        self.media.as_ref()
    }

    fn require_media(&self) -> Result<&MediaSource, SessionError> {
        self.media.as_ref().ok_or(SessionError::NoMedia)
    }

    // ------------------------------------------------------------------
    // Faces
    // ------------------------------------------------------------------

    /// Run detection on the still (or first animation frame).
    ///
    /// On failure the previous faces are kept.
    pub fn detect_faces(&mut self) -> Result<&[FaceRegion], SessionError> {
        let media = self.media.as_ref().ok_or(SessionError::NoMedia)?;
        let image = media.first_frame();
        let mut faces = self.adapter.detect(image, &self.options)?;
        for face in &mut faces {
            face.thumbnail = match export::face_thumbnail(image, &face.bounds) {
                Ok(thumbnail) => thumbnail,
                Err(e) => {
                    warn!(face = %face.id, error = %e, "thumbnail failed");
                    None
                }
            };
        }
        info!(count = faces.len(), "faces detected");
        self.faces = faces;
        Ok(&self.faces)
    }

    pub fn faces(&self) -> &[FaceRegion] {
        &self.faces
    }

    /// Replace the face set wholesale, e.g. from an edited manifest.
    pub fn restore_faces(&mut self, faces: Vec<FaceRegion>) {
        debug!(count = faces.len(), "faces restored");
        self.faces = faces;
    }

    fn face_mut(&mut self, id: FaceId) -> Result<&mut FaceRegion, SessionError> {
        self.faces
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(SessionError::UnknownFace(id))
    }

    pub fn set_selected(&mut self, id: FaceId, selected: bool) -> Result<(), SessionError> {
        self.face_mut(id)?.set_selected(selected);
        Ok(())
    }

    /// Flip a face's selection; returns the new state.
    pub fn toggle_selected(&mut self, id: FaceId) -> Result<bool, SessionError> {
        let face = self.face_mut(id)?;
        face.toggle();
        Ok(face.is_selected())
    }

    pub fn select_all(&mut self, selected: bool) {
        for face in &mut self.faces {
            face.set_selected(selected);
        }
    }

    pub fn selected_count(&self) -> usize {
        self.faces.iter().filter(|f| f.is_selected()).count()
    }

    // ------------------------------------------------------------------
    // Mask configuration
    // ------------------------------------------------------------------

    pub fn mask_config(&self) -> &MaskConfiguration {
        &self.mask
    }

    pub fn set_mask_type(&mut self, mask_type: MaskType) {
        self.mask.mask_type = mask_type;
    }

    pub fn set_blur_intensity(&mut self, intensity: u32) {
        self.mask.blur_intensity = Intensity::new(intensity);
    }

    pub fn set_emoji(&mut self, emoji: impl Into<String>) {
        self.mask.emoji = emoji.into();
    }

    pub fn reset_mask_config(&mut self) {
        self.mask = MaskConfiguration::default();
    }

    // ------------------------------------------------------------------
    // Rendering and export
    // ------------------------------------------------------------------

    /// Masked and outlined composite of the still (or first frame).
    pub fn render_preview(&mut self) -> Result<RgbaImage, SessionError> {
        self.render(Layers::Annotated)
    }

    fn render(&mut self, layers: Layers) -> Result<RgbaImage, SessionError> {
        let media = self.media.as_ref().ok_or(SessionError::NoMedia)?;
        Ok(self
            .compositor
            .render(media.first_frame(), &self.faces, &self.mask, layers)?)
    }

    fn require_selection(&self) -> Result<(), SessionError> {
        if self.selected_count() == 0 {
            return Err(SessionError::NothingSelected);
        }
        Ok(())
    }

    /// Encode the masked still (or first frame) without annotations.
    pub fn export_still(&mut self, options: &ExportOptions) -> Result<EncodedMedia, SessionError> {
        self.require_media()?;
        self.require_selection()?;
        let surface = self.render(Layers::MaskOnly)?;
        let media = export::export_still(&surface, options)?;
        info!(file = %media.filename, bytes = media.bytes.len(), "still exported");
        Ok(media)
    }

    /// Mask every frame of the loaded animation and encode it as GIF.
    pub fn export_animation(&mut self, filename: &str) -> Result<EncodedMedia, SessionError> {
        let media = self.require_media()?;
        self.require_selection()?;
        let source = match media.content() {
            MediaContent::Animation(source) => source,
            MediaContent::Still(_) => {
                return Err(SessionError::NotAnimation(media.info().name.clone()));
            }
        };
        let frames = playback::record(
            self.compositor.clone(),
            source,
            &self.faces,
            &self.mask,
            Layers::MaskOnly,
        )?;
        let encoded = export::export_video(&frames, filename)?;
        info!(file = %encoded.filename, frames = frames.len(), "animation exported");
        Ok(encoded)
    }
}
