//! End-to-end masking through the public API: load, detect, select,
//! composite, export.
//!
//! Detection runs against a scripted engine so the tests do not need a
//! SeetaFace model on disk.
//!
//! Run with: cargo test --test masking_pipeline

use face_masker::compositor::{Compositor, Layers};
use face_masker::detection::{
    BackendState, DetectionOptions, DetectorAdapter, DetectorError, EnginePreference,
    FaceDetector,
};
use face_masker::export::{self, ExportFormat, ExportOptions};
use face_masker::masking::Quality;
use face_masker::media::{MediaKind, MediaSource};
use face_masker::playback::AnimationFrame;
use face_masker::session::{Session, SessionError};
use face_masker::types::{Bounds, Detection, EngineKind, MaskConfiguration, MaskType};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, Rgba, RgbaImage};
use std::io::Cursor;
use std::time::Duration;
use tempfile::TempDir;

/// Engine that returns a fixed set of detections.
struct ScriptedDetector {
    kind: EngineKind,
    state: BackendState,
    detections: Vec<Detection>,
}

impl ScriptedDetector {
    fn boxed(kind: EngineKind, detections: Vec<Detection>) -> Box<dyn FaceDetector> {
        Box::new(Self {
            kind,
            state: BackendState::Uninitialized,
            detections,
        })
    }
}

impl FaceDetector for ScriptedDetector {
    fn kind(&self) -> EngineKind {
        self.kind
    }

    fn state(&self) -> BackendState {
        self.state
    }

    fn initialize(&mut self) -> Result<(), DetectorError> {
        self.state = BackendState::Ready;
        Ok(())
    }

    fn detect(&mut self, _image: &RgbaImage) -> Result<Vec<Detection>, DetectorError> {
        Ok(self.detections.clone())
    }

    fn dispose(&mut self) {
        self.state = BackendState::Disposed;
    }
}

/// 10px checkerboard, so any blur visibly changes pixels.
fn photo(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x / 10 + y / 10) % 2 == 0 {
            Rgba([235, 190, 160, 255])
        } else {
            Rgba([30, 25, 40, 255])
        }
    })
}

/// Two overlapping hits on the same face (IoU 0.7) from the accurate engine.
fn overlapping_hits() -> Vec<Detection> {
    vec![
        Detection::new(Bounds::new(100.0, 100.0, 100.0, 100.0), 0.9),
        Detection::new(Bounds::new(100.0, 100.0, 100.0, 70.0), 0.6),
    ]
}

fn session_with(accurate: Vec<Detection>, lightweight: Vec<Detection>) -> Session {
    let adapter = DetectorAdapter::new(
        ScriptedDetector::boxed(EngineKind::Accurate, accurate),
        ScriptedDetector::boxed(EngineKind::Lightweight, lightweight),
    );
    let mut session = Session::new(adapter, Compositor::default(), DetectionOptions::default());
    session.initialize_detector(EnginePreference::Auto).unwrap();
    session
}

fn png_options() -> ExportOptions {
    ExportOptions {
        format: ExportFormat::Png,
        ..ExportOptions::default()
    }
}

fn decode(bytes: &[u8]) -> RgbaImage {
    image::load_from_memory(bytes).unwrap().to_rgba8()
}

// =========================================================================
// Stills
// =========================================================================

#[test]
fn overlapping_hits_mask_one_face_and_export_jpeg() {
    let original = photo(400, 400);
    let mut session = session_with(overlapping_hits(), Vec::new());
    session.set_media(MediaSource::from_still("party.png", original.clone()));

    let faces = session.detect_faces().unwrap();
    assert_eq!(faces.len(), 1);
    assert_eq!(faces[0].confidence, 0.9);
    assert_eq!(faces[0].detected_by, EngineKind::Accurate);
    assert!(faces[0].thumbnail.is_some());

    session.set_mask_type(MaskType::Blur);
    session.set_blur_intensity(50);
    let options = ExportOptions {
        format: ExportFormat::Jpeg,
        quality: Quality::new(90),
        ..ExportOptions::default()
    };
    let encoded = session.export_still(&options).unwrap();
    assert_eq!(encoded.filename, "masked_image.jpg");
    assert_eq!(encoded.mime_type, "image/jpeg");

    let decoded = decode(&encoded.bytes);
    assert_eq!(decoded.dimensions(), (400, 400));
    assert_ne!(decoded, original);
}

#[test]
fn blur_only_touches_the_face_area() {
    let original = photo(400, 400);
    let mut session = session_with(overlapping_hits(), Vec::new());
    session.set_media(MediaSource::from_still("party.png", original.clone()));
    session.detect_faces().unwrap();

    let masked = decode(&session.export_still(&png_options()).unwrap().bytes);
    assert_eq!(masked.get_pixel(5, 5), original.get_pixel(5, 5));
    assert_eq!(masked.get_pixel(395, 395), original.get_pixel(395, 395));
    let changed = (100..200)
        .flat_map(|y| (100..200).map(move |x| (x, y)))
        .filter(|&(x, y)| masked.get_pixel(x, y) != original.get_pixel(x, y))
        .count();
    assert!(changed > 1000, "only {changed} face pixels changed");
}

#[test]
fn lightweight_cross_check_wins_with_more_faces() {
    let lightweight = vec![
        Detection::new(Bounds::new(20.0, 20.0, 60.0, 60.0), 0.8),
        Detection::new(Bounds::new(250.0, 250.0, 60.0, 60.0), 0.7),
    ];
    let mut session = session_with(overlapping_hits(), lightweight);
    session.set_media(MediaSource::from_still("party.png", photo(400, 400)));

    let faces = session.detect_faces().unwrap();
    assert_eq!(faces.len(), 2);
    assert!(faces.iter().all(|f| f.detected_by == EngineKind::Lightweight));
}

#[test]
fn mask_none_exports_the_original() {
    let original = photo(120, 90);
    let mut session = session_with(
        vec![Detection::new(Bounds::new(30.0, 20.0, 40.0, 40.0), 0.95)],
        Vec::new(),
    );
    session.set_media(MediaSource::from_still("a.png", original.clone()));
    session.detect_faces().unwrap();
    session.set_mask_type(MaskType::None);

    let exported = decode(&session.export_still(&png_options()).unwrap().bytes);
    assert_eq!(exported, original);
}

#[test]
fn deselected_faces_render_like_no_faces() {
    let original = photo(160, 120);
    let mut session = session_with(
        vec![
            Detection::new(Bounds::new(10.0, 10.0, 50.0, 50.0), 0.9),
            Detection::new(Bounds::new(90.0, 40.0, 50.0, 50.0), 0.8),
        ],
        Vec::new(),
    );
    session.set_media(MediaSource::from_still("a.png", original.clone()));
    session.detect_faces().unwrap();
    let second = session.faces()[1].id;
    session.set_selected(second, false).unwrap();

    let mut compositor = Compositor::default();
    let mask = MaskConfiguration::default();
    let partial = compositor
        .render(&original, session.faces(), &mask, Layers::MaskOnly)
        .unwrap();
    let only_first = compositor
        .render(&original, &session.faces()[..1], &mask, Layers::MaskOnly)
        .unwrap();
    assert_eq!(partial, only_first);

    session.select_all(false);
    let none = compositor
        .render(&original, session.faces(), &mask, Layers::MaskOnly)
        .unwrap();
    assert_eq!(none, original);
}

#[test]
fn rendering_twice_is_identical() {
    let original = photo(200, 200);
    let mut session = session_with(overlapping_hits(), Vec::new());
    session.set_media(MediaSource::from_still("a.png", original));
    session.detect_faces().unwrap();
    session.set_mask_type(MaskType::Pixelate);

    let first = session.render_preview().unwrap();
    let second = session.render_preview().unwrap();
    assert_eq!(first, second);
}

#[test]
fn export_with_nothing_selected_is_rejected() {
    let mut session = session_with(overlapping_hits(), Vec::new());
    session.set_media(MediaSource::from_still("a.png", photo(300, 300)));
    session.detect_faces().unwrap();
    session.select_all(false);

    let err = session.export_still(&ExportOptions::default()).unwrap_err();
    assert!(matches!(err, SessionError::NothingSelected));
}

#[test]
fn export_without_faces_is_rejected() {
    let mut session = session_with(Vec::new(), Vec::new());
    session.set_media(MediaSource::from_still("a.png", photo(300, 300)));
    assert!(session.detect_faces().unwrap().is_empty());

    let err = session.export_still(&ExportOptions::default()).unwrap_err();
    assert!(matches!(err, SessionError::NothingSelected));
}

// =========================================================================
// Files on disk
// =========================================================================

#[test]
fn loaded_png_is_masked_and_saved_next_to_it() {
    let tmp = TempDir::new().unwrap();
    let source = export::export_still(&photo(320, 240), &png_options())
        .unwrap()
        .save(tmp.path())
        .unwrap();

    let mut session = session_with(overlapping_hits(), Vec::new());
    let info = session.load_media(&source).unwrap();
    assert_eq!(info.kind, MediaKind::Still);
    assert_eq!((info.width, info.height), (320, 240));
    session.detect_faces().unwrap();

    let options = ExportOptions {
        filename: "party_masked".into(),
        ..ExportOptions::default()
    };
    let path = session
        .export_still(&options)
        .unwrap()
        .save(&tmp.path().join("out"))
        .unwrap();
    assert_eq!(path, tmp.path().join("out").join("party_masked.jpg"));
    assert_eq!(decode(&std::fs::read(&path).unwrap()).dimensions(), (320, 240));
}

#[test]
fn animated_gif_is_masked_frame_by_frame() {
    let tmp = TempDir::new().unwrap();
    let frames: Vec<AnimationFrame> = (0..4u8)
        .map(|i| {
            let mut image = photo(200, 150);
            image.put_pixel(0, 0, Rgba([i * 60, 0, 0, 255]));
            AnimationFrame::new(image, Duration::from_millis(80))
        })
        .collect();
    let clip = export::export_video(&frames, "clip")
        .unwrap()
        .save(tmp.path())
        .unwrap();

    let mut session = session_with(overlapping_hits(), Vec::new());
    let info = session.load_media(&clip).unwrap();
    assert_eq!(info.kind, MediaKind::Animation);
    session.detect_faces().unwrap();

    let encoded = session.export_animation("clip_masked").unwrap();
    assert_eq!(encoded.filename, "clip_masked.gif");
    let decoded = GifDecoder::new(Cursor::new(&encoded.bytes))
        .unwrap()
        .into_frames()
        .collect_frames()
        .unwrap();
    assert_eq!(decoded.len(), 4);
    assert_eq!(decoded[0].buffer().dimensions(), (200, 150));
}

#[test]
fn still_cannot_be_exported_as_animation() {
    let mut session = session_with(overlapping_hits(), Vec::new());
    session.set_media(MediaSource::from_still("a.png", photo(200, 200)));
    session.detect_faces().unwrap();

    let err = session.export_animation("x").unwrap_err();
    assert!(matches!(err, SessionError::NotAnimation(_)));
}
