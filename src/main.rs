use clap::{Parser, Subcommand};
use face_masker::config::{self, AppConfig};
use face_masker::detection::EnginePreference;
use face_masker::export::ExportFormat;
use face_masker::media::{self, MediaKind};
use face_masker::output;
use face_masker::session::Session;
use face_masker::types::{FaceRegion, MaskType, Sensitivity};
use image::ImageFormat;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "face-masker")]
#[command(about = "Detect and mask faces in photos and animations, locally")]
#[command(long_about = "\
Detect and mask faces in photos and animations, locally

Nothing leaves the machine: detection runs on a SeetaFace model file loaded
from disk, and masked output is written next to the source (or to --output).

Typical workflow:

  face-masker detect party.jpg --manifest faces.json
  # review the listing, then mask everything except face 2
  face-masker mask party.jpg --faces faces.json --deselect 2 --type pixelate

Accepted input: JPEG, PNG, WebP stills and animated GIF, up to 50 MB.
Animated input is masked frame by frame and re-encoded as a looping GIF.

Run 'face-masker presets' to list sensitivity levels, mask types and emoji.
Run 'face-masker gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

/// Flags that tune the detector.
#[derive(clap::Args, Clone)]
struct DetectArgs {
    /// Engine to bring up: auto, accurate or lightweight
    #[arg(long, value_parser = parse_keyword::<EnginePreference>)]
    engine: Option<EnginePreference>,

    /// Detection sensitivity: low, medium or high
    #[arg(long, value_parser = parse_keyword::<Sensitivity>)]
    sensitivity: Option<Sensitivity>,
}

#[derive(Subcommand)]
enum Command {
    /// List the faces found in an image
    Detect {
        file: PathBuf,
        /// Write the detected faces as JSON, for use with `mask --faces`
        #[arg(long)]
        manifest: Option<PathBuf>,
        #[command(flatten)]
        detect: DetectArgs,
    },
    /// Write an annotated, masked preview as PNG
    Preview {
        file: PathBuf,
        /// Preview path [default: <file stem>_preview.png next to the source]
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Faces from a previous `detect --manifest` instead of detecting again
        #[arg(long)]
        faces: Option<PathBuf>,
        #[command(flatten)]
        detect: DetectArgs,
    },
    /// Mask the selected faces and export the result
    Mask {
        file: PathBuf,
        /// Faces from a previous `detect --manifest` instead of detecting again
        #[arg(long)]
        faces: Option<PathBuf>,
        /// Comma-separated face numbers to leave unmasked, as listed by `detect`
        #[arg(long, value_delimiter = ',')]
        deselect: Vec<usize>,
        /// Mask type: blur, pixelate, emoji or none
        #[arg(long = "type", value_parser = parse_keyword::<MaskType>)]
        mask_type: Option<MaskType>,
        /// Blur or pixelate intensity, 1-100
        #[arg(long)]
        intensity: Option<u32>,
        /// Emoji drawn over each face with --type emoji
        #[arg(long)]
        emoji: Option<String>,
        /// Still output format: jpeg or png
        #[arg(long, value_parser = parse_keyword::<ExportFormat>)]
        format: Option<ExportFormat>,
        /// JPEG quality, 1-100
        #[arg(long)]
        quality: Option<u32>,
        /// Output directory [default: next to the source]
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output file name; the extension is added if missing
        #[arg(long)]
        filename: Option<String>,
        #[command(flatten)]
        detect: DetectArgs,
    },
    /// List sensitivity levels, mask types and emoji presets
    Presets,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Detect {
            file,
            manifest,
            detect,
        } => {
            let (mut session, engine) = open_session(&cli.config, &detect)?;
            session.load_media(&file)?;
            detect_faces(&mut session, engine)?;
            print_faces(&session);
            if let Some(path) = manifest {
                let json = serde_json::to_string_pretty(session.faces())?;
                std::fs::write(&path, json)?;
                output::print_written("faces manifest", &path);
            }
        }
        Command::Preview {
            file,
            output: preview_out,
            faces,
            detect,
        } => {
            let (mut session, engine) = open_session(&cli.config, &detect)?;
            session.load_media(&file)?;
            load_or_detect(&mut session, faces.as_deref(), engine)?;
            print_faces(&session);
            let preview = session.render_preview()?;
            let path = preview_out.unwrap_or_else(|| preview_path(&file));
            preview.save_with_format(&path, ImageFormat::Png)?;
            output::print_written("preview", &path);
        }
        Command::Mask {
            file,
            faces,
            deselect,
            mask_type,
            intensity,
            emoji,
            format,
            quality,
            output: out_dir,
            filename,
            detect,
        } => {
            let mut config = config::load_config(&cli.config)?;
            apply_detect_args(&mut config, &detect);
            if let Some(mask_type) = mask_type {
                config.mask.mask_type = mask_type;
            }
            if let Some(intensity) = intensity {
                config.mask.blur_intensity = intensity;
            }
            if let Some(emoji) = emoji {
                config.mask.emoji = emoji;
            }
            if let Some(format) = format {
                config.export.format = format;
            }
            if let Some(quality) = quality {
                config.export.quality = quality;
            }
            if let Some(filename) = filename {
                config.export.filename = filename;
            }
            config.validate()?;

            let mut session = Session::from_config(&config);
            let kind = session.load_media(&file)?.kind;
            load_or_detect(&mut session, faces.as_deref(), config.detection.engine)?;
            deselect_faces(&mut session, &deselect)?;

            let encoded = match kind {
                MediaKind::Still => session.export_still(&config.export_options())?,
                MediaKind::Animation => session.export_animation(&config.export.filename)?,
            };
            let dir = media::default_output_dir(&file, out_dir.as_deref());
            let path = encoded.save(&dir)?;
            output::print_export(
                &path,
                encoded.bytes.len(),
                session.faces(),
                session.mask_config(),
            );
        }
        Command::Presets => {
            output::print_presets();
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Parse a lowercase keyword through the type's serde names and aliases.
fn parse_keyword<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase()))
        .map_err(|_| format!("unknown value '{value}'"))
}

fn apply_detect_args(config: &mut AppConfig, args: &DetectArgs) {
    if let Some(engine) = args.engine {
        config.detection.engine = engine;
    }
    if let Some(sensitivity) = args.sensitivity {
        config.detection.sensitivity = sensitivity;
    }
}

/// Load config and apply detector flags. Returns the engine to bring up.
fn open_session(
    root: &Path,
    args: &DetectArgs,
) -> Result<(Session, EnginePreference), Box<dyn std::error::Error>> {
    let mut config = config::load_config(root)?;
    apply_detect_args(&mut config, args);
    Ok((Session::from_config(&config), config.detection.engine))
}

/// Bring the engine up and run a detection pass.
fn detect_faces(
    session: &mut Session,
    engine: EnginePreference,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = session.initialize_detector(engine)?;
    tracing::debug!(engine = %kind, "detector ready");
    session.detect_faces()?;
    Ok(())
}

/// Restore faces from a manifest when given, otherwise run detection.
///
/// The detector model is only loaded when detection actually runs.
fn load_or_detect(
    session: &mut Session,
    manifest: Option<&Path>,
    engine: EnginePreference,
) -> Result<(), Box<dyn std::error::Error>> {
    match manifest {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            let faces: Vec<FaceRegion> = serde_json::from_str(&content)?;
            session.restore_faces(faces);
            Ok(())
        }
        None => detect_faces(session, engine),
    }
}

/// Deselect faces by their 1-based listing number.
fn deselect_faces(
    session: &mut Session,
    numbers: &[usize],
) -> Result<(), Box<dyn std::error::Error>> {
    for &number in numbers {
        let id = number
            .checked_sub(1)
            .and_then(|i| session.faces().get(i))
            .map(|face| face.id)
            .ok_or_else(|| {
                format!(
                    "no face numbered {number} ({} detected)",
                    session.faces().len()
                )
            })?;
        session.set_selected(id, false)?;
    }
    Ok(())
}

fn print_faces(session: &Session) {
    if let Some(media) = session.media() {
        output::print_detection(media.info(), session.active_detector(), session.faces());
    }
}

/// `<dir>/<stem>_preview.png` next to the source.
fn preview_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    media::default_output_dir(source, None).join(format!("{stem}_preview.png"))
}
