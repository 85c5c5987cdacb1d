use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};

use facebatch_core::detection::domain::face_detector::FaceDetector;
use facebatch_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloDetector, DEFAULT_CONFIDENCE,
};
use facebatch_core::imaging::infrastructure::discovery::discover_images;
use facebatch_core::imaging::infrastructure::image_file_reader::ImageFileReader;
use facebatch_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use facebatch_core::pipeline::copy_dataset_use_case::{read_file_list, CopyDatasetUseCase};
use facebatch_core::pipeline::detect_faces_use_case::{
    item_keys, DetectFacesUseCase, RunError, RunSummary, RunnerConfig,
};
use facebatch_core::pipeline::item_processor::DetectorItemProcessor;
use facebatch_core::pipeline::progress_reporter::LogProgressReporter;
use facebatch_core::pipeline::resize_images_use_case::{ResizeConfig, ResizeImagesUseCase};
use facebatch_core::results::result_log::{ResultLog, ResultLogError};
use facebatch_core::shared::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_COPY_SEGMENTS, DEFAULT_EXTENSION, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use facebatch_core::shared::model_resolver;
use facebatch_core::shared::slug::log_file_name;

/// Batch jobs for face-image datasets.
#[derive(Parser)]
#[command(name = "facebatch")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the faces on many images, resuming from the result log.
    Detect(DetectArgs),
    /// Resize every image under a directory into a mirrored tree.
    Resize(ResizeArgs),
    /// Copy listed files into a nested dataset directory.
    Copy(CopyArgs),
}

#[derive(Args)]
struct DetectArgs {
    /// The directory with the images.
    #[arg(long)]
    images_dir: PathBuf,

    /// Images per detector call (1 = one image at a time).
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Extension of the images.
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// Directory holding the result log.
    #[arg(long, default_value = ".")]
    log_dir: PathBuf,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// ONNX model to use instead of the downloaded default.
    #[arg(long)]
    model: Option<PathBuf>,
}

#[derive(Args)]
struct ResizeArgs {
    /// The directory with the images.
    #[arg(long)]
    input_dir: PathBuf,

    /// The output directory for the resized images.
    #[arg(long)]
    output_dir: PathBuf,

    /// The resize dimensions as WIDTH,HEIGHT.
    #[arg(long, default_value = "512,512")]
    resize_dims: String,

    /// Extension of the images.
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// Worker threads (defaults to one per CPU core; 1 = sequential).
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Args)]
struct CopyArgs {
    /// Text file with absolute file paths, one per line.
    #[arg(long)]
    files_to_copy: PathBuf,

    /// The dataset output directory.
    #[arg(long)]
    output_dir: PathBuf,

    /// Trailing path segments rebuilt under the output directory.
    #[arg(long, default_value_t = DEFAULT_COPY_SEGMENTS)]
    segments: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Detect(args) => run_detect(args),
        Command::Resize(args) => run_resize(args),
        Command::Copy(args) => run_copy(args),
    }
}

fn run_detect(args: DetectArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_dir(&args.images_dir)?;
    if !(0.0..=1.0).contains(&args.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            args.confidence
        )
        .into());
    }
    let config = RunnerConfig::new(args.batch_size)?;

    let items = item_keys(&discover_images(
        &args.images_dir,
        &[args.extension.as_str()],
    ));
    log::info!(
        "Found {} *.{} files under {}",
        items.len(),
        args.extension,
        args.images_dir.display()
    );

    let mut result_log = ResultLog::open(&args.log_dir.join(log_file_name(&args.images_dir)))?;
    let log_path = result_log.path().to_path_buf();

    let detector = build_detector(args.model.as_deref(), args.confidence)?;
    let processor = DetectorItemProcessor::new(Box::new(ImageFileReader::new()), detector);
    let mut use_case = DetectFacesUseCase::new(
        Box::new(processor),
        Box::new(LogProgressReporter::default()),
        config,
    );

    let outcome = use_case.execute(&items, &mut result_log);
    let summary = finish_run(outcome, result_log.close())?;

    log::info!(
        "Detection finished: {} new, {} already recorded, {} groups skipped ({})",
        summary.persisted,
        summary.already_present,
        summary.skipped_groups,
        log_path.display()
    );
    Ok(())
}

fn run_resize(args: ResizeArgs) -> Result<(), Box<dyn std::error::Error>> {
    validate_dir(&args.input_dir)?;
    let size = parse_dims(&args.resize_dims)?;
    let workers = match args.workers {
        Some(n) => NonZeroUsize::new(n).ok_or("Workers must be at least 1")?,
        None => ResizeConfig::default_workers(),
    };

    let paths = discover_images(&args.input_dir, &[args.extension.as_str()]);
    let mut use_case = ResizeImagesUseCase::new(
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
        Box::new(LogProgressReporter::default()),
        ResizeConfig {
            input_dir: args.input_dir,
            output_dir: args.output_dir,
            size,
            workers,
        },
    );
    let summary = use_case.execute(&paths);

    log::info!(
        "Resize finished: {} resized, {} already present, {} failed",
        summary.resized,
        summary.skipped_existing,
        summary.failed
    );
    Ok(())
}

fn run_copy(args: CopyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let segments = NonZeroUsize::new(args.segments).ok_or("Segments must be at least 1")?;
    let files = read_file_list(&args.files_to_copy)?;
    let copied = CopyDatasetUseCase::new(args.output_dir, segments).execute(&files)?;
    log::info!("Copied {copied} files");
    Ok(())
}

/// Combines the run outcome with closing the log. A run error takes
/// precedence; a close error alongside it is logged rather than lost.
fn finish_run(
    outcome: Result<RunSummary, RunError>,
    closed: Result<(), ResultLogError>,
) -> Result<RunSummary, Box<dyn std::error::Error>> {
    match (outcome, closed) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(_), Err(close_err)) => Err(close_err.into()),
        (Err(run_err), Ok(())) => Err(run_err.into()),
        (Err(run_err), Err(close_err)) => {
            log::error!("Also failed to close the result log: {close_err}");
            Err(run_err.into())
        }
    }
}

fn build_detector(
    model: Option<&Path>,
    confidence: f64,
) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let model_path = match model {
        Some(path) => path.to_path_buf(),
        None => {
            log::info!("Resolving model: {YOLO_MODEL_NAME}");
            let path = model_resolver::resolve(
                YOLO_MODEL_NAME,
                YOLO_MODEL_URL,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };
    Ok(Box::new(OnnxYoloDetector::new(&model_path, confidence)?))
}

fn validate_dir(dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !dir.is_dir() {
        return Err(format!("Input directory not found: {}", dir.display()).into());
    }
    Ok(())
}

/// Parses `WIDTH,HEIGHT`; parentheses and spaces are tolerated, so
/// `(512, 512)` is accepted too.
fn parse_dims(text: &str) -> Result<(u32, u32), String> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | ' '))
        .collect();
    let invalid = || format!("Resize dimensions must look like 512,512, got '{text}'");
    let (w, h) = cleaned.split_once(',').ok_or_else(invalid)?;
    let w: u32 = w.parse().map_err(|_| invalid())?;
    let h: u32 = h.parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(format!("Resize dimensions must be positive, got {w}x{h}"));
    }
    Ok((w, h))
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dims_accepts_both_forms() {
        assert_eq!(parse_dims("512,512").unwrap(), (512, 512));
        assert_eq!(parse_dims("(640, 480)").unwrap(), (640, 480));
    }

    #[test]
    fn test_parse_dims_rejects_garbage() {
        assert!(parse_dims("512").is_err());
        assert!(parse_dims("a,b").is_err());
        assert!(parse_dims("0,10").is_err());
    }

    #[test]
    fn test_detect_defaults() {
        let cli = Cli::try_parse_from(["facebatch", "detect", "--images-dir", "/data"]).unwrap();
        let Command::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(args.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(args.extension, "png");
        assert_eq!(args.log_dir, PathBuf::from("."));
        assert!(args.model.is_none());
    }

    #[test]
    fn test_resize_requires_output_dir() {
        assert!(Cli::try_parse_from(["facebatch", "resize", "--input-dir", "/in"]).is_err());
    }

    #[test]
    fn test_copy_args() {
        let cli = Cli::try_parse_from([
            "facebatch",
            "copy",
            "--files-to-copy",
            "list.txt",
            "--output-dir",
            "/out",
            "--segments",
            "2",
        ])
        .unwrap();
        let Command::Copy(args) = cli.command else {
            panic!("expected copy");
        };
        assert_eq!(args.segments, 2);
    }

    #[test]
    fn test_finish_run_prefers_run_error() {
        let result = finish_run(
            Err(RunError::InvalidGroupSize),
            Err(ResultLogError::InvalidKey("k".into())),
        );
        let err = result.unwrap_err();
        assert!(err.downcast_ref::<RunError>().is_some());
    }

    #[test]
    fn test_finish_run_reports_close_error_after_success() {
        let result = finish_run(
            Ok(RunSummary::default()),
            Err(ResultLogError::InvalidKey("k".into())),
        );
        assert!(result.unwrap_err().downcast_ref::<ResultLogError>().is_some());
    }

    #[test]
    fn test_finish_run_success() {
        let summary = RunSummary {
            persisted: 3,
            ..RunSummary::default()
        };
        assert_eq!(finish_run(Ok(summary), Ok(())).unwrap(), summary);
    }

    #[test]
    fn test_validate_dir_rejects_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_dir(dir.path()).is_ok());
        assert!(validate_dir(&dir.path().join("missing")).is_err());
    }
}
