use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::imaging::domain::image_reader::ImageReader;
use crate::imaging::domain::image_writer::ImageWriter;
use crate::pipeline::progress_reporter::ProgressReporter;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Settings for one resize run.
#[derive(Clone, Debug)]
pub struct ResizeConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub size: (u32, u32),
    pub workers: NonZeroUsize,
}

impl ResizeConfig {
    /// One worker per available CPU core.
    pub fn default_workers() -> NonZeroUsize {
        std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResizeSummary {
    pub resized: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

#[derive(Debug, PartialEq, Eq)]
enum TaskOutcome {
    Resized,
    AlreadyExists,
}

/// Resizes images into a mirrored directory tree.
///
/// Each image is an independent task: read one source, write one output at
/// the same relative path under the output directory. Outputs that already
/// exist are skipped, so an interrupted run can simply be restarted. A
/// failing image is logged and counted without stopping the others.
///
/// With more than one worker, tasks are fed through a bounded channel to a
/// pool of threads that share nothing but the filesystem.
pub struct ResizeImagesUseCase {
    reader: Box<dyn ImageReader>,
    writer: Box<dyn ImageWriter>,
    reporter: Box<dyn ProgressReporter>,
    config: ResizeConfig,
}

impl ResizeImagesUseCase {
    pub fn new(
        reader: Box<dyn ImageReader>,
        writer: Box<dyn ImageWriter>,
        reporter: Box<dyn ProgressReporter>,
        config: ResizeConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            reporter,
            config,
        }
    }

    pub fn execute(&mut self, image_paths: &[PathBuf]) -> ResizeSummary {
        let (w, h) = self.config.size;
        self.reporter.info(&format!(
            "Resizing {} images to {w}x{h} with {} workers",
            image_paths.len(),
            self.config.workers
        ));

        let summary = if self.config.workers.get() == 1 {
            self.run_sequential(image_paths)
        } else {
            self.run_pool(image_paths)
        };

        self.reporter.finish();
        summary
    }

    fn run_sequential(&mut self, image_paths: &[PathBuf]) -> ResizeSummary {
        let total = image_paths.len();
        let mut summary = ResizeSummary::default();
        for (i, path) in image_paths.iter().enumerate() {
            let outcome = resize_one(&*self.reader, &*self.writer, &self.config, path)
                .map_err(|e| -> SendError { e.to_string().into() });
            tally(&mut summary, path, outcome);
            self.reporter
                .progress(i + 1, total, &path.to_string_lossy());
        }
        summary
    }

    fn run_pool(&mut self, image_paths: &[PathBuf]) -> ResizeSummary {
        let total = image_paths.len();
        let reader = &*self.reader;
        let writer = &*self.writer;
        let config = &self.config;
        let reporter = &mut self.reporter;

        let (task_tx, task_rx) = crossbeam_channel::bounded::<&PathBuf>(DEFAULT_CHANNEL_CAPACITY);
        let (done_tx, done_rx) =
            crossbeam_channel::unbounded::<(&PathBuf, Result<TaskOutcome, SendError>)>();

        std::thread::scope(|scope| {
            for _ in 0..config.workers.get() {
                let task_rx = task_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || {
                    for path in task_rx {
                        let outcome = resize_one(reader, writer, config, path)
                            .map_err(|e| -> SendError { e.to_string().into() });
                        if done_tx.send((path, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(task_rx);
            drop(done_tx);

            scope.spawn(move || {
                for path in image_paths {
                    if task_tx.send(path).is_err() {
                        break;
                    }
                }
            });

            let mut summary = ResizeSummary::default();
            for (done, (path, outcome)) in done_rx.iter().enumerate() {
                tally(&mut summary, path, outcome);
                reporter.progress(done + 1, total, &path.to_string_lossy());
            }
            summary
        })
    }
}

/// Maps `path` under `input_dir` to the same relative location under `output_dir`.
pub fn output_path_for(input_dir: &Path, output_dir: &Path, path: &Path) -> Option<PathBuf> {
    path.strip_prefix(input_dir)
        .ok()
        .map(|relative| output_dir.join(relative))
}

fn resize_one(
    reader: &dyn ImageReader,
    writer: &dyn ImageWriter,
    config: &ResizeConfig,
    path: &Path,
) -> Result<TaskOutcome, Box<dyn std::error::Error>> {
    let output = output_path_for(&config.input_dir, &config.output_dir, path).ok_or_else(|| {
        format!(
            "{} is not inside {}",
            path.display(),
            config.input_dir.display()
        )
    })?;
    if output.is_file() {
        return Ok(TaskOutcome::AlreadyExists);
    }

    let frame = reader.read(path)?;
    log::debug!(
        "Resizing {} ({}x{}) => {:?}",
        path.display(),
        frame.width(),
        frame.height(),
        config.size
    );
    writer.write(&output, &frame, Some(config.size))?;
    Ok(TaskOutcome::Resized)
}

fn tally(summary: &mut ResizeSummary, path: &Path, outcome: Result<TaskOutcome, SendError>) {
    match outcome {
        Ok(TaskOutcome::Resized) => summary.resized += 1,
        Ok(TaskOutcome::AlreadyExists) => summary.skipped_existing += 1,
        Err(e) => {
            summary.failed += 1;
            log::error!("Failed to resize {}: {e}. Skipping.", path.display());
        }
    }
}
