use std::num::NonZeroUsize;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::grouping::split_into_groups;
use crate::pipeline::item_processor::ItemProcessor;
use crate::pipeline::progress_reporter::ProgressReporter;
use crate::results::result_log::{is_valid_key, ResultLog, ResultLogError};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("group size must be at least 1")]
    InvalidGroupSize,
    #[error("processing failed for group starting at {first_key}: {source}")]
    ProcessorFailure {
        first_key: String,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("processor returned {actual} results for {expected} items (group starting at {first_key})")]
    ResultCountMismatch {
        first_key: String,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Log(#[from] ResultLogError),
}

/// Turns discovered image paths into item keys.
///
/// A key must name the same file on every run and fit on one log line, so
/// paths that are not valid UTF-8 or that contain a tab or line break are
/// left out with a warning instead of stalling every resume.
pub fn item_keys(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|path| match path.to_str() {
            Some(key) if is_valid_key(key) => Some(key.to_string()),
            _ => {
                log::warn!("Skipping {:?}: path cannot be used as a result key", path);
                None
            }
        })
        .collect()
}

/// Runner settings, fixed for the lifetime of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    group_size: NonZeroUsize,
}

impl RunnerConfig {
    /// `group_size == 1` processes items one by one; larger values hand the
    /// processor whole groups.
    pub fn new(group_size: usize) -> Result<Self, RunError> {
        NonZeroUsize::new(group_size)
            .map(|group_size| Self { group_size })
            .ok_or(RunError::InvalidGroupSize)
    }

    pub fn group_size(&self) -> usize {
        self.group_size.get()
    }
}

/// Counters describing what a run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_items: usize,
    pub groups: usize,
    pub skipped_groups: usize,
    pub processor_calls: usize,
    pub persisted: usize,
    pub already_present: usize,
}

/// Resumable face detection over an ordered list of item keys.
///
/// Items are split into groups; a group whose keys are all in the result
/// log is skipped without calling the processor. Any other group goes to
/// the processor whole, even if some members are already recorded, and each
/// returned result is persisted as soon as the group completes.
///
/// Processor errors abort the run. Nothing from the failing group is
/// persisted, and rerunning against the same log resumes after the last
/// persisted group.
pub struct DetectFacesUseCase {
    processor: Box<dyn ItemProcessor>,
    reporter: Box<dyn ProgressReporter>,
    config: RunnerConfig,
}

impl DetectFacesUseCase {
    pub fn new(
        processor: Box<dyn ItemProcessor>,
        reporter: Box<dyn ProgressReporter>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            processor,
            reporter,
            config,
        }
    }

    pub fn execute(
        &mut self,
        items: &[String],
        log: &mut ResultLog,
    ) -> Result<RunSummary, RunError> {
        let groups = split_into_groups(items, self.config.group_size);
        let mut summary = RunSummary {
            total_items: items.len(),
            groups: groups.len(),
            ..RunSummary::default()
        };

        self.reporter.info(&format!(
            "Running face detection on {} items in {} groups of up to {}",
            items.len(),
            groups.len(),
            self.config.group_size
        ));

        let mut done = 0;
        for group in groups {
            if log.has_all(group) {
                summary.skipped_groups += 1;
                self.reporter.skipped(group);
            } else {
                self.process_group(group, log, &mut summary)?;
            }

            done += group.len();
            if let Some(last_key) = group.last() {
                self.reporter.progress(done, items.len(), last_key);
            }
        }

        self.reporter.finish();
        Ok(summary)
    }

    fn process_group(
        &mut self,
        group: &[String],
        log: &mut ResultLog,
        summary: &mut RunSummary,
    ) -> Result<(), RunError> {
        let first_key = group.first().cloned().unwrap_or_default();

        summary.processor_calls += 1;
        let results = if self.config.group_size.get() == 1 {
            group
                .iter()
                .map(|key| self.processor.process_one(key))
                .collect::<Result<Vec<_>, _>>()
        } else {
            self.processor.process_batch(group)
        }
        .map_err(|source| RunError::ProcessorFailure {
            first_key: first_key.clone(),
            source,
        })?;

        if results.len() != group.len() {
            return Err(RunError::ResultCountMismatch {
                first_key,
                expected: group.len(),
                actual: results.len(),
            });
        }

        for (key, faces) in group.iter().zip(&results) {
            if log.persist(key, faces)? {
                summary.persisted += 1;
            } else {
                summary.already_present += 1;
                log::info!("[{key}] already persisted. Skipping.");
            }
        }
        Ok(())
    }
}
