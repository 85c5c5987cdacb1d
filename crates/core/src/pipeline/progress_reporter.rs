use std::time::Instant;

/// Per-run observer for batch progress.
///
/// Passed into each use case at construction so callers decide where
/// progress goes (log output, a terminal bar, nothing) without any
/// process-wide state.
pub trait ProgressReporter: Send {
    /// `current` of `total` items are handled; `last_key` is the most recent one.
    fn progress(&mut self, current: usize, total: usize, last_key: &str);

    /// A group was skipped because all of its keys were already recorded.
    fn skipped(&mut self, keys: &[String]);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run report. Default: no-op.
    fn finish(&mut self) {}
}

/// Silent reporter that discards all events.
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn progress(&mut self, _current: usize, _total: usize, _last_key: &str) {}
    fn skipped(&mut self, _keys: &[String]) {}
    fn info(&mut self, _message: &str) {}
}

/// Reports through the `log` crate.
///
/// Progress lines are throttled to one every `throttle_items` items (plus
/// the final one) so large datasets don't flood the log.
pub struct LogProgressReporter {
    throttle_items: usize,
    next_report: usize,
    start_time: Instant,
    processed: usize,
    skipped_items: usize,
    reported_lines: usize,
}

impl LogProgressReporter {
    pub fn new(throttle_items: usize) -> Self {
        let throttle_items = throttle_items.max(1);
        Self {
            throttle_items,
            next_report: throttle_items,
            start_time: Instant::now(),
            processed: 0,
            skipped_items: 0,
            reported_lines: 0,
        }
    }

    /// Returns the end-of-run summary, or `None` if nothing was processed.
    pub fn summary_string(&self) -> Option<String> {
        if self.processed == 0 {
            return None;
        }
        let secs = self.start_time.elapsed().as_secs_f64();
        let mut line = format!(
            "Done: {} items ({} already recorded) in {secs:.1}s",
            self.processed, self.skipped_items
        );
        if secs > 0.0 {
            line.push_str(&format!(
                ", {:.1} items/s",
                self.processed as f64 / secs
            ));
        }
        Some(line)
    }
}

impl Default for LogProgressReporter {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ProgressReporter for LogProgressReporter {
    fn progress(&mut self, current: usize, total: usize, last_key: &str) {
        self.processed = current;
        if total == 0 {
            return;
        }
        if current >= self.next_report || current == total {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processing: {current}/{total} ({pct:.1}%) {last_key}");
            self.reported_lines += 1;
            while self.next_report <= current {
                self.next_report += self.throttle_items;
            }
        }
    }

    fn skipped(&mut self, keys: &[String]) {
        self.skipped_items += keys.len();
        match (keys.first(), keys.last()) {
            (Some(first), Some(last)) if keys.len() > 1 => {
                log::debug!("[{first} ... {last}] already persisted. Skipping.")
            }
            (Some(only), _) => log::debug!("[{only}] already persisted. Skipping."),
            _ => {}
        }
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn finish(&mut self) {
        if let Some(text) = self.summary_string() {
            log::info!("{text}");
        }
    }
}
