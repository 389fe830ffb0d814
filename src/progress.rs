//! Progress reporting
//!
//! Observers receive step and per-row events from the search passes.
//! They are purely observational and never influence results.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Progress observer for long-running passes
///
/// `Sync` is required because parallel searches report from worker threads.
pub trait ProgressCallback: Sync {
    /// A step is starting
    fn on_step_start(&self, _message: &str) {}

    /// `current` of `total` reference rows are finished
    fn on_step_progress(&self, _current: usize, _total: usize) {}

    /// A step finished
    fn on_step_complete(&self, _step: &str, _detail: &str) {}

    /// Diagnostic message
    fn on_debug(&self, _message: &str) {}
}

/// Discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {}

/// Forwards events to `tracing`, including the remaining row count
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_step_start(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn on_step_progress(&self, current: usize, total: usize) {
        tracing::trace!(remaining = total.saturating_sub(current), "row finished");
    }

    fn on_step_complete(&self, step: &str, detail: &str) {
        tracing::info!("{}: {}", step, detail);
    }

    fn on_debug(&self, message: &str) {
        tracing::debug!("{}", message);
    }
}

/// Terminal progress bar for the CLI
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
    verbose: u8,
    hidden: bool,
}

impl ConsoleProgress {
    /// Create a console reporter; `hidden` suppresses the bar (e.g. for `--json`)
    pub fn new(verbose: u8, hidden: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            verbose,
            hidden,
        }
    }

    fn new_bar(&self, total: usize) -> ProgressBar {
        if self.hidden {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({eta} left)",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        bar
    }
}

impl ProgressCallback for ConsoleProgress {
    fn on_step_start(&self, message: &str) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
        if !self.hidden {
            eprintln!("{}", message);
        }
    }

    fn on_step_progress(&self, current: usize, total: usize) {
        if let Ok(mut guard) = self.bar.lock() {
            let bar = guard.get_or_insert_with(|| self.new_bar(total));
            bar.set_position(current as u64);
        }
    }

    fn on_step_complete(&self, step: &str, detail: &str) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
        if !self.hidden {
            eprintln!("✔ {}: {}", step, detail);
        }
    }

    fn on_debug(&self, message: &str) {
        if self.verbose >= 2 && !self.hidden {
            eprintln!("  {}", message);
        }
        tracing::debug!("{}", message);
    }
}
