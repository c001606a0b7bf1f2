//! Progress bar for batch runs.
//!
//! The bar is created before logging starts so that [`BarLogWriter`] can
//! clear it around each log line; it only becomes visible in
//! [`ProgressObserver::new`].

use std::io::{self, Write};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use paper_fetch::{BatchObserver, DoiState, FetchOutcome};

/// A bar that draws nothing until a run makes it visible.
pub(crate) fn idle_bar() -> ProgressBar {
    ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
}

/// Stderr log writer that suspends the bar while a line is written.
pub(crate) struct BarLogWriter {
    bar: ProgressBar,
}

impl BarLogWriter {
    pub(crate) fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Write for BarLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bar.suspend(|| io::stderr().write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// Progress bar driven by orchestrator callbacks.
pub(crate) struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    /// Sizes `bar` for `total` DOIs and draws it on stderr when `visible`.
    pub(crate) fn new(bar: ProgressBar, total: usize, visible: bool) -> Self {
        bar.set_length(total as u64);
        if visible {
            bar.set_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar.enable_steady_tick(Duration::from_millis(120));
        }
        Self { bar }
    }

    /// Clears the bar from the terminal.
    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }

    #[cfg(test)]
    fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl BatchObserver for ProgressObserver {
    fn on_state(&self, _index: usize, doi: &str, state: DoiState) {
        let label = match state {
            DoiState::TryingMirrors => "mirrors",
            DoiState::TryingFallback => "open-access lookup",
            _ => return,
        };
        self.bar.set_message(format!("{doi} via {label}..."));
    }

    fn on_finish(&self, _index: usize, outcome: &FetchOutcome) {
        self.bar.inc(1);
        if let FetchOutcome::Failure(record) = outcome {
            self.bar.set_message(format!("{} failed: {}", record.doi, record.reason));
        }
    }
}
