//! Progress reporting for long-running scans
//!
//! A scan notifies a [`ProgressReporter`] when it starts, every N documents,
//! when it recovers a lost cursor, and when it finishes. Reporters are
//! fire-and-forget: they never fail the scan.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

/// Receiver of scan progress notifications.
pub trait ProgressReporter: Send {
    /// The scan counted `total` documents and opened its first cursor.
    fn started(&mut self, total: u64);

    /// `emitted` documents of `total` have been delivered.
    fn advanced(&mut self, emitted: u64, total: u64);

    /// The cursor was lost after `emitted` documents and is being rebuilt.
    fn resumed(&mut self, emitted: u64);

    /// The scan is exhausted after `emitted` documents.
    fn finished(&mut self, emitted: u64);
}

/// Reports progress through `tracing`.
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn started(&mut self, total: u64) {
        info!("Iterating over {} documents", total);
    }

    fn advanced(&mut self, emitted: u64, total: u64) {
        info!("Processed document {} of {}", emitted, total);
    }

    fn resumed(&mut self, emitted: u64) {
        warn!("Lost cursor after {} documents, reinitializing", emitted);
    }

    fn finished(&mut self, emitted: u64) {
        info!("Scan complete after {} documents", emitted);
    }
}

/// Discards every notification.
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn started(&mut self, _total: u64) {}
    fn advanced(&mut self, _emitted: u64, _total: u64) {}
    fn resumed(&mut self, _emitted: u64) {}
    fn finished(&mut self, _emitted: u64) {}
}

/// Terminal progress bar with throughput.
///
/// The bar is created lazily once the total is known. Cursor loss is still
/// logged through `tracing`.
pub struct BarProgress {
    /// Progress bar, created on `started`
    bar: Option<ProgressBar>,
    /// Start time of the scan
    start_time: Instant,
    /// Draw the bar at all (hidden bars keep the bookkeeping for tests)
    visible: bool,
}

impl BarProgress {
    /// Create a progress bar reporter
    ///
    /// # Arguments
    /// * `visible` - Whether to draw the bar on stderr
    pub fn new(visible: bool) -> Self {
        Self {
            bar: None,
            start_time: Instant::now(),
            visible,
        }
    }

    /// Current bar position, if the scan has started.
    pub fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(|bar| bar.position())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl ProgressReporter for BarProgress {
    fn started(&mut self, total: u64) {
        let bar = if self.visible {
            ProgressBar::new(total)
        } else {
            ProgressBar::hidden()
        };
        bar.set_length(total);
        bar.set_style(Self::bar_style());
        bar.suspend(|| info!("Iterating over {} documents", total));
        self.start_time = Instant::now();
        self.bar = Some(bar);
    }

    fn advanced(&mut self, emitted: u64, _total: u64) {
        if let Some(ref bar) = self.bar {
            bar.set_position(emitted);

            let elapsed = self.start_time.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                let speed = emitted as f64 / elapsed;
                bar.set_message(format!("({:.0} docs/sec)", speed));
            }
        }
    }

    fn resumed(&mut self, emitted: u64) {
        match self.bar {
            Some(ref bar) => bar.suspend(|| {
                warn!("Lost cursor after {} documents, reinitializing", emitted)
            }),
            None => warn!("Lost cursor after {} documents, reinitializing", emitted),
        }
    }

    fn finished(&mut self, emitted: u64) {
        if let Some(ref bar) = self.bar {
            bar.set_position(emitted);
            bar.finish_and_clear();
        }
    }
}
