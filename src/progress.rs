//! Progress tracking shared between worker pools and the UI.
//!
//! The counters are plain atomics so worker threads can increment without
//! locking; only the throughput sample ring is mutex guarded, and it is
//! touched at most once per hundred increments.

use indicatif::{ProgressBar, ProgressStyle};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How often (in processed items) a throughput sample is recorded.
const SAMPLE_EVERY: u64 = 100;

/// Samples older than this are dropped from the throughput window.
const SAMPLE_WINDOW: Duration = Duration::from_secs(10);

/// Monotonic progress counter with a rolling throughput estimate.
///
/// Safe to share across threads via `Arc`; `increment` is lock free.
pub struct ScanProgress {
    processed: AtomicU64,
    total: AtomicU64,
    started: Instant,
    samples: Mutex<VecDeque<(Instant, u64)>>,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            processed: AtomicU64::new(0),
            total: AtomicU64::new(0),
            started: Instant::now(),
            samples: Mutex::new(VecDeque::with_capacity(128)),
        }
    }

    /// Set the total number of items, once enumeration has established it.
    pub fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
    }

    /// Record one processed item.
    pub fn increment(&self) {
        let done = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % SAMPLE_EVERY == 0 {
            self.record_sample(done);
        }
    }

    /// Record several processed items at once.
    pub fn increment_by(&self, amount: u64) {
        let done = self.processed.fetch_add(amount, Ordering::Relaxed) + amount;
        self.record_sample(done);
    }

    fn record_sample(&self, done: u64) {
        if let Ok(mut samples) = self.samples.lock() {
            let now = Instant::now();
            samples.push_back((now, done));
            while samples
                .front()
                .is_some_and(|(at, _)| now.duration_since(*at) > SAMPLE_WINDOW)
            {
                samples.pop_front();
            }
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.processed() as f64 / total as f64) * 100.0
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Items per second over the recent sample window, if enough samples
    /// have accumulated to say anything meaningful.
    pub fn throughput(&self) -> Option<f64> {
        let samples = self.samples.lock().ok()?;
        let (first_at, first_count) = samples.front()?;
        let (last_at, last_count) = samples.back()?;

        let span = last_at.duration_since(*first_at);
        if span.as_secs_f64() < 0.1 {
            return None;
        }

        Some((last_count - first_count) as f64 / span.as_secs_f64())
    }

    /// Estimated time to completion, derived from the rolling throughput.
    pub fn eta(&self) -> Option<Duration> {
        let rate = self.throughput()?;
        if rate < 0.1 {
            return None;
        }
        let remaining = self.total().saturating_sub(self.processed());
        Some(Duration::from_secs_f64(remaining as f64 / rate))
    }

    pub fn format_eta(&self) -> String {
        match self.eta() {
            Some(eta) => {
                let secs = eta.as_secs();
                if secs < 60 {
                    format!("{}s", secs)
                } else if secs < 3600 {
                    format!("{}m {}s", secs / 60, secs % 60)
                } else {
                    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
                }
            }
            None => "calculating...".to_string(),
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a spinner for indeterminate progress
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Create a progress bar with throughput and ETA display
pub fn create_progress_bar(total: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) ETA: {eta} {msg}")
            .unwrap()
            .progress_chars("█▓░"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
