//! Latency histogram and outcome counters for narrative generator calls.
//! Recorded by the enrichment step, read by `/health` and `/stats/latency`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// How a bounded narrative call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Ok,
    Failed,
    TimedOut,
}

/// Shared call stats. Values stored in microseconds.
pub struct Telemetry {
    latency: Mutex<hdrhistogram::Histogram<u64>>,
    ok: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    /// Summary requested but no generator configured.
    skipped: AtomicU64,
}

impl Telemetry {
    /// Tracks 1us to 100s, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 100_000_000, 3)
            .expect("valid histogram bounds");
        Self {
            latency: Mutex::new(histogram),
            ok: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn record(&self, elapsed: Duration, outcome: CallOutcome) {
        let us = elapsed.as_micros().min(u128::from(u64::MAX)) as u64;
        if let Ok(mut h) = self.latency.lock() {
            let _ = h.record(us.max(1));
        }
        let counter = match outcome {
            CallOutcome::Ok => &self.ok,
            CallOutcome::Failed => &self.failed,
            CallOutcome::TimedOut => &self.timed_out,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Return (p50_us, p95_us, p99_us). None if no samples.
    pub fn percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        let Ok(h) = self.latency.lock() else {
            return (None, None, None);
        };
        if h.len() == 0 {
            return (None, None, None);
        }
        (
            Some(h.value_at_quantile(0.5)),
            Some(h.value_at_quantile(0.95)),
            Some(h.value_at_quantile(0.99)),
        )
    }

    pub fn sample_count(&self) -> u64 {
        self.latency.lock().map(|h| h.len()).unwrap_or(0)
    }

    pub fn ok(&self) -> u64 {
        self.ok.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_has_no_percentiles() {
        let t = Telemetry::new();
        assert_eq!(t.percentiles(), (None, None, None));
        assert_eq!(t.sample_count(), 0);
    }

    #[test]
    fn outcomes_land_in_their_counters() {
        let t = Telemetry::new();
        t.record(Duration::from_millis(5), CallOutcome::Ok);
        t.record(Duration::from_millis(7), CallOutcome::Ok);
        t.record(Duration::from_millis(9), CallOutcome::Failed);
        t.record(Duration::from_secs(1), CallOutcome::TimedOut);
        t.record_skipped();

        assert_eq!((t.ok(), t.failed(), t.timed_out(), t.skipped()), (2, 1, 1, 1));
        assert_eq!(t.sample_count(), 4);

        let (p50, _, p99) = t.percentiles();
        let p50 = p50.unwrap();
        assert!((5_000..=10_000).contains(&p50), "p50={p50}");
        assert!(p99.unwrap() >= 990_000);
    }
}
