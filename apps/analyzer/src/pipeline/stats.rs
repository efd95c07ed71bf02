use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Per-outcome counters shared by all workers and read by `/health`.
#[derive(Debug, Default)]
pub struct Stats {
    processed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    degraded: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub processed: u64,
    pub skipped: u64,
    pub failed: u64,
    pub degraded: u64,
}

impl Stats {
    pub fn record_processed(&self, degraded: bool) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        if degraded {
            self.degraded.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}
