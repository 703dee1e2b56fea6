//! Engine counters.
//!
//! Cheap shared counters covering the write path and the sweeper,
//! surfaced through the stats endpoint. Counters only ever increase;
//! rates and fractions are derived by consumers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared engine counters.
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    /// Completed write-path cycles.
    pub cycles_completed: Arc<AtomicU64>,

    /// Cycles that ran longer than the poll interval (the following tick
    /// was dropped).
    pub cycles_overrun: Arc<AtomicU64>,

    /// Cycles that failed outright (feed unavailable).
    pub cycles_failed: Arc<AtomicU64>,

    /// Vehicle records seen across all cycles.
    pub vehicles_seen: Arc<AtomicU64>,

    /// Records rejected by validation (bad coordinates, stale timestamp).
    pub vehicles_invalid: Arc<AtomicU64>,

    /// Records without a usable trip assignment.
    pub vehicles_no_trip: Arc<AtomicU64>,

    /// Records whose trip the schedule does not know.
    pub vehicles_unknown_trip: Arc<AtomicU64>,

    /// Predictions newly inserted.
    pub predictions_created: Arc<AtomicU64>,

    /// Predictions that replaced an older record.
    pub predictions_updated: Arc<AtomicU64>,

    /// Writes dropped because a newer record already existed.
    pub predictions_stale_dropped: Arc<AtomicU64>,

    /// Records physically removed by the sweeper.
    pub predictions_swept: Arc<AtomicU64>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc(&self, counter: &AtomicU64) {
        self.add(counter, 1);
    }

    /// A point-in-time copy of every counter.
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_overrun: self.cycles_overrun.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            vehicles_seen: self.vehicles_seen.load(Ordering::Relaxed),
            vehicles_invalid: self.vehicles_invalid.load(Ordering::Relaxed),
            vehicles_no_trip: self.vehicles_no_trip.load(Ordering::Relaxed),
            vehicles_unknown_trip: self.vehicles_unknown_trip.load(Ordering::Relaxed),
            predictions_created: self.predictions_created.load(Ordering::Relaxed),
            predictions_updated: self.predictions_updated.load(Ordering::Relaxed),
            predictions_stale_dropped: self.predictions_stale_dropped.load(Ordering::Relaxed),
            predictions_swept: self.predictions_swept.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot of the engine counters.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSummary {
    pub cycles_completed: u64,
    pub cycles_overrun: u64,
    pub cycles_failed: u64,
    pub vehicles_seen: u64,
    pub vehicles_invalid: u64,
    pub vehicles_no_trip: u64,
    pub vehicles_unknown_trip: u64,
    pub predictions_created: u64,
    pub predictions_updated: u64,
    pub predictions_stale_dropped: u64,
    pub predictions_swept: u64,
}
