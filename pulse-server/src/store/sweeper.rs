//! Expiry sweeping.
//!
//! Reads already treat expired predictions as absent; the sweeper is the
//! garbage collector that physically removes them. It runs on its own
//! low-frequency timer and deletes with a per-record compare-and-delete,
//! so it never races an upsert into removing a live record and never
//! blocks unrelated keys.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::PredictionStore;

/// Periodically evicts expired predictions from a store.
pub struct ExpirySweeper {
    store: Arc<PredictionStore>,
}

impl ExpirySweeper {
    pub fn new(store: Arc<PredictionStore>) -> Self {
        Self { store }
    }

    /// Remove every record expired at `now`; returns the deleted count.
    ///
    /// Scanning and deleting are separate passes: the scan collects
    /// candidate keys, then each candidate is re-checked under its shard
    /// lock before removal. A record upserted after the scan therefore
    /// survives. Idempotent: with no intervening writes a second sweep
    /// deletes nothing.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let candidates = self.store.expired_keys(now);
        if candidates.is_empty() {
            return 0;
        }

        let mut removed = 0usize;
        for key in candidates {
            if self.store.remove_if_expired(&key, now) {
                removed += 1;
            } else {
                debug!(
                    stop = %key.stop_id,
                    trip = %key.trip_id,
                    "expired record was refreshed mid-sweep; kept"
                );
            }
        }

        removed
    }
}
