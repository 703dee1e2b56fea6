//! Per-vehicle trip progress.
//!
//! The matcher remembers how far along its trip each vehicle has got, so
//! it does not re-anchor from scratch every cycle and never walks a
//! vehicle backwards along its stop sequence. The state is a bounded
//! TTL cache: a vehicle that stops reporting is forgotten after the
//! configured timeout, and capacity is capped so a misbehaving feed
//! cannot grow memory without bound.

use chrono::{DateTime, Utc};
use moka::sync::Cache;

use crate::domain::{TripId, VehicleId};

/// Last known progress of a vehicle along a trip.
#[derive(Debug, Clone, PartialEq)]
pub struct TripProgress {
    /// Trip the progress refers to; a trip change invalidates it.
    pub trip_id: TripId,

    /// Highest stop sequence known to have been served, if any.
    pub last_served_sequence: Option<u32>,

    /// When this progress was recorded.
    pub updated_at: DateTime<Utc>,
}

/// Bounded, self-evicting store of per-vehicle progress.
#[derive(Clone)]
pub struct ProgressTracker {
    cache: Cache<VehicleId, TripProgress>,
}

impl ProgressTracker {
    /// Create a tracker evicting entries `ttl` after their last update,
    /// holding at most `capacity` vehicles.
    pub fn new(ttl: std::time::Duration, capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(ttl)
                .max_capacity(capacity)
                .build(),
        }
    }

    /// Progress for a vehicle, if it reported recently enough.
    pub fn get(&self, vehicle_id: &VehicleId) -> Option<TripProgress> {
        self.cache.get(vehicle_id)
    }

    /// Record progress for a vehicle, replacing any previous entry.
    pub fn record(&self, vehicle_id: VehicleId, progress: TripProgress) {
        self.cache.insert(vehicle_id, progress);
    }

    /// Number of tracked vehicles (eventually consistent).
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Force pending cache maintenance; used by tests that assert on
    /// `len`.
    pub fn flush(&self) {
        self.cache.run_pending_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn progress(trip: &str, seq: Option<u32>) -> TripProgress {
        TripProgress {
            trip_id: TripId::parse(trip).unwrap(),
            last_served_sequence: seq,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn record_and_get() {
        let tracker = ProgressTracker::new(Duration::from_secs(600), 100);
        let vehicle = VehicleId::parse("v1").unwrap();

        assert!(tracker.get(&vehicle).is_none());

        tracker.record(vehicle.clone(), progress("t1", Some(3)));
        let got = tracker.get(&vehicle).unwrap();
        assert_eq!(got.trip_id.as_str(), "t1");
        assert_eq!(got.last_served_sequence, Some(3));
    }

    #[test]
    fn record_replaces() {
        let tracker = ProgressTracker::new(Duration::from_secs(600), 100);
        let vehicle = VehicleId::parse("v1").unwrap();

        tracker.record(vehicle.clone(), progress("t1", Some(2)));
        tracker.record(vehicle.clone(), progress("t1", Some(5)));

        assert_eq!(
            tracker.get(&vehicle).unwrap().last_served_sequence,
            Some(5)
        );
    }

    #[test]
    fn entries_expire_after_ttl() {
        let tracker = ProgressTracker::new(Duration::from_millis(10), 100);
        let vehicle = VehicleId::parse("v1").unwrap();

        tracker.record(vehicle.clone(), progress("t1", Some(1)));
        std::thread::sleep(Duration::from_millis(30));

        assert!(tracker.get(&vehicle).is_none());
    }

    #[test]
    fn len_counts_vehicles() {
        let tracker = ProgressTracker::new(Duration::from_secs(600), 100);
        tracker.record(VehicleId::parse("v1").unwrap(), progress("t1", None));
        tracker.record(VehicleId::parse("v2").unwrap(), progress("t2", None));
        tracker.flush();
        assert_eq!(tracker.len(), 2);
    }
}
