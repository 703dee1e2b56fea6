//! Stop matching.
//!
//! Given a vehicle position, determine which stops of its trip are still
//! ahead of it. Matching is anchored on geodesic proximity (haversine, via
//! the geo crate) combined with per-vehicle progress from previous cycles,
//! so a vehicle never walks backwards along its stop sequence and is not
//! re-anchored from scratch every poll.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use geo::HaversineDistance;
use tracing::debug;

use crate::domain::{ScheduledStopTime, StopRef, VehiclePosition};
use crate::schedule::ScheduleIndex;

use super::progress::{ProgressTracker, TripProgress};

/// Matches vehicles to the upcoming stops of their trips.
pub struct StopMatcher {
    schedule: Arc<ScheduleIndex>,
    progress: ProgressTracker,

    /// Vehicles within this distance of a stop count as having reached it.
    arrival_radius_m: f64,
}

impl StopMatcher {
    pub fn new(
        schedule: Arc<ScheduleIndex>,
        progress: ProgressTracker,
        arrival_radius_m: f64,
    ) -> Self {
        Self {
            schedule,
            progress,
            arrival_radius_m,
        }
    }

    /// The not-yet-served stops of the vehicle's trip, ascending by stop
    /// sequence, at most `horizon` entries.
    ///
    /// Returns `None` when the vehicle carries no trip or the trip is
    /// unknown to the schedule (the caller counts the skip); `Some` with
    /// an empty vector when the trip is known but fully served.
    pub fn upcoming_stops(
        &self,
        vehicle: &VehiclePosition,
        horizon: usize,
        now: DateTime<Utc>,
    ) -> Option<Vec<StopRef>> {
        let trip_id = vehicle.trip_id.as_ref()?;
        let Some(stop_times) = self.schedule.stop_times_for_trip(trip_id) else {
            debug!(vehicle = %vehicle.vehicle_id, trip = %trip_id, "trip unknown to schedule");
            return None;
        };

        // Prior progress only counts while the vehicle stays on the same
        // trip; a reassignment starts matching over.
        let floor = self
            .progress
            .get(&vehicle.vehicle_id)
            .filter(|p| &p.trip_id == trip_id)
            .and_then(|p| p.last_served_sequence);

        let candidates: Vec<&ScheduledStopTime> = stop_times
            .iter()
            .filter(|st| floor.is_none_or(|f| st.stop_sequence > f))
            .collect();

        if candidates.is_empty() {
            // Nothing left ahead; remember the end-of-trip position.
            self.record(vehicle, trip_id.clone(), floor, now);
            return Some(Vec::new());
        }

        let anchor = self.nearest_candidate(vehicle, &candidates);
        let anchor_served = anchor
            .1
            .is_some_and(|dist_m| dist_m <= self.arrival_radius_m);
        let anchor_seq = anchor.0.stop_sequence;

        // Everything before the anchor has been passed; the anchor itself
        // is being served when the vehicle is within the arrival radius.
        let first_upcoming_seq = if anchor_served {
            anchor_seq + 1
        } else {
            anchor_seq
        };
        let last_served = stop_times
            .iter()
            .map(|st| st.stop_sequence)
            .filter(|&seq| seq < first_upcoming_seq)
            .max()
            .max(floor);

        self.record(vehicle, trip_id.clone(), last_served, now);

        let upcoming = stop_times
            .iter()
            .filter(|st| st.stop_sequence >= first_upcoming_seq)
            .filter(|st| {
                if self.schedule.stop(&st.stop_id).is_none() {
                    debug!(
                        vehicle = %vehicle.vehicle_id,
                        stop = %st.stop_id,
                        "skipping stop with no timetable entry"
                    );
                    return false;
                }
                true
            })
            .take(horizon)
            .enumerate()
            .map(|(i, st)| StopRef {
                stop_id: st.stop_id.clone(),
                stop_sequence: st.stop_sequence,
                scheduled_arrival: st.scheduled_arrival,
                scheduled_departure: st.scheduled_departure,
                stops_ahead: i as u32,
            })
            .collect();

        Some(upcoming)
    }

    /// The candidate stop nearest the vehicle, with its distance in metres
    /// when the stop's coordinates are known. Candidates are in sequence
    /// order and comparison is strict, so ties resolve to the lower stop
    /// sequence. Falls back to the first candidate when no coordinates are
    /// available at all.
    fn nearest_candidate<'a>(
        &self,
        vehicle: &VehiclePosition,
        candidates: &[&'a ScheduledStopTime],
    ) -> (&'a ScheduledStopTime, Option<f64>) {
        let point = vehicle.point();
        let mut best: Option<(&'a ScheduledStopTime, f64)> = None;

        for &st in candidates {
            let Some(stop) = self.schedule.stop(&st.stop_id) else {
                continue;
            };
            let dist = point.haversine_distance(&stop.point());
            if best.is_none_or(|(_, d)| dist < d) {
                best = Some((st, dist));
            }
        }

        match best {
            Some((st, dist)) => (st, Some(dist)),
            None => (candidates[0], None),
        }
    }

    fn record(
        &self,
        vehicle: &VehiclePosition,
        trip_id: crate::domain::TripId,
        last_served_sequence: Option<u32>,
        now: DateTime<Utc>,
    ) {
        self.progress.record(
            vehicle.vehicle_id.clone(),
            TripProgress {
                trip_id,
                last_served_sequence,
                updated_at: now,
            },
        );
    }
}
