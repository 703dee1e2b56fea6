//! Arrival predictions.
//!
//! `StopPrediction` is the record the whole engine exists to produce. The
//! constructor enforces the record invariants, so any prediction reaching
//! the store or the wire satisfies them:
//!
//! - `predicted_arrival_time == scheduled_arrival_time + arrival_delay_seconds`
//! - `0.0 <= confidence_level <= 1.0`
//! - `expires_at > created_at`
//!
//! Predictions are never mutated after construction; supersession is a
//! whole-record replacement in the store.

use chrono::{DateTime, Duration, Utc};

use super::ids::{RouteId, StopId, TripId, VehicleId};

/// Where a prediction's delay estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// No usable live signal; the schedule is echoed back.
    ScheduleOnly,

    /// Derived from the vehicle's reported speed and remaining distance.
    Computed,

    /// An explicit delay signal from the live feed.
    Realtime,
}

/// Identity of a prediction: at most one active record per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PredictionKey {
    pub stop_id: StopId,
    pub trip_id: TripId,
}

/// A confidence-scored arrival estimate for one (stop, trip) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct StopPrediction {
    pub stop_id: StopId,
    pub trip_id: TripId,
    pub route_id: RouteId,
    pub vehicle_id: VehicleId,

    pub predicted_arrival_time: DateTime<Utc>,
    pub scheduled_arrival_time: DateTime<Utc>,

    /// Signed schedule deviation in seconds; positive means late.
    pub arrival_delay_seconds: i64,

    /// Normalized trust in this estimate, in [0, 1].
    pub confidence_level: f64,

    pub prediction_source: PredictionSource,

    /// True when a live signal (explicit delay or position-derived estimate)
    /// fed into the prediction.
    pub is_real_time: bool,

    pub headsign: Option<String>,
    pub direction_id: Option<u8>,
    pub stop_sequence: u32,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Everything the computer hands over to build a prediction.
///
/// `predicted_arrival_time` and `expires_at` are derived, not supplied:
/// the predicted time is always `scheduled + delay`, and expiry is the
/// predicted time plus the grace window (floored so it stays strictly
/// after `created_at`).
#[derive(Debug, Clone)]
pub struct PredictionParts {
    pub stop_id: StopId,
    pub trip_id: TripId,
    pub route_id: RouteId,
    pub vehicle_id: VehicleId,
    pub scheduled_arrival_time: DateTime<Utc>,
    pub arrival_delay_seconds: i64,
    pub confidence_level: f64,
    pub prediction_source: PredictionSource,
    pub headsign: Option<String>,
    pub direction_id: Option<u8>,
    pub stop_sequence: u32,
}

impl StopPrediction {
    /// Build a prediction, deriving the dependent fields.
    ///
    /// `confidence_level` is clamped into [0, 1]; NaN becomes 0.
    pub fn new(parts: PredictionParts, created_at: DateTime<Utc>, grace_window: Duration) -> Self {
        let predicted_arrival_time =
            parts.scheduled_arrival_time + Duration::seconds(parts.arrival_delay_seconds);

        // A prediction whose predicted time already passed still gets a
        // strictly-positive lifetime so the expiry invariant holds.
        let expires_at =
            (predicted_arrival_time + grace_window).max(created_at + Duration::seconds(1));

        let confidence_level = if parts.confidence_level.is_nan() {
            0.0
        } else {
            parts.confidence_level.clamp(0.0, 1.0)
        };

        Self {
            stop_id: parts.stop_id,
            trip_id: parts.trip_id,
            route_id: parts.route_id,
            vehicle_id: parts.vehicle_id,
            predicted_arrival_time,
            scheduled_arrival_time: parts.scheduled_arrival_time,
            arrival_delay_seconds: parts.arrival_delay_seconds,
            confidence_level,
            prediction_source: parts.prediction_source,
            is_real_time: parts.prediction_source != PredictionSource::ScheduleOnly,
            headsign: parts.headsign,
            direction_id: parts.direction_id,
            stop_sequence: parts.stop_sequence,
            created_at,
            expires_at,
        }
    }

    /// The record's identity key.
    pub fn key(&self) -> PredictionKey {
        PredictionKey {
            stop_id: self.stop_id.clone(),
            trip_id: self.trip_id.clone(),
        }
    }

    /// Whether the record is logically dead at `now`. Expired records are
    /// treated as absent by all reads, ahead of physical removal.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}



#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The three record invariants hold for any delay/confidence input.
        #[test]
        fn invariants_hold(
            delay in -3600i64..7200,
            confidence in -2.0f64..3.0,
            grace_secs in 0i64..1800,
            offset_mins in -120i64..120,
        ) {
            let now = Utc::now();
            let scheduled = now + Duration::minutes(offset_mins);
            let p = StopPrediction::new(
                PredictionParts {
                    stop_id: StopId::parse("s").unwrap(),
                    trip_id: TripId::parse("t").unwrap(),
                    route_id: RouteId::parse("r").unwrap(),
                    vehicle_id: VehicleId::parse("v").unwrap(),
                    scheduled_arrival_time: scheduled,
                    arrival_delay_seconds: delay,
                    confidence_level: confidence,
                    prediction_source: PredictionSource::Computed,
                    headsign: None,
                    direction_id: None,
                    stop_sequence: 0,
                },
                now,
                Duration::seconds(grace_secs),
            );

            prop_assert!(p.expires_at > p.created_at);
            prop_assert!((0.0..=1.0).contains(&p.confidence_level));
            prop_assert_eq!(
                p.predicted_arrival_time,
                p.scheduled_arrival_time + Duration::seconds(p.arrival_delay_seconds)
            );
        }
    }
}
