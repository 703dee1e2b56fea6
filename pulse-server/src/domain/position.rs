//! Live vehicle position records.
//!
//! One record per vehicle per feed poll. Records are inputs to the engine
//! and are never stored; validation happens once, before matching, so the
//! matcher and computer can assume well-formed coordinates and timestamps.

use chrono::{DateTime, Duration, Utc};
use geo::Point;

use super::ids::{RouteId, TripId, VehicleId};

/// A vehicle position as reported by the live feed.
#[derive(Debug, Clone, PartialEq)]
pub struct VehiclePosition {
    /// Reporting vehicle.
    pub vehicle_id: VehicleId,

    /// Trip the vehicle is currently serving, when the feed knows it.
    pub trip_id: Option<TripId>,

    /// Route the vehicle is assigned to.
    pub route_id: Option<RouteId>,

    /// Latitude in decimal degrees (WGS 84).
    pub latitude: f64,

    /// Longitude in decimal degrees (WGS 84).
    pub longitude: f64,

    /// Heading in degrees clockwise from north.
    pub bearing: Option<f64>,

    /// Ground speed in metres per second.
    pub speed: Option<f64>,

    /// Explicit schedule deviation in seconds, when the feed carries one.
    /// Positive means late.
    pub delay_seconds: Option<i64>,

    /// When the position was measured.
    pub timestamp: DateTime<Utc>,
}

/// Error describing why a vehicle record was rejected before matching.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PositionError {
    #[error("latitude {0} out of range [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} out of range [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("position is {age_secs}s old, beyond the {ceiling_secs}s staleness ceiling")]
    StalePosition { age_secs: i64, ceiling_secs: i64 },

    #[error("position timestamp is {ahead_secs}s in the future")]
    FutureTimestamp { ahead_secs: i64 },
}

/// Tolerated clock skew, in seconds, for feed timestamps ahead of local
/// time.
const MAX_CLOCK_SKEW_SECS: i64 = 30;

impl VehiclePosition {
    /// Validate the record against coordinate ranges and the staleness
    /// ceiling. Rejected records are skipped upstream and counted, never
    /// matched or stored.
    pub fn validate(&self, now: DateTime<Utc>, max_age: Duration) -> Result<(), PositionError> {
        if !self.latitude.is_finite() || self.latitude.abs() > 90.0 {
            return Err(PositionError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || self.longitude.abs() > 180.0 {
            return Err(PositionError::LongitudeOutOfRange(self.longitude));
        }

        let age = now - self.timestamp;
        if age > max_age {
            return Err(PositionError::StalePosition {
                age_secs: age.num_seconds(),
                ceiling_secs: max_age.num_seconds(),
            });
        }
        if age < -Duration::seconds(MAX_CLOCK_SKEW_SECS) {
            return Err(PositionError::FutureTimestamp {
                ahead_secs: (-age).num_seconds(),
            });
        }

        Ok(())
    }

    /// The position as a geo point (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Age of the position measurement at `now`. Clamped at zero for
    /// timestamps within the tolerated clock skew.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.timestamp).max(Duration::zero())
    }
}
