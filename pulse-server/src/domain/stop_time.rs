//! Scheduled stop times and matcher output.

use chrono::{DateTime, Utc};

use super::ids::{StopId, TripId};

/// One scheduled call of a trip at a stop.
///
/// Times are UTC datetimes already resolved for the service day by the
/// timetable provider. Immutable for the day.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ScheduledStopTime {
    pub trip_id: TripId,
    pub stop_id: StopId,

    /// Ordinal position of this call along the trip.
    pub stop_sequence: u32,

    pub scheduled_arrival: DateTime<Utc>,
    pub scheduled_departure: DateTime<Utc>,
}

/// An upcoming stop for a vehicle, as produced by the matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopRef {
    pub stop_id: StopId,
    pub stop_sequence: u32,
    pub scheduled_arrival: DateTime<Utc>,
    pub scheduled_departure: DateTime<Utc>,

    /// Position of this stop in the upcoming horizon; 0 is the immediate
    /// next stop.
    pub stops_ahead: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_scheduled_stop_time() {
        let json = r#"{
            "trip_id": "t1",
            "stop_id": "s1",
            "stop_sequence": 3,
            "scheduled_arrival": "2026-08-07T08:00:00Z",
            "scheduled_departure": "2026-08-07T08:00:30Z"
        }"#;

        let st: ScheduledStopTime = serde_json::from_str(json).unwrap();
        assert_eq!(st.trip_id.as_str(), "t1");
        assert_eq!(st.stop_sequence, 3);
        assert!(st.scheduled_departure > st.scheduled_arrival);
    }
}
