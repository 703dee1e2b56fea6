//! In-memory timetable index.

use std::collections::HashMap;

use geo::Point;
use tracing::warn;

use crate::domain::{RouteId, ScheduledStopTime, StopId, TripId};

/// Display and matching metadata for a stop.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct StopInfo {
    pub stop_id: StopId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl StopInfo {
    /// The stop location as a geo point (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Display metadata for a route.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct RouteInfo {
    pub route_id: RouteId,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
}

/// Metadata for a trip: which route it runs and how it is labelled.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct TripInfo {
    pub trip_id: TripId,
    pub route_id: RouteId,
    pub headsign: Option<String>,
    pub direction_id: Option<u8>,
}

/// One trip's metadata together with its ordered stop times.
#[derive(Debug, Clone)]
struct TripSchedule {
    info: TripInfo,
    /// Ascending by `stop_sequence`.
    stop_times: Vec<ScheduledStopTime>,
}

/// Read-only timetable lookup for the service day.
#[derive(Debug)]
pub struct ScheduleIndex {
    trips: HashMap<TripId, TripSchedule>,
    stops: HashMap<StopId, StopInfo>,
    routes: HashMap<RouteId, RouteInfo>,
}

impl ScheduleIndex {
    /// Build the index from timetable tables.
    ///
    /// Stop times are grouped by trip and sorted by `stop_sequence`.
    /// Stop times referencing a trip absent from `trips` are dropped with
    /// a warning; they cannot be matched or labelled.
    pub fn new(
        trips: Vec<TripInfo>,
        stops: Vec<StopInfo>,
        routes: Vec<RouteInfo>,
        stop_times: Vec<ScheduledStopTime>,
    ) -> Self {
        let mut trip_map: HashMap<TripId, TripSchedule> = trips
            .into_iter()
            .map(|info| {
                (
                    info.trip_id.clone(),
                    TripSchedule {
                        info,
                        stop_times: Vec::new(),
                    },
                )
            })
            .collect();

        let mut orphaned = 0usize;
        for st in stop_times {
            match trip_map.get_mut(&st.trip_id) {
                Some(schedule) => schedule.stop_times.push(st),
                None => orphaned += 1,
            }
        }
        if orphaned > 0 {
            warn!(orphaned, "dropped stop times referencing unknown trips");
        }

        for schedule in trip_map.values_mut() {
            schedule.stop_times.sort_by_key(|st| st.stop_sequence);
        }

        Self {
            trips: trip_map,
            stops: stops.into_iter().map(|s| (s.stop_id.clone(), s)).collect(),
            routes: routes
                .into_iter()
                .map(|r| (r.route_id.clone(), r))
                .collect(),
        }
    }

    /// Ordered stop times for a trip, or `None` for an unknown trip.
    pub fn stop_times_for_trip(&self, trip_id: &TripId) -> Option<&[ScheduledStopTime]> {
        self.trips.get(trip_id).map(|t| t.stop_times.as_slice())
    }

    /// Trip metadata, or `None` for an unknown trip.
    pub fn trip(&self, trip_id: &TripId) -> Option<&TripInfo> {
        self.trips.get(trip_id).map(|t| &t.info)
    }

    /// Stop metadata, or `None` for an unknown stop.
    pub fn stop(&self, stop_id: &StopId) -> Option<&StopInfo> {
        self.stops.get(stop_id)
    }

    /// Route metadata, or `None` for an unknown route.
    pub fn route(&self, route_id: &RouteId) -> Option<&RouteInfo> {
        self.routes.get(route_id)
    }

    /// Number of trips in the index.
    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    /// Number of stops in the index.
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::fixture_index;
    use super::*;
    use chrono::Utc;

    #[test]
    fn stop_times_are_ordered_by_sequence() {
        let index = fixture_index(Utc::now());
        let times = index
            .stop_times_for_trip(&TripId::parse("t1").unwrap())
            .unwrap();

        assert_eq!(times.len(), 6);
        for pair in times.windows(2) {
            assert!(pair[0].stop_sequence < pair[1].stop_sequence);
            assert!(pair[0].scheduled_arrival < pair[1].scheduled_arrival);
        }
    }

    #[test]
    fn unknown_trip_is_none() {
        let index = fixture_index(Utc::now());
        assert!(index
            .stop_times_for_trip(&TripId::parse("nope").unwrap())
            .is_none());
        assert!(index.trip(&TripId::parse("nope").unwrap()).is_none());
    }

    #[test]
    fn metadata_lookups() {
        let index = fixture_index(Utc::now());

        let trip = index.trip(&TripId::parse("t1").unwrap()).unwrap();
        assert_eq!(trip.headsign.as_deref(), Some("Downtown"));
        assert_eq!(trip.direction_id, Some(0));

        let stop = index.stop(&StopId::parse("s3").unwrap()).unwrap();
        assert_eq!(stop.name, "Stop 3");

        let route = index.route(&RouteId::parse("r1").unwrap()).unwrap();
        assert_eq!(route.short_name.as_deref(), Some("1"));

        assert!(index.stop(&StopId::parse("missing").unwrap()).is_none());
        assert!(index.route(&RouteId::parse("missing").unwrap()).is_none());
    }

    #[test]
    fn orphaned_stop_times_are_dropped() {
        let orphan = ScheduledStopTime {
            trip_id: TripId::parse("ghost").unwrap(),
            stop_id: StopId::parse("s1").unwrap(),
            stop_sequence: 1,
            scheduled_arrival: Utc::now(),
            scheduled_departure: Utc::now(),
        };
        let index = ScheduleIndex::new(vec![], vec![], vec![], vec![orphan]);
        assert_eq!(index.trip_count(), 0);
    }

    #[test]
    fn counts() {
        let index = fixture_index(Utc::now());
        assert_eq!(index.trip_count(), 2);
        assert_eq!(index.stop_count(), 6);
    }
}
