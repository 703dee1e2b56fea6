//! Read-side query service.
//!
//! A thin layer over the store that enriches predictions with display
//! metadata from the schedule (stop names, route short names, direction
//! labels) and exposes the aggregate stats. Lookups for ids nobody has
//! heard of return empty results, never errors.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::{RouteId, StopId, StopPrediction, VehicleId};
use crate::schedule::ScheduleIndex;
use crate::store::{PredictionStore, StoreStats};

/// Default number of predictions returned per stop query.
pub const DEFAULT_STOP_LIMIT: usize = 10;

/// A prediction together with its display metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPrediction {
    pub prediction: StopPrediction,
    pub stop_name: Option<String>,
    pub route_short_name: Option<String>,
    pub direction_name: Option<&'static str>,
}

/// Predictions for one stop, with the stop's metadata.
#[derive(Debug, Clone)]
pub struct StopBoard {
    pub stop_id: StopId,
    pub stop_name: Option<String>,
    pub predictions: Vec<EnrichedPrediction>,
}

/// Predictions for one route, grouped by stop.
#[derive(Debug, Clone)]
pub struct RouteBoard {
    pub route_id: RouteId,
    pub route_short_name: Option<String>,
    pub by_stop: BTreeMap<StopId, Vec<EnrichedPrediction>>,
}

/// Read-only API over the prediction store.
pub struct QueryService {
    store: Arc<PredictionStore>,
    schedule: Arc<ScheduleIndex>,

    /// Age past which a prediction counts as stale in the stats.
    stale_after: Duration,
}

impl QueryService {
    pub fn new(
        store: Arc<PredictionStore>,
        schedule: Arc<ScheduleIndex>,
        stale_after: Duration,
    ) -> Self {
        Self {
            store,
            schedule,
            stale_after,
        }
    }

    /// Upcoming arrivals at a stop, soonest first.
    pub fn predictions_for_stop(
        &self,
        stop_id: &StopId,
        route_id: Option<&RouteId>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> StopBoard {
        let predictions = self
            .store
            .query_by_stop(stop_id, route_id, limit, now)
            .into_iter()
            .map(|p| self.enrich(p))
            .collect();

        StopBoard {
            stop_name: self.schedule.stop(stop_id).map(|s| s.name.clone()),
            stop_id: stop_id.clone(),
            predictions,
        }
    }

    /// Upcoming arrivals for every stop on a route.
    pub fn predictions_for_route(&self, route_id: &RouteId, now: DateTime<Utc>) -> RouteBoard {
        let by_stop = self
            .store
            .query_by_route(route_id, now)
            .into_iter()
            .map(|(stop, predictions)| {
                (
                    stop,
                    predictions.into_iter().map(|p| self.enrich(p)).collect(),
                )
            })
            .collect();

        RouteBoard {
            route_short_name: self
                .schedule
                .route(route_id)
                .and_then(|r| r.short_name.clone()),
            route_id: route_id.clone(),
            by_stop,
        }
    }

    /// A vehicle's upcoming stops, soonest first.
    pub fn predictions_for_vehicle(
        &self,
        vehicle_id: &VehicleId,
        now: DateTime<Utc>,
    ) -> Vec<EnrichedPrediction> {
        self.store
            .query_by_vehicle(vehicle_id, now)
            .into_iter()
            .map(|p| self.enrich(p))
            .collect()
    }

    /// Aggregate stats over the live store contents.
    pub fn stats(&self, now: DateTime<Utc>) -> StoreStats {
        self.store.stats(now, self.stale_after)
    }

    fn enrich(&self, prediction: StopPrediction) -> EnrichedPrediction {
        EnrichedPrediction {
            stop_name: self
                .schedule
                .stop(&prediction.stop_id)
                .map(|s| s.name.clone()),
            route_short_name: self
                .schedule
                .route(&prediction.route_id)
                .and_then(|r| r.short_name.clone()),
            direction_name: direction_name(prediction.direction_id),
            prediction,
        }
    }
}

/// Rider-facing direction label for a GTFS direction id.
fn direction_name(direction_id: Option<u8>) -> Option<&'static str> {
    match direction_id? {
        0 => Some("Outbound"),
        1 => Some("Inbound"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::prediction;
    use crate::schedule::test_support::fixture_index;

    fn service(now: DateTime<Utc>) -> (QueryService, Arc<PredictionStore>) {
        let store = Arc::new(PredictionStore::new());
        let schedule = Arc::new(fixture_index(now));
        (
            QueryService::new(Arc::clone(&store), schedule, Duration::seconds(90)),
            store,
        )
    }

    #[test]
    fn stop_query_is_enriched() {
        let now = Utc::now();
        let (service, store) = service(now);
        store.upsert(prediction("s1", "t1", now, 0.8));

        let board = service.predictions_for_stop(
            &StopId::parse("s1").unwrap(),
            None,
            DEFAULT_STOP_LIMIT,
            now,
        );

        assert_eq!(board.stop_name.as_deref(), Some("Stop 1"));
        assert_eq!(board.predictions.len(), 1);

        let enriched = &board.predictions[0];
        assert_eq!(enriched.stop_name.as_deref(), Some("Stop 1"));
        assert_eq!(enriched.route_short_name.as_deref(), Some("1"));
        assert_eq!(enriched.direction_name, Some("Outbound"));
    }

    #[test]
    fn unknown_stop_is_empty_success() {
        let now = Utc::now();
        let (service, _store) = service(now);

        let board = service.predictions_for_stop(
            &StopId::parse("nowhere").unwrap(),
            None,
            DEFAULT_STOP_LIMIT,
            now,
        );

        assert!(board.predictions.is_empty());
        assert!(board.stop_name.is_none());
    }

    #[test]
    fn route_query_groups_and_labels() {
        let now = Utc::now();
        let (service, store) = service(now);
        store.upsert(prediction("s1", "t1", now, 0.8));
        store.upsert(prediction("s2", "t1", now, 0.8));

        let board = service.predictions_for_route(&RouteId::parse("r1").unwrap(), now);

        assert_eq!(board.route_short_name.as_deref(), Some("1"));
        assert_eq!(board.by_stop.len(), 2);
    }

    #[test]
    fn unknown_route_is_empty_success() {
        let now = Utc::now();
        let (service, _store) = service(now);

        let board = service.predictions_for_route(&RouteId::parse("ghost").unwrap(), now);
        assert!(board.by_stop.is_empty());
        assert!(board.route_short_name.is_none());
    }

    #[test]
    fn vehicle_query_returns_upcoming_stops() {
        let now = Utc::now();
        let (service, store) = service(now);
        store.upsert(prediction("s1", "t1", now, 0.8));

        let predictions =
            service.predictions_for_vehicle(&VehicleId::parse("v1").unwrap(), now);
        assert_eq!(predictions.len(), 1);

        let none =
            service.predictions_for_vehicle(&VehicleId::parse("ghost").unwrap(), now);
        assert!(none.is_empty());
    }

    #[test]
    fn stats_delegate_to_store() {
        let now = Utc::now();
        let (service, store) = service(now);
        store.upsert(prediction("s1", "t1", now, 0.5));

        let stats = service.stats(now);
        assert_eq!(stats.count, 1);
        assert!((stats.avg_confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn direction_names() {
        assert_eq!(direction_name(Some(0)), Some("Outbound"));
        assert_eq!(direction_name(Some(1)), Some("Inbound"));
        assert_eq!(direction_name(Some(7)), None);
        assert_eq!(direction_name(None), None);
    }
}
