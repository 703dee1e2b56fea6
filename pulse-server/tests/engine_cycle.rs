//! End-to-end engine tests: mock feed in, queryable predictions out.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use pulse_server::config::{ConfidenceConfig, EngineConfig};
use pulse_server::domain::{
    RouteId, ScheduledStopTime, StopId, TripId, VehicleId, VehiclePosition,
};
use pulse_server::engine::{
    EngineMetrics, PredictionComputer, PredictionEngine, ProgressTracker, StopMatcher,
};
use pulse_server::feed::MockVehicleFeed;
use pulse_server::query::QueryService;
use pulse_server::schedule::{RouteInfo, ScheduleIndex, StopInfo, TripInfo};
use pulse_server::store::{ExpirySweeper, PredictionStore};

/// A single northbound trip with four stops, two minutes apart.
fn schedule(start: DateTime<Utc>) -> ScheduleIndex {
    let trips = vec![TripInfo {
        trip_id: TripId::parse("trip-1").unwrap(),
        route_id: RouteId::parse("route-9").unwrap(),
        headsign: Some("Terminal".to_string()),
        direction_id: Some(0),
    }];
    let stops = (1..=4)
        .map(|i| StopInfo {
            stop_id: StopId::parse(format!("stop-{i}")).unwrap(),
            name: format!("Stop {i}"),
            latitude: 45.5000 + 0.0045 * (i - 1) as f64,
            longitude: -122.6500,
        })
        .collect();
    let routes = vec![RouteInfo {
        route_id: RouteId::parse("route-9").unwrap(),
        short_name: Some("9".to_string()),
        long_name: Some("Broadway".to_string()),
    }];
    let stop_times = (1..=4)
        .map(|i| ScheduledStopTime {
            trip_id: TripId::parse("trip-1").unwrap(),
            stop_id: StopId::parse(format!("stop-{i}")).unwrap(),
            stop_sequence: i,
            scheduled_arrival: start + Duration::minutes(2 * (i as i64 - 1)),
            scheduled_departure: start + Duration::minutes(2 * (i as i64 - 1)),
        })
        .collect();

    ScheduleIndex::new(trips, stops, routes, stop_times)
}

fn vehicle(now: DateTime<Utc>, delay: Option<i64>) -> VehiclePosition {
    VehiclePosition {
        vehicle_id: VehicleId::parse("bus-1").unwrap(),
        trip_id: Some(TripId::parse("trip-1").unwrap()),
        route_id: Some(RouteId::parse("route-9").unwrap()),
        // Approaching stop 1 from the south.
        latitude: 45.4990,
        longitude: -122.6500,
        bearing: Some(0.0),
        speed: Some(8.0),
        delay_seconds: delay,
        timestamp: now,
    }
}

struct Harness {
    engine: PredictionEngine<MockVehicleFeed>,
    store: Arc<PredictionStore>,
    query: QueryService,
    feed: MockVehicleFeed,
}

fn harness(start: DateTime<Utc>, positions: Vec<VehiclePosition>) -> Harness {
    let config = EngineConfig::default();
    let schedule = Arc::new(schedule(start));
    let store = Arc::new(PredictionStore::new());
    let feed = MockVehicleFeed::new(positions);

    let matcher = Arc::new(StopMatcher::new(
        Arc::clone(&schedule),
        ProgressTracker::new(config.vehicle_state_ttl(), config.vehicle_state_capacity),
        config.arrival_radius_m,
    ));
    let computer = Arc::new(PredictionComputer::new(
        Arc::clone(&schedule),
        ConfidenceConfig::default(),
        config.min_speed_floor,
        config.grace_window(),
    ));
    let engine = PredictionEngine::new(
        feed.clone(),
        matcher,
        computer,
        Arc::clone(&store),
        EngineMetrics::new(),
        config.clone(),
    );
    let query = QueryService::new(Arc::clone(&store), schedule, config.stale_after());

    Harness {
        engine,
        store,
        query,
        feed,
    }
}

#[tokio::test]
async fn feed_to_query_round_trip() {
    let now = Utc::now();
    let start = now + Duration::minutes(3);
    let h = harness(start, vec![vehicle(now, Some(120))]);

    let outcome = h.engine.run_cycle().await.unwrap();
    assert_eq!(outcome.created, 4);

    // The stop board shows the delayed arrival, enriched.
    let board = h
        .query
        .predictions_for_stop(&StopId::parse("stop-1").unwrap(), None, 10, now);
    assert_eq!(board.stop_name.as_deref(), Some("Stop 1"));
    assert_eq!(board.predictions.len(), 1);

    let enriched = &board.predictions[0];
    let p = &enriched.prediction;
    assert_eq!(p.arrival_delay_seconds, 120);
    assert_eq!(p.predicted_arrival_time, start + Duration::seconds(120));
    assert!(p.is_real_time);
    assert!(p.confidence_level >= 0.8);
    assert_eq!(enriched.route_short_name.as_deref(), Some("9"));
    assert_eq!(enriched.direction_name, Some("Outbound"));

    // Vehicle view lists all four stops soonest-first.
    let upcoming = h
        .query
        .predictions_for_vehicle(&VehicleId::parse("bus-1").unwrap(), now);
    assert_eq!(upcoming.len(), 4);
    for pair in upcoming.windows(2) {
        assert!(
            pair[0].prediction.predicted_arrival_time
                <= pair[1].prediction.predicted_arrival_time
        );
    }

    // Stored invariants hold for every record.
    for e in &upcoming {
        let p = &e.prediction;
        assert!((0.0..=1.0).contains(&p.confidence_level));
        assert!(p.expires_at > p.created_at);
        assert_eq!(
            p.predicted_arrival_time,
            p.scheduled_arrival_time + Duration::seconds(p.arrival_delay_seconds)
        );
    }
}

#[tokio::test]
async fn recompute_supersedes_and_sweeper_collects() {
    let now = Utc::now();
    let start = now + Duration::minutes(3);
    let h = harness(start, vec![vehicle(now, Some(60))]);

    h.engine.run_cycle().await.unwrap();

    // The feed updates: bigger delay, newer snapshot.
    h.feed.set_positions(vec![vehicle(now, Some(300))]).await;
    let second = h.engine.run_cycle().await.unwrap();
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 4);

    let p = h
        .store
        .get(
            &StopId::parse("stop-1").unwrap(),
            &TripId::parse("trip-1").unwrap(),
            now,
        )
        .unwrap();
    assert_eq!(p.arrival_delay_seconds, 300);

    // Far past every expiry, records are invisible to queries and the
    // sweeper removes all four; a second sweep finds nothing.
    let long_after = start + Duration::hours(2);
    assert!(h
        .query
        .predictions_for_stop(&StopId::parse("stop-1").unwrap(), None, 10, long_after)
        .predictions
        .is_empty());

    let sweeper = ExpirySweeper::new(Arc::clone(&h.store));
    assert_eq!(sweeper.sweep(long_after), 4);
    assert_eq!(sweeper.sweep(long_after), 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn stats_reflect_store_contents() {
    let now = Utc::now();
    let start = now + Duration::minutes(3);
    let h = harness(start, vec![vehicle(now, Some(0))]);

    h.engine.run_cycle().await.unwrap();

    let stats = h.query.stats(now);
    assert_eq!(stats.count, 4);
    assert!(stats.avg_confidence > 0.0 && stats.avg_confidence <= 1.0);
    assert_eq!(stats.stale_fraction, 0.0);
}
