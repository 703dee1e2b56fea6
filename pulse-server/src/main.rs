use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pulse_server::config::{ConfidenceConfig, EngineConfig};
use pulse_server::engine::{
    EngineMetrics, PredictionComputer, PredictionEngine, ProgressTracker, StopMatcher,
};
use pulse_server::feed::{HttpFeedConfig, HttpVehicleFeed, MockVehicleFeed, VehicleFeed};
use pulse_server::query::QueryService;
use pulse_server::schedule::ScheduleIndex;
use pulse_server::store::{ExpirySweeper, PredictionStore};
use pulse_server::web::{AppState, create_router};

/// Default schedule dataset path.
const DEFAULT_SCHEDULE_PATH: &str = "data/schedule.json";

/// Default mock feed snapshot path, used when FEED_URL is not set.
const DEFAULT_MOCK_FEED_PATH: &str = "data/mock_feed.json";

#[tokio::main]
async fn main() {
    let filter = EnvFilter::from_default_env()
        .add_directive("pulse_server=info".parse().expect("valid directive"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Load the timetable (fail fast if unavailable).
    let schedule_path =
        std::env::var("SCHEDULE_PATH").unwrap_or_else(|_| DEFAULT_SCHEDULE_PATH.to_string());
    let schedule = match ScheduleIndex::load_json(&schedule_path) {
        Ok(index) => Arc::new(index),
        Err(e) => {
            eprintln!("Failed to load schedule from {schedule_path}: {e}");
            std::process::exit(1);
        }
    };
    info!(
        trips = schedule.trip_count(),
        stops = schedule.stop_count(),
        "schedule loaded"
    );

    // Pick the feed: live HTTP endpoint when configured, mock otherwise.
    match std::env::var("FEED_URL") {
        Ok(url) => {
            let mut config = HttpFeedConfig::new(url);
            if let Ok(key) = std::env::var("FEED_API_KEY") {
                config = config.with_api_key(key);
            }
            let feed = match HttpVehicleFeed::new(config) {
                Ok(feed) => feed,
                Err(e) => {
                    eprintln!("Failed to create feed client: {e}");
                    std::process::exit(1);
                }
            };
            serve(feed, schedule).await;
        }
        Err(_) => {
            warn!("FEED_URL not set; serving the mock feed snapshot");
            let path = std::env::var("MOCK_FEED_PATH")
                .unwrap_or_else(|_| DEFAULT_MOCK_FEED_PATH.to_string());
            let feed = match MockVehicleFeed::from_file(&path) {
                Ok(feed) => feed,
                Err(e) => {
                    eprintln!("Failed to load mock feed from {path}: {e}");
                    std::process::exit(1);
                }
            };
            serve(feed, schedule).await;
        }
    }
}

/// Wire up the engine and serve until shutdown.
async fn serve<F>(feed: F, schedule: Arc<ScheduleIndex>)
where
    F: VehicleFeed + 'static,
{
    let config = EngineConfig::default();
    let store = Arc::new(PredictionStore::new());

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

    let engine = Arc::new(PredictionEngine::new(
        feed,
        matcher,
        computer,
        Arc::clone(&store),
        EngineMetrics::new(),
        config.clone(),
    ));

    // The recurring write path.
    tokio::spawn(Arc::clone(&engine).run_poll_loop());

    // The expiry sweeper, on its own lower-frequency timer.
    let sweeper = ExpirySweeper::new(Arc::clone(&store));
    let sweep_interval = config.sweep_interval();
    let sweep_metrics = engine.metrics().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            let removed = sweeper.sweep(chrono::Utc::now());
            if removed > 0 {
                sweep_metrics.add(&sweep_metrics.predictions_swept, removed as u64);
                info!(removed, "swept expired predictions");
            }
        }
    });

    let query = Arc::new(QueryService::new(
        Arc::clone(&store),
        schedule,
        config.stale_after(),
    ));

    let state = AppState::new(engine, query);
    let app = create_router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("prediction engine listening on http://{addr}");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
