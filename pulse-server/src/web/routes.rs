//! HTTP route handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use tracing::error;

use crate::domain::{InvalidId, RouteId, StopId, VehicleId};
use crate::feed::{FeedError, VehicleFeed};
use crate::query::DEFAULT_STOP_LIMIT;

use super::dto::*;
use super::state::AppState;

/// Hard cap on the per-stop result limit.
const MAX_STOP_LIMIT: usize = 50;

/// Create the application router.
pub fn create_router<F>(state: AppState<F>) -> Router
where
    F: VehicleFeed + 'static,
{
    Router::new()
        .route("/health", get(health))
        .route("/predictions/stop/:stop_id", get(stop_predictions::<F>))
        .route("/predictions/route/:route_id", get(route_predictions::<F>))
        .route(
            "/predictions/vehicle/:vehicle_id",
            get(vehicle_predictions::<F>),
        )
        .route("/predictions/compute", post(compute::<F>))
        .route("/predictions/stats", get(stats::<F>))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Upcoming arrivals at a stop.
async fn stop_predictions<F: VehicleFeed>(
    State(state): State<AppState<F>>,
    Path(stop_id): Path<String>,
    Query(params): Query<StopQueryParams>,
) -> Result<Json<StopPredictionsResponse>, AppError> {
    let stop_id = StopId::parse(stop_id).map_err(bad_id("stop_id"))?;
    let route_id = params
        .route_id
        .map(RouteId::parse)
        .transpose()
        .map_err(bad_id("route_id"))?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_STOP_LIMIT)
        .clamp(1, MAX_STOP_LIMIT);

    let now = Utc::now();
    let board = state
        .query
        .predictions_for_stop(&stop_id, route_id.as_ref(), limit, now);

    Ok(Json(StopPredictionsResponse::from_board(&board, now)))
}

/// Upcoming arrivals across a route, grouped by stop.
async fn route_predictions<F: VehicleFeed>(
    State(state): State<AppState<F>>,
    Path(route_id): Path<String>,
) -> Result<Json<RoutePredictionsResponse>, AppError> {
    let route_id = RouteId::parse(route_id).map_err(bad_id("route_id"))?;

    let now = Utc::now();
    let board = state.query.predictions_for_route(&route_id, now);

    Ok(Json(RoutePredictionsResponse::from_board(&board, now)))
}

/// A vehicle's upcoming stops.
async fn vehicle_predictions<F: VehicleFeed>(
    State(state): State<AppState<F>>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<VehiclePredictionsResponse>, AppError> {
    let vehicle_id = VehicleId::parse(vehicle_id).map_err(bad_id("vehicle_id"))?;

    let now = Utc::now();
    let predictions = state
        .query
        .predictions_for_vehicle(&vehicle_id, now)
        .iter()
        .map(PredictionDto::from_enriched)
        .collect();

    Ok(Json(VehiclePredictionsResponse {
        vehicle_id: vehicle_id.as_str().to_string(),
        predictions,
        last_updated: now,
    }))
}

/// Synchronously run one write-path cycle.
async fn compute<F: VehicleFeed>(
    State(state): State<AppState<F>>,
) -> Result<Json<ComputeResponse>, AppError> {
    let outcome = state.engine.run_cycle().await.map_err(AppError::from)?;
    Ok(Json(ComputeResponse::from_outcome(outcome, Utc::now())))
}

/// Aggregate stats over the store plus engine counters.
async fn stats<F: VehicleFeed>(State(state): State<AppState<F>>) -> Json<StatsResponse> {
    let now = Utc::now();
    Json(StatsResponse::new(
        state.query.stats(now),
        state.engine.metrics().summary(),
        now,
    ))
}

fn bad_id(field: &'static str) -> impl FnOnce(InvalidId) -> AppError {
    move |e| AppError::BadRequest {
        message: format!("invalid {field}: {e}"),
    }
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest { message: String },
    Upstream { message: String },
}

impl From<FeedError> for AppError {
    fn from(e: FeedError) -> Self {
        AppError::Upstream {
            message: e.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest { message } => (StatusCode::BAD_REQUEST, message),
            AppError::Upstream { message } => (StatusCode::BAD_GATEWAY, message),
        };

        error!(%status, %message, "request failed");

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
