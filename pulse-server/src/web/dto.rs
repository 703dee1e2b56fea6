//! Data transfer objects for web requests and responses.
//!
//! Prediction field names and types on the wire are the engine's public
//! contract; consumers bind to them directly. Timestamps serialize as
//! RFC 3339 UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::PredictionSource;
use crate::engine::{CycleOutcome, MetricsSummary};
use crate::query::{EnrichedPrediction, RouteBoard, StopBoard};
use crate::store::StoreStats;

/// Query parameters for the stop predictions endpoint.
#[derive(Debug, Deserialize)]
pub struct StopQueryParams {
    /// Restrict results to one route.
    pub route_id: Option<String>,

    /// Maximum predictions to return (default 10, capped at 50).
    pub limit: Option<usize>,
}

/// One prediction on the wire.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionDto {
    pub stop_id: String,
    pub route_id: String,
    pub trip_id: String,
    pub vehicle_id: String,
    pub predicted_arrival_time: DateTime<Utc>,
    pub scheduled_arrival_time: DateTime<Utc>,
    pub arrival_delay_seconds: i64,
    pub confidence_level: f64,
    pub prediction_source: PredictionSource,
    pub is_real_time: bool,
    pub headsign: Option<String>,
    pub direction_id: Option<u8>,
    pub stop_sequence: u32,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,

    // Display enrichment from the timetable.
    pub stop_name: Option<String>,
    pub route_short_name: Option<String>,
    pub direction_name: Option<&'static str>,
}

impl PredictionDto {
    pub fn from_enriched(enriched: &EnrichedPrediction) -> Self {
        let p = &enriched.prediction;
        Self {
            stop_id: p.stop_id.as_str().to_string(),
            route_id: p.route_id.as_str().to_string(),
            trip_id: p.trip_id.as_str().to_string(),
            vehicle_id: p.vehicle_id.as_str().to_string(),
            predicted_arrival_time: p.predicted_arrival_time,
            scheduled_arrival_time: p.scheduled_arrival_time,
            arrival_delay_seconds: p.arrival_delay_seconds,
            confidence_level: p.confidence_level,
            prediction_source: p.prediction_source,
            is_real_time: p.is_real_time,
            headsign: p.headsign.clone(),
            direction_id: p.direction_id,
            stop_sequence: p.stop_sequence,
            created_at: p.created_at,
            expires_at: p.expires_at,
            stop_name: enriched.stop_name.clone(),
            route_short_name: enriched.route_short_name.clone(),
            direction_name: enriched.direction_name,
        }
    }
}

/// Response for the stop predictions endpoint.
#[derive(Debug, Serialize)]
pub struct StopPredictionsResponse {
    pub stop_id: String,
    pub stop_name: Option<String>,
    pub predictions: Vec<PredictionDto>,
    pub last_updated: DateTime<Utc>,
}

impl StopPredictionsResponse {
    pub fn from_board(board: &StopBoard, now: DateTime<Utc>) -> Self {
        Self {
            stop_id: board.stop_id.as_str().to_string(),
            stop_name: board.stop_name.clone(),
            predictions: board
                .predictions
                .iter()
                .map(PredictionDto::from_enriched)
                .collect(),
            last_updated: now,
        }
    }
}

/// Response for the route predictions endpoint.
#[derive(Debug, Serialize)]
pub struct RoutePredictionsResponse {
    pub route_id: String,
    pub route_short_name: Option<String>,
    pub predictions_by_stop: BTreeMap<String, Vec<PredictionDto>>,
    pub last_updated: DateTime<Utc>,
}

impl RoutePredictionsResponse {
    pub fn from_board(board: &RouteBoard, now: DateTime<Utc>) -> Self {
        Self {
            route_id: board.route_id.as_str().to_string(),
            route_short_name: board.route_short_name.clone(),
            predictions_by_stop: board
                .by_stop
                .iter()
                .map(|(stop, predictions)| {
                    (
                        stop.as_str().to_string(),
                        predictions.iter().map(PredictionDto::from_enriched).collect(),
                    )
                })
                .collect(),
            last_updated: now,
        }
    }
}

/// Response for the vehicle predictions endpoint.
#[derive(Debug, Serialize)]
pub struct VehiclePredictionsResponse {
    pub vehicle_id: String,
    pub predictions: Vec<PredictionDto>,
    pub last_updated: DateTime<Utc>,
}

/// Response for the recomputation trigger.
#[derive(Debug, Serialize)]
pub struct ComputeResponse {
    pub vehicles: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub computation_time: DateTime<Utc>,
}

impl ComputeResponse {
    pub fn from_outcome(outcome: CycleOutcome, now: DateTime<Utc>) -> Self {
        Self {
            vehicles: outcome.vehicles,
            created: outcome.created,
            updated: outcome.updated,
            skipped: outcome.skipped,
            computation_time: now,
        }
    }
}

/// Response for the stats endpoint: store aggregates plus engine counters.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub count: usize,
    pub avg_confidence: f64,
    pub stale_fraction: f64,
    pub engine: MetricsSummary,
    pub last_updated: DateTime<Utc>,
}

impl StatsResponse {
    pub fn new(stats: StoreStats, engine: MetricsSummary, now: DateTime<Utc>) -> Self {
        Self {
            count: stats.count,
            avg_confidence: stats.avg_confidence,
            stale_fraction: stats.stale_fraction,
            engine,
            last_updated: now,
        }
    }
}

/// Error body returned by all failing endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::prediction;

    fn enriched(now: DateTime<Utc>) -> EnrichedPrediction {
        EnrichedPrediction {
            prediction: prediction("s1", "t1", now, 0.8),
            stop_name: Some("First & Main".to_string()),
            route_short_name: Some("1".to_string()),
            direction_name: Some("Outbound"),
        }
    }

    #[test]
    fn prediction_wire_field_names() {
        let now = Utc::now();
        let dto = PredictionDto::from_enriched(&enriched(now));
        let value = serde_json::to_value(&dto).unwrap();

        for field in [
            "stop_id",
            "route_id",
            "trip_id",
            "vehicle_id",
            "predicted_arrival_time",
            "scheduled_arrival_time",
            "arrival_delay_seconds",
            "confidence_level",
            "prediction_source",
            "is_real_time",
            "headsign",
            "direction_id",
            "stop_sequence",
            "created_at",
            "expires_at",
        ] {
            assert!(value.get(field).is_some(), "missing wire field {field}");
        }

        assert_eq!(value["prediction_source"], "computed");
        assert_eq!(value["is_real_time"], true);
        assert_eq!(value["arrival_delay_seconds"], 0);
    }

    #[test]
    fn timestamps_serialize_as_rfc3339() {
        let now = Utc::now();
        let dto = PredictionDto::from_enriched(&enriched(now));
        let value = serde_json::to_value(&dto).unwrap();

        let created = value["created_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created).is_ok());
    }

    #[test]
    fn compute_response_carries_counts() {
        let now = Utc::now();
        let outcome = CycleOutcome {
            vehicles: 5,
            created: 12,
            updated: 3,
            skipped: 1,
        };
        let response = ComputeResponse::from_outcome(outcome, now);

        assert_eq!(response.created, 12);
        assert_eq!(response.updated, 3);
        assert_eq!(response.skipped, 1);
    }
}
