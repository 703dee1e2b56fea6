//! HTTP vehicle feed client.
//!
//! Polls a JSON endpoint serving the current vehicle position snapshot.
//! Entries that fail id validation are skipped with a warning rather than
//! failing the snapshot; a bad vehicle must not cost the whole cycle.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::warn;

use crate::domain::{RouteId, TripId, VehicleId, VehiclePosition};

use super::FeedError;

/// Configuration for the HTTP feed client.
#[derive(Debug, Clone)]
pub struct HttpFeedConfig {
    /// Snapshot endpoint URL.
    pub endpoint: String,

    /// Optional API key sent as `x-apikey`.
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl HttpFeedConfig {
    /// Create a config for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            timeout_secs: 15,
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// One vehicle entry as served by the feed endpoint. Shared with the mock
/// feed, whose snapshot files use the same shape.
#[derive(Debug, Clone, serde::Deserialize)]
pub(super) struct VehicleEntryDto {
    pub(super) vehicle_id: String,
    pub(super) trip_id: Option<String>,
    pub(super) route_id: Option<String>,
    pub(super) latitude: f64,
    pub(super) longitude: f64,
    pub(super) bearing: Option<f64>,
    pub(super) speed: Option<f64>,
    pub(super) delay_seconds: Option<i64>,
    pub(super) timestamp: DateTime<Utc>,
}

/// Vehicle feed backed by an HTTP JSON endpoint.
#[derive(Debug, Clone)]
pub struct HttpVehicleFeed {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpVehicleFeed {
    /// Create a new client with the given configuration.
    pub fn new(config: HttpFeedConfig) -> Result<Self, FeedError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key).map_err(|_| FeedError::ApiError {
                status: 0,
                message: "Invalid API key format".to_string(),
            })?;
            headers.insert("x-apikey", value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint,
        })
    }

    async fn fetch(&self) -> Result<Vec<VehiclePosition>, FeedError> {
        let response = self.http.get(&self.endpoint).send().await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(FeedError::RateLimited),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FeedError::Unauthorized);
            }
            status => {
                let message = response.text().await.unwrap_or_default();
                return Err(FeedError::ApiError {
                    status: status.as_u16(),
                    message,
                });
            }
        }

        let body = response.text().await?;
        let entries: Vec<VehicleEntryDto> =
            serde_json::from_str(&body).map_err(|e| FeedError::Json {
                message: e.to_string(),
                body: Some(body.chars().take(200).collect()),
            })?;

        Ok(entries.into_iter().filter_map(convert_entry).collect())
    }
}

impl super::VehicleFeed for HttpVehicleFeed {
    fn current_positions(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<VehiclePosition>, FeedError>> + Send {
        self.fetch()
    }
}

/// Convert a wire entry to a domain position, skipping entries whose ids
/// fail validation.
pub(super) fn convert_entry(dto: VehicleEntryDto) -> Option<VehiclePosition> {
    let vehicle_id = match VehicleId::parse(dto.vehicle_id) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "skipping feed entry with invalid vehicle id");
            return None;
        }
    };

    // Optional ids that fail to parse degrade to absent rather than
    // dropping the position entirely.
    let trip_id = dto.trip_id.and_then(|t| match TripId::parse(t) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(vehicle = %vehicle_id, error = %e, "ignoring invalid trip id");
            None
        }
    });
    let route_id = dto.route_id.and_then(|r| match RouteId::parse(r) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(vehicle = %vehicle_id, error = %e, "ignoring invalid route id");
            None
        }
    });

    Some(VehiclePosition {
        vehicle_id,
        trip_id,
        route_id,
        latitude: dto.latitude,
        longitude: dto.longitude,
        bearing: dto.bearing,
        speed: dto.speed,
        delay_seconds: dto.delay_seconds,
        timestamp: dto.timestamp,
    })
}
