//! Timetable dataset loading.
//!
//! Loads a pre-resolved schedule dataset from a JSON file. The dataset is
//! the output of whatever ingestion pipeline feeds the deployment; this
//! crate only consumes it.

use std::path::Path;

use crate::domain::ScheduledStopTime;

use super::index::{RouteInfo, ScheduleIndex, StopInfo, TripInfo};

/// Error loading a schedule dataset.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleLoadError {
    #[error("failed to read schedule file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse schedule file: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk shape of a schedule dataset.
#[derive(Debug, serde::Deserialize)]
pub struct ScheduleDataset {
    pub trips: Vec<TripInfo>,
    pub stops: Vec<StopInfo>,
    pub routes: Vec<RouteInfo>,
    pub stop_times: Vec<ScheduledStopTime>,
}

impl ScheduleIndex {
    /// Load an index from a JSON dataset file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ScheduleLoadError> {
        let json = std::fs::read_to_string(path)?;
        let dataset: ScheduleDataset = serde_json::from_str(&json)?;
        Ok(Self::new(
            dataset.trips,
            dataset.stops,
            dataset.routes,
            dataset.stop_times,
        ))
    }
}
