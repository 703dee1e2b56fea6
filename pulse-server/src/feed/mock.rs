//! Mock vehicle feed for development and testing.
//!
//! Serves position snapshots from a JSON file or an in-memory list, as if
//! they came from the live endpoint.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::VehiclePosition;

use super::FeedError;
use super::client::{VehicleEntryDto, convert_entry};

/// Mock feed serving a fixed (but swappable) snapshot.
#[derive(Debug, Clone)]
pub struct MockVehicleFeed {
    positions: Arc<RwLock<Vec<VehiclePosition>>>,
}

impl MockVehicleFeed {
    /// Create a mock feed with the given positions.
    pub fn new(positions: Vec<VehiclePosition>) -> Self {
        Self {
            positions: Arc::new(RwLock::new(positions)),
        }
    }

    /// Create a mock feed by loading a snapshot file.
    ///
    /// The file holds a JSON array of vehicle entries in the same shape
    /// the HTTP endpoint serves. Entries with invalid ids are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let json = std::fs::read_to_string(path)?;
        let entries: Vec<VehicleEntryDto> =
            serde_json::from_str(&json).map_err(|e| FeedError::Json {
                message: e.to_string(),
                body: None,
            })?;

        Ok(Self::new(
            entries.into_iter().filter_map(convert_entry).collect(),
        ))
    }

    /// Replace the snapshot (for tests driving multiple cycles).
    pub async fn set_positions(&self, positions: Vec<VehiclePosition>) {
        *self.positions.write().await = positions;
    }
}

impl super::VehicleFeed for MockVehicleFeed {
    fn current_positions(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<VehiclePosition>, FeedError>> + Send {
        async move { Ok(self.positions.read().await.clone()) }
    }
}
