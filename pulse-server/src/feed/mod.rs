//! Live vehicle feed.
//!
//! The engine consumes vehicle positions through the `VehicleFeed` seam.
//! Two implementations ship here: an HTTP client polling a JSON endpoint,
//! and a mock backed by snapshot files for development and tests. The
//! upstream wire format (GTFS-RT protobuf) is decoded by an external
//! ingestor; this crate sees plain position records.

mod client;
mod error;
mod mock;

use std::future::Future;

use crate::domain::VehiclePosition;

pub use client::{HttpFeedConfig, HttpVehicleFeed};
pub use error::FeedError;
pub use mock::MockVehicleFeed;

/// Source of current vehicle positions.
///
/// One call returns one snapshot: the most recent known position of every
/// reporting vehicle. Individually malformed entries are the caller's
/// problem (validated and skipped per record); an `Err` means the snapshot
/// as a whole was unavailable and the cycle should retry next tick.
pub trait VehicleFeed: Send + Sync {
    /// Fetch the current position snapshot.
    fn current_positions(
        &self,
    ) -> impl Future<Output = Result<Vec<VehiclePosition>, FeedError>> + Send;
}
