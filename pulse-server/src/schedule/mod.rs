//! Static timetable lookup.
//!
//! The `ScheduleIndex` is the engine's read-only view of the timetable:
//! given a trip id it answers with the trip's ordered stop sequence and
//! scheduled times, plus stop/route/trip metadata used for matching and
//! display enrichment. Timetable *ingestion* (GTFS archive parsing,
//! database loading) happens outside this crate; the index is built once
//! from an already-resolved dataset and is immutable for the service day.

mod index;
mod loader;

pub use index::{RouteInfo, ScheduleIndex, StopInfo, TripInfo};
pub use loader::{ScheduleDataset, ScheduleLoadError};

#[cfg(test)]
pub(crate) use index::test_support;
