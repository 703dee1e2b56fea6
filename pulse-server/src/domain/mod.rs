//! Domain types for the arrival-prediction engine.
//!
//! This module contains the core model types that represent validated
//! transit data. All types enforce their invariants at construction time,
//! so code that receives these types can trust their validity.

mod ids;
mod position;
mod prediction;
mod stop_time;

pub use ids::{InvalidId, RouteId, StopId, TripId, VehicleId};
pub use position::{PositionError, VehiclePosition};
pub use prediction::{PredictionKey, PredictionParts, PredictionSource, StopPrediction};
pub use stop_time::{ScheduledStopTime, StopRef};

#[cfg(test)]
pub(crate) use prediction::test_support;
