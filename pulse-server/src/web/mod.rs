//! Web layer for the prediction engine.
//!
//! Exposes the read API consumed by the dashboard, the recomputation
//! trigger, and the stats endpoint.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::create_router;
pub use state::AppState;
