//! Application state for the web layer.

use std::sync::Arc;

use crate::engine::PredictionEngine;
use crate::feed::VehicleFeed;
use crate::query::QueryService;

/// Shared application state.
///
/// Generic over the feed implementation so the same router serves the
/// live HTTP feed and the mock.
pub struct AppState<F> {
    /// The write-path engine; the compute endpoint drives it directly.
    pub engine: Arc<PredictionEngine<F>>,

    /// Read-side query service.
    pub query: Arc<QueryService>,
}

impl<F: VehicleFeed> AppState<F> {
    /// Create a new app state.
    pub fn new(engine: Arc<PredictionEngine<F>>, query: Arc<QueryService>) -> Self {
        Self { engine, query }
    }
}

// Manual impl: deriving would put an `F: Clone` bound on the state even
// though only the Arcs are cloned.
impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            query: Arc::clone(&self.query),
        }
    }
}
