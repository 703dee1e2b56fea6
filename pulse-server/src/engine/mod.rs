//! The prediction engine.
//!
//! Write-path machinery: matching vehicles to upcoming stops, scoring
//! arrival estimates, and running the timer-driven cycle that keeps the
//! store current.

mod computer;
mod cycle;
mod matcher;
mod metrics;
mod progress;

pub use computer::PredictionComputer;
pub use cycle::{CycleOutcome, PredictionEngine};
pub use matcher::StopMatcher;
pub use metrics::{EngineMetrics, MetricsSummary};
pub use progress::{ProgressTracker, TripProgress};
