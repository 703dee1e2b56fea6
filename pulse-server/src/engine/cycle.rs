//! The write path.
//!
//! One cycle per feed poll: fetch the position snapshot, validate each
//! record, match it to upcoming stops, compute predictions, and upsert
//! them into the store. Vehicles are processed in bounded parallel
//! batches; one bad record costs only itself. The poll loop drops missed
//! ticks instead of queueing them, so an overrunning cycle finishes and
//! the next one starts on the following tick.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::domain::VehiclePosition;
use crate::feed::{FeedError, VehicleFeed};
use crate::store::{PredictionStore, UpsertOutcome};

use super::computer::PredictionComputer;
use super::matcher::StopMatcher;
use super::metrics::EngineMetrics;

/// Counts from one write-path cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleOutcome {
    /// Vehicle records in the snapshot.
    pub vehicles: usize,

    /// Predictions newly inserted.
    pub created: usize,

    /// Predictions that superseded an existing record.
    pub updated: usize,

    /// Vehicle records skipped (invalid, no trip, unknown trip).
    pub skipped: usize,
}

/// The prediction engine: feed in, store out.
pub struct PredictionEngine<F> {
    feed: F,
    matcher: Arc<StopMatcher>,
    computer: Arc<PredictionComputer>,
    store: Arc<PredictionStore>,
    metrics: EngineMetrics,
    config: EngineConfig,
}

impl<F: VehicleFeed> PredictionEngine<F> {
    pub fn new(
        feed: F,
        matcher: Arc<StopMatcher>,
        computer: Arc<PredictionComputer>,
        store: Arc<PredictionStore>,
        metrics: EngineMetrics,
        config: EngineConfig,
    ) -> Self {
        Self {
            feed,
            matcher,
            computer,
            store,
            metrics,
            config,
        }
    }

    /// Run one full write-path cycle.
    ///
    /// Fails only when the snapshot itself is unavailable; per-vehicle
    /// problems are skipped and counted. Re-running with an unchanged
    /// feed is idempotent apart from `created_at` refreshes.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, FeedError> {
        let started = Instant::now();
        let positions = self.feed.current_positions().await?;

        let mut outcome = CycleOutcome {
            vehicles: positions.len(),
            ..CycleOutcome::default()
        };
        self.metrics
            .add(&self.metrics.vehicles_seen, positions.len() as u64);

        for batch in positions.chunks(self.config.batch_size.max(1)) {
            let handles: Vec<_> = batch
                .iter()
                .map(|position| {
                    let matcher = Arc::clone(&self.matcher);
                    let computer = Arc::clone(&self.computer);
                    let store = Arc::clone(&self.store);
                    let metrics = self.metrics.clone();
                    let config = self.config.clone();
                    let position = position.clone();

                    tokio::spawn(async move {
                        process_vehicle(&matcher, &computer, &store, &metrics, &config, &position)
                    })
                })
                .collect();

            for result in join_all(handles).await {
                match result {
                    Ok(VehicleOutcome::Processed { created, updated }) => {
                        outcome.created += created;
                        outcome.updated += updated;
                    }
                    Ok(VehicleOutcome::Skipped) => outcome.skipped += 1,
                    Err(e) => {
                        // A panicked task costs its own vehicle only.
                        warn!(error = %e, "vehicle task failed");
                        outcome.skipped += 1;
                    }
                }
            }
        }

        self.metrics.inc(&self.metrics.cycles_completed);
        if started.elapsed() > self.config.poll_interval() {
            self.metrics.inc(&self.metrics.cycles_overrun);
        }

        Ok(outcome)
    }

    /// Run cycles forever at the poll interval.
    ///
    /// Missed ticks are skipped, not queued: if a cycle overruns the next
    /// tick, it finishes and the loop resumes on the tick after. A failed
    /// cycle is logged and retried on the next tick; nothing here is
    /// fatal.
    pub async fn run_poll_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.config.poll_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match self.run_cycle().await {
                Ok(outcome) => info!(
                    vehicles = outcome.vehicles,
                    created = outcome.created,
                    updated = outcome.updated,
                    skipped = outcome.skipped,
                    "prediction cycle complete"
                ),
                Err(e) => {
                    self.metrics.inc(&self.metrics.cycles_failed);
                    warn!(error = %e, "prediction cycle failed; retrying next tick");
                }
            }
        }
    }

    pub fn store(&self) -> &Arc<PredictionStore> {
        &self.store
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }
}

enum VehicleOutcome {
    Processed { created: usize, updated: usize },
    Skipped,
}

/// Match and predict for one vehicle. Every failure mode is a skip.
fn process_vehicle(
    matcher: &StopMatcher,
    computer: &PredictionComputer,
    store: &PredictionStore,
    metrics: &EngineMetrics,
    config: &EngineConfig,
    position: &VehiclePosition,
) -> VehicleOutcome {
    let now = Utc::now();

    if let Err(e) = position.validate(now, config.max_position_age()) {
        metrics.inc(&metrics.vehicles_invalid);
        warn!(vehicle = %position.vehicle_id, error = %e, "discarding malformed vehicle record");
        return VehicleOutcome::Skipped;
    }

    let Some(trip_id) = position.trip_id.clone() else {
        metrics.inc(&metrics.vehicles_no_trip);
        debug!(vehicle = %position.vehicle_id, "vehicle has no trip assignment");
        return VehicleOutcome::Skipped;
    };

    let Some(upcoming) = matcher.upcoming_stops(position, config.horizon, now) else {
        metrics.inc(&metrics.vehicles_unknown_trip);
        debug!(vehicle = %position.vehicle_id, trip = %trip_id, "trip not in schedule");
        return VehicleOutcome::Skipped;
    };

    let mut created = 0usize;
    let mut updated = 0usize;
    for stop_ref in &upcoming {
        let prediction = computer.compute(position, &trip_id, stop_ref, now);
        match store.upsert(prediction) {
            UpsertOutcome::Inserted => {
                metrics.inc(&metrics.predictions_created);
                created += 1;
            }
            UpsertOutcome::Replaced => {
                metrics.inc(&metrics.predictions_updated);
                updated += 1;
            }
            UpsertOutcome::Stale => {
                metrics.inc(&metrics.predictions_stale_dropped);
            }
        }
    }

    VehicleOutcome::Processed { created, updated }
}
