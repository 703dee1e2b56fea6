//! Prediction storage.
//!
//! The store owns every `StopPrediction` and is the only place records
//! change hands. It is a sharded concurrent map keyed by (stop, trip):
//! upserts and sweeps contend per key rather than behind one global lock,
//! and readers clone records out, so nobody ever observes a half-written
//! record. Reads treat expired records as absent; physical removal is the
//! sweeper's job.

mod sweeper;

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::{PredictionKey, RouteId, StopId, StopPrediction, TripId, VehicleId};

pub use sweeper::ExpirySweeper;

/// What an upsert did with the incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No record existed for the key.
    Inserted,

    /// The incoming record superseded the stored one.
    Replaced,

    /// The stored record was newer (or as new and at least as confident);
    /// the write was dropped.
    Stale,
}

/// Aggregate view of the live store contents.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StoreStats {
    /// Live (non-expired) predictions.
    pub count: usize,

    /// Mean confidence over live predictions; 0 when empty.
    pub avg_confidence: f64,

    /// Fraction of live predictions older than the staleness threshold;
    /// 0 when empty.
    pub stale_fraction: f64,
}

/// Concurrent store of the current best prediction per (stop, trip).
#[derive(Debug, Default)]
pub struct PredictionStore {
    inner: DashMap<PredictionKey, StopPrediction>,
}

impl PredictionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or supersede the record for the prediction's key.
    ///
    /// Last-writer-by-timestamp wins: the incoming record replaces the
    /// stored one only when its `created_at` is strictly later; equal
    /// timestamps prefer the higher confidence. Out-of-order writes from
    /// poll jitter therefore never move a prediction backwards in time.
    pub fn upsert(&self, prediction: StopPrediction) -> UpsertOutcome {
        match self.inner.entry(prediction.key()) {
            Entry::Vacant(entry) => {
                entry.insert(prediction);
                UpsertOutcome::Inserted
            }
            Entry::Occupied(mut entry) => {
                let stored = entry.get();
                let wins = prediction.created_at > stored.created_at
                    || (prediction.created_at == stored.created_at
                        && prediction.confidence_level > stored.confidence_level);
                if wins {
                    entry.insert(prediction);
                    UpsertOutcome::Replaced
                } else {
                    UpsertOutcome::Stale
                }
            }
        }
    }

    /// The live prediction for a key, if any.
    pub fn get(
        &self,
        stop_id: &StopId,
        trip_id: &TripId,
        now: DateTime<Utc>,
    ) -> Option<StopPrediction> {
        let key = PredictionKey {
            stop_id: stop_id.clone(),
            trip_id: trip_id.clone(),
        };
        self.inner
            .get(&key)
            .filter(|p| !p.is_expired(now))
            .map(|p| p.clone())
    }

    /// Live predictions for a stop, optionally filtered by route, ordered
    /// by predicted arrival, at most `limit` entries.
    pub fn query_by_stop(
        &self,
        stop_id: &StopId,
        route_id: Option<&RouteId>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<StopPrediction> {
        let mut results: Vec<StopPrediction> = self
            .inner
            .iter()
            .filter(|entry| {
                let p = entry.value();
                &p.stop_id == stop_id
                    && !p.is_expired(now)
                    && route_id.is_none_or(|r| &p.route_id == r)
            })
            .map(|entry| entry.value().clone())
            .collect();

        sort_by_arrival(&mut results);
        results.truncate(limit);
        results
    }

    /// Live predictions for every stop on a route, grouped by stop and
    /// ordered by predicted arrival within each group.
    pub fn query_by_route(
        &self,
        route_id: &RouteId,
        now: DateTime<Utc>,
    ) -> BTreeMap<StopId, Vec<StopPrediction>> {
        let mut grouped: BTreeMap<StopId, Vec<StopPrediction>> = BTreeMap::new();

        for entry in self.inner.iter() {
            let p = entry.value();
            if &p.route_id == route_id && !p.is_expired(now) {
                grouped.entry(p.stop_id.clone()).or_default().push(p.clone());
            }
        }

        for predictions in grouped.values_mut() {
            sort_by_arrival(predictions);
        }
        grouped
    }

    /// Live predictions for a vehicle's upcoming stops, ordered by
    /// predicted arrival.
    pub fn query_by_vehicle(
        &self,
        vehicle_id: &VehicleId,
        now: DateTime<Utc>,
    ) -> Vec<StopPrediction> {
        let mut results: Vec<StopPrediction> = self
            .inner
            .iter()
            .filter(|entry| {
                let p = entry.value();
                &p.vehicle_id == vehicle_id && !p.is_expired(now)
            })
            .map(|entry| entry.value().clone())
            .collect();

        sort_by_arrival(&mut results);
        results
    }

    /// Aggregate stats over live records. Never persisted; recomputed on
    /// each call.
    pub fn stats(&self, now: DateTime<Utc>, stale_after: Duration) -> StoreStats {
        let mut count = 0usize;
        let mut confidence_sum = 0.0f64;
        let mut stale = 0usize;

        for entry in self.inner.iter() {
            let p = entry.value();
            if p.is_expired(now) {
                continue;
            }
            count += 1;
            confidence_sum += p.confidence_level;
            if now - p.created_at > stale_after {
                stale += 1;
            }
        }

        StoreStats {
            count,
            avg_confidence: if count > 0 {
                confidence_sum / count as f64
            } else {
                0.0
            },
            stale_fraction: if count > 0 {
                stale as f64 / count as f64
            } else {
                0.0
            },
        }
    }

    /// Keys of records expired at `now`. Used by the sweeper to scan
    /// without holding shard locks across deletions.
    fn expired_keys(&self, now: DateTime<Utc>) -> Vec<PredictionKey> {
        self.inner
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Delete the record for `key` only if it is still expired at `now`.
    ///
    /// The re-check under the shard lock makes sweeping safe against
    /// concurrent upserts: a record replaced after the scan has a fresh
    /// `expires_at` and survives.
    fn remove_if_expired(&self, key: &PredictionKey, now: DateTime<Utc>) -> bool {
        self.inner
            .remove_if(key, |_, p| p.is_expired(now))
            .is_some()
    }

    /// Total records physically present, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

fn sort_by_arrival(predictions: &mut [StopPrediction]) {
    // Trip id breaks ties for a stable, deterministic order.
    predictions.sort_by(|a, b| {
        a.predicted_arrival_time
            .cmp(&b.predicted_arrival_time)
            .then_with(|| a.trip_id.cmp(&b.trip_id))
    });
}
