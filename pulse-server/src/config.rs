//! Engine configuration.

use chrono::Duration;

/// Configuration parameters for the prediction engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seconds between write-path cycles (feed poll cadence).
    pub poll_interval_secs: u64,

    /// Seconds between expiry sweeps.
    pub sweep_interval_secs: u64,

    /// Maximum upcoming stops predicted per vehicle.
    pub horizon: usize,

    /// Number of vehicles processed in parallel per batch.
    pub batch_size: usize,

    /// Seconds a prediction remains queryable after its predicted arrival,
    /// so "just departed" displays keep working.
    pub grace_window_secs: i64,

    /// Hard staleness ceiling for vehicle positions (seconds). Older
    /// records are discarded before matching.
    pub max_position_age_secs: i64,

    /// Seconds of feed silence after which a vehicle's matcher state is
    /// evicted.
    pub vehicle_state_ttl_secs: u64,

    /// Maximum number of vehicles tracked by the matcher at once.
    pub vehicle_state_capacity: u64,

    /// Distance in metres within which a vehicle counts as having reached
    /// a stop.
    pub arrival_radius_m: f64,

    /// Minimum speed floor (m/s) used when deriving arrival estimates;
    /// guards the distance/speed division.
    pub min_speed_floor: f64,

    /// Age in seconds past which a stored prediction counts as stale in
    /// the aggregate stats.
    pub stale_after_secs: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            sweep_interval_secs: 120,
            horizon: 10,
            batch_size: 8,
            grace_window_secs: 300, // 5 minutes
            max_position_age_secs: 900,
            vehicle_state_ttl_secs: 600,
            vehicle_state_capacity: 10_000,
            arrival_radius_m: 50.0,
            min_speed_floor: 1.0,
            stale_after_secs: 90,
        }
    }
}

impl EngineConfig {
    /// Returns the poll interval as a std Duration for timers.
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }

    /// Returns the sweep interval as a std Duration for timers.
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }

    /// Returns the grace window as a chrono Duration.
    pub fn grace_window(&self) -> Duration {
        Duration::seconds(self.grace_window_secs)
    }

    /// Returns the position staleness ceiling as a chrono Duration.
    pub fn max_position_age(&self) -> Duration {
        Duration::seconds(self.max_position_age_secs)
    }

    /// Returns the stats staleness threshold as a chrono Duration.
    pub fn stale_after(&self) -> Duration {
        Duration::seconds(self.stale_after_secs)
    }

    /// Returns the vehicle-state TTL as a std Duration for the cache.
    pub fn vehicle_state_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.vehicle_state_ttl_secs)
    }
}

/// Coefficients of the confidence decay curve.
///
/// Confidence starts at `base` for the immediate next stop of a freshly
/// reporting vehicle and decays multiplicatively with each stop of
/// lookahead and with ping staleness beyond the freshness threshold.
/// The curve is deterministic and monotonically non-increasing in both
/// factors; the coefficients here are the tunable knobs.
#[derive(Debug, Clone)]
pub struct ConfidenceConfig {
    /// Confidence for the immediate next stop with a fresh ping.
    pub base: f64,

    /// Multiplier applied once per stop of lookahead.
    pub per_stop_decay: f64,

    /// Ping age below which no staleness penalty applies (seconds).
    pub fresh_threshold_secs: i64,

    /// Half-life of the staleness penalty beyond the threshold (seconds).
    pub staleness_half_life_secs: i64,

    /// Extra multiplier for schedule-only fallbacks.
    pub schedule_only_factor: f64,

    /// Lower bound; predictions never score below this, so schedule-only
    /// fallbacks stay distinguishable from "no information".
    pub floor: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base: 0.9,
            per_stop_decay: 0.85,
            fresh_threshold_secs: 60,
            staleness_half_life_secs: 300,
            schedule_only_factor: 0.6,
            floor: 0.1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_config() {
        let config = EngineConfig::default();

        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.sweep_interval_secs, 120);
        assert_eq!(config.horizon, 10);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.grace_window_secs, 300);
        assert_eq!(config.max_position_age_secs, 900);
    }

    #[test]
    fn duration_helpers() {
        let config = EngineConfig::default();

        assert_eq!(config.poll_interval(), std::time::Duration::from_secs(30));
        assert_eq!(config.grace_window(), Duration::minutes(5));
        assert_eq!(config.max_position_age(), Duration::minutes(15));
        assert_eq!(config.stale_after(), Duration::seconds(90));
    }

    #[test]
    fn default_confidence_config_is_sane() {
        let config = ConfidenceConfig::default();

        assert!(config.base <= 1.0);
        assert!(config.per_stop_decay > 0.0 && config.per_stop_decay < 1.0);
        assert!(config.schedule_only_factor > 0.0 && config.schedule_only_factor < 1.0);
        assert!(config.floor > 0.0);
        assert!(config.floor < config.base);
    }
}
