//! Transit arrival-prediction engine.
//!
//! Fuses live vehicle telemetry with a static timetable to produce
//! ranked, time-bounded, confidence-scored arrival estimates per stop,
//! and serves them through a read-only query API.

pub mod config;
pub mod domain;
pub mod engine;
pub mod feed;
pub mod query;
pub mod schedule;
pub mod store;
pub mod web;
