//! Release readiness tracking for multi-tenant QA teams.
//!
//! Bugs and test runs are modelled as aggregates with literal transition tables. The
//! [`releases::confidence`] module folds them, together with requirement readiness and a
//! security/ops signal, into a release confidence score and a fixed list of release gates.

pub mod bugs;
pub mod config;
pub mod error;
pub mod events;
mod http;
pub mod lifecycle;
pub mod memory;
pub mod releases;
pub mod repository;
pub mod requirements;
pub mod telemetry;
pub mod tenant;
pub mod test_runs;
