//! RWA stress engine: Monte Carlo estimates of how IRB risk-weighted
//! assets move when obligor credit grades are stressed.
//!
//! Two stress mechanisms share one capital formula:
//!   - bucket_swap: obligors trade PDs across buckets per a migration matrix
//!   - mgs_shock:   every obligor's grade takes a random step
//!
//! The runner drives either one across independent, seeded trials.

pub mod bucket_swap;
pub mod capital;
pub mod config;
pub mod error;
pub mod grades;
pub mod matrix;
pub mod mgs_shock;
pub mod portfolio;
pub mod record;
pub mod rng;
pub mod runner;
pub mod simulator;
pub mod store;
pub mod summary;
pub mod types;
