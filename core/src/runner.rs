//! The simulation runner: drives a simulator across N trials.
//!
//! RULES:
//!   - Trial i always runs with seed i; never wall-clock, never arrival order.
//!   - The result table is in trial-index order whatever the execution mode.
//!   - The first error aborts the whole run; no partial table is returned.

use crate::{
    config::ExecutionMode,
    error::StressResult,
    simulator::StressSimulator,
    types::Seed,
};
use rayon::prelude::*;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationRunner {
    pub trial_count: u64,
    pub mode: ExecutionMode,
}

impl SimulationRunner {
    pub fn new(trial_count: u64) -> Self {
        Self {
            trial_count,
            mode: ExecutionMode::Sequential,
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run trials 0..trial_count and collect one record per trial.
    pub fn run<S: StressSimulator>(&self, simulator: &S) -> StressResult<Vec<S::Record>> {
        log::info!(
            "{}: starting {} trials ({:?})",
            simulator.name(),
            self.trial_count,
            self.mode
        );
        let started = Instant::now();

        let records = match self.mode {
            ExecutionMode::Sequential => (0..self.trial_count)
                .map(|seed: Seed| simulator.run_trial(seed))
                .collect::<StressResult<Vec<_>>>(),
            ExecutionMode::Parallel => (0..self.trial_count)
                .into_par_iter()
                .map(|seed: Seed| simulator.run_trial(seed))
                .collect::<StressResult<Vec<_>>>(),
        };

        match &records {
            Ok(rows) => log::info!(
                "{}: {} trials completed in {:.2?}",
                simulator.name(),
                rows.len(),
                started.elapsed()
            ),
            Err(e) => log::error!("{}: run aborted: {e}", simulator.name()),
        }
        records
    }
}
