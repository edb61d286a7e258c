//! Simulator trait.
//!
//! RULE: Every stress mechanism implements StressSimulator.
//! The runner calls run_trial() once per trial index with seed = index.
//! A trial reads only the simulator's immutable reference data and
//! writes only its own record, so trials may run in any order.

use crate::{error::StressResult, types::Seed};

/// The contract every simulator must fulfill.
pub trait StressSimulator: Sync {
    /// One row of this simulator's result table.
    type Record: Send;

    /// Unique stable name for this simulator.
    fn name(&self) -> &'static str;

    /// Run one independent trial.
    ///
    /// Any error is fatal for the whole run: it means the reference data
    /// cannot support the scenario, not that this seed was unlucky.
    fn run_trial(&self, seed: Seed) -> StressResult<Self::Record>;
}
