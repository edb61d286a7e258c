//! Bucket-swap stress: obligors trade PDs across buckets according to a
//! migration matrix.
//!
//! Per trial, obligor ids are partitioned into unassigned and assigned.
//! For each planned swap, in matrix order:
//!   1. Pool the unassigned obligors of from_bucket and of to_bucket.
//!   2. Sample `swaps` obligors from each pool without replacement.
//!   3. Pair them up and exchange PD and bucket within each pair.
//!   4. Commit the whole pair list, moving both groups to assigned.
//!
//! Every exchange is PD-for-PD, so the multiset of PDs (and hence the
//! population mean PD) is conserved. A trial that breaks this fails with
//! ReconciliationMismatch.

use crate::{
    error::{StressError, StressResult},
    matrix::{MigrationMatrix, MigrationPlan, PlannedSwap},
    portfolio::{mean, Portfolio},
    record::BucketSwapRecord,
    rng::{StreamSlot, TrialRng},
    simulator::StressSimulator,
    types::{BucketLabel, Seed},
};
use std::collections::BTreeMap;

/// Allowed drift of the population mean PD across a swap sequence.
pub const MEAN_PD_TOLERANCE: f64 = 1e-5;

/// New PD and bucket for an obligor picked by a swap.
#[derive(Debug, Clone, PartialEq)]
struct Reassignment {
    pd: f64,
    bucket: usize,
}

/// Outcome of one swap sequence: per-obligor PD and bucket after the trial.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapOutcome {
    pub pds: Vec<f64>,
    pub buckets: Vec<BucketLabel>,
    pub swapped: usize,
}

pub struct BucketSwapSimulator<'a> {
    portfolio: &'a Portfolio,
    plan: MigrationPlan,
    /// Distinct bucket labels, indexed by `obligor_bucket`.
    labels: Vec<BucketLabel>,
    obligor_bucket: Vec<usize>,
    pds: Vec<f64>,
    mean_pd: f64,
    weighted_pd: f64,
}

impl<'a> BucketSwapSimulator<'a> {
    /// Resolve the matrix against the portfolio. Fails up front if any
    /// obligor lacks a bucket or if the matrix asks for more swaps than a
    /// bucket can supply.
    pub fn new(portfolio: &'a Portfolio, matrix: &MigrationMatrix) -> StressResult<Self> {
        let mut labels: Vec<BucketLabel> = Vec::new();
        let mut obligor_bucket = Vec::with_capacity(portfolio.obligors().len());
        let mut populations: BTreeMap<BucketLabel, usize> = BTreeMap::new();

        for obligor in portfolio.obligors() {
            let bucket = obligor.bucket.as_ref().ok_or_else(|| {
                StressError::invalid(obligor.cis_code.clone(), "obligor has no bucket")
            })?;
            let idx = match labels.iter().position(|l| l == bucket) {
                Some(idx) => idx,
                None => {
                    labels.push(bucket.clone());
                    labels.len() - 1
                }
            };
            obligor_bucket.push(idx);
            *populations.entry(bucket.clone()).or_insert(0) += 1;
        }

        let plan = MigrationPlan::build(matrix, &populations)?;
        for step in plan.steps() {
            log::debug!(
                "planned swap {} -> {}: {:.4} of population = {} obligors",
                step.from_bucket,
                step.to_bucket,
                step.percent,
                step.swaps
            );
        }
        log::info!(
            "bucket swaps: {} matrix entries over {} buckets, {} obligors re-graded per trial",
            plan.steps().len(),
            labels.len(),
            plan.obligors_moved()
        );

        let pds = portfolio.obligor_pds();
        let mean_pd = mean(&pds);
        let weighted_pd = portfolio.weighted_pd(&pds);

        Ok(Self {
            portfolio,
            plan,
            labels,
            obligor_bucket,
            pds,
            mean_pd,
            weighted_pd,
        })
    }

    pub fn plan(&self) -> &MigrationPlan {
        &self.plan
    }

    /// Run the swap sequence for one seed and return the reassigned PDs.
    pub fn swap_trial(&self, seed: Seed) -> StressResult<SwapOutcome> {
        let mut rng = TrialRng::for_stream(seed, StreamSlot::BucketSwap);
        let mut assigned: Vec<Option<Reassignment>> = vec![None; self.pds.len()];

        for step in self.plan.steps() {
            if step.swaps == 0 {
                continue;
            }
            let pairs = self.draw_pairs(step, &assigned, &mut rng)?;
            for (from, to) in pairs {
                assigned[from] = Some(Reassignment {
                    pd: self.pds[to],
                    bucket: self.obligor_bucket[to],
                });
                assigned[to] = Some(Reassignment {
                    pd: self.pds[from],
                    bucket: self.obligor_bucket[from],
                });
            }
        }

        let mut swapped = 0;
        let mut pds = Vec::with_capacity(self.pds.len());
        let mut buckets = Vec::with_capacity(self.pds.len());
        for (i, slot) in assigned.iter().enumerate() {
            match slot {
                Some(r) => {
                    swapped += 1;
                    pds.push(r.pd);
                    buckets.push(self.labels[r.bucket].clone());
                }
                None => {
                    pds.push(self.pds[i]);
                    buckets.push(self.labels[self.obligor_bucket[i]].clone());
                }
            }
        }

        Ok(SwapOutcome {
            pds,
            buckets,
            swapped,
        })
    }

    /// Sample both sides of one planned swap from the unassigned pools.
    /// Returns `(from_obligor, to_obligor)` pairs in draw order.
    fn draw_pairs(
        &self,
        step: &PlannedSwap,
        assigned: &[Option<Reassignment>],
        rng: &mut TrialRng,
    ) -> StressResult<Vec<(usize, usize)>> {
        let from_pool = self.unassigned_in(&step.from_bucket, assigned);
        let to_pool = self.unassigned_in(&step.to_bucket, assigned);

        for (bucket, pool) in [(&step.from_bucket, &from_pool), (&step.to_bucket, &to_pool)] {
            if pool.len() < step.swaps {
                return Err(StressError::InsufficientPopulation {
                    bucket: bucket.clone(),
                    required: step.swaps,
                    available: pool.len(),
                });
            }
        }

        let from_picks = rng.sample_indices(from_pool.len(), step.swaps);
        let to_picks = rng.sample_indices(to_pool.len(), step.swaps);

        Ok(from_picks
            .into_iter()
            .zip(to_picks)
            .map(|(f, t)| (from_pool[f], to_pool[t]))
            .collect())
    }

    fn unassigned_in(&self, bucket: &str, assigned: &[Option<Reassignment>]) -> Vec<usize> {
        let Some(target) = self.labels.iter().position(|l| l == bucket) else {
            return Vec::new();
        };
        (0..self.pds.len())
            .filter(|&i| assigned[i].is_none() && self.obligor_bucket[i] == target)
            .collect()
    }
}

impl StressSimulator for BucketSwapSimulator<'_> {
    type Record = BucketSwapRecord;

    fn name(&self) -> &'static str {
        StreamSlot::BucketSwap.name()
    }

    fn run_trial(&self, seed: Seed) -> StressResult<BucketSwapRecord> {
        let outcome = self.swap_trial(seed)?;

        let mean_pd_new = mean(&outcome.pds);
        if (self.mean_pd - mean_pd_new).abs() >= MEAN_PD_TOLERANCE {
            return Err(StressError::ReconciliationMismatch {
                before: self.mean_pd,
                after: mean_pd_new,
            });
        }

        let weighted_pd_new = self.portfolio.weighted_pd(&outcome.pds);
        let rwa_new = self.portfolio.rwa_with(&outcome.pds)?;

        log::debug!(
            "bucket swaps seed {seed}: {} obligors swapped, RWA {:.0} -> {:.0}",
            outcome.swapped,
            self.portfolio.baseline_rwa(),
            rwa_new
        );

        Ok(BucketSwapRecord {
            seed,
            swapped_obligors: outcome.swapped,
            mean_pd: self.mean_pd,
            mean_pd_new,
            weighted_pd: self.weighted_pd,
            weighted_pd_new,
            rwa: self.portfolio.baseline_rwa(),
            rwa_new,
        })
    }
}
