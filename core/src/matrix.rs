//! Migration matrix: which fraction of a bucket's obligors swap PDs with
//! which other bucket.
//!
//! ORDER MATTERS. Entries are applied in table order and every swapped
//! obligor leaves the pool for later entries, so a bucket that appears in
//! several pairs serves the earlier pairs first. The order is part of
//! the scenario definition and is never shuffled.

use crate::{
    error::{StressError, StressResult},
    types::BucketLabel,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationEntry {
    pub from_bucket: BucketLabel,
    pub to_bucket: BucketLabel,
    /// Fraction of `from_bucket`'s population, in [0, 1].
    pub percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationMatrix {
    entries: Vec<MigrationEntry>,
}

impl MigrationMatrix {
    pub fn new(entries: Vec<MigrationEntry>) -> StressResult<Self> {
        for entry in &entries {
            let record = format!("{} -> {}", entry.from_bucket, entry.to_bucket);
            if entry.from_bucket == entry.to_bucket {
                return Err(StressError::invalid(record, "self-pairs are not migrations"));
            }
            if !(0.0..=1.0).contains(&entry.percent) {
                return Err(StressError::invalid(
                    record,
                    format!("fraction {} outside [0, 1]", entry.percent),
                ));
            }
        }
        Ok(Self { entries })
    }

    /// Flatten a square bucket × bucket matrix into the ordered pair list:
    /// row `i`, column `j` for every `j > i`, walking rows in bucket order.
    /// The diagonal and the lower triangle are ignored.
    pub fn from_square(buckets: &[BucketLabel], percent: &[Vec<f64>]) -> StressResult<Self> {
        if percent.len() != buckets.len() || percent.iter().any(|row| row.len() != buckets.len()) {
            return Err(StressError::invalid(
                "swaps matrix",
                format!("expected a {0}x{0} matrix", buckets.len()),
            ));
        }

        let mut entries = Vec::new();
        for (i, from_bucket) in buckets.iter().enumerate() {
            for (j, to_bucket) in buckets.iter().enumerate().skip(i + 1) {
                entries.push(MigrationEntry {
                    from_bucket: from_bucket.clone(),
                    to_bucket: to_bucket.clone(),
                    percent: percent[i][j],
                });
            }
        }
        Self::new(entries)
    }

    pub fn entries(&self) -> &[MigrationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One matrix entry with its swap count resolved against a portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedSwap {
    pub from_bucket: BucketLabel,
    pub to_bucket: BucketLabel,
    pub percent: f64,
    pub swaps: usize,
}

/// The matrix resolved against bucket populations. Building the plan
/// replays the entries on counts alone; since every entry consumes
/// exactly `swaps` obligors from each side whatever the seed, a plan
/// that builds can never run short inside a trial.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationPlan {
    steps: Vec<PlannedSwap>,
}

impl MigrationPlan {
    pub fn build(
        matrix: &MigrationMatrix,
        populations: &BTreeMap<BucketLabel, usize>,
    ) -> StressResult<Self> {
        let mut unassigned = populations.clone();
        let mut steps = Vec::with_capacity(matrix.len());

        for entry in matrix.entries() {
            let population = match populations.get(&entry.from_bucket) {
                Some(&n) => n,
                None => {
                    log::warn!(
                        "migration {} -> {}: bucket '{}' has no obligors, no swaps planned",
                        entry.from_bucket,
                        entry.to_bucket,
                        entry.from_bucket
                    );
                    0
                }
            };
            let swaps = swap_count(entry.percent, population);

            if swaps > 0 {
                for bucket in [&entry.from_bucket, &entry.to_bucket] {
                    let available = unassigned.get(bucket).copied().unwrap_or(0);
                    if available < swaps {
                        return Err(StressError::InsufficientPopulation {
                            bucket: bucket.clone(),
                            required: swaps,
                            available,
                        });
                    }
                    unassigned.insert(bucket.clone(), available - swaps);
                }
            }

            steps.push(PlannedSwap {
                from_bucket: entry.from_bucket.clone(),
                to_bucket: entry.to_bucket.clone(),
                percent: entry.percent,
                swaps,
            });
        }

        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[PlannedSwap] {
        &self.steps
    }

    /// Obligors that change PD in every trial (both sides of every pair).
    pub fn obligors_moved(&self) -> usize {
        self.steps.iter().map(|s| 2 * s.swaps).sum()
    }
}

/// `floor(fraction × population)`.
pub fn swap_count(percent: f64, population: usize) -> usize {
    (percent * population as f64).floor() as usize
}
