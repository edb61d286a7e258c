//! Per-trial result records.
//!
//! A record is created and fully populated inside one trial and never
//! mutated afterwards; the runner only appends it to the result table.

use crate::types::Seed;
use serde::{Deserialize, Serialize};

/// Largest absolute grade shock.
pub const SHOCK_LIMIT: i32 = 3;

const SHOCK_BINS: usize = (2 * SHOCK_LIMIT + 1) as usize;

/// Common view over both result tables.
pub trait TrialRecord {
    fn seed(&self) -> Seed;

    /// Total RWA (pre-stress, post-stress).
    fn rwa_pair(&self) -> (f64, f64);

    /// Exposure-weighted PD (pre-stress, post-stress).
    fn weighted_pd_pair(&self) -> (f64, f64);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSwapRecord {
    pub seed: Seed,
    pub swapped_obligors: usize,
    pub mean_pd: f64,
    pub mean_pd_new: f64,
    pub weighted_pd: f64,
    pub weighted_pd_new: f64,
    pub rwa: f64,
    pub rwa_new: f64,
}

impl TrialRecord for BucketSwapRecord {
    fn seed(&self) -> Seed {
        self.seed
    }

    fn rwa_pair(&self) -> (f64, f64) {
        (self.rwa, self.rwa_new)
    }

    fn weighted_pd_pair(&self) -> (f64, f64) {
        (self.weighted_pd, self.weighted_pd_new)
    }
}

/// Count of obligors per applied shock, bins -3..=3.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShockHistogram {
    counts: [u64; SHOCK_BINS],
}

impl ShockHistogram {
    pub fn from_counts(counts: [u64; SHOCK_BINS]) -> Self {
        Self { counts }
    }

    pub fn from_shocks(shocks: &[i32]) -> Self {
        let mut histogram = Self::default();
        for &shock in shocks {
            histogram.record(shock);
        }
        histogram
    }

    /// Panics on a shock outside [-SHOCK_LIMIT, SHOCK_LIMIT]; samplers clamp first.
    pub fn record(&mut self, shock: i32) {
        assert!(shock.abs() <= SHOCK_LIMIT, "shock {shock} outside histogram range");
        self.counts[(shock + SHOCK_LIMIT) as usize] += 1;
    }

    pub fn count(&self, shock: i32) -> u64 {
        if shock.abs() > SHOCK_LIMIT {
            return 0;
        }
        self.counts[(shock + SHOCK_LIMIT) as usize]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// `(shock, count)` pairs from -3 to 3.
    pub fn iter(&self) -> impl Iterator<Item = (i32, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .map(|(i, &n)| (i as i32 - SHOCK_LIMIT, n))
    }

    pub fn counts(&self) -> &[u64; SHOCK_BINS] {
        &self.counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MgsShockRecord {
    pub seed: Seed,
    pub shock_median: f64,
    pub shock_mean: f64,
    pub mean_pd: f64,
    pub mean_pd_new: f64,
    pub weighted_pd: f64,
    pub weighted_pd_new: f64,
    pub rwa: f64,
    pub rwa_new: f64,
    pub histogram: ShockHistogram,
}

impl TrialRecord for MgsShockRecord {
    fn seed(&self) -> Seed {
        self.seed
    }

    fn rwa_pair(&self) -> (f64, f64) {
        (self.rwa, self.rwa_new)
    }

    fn weighted_pd_pair(&self) -> (f64, f64) {
        (self.weighted_pd, self.weighted_pd_new)
    }
}
