//! MGS-shock stress: every obligor's grade takes an independent random
//! step, and the shocked grade is re-priced through the grade table.
//!
//! Per trial:
//!   1. Seed the stream from the trial seed.
//!   2. Draw one shock per obligor, in obligor table order.
//!   3. New grade = old grade + shock, clamped to [1, 26].
//!   4. New PD = grade table PD of the new grade.
//!   5. Re-evaluate RWA and summarise the shocks.

use crate::{
    config::ShockDistribution,
    error::{StressError, StressResult},
    grades::{GradeScale, PdPoint},
    portfolio::{mean, Portfolio},
    record::{MgsShockRecord, ShockHistogram, SHOCK_LIMIT},
    rng::{StreamSlot, TrialRng},
    simulator::StressSimulator,
    types::{Grade, Seed, MAX_GRADE, MIN_GRADE},
};
use rand_distr::{Distribution, Normal};

/// Shock sampler resolved from a `ShockDistribution`.
#[derive(Debug, Clone, Copy)]
enum ShockSampler {
    Uniform,
    Normal(Normal<f64>),
}

impl ShockSampler {
    fn new(distribution: ShockDistribution) -> StressResult<Self> {
        match distribution {
            ShockDistribution::Uniform => Ok(Self::Uniform),
            ShockDistribution::Normal { mean, std_dev } => {
                if !mean.is_finite() {
                    return Err(StressError::invalid("shock", format!("mean {mean} must be finite")));
                }
                Normal::new(mean, std_dev).map(Self::Normal).map_err(|e| {
                    StressError::invalid("shock", format!("std_dev {std_dev}: {e}"))
                })
            }
        }
    }

    fn draw(&self, rng: &mut TrialRng) -> i32 {
        match self {
            Self::Uniform => rng.int_inclusive(-SHOCK_LIMIT, SHOCK_LIMIT),
            Self::Normal(normal) => {
                let limit = SHOCK_LIMIT as f64;
                normal.sample(rng).round_ties_even().clamp(-limit, limit) as i32
            }
        }
    }
}

/// Per-obligor result of one shock trial.
#[derive(Debug, Clone, PartialEq)]
pub struct ShockOutcome {
    pub shocks: Vec<i32>,
    pub grades: Vec<Grade>,
    pub pds: Vec<f64>,
}

pub struct MgsShockSimulator<'a> {
    portfolio: &'a Portfolio,
    grades: &'a GradeScale,
    sampler: ShockSampler,
    pd_point: PdPoint,
    obligor_grades: Vec<Grade>,
    mean_pd: f64,
    weighted_pd: f64,
}

impl<'a> MgsShockSimulator<'a> {
    /// Fails up front if any obligor lacks a grade or carries a PD other
    /// than its grade's `pd_mid`, if any grade in [1, 26] has no mapping,
    /// or if the distribution is malformed.
    pub fn new(
        portfolio: &'a Portfolio,
        grades: &'a GradeScale,
        distribution: ShockDistribution,
        pd_point: PdPoint,
    ) -> StressResult<Self> {
        grades.ensure_complete()?;
        let sampler = ShockSampler::new(distribution)?;

        let obligor_grades = portfolio
            .obligors()
            .iter()
            .map(|o| {
                o.mgs.ok_or_else(|| {
                    StressError::invalid(o.cis_code.clone(), "obligor has no MGS grade")
                })
            })
            .collect::<StressResult<Vec<_>>>()?;

        // Baseline PD is the mid point of the obligor's grade.
        for (obligor, &grade) in portfolio.obligors().iter().zip(&obligor_grades) {
            let table_pd = grades.pd_for(grade, PdPoint::Mid)?;
            if obligor.pd != table_pd {
                return Err(StressError::invalid(
                    obligor.cis_code.clone(),
                    format!("pd {} differs from pd_mid {table_pd} of grade {grade}", obligor.pd),
                ));
            }
        }

        let pds = portfolio.obligor_pds();
        log::info!(
            "mgs shocks: {} obligors, distribution {}, pd point {:?}",
            obligor_grades.len(),
            distribution.label(),
            pd_point
        );

        Ok(Self {
            portfolio,
            grades,
            sampler,
            pd_point,
            obligor_grades,
            mean_pd: mean(&pds),
            weighted_pd: portfolio.weighted_pd(&pds),
        })
    }

    /// Draw and apply the shocks for one seed.
    pub fn shock_trial(&self, seed: Seed) -> StressResult<ShockOutcome> {
        let mut rng = TrialRng::for_stream(seed, StreamSlot::MgsShock);
        let n = self.obligor_grades.len();
        let mut shocks = Vec::with_capacity(n);
        let mut grades = Vec::with_capacity(n);
        let mut pds = Vec::with_capacity(n);

        for &grade in &self.obligor_grades {
            let shock = self.sampler.draw(&mut rng);
            let new_grade = (grade + shock).clamp(MIN_GRADE, MAX_GRADE);
            pds.push(self.grades.pd_for(new_grade, self.pd_point)?);
            shocks.push(shock);
            grades.push(new_grade);
        }

        Ok(ShockOutcome { shocks, grades, pds })
    }
}

impl StressSimulator for MgsShockSimulator<'_> {
    type Record = MgsShockRecord;

    fn name(&self) -> &'static str {
        StreamSlot::MgsShock.name()
    }

    fn run_trial(&self, seed: Seed) -> StressResult<MgsShockRecord> {
        let outcome = self.shock_trial(seed)?;
        let rwa_new = self.portfolio.rwa_with(&outcome.pds)?;

        let shocks: Vec<f64> = outcome.shocks.iter().map(|&s| s as f64).collect();
        let shock_mean = mean(&shocks);

        log::debug!(
            "mgs shocks seed {seed}: mean shock {shock_mean:.3}, RWA {:.0} -> {:.0}",
            self.portfolio.baseline_rwa(),
            rwa_new
        );

        Ok(MgsShockRecord {
            seed,
            shock_median: median(&outcome.shocks),
            shock_mean,
            mean_pd: self.mean_pd,
            mean_pd_new: mean(&outcome.pds),
            weighted_pd: self.weighted_pd,
            weighted_pd_new: self.portfolio.weighted_pd(&outcome.pds),
            rwa: self.portfolio.baseline_rwa(),
            rwa_new,
            histogram: ShockHistogram::from_shocks(&outcome.shocks),
        })
    }
}

/// Median of integer shocks; the mean of the middle pair for even counts.
pub fn median(values: &[i32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
    } else {
        sorted[mid] as f64
    }
}
