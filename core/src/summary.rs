//! Distribution summaries over a result table: the starting value and
//! the headline percentiles of the stressed value.

use crate::record::TrialRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub trials: usize,
    pub pre_stress_mean: f64,
    pub post_stress_mean: f64,
    pub post_stress_min: f64,
    pub post_stress_max: f64,
    pub p50: f64,
    pub p75: f64,
}

impl DistributionSummary {
    /// Summarise `(pre, post)` pairs. `None` for an empty table.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Option<Self> {
        if pairs.is_empty() {
            return None;
        }
        let n = pairs.len() as f64;
        let mut post: Vec<f64> = pairs.iter().map(|&(_, after)| after).collect();
        post.sort_by(f64::total_cmp);

        Some(Self {
            trials: pairs.len(),
            pre_stress_mean: pairs.iter().map(|&(before, _)| before).sum::<f64>() / n,
            post_stress_mean: post.iter().sum::<f64>() / n,
            post_stress_min: post[0],
            post_stress_max: post[post.len() - 1],
            p50: percentile_sorted(&post, 50.0),
            p75: percentile_sorted(&post, 75.0),
        })
    }

    pub fn rwa<R: TrialRecord>(records: &[R]) -> Option<Self> {
        let pairs: Vec<_> = records.iter().map(|r| r.rwa_pair()).collect();
        Self::from_pairs(&pairs)
    }

    pub fn weighted_pd<R: TrialRecord>(records: &[R]) -> Option<Self> {
        let pairs: Vec<_> = records.iter().map(|r| r.weighted_pd_pair()).collect();
        Self::from_pairs(&pairs)
    }

    /// Post-stress median relative to the starting value.
    pub fn median_uplift(&self) -> f64 {
        if self.pre_stress_mean == 0.0 {
            return 0.0;
        }
        self.p50 / self.pre_stress_mean - 1.0
    }
}

/// Percentile with linear interpolation between closest ranks.
/// `sorted` must be ascending and non-empty.
fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_sorted(&v, 50.0), 2.5);
        assert_eq!(percentile_sorted(&v, 75.0), 3.25);
        assert_eq!(percentile_sorted(&v, 0.0), 1.0);
        assert_eq!(percentile_sorted(&v, 100.0), 4.0);
    }

    #[test]
    fn single_value_percentiles() {
        assert_eq!(percentile_sorted(&[7.0], 75.0), 7.0);
    }

    #[test]
    fn summary_of_pairs() {
        let pairs = [(10.0, 12.0), (10.0, 11.0), (10.0, 14.0), (10.0, 13.0)];
        let s = DistributionSummary::from_pairs(&pairs).unwrap();
        assert_eq!(s.trials, 4);
        assert_eq!(s.pre_stress_mean, 10.0);
        assert_eq!(s.post_stress_mean, 12.5);
        assert_eq!(s.post_stress_min, 11.0);
        assert_eq!(s.post_stress_max, 14.0);
        assert_eq!(s.p50, 12.5);
        assert_eq!(s.p75, 13.25);
        assert!((s.median_uplift() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn empty_table_has_no_summary() {
        assert!(DistributionSummary::from_pairs(&[]).is_none());
    }
}
