//! Basel II IRB risk-weight formula, corporate exposure class with the
//! continuous maturity adjustment (CRR Art. 153).
//!
//! The evaluator is a pure function of one row. It keeps no state, so
//! callers may apply it to facilities in any order or in parallel.
//!
//! Every intermediate is checked: a PD of exactly 0 or 1 makes the
//! logarithm and the inverse normal CDF undefined, and the formula must
//! fail rather than return NaN or infinity.

use crate::error::{StressError, StressResult};
use serde::{Deserialize, Serialize};
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::SQRT_2;

/// Confidence level of the supervisory loss quantile.
pub const CONFIDENCE_LEVEL: f64 = 0.999;

/// Scaling factor applied on top of 12.5 × K.
pub const SCALING_FACTOR: f64 = 1.06;

/// Maturity the adjustment is centred on, in years.
pub const REFERENCE_MATURITY: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalCharge {
    pub risk_weight: f64,
    pub rwa: f64,
}

/// Standard normal CDF.
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal inverse CDF. Only meaningful for p in (0, 1).
pub fn norm_inv_cdf(p: f64) -> f64 {
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Asset correlation for the corporate class: interpolates between 0.24
/// (PD near 0) and 0.12 (PD large) with an exponential weight.
pub fn asset_correlation(pd: f64) -> f64 {
    let weight = (1.0 - (-50.0 * pd).exp()) / (1.0 - (-50.0f64).exp());
    0.12 * weight + 0.24 * (1.0 - weight)
}

/// Evaluate the capital formula for one row.
pub fn evaluate(pd: f64, lgd: f64, ead: f64, maturity: f64) -> StressResult<CapitalCharge> {
    validate_row(pd, lgd, ead, maturity)?;

    // Maturity-adjustment slope
    let b = (0.11852 - 0.05478 * pd.ln()).powi(2);
    let b = finite("maturity slope", b, pd)?;

    let denominator = 1.0 - 1.5 * b;
    if denominator <= 0.0 {
        return Err(StressError::NonFinite {
            stage: "maturity adjustment",
            pd,
        });
    }
    let maturity_adj = finite(
        "maturity adjustment",
        (1.0 + (maturity - REFERENCE_MATURITY) * b) / denominator,
        pd,
    )?;

    let r = finite("asset correlation", asset_correlation(pd), pd)?;

    let z = (1.0 / (1.0 - r).sqrt()) * norm_inv_cdf(pd)
        + (r / (1.0 - r)).sqrt() * norm_inv_cdf(CONFIDENCE_LEVEL);
    let z = finite("conditional default threshold", z, pd)?;

    let pd_lgd_component = finite(
        "pd/lgd component",
        lgd * norm_cdf(z) - lgd * pd,
        pd,
    )?;

    let risk_weight = finite(
        "risk weight",
        pd_lgd_component * maturity_adj * 12.5 * SCALING_FACTOR,
        pd,
    )?;
    let rwa = finite("rwa", risk_weight * ead, pd)?;

    Ok(CapitalCharge { risk_weight, rwa })
}

fn validate_row(pd: f64, lgd: f64, ead: f64, maturity: f64) -> StressResult<()> {
    let record = format!("pd={pd}");
    if !(pd > 0.0 && pd < 1.0) {
        return Err(StressError::invalid(record, "pd must lie strictly inside (0, 1)"));
    }
    if !(0.0..=1.0).contains(&lgd) {
        return Err(StressError::invalid(record, format!("lgd {lgd} outside [0, 1]")));
    }
    if !ead.is_finite() || ead < 0.0 {
        return Err(StressError::invalid(record, format!("ead {ead} must be finite and non-negative")));
    }
    if !maturity.is_finite() || maturity <= 0.0 {
        return Err(StressError::invalid(record, format!("maturity {maturity} must be positive")));
    }
    Ok(())
}

fn finite(stage: &'static str, value: f64, pd: f64) -> StressResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(StressError::NonFinite { stage, pd })
    }
}
