//! Obligor and facility tables, validated once before any trial runs.
//!
//! Facilities are many-to-one children of an obligor. A simulator moves
//! obligor PDs; `Portfolio::rwa_with` pushes those PDs down to every
//! facility of the obligor and re-evaluates the capital formula.

use crate::{
    capital,
    error::{StressError, StressResult},
    grades::GradeScale,
    types::{BucketLabel, CisCode, Grade, MAX_GRADE, MIN_GRADE},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Obligor {
    pub cis_code: CisCode,
    pub pd: f64,
    #[serde(default)]
    pub mgs: Option<Grade>,
    #[serde(default)]
    pub bucket: Option<BucketLabel>,
    pub ead: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Facility {
    pub cis_code: CisCode,
    pub pd: f64,
    pub lgd: f64,
    pub ead: f64,
    pub maturity: f64,
    #[serde(default)]
    pub mgs: Option<Grade>,
}

/// Build obligor records from facility records: EAD is summed, PD and
/// grade are taken from the first facility. Obligors come out in order
/// of first appearance.
pub fn aggregate_obligors(facilities: &[Facility]) -> StressResult<Vec<Obligor>> {
    let mut obligors: Vec<Obligor> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for facility in facilities {
        match position.get(facility.cis_code.as_str()) {
            Some(&idx) => {
                let obligor = &mut obligors[idx];
                if obligor.pd != facility.pd {
                    return Err(StressError::invalid(
                        facility.cis_code.clone(),
                        format!(
                            "facilities carry differing PDs ({} and {})",
                            obligor.pd, facility.pd
                        ),
                    ));
                }
                obligor.ead += facility.ead;
            }
            None => {
                position.insert(facility.cis_code.as_str(), obligors.len());
                obligors.push(Obligor {
                    cis_code: facility.cis_code.clone(),
                    pd: facility.pd,
                    mgs: facility.mgs,
                    bucket: None,
                    ead: facility.ead,
                });
            }
        }
    }
    Ok(obligors)
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    obligors: Vec<Obligor>,
    facilities: Vec<Facility>,
    /// Index into `obligors` for every facility.
    owners: Vec<usize>,
    total_ead: f64,
    baseline_rwa: f64,
}

impl Portfolio {
    /// Validate both tables and attach buckets from grades where the
    /// obligor table does not carry one.
    pub fn new(
        obligors: Vec<Obligor>,
        facilities: Vec<Facility>,
        grades: &GradeScale,
    ) -> StressResult<Self> {
        let mut obligors = obligors;
        let mut index: HashMap<CisCode, usize> = HashMap::with_capacity(obligors.len());

        for (i, obligor) in obligors.iter_mut().enumerate() {
            validate_obligor(obligor)?;
            if obligor.bucket.is_none() {
                if let Some(grade) = obligor.mgs {
                    obligor.bucket = Some(grades.bucket_for(grade)?.clone());
                }
            }
            if index.insert(obligor.cis_code.clone(), i).is_some() {
                return Err(StressError::invalid(
                    obligor.cis_code.clone(),
                    "duplicate obligor identifier",
                ));
            }
        }

        let total_ead: f64 = obligors.iter().map(|o| o.ead).sum();
        if total_ead <= 0.0 {
            return Err(StressError::invalid("portfolio", "total exposure must be positive"));
        }

        let mut owners = Vec::with_capacity(facilities.len());
        let mut baseline_rwa = 0.0;
        for facility in &facilities {
            let owner = *index.get(&facility.cis_code).ok_or_else(|| {
                StressError::invalid(facility.cis_code.clone(), "facility has no matching obligor")
            })?;
            let obligor_pd = obligors[owner].pd;
            if facility.pd != obligor_pd {
                return Err(StressError::invalid(
                    facility.cis_code.clone(),
                    format!("facility pd {} differs from obligor pd {obligor_pd}", facility.pd),
                ));
            }
            owners.push(owner);
            baseline_rwa += evaluate_facility(facility, facility.pd)?;
        }

        log::info!(
            "portfolio: {} obligors, {} facilities, total EAD {:.0}, baseline RWA {:.0}",
            obligors.len(),
            facilities.len(),
            total_ead,
            baseline_rwa
        );

        Ok(Self {
            obligors,
            facilities,
            owners,
            total_ead,
            baseline_rwa,
        })
    }

    pub fn obligors(&self) -> &[Obligor] {
        &self.obligors
    }

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn total_ead(&self) -> f64 {
        self.total_ead
    }

    /// Aggregate RWA with every facility at its own (unstressed) PD.
    pub fn baseline_rwa(&self) -> f64 {
        self.baseline_rwa
    }

    /// Obligor PDs in table order.
    pub fn obligor_pds(&self) -> Vec<f64> {
        self.obligors.iter().map(|o| o.pd).collect()
    }

    /// Exposure-weighted mean of `pds`, one PD per obligor in table order.
    pub fn weighted_pd(&self, pds: &[f64]) -> f64 {
        debug_assert_eq!(pds.len(), self.obligors.len());
        let weighted: f64 = self
            .obligors
            .iter()
            .zip(pds)
            .map(|(o, pd)| o.ead * pd)
            .sum();
        weighted / self.total_ead
    }

    /// Aggregate RWA after replacing each obligor's PD with `pds[i]` on
    /// all of its facilities.
    pub fn rwa_with(&self, pds: &[f64]) -> StressResult<f64> {
        debug_assert_eq!(pds.len(), self.obligors.len());
        self.facilities
            .iter()
            .zip(&self.owners)
            .map(|(facility, &owner)| evaluate_facility(facility, pds[owner]))
            .sum()
    }
}

/// Plain arithmetic mean.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn evaluate_facility(facility: &Facility, pd: f64) -> StressResult<f64> {
    capital::evaluate(pd, facility.lgd, facility.ead, facility.maturity)
        .map(|charge| charge.rwa)
        .map_err(|e| match e {
            StressError::InvalidInput { reason, .. } => {
                StressError::invalid(facility.cis_code.clone(), reason)
            }
            other => other,
        })
}

fn validate_obligor(obligor: &Obligor) -> StressResult<()> {
    let record = obligor.cis_code.clone();
    if !(obligor.pd > 0.0 && obligor.pd < 1.0) {
        return Err(StressError::invalid(
            record,
            format!("pd {} must lie strictly inside (0, 1)", obligor.pd),
        ));
    }
    if !obligor.ead.is_finite() || obligor.ead < 0.0 {
        return Err(StressError::invalid(
            record,
            format!("ead {} must be finite and non-negative", obligor.ead),
        ));
    }
    if let Some(grade) = obligor.mgs {
        if !(MIN_GRADE..=MAX_GRADE).contains(&grade) {
            return Err(StressError::invalid(
                record,
                format!("grade {grade} outside [{MIN_GRADE}, {MAX_GRADE}]"),
            ));
        }
    }
    Ok(())
}
