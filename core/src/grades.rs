//! MGS grade reference table: grade → bucket and grade → PD.
//!
//! Owned by the reference data, read-only to every simulator.

use crate::{
    error::{StressError, StressResult},
    types::{BucketLabel, Grade, MAX_GRADE, MIN_GRADE},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradeRow {
    pub mgs: Grade,
    pub pd_low: f64,
    pub pd_mid: f64,
    pub pd_high: f64,
    pub bucket: BucketLabel,
}

/// Which PD column of the grade table a shocked grade resolves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PdPoint {
    Low,
    #[default]
    Mid,
    High,
}

#[derive(Debug, Clone)]
pub struct GradeScale {
    rows: BTreeMap<Grade, GradeRow>,
}

impl GradeScale {
    pub fn new(rows: Vec<GradeRow>) -> StressResult<Self> {
        let mut by_grade = BTreeMap::new();
        for row in rows {
            let record = format!("mgs {}", row.mgs);
            if !(MIN_GRADE..=MAX_GRADE).contains(&row.mgs) {
                return Err(StressError::invalid(
                    record,
                    format!("grade outside [{MIN_GRADE}, {MAX_GRADE}]"),
                ));
            }
            for (column, pd) in [("pd_low", row.pd_low), ("pd_mid", row.pd_mid), ("pd_high", row.pd_high)] {
                if !(pd > 0.0 && pd < 1.0) {
                    return Err(StressError::invalid(
                        record,
                        format!("{column} {pd} must lie strictly inside (0, 1)"),
                    ));
                }
            }
            if by_grade.contains_key(&row.mgs) {
                return Err(StressError::invalid(record, "duplicate grade"));
            }
            by_grade.insert(row.mgs, row);
        }
        Ok(Self { rows: by_grade })
    }

    pub fn row(&self, grade: Grade) -> StressResult<&GradeRow> {
        self.rows
            .get(&grade)
            .ok_or(StressError::MissingGradeMapping { grade })
    }

    pub fn bucket_for(&self, grade: Grade) -> StressResult<&BucketLabel> {
        Ok(&self.row(grade)?.bucket)
    }

    pub fn pd_for(&self, grade: Grade, point: PdPoint) -> StressResult<f64> {
        let row = self.row(grade)?;
        Ok(match point {
            PdPoint::Low => row.pd_low,
            PdPoint::Mid => row.pd_mid,
            PdPoint::High => row.pd_high,
        })
    }

    /// Every grade a shock can land on must resolve.
    pub fn ensure_complete(&self) -> StressResult<()> {
        match (MIN_GRADE..=MAX_GRADE).find(|g| !self.rows.contains_key(g)) {
            Some(grade) => Err(StressError::MissingGradeMapping { grade }),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
