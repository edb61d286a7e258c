//! Reference data and simulation parameters.
//!
//! Both are loaded once, before the trial loop, and passed to simulators
//! as immutable values. Nothing here is global.
//!
//! Data directory layout:
//!   simulation.json
//!   grades/mgs_mapping.json
//!   scenarios/swaps_matrix.json
//!   portfolio/obligors.json
//!   portfolio/facilities.json

use crate::{
    error::StressResult,
    grades::{GradeRow, GradeScale, PdPoint},
    matrix::{MigrationEntry, MigrationMatrix},
    portfolio::{Facility, Obligor, Portfolio},
    types::BucketLabel,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;

/// Distribution of the per-obligor grade shock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "approach", rename_all = "snake_case")]
pub enum ShockDistribution {
    /// Discrete uniform on [-3, 3].
    #[serde(alias = "linear")]
    Uniform,
    /// Normal draw rounded half-to-even, then clamped to [-3, 3].
    Normal { mean: f64, std_dev: f64 },
}

impl ShockDistribution {
    /// Short tag used in run headers and file names.
    pub fn label(&self) -> String {
        match self {
            Self::Uniform => "uniform".to_string(),
            Self::Normal { mean, std_dev } => format!("normal_{mean}_{std_dev}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub trial_count: u64,
    pub shock: ShockDistribution,
    #[serde(default)]
    pub pd_point: PdPoint,
    #[serde(default)]
    pub execution: ExecutionMode,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            trial_count: 1_000,
            shock: ShockDistribution::Normal {
                mean: 0.0,
                std_dev: 1.5,
            },
            pd_point: PdPoint::Mid,
            execution: ExecutionMode::Sequential,
        }
    }
}

impl SimulationParams {
    /// Load `simulation.json` from the data directory.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let params: Self = read_json(&format!("{data_dir}/simulation.json"))?;
        anyhow::ensure!(params.trial_count > 0, "trial_count must be positive");
        Ok(params)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GradeMappingFile {
    grades: Vec<GradeRow>,
}

/// Either the pair list or the square bucket matrix it is derived from.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum SwapsMatrixFile {
    Pairs {
        swaps: Vec<MigrationEntry>,
    },
    Square {
        buckets: Vec<BucketLabel>,
        percent: Vec<Vec<f64>>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct ObligorFile {
    obligors: Vec<Obligor>,
}

#[derive(Debug, Clone, Deserialize)]
struct FacilityFile {
    facilities: Vec<Facility>,
}

/// Everything a simulator reads, validated.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub grades: GradeScale,
    pub matrix: MigrationMatrix,
    pub portfolio: Portfolio,
}

impl ReferenceData {
    /// Load from the data/ directory.
    /// In tests, build the parts directly.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let grade_file: GradeMappingFile = read_json(&format!("{data_dir}/grades/mgs_mapping.json"))?;
        let grades = GradeScale::new(grade_file.grades)?;

        let matrix_file: SwapsMatrixFile = read_json(&format!("{data_dir}/scenarios/swaps_matrix.json"))?;
        let matrix = match matrix_file {
            SwapsMatrixFile::Pairs { swaps } => MigrationMatrix::new(swaps)?,
            SwapsMatrixFile::Square { buckets, percent } => {
                MigrationMatrix::from_square(&buckets, &percent)?
            }
        };

        let obligor_file: ObligorFile = read_json(&format!("{data_dir}/portfolio/obligors.json"))?;
        let facility_file: FacilityFile = read_json(&format!("{data_dir}/portfolio/facilities.json"))?;

        Ok(Self::from_parts(
            grades,
            matrix,
            obligor_file.obligors,
            facility_file.facilities,
        )?)
    }

    pub fn from_parts(
        grades: GradeScale,
        matrix: MigrationMatrix,
        obligors: Vec<Obligor>,
        facilities: Vec<Facility>,
    ) -> StressResult<Self> {
        let portfolio = Portfolio::new(obligors, facilities, &grades)?;
        Ok(Self {
            grades,
            matrix,
            portfolio,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(Path::new(path))
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    serde_json::from_str(&content).map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))
}
