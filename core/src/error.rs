use thiserror::Error;

#[derive(Error, Debug)]
pub enum StressError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input for record '{record}': {reason}")]
    InvalidInput { record: String, reason: String },

    #[error("No grade mapping for MGS grade {grade}")]
    MissingGradeMapping { grade: i32 },

    #[error("Insufficient population in bucket '{bucket}': {required} swaps required, {available} unassigned obligors available")]
    InsufficientPopulation {
        bucket: String,
        required: usize,
        available: usize,
    },

    #[error("Reconciliation mismatch: mean PD {before} before swaps, {after} after")]
    ReconciliationMismatch { before: f64, after: f64 },

    #[error("Capital formula produced a non-finite {stage} for pd={pd}")]
    NonFinite { stage: &'static str, pd: f64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StressError {
    pub fn invalid(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            record: record.into(),
            reason: reason.into(),
        }
    }

    /// True when the failure comes from the reference data or the
    /// simulation parameters rather than from storage or I/O.
    pub fn is_configuration(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Other(_)
        )
    }
}

pub type StressResult<T> = Result<T, StressError>;
