//! Shared primitive types used across the entire stress engine.

/// A trial seed. Trial `i` is always run with seed `i`.
pub type Seed = u64;

/// Unique obligor identifier (`cis_code` in the source tables).
pub type CisCode = String;

/// Ordinal internal credit grade (MGS), 1 best to 26 worst.
pub type Grade = i32;

/// Coarse grade grouping used by the migration matrix.
pub type BucketLabel = String;

/// The canonical run identifier.
pub type RunId = String;

/// Best grade on the MGS scale.
pub const MIN_GRADE: Grade = 1;

/// Worst performing (non-defaulted) grade on the MGS scale.
pub const MAX_GRADE: Grade = 26;
