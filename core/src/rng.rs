//! Deterministic random number generation.
//!
//! RULE: Nothing in a trial may call any platform RNG.
//! All randomness flows through TrialRng instances derived
//! from the trial seed (the trial index).
//!
//! Each simulator gets its own stream, seeded deterministically
//! from (trial_seed XOR stream_index). This means:
//!   - Trials never share generator state, so they can run in any order.
//!   - A trial is fully reproducible in isolation from its seed alone.

use crate::types::Seed;
use rand::{seq::index, Rng, RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG scoped to a single trial.
pub struct TrialRng {
    pub name: &'static str,
    pub seed: Seed,
    inner: Pcg64Mcg,
}

impl TrialRng {
    /// Create a trial RNG from the trial seed and a stable stream index.
    /// The index must never change once assigned.
    pub fn new(seed: Seed, stream_index: u64) -> Self {
        let derived_seed = seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            seed,
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn for_stream(seed: Seed, slot: StreamSlot) -> Self {
        Self::new(seed, slot as u64).with_name(slot.name())
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Uniform integer in [low, high], both ends inclusive.
    pub fn int_inclusive(&mut self, low: i32, high: i32) -> i32 {
        self.inner.gen_range(low..=high)
    }

    /// Draw `amount` distinct positions out of `0..len`, in draw order.
    /// Panics if `amount > len`; callers check pool sizes first.
    pub fn sample_indices(&mut self, len: usize, amount: usize) -> Vec<usize> {
        index::sample(&mut self.inner, len, amount).into_vec()
    }
}

impl RngCore for TrialRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries. Append only.
/// Reordering changes every simulator's draws for a given seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    BucketSwap = 0,
    MgsShock = 1,
    // Add new simulators here, append only.
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BucketSwap => "bucket_swap",
            Self::MgsShock => "mgs_shock",
        }
    }
}
