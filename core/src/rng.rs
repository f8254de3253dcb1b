//! Deterministic random number generation.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through SubsystemRng instances derived
//! from the master seed stored on the snapshot.
//!
//! Each draw gets its own stream, seeded from
//! (master_seed, slot index, draw sequence). This means:
//!   - The n-th generated mission rolls the same dice whether it was
//!     produced by a live tick or by offline catch-up.
//!   - Streams survive a save/load cycle because the sequence is persisted.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use uuid::Uuid;

/// A named, deterministic RNG for a single draw.
pub struct SubsystemRng {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SubsystemRng {
    /// Create an RNG from the master seed and a stable slot index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, slot_index: u64) -> Self {
        let derived_seed = master_seed ^ (slot_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll a float uniformly in [lo, hi).
    pub fn range_f64(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    /// Roll a signed integer uniformly in [-spread, +spread].
    pub fn signed_jitter(&mut self, spread: u32) -> i32 {
        let span = 2 * u64::from(spread) + 1;
        self.next_u64_below(span) as i32 - spread as i32
    }

    /// A random (version 4 layout) UUID drawn from this stream.
    pub fn next_uuid(&mut self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.inner.fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// Hands out RNG streams for one snapshot, keyed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_subsystem(&self, slot: SubsystemSlot) -> SubsystemRng {
        SubsystemRng::new(self.master_seed, slot as u64).with_name(slot.name())
    }

    /// The stream for the `sequence`-th draw in `slot`.
    pub fn for_draw(&self, slot: SubsystemSlot, sequence: u64) -> SubsystemRng {
        let seed = self.master_seed ^ sequence.wrapping_mul(0xbf58_476d_1ce4_e5b9);
        SubsystemRng::new(seed, slot as u64).with_name(slot.name())
    }
}

/// Stable slot assignments.
/// NEVER reorder or remove entries, only append.
/// Reordering changes every slot's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum SubsystemSlot {
    Bootstrap = 0,
    Generation = 1,
}

impl SubsystemSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::Generation => "generation",
        }
    }
}
