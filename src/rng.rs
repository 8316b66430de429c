//! Seeded pseudo-randomness.
//!
//! Every "random" value in the engine is a deterministic function of an
//! input string: the string is hashed with SHA3-256, the first eight bytes
//! seed a Xoshiro256** generator, and draws come from that generator.
//! Identical strings therefore yield identical draws on every machine and
//! in every process, which is what lets the world be recomputed instead of
//! stored.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use sha3::{Digest, Sha3_256};

/// Deterministic u64 seed derived from an arbitrary string.
pub fn string_to_seed(input: &str) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Deterministic uniform draw in `[0, 1)` from a string seed.
pub fn seeded_unit(input: &str) -> f64 {
    let mut rng = Xoshiro256StarStar::seed_from_u64(string_to_seed(input));
    // 53 mantissa bits, standard uniform-double construction
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}
