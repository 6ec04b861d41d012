//! Run-wide RNG seeding with ChaCha8.
//!
//! A search run owns exactly one ChaCha8Rng seeded from the configured
//! seed. Every operator draws from it in turn, so the same seed replays
//! the same run.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Create the deterministic RNG for a run.
pub fn run_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}
