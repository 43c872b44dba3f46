//! Deterministic random source backing every generation step.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Deterministic wrapper around a seedable pseudo-random generator.
///
/// `Random` is the only source of entropy used by arbitraries. Two instances
/// built from the same seed produce the same numbers when asked the same
/// sequence of questions.
///
/// Cloning yields an identical copy: both copies will produce the same
/// sequence. Use [`Random::split`] when an independent stream is needed.
#[derive(Debug, Clone)]
pub struct Random {
    internal: StdRng,
}

impl Random {
    /// Create a random source from a seed
    pub fn new(seed: u64) -> Self {
        Self {
            internal: StdRng::seed_from_u64(seed),
        }
    }

    /// Derive a child stream from this one.
    ///
    /// The parent advances by exactly one seed draw, so splitting is itself
    /// deterministic. The child is seeded with a full-width seed taken from
    /// the parent and does not share state with it afterwards.
    pub fn split(&mut self) -> Random {
        let mut seed = <StdRng as SeedableRng>::Seed::default();
        self.internal.fill_bytes(&mut seed);
        Random {
            internal: StdRng::from_seed(seed),
        }
    }

    /// Uniform integer in `[min, max]`, both ends included.
    ///
    /// Panics if `min > max`.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        assert!(min <= max, "next_int called with min > max ({min} > {max})");
        self.internal.gen_range(min..=max)
    }

    /// Uniform integer in `[min, max]` for ranges wider than 64 bits.
    pub fn next_big_int(&mut self, min: i128, max: i128) -> i128 {
        assert!(
            min <= max,
            "next_big_int called with min > max ({min} > {max})"
        );
        self.internal.gen_range(min..=max)
    }

    /// Uniform double in `[0, 1)`
    pub fn next_double(&mut self) -> f64 {
        self.internal.r#gen::<f64>()
    }

    /// Raw 32 bits of output
    pub fn next_u32(&mut self) -> u32 {
        self.internal.next_u32()
    }

    /// Fair coin flip
    pub fn next_bool(&mut self) -> bool {
        self.internal.r#gen()
    }
}

/// Draw a fresh seed from OS entropy, used when no seed was configured.
pub fn fresh_seed() -> u64 {
    StdRng::from_entropy().next_u64()
}
