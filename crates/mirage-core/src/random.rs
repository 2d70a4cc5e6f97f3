//! Injectable randomness for glitch triggers and geometric noise.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A source of uniform samples in `[0, 1)`.
pub trait RandomSource {
    fn unit(&mut self) -> f32;

    /// Uniform sample in `[-half_width, half_width)`.
    fn centered(&mut self, half_width: f32) -> f32 {
        (self.unit() - 0.5) * 2.0 * half_width
    }

    /// Uniform integer in `[lo, hi]`.
    fn int_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        let span = (hi - lo + 1) as f32;
        lo + ((self.unit() * span) as u32).min(hi - lo)
    }
}

/// Seedable pseudo-random source backed by `StdRng`.
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }
}

impl RandomSource for SeededRandom {
    fn unit(&mut self) -> f32 {
        self.0.gen::<f32>()
    }
}

/// Replays a fixed script of samples, then a fallback value forever.
///
/// Lets tests force specific branches, e.g. `0.004` to arm the chance glitch.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    script: VecDeque<f32>,
    fallback: f32,
}

impl ScriptedRandom {
    pub fn new(script: impl IntoIterator<Item = f32>, fallback: f32) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback,
        }
    }

    /// Always yields `value`.
    pub fn constant(value: f32) -> Self {
        Self::new([], value)
    }
}

impl RandomSource for ScriptedRandom {
    fn unit(&mut self) -> f32 {
        self.script.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_inclusive_bounds() {
        assert_eq!(ScriptedRandom::constant(0.0).int_inclusive(3, 7), 3);
        assert_eq!(ScriptedRandom::constant(0.999).int_inclusive(3, 7), 7);
        assert_eq!(ScriptedRandom::constant(0.5).int_inclusive(3, 7), 5);
    }

    #[test]
    fn test_centered_range() {
        assert_eq!(ScriptedRandom::constant(0.5).centered(20.0), 0.0);
        assert_eq!(ScriptedRandom::constant(0.0).centered(20.0), -20.0);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let mut a = SeededRandom::from_seed(7);
        let mut b = SeededRandom::from_seed(7);
        for _ in 0..16 {
            let x = a.unit();
            assert_eq!(x, b.unit());
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_scripted_falls_back() {
        let mut r = ScriptedRandom::new([0.1, 0.2], 0.9);
        assert_eq!(r.unit(), 0.1);
        assert_eq!(r.unit(), 0.2);
        assert_eq!(r.unit(), 0.9);
    }
}
