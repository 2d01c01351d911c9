//! PRNG plumbing threaded explicitly through every sampling call.
//!
//! Design Note (spec.md §9): the generator is a parameter of the Tester, not
//! a process-wide global, so that independent workers can each own their
//! own stream (spec.md §5). Concrete scenarios in spec.md §8 are specified
//! against "the standard Mersenne Twister," so that is what backs this type.

use rand::Rng;
use rand_distr::{Binomial, Distribution};
use rand_mt::Mt19937GenRand64;

/// Wraps a seeded Mersenne Twister generator used everywhere a draw is
/// needed: exponential inter-arrival sampling, weighted fault-kind/domain
/// selection, binomial retirement counts, and the XED catch-word collision
/// check.
pub struct SimRng {
    inner: Mt19937GenRand64,
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng {
            inner: Mt19937GenRand64::new(seed),
        }
    }

    /// Uniform draw over `[0, 1)`. Never returns exactly `1.0`.
    pub fn uniform_open01(&mut self) -> f64 {
        // gen::<f64>() on the 0.8 rand family already samples the half-open
        // [0, 1) interval; see spec.md's "use 1-U not U" note for why the
        // *caller* (the exponential sampler) still needs to be careful.
        self.inner.gen::<f64>()
    }

    /// Uniform draw over `[0, n)` as an index, for unweighted picks.
    pub fn gen_range(&mut self, n: usize) -> usize {
        self.inner.gen_range(0..n)
    }

    pub fn gen_bool(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p.clamp(0.0, 1.0))
    }

    pub fn gen_u64(&mut self) -> u64 {
        self.inner.gen::<u64>()
    }

    /// Binomial draw with parameters `(n, p)`, used for initial retired
    /// block counts (spec.md §4.5).
    pub fn binomial(&mut self, n: u64, p: f64) -> u64 {
        let p = p.clamp(0.0, 1.0);
        let dist = Binomial::new(n, p).expect("binomial parameters out of range");
        dist.sample(&mut self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_stays_in_half_open_interval() {
        let mut rng = SimRng::new(42);
        for _ in 0..10_000 {
            let u = rng.uniform_open01();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn binomial_never_exceeds_n() {
        let mut rng = SimRng::new(7);
        for _ in 0..1000 {
            let draw = rng.binomial(100, 0.3);
            assert!(draw <= 100);
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let mut a = SimRng::new(123);
        let mut b = SimRng::new(123);
        for _ in 0..50 {
            assert_eq!(a.gen_u64(), b.gen_u64());
        }
    }
}
