//! Deterministic random number generation for workload scenarios.
//!
//! RULE: The ledger itself never draws randomness. Only the scenario
//! generator does, and only through ScenarioRng streams derived from one
//! master seed, so a seed fully determines a workload.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct ScenarioRng {
    inner: Pcg64Mcg,
}

impl ScenarioRng {
    /// Create a stream from the master seed and a stable stream index.
    /// The index must never change once assigned.
    pub fn new(master_seed: u64, stream: u64) -> Self {
        let derived_seed = master_seed ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n). Returns 0 when n is 0.
    pub fn below(&mut self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        self.inner.next_u64() % n
    }

    /// Roll a u64 in [lo, hi]. `hi` below `lo` yields `lo`.
    pub fn between(&mut self, lo: u64, hi: u64) -> u64 {
        lo + self.below(hi.saturating_sub(lo).saturating_add(1))
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.below(items.len() as u64) as usize)
    }
}

/// Stable stream assignments.
/// NEVER reorder or remove entries. Only append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum ScenarioStream {
    Workload = 0,
    Heights  = 1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = ScenarioRng::new(12345, ScenarioStream::Workload as u64);
        let mut b = ScenarioRng::new(12345, ScenarioStream::Workload as u64);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn streams_are_independent() {
        let mut a = ScenarioRng::new(12345, ScenarioStream::Workload as u64);
        let mut b = ScenarioRng::new(12345, ScenarioStream::Heights as u64);
        let draws_a: Vec<u64> = (0..8).map(|_| a.next_u64()).collect();
        let draws_b: Vec<u64> = (0..8).map(|_| b.next_u64()).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn ranges_stay_in_bounds() {
        let mut rng = ScenarioRng::new(7, 0);
        for _ in 0..1_000 {
            let v = rng.between(3, 6);
            assert!((3..=6).contains(&v));
            assert!(rng.next_f64() < 1.0);
        }
        assert_eq!(rng.below(0), 0);
        assert_eq!(rng.between(5, 2), 5);
        assert!(rng.pick::<u8>(&[]).is_none());
    }
}
