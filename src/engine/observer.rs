// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Minimum tracking shared by parallel candidate evaluations.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Relative difference below which two merits are the same.
///
/// Different evaluation paths (FFT correlation, direct sums, symmetric
/// folding) round differently, so equal merits rarely compare equal.
pub const TIE_TOLERANCE: f64 = 1e-10;

/// Best candidate seen so far.
#[derive(Debug, Clone, PartialEq)]
pub struct Best<T> {
    pub merit: f64,
    pub index: usize,
    pub payload: T,
}

/// Keeps the candidate of least merit, ties going to the lowest index.
///
/// Merits within [`TIE_TOLERANCE`] of the minimum tie. Every such
/// contender is kept until a lower minimum evicts it, so the winner does
/// not depend on the order of observations.
///
/// The minimum is mirrored in an atomic so that early abortion checks can
/// read it without taking the lock. It only ever decreases.
#[derive(Debug)]
pub struct MinObserver<T> {
    min: AtomicU64,
    contenders: Mutex<Vec<Best<T>>>,
}

impl<T> Default for MinObserver<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Largest merit tying with `min`.
fn tie_limit(min: f64) -> f64 {
    min + TIE_TOLERANCE * min.abs()
}

impl<T> MinObserver<T> {
    pub fn new() -> Self {
        Self {
            min: AtomicU64::new(f64::INFINITY.to_bits()),
            contenders: Mutex::new(Vec::new()),
        }
    }

    /// Least merit so far, `+inf` before any observation.
    pub fn bound(&self) -> f64 {
        f64::from_bits(self.min.load(Ordering::Acquire))
    }

    /// Largest merit that can still win or tie; anything above it is
    /// safe to drop.
    pub fn threshold(&self) -> f64 {
        tie_limit(self.bound())
    }

    /// Offer a candidate. Returns whether it ties with or beats the best.
    ///
    /// Non-finite merits are never accepted.
    pub fn observe(&self, merit: f64, index: usize, payload: T) -> bool {
        if !merit.is_finite() {
            return false;
        }
        let mut contenders = self
            .contenders
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let min = self.bound();
        if merit > tie_limit(min) {
            return false;
        }
        if merit < min {
            self.min.store(merit.to_bits(), Ordering::Release);
            let limit = tie_limit(merit);
            contenders.retain(|c| c.merit <= limit);
        }
        contenders.push(Best {
            merit,
            index,
            payload,
        });
        true
    }

    /// The lowest-index candidate among those tying with the minimum.
    pub fn into_best(self) -> Option<Best<T>> {
        self.contenders
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .min_by_key(|c| c.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_keeps_minimum_and_first_index_on_ties() {
        let observer = MinObserver::new();
        assert_eq!(observer.bound(), f64::INFINITY);
        assert!(observer.observe(2.0, 5, "a"));
        assert!(observer.observe(1.0, 7, "b"));
        assert!(observer.observe(1.0, 9, "c"));
        assert!(observer.observe(1.0, 3, "d"));
        assert!(!observer.observe(f64::NAN, 0, "e"));
        assert!(!observer.observe(f64::INFINITY, 0, "f"));
        assert!(!observer.observe(1.5, 0, "g"));
        assert_eq!(observer.bound(), 1.0);
        let best = observer.into_best().unwrap();
        assert_eq!((best.merit, best.index, best.payload), (1.0, 3, "d"));
    }

    #[test]
    fn test_rounding_differences_tie() {
        let observer = MinObserver::new();
        let merit = 0.123456789;
        observer.observe(merit * (1.0 + 1e-14), 2, ());
        observer.observe(merit, 8, ());
        assert!(observer.threshold() > merit);
        assert_eq!(observer.into_best().unwrap().index, 2);

        let observer = MinObserver::new();
        observer.observe(merit * (1.0 + 1e-6), 2, ());
        observer.observe(merit, 8, ());
        assert_eq!(observer.into_best().unwrap().index, 8);
    }

    #[test]
    fn test_lower_minimum_evicts_contenders() {
        let observer = MinObserver::new();
        observer.observe(1.0, 0, ());
        observer.observe(1.0, 1, ());
        observer.observe(0.5, 6, ());
        let best = observer.into_best().unwrap();
        assert_eq!((best.merit, best.index), (0.5, 6));
    }

    #[test]
    fn test_parallel_observations_are_order_independent() {
        let merits: Vec<f64> = (0..1000)
            .map(|i| ((i * 7919) % 97) as f64 * (1.0 + 1e-13 * (i % 3) as f64))
            .collect();
        let observer = MinObserver::new();
        merits.par_iter().enumerate().for_each(|(i, &m)| {
            observer.observe(m, i, ());
        });
        let best = observer.into_best().unwrap();
        assert_eq!(best.merit, 0.0);
        assert_eq!(best.index, 0);

        let shifted: Vec<f64> = merits.iter().map(|m| m + 1.0).collect();
        let observer = MinObserver::new();
        shifted.par_iter().enumerate().rev().for_each(|(i, &m)| {
            observer.observe(m, i, ());
        });
        assert_eq!(observer.into_best().unwrap().index, 0);
    }
}
