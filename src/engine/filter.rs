// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Per-level merit filters, applied before the level combiner.
//!
//! A filter list maps the level merits of a point set of `s` coordinates
//! to filtered level merits, in list order:
//!
//! - [`MeritFilter::Normalize`] divides each level merit by a bound on the
//!   best merit reachable with that many points and coordinates, so that
//!   levels of different sizes compare on one scale.
//! - [`MeritFilter::LowPass`] rejects point sets with a level merit above a
//!   threshold by mapping it to `+inf`.
//!
//! Both are non-decreasing in every level merit, so pruning a candidate
//! on its filtered partial merit stays exact.
//!
//! # P-alpha SL10 bound
//!
//! For a lattice of `n` points with `φ(n)` admissible generators, the CBC
//! construction reaches a squared error of at most
//!
//! ```text
//! B(λ) = ( S(λ) / φ(n) )^(1/λ),   S(λ) = Σ_u γ_u^λ (2 ζ(αλ))^|u|
//! ```
//!
//! for every `λ` in `(1/α, 1]`. The normalizer uses the least `B(λ)`
//! found by golden-section search. `S` is summed in closed form per
//! weight model.

use crate::algebra::MAX_COORDINATES;
use crate::errors::SearchError;
use crate::kernel::KernelType;
use crate::storage::Storage;
use crate::weights::Weights;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Bound used to normalize level merits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Norm {
    /// Sinescu and L'Ecuyer (2010) bound for P-alpha kernels.
    PAlphaSl10,
}

/// One stage of the filter list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeritFilter {
    Normalize(Norm),
    /// Level merits above `threshold` become `+inf`.
    LowPass { threshold: f64 },
}

/// Smallest admissible `λ` is `1/α` plus this margin.
const LAMBDA_MARGIN: f64 = 1e-6;

const GOLDEN_ITERATIONS: usize = 60;

/// Filter list bound to one search: the weights, the kernel smoothness and
/// the number of admissible generators of each level.
#[derive(Debug)]
pub struct MeritFilters {
    filters: Vec<MeritFilter>,
    weights: Arc<Weights>,
    alpha: u32,
    units: Vec<f64>,
    /// `bounds[s]`: normalization bound of each level for `s` coordinates.
    bounds: Vec<OnceLock<Vec<f64>>>,
}

impl MeritFilters {
    /// Check `filters` against the search and bind them to it.
    pub fn new(
        filters: Vec<MeritFilter>,
        kernel: KernelType,
        weights: Arc<Weights>,
        storage: &Storage,
    ) -> Result<Self, SearchError> {
        let mut alpha = 0;
        for filter in &filters {
            match filter {
                MeritFilter::Normalize(Norm::PAlphaSl10) => {
                    alpha = match kernel {
                        KernelType::PAlpha { alpha } | KernelType::PAlphaPlr { alpha } => alpha,
                        KernelType::IaAlpha { .. } => {
                            return Err(SearchError::configuration(
                                "the P-alpha SL10 bound needs a P-alpha kernel",
                            ))
                        }
                    };
                    if storage.modulus().is_none() {
                        return Err(SearchError::configuration(
                            "the P-alpha SL10 bound only applies to lattices",
                        ));
                    }
                }
                MeritFilter::LowPass { threshold } => {
                    if threshold.is_nan() || *threshold < 0.0 {
                        return Err(SearchError::configuration(format!(
                            "low-pass threshold must be non-negative, got {}",
                            threshold
                        )));
                    }
                }
            }
        }
        let size = storage.size_param();
        let units = if storage.num_levels() == 1 {
            vec![size.modulus().map_or(1, |m| m.unit_count().max(1)) as f64]
        } else {
            (0..storage.num_levels() as u32)
                .map(|l| size.level_modulus(l).map_or(1, |m| m.unit_count().max(1)) as f64)
                .collect()
        };
        Ok(Self {
            filters,
            weights,
            alpha,
            units,
            bounds: (0..=MAX_COORDINATES).map(|_| OnceLock::new()).collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Normalization bound of every level for `dimension` coordinates.
    pub fn bounds(&self, dimension: usize) -> Vec<f64> {
        match self.bounds.get(dimension) {
            Some(cell) => cell.get_or_init(|| self.compute_bounds(dimension)).clone(),
            None => self.compute_bounds(dimension),
        }
    }

    fn compute_bounds(&self, dimension: usize) -> Vec<f64> {
        let bounds: Vec<f64> = self
            .units
            .iter()
            .map(|&units| sl10_bound(&self.weights, self.alpha, units, dimension))
            .collect();
        debug!(dimension, bounds = ?bounds, "normalization bounds");
        bounds
    }

    /// Filter the level merits of a point set of `dimension` coordinates.
    pub fn apply(&self, dimension: usize, merits: &mut [f64]) {
        for filter in &self.filters {
            match filter {
                MeritFilter::Normalize(Norm::PAlphaSl10) => {
                    let bounds = self.bounds(dimension);
                    for (merit, bound) in merits.iter_mut().zip(bounds) {
                        if bound > 0.0 {
                            *merit /= bound;
                        }
                    }
                }
                MeritFilter::LowPass { threshold } => {
                    for merit in merits.iter_mut().filter(|m| **m > *threshold) {
                        *merit = f64::INFINITY;
                    }
                }
            }
        }
    }
}

/// Least SL10 bound over `λ` for `units` admissible generators.
pub fn sl10_bound(weights: &Weights, alpha: u32, units: f64, dimension: usize) -> f64 {
    let alpha = f64::from(alpha);
    let value = |lambda: f64| {
        let z = 2.0 * zeta(alpha * lambda);
        (sl10_sum(weights, z, lambda, dimension) / units).powf(1.0 / lambda)
    };
    golden_section_min(value, 1.0 / alpha + LAMBDA_MARGIN, 1.0)
}

/// `Σ_{∅≠u⊆{0..dimension-1}} γ_u^λ z^|u|`.
pub fn sl10_sum(weights: &Weights, z: f64, lambda: f64, dimension: usize) -> f64 {
    let power = |w: f64| w.powf(lambda);
    match weights {
        Weights::ProjectionDependent { weights } => weights
            .iter()
            .filter(|(u, _)| u.max_coordinate().is_some_and(|m| m < dimension))
            .map(|(u, &w)| z.powi(u.len() as i32) * power(w))
            .sum(),
        Weights::OrderDependent(order) => {
            let mut binomial = 1.0;
            let mut sum = 0.0;
            for k in 1..=dimension {
                binomial *= (dimension - k + 1) as f64 * z / k as f64;
                sum += binomial * power(order.get(k));
            }
            sum
        }
        Weights::Product(product) => {
            (0..dimension)
                .map(|j| 1.0 + z * power(product.get(j)))
                .product::<f64>()
                - 1.0
        }
        Weights::Pod { order, product } => {
            // elementary symmetric sums of z γ_j^λ
            let mut states = vec![0.0; dimension + 1];
            states[0] = 1.0;
            for j in 0..dimension {
                let w = z * power(product.get(j));
                for k in (1..=j + 1).rev() {
                    states[k] += w * states[k - 1];
                }
            }
            (1..=dimension)
                .map(|k| power(order.get(k)) * states[k])
                .sum()
        }
        Weights::Combined { members } => members
            .iter()
            .map(|w| sl10_sum(w, z, lambda, dimension))
            .sum(),
    }
}

/// Riemann zeta function for `s > 1`, by Euler-Maclaurin summation.
pub fn zeta(s: f64) -> f64 {
    const TERMS: u32 = 10;
    // B_2, B_4, ..., B_12
    const BERNOULLI: [f64; 6] = [
        1.0 / 6.0,
        -1.0 / 30.0,
        1.0 / 42.0,
        -1.0 / 30.0,
        5.0 / 66.0,
        -691.0 / 2730.0,
    ];
    let n = f64::from(TERMS);
    let mut sum: f64 = (1..TERMS).map(|k| f64::from(k).powf(-s)).sum();
    sum += n.powf(1.0 - s) / (s - 1.0) + 0.5 * n.powf(-s);
    let mut rising = s;
    let mut factorial = 2.0;
    let mut power = n.powf(-s - 1.0);
    for (j, b) in BERNOULLI.iter().enumerate() {
        sum += b / factorial * rising * power;
        let k = 2.0 * (j + 1) as f64;
        rising *= (s + k - 1.0) * (s + k);
        factorial *= (k + 1.0) * (k + 2.0);
        power /= n * n;
    }
    sum
}

/// Least value of `f` seen while narrowing `[lo, hi]` by golden sections.
fn golden_section_min<F: Fn(f64) -> f64>(f: F, mut lo: f64, mut hi: f64) -> f64 {
    let ratio = (5f64.sqrt() - 1.0) / 2.0;
    let mut c = hi - ratio * (hi - lo);
    let mut d = lo + ratio * (hi - lo);
    let (mut fc, mut fd) = (f(c), f(d));
    let mut best = f(hi).min(fc).min(fd);
    for _ in 0..GOLDEN_ITERATIONS {
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - ratio * (hi - lo);
            fc = f(c);
            best = best.min(fc);
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + ratio * (hi - lo);
            fd = f(d);
            best = best.min(fd);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::CoordinateSet;
    use crate::pointset::{Embedding, LevelOrder, PointSetConfiguration, SizeParam};
    use crate::weights::{OrderWeights, ProductWeights};
    use std::f64::consts::PI;

    fn assert_close(a: f64, b: f64, tolerance: f64) {
        assert!((a - b).abs() <= tolerance * b.abs().max(1.0), "{} != {}", a, b);
    }

    fn storage(config: PointSetConfiguration, size: SizeParam) -> Storage {
        Storage::new(config, size).unwrap()
    }

    #[test]
    fn test_zeta() {
        assert_close(zeta(2.0), PI * PI / 6.0, 1e-13);
        assert_close(zeta(4.0), PI.powi(4) / 90.0, 1e-13);
        assert_close(zeta(1.5), 2.612_375_348_685_488, 1e-12);
        assert!(zeta(1.0 + 1e-6) > 1e5);
    }

    #[test]
    fn test_golden_section() {
        let min = golden_section_min(|x| (x - 0.3) * (x - 0.3) + 2.0, 0.0, 1.0);
        assert_close(min, 2.0, 1e-12);
        // minimum at the right end
        assert_close(golden_section_min(|x| -x, 0.0, 1.0), -1.0, 1e-12);
    }

    #[test]
    fn test_weight_models_agree() {
        let gamma = 0.6;
        let d = 4;
        let product = Weights::uniform_product(gamma);
        let order = Weights::order_dependent((1..=d).map(|k| gamma.powi(k as i32)).collect(), 0.0);
        let pod = Weights::pod(
            OrderWeights::new(vec![1.0; d], 0.0),
            ProductWeights::new(vec![], gamma),
        );
        let projections = Weights::projection_dependent((1u64..1 << d).map(|bits| {
            let u: Vec<usize> = (0..d).filter(|&j| (bits >> j) & 1 == 1).collect();
            (CoordinateSet::from_coordinates(&u), gamma.powi(u.len() as i32))
        }));
        let (z, lambda) = (3.7, 0.8);
        let expected = (1.0 + z * gamma.powf(lambda)).powi(d as i32) - 1.0;
        for weights in [&product, &order, &pod, &projections] {
            assert_close(sl10_sum(weights, z, lambda, d), expected, 1e-12);
        }
        let combined = Weights::combined(vec![product.clone(), order]);
        assert_close(sl10_sum(&combined, z, lambda, d), 2.0 * expected, 1e-12);
        // projections beyond the dimension do not count
        assert_close(
            sl10_sum(&projections, z, lambda, 2),
            (1.0 + z * gamma.powf(lambda)).powi(2) - 1.0,
            1e-12,
        );
    }

    #[test]
    fn test_bound_at_most_lambda_one() {
        let weights = Weights::uniform_product(1.0);
        let bound = sl10_bound(&weights, 2, 100.0, 1);
        // λ = 1 gives 2 ζ(2) / φ(n) = π² / (3 φ(n))
        assert!(bound <= PI * PI / 300.0 * (1.0 + 1e-12));
        assert!(bound > 0.0);
        assert!(sl10_bound(&weights, 2, 100.0, 3) > bound);
    }

    #[test]
    fn test_normalize_and_low_pass() {
        let s = storage(PointSetConfiguration::ordinary(), SizeParam::integer(101));
        let weights = Arc::new(Weights::uniform_product(1.0));
        let filters = MeritFilters::new(
            vec![
                MeritFilter::Normalize(Norm::PAlphaSl10),
                MeritFilter::LowPass { threshold: 1.0 },
            ],
            KernelType::PAlpha { alpha: 2 },
            weights.clone(),
            &s,
        )
        .unwrap();
        let bound = sl10_bound(&weights, 2, 100.0, 2);
        assert_eq!(filters.bounds(2), vec![bound]);
        let mut merits = [0.5 * bound];
        filters.apply(2, &mut merits);
        assert_close(merits[0], 0.5, 1e-12);
        let mut merits = [2.0 * bound];
        filters.apply(2, &mut merits);
        assert_eq!(merits[0], f64::INFINITY);
    }

    #[test]
    fn test_levels_use_their_own_size() {
        let config = PointSetConfiguration::ordinary()
            .with_embedding(Embedding::MultiLevel)
            .with_level_order(LevelOrder::Cyclic);
        let s = storage(config, SizeParam::integer_power(3, 3));
        let weights = Arc::new(Weights::uniform_product(0.5));
        let filters = MeritFilters::new(
            vec![MeritFilter::Normalize(Norm::PAlphaSl10)],
            KernelType::PAlpha { alpha: 2 },
            weights.clone(),
            &s,
        )
        .unwrap();
        let bounds = filters.bounds(3);
        assert_eq!(bounds.len(), 4);
        // φ(1) counts as one generator, φ(3) = 2, φ(9) = 6, φ(27) = 18
        for (bound, units) in bounds.iter().zip([1.0, 2.0, 6.0, 18.0]) {
            assert_close(*bound, sl10_bound(&weights, 2, units, 3), 1e-15);
        }
        assert!(bounds.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_unsupported_normalization() {
        let weights = Arc::new(Weights::uniform_product(1.0));
        let normalize = vec![MeritFilter::Normalize(Norm::PAlphaSl10)];
        let digital = storage(PointSetConfiguration::digital(), SizeParam::digital(3, 3));
        assert!(MeritFilters::new(
            normalize.clone(),
            KernelType::PAlphaPlr { alpha: 2 },
            weights.clone(),
            &digital
        )
        .is_err());
        let lattice = storage(PointSetConfiguration::ordinary(), SizeParam::integer(7));
        assert!(MeritFilters::new(
            normalize,
            KernelType::IaAlpha {
                alpha: 2,
                interlacing: 2
            },
            weights.clone(),
            &lattice
        )
        .is_err());
        assert!(MeritFilters::new(
            vec![MeritFilter::LowPass {
                threshold: f64::NAN
            }],
            KernelType::PAlpha { alpha: 2 },
            weights,
            &lattice
        )
        .is_err());
    }
}
