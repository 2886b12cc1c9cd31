// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Fast CBC: every candidate of a coordinate scored by cyclic correlations.
//!
//! # Architecture
//!
//! For a modulus `b^K` with a cyclic unit group generated by `g`, the
//! candidates are `g^0, g^1, ...`. The points split into level blocks
//! (see [`crate::storage`]): block `β` is `{ s_β g^e mod b^β : e < L_β }`
//! with `s_β = b^(K-β)` and `L_β` the number of units modulo `b^β`.
//! Multiplying by the candidate `g^k` shifts exponents by `k`, so the
//! increment of candidate `k` restricted to block `β` is
//!
//! ```text
//! C_β(k) = Σ_e A_β[(k + e) mod L_β] B_β[e]
//! ```
//!
//! with `A_β[e]` the kernel value and `B_β[e]` the weighted state at the
//! block's `e`-th point. Each `C_β` is one cyclic correlation, computed by
//! FFT in `O(L log L)`. Level `ℓ` of an embedding sums the blocks `β ≤ ℓ`;
//! a single-level point set sums all of them.
//!
//! Planning fails with [`SearchError::CapabilityMismatch`] when this
//! structure is missing; callers fall back to naive CBC.

pub mod fft;

use crate::algebra::modulus::prime_factors;
use crate::algebra::{CyclicGroup, Modulus};
use crate::engine::CancelToken;
use crate::errors::SearchError;
use crate::genseq::CandidateOrder;
use crate::pointset::LatticeKind;
use crate::storage::Storage;
use std::sync::Arc;
use tracing::debug;

/// Precomputed block layout for fast evaluation.
#[derive(Debug, Clone)]
pub struct FastCbc {
    storage: Arc<Storage>,
    blocks: Vec<Block>,
}

#[derive(Debug, Clone)]
struct Block {
    level: usize,
    /// Slot of the block's `e`-th point.
    slots: Vec<usize>,
}

impl FastCbc {
    /// Check the storage supports fast CBC and lay out its blocks.
    pub fn plan(storage: Arc<Storage>, order: CandidateOrder) -> Result<Self, SearchError> {
        if order != CandidateOrder::CyclicGroup {
            return Err(SearchError::capability(
                "candidates are not enumerated in cyclic group order",
            ));
        }
        let config = *storage.configuration();
        let size = *storage.size_param();
        if config.lattice == LatticeKind::Digital {
            return Err(SearchError::capability(
                "digital nets have no cyclic candidate structure",
            ));
        }
        if !size.has_prime_base() {
            return Err(SearchError::capability(format!(
                "size {} is not a power of a prime",
                size
            )));
        }
        let modulus = storage
            .modulus()
            .ok_or_else(|| SearchError::capability("storage has no modulus"))?;
        let group = CyclicGroup::find(modulus).ok_or_else(|| {
            SearchError::capability(format!("the units modulo {} are not cyclic", size))
        })?;
        let base = size
            .level_modulus(1)
            .ok_or_else(|| SearchError::capability("invalid base"))?;

        let power = size.power();
        let mut blocks = vec![Block {
            level: 0,
            slots: vec![storage.unpermute(0)],
        }];
        for level in 1..=power {
            let sub = size
                .level_modulus(level)
                .ok_or_else(|| SearchError::capability("level modulus overflows"))?;
            let generator = sub.reduce(group.generator());
            let order = sub.unit_count();
            if !generates(sub, generator, order) {
                return Err(SearchError::capability(format!(
                    "generator {} of the units modulo {} does not generate level {}",
                    group.generator(),
                    size,
                    level
                )));
            }
            let scale = Modulus::scale_factor(base, power - level)
                .ok_or_else(|| SearchError::capability("level scale overflows"))?;
            let mut slots = Vec::with_capacity(order as usize);
            let mut u = sub.reduce(1);
            for _ in 0..order {
                slots.push(storage.unpermute(modulus.embed(scale, u) as usize));
                u = sub.mul(u, generator);
            }
            blocks.push(Block {
                level: level as usize,
                slots,
            });
        }
        debug!(size = %size, blocks = blocks.len(), "fast CBC planned");
        Ok(Self { storage, blocks })
    }

    /// Level merits of the candidates `g^0 .. g^(count-1)`.
    ///
    /// `q` is the weighted state of the parent and `base_merits` its level
    /// merits. Returns `None` if `cancel` fires between blocks.
    pub fn evaluate_all_candidates(
        &self,
        kernel_values: &[f64],
        q: &[f64],
        base_merits: &[f64],
        count: usize,
        cancel: &CancelToken,
    ) -> Option<Vec<Vec<f64>>> {
        let levels = self.storage.num_levels();
        let multilevel = self.storage.configuration().is_multilevel();
        let mut sums = vec![vec![0.0; count]; levels];
        for block in &self.blocks {
            if cancel.is_cancelled() {
                return None;
            }
            let a: Vec<f64> = block.slots.iter().map(|&j| kernel_values[j]).collect();
            let b: Vec<f64> = block.slots.iter().map(|&j| q[j]).collect();
            let c = fft::cyclic_correlation(&a, &b);
            let first = if multilevel { block.level } else { 0 };
            for level_sums in &mut sums[first..] {
                for (k, sum) in level_sums.iter_mut().enumerate() {
                    *sum += c[k % c.len()];
                }
            }
        }
        let merits = (0..count)
            .map(|k| {
                (0..levels)
                    .map(|l| base_merits[l] + sums[l][k] / self.storage.level_points(l) as f64)
                    .collect()
            })
            .collect();
        Some(merits)
    }
}

/// Whether `g` has multiplicative order `order` modulo `modulus`.
fn generates(modulus: Modulus, g: u64, order: u64) -> bool {
    let one = modulus.reduce(1);
    modulus.pow(g, order) == one
        && prime_factors(order)
            .into_iter()
            .all(|p| modulus.pow(g, order / p) != one)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Polynomial;
    use crate::genseq::GenSeq;
    use crate::kernel::{Kernel, PAlpha, PAlphaPlr};
    use crate::pointset::{Compression, Embedding, LevelOrder, PointSetConfiguration, SizeParam};
    use crate::state::CoordUniformState;
    use crate::weights::Weights;

    /// Naive merits of every cyclic candidate after committing `first`.
    fn compare(config: PointSetConfiguration, size: SizeParam, kernel: &dyn Kernel, first: u64) {
        let storage = Arc::new(Storage::new(config, size).unwrap());
        let values = storage.kernel_values(kernel);
        let weights = Arc::new(Weights::uniform_product(0.7));
        let mut state = CoordUniformState::new(storage.clone(), weights);
        let first = GenSeq::create(&config, &size, 1, CandidateOrder::CyclicGroup)
            .unwrap()
            .nth(first as usize)
            .unwrap();
        state.update(&values, &first);

        let seq = GenSeq::create(&config, &size, 2, CandidateOrder::CyclicGroup).unwrap();
        let plan = FastCbc::plan(storage.clone(), CandidateOrder::CyclicGroup).unwrap();
        let q = state.weighted_state();
        let fast = plan
            .evaluate_all_candidates(
                &values,
                &q,
                state.level_merits(),
                seq.len(),
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(fast.len(), seq.len());
        for (k, gen) in seq.iter().enumerate() {
            let mut naive = state.clone();
            naive.update(&values, &gen);
            for (x, y) in fast[k].iter().zip(naive.level_merits()) {
                assert!((x - y).abs() <= 1e-9 * y.abs().max(1.0), "{}: {} != {}", gen, x, y);
            }
        }
    }

    #[test]
    fn test_prime_matches_naive() {
        let kernel = PAlpha::new(2).unwrap();
        compare(PointSetConfiguration::ordinary(), SizeParam::integer(31), &kernel, 3);
    }

    #[test]
    fn test_prime_square_matches_naive() {
        let kernel = PAlpha::new(2).unwrap();
        compare(PointSetConfiguration::ordinary(), SizeParam::integer(49), &kernel, 5);
    }

    #[test]
    fn test_symmetric_multilevel_matches_naive() {
        let kernel = PAlpha::new(2).unwrap();
        let config = PointSetConfiguration::ordinary()
            .with_embedding(Embedding::MultiLevel)
            .with_level_order(LevelOrder::Cyclic)
            .with_compression(Compression::Symmetric);
        compare(config, SizeParam::integer_power(3, 3), &kernel, 4);
    }

    #[test]
    fn test_polynomial_field_matches_naive() {
        let kernel = PAlphaPlr::new(2).unwrap();
        compare(
            PointSetConfiguration::polynomial(),
            SizeParam::polynomial(Polynomial::from_bits(0b1_0001_1011)),
            &kernel,
            7,
        );
    }

    #[test]
    fn test_capability_mismatch() {
        let plan = |config, size| {
            let storage = Arc::new(Storage::new(config, size).unwrap());
            FastCbc::plan(storage, CandidateOrder::CyclicGroup)
        };
        let ordinary = PointSetConfiguration::ordinary();
        assert!(matches!(
            plan(ordinary, SizeParam::integer(12)),
            Err(SearchError::CapabilityMismatch { .. })
        ));
        assert!(matches!(
            plan(ordinary, SizeParam::integer(16)),
            Err(SearchError::CapabilityMismatch { .. })
        ));
        assert!(plan(PointSetConfiguration::digital(), SizeParam::digital(3, 3)).is_err());

        let storage = Arc::new(Storage::new(ordinary, SizeParam::integer(31)).unwrap());
        assert!(FastCbc::plan(storage, CandidateOrder::Ascending).is_err());
    }

    #[test]
    fn test_cancelled_evaluation() {
        let storage = Arc::new(
            Storage::new(PointSetConfiguration::ordinary(), SizeParam::integer(13)).unwrap(),
        );
        let plan = FastCbc::plan(storage, CandidateOrder::CyclicGroup).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let q = vec![1.0; 13];
        assert!(plan
            .evaluate_all_candidates(&q, &q, &[0.0], 12, &cancel)
            .is_none());
    }
}
