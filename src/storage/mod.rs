// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Index space of a point set (immutable, precomputed).
//!
//! A [`Storage`] is built once per search from a configuration and a size
//! parameter, and shared read-only by every candidate evaluation. All four
//! configuration axes are resolved here into explicit tables, so that the
//! accumulator and the search loop only ever see "slots".
//!
//! # Terminology
//!
//! - **Logical point**: index `i` in `0..virtual_size()`. For lattices this is
//!   the residue encoding of the point (the integer `i`, or the polynomial
//!   with coefficient bits `i`). For digital nets it is the digit vector of
//!   the point index.
//! - **Slot**: physical position in `0..size()`. Every per-point vector of
//!   the search (kernel rows, accumulator states) is indexed by slot.
//! - **Kernel index**: position in the table of one-dimensional kernel
//!   values. Lattices tabulate the kernel per slot; digital nets tabulate it
//!   per output word `y` in `0..2^rows`.
//!
//! # Layout
//!
//! - A single-level lattice in `Basic` order keeps natural point order.
//!   Digital nets are always stored in Gray code order.
//! - Embedded lattices, and lattices in `Cyclic` order, group the points
//!   of `Z/b^K` (or `F[z]/Q^K`) into level blocks: block 0 is the origin,
//!   block `β` holds the points `b^(K-β) u` for the units `u` modulo
//!   `b^β`. The points of the embedded set at level `ℓ` are exactly blocks
//!   `0..=ℓ`, so every level is a slot prefix.
//! - Within a block, `Basic` lists the units in ascending order. `Cyclic`
//!   lists them in generator-power order when their group is cyclic,
//!   ascending otherwise.
//! - Symmetric compression folds the logical points `i` and `n - i` onto the
//!   slot of whichever comes first in the layout. The number of folded
//!   points is the slot's multiplicity.
//!
//! # Memory Layout
//!
//! One `u64` and one `f64` per slot, one `usize` per logical point. Sizes
//! are capped by [`MAX_POINTS`](crate::pointset::MAX_POINTS).

pub mod index_map;

pub use index_map::{IndexMap, Stride, Unpermute};

use crate::algebra::{CyclicGroup, Modulus};
use crate::errors::SearchError;
use crate::kernel::Kernel;
use crate::pointset::{Compression, GenValue, LevelOrder, PointSetConfiguration, SizeParam};
use tracing::debug;

/// Marker for logical points not yet assigned a slot.
const UNASSIGNED: usize = usize::MAX;

/// Precomputed index tables for one (configuration, size) pair.
#[derive(Debug, Clone)]
pub struct Storage {
    config: PointSetConfiguration,
    size: SizeParam,

    /// Full ring, `None` for digital nets.
    modulus: Option<Modulus>,

    /// Representative logical point of each slot.
    points: Vec<u64>,

    /// Slot of each logical point.
    slot_of: Vec<usize>,

    /// Number of logical points folded onto each slot.
    multiplicity: Vec<f64>,

    /// `level_ends[ℓ]`: number of slots holding the points of level `ℓ`.
    level_ends: Vec<usize>,

    /// `level_points[ℓ]`: number of logical points of level `ℓ`.
    level_points: Vec<u64>,

    kernel_size: usize,
}

impl Storage {
    /// Validate the pair and build the index tables.
    pub fn new(config: PointSetConfiguration, size: SizeParam) -> Result<Self, SearchError> {
        config.check(&size)?;
        let storage = match size {
            SizeParam::Digital { rows, cols } => Self::digital(config, size, rows, cols),
            SizeParam::Integer { .. } | SizeParam::Polynomial { .. } => {
                let modulus = size.modulus().ok_or_else(|| {
                    SearchError::configuration(format!("modulus {} overflows", size))
                })?;
                Self::lattice(config, size, modulus)?
            }
        };
        debug!(
            config = %config,
            size = %size,
            slots = storage.size(),
            levels = storage.num_levels(),
            "storage built"
        );
        Ok(storage)
    }

    fn lattice(
        config: PointSetConfiguration,
        size: SizeParam,
        modulus: Modulus,
    ) -> Result<Self, SearchError> {
        let n = size.num_points() as usize;
        let blocks = if config.is_multilevel() || config.level_order == LevelOrder::Cyclic {
            level_blocks(&size, modulus, config.level_order)?
        } else {
            vec![(0..n as u64).collect::<Vec<_>>()]
        };
        let symmetric = config.compression == Compression::Symmetric;

        let mut slot_of = vec![UNASSIGNED; n];
        let mut points = Vec::with_capacity(n);
        let mut multiplicity = Vec::with_capacity(n);
        let mut block_ends = Vec::with_capacity(blocks.len());
        for block in &blocks {
            for &i in block {
                let partner = slot_of[modulus.negate(i) as usize];
                if symmetric && partner != UNASSIGNED {
                    slot_of[i as usize] = partner;
                    multiplicity[partner] += 1.0;
                } else {
                    slot_of[i as usize] = points.len();
                    points.push(i);
                    multiplicity.push(1.0);
                }
            }
            block_ends.push(points.len());
        }

        let num_levels = size.num_levels(config.embedding);
        let level_ends = if config.is_multilevel() {
            block_ends
        } else {
            vec![points.len()]
        };
        debug_assert_eq!(level_ends.len(), num_levels);
        let kernel_size = points.len();
        Ok(Self {
            config,
            level_points: level_sizes(&size, num_levels),
            size,
            modulus: Some(modulus),
            points,
            slot_of,
            multiplicity,
            level_ends,
            kernel_size,
        })
    }

    fn digital(config: PointSetConfiguration, size: SizeParam, rows: u32, cols: u32) -> Self {
        let n = 1usize << cols;
        // slot j holds the point whose digit vector is the Gray code of j
        let points: Vec<u64> = (0..n as u64).map(|j| j ^ (j >> 1)).collect();
        let mut slot_of = vec![0; n];
        for (slot, &point) in points.iter().enumerate() {
            slot_of[point as usize] = slot;
        }
        let num_levels = size.num_levels(config.embedding);
        let level_ends = if config.is_multilevel() {
            (0..=cols).map(|l| 1usize << l).collect()
        } else {
            vec![n]
        };
        Self {
            config,
            level_points: level_sizes(&size, num_levels),
            size,
            modulus: None,
            points,
            slot_of,
            multiplicity: vec![1.0; n],
            level_ends,
            kernel_size: 1usize << rows,
        }
    }

    pub fn configuration(&self) -> &PointSetConfiguration {
        &self.config
    }

    pub fn size_param(&self) -> &SizeParam {
        &self.size
    }

    pub fn modulus(&self) -> Option<Modulus> {
        self.modulus
    }

    /// Number of logical points.
    pub fn virtual_size(&self) -> usize {
        self.slot_of.len()
    }

    /// Number of physical slots.
    pub fn size(&self) -> usize {
        self.points.len()
    }

    /// Slot of logical point `i`.
    pub fn unpermute(&self, i: usize) -> usize {
        self.slot_of[i]
    }

    /// The unpermute map as an [`IndexMap`].
    pub fn unpermute_map(&self) -> Unpermute<'_> {
        Unpermute::new(self)
    }

    /// Representative logical point of `slot`.
    pub fn point(&self, slot: usize) -> u64 {
        self.points[slot]
    }

    pub fn multiplicity(&self, slot: usize) -> f64 {
        self.multiplicity[slot]
    }

    pub fn multiplicities(&self) -> &[f64] {
        &self.multiplicity
    }

    pub fn num_levels(&self) -> usize {
        self.level_ends.len()
    }

    /// Slot prefix length of level `level`.
    pub fn level_end(&self, level: usize) -> usize {
        self.level_ends[level]
    }

    pub fn level_ends(&self) -> &[usize] {
        &self.level_ends
    }

    /// Number of logical points of level `level`.
    pub fn level_points(&self, level: usize) -> u64 {
        self.level_points[level]
    }

    /// Number of entries of the kernel table.
    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// One-dimensional coordinate in [0, 1) of every kernel index.
    pub fn kernel_coordinates(&self) -> Vec<f64> {
        match (self.modulus, self.size) {
            (Some(modulus), _) => self.points.iter().map(|&p| modulus.coordinate(p)).collect(),
            (None, SizeParam::Digital { rows, .. }) => {
                let scale = (1u64 << rows) as f64;
                (0..self.kernel_size).map(|y| y as f64 / scale).collect()
            }
            (None, _) => unreachable!("lattice storage without modulus"),
        }
    }

    /// Kernel table: `kernel` evaluated at every kernel coordinate.
    pub fn kernel_values(&self, kernel: &dyn Kernel) -> Vec<f64> {
        self.kernel_coordinates()
            .into_iter()
            .map(|x| kernel.evaluate(x))
            .collect()
    }

    /// Build the stride map of `gen`.
    ///
    /// # Panics
    ///
    /// Panics if `gen` is not of the kind of this storage's point set, or if
    /// a generating matrix has the wrong shape.
    pub fn stride(&self, gen: &GenValue) -> Stride {
        match (self.modulus, gen) {
            (Some(modulus @ Modulus::Integer(_)), GenValue::Integer(_))
            | (Some(modulus @ Modulus::Polynomial(_)), GenValue::Polynomial(_)) => {
                let a = modulus.reduce(gen.residue().unwrap_or(0));
                Stride::new(
                    self.points
                        .iter()
                        .map(|&p| self.slot_of[modulus.mul(a, p) as usize])
                        .collect(),
                )
            }
            (None, GenValue::Matrix(matrix)) => {
                let (rows, cols) = match self.size {
                    SizeParam::Digital { rows, cols } => (rows, cols),
                    _ => unreachable!("digital storage without digital size"),
                };
                assert!(
                    matrix.rows() == rows && matrix.cols() == cols,
                    "generating matrix is {}x{}, expected {}x{}",
                    matrix.rows(),
                    matrix.cols(),
                    rows,
                    cols
                );
                let columns = matrix.output_columns();
                let mut targets = Vec::with_capacity(self.size());
                let mut y = 0u64;
                targets.push(0);
                for j in 1..self.size() {
                    y ^= columns[j.trailing_zeros() as usize];
                    targets.push(y as usize);
                }
                Stride::new(targets)
            }
            _ => panic!(
                "generator {} does not belong to a {} point set",
                gen, self.config.lattice
            ),
        }
    }
}

/// Logical points of `Z/b^K` (or `F[z]/Q^K`) grouped by level block.
fn level_blocks(
    size: &SizeParam,
    modulus: Modulus,
    order: LevelOrder,
) -> Result<Vec<Vec<u64>>, SearchError> {
    let power = size.power();
    let base = size
        .level_modulus(1)
        .ok_or_else(|| SearchError::configuration(format!("invalid base for {}", size)))?;
    let mut blocks = vec![vec![0u64]];
    for level in 1..=power {
        let sub = size.level_modulus(level).ok_or_else(|| {
            SearchError::configuration(format!("invalid level {} of {}", level, size))
        })?;
        let scale = Modulus::scale_factor(base, power - level).ok_or_else(|| {
            SearchError::configuration(format!("level scale of {} overflows", size))
        })?;
        let group = match order {
            LevelOrder::Basic => None,
            LevelOrder::Cyclic => CyclicGroup::find(sub),
        };
        let units: Vec<u64> = match group {
            Some(group) => group.iter().collect(),
            None => sub.units().collect(),
        };
        blocks.push(units.into_iter().map(|u| modulus.embed(scale, u)).collect());
    }
    Ok(blocks)
}

fn level_sizes(size: &SizeParam, num_levels: usize) -> Vec<u64> {
    if num_levels == 1 {
        vec![size.num_points()]
    } else {
        (0..num_levels as u32).map(|l| size.level_points(l)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::Polynomial;
    use crate::pointset::{Embedding, GeneratingMatrix};

    fn storage(config: PointSetConfiguration, size: SizeParam) -> Storage {
        Storage::new(config, size).unwrap()
    }

    #[test]
    fn test_basic_integer_storage() {
        let s = storage(PointSetConfiguration::ordinary(), SizeParam::integer(7));
        assert_eq!(s.virtual_size(), 7);
        assert_eq!(s.size(), 7);
        assert_eq!(s.unpermute_map().to_vec(), (0..7).collect::<Vec<_>>());
        assert_eq!(s.level_ends(), &[7]);
        assert_eq!(s.level_points(0), 7);
    }

    #[test]
    fn test_symmetric_compression_folds() {
        let config = PointSetConfiguration::ordinary().with_compression(Compression::Symmetric);
        let s = storage(config, SizeParam::integer(8));
        assert_eq!(s.size(), 5);
        assert_eq!(s.unpermute(3), 3);
        assert_eq!(s.unpermute(5), 3);
        assert_eq!(s.unpermute(4), 4);
        assert_eq!(s.multiplicities(), &[1.0, 2.0, 2.0, 2.0, 1.0]);
        let total: f64 = s.multiplicities().iter().sum();
        assert_eq!(total, 8.0);
    }

    #[test]
    fn test_stride_is_multiplication() {
        let s = storage(PointSetConfiguration::ordinary(), SizeParam::integer(7));
        let stride = s.stride(&GenValue::Integer(3));
        assert_eq!(stride.as_slice(), &[0, 3, 6, 2, 5, 1, 4]);
    }

    #[test]
    fn test_stride_with_compression() {
        let config = PointSetConfiguration::ordinary().with_compression(Compression::Symmetric);
        let s = storage(config, SizeParam::integer(7));
        // slots hold 0, 1, 2, 3; 3 * {0, 1, 2, 3} = {0, 3, 6, 9} mod 7 = {0, 3, -1, 2}
        assert_eq!(s.stride(&GenValue::Integer(3)).as_slice(), &[0, 3, 1, 2]);
    }

    #[test]
    fn test_cyclic_layout_levels() {
        let config = PointSetConfiguration::ordinary()
            .with_embedding(Embedding::MultiLevel)
            .with_level_order(LevelOrder::Cyclic);
        let s = storage(config, SizeParam::integer_power(3, 2));
        assert_eq!(s.num_levels(), 3);
        assert_eq!(s.level_ends(), &[1, 3, 9]);
        assert_eq!(s.level_points(1), 3);
        // block 1 holds 3 * {1, 2}
        assert_eq!(s.point(0), 0);
        assert_eq!(s.point(1), 3);
        assert_eq!(s.point(2), 6);
        // block 2 lists the powers of 2 modulo 9
        let block: Vec<_> = (3..9).map(|j| s.point(j)).collect();
        assert_eq!(block, vec![1, 2, 4, 8, 7, 5]);
        for i in 0..9 {
            assert_eq!(s.point(s.unpermute(i)), i as u64);
        }
    }

    #[test]
    fn test_basic_multilevel_layout() {
        let config = PointSetConfiguration::ordinary().with_embedding(Embedding::MultiLevel);
        let s = storage(config, SizeParam::integer_power(3, 2));
        assert_eq!(s.level_ends(), &[1, 3, 9]);
        let points: Vec<_> = (0..9).map(|j| s.point(j)).collect();
        // blocks in ascending order: {0}, 3 * {1, 2}, units modulo 9
        assert_eq!(points, vec![0, 3, 6, 1, 2, 4, 5, 7, 8]);
        for i in 0..9 {
            assert_eq!(s.point(s.unpermute(i)), i as u64);
        }
    }

    #[test]
    fn test_basic_multilevel_polynomial_levels() {
        let config = PointSetConfiguration::polynomial().with_embedding(Embedding::MultiLevel);
        // (1 + z + z^2)^2 = 1 + z^2 + z^4
        let s = storage(config, SizeParam::polynomial_power(Polynomial::from_bits(0b111), 2));
        assert_eq!(s.level_ends(), &[1, 4, 16]);
        assert_eq!(s.level_points(1), 4);
        // level 1 is (1 + z + z^2) * {1, z, 1 + z}
        let block: Vec<_> = (1..4).map(|j| s.point(j)).collect();
        assert_eq!(block, vec![0b111, 0b1110, 0b1001]);
    }

    #[test]
    fn test_polynomial_storage() {
        let s = storage(
            PointSetConfiguration::polynomial(),
            SizeParam::polynomial(Polynomial::from_bits(0b1011)),
        );
        assert_eq!(s.size(), 8);
        let coordinates = s.kernel_coordinates();
        assert_eq!(coordinates[0], 0.0);
        // 1 / (1 + z + z^3) = z^-3 + ..., three digits give 0.001
        assert_eq!(coordinates[1], 0.125);
        let stride = s.stride(&GenValue::Polynomial(Polynomial::Z));
        // z * z^2 = z^3 = 1 + z modulo 1 + z + z^3
        assert_eq!(stride.map(4), 3);
    }

    #[test]
    fn test_digital_gray_code_stride() {
        let s = storage(PointSetConfiguration::digital(), SizeParam::digital(2, 2));
        assert_eq!(s.kernel_size(), 4);
        let identity = GenValue::Matrix(GeneratingMatrix::identity(2, 2));
        // slots hold the points 0, 1, 3, 2; the identity reverses the digits
        assert_eq!(s.stride(&identity).as_slice(), &[0, 2, 3, 1]);
        assert_eq!(s.kernel_coordinates(), vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_digital_levels_are_prefixes() {
        let config = PointSetConfiguration::digital().with_embedding(Embedding::MultiLevel);
        let s = storage(config, SizeParam::digital(3, 3));
        assert_eq!(s.level_ends(), &[1, 2, 4, 8]);
        assert_eq!(s.level_points(2), 4);
    }

    #[test]
    #[should_panic(expected = "does not belong")]
    fn test_stride_kind_mismatch_panics() {
        let s = storage(PointSetConfiguration::ordinary(), SizeParam::integer(7));
        s.stride(&GenValue::Polynomial(Polynomial::ONE));
    }

    #[test]
    fn test_rejects_inconsistent_pair() {
        let err = Storage::new(PointSetConfiguration::digital(), SizeParam::integer(7));
        assert!(matches!(err, Err(SearchError::Configuration(_))));
    }
}
