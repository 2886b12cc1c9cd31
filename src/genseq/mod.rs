// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Candidate generator enumeration.
//!
//! A [`GenSeq`] lists, in a fixed order, the admissible generators of one
//! coordinate. The order is part of the contract: fast CBC scores candidate
//! `k` as the `k`-th element of a [`CandidateOrder::CyclicGroup`] sequence.
//!
//! Digital nets may instead draw their matrices from a structured
//! [`NetConstruction`].
//!
//! ```
//! use lattice_cbc::genseq::{CandidateOrder, GenSeq};
//! use lattice_cbc::pointset::{GenValue, PointSetConfiguration, SizeParam};
//!
//! let config = PointSetConfiguration::ordinary();
//! let size = SizeParam::integer(7);
//! let seq = GenSeq::create(&config, &size, 1, CandidateOrder::CyclicGroup).unwrap();
//! let values: Vec<_> = seq.iter().collect();
//! assert_eq!(values[1], GenValue::Integer(3));
//! assert_eq!(seq.len(), 6);
//! ```

pub mod construction;

pub use construction::NetConstruction;

use crate::algebra::{CyclicGroup, Modulus, Polynomial};
use crate::errors::SearchError;
use crate::pointset::{
    Compression, GenValue, GeneratingMatrix, LatticeKind, PointSetConfiguration, SizeParam,
};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Largest `rows * cols` for which every generating matrix is enumerated.
pub const MAX_MATRIX_BITS: u32 = 24;

/// Order in which lattice generators are listed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum CandidateOrder {
    /// Units in ascending order of their encoding.
    #[default]
    Ascending,
    /// Powers `g^0, g^1, ...` of a generator of the unit group.
    CyclicGroup,
}

/// Lazy, restartable sequence of candidate generators.
#[derive(Debug, Clone)]
pub struct GenSeq {
    kind: SeqKind,
    len: usize,
}

#[derive(Debug, Clone)]
enum SeqKind {
    Single(GenValue),
    Units { modulus: Modulus, symmetric: bool },
    Cyclic { group: CyclicGroup },
    Matrices { rows: u32, cols: u32 },
    Sobol { poly: Polynomial, rows: u32, cols: u32 },
    PolynomialNet { modulus: Polynomial, rows: u32, cols: u32 },
    Explicit(Vec<GenValue>),
}

impl GenSeq {
    /// Candidates of `coordinate` for point sets of `size`.
    ///
    /// Coordinate 0 only admits the identity generator.
    pub fn create(
        config: &PointSetConfiguration,
        size: &SizeParam,
        coordinate: usize,
        order: CandidateOrder,
    ) -> Result<Self, SearchError> {
        if coordinate == 0 {
            return Ok(Self::single(GenValue::identity(size)));
        }
        match (config.lattice, *size) {
            (LatticeKind::Digital, SizeParam::Digital { rows, cols }) => {
                if rows.saturating_mul(cols) > MAX_MATRIX_BITS {
                    return Err(SearchError::configuration(format!(
                        "cannot enumerate every {}x{} generating matrix; \
                         provide explicit candidates or a construction",
                        rows, cols
                    )));
                }
                Ok(Self {
                    kind: SeqKind::Matrices { rows, cols },
                    len: full_rank_count(rows, cols),
                })
            }
            (LatticeKind::Integer, SizeParam::Integer { .. })
            | (LatticeKind::Polynomial, SizeParam::Polynomial { .. }) => {
                let modulus = size.modulus().ok_or_else(|| {
                    SearchError::configuration(format!("modulus {} overflows", size))
                })?;
                let symmetric =
                    config.compression == Compression::Symmetric && modulus.residues() > 2;
                let units = modulus.unit_count() as usize;
                let len = if symmetric { units / 2 } else { units };
                match order {
                    CandidateOrder::Ascending => Ok(Self {
                        kind: SeqKind::Units { modulus, symmetric },
                        len,
                    }),
                    CandidateOrder::CyclicGroup => {
                        let group = CyclicGroup::find(modulus).ok_or_else(|| {
                            SearchError::capability(format!(
                                "the units modulo {} do not form a cyclic group",
                                size
                            ))
                        })?;
                        Ok(Self {
                            kind: SeqKind::Cyclic { group },
                            len,
                        })
                    }
                }
            }
            _ => Err(SearchError::configuration(format!(
                "{} lattice cannot use size parameter {}",
                config.lattice, size
            ))),
        }
    }

    /// Candidates of `coordinate` for digital nets of `size` built by
    /// `construction`.
    pub fn net(
        construction: NetConstruction,
        size: &SizeParam,
        coordinate: usize,
    ) -> Result<Self, SearchError> {
        construction.validate(size)?;
        let (rows, cols) = match *size {
            SizeParam::Digital { rows, cols } => (rows, cols),
            _ => {
                return Err(SearchError::configuration(format!(
                    "{} construction needs a digital net",
                    construction
                )))
            }
        };
        match construction {
            NetConstruction::Explicit => GenSeq::create(
                &PointSetConfiguration::digital(),
                size,
                coordinate,
                CandidateOrder::Ascending,
            ),
            NetConstruction::Sobol if coordinate == 0 => {
                Ok(Self::single(GenValue::Matrix(GeneratingMatrix::identity(rows, cols))))
            }
            NetConstruction::Sobol => {
                let poly = construction::primitive_polynomial(coordinate - 1).ok_or_else(|| {
                    SearchError::configuration(format!(
                        "coordinate {} needs a Sobol polynomial of degree above {}",
                        coordinate,
                        construction::MAX_SOBOL_DEGREE
                    ))
                })?;
                let degree = poly.degree().unwrap_or(0);
                Ok(Self {
                    kind: SeqKind::Sobol { poly, rows, cols },
                    len: construction::sobol_count(degree),
                })
            }
            NetConstruction::Polynomial(modulus) if coordinate == 0 => {
                let first = construction::polynomial_matrix(modulus, Polynomial::ONE, rows, cols);
                Ok(Self::single(GenValue::Matrix(first)))
            }
            NetConstruction::Polynomial(modulus) => Ok(Self {
                kind: SeqKind::PolynomialNet {
                    modulus,
                    rows,
                    cols,
                },
                len: Modulus::Polynomial(modulus).unit_count() as usize,
            }),
        }
    }

    /// A sequence of exactly one generator.
    pub fn single(gen: GenValue) -> Self {
        Self {
            kind: SeqKind::Single(gen),
            len: 1,
        }
    }

    /// A caller-provided list, in the given order.
    pub fn explicit(values: Vec<GenValue>) -> Self {
        Self {
            len: values.len(),
            kind: SeqKind::Explicit(values),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether candidate `k` is `g^k` for a generator `g` of the unit group.
    pub fn is_cyclic(&self) -> bool {
        matches!(self.kind, SeqKind::Cyclic { .. })
    }

    /// Enumerate from the start. Each call restarts the sequence.
    pub fn iter(&self) -> Box<dyn Iterator<Item = GenValue> + Send + '_> {
        match &self.kind {
            SeqKind::Single(gen) => Box::new(std::iter::once(gen.clone())),
            SeqKind::Units { modulus, symmetric } => {
                let modulus = *modulus;
                let symmetric = *symmetric;
                Box::new(
                    (1..modulus.residues())
                        .filter(move |&a| modulus.is_unit(a))
                        .filter(move |&a| !symmetric || modulus.is_half_representative(a))
                        .map(move |a| residue_value(modulus, a)),
                )
            }
            SeqKind::Cyclic { group } => {
                let modulus = group.modulus();
                Box::new(
                    group
                        .iter()
                        .take(self.len)
                        .map(move |a| residue_value(modulus, a)),
                )
            }
            SeqKind::Matrices { rows, cols } => {
                let (rows, cols) = (*rows, *cols);
                Box::new(
                    (0..1u64 << (rows * cols))
                        .map(move |index| GeneratingMatrix::from_index(rows, cols, index))
                        .filter(GeneratingMatrix::has_full_column_rank)
                        .map(GenValue::Matrix),
                )
            }
            SeqKind::Sobol { poly, rows, cols } => {
                let (poly, rows, cols) = (*poly, *rows, *cols);
                let degree = poly.degree().unwrap_or(0);
                Box::new((0..self.len as u64).map(move |index| {
                    let initial = construction::sobol_initial(degree, index);
                    GenValue::Matrix(construction::sobol_matrix(poly, &initial, rows, cols))
                }))
            }
            SeqKind::PolynomialNet {
                modulus,
                rows,
                cols,
            } => {
                let (modulus, rows, cols) = (*modulus, *rows, *cols);
                Box::new(
                    (1..1u64 << cols)
                        .map(Polynomial::from_bits)
                        .filter(move |q| q.gcd(modulus) == Polynomial::ONE)
                        .map(move |q| construction::polynomial_matrix(modulus, q, rows, cols))
                        .map(GenValue::Matrix),
                )
            }
            SeqKind::Explicit(values) => Box::new(values.iter().cloned()),
        }
    }

    /// The `k`-th candidate.
    pub fn nth(&self, k: usize) -> Option<GenValue> {
        if k >= self.len {
            return None;
        }
        match &self.kind {
            SeqKind::Cyclic { group } => {
                Some(residue_value(group.modulus(), group.element(k as u64)))
            }
            SeqKind::Explicit(values) => values.get(k).cloned(),
            _ => self.iter().nth(k),
        }
    }

    pub fn to_vec(&self) -> Vec<GenValue> {
        self.iter().collect()
    }
}

pub(crate) fn residue_value(modulus: Modulus, a: u64) -> GenValue {
    match modulus {
        Modulus::Integer(_) => GenValue::Integer(a),
        Modulus::Polynomial(_) => GenValue::Polynomial(Polynomial::from_bits(a)),
    }
}

/// Number of `rows x cols` matrices over GF(2) with independent columns.
fn full_rank_count(rows: u32, cols: u32) -> usize {
    (0..cols)
        .map(|i| (1usize << rows) - (1usize << i))
        .product()
}
