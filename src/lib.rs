// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Component-by-component construction of rank-1 lattice rules, polynomial
//! lattice rules and digital nets.
//!
//! A point set of `n` points in `d` dimensions is defined by one generator
//! per coordinate. The search picks generators one coordinate at a time,
//! each time minimising a kernel-based figure of merit
//!
//! ```text
//! e^2 = Σ_u γ_u (1/n) Σ_i Π_{j ∈ u} ω(x_ij)
//! ```
//!
//! over the weighted projections `u` of the coordinates chosen so far.
//!
//! # Architecture
//!
//! The implementation uses a two-tier memory model:
//!
//! ## Tier 1: Context (Immutable)
//!
//! Built once per search and shared by every thread:
//! - [`storage::Storage`]: the point layout, folded multiplicities and
//!   embedding levels, and the stride maps of generators
//! - the kernel table, one value of ω per distinct coordinate
//! - [`weights::Weights`] and the [`engine::LevelCombiner`]
//!
//! ## Tier 2: State (Per node)
//!
//! - [`state::CoordUniformState`]: the accumulator of a partial point set,
//!   from which the merit increment of any candidate is one inner product
//!
//! # Search Algorithm
//!
//! [`engine::CbcSearch`] scores every candidate of a coordinate in
//! parallel, keeps the best in a [`engine::MinObserver`] and commits it.
//! Early abortion drops candidates whose partial merit, level by level,
//! already exceeds the best. When the units modulo `n` form a cyclic group,
//! [`fast::FastCbc`] scores all candidates of a coordinate at once with
//! FFT-based cyclic correlations.
//!
//! [`engine::RandomSearch`] and [`engine::KorobovSearch`] explore whole
//! generator sequences instead.
//!
//! # References
//!
//! - Nuyens, D. and Cools, R. (2006). "Fast algorithms for component-by-component
//!   construction of rank-1 lattice rules in shift-invariant reproducing kernel
//!   Hilbert spaces." Mathematics of Computation 75, 903-920.
//! - L'Ecuyer, P. and Munger, D. (2016). "Algorithm 958: Lattice Builder: A General
//!   Software Tool for Constructing Rank-1 Lattice Rules." ACM TOMS 42(2).

pub mod algebra;
pub mod context;
pub mod engine;
pub mod errors;
pub mod fast;
pub mod genseq;
pub mod kernel;
pub mod pointset;
pub mod state;
pub mod storage;
pub mod weights;

// Re-export commonly used types
pub use context::{FigureOfMerit, SearchContext};
pub use engine::{CancelToken, CbcSearch, SearchOptions, SearchResult};
pub use errors::SearchError;
pub use pointset::{GenValue, PointSetConfiguration, SizeParam};
