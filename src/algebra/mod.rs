// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Arithmetic building blocks.
//!
//! ## Module Structure
//!
//! - `coordinate_set`: projections as coordinate bitsets
//! - `polynomial`: polynomials over GF(2)
//! - `modulus`: residue rings, unit groups and small number theory helpers

pub mod coordinate_set;
pub mod modulus;
pub mod polynomial;

pub use coordinate_set::{CoordinateSet, MAX_COORDINATES};
pub use modulus::{CyclicGroup, Modulus};
pub use polynomial::Polynomial;
