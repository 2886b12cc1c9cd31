// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! CoordinateSet type for representing projections as bitsets.
//!
//! A projection of a point set is a subset of its coordinates. A CoordinateSet
//! stores it as a bitset, where bit j represents the presence of coordinate j
//! (coordinates are 0-based).
//!
//! # Examples
//!
//! ```
//! use lattice_cbc::algebra::CoordinateSet;
//!
//! let mut set = CoordinateSet::empty();
//! set.insert(0);
//! set.insert(2);
//!
//! assert_eq!(set.len(), 2);
//! assert_eq!(format!("{}", set), "{0,2}");
//!
//! let coords: Vec<usize> = set.iter().collect();
//! assert_eq!(coords, vec![0, 2]);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest number of coordinates a CoordinateSet can hold.
pub const MAX_COORDINATES: usize = 64;

/// A set of coordinates represented as a bitset.
///
/// Bit j (counting from LSB) is set if coordinate j is in the set.
/// This provides O(1) insert, remove, and contains operations.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct CoordinateSet(u64);

impl CoordinateSet {
    /// Create an empty coordinate set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Create the set of the first `dimension` coordinates.
    pub fn first(dimension: usize) -> Self {
        assert!(dimension <= MAX_COORDINATES, "at most {} coordinates", MAX_COORDINATES);
        if dimension == MAX_COORDINATES {
            Self(u64::MAX)
        } else {
            Self((1u64 << dimension) - 1)
        }
    }

    /// Create a coordinate set from a slice of coordinates.
    pub fn from_coordinates(coordinates: &[usize]) -> Self {
        let mut set = Self::empty();
        for &coordinate in coordinates {
            set.insert(coordinate);
        }
        set
    }

    /// Create a coordinate set from a raw bit value.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Check if the set contains a specific coordinate.
    pub fn contains(self, coordinate: usize) -> bool {
        coordinate < MAX_COORDINATES && (self.0 >> coordinate) & 1 != 0
    }

    /// Insert a coordinate into the set.
    ///
    /// # Panics
    ///
    /// Panics if `coordinate >= MAX_COORDINATES`.
    pub fn insert(&mut self, coordinate: usize) {
        assert!(
            coordinate < MAX_COORDINATES,
            "coordinate {} out of range",
            coordinate
        );
        self.0 |= 1 << coordinate;
    }

    /// Remove a coordinate from the set.
    pub fn remove(&mut self, coordinate: usize) {
        if coordinate < MAX_COORDINATES {
            self.0 &= !(1 << coordinate);
        }
    }

    /// Return a copy of this set with `coordinate` added.
    pub fn with(mut self, coordinate: usize) -> Self {
        self.insert(coordinate);
        self
    }

    /// Keep only the coordinates strictly below `bound`.
    pub fn below(self, bound: usize) -> Self {
        if bound >= MAX_COORDINATES {
            self
        } else {
            Self(self.0 & ((1u64 << bound) - 1))
        }
    }

    /// Largest coordinate in the set, if any.
    pub fn max_coordinate(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(63 - self.0.leading_zeros() as usize)
        }
    }

    /// Get the number of coordinates in the set (the projection order).
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Check if the set is empty.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying bitset value.
    pub fn bits(self) -> u64 {
        self.0
    }

    /// Iterate over all coordinates in the set, in ascending order.
    pub fn iter(self) -> impl Iterator<Item = usize> {
        CoordinateSetIter { bits: self.0 }
    }
}

/// Iterator over coordinates in a CoordinateSet.
struct CoordinateSetIter {
    bits: u64,
}

impl Iterator for CoordinateSetIter {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bits == 0 {
            return None;
        }
        let coordinate = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        Some(coordinate)
    }
}

impl fmt::Display for CoordinateSet {
    /// Format a coordinate set as "{0,2,5}".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (k, coordinate) in self.iter().enumerate() {
            if k > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", coordinate)?;
        }
        write!(f, "}}")
    }
}

impl From<&[usize]> for CoordinateSet {
    fn from(coordinates: &[usize]) -> Self {
        Self::from_coordinates(coordinates)
    }
}
