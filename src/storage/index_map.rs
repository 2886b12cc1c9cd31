// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Index maps over the slots of a [`Storage`].

use super::Storage;

/// A pure map from indices `0..len()` to indices.
pub trait IndexMap {
    fn map(&self, i: usize) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialise the map.
    fn to_vec(&self) -> Vec<usize> {
        (0..self.len()).map(|i| self.map(i)).collect()
    }
}

/// Logical point index to physical slot.
#[derive(Debug, Clone, Copy)]
pub struct Unpermute<'a> {
    storage: &'a Storage,
}

impl<'a> Unpermute<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }
}

impl IndexMap for Unpermute<'_> {
    fn map(&self, i: usize) -> usize {
        self.storage.unpermute(i)
    }

    fn len(&self) -> usize {
        self.storage.virtual_size()
    }
}

/// Slot to kernel table index for one generator.
///
/// Reading `kernel_values[stride.map(j)]` for every slot `j` gives the
/// one-dimensional kernel evaluated at the new coordinate of each point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stride {
    targets: Vec<usize>,
}

impl Stride {
    pub(crate) fn new(targets: Vec<usize>) -> Self {
        Self { targets }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.targets
    }

    /// Gather `values` through this map.
    pub fn gather(&self, values: &[f64]) -> Vec<f64> {
        self.targets.iter().map(|&t| values[t]).collect()
    }
}

impl IndexMap for Stride {
    fn map(&self, i: usize) -> usize {
        self.targets[i]
    }

    fn len(&self) -> usize {
        self.targets.len()
    }
}
