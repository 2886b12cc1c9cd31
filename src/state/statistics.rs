// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Statistics
//!
//! Counters kept by a search, incremented as candidates are evaluated.

use std::fmt;
use strum::EnumCount;
use strum_macros::{Display, EnumCount as EnumCountMacro, EnumIter};

#[derive(EnumCountMacro, EnumIter, Display, Debug, Copy, Clone, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum Counters {
    /// Candidates whose merit was computed, fully or partially.
    CandidatesEvaluated,
    /// Candidates abandoned by early abortion.
    CandidatesPruned,
    /// Candidates refused by the validity filter.
    CandidatesRejected,
    /// Coordinates scored by one fast batch.
    FastBatches,
    /// Coordinates committed.
    CoordinatesCommitted,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Statistics {
    stats: [u64; Counters::COUNT],
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    /// Increment the specified counter by 1.
    pub(crate) fn increment_counter(&mut self, counter: Counters) {
        self.add(counter, 1);
    }

    pub(crate) fn add(&mut self, counter: Counters, amount: u64) {
        self.stats[counter as usize] += amount;
    }

    /// Get the current value of the specified counter.
    pub fn get(&self, counter: Counters) -> u64 {
        self.stats[counter as usize]
    }

    /// Add every counter of `other` to this one.
    pub fn merge(&mut self, other: &Statistics) {
        for (mine, theirs) in self.stats.iter_mut().zip(other.stats.iter()) {
            *mine += theirs;
        }
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use strum::IntoEnumIterator;
        let mut first = true;
        for counter in Counters::iter() {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}={}", counter, self.get(counter))?;
        }
        Ok(())
    }
}
