// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Korobov search: lattices generated by `(1, a, a^2, ..., a^(d-1))`.

use super::evaluate;
use super::{check_dimension, CancelToken, SearchResult};
use crate::context::SearchContext;
use crate::errors::SearchError;
use crate::genseq::residue_value;
use crate::pointset::GenValue;
use crate::state::{Counters, Statistics};
use std::sync::Arc;
use tracing::{debug, info};

/// Scores the Korobov sequence of every candidate `a` of the second
/// coordinate and keeps the one of least merit.
#[derive(Debug)]
pub struct KorobovSearch {
    context: Arc<SearchContext>,
    dimension: usize,
    statistics: Statistics,
}

impl KorobovSearch {
    /// Korobov sequences only exist for integer and polynomial lattices.
    pub fn new(context: Arc<SearchContext>, dimension: usize) -> Result<Self, SearchError> {
        check_dimension(dimension)?;
        context.supports_dimension(dimension)?;
        if context.storage().modulus().is_none() {
            return Err(SearchError::configuration(format!(
                "Korobov search needs a lattice, not a {} point set",
                context.configuration().lattice
            )));
        }
        Ok(Self {
            context,
            dimension,
            statistics: Statistics::new(),
        })
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn run(&mut self, cancel: &CancelToken) -> Result<SearchResult, SearchError> {
        let sequences = self.sequences()?;
        let best =
            evaluate::best_sequence(&self.context, &sequences, cancel, &mut self.statistics)?;
        debug!(statistics = %self.statistics, "Korobov search statistics");
        let (index, state) = best.ok_or(SearchError::Exhausted {
            coordinate: self.dimension.min(2) - 1,
        })?;
        let merit = self.context.merit(self.dimension, state.level_merits());
        let result = SearchResult::from_state(sequences[index].clone(), &state, merit);
        self.statistics
            .add(Counters::CoordinatesCommitted, self.dimension as u64);
        info!(result = %result, "Korobov search finished");
        Ok(result)
    }

    /// `(1, a, a^2, ...)` reduced modulo the lattice modulus, for every
    /// candidate `a`.
    fn sequences(&self) -> Result<Vec<Vec<GenValue>>, SearchError> {
        let modulus = self
            .context
            .storage()
            .modulus()
            .ok_or_else(|| SearchError::configuration("Korobov search needs a lattice"))?;
        let bases = self.context.candidates(1)?;
        let sequences: Vec<Vec<GenValue>> = bases
            .iter()
            .filter_map(|gen| gen.residue())
            .map(|a| {
                (0..self.dimension as u64)
                    .map(|j| residue_value(modulus, modulus.pow(a, j)))
                    .collect()
            })
            .collect();
        if sequences.is_empty() {
            return Err(SearchError::Exhausted { coordinate: 1 });
        }
        Ok(sequences)
    }
}
