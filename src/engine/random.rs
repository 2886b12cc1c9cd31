// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Random search: the best of many randomly drawn generator sequences.

use super::evaluate;
use super::{check_dimension, CancelToken, SearchResult};
use crate::context::SearchContext;
use crate::errors::SearchError;
use crate::genseq::GenSeq;
use crate::pointset::GenValue;
use crate::state::{Counters, Statistics};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, info};

/// Draws `samples` generator sequences uniformly from the candidates of
/// each coordinate and keeps the one of least merit.
///
/// Every sequence is drawn from one seeded generator before any is
/// scored, so the result depends on the seed only.
#[derive(Debug)]
pub struct RandomSearch {
    context: Arc<SearchContext>,
    dimension: usize,
    samples: usize,
    seed: u64,
    statistics: Statistics,
}

impl RandomSearch {
    pub fn new(
        context: Arc<SearchContext>,
        dimension: usize,
        samples: usize,
        seed: u64,
    ) -> Result<Self, SearchError> {
        check_dimension(dimension)?;
        context.supports_dimension(dimension)?;
        if samples == 0 {
            return Err(SearchError::configuration("random search needs samples"));
        }
        Ok(Self {
            context,
            dimension,
            samples,
            seed,
            statistics: Statistics::new(),
        })
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn run(&mut self, cancel: &CancelToken) -> Result<SearchResult, SearchError> {
        let sequences = self.draw()?;
        let best =
            evaluate::best_sequence(&self.context, &sequences, cancel, &mut self.statistics)?;
        debug!(statistics = %self.statistics, "random search statistics");
        let (index, state) = best.ok_or(SearchError::Exhausted {
            coordinate: self.dimension - 1,
        })?;
        let merit = self.context.merit(self.dimension, state.level_merits());
        let result = SearchResult::from_state(sequences[index].clone(), &state, merit);
        self.statistics
            .add(Counters::CoordinatesCommitted, self.dimension as u64);
        info!(sample = index, result = %result, "random search finished");
        Ok(result)
    }

    fn draw(&self) -> Result<Vec<Vec<GenValue>>, SearchError> {
        let seqs = (0..self.dimension)
            .map(|coordinate| {
                let seq = self.context.candidates(coordinate)?;
                if seq.is_empty() {
                    Err(SearchError::Exhausted { coordinate })
                } else {
                    Ok(seq)
                }
            })
            .collect::<Result<Vec<GenSeq>, SearchError>>()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok((0..self.samples)
            .map(|_| {
                seqs.iter()
                    .filter_map(|seq| seq.nth(rng.random_range(0..seq.len())))
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FigureOfMerit;
    use crate::engine::SearchOptions;
    use crate::kernel::KernelType;
    use crate::pointset::{PointSetConfiguration, SizeParam};
    use crate::weights::Weights;

    fn context(options: SearchOptions) -> Arc<SearchContext> {
        Arc::new(
            SearchContext::new(
                PointSetConfiguration::ordinary(),
                SizeParam::integer(61),
                FigureOfMerit::new(KernelType::PAlpha { alpha: 2 }, Weights::uniform_product(0.8)),
                options,
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_same_seed_same_result() {
        let ctx = context(SearchOptions::default());
        let a = RandomSearch::new(ctx.clone(), 4, 20, 7)
            .unwrap()
            .run(&CancelToken::new())
            .unwrap();
        let b = RandomSearch::new(ctx, 4, 20, 7)
            .unwrap()
            .run(&CancelToken::new())
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.generators.len(), 4);
        assert_eq!(a.generators[0], GenValue::Integer(1));
    }

    #[test]
    fn test_early_abortion_keeps_the_winner() {
        let plain = RandomSearch::new(context(SearchOptions::default()), 3, 40, 11)
            .unwrap()
            .run(&CancelToken::new())
            .unwrap();
        let mut pruning =
            RandomSearch::new(context(SearchOptions::default().early_abortion(true)), 3, 40, 11)
                .unwrap();
        let pruned = pruning.run(&CancelToken::new()).unwrap();
        assert_eq!(plain, pruned);
        assert_eq!(pruning.statistics().get(Counters::CandidatesEvaluated), 40);
    }

    #[test]
    fn test_all_rejected() {
        let ctx = context(SearchOptions::default().filter(|coordinate, _| coordinate == 0));
        let result = RandomSearch::new(ctx, 2, 5, 1)
            .unwrap()
            .run(&CancelToken::new());
        assert_eq!(result, Err(SearchError::Exhausted { coordinate: 1 }));
    }

    #[test]
    fn test_zero_samples_rejected() {
        assert!(RandomSearch::new(context(SearchOptions::default()), 2, 0, 1).is_err());
    }
}
