// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Candidate scoring.
//!
//! One coordinate at a time for CBC, whole generator sequences for random
//! and Korobov searches. Both prune against a [`MinObserver`] threshold
//! when early abortion is on: merit increments are non-negative and
//! filters and combiners are monotone, so a partial merit above the best
//! complete one can only grow.
//!
//! Every merit is filtered for the dimension of the complete point set,
//! so partial and complete merits compare on one scale.

use super::{CancelToken, MinObserver};
use crate::context::SearchContext;
use crate::errors::SearchError;
use crate::pointset::GenValue;
use crate::state::{increments, CoordUniformState, Counters, Statistics};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) enum Score {
    Complete(Vec<f64>),
    Pruned,
    Cancelled,
}

/// The least-merit candidate of one coordinate.
#[derive(Debug, Clone)]
pub(crate) struct Winner {
    pub index: usize,
    pub gen: GenValue,
    pub merit: f64,
}

/// Level merits of `parent` extended by `gen`, reduced one level at a time.
///
/// `q` is the weighted state of `parent`. With an observer, the candidate
/// is dropped as soon as its merit, counting the levels not yet reduced at
/// their parent values, exceeds the observer's threshold.
pub(crate) fn score_candidate<P>(
    ctx: &SearchContext,
    parent: &CoordUniformState,
    q: &[f64],
    gen: &GenValue,
    observer: Option<&MinObserver<P>>,
    cancel: &CancelToken,
) -> Score {
    let storage = ctx.storage();
    let stride = storage.stride(gen);
    let targets = stride.as_slice();
    let kernel_values = ctx.kernel_values();
    let base = parent.level_merits();
    let dimension = parent.dimension() + 1;
    let mut merits = base.to_vec();
    let last = merits.len() - 1;
    for (level, inc) in increments(storage, q, |j| kernel_values[targets[j]]).enumerate() {
        merits[level] = base[level] + inc;
        if level == last {
            break;
        }
        if cancel.is_cancelled() {
            return Score::Cancelled;
        }
        if let Some(observer) = observer {
            if ctx.merit(dimension, &merits) > observer.threshold() {
                return Score::Pruned;
            }
        }
    }
    Score::Complete(merits)
}

/// Score every candidate of `coordinate` against `parent` and return the
/// one of least merit, ties going to the first in enumeration order.
///
/// Returns `Ok(None)` if every candidate was rejected.
pub(crate) fn best_candidate(
    ctx: &SearchContext,
    parent: &CoordUniformState,
    coordinate: usize,
    cancel: &CancelToken,
    stats: &mut Statistics,
) -> Result<Option<Winner>, SearchError> {
    let seq = ctx.candidates(coordinate)?;
    let dimension = parent.dimension() + 1;
    let q = parent.weighted_state();
    let observer = MinObserver::new();

    match ctx.fast() {
        Some(plan) if seq.is_cyclic() => {
            let all = plan
                .evaluate_all_candidates(
                    ctx.kernel_values(),
                    &q,
                    parent.level_merits(),
                    seq.len(),
                    cancel,
                )
                .ok_or(SearchError::Cancelled { coordinate })?;
            stats.increment_counter(Counters::FastBatches);
            for (index, (gen, merits)) in seq.iter().zip(all).enumerate() {
                if !ctx.accepts(coordinate, &gen) {
                    stats.increment_counter(Counters::CandidatesRejected);
                    continue;
                }
                stats.increment_counter(Counters::CandidatesEvaluated);
                observer.observe(ctx.merit(dimension, &merits), index, gen);
            }
        }
        _ => {
            let candidates = seq.to_vec();
            let evaluated = AtomicU64::new(0);
            let pruned = AtomicU64::new(0);
            let rejected = AtomicU64::new(0);
            let bound = ctx.options().early_abortion.then_some(&observer);
            let outcome = ctx.install(|| {
                candidates
                    .par_iter()
                    .enumerate()
                    .try_for_each(|(index, gen)| {
                        if cancel.is_cancelled() {
                            return Err(SearchError::Cancelled { coordinate });
                        }
                        if !ctx.accepts(coordinate, gen) {
                            rejected.fetch_add(1, Ordering::Relaxed);
                            return Ok(());
                        }
                        evaluated.fetch_add(1, Ordering::Relaxed);
                        match score_candidate(ctx, parent, &q, gen, bound, cancel) {
                            Score::Complete(merits) => {
                                let merit = ctx.merit(dimension, &merits);
                                observer.observe(merit, index, gen.clone());
                                Ok(())
                            }
                            Score::Pruned => {
                                pruned.fetch_add(1, Ordering::Relaxed);
                                Ok(())
                            }
                            Score::Cancelled => Err(SearchError::Cancelled { coordinate }),
                        }
                    })
            });
            stats.add(Counters::CandidatesEvaluated, evaluated.into_inner());
            stats.add(Counters::CandidatesPruned, pruned.into_inner());
            stats.add(Counters::CandidatesRejected, rejected.into_inner());
            outcome?;
        }
    }

    Ok(observer.into_best().map(|best| Winner {
        index: best.index,
        gen: best.payload,
        merit: best.merit,
    }))
}

pub(crate) enum SequenceScore {
    Complete(CoordUniformState),
    Rejected,
    Pruned,
    Cancelled,
}

/// Accumulate a whole generator sequence from the empty point set.
///
/// With an observer, the sequence is dropped after any coordinate whose
/// partial merit already exceeds the threshold.
pub(crate) fn score_sequence<P>(
    ctx: &SearchContext,
    gens: &[GenValue],
    observer: Option<&MinObserver<P>>,
    cancel: &CancelToken,
) -> SequenceScore {
    let mut state = ctx.initial_state();
    let dimension = gens.len();
    for (coordinate, gen) in gens.iter().enumerate() {
        if cancel.is_cancelled() {
            return SequenceScore::Cancelled;
        }
        if !ctx.accepts(coordinate, gen) {
            return SequenceScore::Rejected;
        }
        state.update(ctx.kernel_values(), gen);
        if coordinate + 1 < dimension {
            if let Some(observer) = observer {
                if ctx.merit(dimension, state.level_merits()) > observer.threshold() {
                    return SequenceScore::Pruned;
                }
            }
        }
    }
    SequenceScore::Complete(state)
}

/// Score many sequences in parallel and keep the best.
///
/// Returns the winning sequence with its final state, or `None` if every
/// sequence was rejected.
pub(crate) fn best_sequence(
    ctx: &SearchContext,
    sequences: &[Vec<GenValue>],
    cancel: &CancelToken,
    stats: &mut Statistics,
) -> Result<Option<(usize, CoordUniformState)>, SearchError> {
    let observer = MinObserver::new();
    let evaluated = AtomicU64::new(0);
    let pruned = AtomicU64::new(0);
    let rejected = AtomicU64::new(0);
    let bound = ctx.options().early_abortion.then_some(&observer);
    let coordinate = sequences.first().map_or(0, |s| s.len().saturating_sub(1));
    let outcome = ctx.install(|| {
        sequences
            .par_iter()
            .enumerate()
            .try_for_each(|(index, gens)| {
                if cancel.is_cancelled() {
                    return Err(SearchError::Cancelled { coordinate });
                }
                evaluated.fetch_add(1, Ordering::Relaxed);
                match score_sequence(ctx, gens, bound, cancel) {
                    SequenceScore::Complete(state) => {
                        let merit = ctx.merit(gens.len(), state.level_merits());
                        observer.observe(merit, index, state);
                        Ok(())
                    }
                    SequenceScore::Rejected => {
                        rejected.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    }
                    SequenceScore::Pruned => {
                        pruned.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    }
                    SequenceScore::Cancelled => Err(SearchError::Cancelled { coordinate }),
                }
            })
    });
    stats.add(Counters::CandidatesEvaluated, evaluated.into_inner());
    stats.add(Counters::CandidatesPruned, pruned.into_inner());
    stats.add(Counters::CandidatesRejected, rejected.into_inner());
    outcome?;
    Ok(observer.into_best().map(|best| (best.index, best.payload)))
}
