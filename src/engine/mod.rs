// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Component-by-component search engine.
//!
//! The engine extends a point set one coordinate at a time. For coordinate
//! `s` it scores every admissible generator against the state of the first
//! `s` coordinates, keeps the one of least merit and commits it. Earlier
//! coordinates are never revisited.
//!
//! # Architecture
//!
//! [`CbcSearch`] is a state machine:
//!
//! ```text
//! Initial -> Extending{1} -> ... -> Extending{d-1} -> Done(result)
//!    \____________\______________________\_________-> Failed(error)
//! ```
//!
//! Each [`CbcSearch::step`] commits one coordinate. Candidates of one
//! coordinate are scored in parallel (rayon) against the shared, read-only
//! parent state; the only shared mutable object is the [`MinObserver`]
//! holding the best candidate so far. The winner is the least merit, ties
//! (up to [`TIE_TOLERANCE`]) going to the first candidate in enumeration
//! order, so the result depends neither on the thread count nor on the
//! exploration.
//!
//! With fast exploration the whole coordinate is scored at once by
//! [`FastCbc`](crate::fast::FastCbc) when the point set allows it.
//!
//! # Example
//!
//! ```
//! use lattice_cbc::context::FigureOfMerit;
//! use lattice_cbc::engine::{CancelToken, CbcSearch, SearchOptions};
//! use lattice_cbc::kernel::KernelType;
//! use lattice_cbc::pointset::{PointSetConfiguration, SizeParam};
//! use lattice_cbc::weights::Weights;
//!
//! let figure = FigureOfMerit::new(KernelType::PAlpha { alpha: 2 }, Weights::uniform_product(1.0));
//! let search = CbcSearch::new(
//!     PointSetConfiguration::ordinary(),
//!     SizeParam::integer(101),
//!     figure,
//!     3,
//!     SearchOptions::default().fast(),
//! )
//! .unwrap();
//!
//! // The search is consumed; an error reports the failing coordinate.
//! let result = search.run(&CancelToken::new()).unwrap();
//! assert_eq!(result.generators.len(), 3);
//! ```

pub mod cancel;
pub mod combiner;
mod evaluate;
pub mod filter;
pub mod korobov;
pub mod observer;
pub mod options;
pub mod random;

pub use cancel::CancelToken;
pub use combiner::{LevelCombiner, LevelWeights};
pub use filter::{MeritFilter, MeritFilters, Norm};
pub use korobov::KorobovSearch;
pub use observer::{Best, MinObserver, TIE_TOLERANCE};
pub use options::{CandidateFilter, Exploration, SearchOptions};
pub use random::RandomSearch;

use crate::algebra::MAX_COORDINATES;
use crate::context::{FigureOfMerit, SearchContext};
use crate::errors::SearchError;
use crate::pointset::{GenValue, PointSetConfiguration, SizeParam};
use crate::state::{CoordUniformState, Counters, Statistics};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a successful search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// One generator per coordinate.
    pub generators: Vec<GenValue>,
    /// Combined merit of the point set.
    pub merit: f64,
    /// Merit at each embedding level.
    pub level_merits: Vec<f64>,
    pub num_points: u64,
}

impl SearchResult {
    fn from_state(generators: Vec<GenValue>, state: &CoordUniformState, merit: f64) -> Self {
        Self {
            generators,
            merit,
            level_merits: state.level_merits().to_vec(),
            num_points: state.storage().size_param().num_points(),
        }
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n={} (", self.num_points)?;
        for (i, gen) in self.generators.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", gen)?;
        }
        write!(f, ") merit={:e}", self.merit)
    }
}

/// Where a [`CbcSearch`] is.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    /// No coordinate committed yet.
    Initial,
    /// `dimension` coordinates committed, more to go.
    Extending { dimension: usize },
    Done(SearchResult),
    Failed(SearchError),
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchState::Done(_) | SearchState::Failed(_))
    }
}

/// The partial point set built so far.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub generators: Vec<GenValue>,
    pub state: CoordUniformState,
    /// Filtered and combined merit of `state`.
    pub merit: f64,
}

/// Component-by-component search for a point set of `dimension`
/// coordinates.
#[derive(Debug)]
pub struct CbcSearch {
    context: Arc<SearchContext>,
    dimension: usize,
    status: SearchState,
    node: SearchNode,
    statistics: Statistics,
}

impl CbcSearch {
    /// Validate the parameters and prepare a search.
    ///
    /// Every configuration error is reported here; see
    /// [`SearchContext::new`].
    pub fn new(
        config: PointSetConfiguration,
        size: SizeParam,
        figure: FigureOfMerit,
        dimension: usize,
        options: SearchOptions,
    ) -> Result<Self, SearchError> {
        let context = SearchContext::new(config, size, figure, options)?;
        Self::with_context(Arc::new(context), dimension)
    }

    /// Prepare a search sharing an existing context.
    pub fn with_context(
        context: Arc<SearchContext>,
        dimension: usize,
    ) -> Result<Self, SearchError> {
        check_dimension(dimension)?;
        context.supports_dimension(dimension)?;
        let node = SearchNode {
            generators: Vec::with_capacity(dimension),
            state: context.initial_state(),
            merit: 0.0,
        };
        Ok(Self {
            context,
            dimension,
            status: SearchState::Initial,
            node,
            statistics: Statistics::new(),
        })
    }

    pub fn status(&self) -> &SearchState {
        &self.status
    }

    pub fn node(&self) -> &SearchNode {
        &self.node
    }

    pub fn context(&self) -> &Arc<SearchContext> {
        &self.context
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Commit the next coordinate.
    ///
    /// Does nothing once the search is done or failed.
    pub fn step(&mut self, cancel: &CancelToken) -> &SearchState {
        if self.status.is_terminal() {
            return &self.status;
        }
        self.status = match self.extend(cancel) {
            Ok(()) => {
                let committed = self.node.generators.len();
                if committed == self.dimension {
                    SearchState::Done(SearchResult::from_state(
                        self.node.generators.clone(),
                        &self.node.state,
                        self.node.merit,
                    ))
                } else {
                    SearchState::Extending {
                        dimension: committed,
                    }
                }
            }
            Err(e) => SearchState::Failed(e),
        };
        &self.status
    }

    /// Step until the search is done or fails.
    pub fn run(mut self, cancel: &CancelToken) -> Result<SearchResult, SearchError> {
        while !self.status.is_terminal() {
            self.step(cancel);
        }
        debug!(statistics = %self.statistics, "search statistics");
        match self.status {
            SearchState::Done(result) => {
                info!(result = %result, "search finished");
                Ok(result)
            }
            SearchState::Failed(e) => {
                info!(error = %e, "search failed");
                Err(e)
            }
            SearchState::Initial | SearchState::Extending { .. } => {
                unreachable!("search stopped in a non-terminal state")
            }
        }
    }

    fn extend(&mut self, cancel: &CancelToken) -> Result<(), SearchError> {
        let coordinate = self.node.generators.len();
        let mut stats = Statistics::new();
        let winner = evaluate::best_candidate(
            &self.context,
            &self.node.state,
            coordinate,
            cancel,
            &mut stats,
        );
        debug!(coordinate, statistics = %stats, "coordinate scored");
        self.statistics.merge(&stats);
        let winner = winner?.ok_or(SearchError::Exhausted { coordinate })?;

        self.node
            .state
            .update(self.context.kernel_values(), &winner.gen);
        self.node.merit = self
            .context
            .merit(coordinate + 1, self.node.state.level_merits());
        info!(
            coordinate,
            index = winner.index,
            generator = %winner.gen,
            merit = self.node.merit,
            "coordinate committed"
        );
        self.node.generators.push(winner.gen);
        self.statistics
            .increment_counter(Counters::CoordinatesCommitted);
        Ok(())
    }
}

fn check_dimension(dimension: usize) -> Result<(), SearchError> {
    if dimension == 0 || dimension > MAX_COORDINATES {
        return Err(SearchError::configuration(format!(
            "dimension {} outside 1..={}",
            dimension, MAX_COORDINATES
        )));
    }
    Ok(())
}
