// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Search context: the immutable tier shared by every search.
//!
//! A search works on two tiers of data:
//! - Tier 1 ([`SearchContext`]): the storage, the kernel table, the weights,
//!   the merit filters and level combiner, the options and the worker
//!   pool. Built once,
//!   validated once, then only read, so candidate evaluations on different
//!   threads share it behind an `Arc`.
//! - Tier 2 ([`CoordUniformState`]): the accumulator of one partial point
//!   set. Each search node owns one and candidates read their parent's.
//!
//! Every configuration error is raised here, before any coordinate is
//! searched. Searches add a check of their dimension through
//! [`SearchContext::supports_dimension`].

use crate::algebra::CyclicGroup;
use crate::engine::{Exploration, LevelCombiner, MeritFilter, MeritFilters, SearchOptions};
use crate::errors::SearchError;
use crate::fast::FastCbc;
use crate::genseq::{CandidateOrder, GenSeq, NetConstruction};
use crate::kernel::{create_kernel, Kernel, KernelType};
use crate::pointset::{Compression, GenValue, LatticeKind, PointSetConfiguration, SizeParam};
use crate::state::CoordUniformState;
use crate::storage::Storage;
use crate::weights::Weights;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// What is minimised: kernel, weights and, for embedded point sets, the
/// per-level filters and the reduction of level merits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureOfMerit {
    pub kernel: KernelType,
    pub weights: Weights,
    #[serde(default)]
    pub combiner: LevelCombiner,
    /// Applied in order to the level merits, before the combiner.
    #[serde(default)]
    pub filters: Vec<MeritFilter>,
}

impl FigureOfMerit {
    pub fn new(kernel: KernelType, weights: Weights) -> Self {
        Self {
            kernel,
            weights,
            combiner: LevelCombiner::default(),
            filters: Vec::new(),
        }
    }

    pub fn with_combiner(mut self, combiner: LevelCombiner) -> Self {
        self.combiner = combiner;
        self
    }

    pub fn with_filter(mut self, filter: MeritFilter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// Immutable data of a search.
#[derive(Debug)]
pub struct SearchContext {
    storage: Arc<Storage>,
    kernel: Box<dyn Kernel>,
    kernel_values: Vec<f64>,
    weights: Arc<Weights>,
    combiner: LevelCombiner,
    filters: MeritFilters,
    options: SearchOptions,
    order: CandidateOrder,
    fast: Option<FastCbc>,
    pool: Option<ThreadPool>,
}

impl SearchContext {
    /// Validate every parameter and precompute the kernel table.
    ///
    /// Unless an order is requested, candidates are listed in cyclic group
    /// order whenever the units form a cyclic group, whatever the
    /// exploration. Fast exploration on a point set without cyclic
    /// structure is not an error: it logs a warning and candidates are
    /// scored naively.
    pub fn new(
        config: PointSetConfiguration,
        size: SizeParam,
        figure: FigureOfMerit,
        options: SearchOptions,
    ) -> Result<Self, SearchError> {
        let storage = Arc::new(Storage::new(config, size)?);
        let kernel = create_kernel(figure.kernel)?;
        if config.compression == Compression::Symmetric && !kernel.symmetric() {
            return Err(SearchError::configuration(format!(
                "kernel {} is not symmetric and cannot use symmetric compression",
                kernel.name()
            )));
        }
        figure.weights.validate()?;
        figure.combiner.validate(storage.num_levels())?;
        options.validate()?;
        if config.lattice != LatticeKind::Digital
            && options.construction != NetConstruction::Explicit
        {
            return Err(SearchError::configuration(format!(
                "{} construction only applies to digital nets",
                options.construction
            )));
        }
        options.construction.validate(&size)?;
        if let Some(values) = &options.candidates {
            for gen in values {
                check_candidate(&config, &size, gen)?;
            }
        }
        let weights = Arc::new(figure.weights);
        let filters = MeritFilters::new(figure.filters, figure.kernel, weights.clone(), &storage)?;

        let pool = options
            .threads
            .map(|n| ThreadPoolBuilder::new().num_threads(n).build())
            .transpose()
            .map_err(|e| SearchError::ThreadPool(e.to_string()))?;

        let order = resolve_order(&size, options.candidate_order);
        let fast = match options.exploration {
            Exploration::Naive => None,
            Exploration::Fast => match FastCbc::plan(storage.clone(), order) {
                Ok(plan) => Some(plan),
                Err(e) => {
                    warn!(reason = %e, "falling back to naive CBC");
                    None
                }
            },
        };

        let kernel_values = storage.kernel_values(&*kernel);
        let context = Self {
            storage,
            kernel,
            kernel_values,
            weights,
            combiner: figure.combiner,
            filters,
            options,
            order,
            fast,
            pool,
        };
        if context.options.candidates.is_none() {
            context.candidates(1)?;
        }
        debug!(
            config = %config,
            size = %size,
            kernel = %context.kernel.name(),
            order = %order,
            construction = %context.options.construction,
            fast = context.fast.is_some(),
            "search context ready"
        );
        Ok(context)
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    pub fn configuration(&self) -> &PointSetConfiguration {
        self.storage.configuration()
    }

    pub fn size_param(&self) -> &SizeParam {
        self.storage.size_param()
    }

    pub fn kernel(&self) -> &dyn Kernel {
        &*self.kernel
    }

    /// Kernel values indexed by stride target.
    pub fn kernel_values(&self) -> &[f64] {
        &self.kernel_values
    }

    pub fn weights(&self) -> &Arc<Weights> {
        &self.weights
    }

    pub fn combiner(&self) -> &LevelCombiner {
        &self.combiner
    }

    pub fn filters(&self) -> &MeritFilters {
        &self.filters
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Order in which lattice candidates are enumerated.
    pub fn candidate_order(&self) -> CandidateOrder {
        self.order
    }

    /// The fast CBC plan, when fast exploration is requested and possible.
    pub fn fast(&self) -> Option<&FastCbc> {
        self.fast.as_ref()
    }

    /// Candidates for `coordinate`.
    pub fn candidates(&self, coordinate: usize) -> Result<GenSeq, SearchError> {
        match (&self.options.candidates, self.options.construction) {
            (Some(values), _) if coordinate > 0 => Ok(GenSeq::explicit(values.clone())),
            (_, NetConstruction::Explicit) => GenSeq::create(
                self.configuration(),
                self.size_param(),
                coordinate,
                self.order,
            ),
            (_, construction) => GenSeq::net(construction, self.size_param(), coordinate),
        }
    }

    /// Check that every coordinate of a point set of `dimension`
    /// coordinates has candidates.
    ///
    /// Only Sobol candidates differ between coordinates; the others were
    /// checked when the context was built.
    pub fn supports_dimension(&self, dimension: usize) -> Result<(), SearchError> {
        let sobol = self.options.construction == NetConstruction::Sobol;
        if sobol && self.options.candidates.is_none() {
            for coordinate in 1..dimension {
                self.candidates(coordinate)?;
            }
        }
        Ok(())
    }

    pub fn accepts(&self, coordinate: usize, gen: &GenValue) -> bool {
        self.options.accepts(coordinate, gen)
    }

    /// Accumulator of the empty point set.
    pub fn initial_state(&self) -> CoordUniformState {
        CoordUniformState::new(self.storage.clone(), self.weights.clone())
    }

    /// Combiner applied to raw level merits.
    pub fn combine(&self, level_merits: &[f64]) -> f64 {
        self.combiner.combine(level_merits)
    }

    /// Merit of a point set of `dimension` coordinates: its level merits
    /// filtered, then combined.
    pub fn merit(&self, dimension: usize, level_merits: &[f64]) -> f64 {
        if self.filters.is_empty() {
            return self.combine(level_merits);
        }
        let mut merits = level_merits.to_vec();
        self.filters.apply(dimension, &mut merits);
        self.combine(&merits)
    }

    /// Run `op` on the dedicated pool if there is one, else on the global
    /// rayon pool.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// The requested order, else cyclic group order when the units modulo the
/// lattice size form a cyclic group.
fn resolve_order(size: &SizeParam, requested: Option<CandidateOrder>) -> CandidateOrder {
    let cyclic = size.modulus().and_then(CyclicGroup::find).is_some();
    match requested {
        Some(CandidateOrder::CyclicGroup) if !cyclic => {
            warn!(size = %size, "units are not cyclic, enumerating candidates in ascending order");
            CandidateOrder::Ascending
        }
        Some(order) => order,
        None if cyclic => CandidateOrder::CyclicGroup,
        None => CandidateOrder::Ascending,
    }
}

/// Check a caller-provided generator fits point sets of `size`.
fn check_candidate(
    config: &PointSetConfiguration,
    size: &SizeParam,
    gen: &GenValue,
) -> Result<(), SearchError> {
    match (config.lattice, gen, *size) {
        (LatticeKind::Integer, GenValue::Integer(_), _)
        | (LatticeKind::Polynomial, GenValue::Polynomial(_), _) => Ok(()),
        (LatticeKind::Digital, GenValue::Matrix(matrix), SizeParam::Digital { rows, cols }) => {
            if matrix.rows() != rows || matrix.cols() != cols {
                return Err(SearchError::configuration(format!(
                    "candidate matrix is {}x{}, the net needs {}x{}",
                    matrix.rows(),
                    matrix.cols(),
                    rows,
                    cols
                )));
            }
            if !matrix.has_full_column_rank() {
                return Err(SearchError::configuration(format!(
                    "candidate matrix {} does not have full column rank",
                    matrix
                )));
            }
            Ok(())
        }
        _ => Err(SearchError::configuration(format!(
            "candidate {} does not belong to a {} point set",
            gen, config.lattice
        ))),
    }
}
