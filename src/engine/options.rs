// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Search options.

use crate::errors::SearchError;
use crate::genseq::{CandidateOrder, NetConstruction};
use crate::pointset::GenValue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use strum_macros::{Display, EnumString};

/// Caller-supplied validity test on `(coordinate, generator)`.
pub type CandidateFilter = Arc<dyn Fn(usize, &GenValue) -> bool + Send + Sync>;

/// How the candidates of one coordinate are scored.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Exploration {
    /// One stride and inner product per candidate.
    #[default]
    Naive,
    /// Every candidate at once by cyclic correlation, when the point set
    /// allows it.
    Fast,
}

/// Tunables of a search, built with chained setters.
///
/// ```
/// use lattice_cbc::engine::SearchOptions;
///
/// let options = SearchOptions::default().fast().threads(4).early_abortion(true);
/// assert_eq!(options.threads, Some(4));
/// ```
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    pub exploration: Exploration,
    /// Candidate order; `None` uses cyclic group order whenever the units
    /// form a cyclic group, so that every exploration sees the same order.
    pub candidate_order: Option<CandidateOrder>,
    /// Prune candidates whose partial merit already exceeds the best.
    /// Requires non-negative merit increments.
    pub early_abortion: bool,
    /// Size of a dedicated worker pool; `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Generators tried for every coordinate but the first, replacing the
    /// enumerated ones.
    pub candidates: Option<Vec<GenValue>>,
    /// Matrix family of digital nets.
    #[serde(default)]
    pub construction: NetConstruction,
    #[serde(skip)]
    pub filter: Option<CandidateFilter>,
}

impl fmt::Debug for SearchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchOptions")
            .field("exploration", &self.exploration)
            .field("candidate_order", &self.candidate_order)
            .field("early_abortion", &self.early_abortion)
            .field("threads", &self.threads)
            .field("candidates", &self.candidates.as_ref().map(Vec::len))
            .field("construction", &self.construction)
            .field("filter", &self.filter.is_some())
            .finish()
    }
}

impl SearchOptions {
    pub fn fast(mut self) -> Self {
        self.exploration = Exploration::Fast;
        self
    }

    pub fn naive(mut self) -> Self {
        self.exploration = Exploration::Naive;
        self
    }

    pub fn order(mut self, order: CandidateOrder) -> Self {
        self.candidate_order = Some(order);
        self
    }

    pub fn early_abortion(mut self, enabled: bool) -> Self {
        self.early_abortion = enabled;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn candidates(mut self, candidates: Vec<GenValue>) -> Self {
        self.candidates = Some(candidates);
        self
    }

    pub fn construction(mut self, construction: NetConstruction) -> Self {
        self.construction = construction;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(usize, &GenValue) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Whether the filter, if any, admits `gen` at `coordinate`.
    pub fn accepts(&self, coordinate: usize, gen: &GenValue) -> bool {
        self.filter.as_ref().map_or(true, |f| f(coordinate, gen))
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.threads == Some(0) {
            return Err(SearchError::configuration("thread count must be positive"));
        }
        if self.candidates.as_ref().is_some_and(Vec::is_empty) {
            return Err(SearchError::configuration("explicit candidate list is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_and_defaults() {
        let options = SearchOptions::default();
        assert_eq!(options.exploration, Exploration::Naive);
        assert_eq!(options.candidate_order, None);
        assert_eq!(options.construction, NetConstruction::Explicit);
        assert!(!options.early_abortion);

        let options = options.fast().threads(2).early_abortion(true);
        assert_eq!(options.exploration, Exploration::Fast);
        assert_eq!(options.threads, Some(2));
        assert!(options.early_abortion);

        let options = options
            .order(CandidateOrder::Ascending)
            .construction(NetConstruction::Sobol);
        assert_eq!(options.candidate_order, Some(CandidateOrder::Ascending));
        assert_eq!(options.construction, NetConstruction::Sobol);
    }

    #[test]
    fn test_filter() {
        let options = SearchOptions::default();
        assert!(options.accepts(1, &GenValue::Integer(4)));
        let options = options.filter(|_, gen| gen.residue() != Some(4));
        assert!(!options.accepts(1, &GenValue::Integer(4)));
        assert!(options.accepts(1, &GenValue::Integer(5)));
        assert!(format!("{:?}", options).contains("filter: true"));
    }

    #[test]
    fn test_validation() {
        assert!(SearchOptions::default().threads(0).validate().is_err());
        assert!(SearchOptions::default().candidates(vec![]).validate().is_err());
        assert!(SearchOptions::default().threads(1).validate().is_ok());
    }

    #[test]
    fn test_serde_skips_filter() {
        let options = SearchOptions::default()
            .fast()
            .early_abortion(true)
            .filter(|_, _| false);
        let json = serde_json::to_string(&options).unwrap();
        assert!(json.contains("\"exploration\":\"fast\""));
        let back: SearchOptions = serde_json::from_str(&json).unwrap();
        assert!(back.filter.is_none());
        assert!(back.early_abortion);
    }
}
