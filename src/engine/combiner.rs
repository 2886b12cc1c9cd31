// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Reduction of per-level merits of an embedded point set to one scalar.

use crate::errors::SearchError;
use serde::{Deserialize, Serialize};

/// Per-level factors of a [`LevelCombiner`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LevelWeights {
    /// Every level weighs 1.
    Uniform,
    /// Levels `min..=max` weigh 1, the others 0.
    Select { min: usize, max: usize },
    /// One factor per level.
    Explicit(Vec<f64>),
}

impl LevelWeights {
    pub fn select(min: usize, max: usize) -> Self {
        LevelWeights::Select { min, max }
    }

    pub fn factor(&self, level: usize) -> f64 {
        match self {
            LevelWeights::Uniform => 1.0,
            LevelWeights::Select { min, max } => {
                if (*min..=*max).contains(&level) {
                    1.0
                } else {
                    0.0
                }
            }
            LevelWeights::Explicit(factors) => factors.get(level).copied().unwrap_or(0.0),
        }
    }

    fn validate(&self, num_levels: usize) -> Result<(), SearchError> {
        match self {
            LevelWeights::Uniform => Ok(()),
            LevelWeights::Select { min, max } => {
                if min > max || *max >= num_levels {
                    Err(SearchError::configuration(format!(
                        "level range {}..={} outside 0..{}",
                        min, max, num_levels
                    )))
                } else {
                    Ok(())
                }
            }
            LevelWeights::Explicit(factors) => {
                if factors.len() != num_levels {
                    return Err(SearchError::configuration(format!(
                        "{} level weights given for {} levels",
                        factors.len(),
                        num_levels
                    )));
                }
                if factors.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(SearchError::configuration(
                        "level weights must be finite and non-negative",
                    ));
                }
                if factors.iter().all(|&w| w == 0.0) {
                    return Err(SearchError::configuration("every level weight is zero"));
                }
                Ok(())
            }
        }
    }
}

/// How the level merits of a point set combine into its merit.
///
/// Every combiner is non-decreasing in each level merit, which early
/// abortion relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LevelCombiner {
    /// Merit of the largest point set.
    #[default]
    Highest,
    /// Merit of one level.
    Level(usize),
    /// Weighted sum over levels.
    Sum(LevelWeights),
    /// Weighted maximum over levels.
    Max(LevelWeights),
}

impl LevelCombiner {
    pub fn validate(&self, num_levels: usize) -> Result<(), SearchError> {
        match self {
            LevelCombiner::Highest => Ok(()),
            LevelCombiner::Level(level) => {
                if *level < num_levels {
                    Ok(())
                } else {
                    Err(SearchError::configuration(format!(
                        "level {} outside 0..{}",
                        level, num_levels
                    )))
                }
            }
            LevelCombiner::Sum(weights) | LevelCombiner::Max(weights) => {
                weights.validate(num_levels)
            }
        }
    }

    pub fn combine(&self, merits: &[f64]) -> f64 {
        match self {
            LevelCombiner::Highest => merits.last().copied().unwrap_or(0.0),
            LevelCombiner::Level(level) => merits[*level],
            LevelCombiner::Sum(weights) => merits
                .iter()
                .enumerate()
                .filter(|(l, _)| weights.factor(*l) != 0.0)
                .map(|(l, m)| weights.factor(l) * m)
                .sum(),
            LevelCombiner::Max(weights) => merits
                .iter()
                .enumerate()
                .filter(|(l, _)| weights.factor(*l) != 0.0)
                .map(|(l, m)| weights.factor(l) * m)
                .fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERITS: [f64; 4] = [4.0, 3.0, 1.0, 2.0];

    #[test]
    fn test_combiners() {
        assert_eq!(LevelCombiner::Highest.combine(&MERITS), 2.0);
        assert_eq!(LevelCombiner::Level(1).combine(&MERITS), 3.0);
        assert_eq!(LevelCombiner::Sum(LevelWeights::Uniform).combine(&MERITS), 10.0);
        assert_eq!(
            LevelCombiner::Sum(LevelWeights::select(2, 3)).combine(&MERITS),
            3.0
        );
        assert_eq!(
            LevelCombiner::Max(LevelWeights::select(1, 3)).combine(&MERITS),
            3.0
        );
        assert_eq!(
            LevelCombiner::Max(LevelWeights::Explicit(vec![0.0, 0.0, 5.0, 1.0])).combine(&MERITS),
            5.0
        );
    }

    #[test]
    fn test_unselected_levels_may_be_infinite() {
        let merits = [f64::INFINITY, 3.0, 1.0, 2.0];
        assert_eq!(
            LevelCombiner::Sum(LevelWeights::select(1, 3)).combine(&merits),
            6.0
        );
        assert_eq!(
            LevelCombiner::Max(LevelWeights::select(1, 3)).combine(&merits),
            3.0
        );
    }

    #[test]
    fn test_validation() {
        assert!(LevelCombiner::Level(4).validate(4).is_err());
        assert!(LevelCombiner::Level(3).validate(4).is_ok());
        assert!(LevelCombiner::Sum(LevelWeights::select(2, 1)).validate(4).is_err());
        assert!(LevelCombiner::Sum(LevelWeights::select(1, 4)).validate(4).is_err());
        assert!(LevelCombiner::Max(LevelWeights::Explicit(vec![1.0])).validate(4).is_err());
        assert!(LevelCombiner::Max(LevelWeights::Explicit(vec![0.0; 2])).validate(2).is_err());
        assert!(LevelCombiner::Highest.validate(1).is_ok());
    }
}
