// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Point set configuration, size parameters and generator values.
//!
//! A search is parameterised by four independent axes (lattice kind,
//! embedding, compression, per-level order) fixed once in a
//! [`PointSetConfiguration`], and by a [`SizeParam`] describing how many points
//! the set has. Each coordinate of the point set is defined by one
//! [`GenValue`].
//!
//! ```
//! use lattice_cbc::pointset::{PointSetConfiguration, SizeParam};
//!
//! let config: PointSetConfiguration = "integer/single-level/symmetric/basic".parse().unwrap();
//! assert!(config.check(&SizeParam::integer(101)).is_ok());
//! ```

pub mod gen_value;
pub mod size_param;

pub use gen_value::{GenValue, GeneratingMatrix};
pub use size_param::{SizeParam, MAX_POINTS};

use crate::errors::SearchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumString};

/// Kind of point set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LatticeKind {
    /// Rank-1 lattice rule modulo an integer.
    Integer,
    /// Polynomial lattice rule over GF(2).
    Polynomial,
    /// Digital net in base 2 given by generating matrices.
    Digital,
}

/// Whether the point set is scored on its own or as a family of nested sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Embedding {
    SingleLevel,
    MultiLevel,
}

/// Index-space compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    /// Fold points i and n - i onto one slot (requires a symmetric kernel).
    Symmetric,
}

/// Storage order of the points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LevelOrder {
    /// Natural point order. Embedded lattices list each level block in
    /// ascending order.
    Basic,
    /// Points grouped by embedding level, each level in cyclic-group order.
    Cyclic,
}

/// Immutable description of the point set family being searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PointSetConfiguration {
    pub lattice: LatticeKind,
    pub embedding: Embedding,
    pub compression: Compression,
    pub level_order: LevelOrder,
}

impl PointSetConfiguration {
    pub fn new(
        lattice: LatticeKind,
        embedding: Embedding,
        compression: Compression,
        level_order: LevelOrder,
    ) -> Self {
        Self {
            lattice,
            embedding,
            compression,
            level_order,
        }
    }

    /// Single-level integer lattice, uncompressed, natural order.
    pub fn ordinary() -> Self {
        Self::new(
            LatticeKind::Integer,
            Embedding::SingleLevel,
            Compression::None,
            LevelOrder::Basic,
        )
    }

    /// Single-level polynomial lattice in natural order.
    pub fn polynomial() -> Self {
        Self::new(
            LatticeKind::Polynomial,
            Embedding::SingleLevel,
            Compression::None,
            LevelOrder::Basic,
        )
    }

    /// Single-level digital net.
    pub fn digital() -> Self {
        Self::new(
            LatticeKind::Digital,
            Embedding::SingleLevel,
            Compression::None,
            LevelOrder::Basic,
        )
    }

    pub fn with_embedding(mut self, embedding: Embedding) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_level_order(mut self, level_order: LevelOrder) -> Self {
        self.level_order = level_order;
        self
    }

    pub fn is_multilevel(&self) -> bool {
        self.embedding == Embedding::MultiLevel
    }

    /// Check that this configuration can be combined with `size`.
    pub fn check(&self, size: &SizeParam) -> Result<(), SearchError> {
        size.validate()?;
        if size.lattice_kind() != self.lattice {
            return Err(SearchError::configuration(format!(
                "{} lattice cannot use size parameter {}",
                self.lattice, size
            )));
        }
        if self.compression == Compression::Symmetric && self.lattice != LatticeKind::Integer {
            return Err(SearchError::configuration(
                "symmetric compression is only available for integer lattices",
            ));
        }
        match self.lattice {
            LatticeKind::Digital => {
                if self.level_order != LevelOrder::Basic {
                    return Err(SearchError::configuration(
                        "digital nets are stored in basic (Gray code) order",
                    ));
                }
            }
            LatticeKind::Integer | LatticeKind::Polynomial => {
                let blocked = self.is_multilevel() || self.level_order == LevelOrder::Cyclic;
                if blocked && !size.has_prime_base() {
                    return Err(SearchError::configuration(format!(
                        "{} {} lattices require a prime base, got {}",
                        self.embedding, self.level_order, size
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for PointSetConfiguration {
    /// Format as "lattice/embedding/compression/order".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.lattice, self.embedding, self.compression, self.level_order
        )
    }
}

impl FromStr for PointSetConfiguration {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 4 {
            return Err(SearchError::configuration(format!(
                "expected lattice/embedding/compression/order, got {:?}",
                s
            )));
        }
        let bad = |what: &str, value: &str| {
            SearchError::configuration(format!("unknown {} {:?}", what, value))
        };
        Ok(Self {
            lattice: parts[0].parse().map_err(|_| bad("lattice kind", parts[0]))?,
            embedding: parts[1].parse().map_err(|_| bad("embedding", parts[1]))?,
            compression: parts[2].parse().map_err(|_| bad("compression", parts[2]))?,
            level_order: parts[3].parse().map_err(|_| bad("level order", parts[3]))?,
        })
    }
}
