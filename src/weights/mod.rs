// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Projection weights `γ_u`.
//!
//! Weights are a tagged union over the usual models. The accumulator in
//! [`crate::state`] reads them through [`Weights::weight`] and
//! [`Weights::level_weights`], and specialises its storage per variant.
//!
//! ```
//! use lattice_cbc::algebra::CoordinateSet;
//! use lattice_cbc::weights::Weights;
//!
//! let w = Weights::product(vec![0.5, 0.25], 0.0);
//! assert_eq!(w.weight(CoordinateSet::from_coordinates(&[0, 1])), 0.125);
//! ```

use crate::algebra::CoordinateSet;
use crate::errors::SearchError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `Γ_k` for projections of order `k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderWeights {
    /// Weight of orders beyond `orders`.
    pub default: f64,
    /// `orders[k - 1]` is `Γ_k`.
    pub orders: Vec<f64>,
}

impl OrderWeights {
    pub fn new(orders: Vec<f64>, default: f64) -> Self {
        Self { default, orders }
    }

    /// `Γ_order`; zero for the empty projection.
    pub fn get(&self, order: usize) -> f64 {
        match order {
            0 => 0.0,
            k => self.orders.get(k - 1).copied().unwrap_or(self.default),
        }
    }

    /// Largest order with a non-zero weight, `None` when unbounded.
    pub fn max_order(&self) -> Option<usize> {
        if self.default != 0.0 {
            return None;
        }
        Some(
            self.orders
                .iter()
                .rposition(|&w| w != 0.0)
                .map_or(0, |k| k + 1),
        )
    }
}

/// `γ_j` per coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductWeights {
    /// Weight of coordinates beyond `coordinates`.
    pub default: f64,
    pub coordinates: Vec<f64>,
}

impl ProductWeights {
    pub fn new(coordinates: Vec<f64>, default: f64) -> Self {
        Self {
            default,
            coordinates,
        }
    }

    pub fn get(&self, coordinate: usize) -> f64 {
        self.coordinates
            .get(coordinate)
            .copied()
            .unwrap_or(self.default)
    }

    /// `Π_{j∈u} γ_j`.
    pub fn product(&self, u: CoordinateSet) -> f64 {
        u.iter().map(|j| self.get(j)).product()
    }
}

/// Weight model of a figure of merit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Weights {
    /// `γ_u = Γ_|u|`.
    OrderDependent(OrderWeights),
    /// `γ_u = Π_{j∈u} γ_j`.
    Product(ProductWeights),
    /// Product and order dependent: `γ_u = Γ_|u| Π_{j∈u} γ_j`.
    Pod {
        order: OrderWeights,
        product: ProductWeights,
    },
    /// Explicit weights; unlisted projections weigh zero.
    ProjectionDependent {
        weights: BTreeMap<CoordinateSet, f64>,
    },
    /// Sum of the member models.
    Combined { members: Vec<Weights> },
}

impl Weights {
    pub fn order_dependent(orders: Vec<f64>, default: f64) -> Self {
        Weights::OrderDependent(OrderWeights::new(orders, default))
    }

    pub fn product(coordinates: Vec<f64>, default: f64) -> Self {
        Weights::Product(ProductWeights::new(coordinates, default))
    }

    /// Every coordinate weighs `gamma`.
    pub fn uniform_product(gamma: f64) -> Self {
        Self::product(Vec::new(), gamma)
    }

    pub fn pod(order: OrderWeights, product: ProductWeights) -> Self {
        Weights::Pod { order, product }
    }

    pub fn projection_dependent(
        weights: impl IntoIterator<Item = (CoordinateSet, f64)>,
    ) -> Self {
        Weights::ProjectionDependent {
            weights: weights.into_iter().collect(),
        }
    }

    pub fn combined(members: Vec<Weights>) -> Self {
        Weights::Combined { members }
    }

    /// `γ_u`. The empty projection always weighs zero.
    pub fn weight(&self, u: CoordinateSet) -> f64 {
        if u.is_empty() {
            return 0.0;
        }
        match self {
            Weights::OrderDependent(order) => order.get(u.len()),
            Weights::Product(product) => product.product(u),
            Weights::Pod { order, product } => order.get(u.len()) * product.product(u),
            Weights::ProjectionDependent { weights } => weights.get(&u).copied().unwrap_or(0.0),
            Weights::Combined { members } => members.iter().map(|w| w.weight(u)).sum(),
        }
    }

    /// `Γ_1 .. Γ_max_order` (index `k - 1` holds order `k`). Models without
    /// an order structure contribute zero.
    pub fn level_weights(&self, max_order: usize) -> Vec<f64> {
        match self {
            Weights::OrderDependent(order) | Weights::Pod { order, .. } => {
                (1..=max_order).map(|k| order.get(k)).collect()
            }
            Weights::Product(_) | Weights::ProjectionDependent { .. } => vec![0.0; max_order],
            Weights::Combined { members } => {
                let mut total = vec![0.0; max_order];
                for member in members {
                    for (t, w) in total.iter_mut().zip(member.level_weights(max_order)) {
                        *t += w;
                    }
                }
                total
            }
        }
    }

    /// Largest order of a projection with non-zero weight, `None` when
    /// unbounded.
    pub fn max_order(&self) -> Option<usize> {
        match self {
            Weights::OrderDependent(order) | Weights::Pod { order, .. } => order.max_order(),
            Weights::Product(product) => {
                if product.default != 0.0 {
                    None
                } else {
                    Some(product.coordinates.iter().filter(|&&g| g != 0.0).count())
                }
            }
            Weights::ProjectionDependent { weights } => Some(
                weights
                    .iter()
                    .filter(|(_, &w)| w != 0.0)
                    .map(|(u, _)| u.len())
                    .max()
                    .unwrap_or(0),
            ),
            Weights::Combined { members } => {
                members.iter().try_fold(0, |acc, w| w.max_order().map(|m| acc.max(m)))
            }
        }
    }

    /// Check every weight is finite and non-negative.
    pub fn validate(&self) -> Result<(), SearchError> {
        let check = |what: &str, w: f64| {
            if w.is_finite() && w >= 0.0 {
                Ok(())
            } else {
                Err(SearchError::configuration(format!(
                    "{} weight must be finite and non-negative, got {}",
                    what, w
                )))
            }
        };
        let check_order = |order: &OrderWeights| {
            check("default order", order.default)?;
            order.orders.iter().try_for_each(|&w| check("order", w))
        };
        let check_product = |product: &ProductWeights| {
            check("default coordinate", product.default)?;
            product
                .coordinates
                .iter()
                .try_for_each(|&w| check("coordinate", w))
        };
        match self {
            Weights::OrderDependent(order) => check_order(order),
            Weights::Product(product) => check_product(product),
            Weights::Pod { order, product } => {
                check_order(order)?;
                check_product(product)
            }
            Weights::ProjectionDependent { weights } => {
                for (u, &w) in weights {
                    if u.is_empty() {
                        return Err(SearchError::configuration(
                            "the empty projection cannot be weighted",
                        ));
                    }
                    check("projection", w)?;
                }
                Ok(())
            }
            Weights::Combined { members } => members.iter().try_for_each(Weights::validate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(coordinates: &[usize]) -> CoordinateSet {
        CoordinateSet::from_coordinates(coordinates)
    }

    #[test]
    fn test_order_dependent() {
        let w = Weights::order_dependent(vec![1.0, 0.5], 0.0);
        assert_eq!(w.weight(set(&[3])), 1.0);
        assert_eq!(w.weight(set(&[0, 7])), 0.5);
        assert_eq!(w.weight(set(&[0, 1, 2])), 0.0);
        assert_eq!(w.weight(CoordinateSet::empty()), 0.0);
        assert_eq!(w.level_weights(3), vec![1.0, 0.5, 0.0]);
        assert_eq!(w.max_order(), Some(2));
    }

    #[test]
    fn test_pod() {
        let w = Weights::pod(
            OrderWeights::new(vec![1.0, 2.0], 0.0),
            ProductWeights::new(vec![0.5, 0.5], 1.0),
        );
        assert_eq!(w.weight(set(&[0, 1])), 2.0 * 0.25);
        assert_eq!(w.weight(set(&[4])), 1.0);
    }

    #[test]
    fn test_projection_dependent_and_combined() {
        let projections = Weights::projection_dependent([(set(&[0, 2]), 0.3)]);
        assert_eq!(projections.weight(set(&[0, 2])), 0.3);
        assert_eq!(projections.weight(set(&[0])), 0.0);
        assert_eq!(projections.max_order(), Some(2));

        let combined = Weights::combined(vec![projections, Weights::uniform_product(0.5)]);
        assert!((combined.weight(set(&[0, 2])) - 0.55).abs() < 1e-15);
        assert_eq!(combined.max_order(), None);
    }

    #[test]
    fn test_max_order_of_product() {
        assert_eq!(Weights::uniform_product(1.0).max_order(), None);
        assert_eq!(Weights::product(vec![1.0, 0.0, 1.0], 0.0).max_order(), Some(2));
    }

    #[test]
    fn test_validation() {
        assert!(Weights::uniform_product(-1.0).validate().is_err());
        assert!(Weights::order_dependent(vec![f64::NAN], 0.0).validate().is_err());
        assert!(Weights::projection_dependent([(CoordinateSet::empty(), 1.0)])
            .validate()
            .is_err());
        assert!(Weights::combined(vec![Weights::uniform_product(0.1)])
            .validate()
            .is_ok());
    }
}
