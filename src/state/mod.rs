// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Tier 2: DYNAMIC state (mutable, one per partial solution).
//!
//! A [`CoordUniformState`] holds everything needed to score a new coordinate
//! appended to a partial point set, without revisiting earlier coordinates.
//!
//! # The recurrence
//!
//! After `s` coordinates with kernel rows `r_0 .. r_{s-1}` (one entry per
//! slot), the merit increment of a candidate row `r` at coordinate `s` is,
//! for each embedding level `ℓ`,
//!
//! ```text
//! (1/n_ℓ) Σ_{j < end_ℓ} m_j r[j] q_s[j],   q_s = Σ_{u ⊆ {0..s-1}} γ(u ∪ {s}) Π_{i∈u} r_i
//! ```
//!
//! where `m_j` is the slot multiplicity. The weighted state `q_s` is kept in
//! a form specialised to the weight model:
//!
//! - order dependent: `p_{s,l}`, the elementary symmetric sums of order `l`
//!   of the rows, with `q_s = Σ_l Γ_{l+1} p_{s,l}`. POD weights fold the
//!   coordinate weights into the sums and scale by `γ_s`.
//! - product: the running product `Π_i (1 + γ_i r_i)`, scaled by `γ_s`.
//! - projection dependent: one product `Π_{i∈u} r_i` per projection `u`
//!   that is still relevant to some weighted projection.
//! - combined: one of the above per member.
//!
//! Cloning a state is a structural copy; storage and weights are shared.

pub mod statistics;

pub use statistics::{Counters, Statistics};

use crate::algebra::CoordinateSet;
use crate::pointset::GenValue;
use crate::storage::Storage;
use crate::weights::{OrderWeights, ProductWeights, Weights};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Accumulated merit information after a prefix of chosen generators.
#[derive(Debug, Clone)]
pub struct CoordUniformState {
    storage: Arc<Storage>,
    weights: Arc<Weights>,
    dimension: usize,
    merits: Vec<f64>,
    layer: Layer,
}

/// Per weight model part of the state. Mirrors the shape of [`Weights`].
#[derive(Debug, Clone)]
enum Layer {
    Product {
        product: Vec<f64>,
    },
    Orders {
        /// `p_0 .. p_{count-1}`, one slot vector after the other.
        data: Vec<f64>,
        count: usize,
        cap: Option<usize>,
    },
    Projections {
        products: BTreeMap<CoordinateSet, Vec<f64>>,
    },
    Combined(Vec<Layer>),
}

impl CoordUniformState {
    /// The state of the empty point set.
    pub fn new(storage: Arc<Storage>, weights: Arc<Weights>) -> Self {
        let layer = Layer::new(&weights, storage.size());
        let merits = vec![0.0; storage.num_levels()];
        Self {
            storage,
            weights,
            dimension: 0,
            merits,
            layer,
        }
    }

    /// Return to the state of the empty point set.
    pub fn reset(&mut self) {
        self.layer = Layer::new(&self.weights, self.storage.size());
        self.merits.iter_mut().for_each(|m| *m = 0.0);
        self.dimension = 0;
    }

    /// Number of committed coordinates.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Merit of the partial point set at each embedding level.
    pub fn level_merits(&self) -> &[f64] {
        &self.merits
    }

    pub fn storage(&self) -> &Arc<Storage> {
        &self.storage
    }

    pub fn weights(&self) -> &Arc<Weights> {
        &self.weights
    }

    /// `q_s`: the weight of every slot in the increment of coordinate `s`.
    pub fn weighted_state(&self) -> Vec<f64> {
        let mut q = vec![0.0; self.storage.size()];
        self.layer.add_weighted(&self.weights, self.dimension, &mut q);
        q
    }

    /// Merit increments of the kernel row `row` (indexed by slot), level by
    /// level, for the weighted state `q`.
    pub fn merit_increments<R: Fn(usize) -> f64>(&self, q: &[f64], row: R) -> Vec<f64> {
        increments(&self.storage, q, row).collect()
    }

    /// Commit `gen` as coordinate `dimension()`.
    ///
    /// `kernel_values` is the kernel table of the storage.
    pub fn update(&mut self, kernel_values: &[f64], gen: &GenValue) {
        let row = self.storage.stride(gen).gather(kernel_values);
        let q = self.weighted_state();
        for (merit, inc) in self
            .merits
            .iter_mut()
            .zip(increments(&self.storage, &q, |j| row[j]))
        {
            *merit += inc;
        }
        self.layer.update(&self.weights, self.dimension, &row);
        self.dimension += 1;
    }

    /// `p_{s,level}` for order-dependent and POD weights.
    pub fn order_state(&self, level: usize) -> Option<&[f64]> {
        match &self.layer {
            Layer::Orders { data, count, .. } if level < *count => {
                let n = self.storage.size();
                Some(&data[level * n..(level + 1) * n])
            }
            _ => None,
        }
    }
}

impl Layer {
    fn new(weights: &Weights, n: usize) -> Self {
        match weights {
            Weights::Product(_) => Layer::Product {
                product: vec![1.0; n],
            },
            Weights::OrderDependent(order) | Weights::Pod { order, .. } => {
                let cap = order.max_order();
                let count = if cap == Some(0) { 0 } else { 1 };
                Layer::Orders {
                    data: vec![1.0; count * n],
                    count,
                    cap,
                }
            }
            Weights::ProjectionDependent { weights } => {
                let mut products = BTreeMap::new();
                if weights.values().any(|&w| w != 0.0) {
                    products.insert(CoordinateSet::empty(), vec![1.0; n]);
                }
                Layer::Projections { products }
            }
            Weights::Combined { members } => {
                Layer::Combined(members.iter().map(|w| Layer::new(w, n)).collect())
            }
        }
    }

    /// `q += q_s` for this layer, `s` being the next coordinate.
    fn add_weighted(&self, weights: &Weights, s: usize, q: &mut [f64]) {
        let n = q.len();
        match (self, weights) {
            (Layer::Product { product }, Weights::Product(gamma)) => {
                let g = gamma.get(s);
                if g != 0.0 {
                    for (q, p) in q.iter_mut().zip(product) {
                        *q += g * p;
                    }
                }
            }
            (Layer::Orders { data, count, .. }, Weights::OrderDependent(order)) => {
                add_orders(order, 1.0, &data[..count * n], q);
            }
            (Layer::Orders { data, count, .. }, Weights::Pod { order, product }) => {
                add_orders(order, product.get(s), &data[..count * n], q);
            }
            (Layer::Projections { products }, Weights::ProjectionDependent { weights }) => {
                for (u, p) in products {
                    let w = weights.get(&u.with(s)).copied().unwrap_or(0.0);
                    if w != 0.0 {
                        for (q, p) in q.iter_mut().zip(p) {
                            *q += w * p;
                        }
                    }
                }
            }
            (Layer::Combined(layers), Weights::Combined { members }) => {
                for (layer, member) in layers.iter().zip(members) {
                    layer.add_weighted(member, s, q);
                }
            }
            _ => unreachable!("state layer does not match its weights"),
        }
    }

    /// Fold the kernel row of coordinate `s` into this layer.
    fn update(&mut self, weights: &Weights, s: usize, row: &[f64]) {
        match (self, weights) {
            (Layer::Product { product }, Weights::Product(gamma)) => {
                let g = gamma.get(s);
                for (p, r) in product.iter_mut().zip(row) {
                    *p *= 1.0 + g * r;
                }
            }
            (Layer::Orders { data, count, cap }, Weights::OrderDependent(_)) => {
                update_orders(data, count, *cap, 1.0, row);
            }
            (Layer::Orders { data, count, cap }, Weights::Pod { product, .. }) => {
                update_orders(data, count, *cap, product.get(s), row);
            }
            (Layer::Projections { products }, Weights::ProjectionDependent { weights }) => {
                *products = next_projections(products, weights, s, row);
            }
            (Layer::Combined(layers), Weights::Combined { members }) => {
                for (layer, member) in layers.iter_mut().zip(members) {
                    layer.update(member, s, row);
                }
            }
            _ => unreachable!("state layer does not match its weights"),
        }
    }
}

/// `q += factor Σ_l Γ_{l+1} p_l`.
fn add_orders(order: &OrderWeights, factor: f64, data: &[f64], q: &mut [f64]) {
    if factor == 0.0 || q.is_empty() {
        return;
    }
    for (l, p) in data.chunks_exact(q.len()).enumerate() {
        let w = factor * order.get(l + 1);
        if w != 0.0 {
            for (q, p) in q.iter_mut().zip(p) {
                *q += w * p;
            }
        }
    }
}

/// `p_l += c r p_{l-1}` for `l` from high to low, growing by one order
/// unless capped.
fn update_orders(data: &mut Vec<f64>, count: &mut usize, cap: Option<usize>, c: f64, row: &[f64]) {
    let n = row.len();
    if cap.map_or(true, |cap| *count < cap) {
        data.resize((*count + 1) * n, 0.0);
        *count += 1;
    }
    for l in (1..*count).rev() {
        let (lower, upper) = data.split_at_mut(l * n);
        let previous = &lower[(l - 1) * n..];
        for ((p, prev), r) in upper[..n].iter_mut().zip(previous).zip(row) {
            *p += c * r * prev;
        }
    }
}

/// Products for the projections relevant at coordinate `s + 1`, after
/// committing the row of coordinate `s`.
fn next_projections(
    products: &BTreeMap<CoordinateSet, Vec<f64>>,
    weights: &BTreeMap<CoordinateSet, f64>,
    s: usize,
    row: &[f64],
) -> BTreeMap<CoordinateSet, Vec<f64>> {
    let mut next = BTreeMap::new();
    for (w, _) in weights.iter().filter(|&(w, &g)| g != 0.0 && w.max_coordinate() > Some(s)) {
        let u = w.below(s + 1);
        if next.contains_key(&u) {
            continue;
        }
        let product = if u.contains(s) {
            let mut parent = u;
            parent.remove(s);
            products[&parent]
                .iter()
                .zip(row)
                .map(|(p, r)| p * r)
                .collect()
        } else {
            products[&u].clone()
        };
        next.insert(u, product);
    }
    next
}

/// Level-by-level merit increments `(1/n_ℓ) Σ_{j < end_ℓ} m_j row(j) q[j]`.
///
/// Levels are nested slot prefixes, so the running sum carries over from one
/// level to the next. Every consumer reduces through this iterator, so an
/// evaluation stopped after some levels agrees bit for bit with a full one.
pub fn increments<'a, R: Fn(usize) -> f64>(
    storage: &'a Storage,
    q: &'a [f64],
    row: R,
) -> Increments<'a, R> {
    Increments {
        storage,
        q,
        row,
        level: 0,
        start: 0,
        sum: 0.0,
    }
}

pub struct Increments<'a, R> {
    storage: &'a Storage,
    q: &'a [f64],
    row: R,
    level: usize,
    start: usize,
    sum: f64,
}

impl<R: Fn(usize) -> f64> Iterator for Increments<'_, R> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.level == self.storage.num_levels() {
            return None;
        }
        let end = self.storage.level_end(self.level);
        let multiplicity = self.storage.multiplicities();
        for j in self.start..end {
            self.sum += multiplicity[j] * (self.row)(j) * self.q[j];
        }
        self.start = end;
        let increment = self.sum / self.storage.level_points(self.level) as f64;
        self.level += 1;
        Some(increment)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.storage.num_levels() - self.level;
        (remaining, Some(remaining))
    }
}
