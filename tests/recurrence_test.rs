// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! The accumulator reproduces the merit computed from its definition.

mod common;

use common::{assert_close, direct_merit, lattice_points};
use lattice_cbc::algebra::CoordinateSet;
use lattice_cbc::kernel::{Kernel, PAlpha};
use lattice_cbc::pointset::{Compression, GenValue, PointSetConfiguration, SizeParam};
use lattice_cbc::state::CoordUniformState;
use lattice_cbc::storage::Storage;
use lattice_cbc::weights::{OrderWeights, ProductWeights, Weights};
use std::sync::Arc;

fn accumulate(
    config: PointSetConfiguration,
    n: u64,
    weights: Weights,
    generators: &[u64],
) -> CoordUniformState {
    let storage = Arc::new(Storage::new(config, SizeParam::integer(n)).unwrap());
    let values = storage.kernel_values(&PAlpha::new(2).unwrap());
    let mut state = CoordUniformState::new(storage, Arc::new(weights));
    for &a in generators {
        state.update(&values, &GenValue::Integer(a));
    }
    state
}

#[test]
fn test_order_dependent_size_five() {
    let kernel = PAlpha::new(2).unwrap();
    let weights = Weights::order_dependent(vec![0.7, 0.3], 0.0);
    let state = accumulate(PointSetConfiguration::ordinary(), 5, weights, &[1, 2]);

    let expected = direct_merit(&lattice_points(5, &[1, 2]), &kernel, |u| match u.len() {
        1 => 0.7,
        2 => 0.3,
        _ => 0.0,
    });
    assert_close(state.level_merits()[0], expected, 1e-12);
}

const GAMMA: [f64; 4] = [0.9, 0.5, 0.4, 0.2];
const ORDER: [f64; 4] = [1.0, 0.6, 0.3, 0.1];

#[test]
fn test_every_weight_model() {
    let kernel = PAlpha::new(2).unwrap();
    let generators = [1, 5, 7, 3];
    let points = lattice_points(13, &generators);
    let gamma_of = |u: &[usize]| u.iter().map(|&j| GAMMA[j]).product::<f64>();
    let order_of = |u: &[usize]| ORDER[u.len() - 1];

    let product = Weights::product(GAMMA.to_vec(), 0.0);
    let pod = Weights::pod(
        OrderWeights::new(ORDER.to_vec(), 0.0),
        ProductWeights::new(GAMMA.to_vec(), 0.0),
    );
    let projections = Weights::projection_dependent([
        (CoordinateSet::from_coordinates(&[0]), 0.5),
        (CoordinateSet::from_coordinates(&[1, 3]), 0.25),
        (CoordinateSet::from_coordinates(&[0, 2, 3]), 0.125),
    ]);
    let projection_of = |u: &[usize]| match u {
        [0] => 0.5,
        [1, 3] => 0.25,
        [0, 2, 3] => 0.125,
        _ => 0.0,
    };

    let cases: Vec<(Weights, Box<dyn Fn(&[usize]) -> f64>)> = vec![
        (product.clone(), Box::new(gamma_of)),
        (pod, Box::new(move |u: &[usize]| order_of(u) * gamma_of(u))),
        (projections.clone(), Box::new(projection_of)),
        (
            Weights::combined(vec![product, projections]),
            Box::new(move |u: &[usize]| gamma_of(u) + projection_of(u)),
        ),
    ];
    for (weights, weight) in cases {
        let state = accumulate(PointSetConfiguration::ordinary(), 13, weights.clone(), &generators);
        let expected = direct_merit(&points, &kernel, |u| weight(u));
        assert_close(state.level_merits()[0], expected, 1e-12);
    }
}

#[test]
fn test_symmetric_compression_invariance() {
    let compressed = PointSetConfiguration::ordinary().with_compression(Compression::Symmetric);
    for a in 1..7 {
        let plain = accumulate(
            PointSetConfiguration::ordinary(),
            7,
            Weights::uniform_product(0.6),
            &[1, a, 3],
        );
        let folded = accumulate(compressed, 7, Weights::uniform_product(0.6), &[1, a, 3]);
        assert_close(folded.level_merits()[0], plain.level_merits()[0], 1e-12);
    }
}

#[test]
fn test_kernel_values_of_identity() {
    // the one-dimensional merit of any unit generator is the mean of ω
    let kernel = PAlpha::new(2).unwrap();
    let state = accumulate(
        PointSetConfiguration::ordinary(),
        11,
        Weights::uniform_product(1.0),
        &[4],
    );
    let mean = (0..11).map(|i| kernel.evaluate(i as f64 / 11.0)).sum::<f64>() / 11.0;
    assert_close(state.level_merits()[0], mean, 1e-12);
}
