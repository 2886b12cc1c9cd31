// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use lattice_cbc::context::FigureOfMerit;
use lattice_cbc::kernel::{Kernel, KernelType};
use lattice_cbc::weights::Weights;

/// Route `tracing` output to the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Assert `actual` is within `tolerance` of `expected`, relative to
/// `max(|expected|, 1)`.
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    let scale = expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance * scale,
        "{} differs from {} by more than {}",
        actual,
        expected,
        tolerance * scale
    );
}

pub fn p_alpha(gamma: f64) -> FigureOfMerit {
    FigureOfMerit::new(KernelType::PAlpha { alpha: 2 }, Weights::uniform_product(gamma))
}

/// Coordinates `x_ij = (a_j i mod n) / n` of an integer lattice.
pub fn lattice_points(n: u64, generators: &[u64]) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| {
            generators
                .iter()
                .map(|&a| ((a * i) % n) as f64 / n as f64)
                .collect()
        })
        .collect()
}

/// `Σ_u γ_u (1/n) Σ_i Π_{j ∈ u} ω(x_ij)` summed over every non-empty
/// projection `u`, straight from the definition.
pub fn direct_merit(
    points: &[Vec<f64>],
    kernel: &dyn Kernel,
    weight: impl Fn(&[usize]) -> f64,
) -> f64 {
    let dimension = points[0].len();
    let n = points.len() as f64;
    let mut total = 0.0;
    for mask in 1u64..(1 << dimension) {
        let u: Vec<usize> = (0..dimension).filter(|j| mask >> j & 1 == 1).collect();
        let sum: f64 = points
            .iter()
            .map(|x| u.iter().map(|&j| kernel.evaluate(x[j])).product::<f64>())
            .sum();
        total += weight(&u) * sum / n;
    }
    total
}
