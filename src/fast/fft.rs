// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Radix-2 FFT and the cyclic correlation built on it.
//!
//! Transforms are in place on `Complex64` buffers whose length is a power
//! of two (decimation in time, Cooley-Tukey).

use num_complex::Complex64;
use std::f64::consts::PI;

/// In-place forward FFT.
///
/// # Panics
///
/// Panics if the length is not a power of two.
pub fn fft(data: &mut [Complex64]) {
    transform(data, -1.0);
}

/// In-place inverse FFT, scaled by `1/n`.
pub fn ifft(data: &mut [Complex64]) {
    transform(data, 1.0);
    let scale = 1.0 / data.len() as f64;
    for x in data.iter_mut() {
        *x *= scale;
    }
}

fn transform(data: &mut [Complex64], sign: f64) {
    let n = data.len();
    assert!(n.is_power_of_two(), "FFT size must be a power of 2");

    bit_reverse_permute(data);

    let mut stage_len = 2;
    while stage_len <= n {
        let half = stage_len / 2;
        let angle = sign * 2.0 * PI / stage_len as f64;
        let twiddles: Vec<Complex64> = (0..half)
            .map(|j| Complex64::from_polar(1.0, angle * j as f64))
            .collect();
        for block in data.chunks_exact_mut(stage_len) {
            let (even, odd) = block.split_at_mut(half);
            for ((e, o), w) in even.iter_mut().zip(odd.iter_mut()).zip(&twiddles) {
                let t = *w * *o;
                *o = *e - t;
                *e += t;
            }
        }
        stage_len *= 2;
    }
}

fn bit_reverse_permute(data: &mut [Complex64]) {
    let n = data.len();
    let mut j = 0;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            data.swap(i, j);
        }
    }
}

/// Cyclic correlation `c[k] = Σ_m a[(k + m) mod L] b[m]` of two sequences
/// of equal length `L`.
///
/// Computed as the cyclic convolution of `a` with `b` reversed, through a
/// zero-padded linear convolution folded back modulo `L`.
pub fn cyclic_correlation(a: &[f64], b: &[f64]) -> Vec<f64> {
    assert_eq!(a.len(), b.len(), "correlated sequences differ in length");
    let len = a.len();
    if len == 0 {
        return Vec::new();
    }
    let size = (2 * len - 1).next_power_of_two();
    let mut fa = vec![Complex64::new(0.0, 0.0); size];
    let mut fb = vec![Complex64::new(0.0, 0.0); size];
    for (m, &x) in a.iter().enumerate() {
        fa[m] = Complex64::new(x, 0.0);
    }
    for m in 0..len {
        fb[m] = Complex64::new(b[(len - m) % len], 0.0);
    }
    fft(&mut fa);
    fft(&mut fb);
    for (x, y) in fa.iter_mut().zip(&fb) {
        *x *= *y;
    }
    ifft(&mut fa);
    (0..len)
        .map(|k| {
            let wrapped = if k + len < 2 * len - 1 { fa[k + len].re } else { 0.0 };
            fa[k].re + wrapped
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn direct(a: &[f64], b: &[f64]) -> Vec<f64> {
        let len = a.len();
        (0..len)
            .map(|k| (0..len).map(|m| a[(k + m) % len] * b[m]).sum())
            .collect()
    }

    #[test]
    fn test_fft_of_impulse_is_flat() {
        let mut data = vec![Complex64::new(0.0, 0.0); 8];
        data[0] = Complex64::new(1.0, 0.0);
        fft(&mut data);
        for x in &data {
            assert!((x.re - 1.0).abs() < 1e-15 && x.im.abs() < 1e-15);
        }
    }

    #[test]
    fn test_inverse_round_trip() {
        let original: Vec<Complex64> = (0..16)
            .map(|i| Complex64::new(i as f64, (i * i) as f64 * 0.5))
            .collect();
        let mut data = original.clone();
        fft(&mut data);
        ifft(&mut data);
        for (x, y) in data.iter().zip(&original) {
            assert!((x - y).norm() < 1e-12);
        }
    }

    #[test]
    fn test_small_correlation() {
        let a = [1.0, 2.0, 3.0];
        let b = [1.0, 0.0, 0.0];
        // c[k] = a[k]
        let c = cyclic_correlation(&a, &b);
        for (x, y) in c.iter().zip(&a) {
            assert!((x - y).abs() < 1e-12);
        }
        assert_eq!(cyclic_correlation(&[2.0], &[3.0]).len(), 1);
        assert!((cyclic_correlation(&[2.0], &[3.0])[0] - 6.0).abs() < 1e-12);
        assert!(cyclic_correlation(&[], &[]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_correlation_matches_direct_sum(
            pairs in prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), 1..80)
        ) {
            let a: Vec<f64> = pairs.iter().map(|p| p.0).collect();
            let b: Vec<f64> = pairs.iter().map(|p| p.1).collect();
            let fast = cyclic_correlation(&a, &b);
            let slow = direct(&a, &b);
            for (x, y) in fast.iter().zip(&slow) {
                prop_assert!((x - y).abs() < 1e-9 * (1.0 + y.abs()) * a.len() as f64);
            }
        }
    }
}
