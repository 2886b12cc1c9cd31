// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Structured families of generating matrices for digital nets.
//!
//! Instead of every full-rank matrix, a construction searches a small
//! parameter space per coordinate and maps each parameter to a matrix:
//!
//! - Sobol: coordinate `j >= 1` is tied to the `j`-th primitive polynomial
//!   `p` of degree `s`; its parameters are the initial direction numbers
//!   `m_1 .. m_s` (`m_k` odd, `m_k < 2^k`), extended by the recurrence of
//!   `p`. Coordinate 0 is the identity.
//! - Polynomial: for a modulus `P` of degree `cols`, the parameter `q` is
//!   a unit modulo `P` and the matrix is the Hankel matrix of the Laurent
//!   digits of `q / P`. The net equals the polynomial lattice rule of
//!   generator `q`. Coordinate 0 is `q = 1`.

use crate::algebra::modulus::prime_factors;
use crate::algebra::{Modulus, Polynomial};
use crate::errors::SearchError;
use crate::pointset::{GeneratingMatrix, SizeParam};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest Sobol polynomial degree whose direction numbers are enumerated.
pub const MAX_SOBOL_DEGREE: u32 = 7;

/// How the generating matrices of a digital net are parameterised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetConstruction {
    /// Any full-rank matrix.
    #[default]
    Explicit,
    Sobol,
    /// Nets of polynomial lattice rules with this modulus.
    Polynomial(Polynomial),
}

impl fmt::Display for NetConstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetConstruction::Explicit => write!(f, "explicit"),
            NetConstruction::Sobol => write!(f, "sobol"),
            NetConstruction::Polynomial(modulus) => write!(f, "polynomial({})", modulus),
        }
    }
}

impl NetConstruction {
    /// Check the construction fits digital nets of `size`.
    pub fn validate(&self, size: &SizeParam) -> Result<(), SearchError> {
        let (rows, cols) = match (*self, *size) {
            (NetConstruction::Explicit, _) => return Ok(()),
            (_, SizeParam::Digital { rows, cols }) => (rows, cols),
            _ => {
                return Err(SearchError::configuration(format!(
                    "{} construction needs a digital net, got size {}",
                    self, size
                )))
            }
        };
        if let NetConstruction::Polynomial(modulus) = self {
            if modulus.degree() != Some(cols) {
                return Err(SearchError::configuration(format!(
                    "modulus {} of a net with {} columns must have degree {}",
                    modulus, cols, cols
                )));
            }
            if rows + cols > 65 {
                return Err(SearchError::configuration(format!(
                    "{}x{} polynomial net needs more than 64 Laurent digits",
                    rows, cols
                )));
            }
        }
        Ok(())
    }
}

/// Whether `p` is primitive: irreducible with `z` generating its
/// multiplicative group.
pub fn is_primitive(p: Polynomial) -> bool {
    let s = match p.degree() {
        Some(s) if s >= 1 => s,
        _ => return false,
    };
    if p.bits() & 1 == 0 || !p.is_irreducible() {
        return false;
    }
    let modulus = Modulus::Polynomial(p);
    let z = modulus.reduce(Polynomial::Z.bits());
    let order = (1u64 << s) - 1;
    prime_factors(order)
        .into_iter()
        .all(|q| modulus.pow(z, order / q) != 1)
}

/// The `index`-th primitive polynomial, ordered by degree then value,
/// among those of degree at most [`MAX_SOBOL_DEGREE`].
pub fn primitive_polynomial(index: usize) -> Option<Polynomial> {
    (2u64..1 << (MAX_SOBOL_DEGREE + 1))
        .map(Polynomial::from_bits)
        .filter(|&p| is_primitive(p))
        .nth(index)
}

/// Number of initial direction number tuples for a polynomial of degree `s`.
pub fn sobol_count(degree: u32) -> usize {
    1usize << (degree * degree.saturating_sub(1) / 2)
}

/// Initial direction numbers of tuple `index`: `m_k = 2 t_k + 1` with `t_k`
/// the next `k - 1` bits of `index`.
pub fn sobol_initial(degree: u32, index: u64) -> Vec<u64> {
    let mut shift = 0;
    (1..=degree)
        .map(|k| {
            let t = (index >> shift) & ((1u64 << (k - 1)) - 1);
            shift += k - 1;
            2 * t + 1
        })
        .collect()
}

/// Sobol generating matrix of the primitive polynomial `p` from the
/// initial direction numbers `initial`.
///
/// Column `c` holds `m_(c+1)`, most significant bit in row 0, so the
/// matrix is upper triangular with unit diagonal.
pub fn sobol_matrix(p: Polynomial, initial: &[u64], rows: u32, cols: u32) -> GeneratingMatrix {
    let s = initial.len();
    let mut m = initial.to_vec();
    for k in s..cols as usize {
        // m_(k+1) from m_(k+1-s) .. m_k
        let back = m[k - s];
        let mut next = back ^ (back << s);
        for i in 1..s {
            if (p.bits() >> (s - i)) & 1 == 1 {
                next ^= m[k - i] << i;
            }
        }
        m.push(next);
    }
    let columns = m
        .iter()
        .take(cols as usize)
        .enumerate()
        .map(|(c, &mk)| {
            (0..=c as u32)
                .filter(|&r| r < rows && (mk >> (c as u32 - r)) & 1 == 1)
                .fold(0u64, |word, r| word | 1 << r)
        })
        .collect();
    GeneratingMatrix::from_columns(rows, columns)
}

/// Hankel matrix `C[r][c] = u_(r+c+1)` of the Laurent digits of `q / modulus`.
pub fn polynomial_matrix(
    modulus: Polynomial,
    q: Polynomial,
    rows: u32,
    cols: u32,
) -> GeneratingMatrix {
    let total = rows + cols - 1;
    let digits = q.laurent_digits(modulus, total);
    let u = |k: u32| (digits >> (total - k)) & 1;
    let columns = (0..cols)
        .map(|c| {
            (0..rows)
                .filter(|&r| u(r + c + 1) == 1)
                .fold(0u64, |word, r| word | 1 << r)
        })
        .collect();
    GeneratingMatrix::from_columns(rows, columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(bits: u64) -> Polynomial {
        Polynomial::from_bits(bits)
    }

    #[test]
    fn test_primitive_polynomials_in_order() {
        let first: Vec<u64> = (0..6)
            .map(|i| primitive_polynomial(i).unwrap().bits())
            .collect();
        // 1 + z, 1 + z + z^2, 1 + z + z^3, 1 + z^2 + z^3, 1 + z + z^4, 1 + z^3 + z^4
        assert_eq!(first, vec![0b11, 0b111, 0b1011, 0b1101, 0b10011, 0b11001]);
        // 1 + z + z^2 + z^3 + z^4 is irreducible, but z has order 5
        assert!(!is_primitive(p(0b11111)));
        assert!(!is_primitive(p(0b10)));
        // 1 + 1 + 2 + 2 + 6 + 6 + 18 of degrees 1 to 7
        assert!(primitive_polynomial(35).is_some());
        assert_eq!(primitive_polynomial(36), None);
    }

    #[test]
    fn test_sobol_initial_tuples() {
        assert_eq!(sobol_count(1), 1);
        assert_eq!(sobol_count(3), 8);
        assert_eq!(sobol_initial(1, 0), vec![1]);
        assert_eq!(sobol_initial(3, 0), vec![1, 1, 1]);
        // t_2 = 1, t_3 = 0b10
        assert_eq!(sobol_initial(3, 0b101), vec![1, 3, 5]);
    }

    #[test]
    fn test_second_sobol_matrix_is_pascal() {
        let matrix = sobol_matrix(p(0b11), &[1], 4, 4);
        for r in 0..4 {
            for c in 0..4 {
                // binomial(c, r) mod 2
                let pascal = r <= c && (c & r) == r;
                assert_eq!(matrix.get(r, c), pascal, "row {} column {}", r, c);
            }
        }
    }

    #[test]
    fn test_sobol_recurrence() {
        // 1 + z + z^3 with m = 1, 3, 7: m_4 = m_1 ^ 8 m_1 ^ 4 m_2 = 1 ^ 8 ^ 12 = 5
        let matrix = sobol_matrix(p(0b1011), &[1, 3, 7], 5, 5);
        let m4: u64 = (0..4).filter(|&r| matrix.get(r, 3)).map(|r| 1 << (3 - r)).sum();
        assert_eq!(m4, 5);
        assert!(matrix.has_full_column_rank());
        assert_eq!(sobol_matrix(p(0b1011), &[1, 3, 7], 5, 2).cols(), 2);
    }

    #[test]
    fn test_polynomial_matrix_is_hankel() {
        let modulus = p(0b1011);
        let matrix = polynomial_matrix(modulus, Polynomial::ONE, 3, 3);
        // u_1 .. u_5 of 1 / (1 + z + z^3) are 0, 0, 1, 0, 1
        let u = [0, 0, 1, 0, 1];
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(matrix.get(r, c), u[(r + c) as usize] == 1);
            }
        }
        assert!(matrix.has_full_column_rank());
    }

    #[test]
    fn test_construction_validation() {
        let size = SizeParam::digital(4, 3);
        assert!(NetConstruction::Sobol.validate(&size).is_ok());
        assert!(NetConstruction::Polynomial(p(0b1011)).validate(&size).is_ok());
        assert!(NetConstruction::Polynomial(p(0b111)).validate(&size).is_err());
        assert!(NetConstruction::Sobol.validate(&SizeParam::integer(8)).is_err());
        assert!(NetConstruction::Explicit.validate(&SizeParam::integer(8)).is_ok());
    }
}
