// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Cardinality of a point set.

use crate::algebra::modulus::{self, Modulus};
use crate::algebra::Polynomial;
use crate::errors::SearchError;
use crate::pointset::{Embedding, LatticeKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest number of points a storage will tabulate.
pub const MAX_POINTS: u64 = 1 << 28;

/// Largest number of output digits of a digital net (its kernel table has
/// `2^rows` entries).
const MAX_DIGITAL_ROWS: u32 = MAX_POINTS.trailing_zeros();

/// Size parameter of a point set.
///
/// Integer and polynomial moduli are kept factored as `base^power`; the
/// power is the number of embedding levels above the trivial one. Digital
/// nets have `2^cols` points with `rows` output digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeParam {
    Integer { base: u64, power: u32 },
    Polynomial { base: Polynomial, power: u32 },
    Digital { rows: u32, cols: u32 },
}

impl SizeParam {
    /// Integer modulus `n`, normalised to `p^k` when `n` is a prime power.
    pub fn integer(n: u64) -> Self {
        match modulus::as_prime_power(n) {
            Some((base, power)) => SizeParam::Integer { base, power },
            None => SizeParam::Integer { base: n, power: 1 },
        }
    }

    pub fn integer_power(base: u64, power: u32) -> Self {
        SizeParam::Integer { base, power }
    }

    /// Polynomial modulus `P`, normalised to `Q^k` when `P` is a power of an
    /// irreducible `Q`.
    pub fn polynomial(modulus: Polynomial) -> Self {
        match modulus.as_irreducible_power() {
            Some((base, power)) => SizeParam::Polynomial { base, power },
            None => SizeParam::Polynomial {
                base: modulus,
                power: 1,
            },
        }
    }

    pub fn polynomial_power(base: Polynomial, power: u32) -> Self {
        SizeParam::Polynomial { base, power }
    }

    pub fn digital(rows: u32, cols: u32) -> Self {
        SizeParam::Digital { rows, cols }
    }

    pub fn lattice_kind(&self) -> LatticeKind {
        match self {
            SizeParam::Integer { .. } => LatticeKind::Integer,
            SizeParam::Polynomial { .. } => LatticeKind::Polynomial,
            SizeParam::Digital { .. } => LatticeKind::Digital,
        }
    }

    /// Number of embedding steps: `power` for lattices, `cols` for nets.
    pub fn power(&self) -> u32 {
        match *self {
            SizeParam::Integer { power, .. } | SizeParam::Polynomial { power, .. } => power,
            SizeParam::Digital { cols, .. } => cols,
        }
    }

    /// Number of points of the full set (saturating).
    pub fn num_points(&self) -> u64 {
        self.level_points(self.power())
    }

    /// Number of points of the embedded set at `level`.
    pub fn level_points(&self, level: u32) -> u64 {
        match *self {
            SizeParam::Integer { base, .. } => base.checked_pow(level).unwrap_or(u64::MAX),
            SizeParam::Polynomial { base, .. } => {
                let bits = base.degree().unwrap_or(0) as u64 * level as u64;
                if bits >= 64 {
                    u64::MAX
                } else {
                    1u64 << bits
                }
            }
            SizeParam::Digital { .. } => {
                if level >= 64 {
                    u64::MAX
                } else {
                    1u64 << level
                }
            }
        }
    }

    /// Number of embedding levels scored for `embedding`.
    pub fn num_levels(&self, embedding: Embedding) -> usize {
        match embedding {
            Embedding::SingleLevel => 1,
            Embedding::MultiLevel => self.power() as usize + 1,
        }
    }

    /// Modulus of the full ring, `None` for digital nets.
    pub fn modulus(&self) -> Option<Modulus> {
        match *self {
            SizeParam::Integer { .. } => Some(Modulus::Integer(self.num_points())),
            SizeParam::Polynomial { base, power } => {
                base.checked_pow(power).map(Modulus::Polynomial)
            }
            SizeParam::Digital { .. } => None,
        }
    }

    /// Modulus of the ring at `level`: `base^level`.
    pub fn level_modulus(&self, level: u32) -> Option<Modulus> {
        match *self {
            SizeParam::Integer { base, .. } => base.checked_pow(level).map(Modulus::Integer),
            SizeParam::Polynomial { base, .. } => {
                base.checked_pow(level).map(Modulus::Polynomial)
            }
            SizeParam::Digital { .. } => None,
        }
    }

    /// Whether the base is prime (irreducible). Base 2 for digital nets.
    pub fn has_prime_base(&self) -> bool {
        match *self {
            SizeParam::Integer { base, .. } => modulus::is_prime(base),
            SizeParam::Polynomial { base, .. } => base.is_irreducible(),
            SizeParam::Digital { .. } => true,
        }
    }

    /// Check the size is positive and small enough to tabulate.
    pub fn validate(&self) -> Result<(), SearchError> {
        match *self {
            SizeParam::Integer { base, power } => {
                if base == 0 {
                    return Err(SearchError::configuration("lattice size must be positive"));
                }
                if power == 0 {
                    return Err(SearchError::configuration("lattice power must be positive"));
                }
                match base.checked_pow(power) {
                    Some(n) if n <= MAX_POINTS => Ok(()),
                    _ => Err(SearchError::configuration(format!(
                        "{} points exceed the limit of {}",
                        self, MAX_POINTS
                    ))),
                }
            }
            SizeParam::Polynomial { base, power } => {
                let degree = base.degree().ok_or_else(|| {
                    SearchError::configuration("polynomial modulus must be non-zero")
                })?;
                if power == 0 {
                    return Err(SearchError::configuration("lattice power must be positive"));
                }
                if degree as u64 * power as u64 > MAX_POINTS.trailing_zeros() as u64 {
                    return Err(SearchError::configuration(format!(
                        "modulus {} exceeds the limit of {} points",
                        self, MAX_POINTS
                    )));
                }
                Ok(())
            }
            SizeParam::Digital { rows, cols } => {
                if cols == 0 {
                    return Err(SearchError::configuration(
                        "digital nets need at least one column",
                    ));
                }
                if rows < cols {
                    return Err(SearchError::configuration(format!(
                        "digital net with {} rows cannot have {} columns of full rank",
                        rows, cols
                    )));
                }
                if rows > MAX_DIGITAL_ROWS || 1u64 << cols > MAX_POINTS {
                    return Err(SearchError::configuration(format!(
                        "digital net {} is too large",
                        self
                    )));
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for SizeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SizeParam::Integer { base, power: 1 } => write!(f, "{}", base),
            SizeParam::Integer { base, power } => write!(f, "{}^{}", base, power),
            SizeParam::Polynomial { base, power: 1 } => write!(f, "({})", base),
            SizeParam::Polynomial { base, power } => write!(f, "({})^{}", base, power),
            SizeParam::Digital { rows, cols } => write!(f, "2^{} x {} digits", cols, rows),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_normalisation() {
        assert_eq!(SizeParam::integer(49), SizeParam::integer_power(7, 2));
        assert_eq!(SizeParam::integer(12), SizeParam::integer_power(12, 1));
        assert_eq!(SizeParam::integer(101).num_points(), 101);
        assert_eq!(SizeParam::integer(1), SizeParam::integer_power(1, 1));
        assert_eq!(SizeParam::integer(1).num_points(), 1);
    }

    #[test]
    fn test_polynomial_normalisation() {
        let p = SizeParam::polynomial(Polynomial::from_bits(0b101));
        assert_eq!(p, SizeParam::polynomial_power(Polynomial::from_bits(0b11), 2));
        assert_eq!(p.num_points(), 4);
        assert_eq!(p.modulus(), Some(Modulus::Polynomial(Polynomial::from_bits(0b101))));
    }

    #[test]
    fn test_levels() {
        let size = SizeParam::integer_power(3, 4);
        assert_eq!(size.num_levels(Embedding::MultiLevel), 5);
        assert_eq!(size.num_levels(Embedding::SingleLevel), 1);
        let points: Vec<_> = (0..=4).map(|l| size.level_points(l)).collect();
        assert_eq!(points, vec![1, 3, 9, 27, 81]);
        assert_eq!(SizeParam::digital(6, 4).level_points(3), 8);
    }

    #[test]
    fn test_validation() {
        assert!(SizeParam::integer(0).validate().is_err());
        assert!(SizeParam::integer(1).validate().is_ok());
        assert!(SizeParam::integer_power(2, 40).validate().is_err());
        assert!(SizeParam::digital(3, 4).validate().is_err());
        assert!(SizeParam::digital(4, 0).validate().is_err());
        assert!(SizeParam::digital(53, 8).validate().is_err());
        assert!(SizeParam::digital(10, 8).validate().is_ok());
        assert!(SizeParam::polynomial(Polynomial::ZERO).validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(SizeParam::integer(101).to_string(), "101");
        assert_eq!(SizeParam::integer(81).to_string(), "3^4");
        assert_eq!(SizeParam::digital(8, 4).to_string(), "2^4 x 8 digits");
    }
}
