// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Polynomials over GF(2).
//!
//! A polynomial is stored as the bit pattern of its coefficients: bit k is
//! the coefficient of z^k. The integer 13 (binary 1101) is therefore
//! 1 + z^2 + z^3.
//!
//! ```
//! use lattice_cbc::algebra::Polynomial;
//!
//! let p = Polynomial::from_bits(13);
//! assert_eq!(p.to_string(), "1 + z^2 + z^3");
//! assert_eq!(p.degree(), Some(3));
//! assert!(p.is_irreducible());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// A polynomial over GF(2) of degree at most 63.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Polynomial(u64);

impl Polynomial {
    /// The zero polynomial.
    pub const ZERO: Polynomial = Polynomial(0);
    /// The constant polynomial 1.
    pub const ONE: Polynomial = Polynomial(1);
    /// The monomial z.
    pub const Z: Polynomial = Polynomial(2);

    /// Create a polynomial from its coefficient bits.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Coefficient bits of this polynomial.
    pub const fn bits(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Degree of the polynomial, `None` for the zero polynomial.
    pub fn degree(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(63 - self.0.leading_zeros())
        }
    }

    /// Product of two polynomials, `None` if the degree would exceed 63.
    pub fn checked_mul(self, other: Polynomial) -> Option<Polynomial> {
        match (self.degree(), other.degree()) {
            (None, _) | (_, None) => Some(Polynomial::ZERO),
            (Some(a), Some(b)) if a + b > 63 => None,
            _ => {
                let mut result = 0u64;
                let mut bits = other.0;
                let mut shift = 0;
                while bits != 0 {
                    if bits & 1 != 0 {
                        result ^= self.0 << shift;
                    }
                    bits >>= 1;
                    shift += 1;
                }
                Some(Polynomial(result))
            }
        }
    }

    /// Euclidean division: returns `(quotient, remainder)`.
    ///
    /// # Panics
    ///
    /// Panics if `divisor` is zero.
    pub fn div_rem(self, divisor: Polynomial) -> (Polynomial, Polynomial) {
        let d = divisor.degree().expect("division by the zero polynomial");
        let mut quotient = 0u64;
        let mut remainder = self.0;
        while let Some(r) = Polynomial(remainder).degree() {
            if r < d {
                break;
            }
            let shift = r - d;
            quotient |= 1 << shift;
            remainder ^= divisor.0 << shift;
        }
        (Polynomial(quotient), Polynomial(remainder))
    }

    /// Remainder of the division by `divisor`.
    pub fn rem(self, divisor: Polynomial) -> Polynomial {
        self.div_rem(divisor).1
    }

    /// Greatest common divisor.
    pub fn gcd(self, other: Polynomial) -> Polynomial {
        let (mut a, mut b) = (self, other);
        while !b.is_zero() {
            let r = a.rem(b);
            a = b;
            b = r;
        }
        a
    }

    /// Product modulo `modulus`, without intermediate overflow.
    ///
    /// Uses Horner's scheme on the bits of `other`; `modulus` must have
    /// degree at most 62.
    pub fn mul_mod(self, other: Polynomial, modulus: Polynomial) -> Polynomial {
        let m = modulus.degree().expect("zero modulus");
        let a = self.rem(modulus).0;
        let b = other.rem(modulus);
        let mut result = 0u64;
        if let Some(top) = b.degree() {
            for k in (0..=top).rev() {
                result <<= 1;
                if (result >> m) & 1 != 0 {
                    result ^= modulus.0;
                }
                if (b.0 >> k) & 1 != 0 {
                    result ^= a;
                }
            }
        }
        Polynomial(result)
    }

    /// `self^exponent`, `None` on degree overflow.
    pub fn checked_pow(self, exponent: u32) -> Option<Polynomial> {
        let mut result = Polynomial::ONE;
        for _ in 0..exponent {
            result = result.checked_mul(self)?;
        }
        Some(result)
    }

    /// Test irreducibility by trial division.
    ///
    /// Constants are not irreducible. Intended for the small moduli used to
    /// build point sets (degree well below 32).
    pub fn is_irreducible(self) -> bool {
        let degree = match self.degree() {
            None | Some(0) => return false,
            Some(d) => d,
        };
        self.smallest_factor_up_to(degree / 2).is_none()
    }

    /// Smallest non-constant divisor (in the order of the bit encoding),
    /// which is always irreducible. `None` for constants.
    pub fn smallest_factor(self) -> Option<Polynomial> {
        let degree = self.degree()?;
        if degree == 0 {
            return None;
        }
        Some(self.smallest_factor_up_to(degree / 2).unwrap_or(self))
    }

    fn smallest_factor_up_to(self, max_degree: u32) -> Option<Polynomial> {
        let limit = 1u64 << (max_degree + 1);
        (2..limit)
            .map(Polynomial)
            .find(|d| self.rem(*d).is_zero())
    }

    /// Write `self` as `base^power` with `base` irreducible, if possible.
    pub fn as_irreducible_power(self) -> Option<(Polynomial, u32)> {
        let base = self.smallest_factor()?;
        let mut rest = self;
        let mut power = 0;
        loop {
            let (q, r) = rest.div_rem(base);
            if !r.is_zero() {
                break;
            }
            rest = q;
            power += 1;
        }
        if rest == Polynomial::ONE {
            Some((base, power))
        } else {
            None
        }
    }

    /// Leading `digits` coefficients `u_1 .. u_digits` of the Laurent
    /// expansion `self / modulus = Σ u_k z^(-k)` at infinity, packed with
    /// `u_1` as the most significant bit. Polynomial parts are dropped.
    ///
    /// `digits` is at most 64.
    pub fn laurent_digits(self, modulus: Polynomial, digits: u32) -> u64 {
        let m = match modulus.degree() {
            Some(m) => m,
            None => return 0,
        };
        let mut remainder = self.rem(modulus).0;
        let mut value = 0u64;
        for _ in 0..digits {
            remainder <<= 1;
            value <<= 1;
            if (remainder >> m) & 1 != 0 {
                remainder ^= modulus.0;
                value |= 1;
            }
        }
        value
    }

    /// [`laurent_digits`](Self::laurent_digits) read as a binary fraction
    /// in [0, 1). This is the coordinate map of polynomial lattice rules.
    pub fn laurent_fraction(self, modulus: Polynomial, digits: u32) -> f64 {
        self.laurent_digits(modulus, digits) as f64 / 2f64.powi(digits as i32)
    }
}

impl fmt::Display for Polynomial {
    /// Format as "1 + z + z^3"; zero is "0".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return write!(f, "0");
        }
        let mut first = true;
        for k in 0..64 {
            if (self.0 >> k) & 1 == 0 {
                continue;
            }
            if !first {
                write!(f, " + ")?;
            }
            first = false;
            match k {
                0 => write!(f, "1")?,
                1 => write!(f, "z")?,
                _ => write!(f, "z^{}", k)?,
            }
        }
        Ok(())
    }
}
