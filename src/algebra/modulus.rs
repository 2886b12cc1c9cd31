// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Residue rings shared by integer and polynomial lattices.
//!
//! Both kinds of lattice rules live in a ring of residues: Z/nZ for ordinary
//! lattices and GF(2)[z]/(P) for polynomial lattices. Residues are encoded as
//! `u64` in both cases (an integer, or the bit pattern of a polynomial), so
//! storage and candidate enumeration share one code path.

use super::polynomial::Polynomial;
use serde::{Deserialize, Serialize};

/// Modulus of a residue ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modulus {
    Integer(u64),
    Polynomial(Polynomial),
}

impl Modulus {
    /// Number of residues (n, or 2^deg P).
    pub fn residues(&self) -> u64 {
        match *self {
            Modulus::Integer(n) => n,
            Modulus::Polynomial(p) => p.degree().map_or(0, |d| 1u64 << d),
        }
    }

    /// Product of two residues.
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        match *self {
            Modulus::Integer(n) => ((a as u128 * b as u128) % n as u128) as u64,
            Modulus::Polynomial(p) => Polynomial::from_bits(a)
                .mul_mod(Polynomial::from_bits(b), p)
                .bits(),
        }
    }

    /// Reduce an arbitrary value into the residue range.
    pub fn reduce(&self, a: u64) -> u64 {
        match *self {
            Modulus::Integer(n) => a % n,
            Modulus::Polynomial(p) => Polynomial::from_bits(a).rem(p).bits(),
        }
    }

    /// Additive inverse (`n - a`; in characteristic 2 every residue is its own negative).
    pub fn negate(&self, a: u64) -> u64 {
        match *self {
            Modulus::Integer(n) => (n - a % n) % n,
            Modulus::Polynomial(_) => a,
        }
    }

    /// `a^exponent` in the ring.
    pub fn pow(&self, a: u64, mut exponent: u64) -> u64 {
        let mut base = a;
        let mut result = self.reduce(1);
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = self.mul(result, base);
            }
            base = self.mul(base, base);
            exponent >>= 1;
        }
        result
    }

    /// Whether `a` is a non-zero residue invertible in the ring.
    pub fn is_unit(&self, a: u64) -> bool {
        if a == 0 || a >= self.residues() {
            return false;
        }
        match *self {
            Modulus::Integer(n) => gcd(a, n) == 1,
            Modulus::Polynomial(p) => Polynomial::from_bits(a).gcd(p) == Polynomial::ONE,
        }
    }

    /// Units of the ring in ascending order of their encoding.
    pub fn units(&self) -> impl Iterator<Item = u64> + '_ {
        (1..self.residues()).filter(move |&a| self.is_unit(a))
    }

    /// Number of units (Euler's totient).
    pub fn unit_count(&self) -> u64 {
        match *self {
            Modulus::Integer(n) => totient(n),
            Modulus::Polynomial(_) => self.units().count() as u64,
        }
    }

    /// Whether the unit `a` belongs to the first half of its `{a, -a}` class.
    pub fn is_half_representative(&self, a: u64) -> bool {
        a <= self.negate(a) || self.negate(a) == 0
    }

    /// Coordinate in [0, 1) of residue `a`: `a / n`, or the truncated Laurent
    /// expansion of `a(z) / P(z)`.
    pub fn coordinate(&self, a: u64) -> f64 {
        match *self {
            Modulus::Integer(n) => a as f64 / n as f64,
            Modulus::Polynomial(p) => {
                let digits = p.degree().unwrap_or(0);
                Polynomial::from_bits(a).laurent_fraction(p, digits)
            }
        }
    }

    /// `base^power` as a residue encoding of the same kind as `self`.
    ///
    /// Used to scale units of a sub-ring into the full ring.
    pub fn scale_factor(base: Modulus, power: u32) -> Option<u64> {
        match base {
            Modulus::Integer(b) => b.checked_pow(power),
            Modulus::Polynomial(b) => b.checked_pow(power).map(Polynomial::bits),
        }
    }

    /// Plain (non-modular) product of two encodings, used to embed the
    /// residues of a sub-ring into a larger ring.
    pub fn embed(&self, scale: u64, a: u64) -> u64 {
        match *self {
            Modulus::Integer(_) => scale * a,
            Modulus::Polynomial(_) => Polynomial::from_bits(scale)
                .checked_mul(Polynomial::from_bits(a))
                .map_or(0, Polynomial::bits),
        }
    }
}

/// Cyclic group of units of a residue ring, with a fixed generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CyclicGroup {
    modulus: Modulus,
    generator: u64,
    order: u64,
}

impl CyclicGroup {
    /// Find the smallest generator of the unit group.
    ///
    /// Returns `None` when the ring has no units or the unit group is not
    /// cyclic.
    pub fn find(modulus: Modulus) -> Option<Self> {
        let order = modulus.unit_count();
        if order == 0 {
            return None;
        }
        let factors = prime_factors(order);
        let generator = modulus.units().find(|&u| {
            factors
                .iter()
                .all(|&q| modulus.pow(u, order / q) != modulus.reduce(1))
        })?;
        Some(Self {
            modulus,
            generator,
            order,
        })
    }

    pub fn modulus(&self) -> Modulus {
        self.modulus
    }

    pub fn generator(&self) -> u64 {
        self.generator
    }

    /// Number of elements of the group.
    pub fn order(&self) -> u64 {
        self.order
    }

    /// `generator^k`.
    pub fn element(&self, k: u64) -> u64 {
        self.modulus.pow(self.generator, k)
    }

    /// Elements `g^0, g^1, ...` in power order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        let mut current = self.modulus.reduce(1);
        (0..self.order).map(move |_| {
            let value = current;
            current = self.modulus.mul(current, self.generator);
            value
        })
    }
}

pub fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

/// Distinct prime factors in ascending order.
pub fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    let mut d = 2;
    while d * d <= n {
        if n % d == 0 {
            factors.push(d);
            while n % d == 0 {
                n /= d;
            }
        }
        d += 1;
    }
    if n > 1 {
        factors.push(n);
    }
    factors
}

/// Euler's totient.
pub fn totient(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    if n == 1 {
        // Z/1Z has no non-zero residue
        return 0;
    }
    prime_factors(n)
        .into_iter()
        .fold(n, |acc, p| acc / p * (p - 1))
}

/// Write `n` as `p^k` with `p` prime, if possible.
pub fn as_prime_power(n: u64) -> Option<(u64, u32)> {
    let factors = prime_factors(n);
    if factors.len() != 1 {
        return None;
    }
    let p = factors[0];
    let mut k = 0;
    let mut rest = n;
    while rest > 1 {
        rest /= p;
        k += 1;
    }
    Some((p, k))
}

pub fn is_prime(n: u64) -> bool {
    n >= 2 && prime_factors(n) == vec![n]
}
