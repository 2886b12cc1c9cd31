// Copyright (C) 2025 Jeremy J. Carroll. See LICENSE for details.

//! Generator values: what defines one coordinate of a point set.

use crate::algebra::Polynomial;
use crate::pointset::SizeParam;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Generator of one coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenValue {
    /// Multiplier `a` of an integer lattice, point i maps to `a i / n`.
    Integer(u64),
    /// Multiplier `q(z)` of a polynomial lattice.
    Polynomial(Polynomial),
    /// Generating matrix of a digital net.
    Matrix(GeneratingMatrix),
}

impl GenValue {
    /// The identity generator for a point set of the given size.
    pub fn identity(size: &SizeParam) -> Self {
        match *size {
            SizeParam::Integer { .. } => GenValue::Integer(1),
            SizeParam::Polynomial { .. } => GenValue::Polynomial(Polynomial::ONE),
            SizeParam::Digital { rows, cols } => {
                GenValue::Matrix(GeneratingMatrix::identity(rows, cols))
            }
        }
    }

    /// Residue encoding of a lattice generator, `None` for matrices.
    pub fn residue(&self) -> Option<u64> {
        match self {
            GenValue::Integer(a) => Some(*a),
            GenValue::Polynomial(q) => Some(q.bits()),
            GenValue::Matrix(_) => None,
        }
    }
}

impl fmt::Display for GenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenValue::Integer(a) => write!(f, "{}", a),
            GenValue::Polynomial(q) => write!(f, "{}", q),
            GenValue::Matrix(m) => write!(f, "{}", m),
        }
    }
}

/// A `rows x cols` matrix over GF(2), stored by columns.
///
/// Bit `r` of `columns[c]` is the entry in row `r`, column `c`. Row 0 holds
/// the most significant output digit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GeneratingMatrix {
    rows: u32,
    cols: u32,
    columns: Vec<u64>,
}

impl GeneratingMatrix {
    /// Build a matrix from its column words. Bits above `rows` are dropped.
    pub fn from_columns(rows: u32, columns: Vec<u64>) -> Self {
        let mask = row_mask(rows);
        Self {
            rows,
            cols: columns.len() as u32,
            columns: columns.into_iter().map(|c| c & mask).collect(),
        }
    }

    /// Ones on the main diagonal.
    pub fn identity(rows: u32, cols: u32) -> Self {
        Self::from_columns(rows, (0..cols).map(|c| 1u64 << c).collect())
    }

    /// The matrix whose column words are the base `2^rows` digits of
    /// `index`, column 0 least significant.
    pub fn from_index(rows: u32, cols: u32, index: u64) -> Self {
        let mask = row_mask(rows);
        let columns = (0..cols)
            .map(|c| {
                let shift = c as u64 * rows as u64;
                if shift >= 64 {
                    0
                } else {
                    (index >> shift) & mask
                }
            })
            .collect();
        Self {
            rows,
            cols,
            columns,
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn columns(&self) -> &[u64] {
        &self.columns
    }

    pub fn get(&self, row: u32, col: u32) -> bool {
        (self.columns[col as usize] >> row) & 1 == 1
    }

    /// Rank over GF(2).
    pub fn rank(&self) -> u32 {
        let mut basis: Vec<u64> = Vec::with_capacity(self.cols as usize);
        for &column in &self.columns {
            let mut v = column;
            for &b in &basis {
                v = v.min(v ^ b);
            }
            if v != 0 {
                basis.push(v);
                basis.sort_unstable_by(|a, b| b.cmp(a));
            }
        }
        basis.len() as u32
    }

    pub fn has_full_column_rank(&self) -> bool {
        self.rank() == self.cols
    }

    /// Columns with the row order reversed, so that row 0 lands on the most
    /// significant of `rows` bits. XOR-ing these yields output digits read
    /// directly as the integer `y` of the coordinate `y / 2^rows`.
    pub fn output_columns(&self) -> Vec<u64> {
        self.columns
            .iter()
            .map(|&c| c.reverse_bits().checked_shr(64 - self.rows).unwrap_or(0))
            .collect()
    }
}

fn row_mask(rows: u32) -> u64 {
    if rows >= 64 {
        u64::MAX
    } else {
        (1u64 << rows) - 1
    }
}

impl fmt::Display for GeneratingMatrix {
    /// One line per row, e.g. "10/01" for the 2x2 identity.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            if row > 0 {
                write!(f, "/")?;
            }
            for col in 0..self.cols {
                write!(f, "{}", if self.get(row, col) { '1' } else { '0' })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let m = GeneratingMatrix::identity(3, 2);
        assert_eq!(m.to_string(), "10/01/00");
        assert_eq!(m.rank(), 2);
        assert!(m.has_full_column_rank());
    }

    #[test]
    fn test_rank_of_dependent_columns() {
        let m = GeneratingMatrix::from_columns(3, vec![0b011, 0b101, 0b110]);
        assert_eq!(m.rank(), 2);
        assert!(!m.has_full_column_rank());
        let zero = GeneratingMatrix::from_columns(2, vec![0, 1]);
        assert_eq!(zero.rank(), 1);
    }

    #[test]
    fn test_from_index() {
        let m = GeneratingMatrix::from_index(2, 2, 0b10_01);
        assert_eq!(m.columns(), &[0b01, 0b10]);
        assert_eq!(m, GeneratingMatrix::identity(2, 2));
    }

    #[test]
    fn test_output_columns() {
        // row 0 becomes the most significant of three bits
        let m = GeneratingMatrix::identity(3, 3);
        assert_eq!(m.output_columns(), vec![0b100, 0b010, 0b001]);
    }

    #[test]
    fn test_identity_generators() {
        assert_eq!(GenValue::identity(&SizeParam::integer(7)), GenValue::Integer(1));
        assert_eq!(
            GenValue::identity(&SizeParam::digital(2, 2)),
            GenValue::Matrix(GeneratingMatrix::identity(2, 2))
        );
        assert_eq!(GenValue::Integer(5).residue(), Some(5));
    }
}
