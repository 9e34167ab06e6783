//! Row-major matrices for derivatives and affine transforms.
use std::fmt::Write;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::internal::dot;
use crate::{Error, Result};

/// A `num_row × num_col` matrix of `f64`, stored row by row.
///
/// Derivatives are `target × source` matrices; affine transforms are
/// `(target + 1) × (source + 1)` matrices in homogeneous coordinates.
///
/// # Example
///
/// ```
/// # use geoconform::*;
/// # fn main() -> Result<()> {
/// let m = Matrix::from_rows(&[
///     &[0.0, 1.0, 0.0],
///     &[1.0, 0.0, 0.0],
///     &[0.0, 0.0, 1.0],
/// ])?;
/// assert_eq!(m.num_row(), 3);
/// assert_eq!(m.get(1, 0), 1.0);
/// assert!(!m.is_identity());
/// assert!(m.is_affine());
/// # Ok(())}
/// ```
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Matrix {
    pub(crate) num_row: usize,
    pub(crate) num_col: usize,
    pub(crate) elements: Vec<f64>,
}

impl Matrix {
    /// Makes a zero-filled matrix.
    pub fn zeros(num_row: usize, num_col: usize) -> Self {
        Self {
            num_row,
            num_col,
            elements: vec![0.0; num_row * num_col],
        }
    }

    /// Makes a square identity matrix.
    pub fn identity(size: usize) -> Self {
        let mut m = Self::zeros(size, size);
        for i in 0..size {
            m.elements[i * size + i] = 1.0;
        }
        m
    }

    /// Makes a matrix from row-major elements.
    ///
    /// # Errors
    ///
    /// If `elements.len() != num_row * num_col`.
    pub fn new(num_row: usize, num_col: usize, elements: Vec<f64>) -> Result<Self> {
        if num_row.checked_mul(num_col) != Some(elements.len()) {
            return Err(Error::new_contract_violation(format!(
                "{} elements can not fill a {num_row}×{num_col} matrix",
                elements.len()
            )));
        }
        Ok(Self {
            num_row,
            num_col,
            elements,
        })
    }

    /// Makes a matrix from rows.
    ///
    /// # Errors
    ///
    /// If the rows have not all the same length.
    pub fn from_rows(rows: &[&[f64]]) -> Result<Self> {
        let num_col = rows.first().map_or(0, |r| r.len());
        let mut elements = Vec::with_capacity(rows.len() * num_col);
        for row in rows {
            if row.len() != num_col {
                return Err(Error::new_contract_violation("ragged matrix rows"));
            }
            elements.extend_from_slice(row);
        }
        Self::new(rows.len(), num_col, elements)
    }

    #[inline]
    pub fn num_row(&self) -> usize {
        self.num_row
    }

    #[inline]
    pub fn num_col(&self) -> usize {
        self.num_col
    }

    /// Returns the element at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics when out of bounds.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(col < self.num_col, "column {col} out of bounds");
        self.elements[row * self.num_col + col]
    }

    /// Sets the element at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics when out of bounds.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        assert!(col < self.num_col, "column {col} out of bounds");
        self.elements[row * self.num_col + col] = value;
    }

    /// Returns the row `row`.
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.num_col;
        &self.elements[start..start + self.num_col]
    }

    /// Returns `true` if square with ones on the diagonal and zeros elsewhere.
    pub fn is_identity(&self) -> bool {
        if self.num_row != self.num_col {
            return false;
        }
        self.elements.iter().enumerate().all(|(k, v)| {
            let expected = if k / self.num_col == k % self.num_col {
                1.0
            } else {
                0.0
            };
            *v == expected
        })
    }

    /// Returns `true` if the last row is `[0, …, 0, 1]`.
    pub fn is_affine(&self) -> bool {
        if self.num_row == 0 || self.num_col == 0 {
            return false;
        }
        let last = self.row(self.num_row - 1);
        let (linear, one) = last.split_at(self.num_col - 1);
        linear.iter().all(|v| *v == 0.0) && one[0] == 1.0
    }

    /// Returns `self × other`.
    ///
    /// # Errors
    ///
    /// If the inner dimensions differ.
    pub fn multiply(&self, other: &Matrix) -> Result<Matrix> {
        if self.num_col != other.num_row {
            return Err(Error::new_contract_violation(format!(
                "can not multiply {}×{} by {}×{}",
                self.num_row, self.num_col, other.num_row, other.num_col
            )));
        }
        let mut r = Matrix::zeros(self.num_row, other.num_col);
        let mut column = vec![0.0; other.num_row];
        for j in 0..other.num_col {
            for (k, c) in column.iter_mut().enumerate() {
                *c = other.get(k, j);
            }
            for i in 0..self.num_row {
                r.set(i, j, dot(self.row(i), &column));
            }
        }
        Ok(r)
    }

    /// Returns the transpose.
    pub fn transpose(&self) -> Matrix {
        let mut r = Matrix::zeros(self.num_col, self.num_row);
        for i in 0..self.num_row {
            for j in 0..self.num_col {
                r.set(j, i, self.get(i, j));
            }
        }
        r
    }

    /// Returns the inverse of a square matrix by Gauss-Jordan elimination.
    ///
    /// # Errors
    ///
    /// If the matrix is not square or is singular; singular matrices are
    /// reported as [`ErrorImpl::Unsupported`](crate::error::ErrorImpl::Unsupported).
    pub fn inverse(&self) -> Result<Matrix> {
        let n = self.num_row;
        if n != self.num_col {
            return Err(Error::new_contract_violation(format!(
                "a {}×{} matrix has no inverse",
                self.num_row, self.num_col
            )));
        }
        let mut a = self.clone();
        let mut inv = Matrix::identity(n);
        for col in 0..n {
            let pivot = (col..n)
                .max_by(|&x, &y| a.get(x, col).abs().total_cmp(&a.get(y, col).abs()))
                .unwrap_or(col);
            let p = a.get(pivot, col);
            if p == 0.0 || !p.is_finite() {
                return Err(Error::new_unsupported("inverse of a singular matrix"));
            }
            a.swap_rows(col, pivot);
            inv.swap_rows(col, pivot);
            for j in 0..n {
                a.set(col, j, a.get(col, j) / p);
                inv.set(col, j, inv.get(col, j) / p);
            }
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a.get(row, col);
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a.set(row, j, crate::mul_add!(-factor, a.get(col, j), a.get(row, j)));
                    inv.set(row, j, crate::mul_add!(-factor, inv.get(col, j), inv.get(row, j)));
                }
            }
        }
        Ok(inv)
    }

    /// Returns the inverse of an affine matrix, square or not.
    ///
    /// A non-square affine matrix is inverted over the source dimensions it
    /// actually uses. Source dimensions whose column is entirely zero can not
    /// be recovered, the inverse maps them to NaN. Target dimensions whose
    /// row is entirely zero are ignored by the inverse.
    ///
    /// # Errors
    ///
    /// If the matrix is not affine or the retained square part is singular.
    ///
    /// # Example
    ///
    /// ```
    /// # use geoconform::*;
    /// # fn main() -> Result<()> {
    /// let m = Matrix::from_rows(&[
    ///     &[2.0, 0.0, 0.0, 0.0, 8.0],
    ///     &[0.0, 0.0, 4.0, 0.0, 5.0],
    ///     &[0.0, 0.0, 0.0, 0.0, 1.0],
    /// ])?;
    /// let inv = m.inverse_affine()?;
    /// assert_eq!((inv.num_row(), inv.num_col()), (5, 3));
    /// assert_eq!(inv.row(0), &[0.5, 0.0, -4.0]);
    /// assert!(inv.get(1, 2).is_nan());
    /// # Ok(())}
    /// ```
    pub fn inverse_affine(&self) -> Result<Matrix> {
        if !self.is_affine() {
            return Err(Error::new_contract_violation("matrix is not affine"));
        }
        if self.num_row == self.num_col {
            return self.inverse();
        }
        let src_dim = self.num_col - 1;
        let tgt_dim = self.num_row - 1;
        let used_cols: Vec<usize> = (0..src_dim)
            .filter(|&c| (0..tgt_dim).any(|r| self.get(r, c) != 0.0))
            .collect();
        let used_rows: Vec<usize> = (0..tgt_dim)
            .filter(|&r| (0..src_dim).any(|c| self.get(r, c) != 0.0))
            .collect();
        if used_cols.len() != used_rows.len() {
            return Err(Error::new_unsupported(format!(
                "inverse of a {}×{} affine matrix using {} columns over {} rows",
                self.num_row,
                self.num_col,
                used_cols.len(),
                used_rows.len()
            )));
        }
        let n = used_cols.len();
        let mut square = Matrix::identity(n + 1);
        for (i, &r) in used_rows.iter().enumerate() {
            for (j, &c) in used_cols.iter().enumerate() {
                square.set(i, j, self.get(r, c));
            }
            square.set(i, n, self.get(r, src_dim));
        }
        let sub = square.inverse()?;

        let mut r = Matrix::zeros(src_dim + 1, tgt_dim + 1);
        r.set(src_dim, tgt_dim, 1.0);
        for c in 0..src_dim {
            r.set(c, tgt_dim, f64::NAN);
        }
        for (i, &c) in used_cols.iter().enumerate() {
            for (j, &row) in used_rows.iter().enumerate() {
                r.set(c, row, sub.get(i, j));
            }
            r.set(c, tgt_dim, sub.get(i, n));
        }
        Ok(r)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a != b {
            for j in 0..self.num_col {
                self.elements.swap(a * self.num_col + j, b * self.num_col + j);
            }
        }
    }
}

impl std::fmt::Display for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cells: Vec<String> = self.elements.iter().map(|v| format!("{v}")).collect();
        let width = cells.iter().map(|c| c.chars().count()).max().unwrap_or(0);
        let mut line = String::new();
        for row in cells.chunks(self.num_col.max(1)) {
            line.clear();
            line.push('│');
            for cell in row {
                write!(line, " {cell:>width$}")?;
            }
            line.push_str(" │");
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        assert!(Matrix::identity(3).is_identity());
        assert!(Matrix::identity(3).is_affine());
        assert!(!Matrix::zeros(2, 3).is_identity());
        assert!(!Matrix::zeros(2, 2).is_affine());
    }

    #[test]
    fn test_new() {
        assert!(Matrix::new(2, 2, vec![1.0; 3]).is_err());
        assert!(Matrix::from_rows(&[&[1.0, 2.0], &[3.0]]).is_err());
    }

    #[test]
    fn test_multiply() {
        let a = Matrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[&[0.0, 1.0], &[1.0, 0.0]]).unwrap();
        assert_eq!(
            a.multiply(&b).unwrap(),
            Matrix::from_rows(&[&[2.0, 1.0], &[4.0, 3.0]]).unwrap()
        );
        assert!(a.multiply(&Matrix::zeros(3, 1)).is_err());
    }

    #[test]
    fn test_inverse() {
        let a = Matrix::from_rows(&[&[2.0, 0.0, 1.0], &[0.0, 4.0, 2.0], &[0.0, 0.0, 1.0]]).unwrap();
        let inv = a.inverse().unwrap();
        assert_eq!(
            inv,
            Matrix::from_rows(&[&[0.5, 0.0, -0.5], &[0.0, 0.25, -0.5], &[0.0, 0.0, 1.0]]).unwrap()
        );
        assert!(a.multiply(&inv).unwrap().is_identity());

        let singular = Matrix::from_rows(&[&[1.0, 2.0], &[2.0, 4.0]]).unwrap();
        assert!(singular.inverse().unwrap_err().is_skip());
        assert!(Matrix::zeros(2, 3).inverse().is_err());
    }

    #[test]
    fn test_inverse_affine_reduction() {
        let m = Matrix::from_rows(&[
            &[2.0, 0.0, 0.0, 0.0, 8.0],
            &[0.0, 0.0, 4.0, 0.0, 5.0],
            &[0.0, 0.0, 0.0, 0.0, 1.0],
        ])
        .unwrap();
        let inv = m.inverse_affine().unwrap();
        assert_eq!(inv.row(0), &[0.5, 0.0, -4.0]);
        assert_eq!(inv.row(2), &[0.0, 0.25, -1.25]);
        assert_eq!(inv.row(4), &[0.0, 0.0, 1.0]);
        assert_eq!(&inv.row(1)[..2], &[0.0, 0.0]);
        assert!(inv.get(1, 2).is_nan());
        assert!(inv.get(3, 2).is_nan());
    }

    #[test]
    fn test_inverse_affine_expansion() {
        // 1 → 2, the second output is constant
        let m = Matrix::from_rows(&[&[3.0, 1.0], &[0.0, 7.0], &[0.0, 1.0]]).unwrap();
        let inv = m.inverse_affine().unwrap();
        assert_eq!(inv.num_row(), 2);
        assert_eq!(inv.num_col(), 3);
        assert_eq!(inv.row(0), &[1.0 / 3.0, 0.0, -1.0 / 3.0]);
    }

    #[test]
    fn test_display() {
        let m = Matrix::from_rows(&[&[1.0, -2.5], &[10.0, 0.0]]).unwrap();
        assert_eq!(m.to_string(), "│    1 -2.5 │\n│   10    0 │\n");
    }
}
