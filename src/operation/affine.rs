use std::sync::Arc;

use crate::internal::dot;
use crate::matrix::Matrix;
use crate::transform::{check_point_dimensions, MathTransform, MathTransform1D, MathTransform2D};
use crate::{Error, Result};

/// A linear transform in homogeneous coordinates.
///
/// The matrix has `target + 1` rows and `source + 1` columns; its last row
/// must be `[0, …, 0, 1]`.
///
/// # Example
///
/// ```
/// # use geoconform::*;
/// # fn main() -> Result<()> {
/// let swap = AffineTransform::new(Matrix::from_rows(&[
///     &[0.0, 1.0, 0.0],
///     &[1.0, 0.0, 0.0],
///     &[0.0, 0.0, 1.0],
/// ])?)?;
/// let mut dst = [0.0; 2];
/// swap.transform(&[3.0, 5.0], &mut dst)?;
/// assert_eq!(dst, [5.0, 3.0]);
/// # Ok(())}
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix,
}

impl AffineTransform {
    /// # Errors
    ///
    /// If `matrix` is not affine or has less than two rows or columns.
    pub fn new(matrix: Matrix) -> Result<Self> {
        if matrix.num_row() < 2 || matrix.num_col() < 2 || !matrix.is_affine() {
            return Err(Error::new_invalid_parameter(
                "matrix",
                format!(
                    "a {}×{} matrix is not an affine transform",
                    matrix.num_row(),
                    matrix.num_col()
                ),
            ));
        }
        Ok(Self { matrix })
    }

    /// Makes an identity transform of the given dimension.
    pub fn identity(dimension: usize) -> Self {
        Self {
            matrix: Matrix::identity(dimension + 1),
        }
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    fn linear(&self) -> Matrix {
        let (tgt, src) = (self.target_dimensions(), self.source_dimensions());
        let mut m = Matrix::zeros(tgt, src);
        for j in 0..tgt {
            for i in 0..src {
                m.set(j, i, self.matrix.get(j, i));
            }
        }
        m
    }
}

impl MathTransform for AffineTransform {
    fn source_dimensions(&self) -> usize {
        self.matrix.num_col() - 1
    }

    fn target_dimensions(&self) -> usize {
        self.matrix.num_row() - 1
    }

    fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
        check_point_dimensions(self, src, dst)?;
        let n = src.len();
        for (j, d) in dst.iter_mut().enumerate() {
            let row = self.matrix.row(j);
            *d = dot(&row[..n], src) + row[n];
        }
        Ok(())
    }

    fn is_identity(&self) -> bool {
        self.matrix.is_identity()
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>> {
        Ok(Arc::new(Self {
            matrix: self.matrix.inverse_affine()?,
        }))
    }

    fn derivative(&self, point: &[f64]) -> Result<Matrix> {
        if point.len() != self.source_dimensions() {
            return Err(Error::new_contract_violation(format!(
                "a {}D point given to a {}D transform",
                point.len(),
                self.source_dimensions()
            )));
        }
        Ok(self.linear())
    }

    fn as_1d(&self) -> Option<&dyn MathTransform1D> {
        (self.matrix.num_row() == 2 && self.matrix.num_col() == 2)
            .then_some(self as &dyn MathTransform1D)
    }

    fn as_2d(&self) -> Option<&dyn MathTransform2D> {
        (self.matrix.num_row() == 3 && self.matrix.num_col() == 3)
            .then_some(self as &dyn MathTransform2D)
    }

    fn to_wkt(&self) -> Option<String> {
        let mut s = format!(
            "PARAM_MT[\"Affine\", PARAMETER[\"num_row\", {}], PARAMETER[\"num_col\", {}]",
            self.matrix.num_row(),
            self.matrix.num_col()
        );
        let last = self.matrix.num_row() - 1;
        for j in 0..self.matrix.num_row() {
            for i in 0..self.matrix.num_col() {
                let v = self.matrix.get(j, i);
                // elements of the identity are implicit, except the final 1
                let implicit = if i == j && j != last { 1.0 } else { 0.0 };
                if j != last && !(v == implicit) {
                    s.push_str(&format!(", PARAMETER[\"elt_{j}_{i}\", {v}]"));
                }
            }
        }
        s.push(']');
        Some(s)
    }
}

impl MathTransform1D for AffineTransform {
    fn transform_value(&self, value: f64) -> Result<f64> {
        let mut dst = [0.0];
        self.transform(&[value], &mut dst)?;
        Ok(dst[0])
    }

    fn derivative_value(&self, _value: f64) -> Result<f64> {
        Ok(self.matrix.get(0, 0))
    }
}

impl MathTransform2D for AffineTransform {
    fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut dst = [0.0; 2];
        self.transform(&[x, y], &mut dst)?;
        Ok((dst[0], dst[1]))
    }

    fn derivative_point(&self, _x: f64, _y: f64) -> Result<Matrix> {
        Ok(self.linear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduction() -> AffineTransform {
        AffineTransform::new(
            Matrix::from_rows(&[
                &[2.0, 0.0, 0.0, 0.0, 8.0],
                &[0.0, 0.0, 4.0, 0.0, 5.0],
                &[0.0, 0.0, 0.0, 0.0, 1.0],
            ])
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_identity() {
        for dim in 1..=3 {
            let tr = AffineTransform::identity(dim);
            assert!(tr.is_identity());
            assert_eq!(tr.source_dimensions(), dim);
            assert!(tr.inverse().unwrap().is_identity());
        }
        assert!(AffineTransform::identity(1).as_1d().is_some());
        assert!(AffineTransform::identity(2).as_2d().is_some());
        assert!(AffineTransform::identity(3).as_2d().is_none());
    }

    #[test]
    fn test_new() {
        assert!(AffineTransform::new(Matrix::zeros(3, 3)).is_err());
        assert!(AffineTransform::new(Matrix::identity(1)).is_err());
    }

    #[test]
    fn test_reduction() {
        let tr = reduction();
        assert_eq!((tr.source_dimensions(), tr.target_dimensions()), (4, 2));

        let mut dst = [0.0; 2];
        tr.transform(&[0.0, 0.0, 0.0, 0.0], &mut dst).unwrap();
        assert_eq!(dst, [8.0, 5.0]);
        tr.transform(&[1.0, 1.0, 1.0, 1.0], &mut dst).unwrap();
        assert_eq!(dst, [10.0, 9.0]);
        tr.transform(&[8.0, 3.0, -7.0, 5.0], &mut dst).unwrap();
        assert_eq!(dst, [24.0, -23.0]);

        let inverse = tr.inverse().unwrap();
        let mut back = [0.0; 4];
        inverse.transform(&[8.0, 5.0], &mut back).unwrap();
        assert_eq!(back[0], 0.0);
        assert!(back[1].is_nan());
        assert_eq!(back[2], 0.0);
        assert!(back[3].is_nan());
    }

    #[test]
    fn test_derivative() {
        let tr = reduction();
        let d = tr.derivative(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(
            d,
            Matrix::from_rows(&[&[2.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 4.0, 0.0]]).unwrap()
        );
        assert!(tr.derivative(&[1.0]).is_err());
    }

    #[test]
    fn test_wkt() {
        let tr = AffineTransform::new(
            Matrix::from_rows(&[&[1.0, 0.0, 3.0], &[0.0, 2.0, 0.0], &[0.0, 0.0, 1.0]]).unwrap(),
        )
        .unwrap();
        assert_eq!(
            tr.to_wkt().unwrap(),
            "PARAM_MT[\"Affine\", PARAMETER[\"num_row\", 3], PARAMETER[\"num_col\", 3], \
             PARAMETER[\"elt_0_2\", 3], PARAMETER[\"elt_1_1\", 2]]"
        );
    }
}
