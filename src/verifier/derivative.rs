use log::debug;

use crate::config::Key;
use crate::tolerance::{compute_tolerances, CalculationType};
use crate::{Error, Matrix, Result};

use super::TransformTestCase;

impl TransformTestCase {
    /// Checks the derivative at `point` against finite differences.
    ///
    /// Along each source axis `i` the point is moved by `±delta/2`, where
    /// `delta` is the `i`-th of the [derivative deltas](TransformTestCase::derivative_deltas)
    /// or the last one. Central, forward and backward differences are
    /// computed; the central one is the estimate and the spread between
    /// the three widens the tolerance of that element.
    ///
    /// Does nothing if [`Key::IsDerivativeSupported`] is false.
    ///
    /// # Errors
    ///
    /// A configuration error if no deltas are set, a contract violation if
    /// `point` or the matrix have wrong dimensions, or the first element
    /// off tolerance.
    ///
    /// # Example
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use geoconform::*;
    /// # fn main() -> Result<()> {
    /// let mercator = Mercator::variant_a(6377397.155, 6356078.963, 110.0, 0.997, 3900000.0, 900000.0)?;
    /// let test = TransformTestCaseBuilder::new()
    ///     .transform(Arc::new(mercator))
    ///     .tolerance(0.01)
    ///     .derivative_deltas(vec![1e-6])
    ///     .build()?;
    /// test.verify_derivative(&[120.0, -3.0])?;
    /// # Ok(())}
    /// ```
    pub fn verify_derivative(&self, point: &[f64]) -> Result<()> {
        if !self.is_enabled(Key::IsDerivativeSupported) {
            debug!("{} is false, derivative not verified", Key::IsDerivativeSupported);
            return Ok(());
        }
        let deltas = self.required_deltas()?;
        let transform = self.require_transform()?;
        let sd = transform.source_dimensions();
        let td = transform.target_dimensions();
        if point.len() != sd {
            return Err(Error::new_contract_violation(format!(
                "a {}D point given to a {sd}D transform",
                point.len()
            )));
        }

        let mut t0 = vec![0.0; td];
        transform.transform(point, &mut t0)?;
        let matrix = transform
            .derivative(point)
            .map_err(|e| self.refused(Key::IsDerivativeSupported, e))?;
        if matrix.num_row() != td || matrix.num_col() != sd {
            return Err(Error::new_contract_violation(format!(
                "the derivative of a {sd}D → {td}D transform is a {}×{} matrix",
                matrix.num_row(),
                matrix.num_col()
            )));
        }

        let modifier = self.effective_modifier();
        let base = compute_tolerances(self.tolerance, td, &t0, CalculationType::Derivative, modifier.as_deref());
        let mut approximation = Matrix::zeros(td, sd);
        let mut tolerance = Matrix::zeros(td, sd);
        let mut s = point.to_vec();
        let mut t1 = vec![0.0; td];
        let mut t2 = vec![0.0; td];
        for i in 0..sd {
            let delta = deltas[i.min(deltas.len() - 1)];
            let half = delta / 2.0;
            s[i] = point[i] - half;
            transform.transform(&s, &mut t1)?;
            s[i] = point[i] + half;
            transform.transform(&s, &mut t2)?;
            s[i] = point[i];

            for j in 0..td {
                let dc = (t2[j] - t1[j]) / delta;
                let df = (t2[j] - t0[j]) / half;
                let db = (t0[j] - t1[j]) / half;
                approximation.set(j, i, dc);
                tolerance.set(
                    j,
                    i,
                    base[j].max((df - db).abs().max((dc - db).abs().max((dc - df).abs()))),
                );
            }
        }
        self.assert_matrix_equals(
            "Derivative does not match the finite difference approximation.",
            &approximation,
            &matrix,
            Some(&tolerance),
            CalculationType::Derivative,
        )?;

        if let Some(t1) = transform.as_1d() {
            if sd == 1 && td == 1 {
                let d = t1.derivative_value(point[0])?;
                self.assert_matrix_equals(
                    "MathTransform1D::derivative_value",
                    &matrix,
                    &Matrix::new(1, 1, vec![d])?,
                    None,
                    CalculationType::Strict,
                )?;
            }
        }
        if let Some(t2) = transform.as_2d() {
            if sd == 2 && td == 2 {
                let m = t2.derivative_point(point[0], point[1])?;
                self.assert_matrix_equals(
                    "MathTransform2D::derivative_point",
                    &matrix,
                    &m,
                    None,
                    CalculationType::Strict,
                )?;
            }
        }
        Ok(())
    }

    pub(crate) fn required_deltas(&self) -> Result<&[f64]> {
        match self.derivative_deltas.as_deref() {
            Some(deltas) if !deltas.is_empty() => Ok(deltas),
            _ => Err(Error::new_configuration(
                "derivative deltas must be set when derivatives are verified",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::Arc;

    use crate::error::ErrorImpl;
    use crate::transform::{check_point_dimensions, MathTransform1D, MathTransform2D};
    use crate::{MathTransform, TransformTestCaseBuilder};

    use super::*;

    /// `y = x²`, with a configurable slope factor in its derivative.
    #[derive(Debug)]
    struct Square {
        slope: f64,
        calls: Cell<usize>,
        columns: usize,
    }

    impl Square {
        fn new(slope: f64) -> Self {
            Self {
                slope,
                calls: Cell::new(0),
                columns: 1,
            }
        }
    }

    impl MathTransform for Square {
        fn source_dimensions(&self) -> usize {
            1
        }

        fn target_dimensions(&self) -> usize {
            1
        }

        fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
            check_point_dimensions(self, src, dst)?;
            self.calls.set(self.calls.get() + 1);
            dst[0] = src[0] * src[0];
            Ok(())
        }

        fn derivative(&self, point: &[f64]) -> Result<Matrix> {
            Matrix::new(1, self.columns, vec![self.slope * point[0]; self.columns])
        }

        fn as_1d(&self) -> Option<&dyn MathTransform1D> {
            Some(self)
        }
    }

    impl MathTransform1D for Square {
        fn transform_value(&self, value: f64) -> Result<f64> {
            Ok(value * value)
        }

        fn derivative_value(&self, value: f64) -> Result<f64> {
            Ok(2.0 * value + 1e-9)
        }
    }

    fn case(transform: Square) -> TransformTestCase {
        TransformTestCaseBuilder::new()
            .transform(Arc::new(transform))
            .tolerance(1e-6)
            .derivative_deltas(vec![0.01])
            .build()
            .unwrap()
    }

    #[test]
    fn test_analytical() {
        // the central difference of a parabola is exact
        let err = case(Square::new(2.0)).verify_derivative(&[3.0]).unwrap_err();
        match err.kind() {
            ErrorImpl::DerivativeFailure(f) => {
                // derivative_value is slightly off
                assert_eq!(f.message, "MathTransform1D::derivative_value");
                assert_eq!(f.tolerance, 0.0);
            }
            e => panic!("{e:?}"),
        }
    }

    #[test]
    fn test_wrong_slope() {
        let err = case(Square::new(3.0)).verify_derivative(&[3.0]).unwrap_err();
        match err.kind() {
            ErrorImpl::DerivativeFailure(f) => {
                assert_eq!((f.row, f.column), (0, 0));
                assert_eq!(f.actual, 9.0);
                assert!((f.expected - 6.0).abs() < 1e-9);
                // the spread of a parabola is delta
                assert!((f.tolerance - 0.01).abs() < 1e-9);
            }
            e => panic!("{e:?}"),
        }
    }

    #[test]
    fn test_contract() {
        let mut square = Square::new(2.0);
        square.columns = 2;
        let err = case(square).verify_derivative(&[3.0]).unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));

        let err = case(Square::new(2.0)).verify_derivative(&[3.0, 1.0]).unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));
    }

    #[test]
    fn test_missing_deltas() {
        let square = Arc::new(Square::new(2.0));
        for deltas in [None, Some(vec![])] {
            let mut test = TransformTestCaseBuilder::new()
                .transform(square.clone())
                .build()
                .unwrap();
            test.set_derivative_deltas(deltas);
            let err = test.verify_derivative(&[3.0]).unwrap_err();
            assert!(matches!(err.kind(), ErrorImpl::Configuration { .. }));
        }
        assert_eq!(square.calls.get(), 0);

        let test = TransformTestCaseBuilder::new()
            .transform(square.clone())
            .enable(Key::IsDerivativeSupported, false)
            .build()
            .unwrap();
        test.verify_derivative(&[3.0]).unwrap();
        assert_eq!(square.calls.get(), 0);
    }

    #[test]
    fn test_last_delta_reused() {
        let affine = crate::AffineTransform::new(
            Matrix::from_rows(&[&[1.0, 2.0, 3.0, 0.0], &[0.0, 1.0, -1.0, 5.0], &[0.0, 0.0, 0.0, 1.0]]).unwrap(),
        )
        .unwrap();
        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(affine))
            .tolerance(1e-9)
            .derivative_deltas(vec![0.5, 0.25])
            .build()
            .unwrap();
        test.verify_derivative(&[1.0, 2.0, 3.0]).unwrap();
    }

    /// `(x, y) → (x, -y)`, whose point form writes its zeros as `-0.0`.
    #[derive(Debug)]
    struct Mirror;

    impl MathTransform for Mirror {
        fn source_dimensions(&self) -> usize {
            2
        }

        fn target_dimensions(&self) -> usize {
            2
        }

        fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
            check_point_dimensions(self, src, dst)?;
            dst[0] = src[0];
            dst[1] = -src[1];
            Ok(())
        }

        fn derivative(&self, _point: &[f64]) -> Result<Matrix> {
            Matrix::from_rows(&[&[1.0, 0.0], &[0.0, -1.0]])
        }

        fn as_2d(&self) -> Option<&dyn MathTransform2D> {
            Some(self)
        }
    }

    impl MathTransform2D for Mirror {
        fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
            Ok((x, -y))
        }

        fn derivative_point(&self, _x: f64, _y: f64) -> Result<Matrix> {
            Matrix::from_rows(&[&[1.0, -0.0], &[-0.0, -1.0]])
        }
    }

    #[test]
    fn test_signed_zero_in_point_form() {
        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(Mirror))
            .tolerance(1e-6)
            .derivative_deltas(vec![0.01])
            .build()
            .unwrap();
        test.verify_derivative(&[1.0, 1.0]).unwrap();
    }
}
