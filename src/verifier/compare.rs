use crate::error::{DerivativeFailure, Precision, TransformFailure};
use crate::internal::same_bits;
use crate::ordinate::{load, Ordinate};
use crate::tolerance::{compute_tolerances, CalculationType};
use crate::{Error, Matrix, Result};

use super::TransformTestCase;

/// [`CalculationType::Identity`] requires bit identity, so `0.0` and `-0.0` differ there.
/// Other modes, [`CalculationType::Strict`] included, accept a delta within tolerance.
#[inline]
fn mismatch(expected: f64, actual: f64, delta: f64, tolerance: f64, mode: CalculationType) -> bool {
    if mode == CalculationType::Identity {
        !same_bits(expected, actual)
    } else {
        !(delta <= tolerance) && !same_bits(expected, actual)
    }
}

impl TransformTestCase {
    /// Compares `num_points` tuples of `dimension` ordinates.
    ///
    /// Tolerances are recomputed for each point from its expected position.
    /// When either array holds `f32`, both are compared at `f32` precision.
    /// `reported_index` is added to the point index in failure reports.
    ///
    /// # Errors
    ///
    /// A [`TransformFailure`](crate::error::ErrorImpl::TransformFailure) at the
    /// first mismatch, or a contract violation if an array is too short.
    ///
    /// # Example
    ///
    /// ```
    /// # use geoconform::*;
    /// # use geoconform::tolerance::CalculationType;
    /// # fn main() -> Result<()> {
    /// let test = TransformTestCaseBuilder::new().tolerance(0.01).build()?;
    /// test.assert_coordinates_equal("close", 2, &[1.0, 2.0], &[1.005f32, 2.0], 1, CalculationType::DirectTransform, 0)?;
    ///
    /// let err = test
    ///     .assert_coordinates_equal("exact", 2, &[1.0, 2.0], &[1.005f32, 2.0], 1, CalculationType::Strict, 0)
    ///     .unwrap_err();
    /// assert!(err.is_comparison_failure());
    /// # Ok(())}
    /// ```
    #[allow(clippy::too_many_arguments)]
    pub fn assert_coordinates_equal<E: Ordinate, A: Ordinate>(
        &self,
        message: &str,
        dimension: usize,
        expected: &[E],
        actual: &[A],
        num_points: usize,
        mode: CalculationType,
        reported_index: usize,
    ) -> Result<()> {
        let length = num_points.checked_mul(dimension).ok_or_else(|| {
            Error::new_contract_violation(format!("{num_points} points of dimension {dimension}"))
        })?;
        if expected.len() < length || actual.len() < length {
            return Err(Error::new_contract_violation(format!(
                "{message} arrays of length {} and {} can not hold {num_points} points of dimension {dimension}",
                expected.len(),
                actual.len()
            )));
        }

        let double = E::IS_DOUBLE && A::IS_DOUBLE;
        let modifier = if mode.is_exact() {
            None
        } else {
            self.effective_modifier()
        };

        let mut e = vec![0.0; dimension];
        let mut a = vec![0.0; dimension];
        let mut normalized = vec![0.0; dimension];
        for i in 0..num_points {
            let range = i * dimension..(i + 1) * dimension;
            load(&expected[range.clone()], &mut e, double);
            load(&actual[range], &mut a, double);
            normalized.copy_from_slice(&a);
            if !mode.is_exact() {
                if let Some(normalize) = &self.normalizer {
                    normalize(&e, &mut normalized, mode);
                }
            }

            let tolerances = compute_tolerances(self.tolerance, dimension, &e, mode, modifier.as_deref());
            for (k, tolerance) in tolerances.iter().enumerate() {
                let delta = (e[k] - normalized[k]).abs();
                if mismatch(e[k], normalized[k], delta, *tolerance, mode) {
                    return Err(Error::new_transform_failure(TransformFailure {
                        message: message.to_string(),
                        point: reported_index + i,
                        ordinate: k,
                        expected: e,
                        actual: a,
                        delta,
                        tolerance: *tolerance,
                        precision: if double {
                            Precision::Double
                        } else {
                            Precision::Single
                        },
                        transform: self.transform_text(),
                    }));
                }
            }
        }
        Ok(())
    }

    /// Compares one tuple with another of the same dimension.
    ///
    /// # Errors
    ///
    /// As [`assert_coordinates_equal`](TransformTestCase::assert_coordinates_equal),
    /// or a contract violation if the dimensions differ.
    pub fn assert_coordinate_equals(
        &self,
        message: &str,
        expected: &[f64],
        actual: &[f64],
        reported_index: usize,
        mode: CalculationType,
    ) -> Result<()> {
        if expected.len() != actual.len() {
            return Err(Error::new_contract_violation(format!(
                "{message} expected a {}D tuple, got {}D",
                expected.len(),
                actual.len()
            )));
        }
        self.assert_coordinates_equal(message, expected.len(), expected, actual, 1, mode, reported_index)
    }

    /// Compares two matrices element by element.
    ///
    /// Each element uses the matching element of `tolerance` if given, or
    /// else the base tolerance; exact modes always use zero.
    ///
    /// # Errors
    ///
    /// A [`DerivativeFailure`](crate::error::ErrorImpl::DerivativeFailure) at
    /// the first mismatch, or a contract violation if the shapes differ.
    pub fn assert_matrix_equals(
        &self,
        message: &str,
        expected: &Matrix,
        actual: &Matrix,
        tolerance: Option<&Matrix>,
        mode: CalculationType,
    ) -> Result<()> {
        let shape = (expected.num_row(), expected.num_col());
        if shape != (actual.num_row(), actual.num_col())
            || tolerance.is_some_and(|t| shape != (t.num_row(), t.num_col()))
        {
            return Err(Error::new_contract_violation(format!(
                "{message} expected a {}×{} matrix, got {}×{}",
                shape.0,
                shape.1,
                actual.num_row(),
                actual.num_col()
            )));
        }

        for j in 0..shape.0 {
            for i in 0..shape.1 {
                let e = expected.get(j, i);
                let a = actual.get(j, i);
                let tol = if mode.is_exact() {
                    0.0
                } else {
                    tolerance.map_or(self.tolerance, |t| t.get(j, i))
                };
                if mismatch(e, a, (e - a).abs(), tol, mode) {
                    return Err(Error::new_derivative_failure(DerivativeFailure {
                        message: message.to_string(),
                        row: j,
                        column: i,
                        expected: e,
                        actual: a,
                        tolerance: tol,
                        expected_matrix: expected.clone(),
                        actual_matrix: actual.clone(),
                        transform: self.transform_text(),
                    }));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::ErrorImpl;
    use crate::tolerance::{relative, CalculationType::*};
    use crate::utils::wrap_longitude;
    use crate::{AffineTransform, TransformTestCaseBuilder};

    use super::*;

    fn case(tolerance: f64) -> TransformTestCase {
        TransformTestCaseBuilder::new().tolerance(tolerance).build().unwrap()
    }

    fn failure(err: Error) -> TransformFailure {
        match err.kind() {
            ErrorImpl::TransformFailure(f) => f.clone(),
            _ => panic!("{err}"),
        }
    }

    #[test]
    fn test_tolerance() {
        let test = case(0.1);
        test.assert_coordinates_equal("", 2, &[1.0, 2.0, 3.0, 4.0], &[1.05, 2.0, 3.0, 3.95], 2, DirectTransform, 0)
            .unwrap();

        let f = failure(
            test.assert_coordinates_equal("moved", 2, &[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 4.5], 2, DirectTransform, 10)
                .unwrap_err(),
        );
        assert_eq!(f.message, "moved");
        assert_eq!(f.point, 11);
        assert_eq!(f.ordinate, 1);
        assert_eq!(f.expected, vec![3.0, 4.0]);
        assert_eq!(f.actual, vec![3.0, 4.5]);
        assert_eq!(f.delta, 0.5);
        assert_eq!(f.tolerance, 0.1);
        assert_eq!(f.precision, Precision::Double);
        assert!(f.transform.is_none());
    }

    #[test]
    fn test_strict() {
        let test = case(1.0);
        let err = test
            .assert_coordinates_equal("", 1, &[1.0], &[1.0 + f64::EPSILON], 1, Strict, 0)
            .unwrap_err();
        assert_eq!(failure(err).tolerance, 0.0);
        assert!(test.assert_coordinates_equal("", 1, &[0.0], &[-0.0], 1, Identity, 0).is_err());
        assert!(test.assert_coordinates_equal("", 1, &[0.0], &[-0.0], 1, DirectTransform, 0).is_ok());
        test.assert_coordinates_equal("", 1, &[0.0], &[-0.0], 1, Strict, 0).unwrap();

        let zero = Matrix::zeros(1, 1);
        let mut negative = Matrix::zeros(1, 1);
        negative.set(0, 0, -0.0);
        test.assert_matrix_equals("", &zero, &negative, None, Strict).unwrap();
        assert!(test.assert_matrix_equals("", &zero, &negative, None, Identity).is_err());
    }

    #[test]
    fn test_special_values() {
        let test = case(0.0);
        let values = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY];
        test.assert_coordinates_equal("", 3, &values, &values, 1, Strict, 0).unwrap();
        assert!(test
            .assert_coordinates_equal("", 1, &[f64::INFINITY], &[f64::NEG_INFINITY], 1, DirectTransform, 0)
            .is_err());
        assert!(test
            .assert_coordinates_equal("", 1, &[1.0], &[f64::NAN], 1, DirectTransform, 0)
            .is_err());
    }

    #[test]
    fn test_mixed_precision() {
        let test = case(0.0);
        test.assert_coordinates_equal("", 1, &[0.1f64], &[0.1f32], 1, Strict, 0).unwrap();
        let f = failure(
            test.assert_coordinates_equal("", 1, &[0.1f64], &[0.2f32], 1, Strict, 0)
                .unwrap_err(),
        );
        assert_eq!(f.precision, Precision::Single);
        assert!(test.assert_coordinates_equal("", 1, &[0.1f64], &[0.1f64 as f32 as f64], 1, Strict, 0).is_err());
    }

    #[test]
    fn test_short_arrays() {
        let err = case(0.0)
            .assert_coordinates_equal("", 2, &[1.0, 2.0], &[1.0, 2.0, 3.0], 2, Strict, 0)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));
        assert!(case(0.0).assert_coordinate_equals("", &[1.0], &[1.0, 2.0], 0, Strict).is_err());
    }

    #[test]
    fn test_modifier_and_normalizer() {
        let test = TransformTestCaseBuilder::new()
            .tolerance(0.001)
            .tolerance_modifier(relative())
            .normalizer(Box::new(|e, a, _| wrap_longitude(e, a, 2, 0)))
            .transform(Arc::new(AffineTransform::identity(2)))
            .build()
            .unwrap();
        // 0.001 × 1000
        test.assert_coordinate_equals("", &[-179.0, 1000.0], &[181.0, 1000.9], 0, DirectTransform)
            .unwrap();

        // the normalizer is not applied to exact modes
        let f = failure(
            test.assert_coordinate_equals("", &[-179.0, 0.0], &[181.0, 0.0], 0, Identity)
                .unwrap_err(),
        );
        assert_eq!(f.actual, vec![181.0, 0.0]);
        assert!(f.transform.is_some());
    }

    #[test]
    fn test_matrix() {
        let test = case(0.01);
        let a = Matrix::from_rows(&[&[1.0, 2.0], &[3.0, 4.0]]).unwrap();
        let b = Matrix::from_rows(&[&[1.0, 2.005], &[3.0, 4.0]]).unwrap();
        test.assert_matrix_equals("", &a, &b, None, Derivative).unwrap();
        assert!(test.assert_matrix_equals("", &a, &b, None, Strict).is_err());

        let tight = Matrix::from_rows(&[&[0.0, 0.001], &[0.0, 0.0]]).unwrap();
        match test.assert_matrix_equals("jacobian", &a, &b, Some(&tight), Derivative).unwrap_err().kind() {
            ErrorImpl::DerivativeFailure(f) => {
                assert_eq!((f.row, f.column), (0, 1));
                assert_eq!(f.tolerance, 0.001);
                assert_eq!(f.message, "jacobian");
            }
            e => panic!("{e:?}"),
        }

        let err = test
            .assert_matrix_equals("", &a, &Matrix::zeros(2, 3), None, Derivative)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));
    }
}
