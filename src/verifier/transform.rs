use std::sync::Arc;

use log::{debug, trace};

use crate::config::Key;
use crate::ordinate::convert;
use crate::tolerance::CalculationType;
use crate::{Error, MathTransform, Result};

use super::TransformTestCase;

impl TransformTestCase {
    /// Returns the inverse of `transform`, checking its dimensions.
    ///
    /// Only called when [`Key::IsInverseTransformSupported`] is set, so a
    /// refusal is a contract violation rather than a skip.
    pub(crate) fn checked_inverse(
        &self,
        transform: &Arc<dyn MathTransform>,
    ) -> Result<Arc<dyn MathTransform>> {
        let inverse = transform
            .inverse()
            .map_err(|e| self.refused(Key::IsInverseTransformSupported, e))?;
        if inverse.source_dimensions() != transform.target_dimensions()
            || inverse.target_dimensions() != transform.source_dimensions()
        {
            return Err(Error::new_contract_violation(format!(
                "the inverse of a {}D → {}D transform is {}D → {}D",
                transform.source_dimensions(),
                transform.target_dimensions(),
                inverse.source_dimensions(),
                inverse.target_dimensions()
            )));
        }
        Ok(inverse)
    }

    /// Transforms `coordinates` point by point and compares with `expected`.
    ///
    /// If the inverse is supported, each expected point is also transformed
    /// back and compared with its source point.
    ///
    /// # Errors
    ///
    /// The first comparison failure, or a contract violation if the arrays do
    /// not hold the same number of points.
    pub fn verify_transform(&self, coordinates: &[f64], expected: &[f64]) -> Result<()> {
        let transform = self.require_transform()?;
        let sd = transform.source_dimensions();
        let td = transform.target_dimensions();
        if sd == 0 || td == 0 {
            return Err(Error::new_contract_violation(format!(
                "transform dimensions must be positive, got {sd}D → {td}D"
            )));
        }
        let inverse = if self.is_enabled(Key::IsInverseTransformSupported) {
            Some(self.checked_inverse(&transform)?)
        } else {
            debug!("{} is false, inverse transform not verified", Key::IsInverseTransformSupported);
            None
        };
        if coordinates.len() % sd != 0 || expected.len() % td != 0 || coordinates.len() / sd != expected.len() / td {
            return Err(Error::new_contract_violation(format!(
                "{} source ordinates of dimension {sd} do not match {} target ordinates of dimension {td}",
                coordinates.len(),
                expected.len()
            )));
        }
        trace!("verify {} points", coordinates.len() / sd);

        let mut target = vec![0.0; td];
        let mut back = vec![0.0; sd];
        for (i, (source, expected)) in coordinates
            .chunks_exact(sd)
            .zip(expected.chunks_exact(td))
            .enumerate()
        {
            let snapshot = source.to_vec();
            transform.transform(source, &mut target)?;
            self.assert_coordinate_equals("Unexpected transform result.", expected, &target, i, CalculationType::DirectTransform)?;
            self.assert_coordinate_equals("Source coordinate has been modified.", &snapshot, source, i, CalculationType::Identity)?;

            if let Some(inverse) = &inverse {
                let snapshot = expected.to_vec();
                inverse.transform(expected, &mut back)?;
                self.assert_coordinate_equals("Unexpected inverse transform result.", source, &back, i, CalculationType::InverseTransform)?;
                self.assert_coordinate_equals("Source coordinate has been modified.", &snapshot, expected, i, CalculationType::Identity)?;
            }
        }
        Ok(())
    }

    /// Checks `inverse(transform(coordinates)) == coordinates`.
    ///
    /// Points go one by one through the single-point form of both transforms.
    /// Does nothing if [`Key::IsInverseTransformSupported`] is false.
    ///
    /// # Errors
    ///
    /// The first round trip off tolerance, or a contract violation if a
    /// dimension is zero or `coordinates` does not hold whole points.
    pub fn verify_inverse(&self, coordinates: &[f64]) -> Result<()> {
        if !self.is_enabled(Key::IsInverseTransformSupported) {
            debug!("{} is false, round trip not verified", Key::IsInverseTransformSupported);
            return Ok(());
        }
        let transform = self.require_transform()?;
        let sd = transform.source_dimensions();
        let td = transform.target_dimensions();
        if sd == 0 || td == 0 {
            return Err(Error::new_contract_violation(format!(
                "transform dimensions must be positive, got {sd}D → {td}D"
            )));
        }
        if coordinates.len() % sd != 0 {
            return Err(Error::new_contract_violation(format!(
                "{} ordinates are not points of dimension {sd}",
                coordinates.len()
            )));
        }
        let inverse = self.checked_inverse(&transform)?;
        trace!("round trip of {} points", coordinates.len() / sd);

        let mut target = vec![0.0; td];
        let mut back = vec![0.0; sd];
        for (i, source) in coordinates.chunks_exact(sd).enumerate() {
            let snapshot = source.to_vec();
            transform.transform(source, &mut target)?;
            inverse.transform(&target, &mut back)?;
            self.assert_coordinate_equals("Unexpected result of inverse transform.", source, &back, i, CalculationType::InverseTransform)?;
            self.assert_coordinate_equals("Source coordinate has been modified.", &snapshot, source, i, CalculationType::Identity)?;
        }
        Ok(())
    }

    /// As [`verify_inverse`](TransformTestCase::verify_inverse) for `f32` coordinates.
    pub fn verify_inverse_f32(&self, coordinates: &[f32]) -> Result<()> {
        let widened: Vec<f64> = convert(coordinates);
        self.verify_inverse(&widened)?;
        self.assert_coordinates_equal(
            "Source coordinates have been modified.",
            1,
            coordinates,
            &widened,
            coordinates.len(),
            CalculationType::Identity,
            0,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::ErrorImpl;
    use crate::transform::check_point_dimensions;
    use crate::{AffineTransform, Matrix, TransformTestCaseBuilder};

    use super::*;

    /// Adds one to every ordinate; its inverse forgets to subtract.
    #[derive(Debug)]
    struct Increment {
        honest: bool,
    }

    impl MathTransform for Increment {
        fn source_dimensions(&self) -> usize {
            2
        }

        fn target_dimensions(&self) -> usize {
            2
        }

        fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
            check_point_dimensions(self, src, dst)?;
            dst[0] = src[0] + 1.0;
            dst[1] = src[1] + 1.0;
            Ok(())
        }

        fn inverse(&self) -> Result<Arc<dyn MathTransform>> {
            if self.honest {
                Ok(Arc::new(AffineTransform::new(Matrix::from_rows(&[
                    &[1.0, 0.0, -1.0],
                    &[0.0, 1.0, -1.0],
                    &[0.0, 0.0, 1.0],
                ])?)?))
            } else {
                Ok(Arc::new(Increment { honest: true }))
            }
        }
    }

    fn swap() -> Arc<dyn MathTransform> {
        Arc::new(
            AffineTransform::new(
                Matrix::from_rows(&[&[0.0, 1.0, 0.0], &[1.0, 0.0, 0.0], &[0.0, 0.0, 1.0]]).unwrap(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_verify_transform() {
        let test = TransformTestCaseBuilder::new().transform(swap()).build().unwrap();
        test.verify_transform(&[3.0, 5.0, -1.0, 0.5], &[5.0, 3.0, 0.5, -1.0]).unwrap();

        let err = test.verify_transform(&[3.0, 5.0, -1.0, 0.5], &[5.0, 3.0, -1.0, 0.5]).unwrap_err();
        match err.kind() {
            ErrorImpl::TransformFailure(f) => {
                assert_eq!(f.point, 1);
                assert_eq!(f.message, "Unexpected transform result.");
                assert!(f.transform.as_deref().unwrap().contains("Affine"));
            }
            e => panic!("{e:?}"),
        }

        let err = test.verify_transform(&[3.0, 5.0, 1.0], &[5.0, 3.0]).unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));
    }

    #[test]
    fn test_verify_transform_inverse() {
        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(Increment { honest: false }))
            .build()
            .unwrap();
        let err = test.verify_transform(&[0.0, 0.0], &[1.0, 1.0]).unwrap_err();
        match err.kind() {
            ErrorImpl::TransformFailure(f) => {
                assert_eq!(f.message, "Unexpected inverse transform result.");
                assert_eq!(f.actual, vec![2.0, 2.0]);
            }
            e => panic!("{e:?}"),
        }
        assert!(test.verify_inverse(&[0.0, 0.0]).unwrap_err().is_comparison_failure());

        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(Increment { honest: false }))
            .enable(Key::IsInverseTransformSupported, false)
            .build()
            .unwrap();
        test.verify_transform(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        test.verify_inverse(&[0.0, 0.0]).unwrap();

        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(Increment { honest: true }))
            .build()
            .unwrap();
        test.verify_transform(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        test.verify_inverse(&[0.0, 0.0, 10.0, -3.5]).unwrap();
        test.verify_inverse_f32(&[0.25, 0.0, 10.0, -3.5]).unwrap();
    }

    #[test]
    fn test_refused_inverse() {
        let reduction = AffineTransform::new(
            Matrix::from_rows(&[&[1.0, 0.0, 0.0], &[0.0, 0.0, 1.0]]).unwrap(),
        )
        .unwrap();

        #[derive(Debug)]
        struct NoInverse;

        impl MathTransform for NoInverse {
            fn source_dimensions(&self) -> usize {
                1
            }

            fn target_dimensions(&self) -> usize {
                1
            }

            fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
                dst[0] = src[0];
                Ok(())
            }
        }

        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(NoInverse))
            .build()
            .unwrap();
        let err = test.verify_inverse(&[1.0]).unwrap_err();
        assert!(!err.is_skip());
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));

        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(reduction))
            .enable(Key::IsInverseTransformSupported, false)
            .build()
            .unwrap();
        test.verify_transform(&[4.0, 9.0], &[4.0]).unwrap();
    }

    /// Forgets every ordinate; the single-point form is the only one it can run.
    #[derive(Debug)]
    struct Collapse;

    impl MathTransform for Collapse {
        fn source_dimensions(&self) -> usize {
            1
        }

        fn target_dimensions(&self) -> usize {
            0
        }

        fn transform(&self, _src: &[f64], _dst: &mut [f64]) -> Result<()> {
            Ok(())
        }

        fn inverse(&self) -> Result<Arc<dyn MathTransform>> {
            Ok(Arc::new(Collapse))
        }
    }

    #[test]
    fn test_zero_dimension() {
        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(Collapse))
            .build()
            .unwrap();
        let err = test.verify_inverse(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));
        let err = test.verify_transform(&[1.0], &[]).unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));

        let mut dst = [0.0f64; 2];
        let err = crate::transform::transform_array(&Collapse, &[1.0f64, 2.0], &mut dst, 2).unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));
    }

    /// Correct point by point, but its array form writes nothing.
    #[derive(Debug)]
    struct LazyArrays;

    impl MathTransform for LazyArrays {
        fn source_dimensions(&self) -> usize {
            2
        }

        fn target_dimensions(&self) -> usize {
            2
        }

        fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
            check_point_dimensions(self, src, dst)?;
            dst.copy_from_slice(src);
            Ok(())
        }

        fn transform_f64(&self, _src: &[f64], _dst: &mut [f64], _num_pts: usize) -> Result<()> {
            Ok(())
        }

        fn inverse(&self) -> Result<Arc<dyn MathTransform>> {
            Ok(Arc::new(LazyArrays))
        }
    }

    #[test]
    fn test_inverse_point_by_point() {
        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(LazyArrays))
            .build()
            .unwrap();
        test.verify_inverse(&[3.0, 5.0, -1.0, 0.5]).unwrap();
    }
}
