use log::{debug, trace};

use crate::config::Key;
use crate::ordinate::convert;
use crate::tolerance::CalculationType::{DirectTransform, Identity};
use crate::{Error, Result};

use super::{TransformTestCase, POINTS_OFFSET};

impl TransformTestCase {
    /// Checks every array form of the transform agrees with the single-point form.
    ///
    /// The single-point results are the reference. Each supported array
    /// convention is then run on disjoint buffers, then on overlapping
    /// ranges of one buffer with source and target offsets from 0 to 7
    /// points, and the one and two-dimensional entry points are cross-checked.
    ///
    /// Returns the reference results.
    ///
    /// # Errors
    ///
    /// The first disagreement, or a contract violation if the transform
    /// declares a capability its dimensions contradict.
    pub fn verify_consistency(&self, source: &[f32]) -> Result<Vec<f32>> {
        let transform = self.require_transform()?;
        let sd = transform.source_dimensions();
        let td = transform.target_dimensions();
        if sd == 0 || td == 0 || source.len() % sd != 0 {
            return Err(Error::new_contract_violation(format!(
                "{} ordinates are not points of a {sd}D → {td}D transform",
                source.len()
            )));
        }
        let num_pts = source.len() / sd;
        trace!("consistency of {num_pts} points");

        let source_f64: Vec<f64> = convert(source);
        let mut expected = vec![0.0; num_pts * td];
        for (s, t) in source_f64.chunks_exact(sd).zip(expected.chunks_exact_mut(td)) {
            transform.transform(s, t)?;
        }
        let expected_f32: Vec<f32> = convert(&expected);

        let length = sd.max(td) * (num_pts + POINTS_OFFSET);
        let mut buf_f32 = vec![f32::NAN; length];
        let mut buf_f64 = vec![f64::NAN; length];
        let target = num_pts * td;

        if self.is_enabled(Key::IsDoubleToDoubleSupported) {
            buf_f64.fill(f64::NAN);
            transform.transform_f64(&source_f64, &mut buf_f64, num_pts)?;
            self.assert_coordinates_equal("f64 source has been modified.", sd, source, &source_f64, num_pts, Identity, 0)?;
            self.assert_coordinates_equal("f64 → f64 transform.", td, &expected, &buf_f64[..target], num_pts, DirectTransform, 0)?;
        }
        if self.is_enabled(Key::IsFloatToFloatSupported) {
            let snapshot = source.to_vec();
            buf_f32.fill(f32::NAN);
            transform.transform_f32(source, &mut buf_f32, num_pts)?;
            self.assert_coordinates_equal("f32 source has been modified.", sd, &snapshot, source, num_pts, Identity, 0)?;
            self.assert_coordinates_equal("f32 → f32 transform.", td, &expected_f32, &buf_f32[..target], num_pts, DirectTransform, 0)?;
        }
        if self.is_enabled(Key::IsDoubleToFloatSupported) {
            buf_f32.fill(f32::NAN);
            transform.transform_f64_to_f32(&source_f64, &mut buf_f32, num_pts)?;
            self.assert_coordinates_equal("f64 source has been modified.", sd, source, &source_f64, num_pts, Identity, 0)?;
            self.assert_coordinates_equal("f64 → f32 transform.", td, &expected, &buf_f32[..target], num_pts, DirectTransform, 0)?;
        }
        if self.is_enabled(Key::IsFloatToDoubleSupported) {
            let snapshot = source.to_vec();
            buf_f64.fill(f64::NAN);
            transform.transform_f32_to_f64(source, &mut buf_f64, num_pts)?;
            self.assert_coordinates_equal("f32 source has been modified.", sd, &snapshot, source, num_pts, Identity, 0)?;
            self.assert_coordinates_equal("f32 → f64 transform.", td, &expected, &buf_f64[..target], num_pts, DirectTransform, 0)?;
        }

        if self.is_enabled(Key::IsOverlappingArraySupported) {
            let float = self.is_enabled(Key::IsFloatToFloatSupported);
            let double = self.is_enabled(Key::IsDoubleToDoubleSupported);
            for src_off in (0..POINTS_OFFSET * sd).step_by(sd) {
                for dst_off in (0..POINTS_OFFSET * td).step_by(td) {
                    let message = format!("Overlapping arrays, source at {src_off}, target at {dst_off}.");
                    if float {
                        buf_f32.fill(f32::NAN);
                        buf_f32[src_off..src_off + source.len()].copy_from_slice(source);
                        transform.transform_in_place_f32(&mut buf_f32, src_off, dst_off, num_pts)?;
                        self.assert_coordinates_equal(&message, td, &expected_f32, &buf_f32[dst_off..dst_off + target], num_pts, DirectTransform, 0)?;
                    }
                    if double {
                        buf_f64.fill(f64::NAN);
                        buf_f64[src_off..src_off + source.len()].copy_from_slice(&source_f64);
                        transform.transform_in_place_f64(&mut buf_f64, src_off, dst_off, num_pts)?;
                        self.assert_coordinates_equal(&message, td, &expected, &buf_f64[dst_off..dst_off + target], num_pts, DirectTransform, 0)?;
                    }
                }
            }
        } else {
            debug!("{} is false, in-buffer transforms not verified", Key::IsOverlappingArraySupported);
        }

        if let Some(t1) = transform.as_1d() {
            if sd != 1 || td != 1 {
                return Err(Error::new_contract_violation(format!(
                    "a {sd}D → {td}D transform declares the one-dimensional capability"
                )));
            }
            for (i, (s, e)) in source_f64.iter().zip(&expected).enumerate() {
                let v = t1.transform_value(*s)?;
                self.assert_coordinate_equals("MathTransform1D::transform_value", &[*e], &[v], i, DirectTransform)?;
            }
        }
        if let Some(t2) = transform.as_2d() {
            if sd != 2 || td != 2 {
                return Err(Error::new_contract_violation(format!(
                    "a {sd}D → {td}D transform declares the two-dimensional capability"
                )));
            }
            for (i, (s, e)) in source_f64.chunks_exact(2).zip(expected.chunks_exact(2)).enumerate() {
                let (x, y) = t2.transform_point(s[0], s[1])?;
                self.assert_coordinate_equals("MathTransform2D::transform_point", e, &[x, y], i, DirectTransform)?;
            }
        }
        Ok(expected_f32)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::ErrorImpl;
    use crate::transform::{check_point_dimensions, MathTransform2D};
    use crate::{AffineTransform, Matrix, MathTransform, TransformTestCaseBuilder};

    use super::*;

    /// Adds `(1, 2)`, iterating forward when transforming within one buffer.
    #[derive(Debug)]
    struct NaiveOverlap;

    impl MathTransform for NaiveOverlap {
        fn source_dimensions(&self) -> usize {
            2
        }

        fn target_dimensions(&self) -> usize {
            2
        }

        fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
            check_point_dimensions(self, src, dst)?;
            dst[0] = src[0] + 1.0;
            dst[1] = src[1] + 2.0;
            Ok(())
        }

        fn transform_in_place_f64(&self, buf: &mut [f64], src_off: usize, dst_off: usize, num_pts: usize) -> Result<()> {
            for p in 0..num_pts {
                let (x, y) = (buf[src_off + 2 * p], buf[src_off + 2 * p + 1]);
                buf[dst_off + 2 * p] = x + 1.0;
                buf[dst_off + 2 * p + 1] = y + 2.0;
            }
            Ok(())
        }
    }

    /// Rounds its `f32` results down to integers.
    #[derive(Debug)]
    struct Truncating;

    impl MathTransform for Truncating {
        fn source_dimensions(&self) -> usize {
            1
        }

        fn target_dimensions(&self) -> usize {
            1
        }

        fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
            dst[0] = src[0] * 3.0;
            Ok(())
        }

        fn transform_f32(&self, src: &[f32], dst: &mut [f32], num_pts: usize) -> Result<()> {
            for (d, s) in dst.iter_mut().zip(src).take(num_pts) {
                *d = (s * 3.0).floor();
            }
            Ok(())
        }
    }

    /// Claims the two-dimensional capability for a 3D transform.
    #[derive(Debug)]
    struct Liar;

    impl MathTransform for Liar {
        fn source_dimensions(&self) -> usize {
            3
        }

        fn target_dimensions(&self) -> usize {
            3
        }

        fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
            dst.copy_from_slice(src);
            Ok(())
        }

        fn as_2d(&self) -> Option<&dyn MathTransform2D> {
            Some(self)
        }
    }

    impl MathTransform2D for Liar {
        fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
            Ok((x, y))
        }

        fn derivative_point(&self, _x: f64, _y: f64) -> Result<Matrix> {
            Ok(Matrix::identity(2))
        }
    }

    #[test]
    fn test_consistent() {
        let _ = env_logger::builder().is_test(true).try_init();

        let scale = AffineTransform::new(
            Matrix::from_rows(&[&[2.0, 0.0, 10.0], &[0.0, -3.0, 1.0], &[0.0, 0.0, 1.0]]).unwrap(),
        )
        .unwrap();
        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(scale))
            .build()
            .unwrap();
        let expected = test.verify_consistency(&[1.0, 2.0, -0.5, 0.25, 100.0, 7.0]).unwrap();
        assert_eq!(expected, vec![12.0, -5.0, 9.0, 0.25, 210.0, -20.0]);

        assert!(test.verify_consistency(&[]).unwrap().is_empty());
        assert!(test.verify_consistency(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_naive_overlap() {
        let source = [1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(NaiveOverlap))
            .build()
            .unwrap();
        let err = test.verify_consistency(&source).unwrap_err();
        match err.kind() {
            ErrorImpl::TransformFailure(f) => {
                assert!(f.message.starts_with("Overlapping arrays"), "{}", f.message);
                assert_eq!(f.point, 1);
            }
            e => panic!("{e:?}"),
        }

        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(NaiveOverlap))
            .enable(Key::IsOverlappingArraySupported, false)
            .build()
            .unwrap();
        test.verify_consistency(&source).unwrap();
    }

    #[test]
    fn test_truncating() {
        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(Truncating))
            .tolerance(0.1)
            .build()
            .unwrap();
        test.verify_consistency(&[1.0, 2.0]).unwrap();
        let err = test.verify_consistency(&[1.0, 0.5]).unwrap_err();
        match err.kind() {
            ErrorImpl::TransformFailure(f) => assert_eq!(f.message, "f32 → f32 transform."),
            e => panic!("{e:?}"),
        }

        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(Truncating))
            .enable(Key::IsFloatToFloatSupported, false)
            .build()
            .unwrap();
        test.verify_consistency(&[1.0, 0.5]).unwrap();
    }

    #[test]
    fn test_capability_mismatch() {
        let test = TransformTestCaseBuilder::new()
            .transform(Arc::new(Liar))
            .build()
            .unwrap();
        let err = test.verify_consistency(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));
    }
}
