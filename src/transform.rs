//! The transform contract verified by this crate.
//!
//! Implementers provide [`MathTransform::transform`] for a single point; every
//! array form has a correct default built on it, so an implementation only
//! overrides what it optimizes, and the verifiers check the overrides agree.
use std::fmt::Debug;
use std::sync::Arc;

use crate::matrix::Matrix;
use crate::ordinate::Ordinate;
use crate::position::DirectPosition;
use crate::{Error, Result};

/// A mapping from a source coordinate space to a target coordinate space.
pub trait MathTransform: Debug {
    /// Dimension of input points.
    fn source_dimensions(&self) -> usize;

    /// Dimension of output points.
    fn target_dimensions(&self) -> usize;

    /// Transforms one point; `src` has the source dimension and `dst` the target dimension.
    fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()>;

    /// Returns `true` if this transform does nothing.
    fn is_identity(&self) -> bool {
        false
    }

    /// Returns the inverse transform.
    fn inverse(&self) -> Result<Arc<dyn MathTransform>> {
        Err(Error::new_unsupported("inverse transform"))
    }

    /// Returns the `target × source` Jacobian at `point`.
    fn derivative(&self, _point: &[f64]) -> Result<Matrix> {
        Err(Error::new_unsupported("derivative"))
    }

    /// Transforms a position into a new one.
    fn transform_position(&self, src: &DirectPosition) -> Result<DirectPosition> {
        let mut dst = DirectPosition::new(self.target_dimensions());
        self.transform(src.coordinate(), &mut dst.ordinates)?;
        Ok(dst)
    }

    /// Transforms `num_pts` points from `src` into `dst`.
    fn transform_f64(&self, src: &[f64], dst: &mut [f64], num_pts: usize) -> Result<()> {
        transform_array(self, src, dst, num_pts)
    }

    fn transform_f32(&self, src: &[f32], dst: &mut [f32], num_pts: usize) -> Result<()> {
        transform_array(self, src, dst, num_pts)
    }

    fn transform_f64_to_f32(&self, src: &[f64], dst: &mut [f32], num_pts: usize) -> Result<()> {
        transform_array(self, src, dst, num_pts)
    }

    fn transform_f32_to_f64(&self, src: &[f32], dst: &mut [f64], num_pts: usize) -> Result<()> {
        transform_array(self, src, dst, num_pts)
    }

    /// Transforms `num_pts` points within one buffer; source and target ranges may overlap.
    ///
    /// Offsets are in array elements.
    fn transform_in_place_f64(
        &self,
        buf: &mut [f64],
        src_off: usize,
        dst_off: usize,
        num_pts: usize,
    ) -> Result<()> {
        let src = copy_range(buf, src_off, num_pts * self.source_dimensions())?;
        let dst = range_mut(buf, dst_off, num_pts * self.target_dimensions())?;
        self.transform_f64(&src, dst, num_pts)
    }

    fn transform_in_place_f32(
        &self,
        buf: &mut [f32],
        src_off: usize,
        dst_off: usize,
        num_pts: usize,
    ) -> Result<()> {
        let src = copy_range(buf, src_off, num_pts * self.source_dimensions())?;
        let dst = range_mut(buf, dst_off, num_pts * self.target_dimensions())?;
        self.transform_f32(&src, dst, num_pts)
    }

    /// Returns the one-dimensional capability, if this transform declares it.
    fn as_1d(&self) -> Option<&dyn MathTransform1D> {
        None
    }

    /// Returns the two-dimensional capability, if this transform declares it.
    fn as_2d(&self) -> Option<&dyn MathTransform2D> {
        None
    }

    /// Well-known text of the transform, used in failure reports.
    fn to_wkt(&self) -> Option<String> {
        None
    }
}

/// Scalar entry points of a transform between one-dimensional spaces.
pub trait MathTransform1D: MathTransform {
    fn transform_value(&self, value: f64) -> Result<f64>;

    fn derivative_value(&self, value: f64) -> Result<f64>;
}

/// Point entry points of a transform between two-dimensional spaces.
pub trait MathTransform2D: MathTransform {
    fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)>;

    fn derivative_point(&self, x: f64, y: f64) -> Result<Matrix>;
}

/// Transforms an array point by point through [`MathTransform::transform`].
pub fn transform_array<M, S, T>(tr: &M, src: &[S], dst: &mut [T], num_pts: usize) -> Result<()>
where
    M: MathTransform + ?Sized,
    S: Ordinate,
    T: Ordinate,
{
    let sd = tr.source_dimensions();
    let td = tr.target_dimensions();
    if sd == 0 || td == 0 {
        return Err(Error::new_contract_violation(format!(
            "dimensions {sd} → {td} must be positive"
        )));
    }
    if src.len() < num_pts * sd || dst.len() < num_pts * td {
        return Err(Error::new_contract_violation(format!(
            "arrays of length {} and {} can not hold {num_pts} points of dimension {sd} → {td}",
            src.len(),
            dst.len()
        )));
    }
    let mut p = vec![0.0; sd];
    let mut q = vec![0.0; td];
    for (s, d) in src.chunks_exact(sd).zip(dst.chunks_exact_mut(td)).take(num_pts) {
        for (a, b) in p.iter_mut().zip(s) {
            *a = b.to_f64();
        }
        tr.transform(&p, &mut q)?;
        for (a, b) in d.iter_mut().zip(&q) {
            *a = T::from_f64(*b);
        }
    }
    Ok(())
}

/// Checks `src` and `dst` have the dimensions of a single-point call.
pub fn check_point_dimensions<M>(tr: &M, src: &[f64], dst: &[f64]) -> Result<()>
where
    M: MathTransform + ?Sized,
{
    if src.len() != tr.source_dimensions() || dst.len() != tr.target_dimensions() {
        return Err(Error::new_contract_violation(format!(
            "expected a {}D point into a {}D point, got {}D into {}D",
            tr.source_dimensions(),
            tr.target_dimensions(),
            src.len(),
            dst.len()
        )));
    }
    Ok(())
}

fn copy_range<T: Copy>(buf: &[T], off: usize, len: usize) -> Result<Vec<T>> {
    buf.get(off..off + len)
        .map(|s| s.to_vec())
        .ok_or_else(|| out_of_buffer(buf.len(), off, len))
}

fn range_mut<T>(buf: &mut [T], off: usize, len: usize) -> Result<&mut [T]> {
    let n = buf.len();
    buf.get_mut(off..off + len)
        .ok_or_else(|| out_of_buffer(n, off, len))
}

fn out_of_buffer(n: usize, off: usize, len: usize) -> Error {
    Error::new_contract_violation(format!(
        "range {off}..{} out of a buffer of length {n}",
        off + len
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Shift;

    impl MathTransform for Shift {
        fn source_dimensions(&self) -> usize {
            2
        }

        fn target_dimensions(&self) -> usize {
            1
        }

        fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
            check_point_dimensions(self, src, dst)?;
            dst[0] = src[0] + 10.0 * src[1];
            Ok(())
        }
    }

    #[test]
    fn test_defaults() {
        let tr = Shift;
        assert!(!tr.is_identity());
        assert!(tr.inverse().unwrap_err().is_skip());
        assert!(tr.derivative(&[0.0, 0.0]).unwrap_err().is_skip());
        assert!(tr.as_1d().is_none() && tr.as_2d().is_none());
        assert_eq!(
            tr.transform_position(&DirectPosition::from((1.0, 2.0))).unwrap(),
            DirectPosition::from(vec![21.0])
        );
    }

    #[test]
    fn test_arrays() {
        let tr = Shift;
        let mut dst = [0f32; 2];
        tr.transform_f64_to_f32(&[1.0, 1.0, 2.0, 0.5], &mut dst, 2).unwrap();
        assert_eq!(dst, [11.0, 7.0]);

        let mut dst = [0f64; 1];
        assert!(tr.transform_f64(&[1.0, 1.0, 2.0, 0.5], &mut dst, 2).is_err());
    }

    #[test]
    fn test_in_place() {
        let tr = Shift;
        // target range starts inside the source range
        let mut buf = [1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        tr.transform_in_place_f64(&mut buf, 0, 1, 3).unwrap();
        assert_eq!(buf, [1.0, 11.0, 22.0, 33.0, 3.0, 3.0]);

        let mut buf = [1f32, 1.0];
        assert!(tr.transform_in_place_f32(&mut buf, 0, 2, 1).is_err());
    }
}
