//! Storage precision of coordinate arrays.
//!
//! Transforms accept `f32` and `f64` arrays in every combination; the
//! comparator promotes both to `f64` but remembers whether both were `f64`.
use std::fmt::{Debug, Display};

/// A coordinate value stored either as `f32` or `f64`.
pub trait Ordinate: Copy + Debug + Display + PartialEq + 'static {
    /// `true` for `f64`.
    const IS_DOUBLE: bool;

    /// The quiet NaN of this storage.
    const NAN: Self;

    /// Widens to `f64`, exactly.
    fn to_f64(self) -> f64;

    /// Narrows from `f64`, rounding to nearest for `f32`.
    fn from_f64(v: f64) -> Self;
}

impl Ordinate for f64 {
    const IS_DOUBLE: bool = true;
    const NAN: Self = f64::NAN;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl Ordinate for f32 {
    const IS_DOUBLE: bool = false;
    const NAN: Self = f32::NAN;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

/// Reads `src` into `dst` as `f64`.
///
/// When `double` is `false` the value is first rounded through `f32`, so that
/// comparisons between mixed storages happen at the lower precision.
#[inline]
pub(crate) fn load<T: Ordinate>(src: &[T], dst: &mut [f64], double: bool) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = if double {
            s.to_f64()
        } else {
            s.to_f64() as f32 as f64
        };
    }
}

/// Converts a whole array.
pub fn convert<S: Ordinate, T: Ordinate>(src: &[S]) -> Vec<T> {
    src.iter().map(|v| T::from_f64(v.to_f64())).collect()
}
