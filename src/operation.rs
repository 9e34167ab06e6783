//! Reference transforms, used to exercise the verifiers and the suites.
//!
//! - [`AffineTransform`]: linear transforms between spaces of any dimension,
//!   including the dimension-reducing ones whose inverse yields NaN;
//! - [`Mercator`]: the EPSG Mercator family, variant A, variant B and
//!   the Popular Visualisation Pseudo Mercator.
mod affine;
mod mercator;

#[doc(inline)]
pub use affine::AffineTransform;
#[doc(inline)]
pub use mercator::{InverseMercator, Mercator, MercatorVariant};
