//! # geoconform
//!
//! Conformance testing of coordinate operation implementations,
//! in the manner of the GeoAPI conformance tests [^1].
//!
//! An implementation provides a [`MathTransformFactory`];
//! the suites create transforms from it and compare their results with
//! the worked examples of the EPSG guidance notes [^2].
//!
//! ```
//! use geoconform::suite::ParameterizedTransformTest;
//! use geoconform::{DefaultMathTransformFactory, Result};
//!
//! fn main() -> Result<()> {
//!     let factory = DefaultMathTransformFactory::new();
//!     let suite = ParameterizedTransformTest::new(&factory);
//!
//!     // Mercator (variant A) on the "Makassar / NEIEZ" example
//!     suite.test_mercator_1sp()?;
//!
//!     // The factory knows no Krovak method, the test is skipped, not failed
//!     let err = suite.test_krovak().unwrap_err();
//!     assert!(err.is_skip());
//!
//!     Ok(())
//! }
//! ```
//!
//! Features:
//!
//! - Verifies point transformations, inverse round trips,
//!   consistency between `f64` and `f32` entry points,
//!   and derivatives against finite differences
//! - Tolerances adjusted per ordinate by [`tolerance`] modifiers,
//!   e.g. in degrees for geographic coordinates
//! - Capability flags ([`config::Key`]) letting an implementation
//!   opt out of what it does not support
//! - Structural checks of parameters and transforms by [`validate::Validators`]
//! - Ready-made [`suite`]s for affine and parameterized transforms
//!
//! [^1]: GeoAPI: <https://www.geoapi.org/>.
//!
//! [^2]: IOGP Publication 373-7-2, Geomatics Guidance Note number 7, part 2:
//!       <https://www.iogp.org/bookstore/product/coordinate-conversions-and-transformation-including-formulas/>.
//!
//! # Writing a test case
//!
//! The verification methods live on [`TransformTestCase`],
//! made by [`TransformTestCaseBuilder`].
//!
//! ```
//! # use geoconform::*;
//! # fn main() -> Result<()> {
//! let factory = DefaultMathTransformFactory::new();
//! let transform = epsg::create_transform(&factory, 19905)?;
//!
//! let test = TransformTestCaseBuilder::new()
//!     .transform(transform)
//!     .tolerance(0.01)
//!     .build()?;
//! test.verify_transform(&[120.0, -3.0], &[5009726.58, 569150.82])?;
//! # Ok(())}
//! ```
//!
//! # Serialization and Deserialization
//!
//! It supports (de)serialization of [`config::Configuration`], [`Matrix`],
//! [`DirectPosition`] and the sample data by [`serde` crate](https://crates.io/crates/serde)
//! only if the feature `serde` is enabled.
//!
//! ```
//! # #[cfg(feature = "serde")]
//! # fn main() -> serde_json::Result<()> {
//! use geoconform::config::{Configuration, Key};
//!
//! let c: Configuration = [(Key::IsDerivativeSupported, false)].into_iter().collect();
//! let json = serde_json::to_string(&c)?;
//! assert_eq!(json, r#"{"isDerivativeSupported":false}"#);
//! # Ok(())}
//! # #[cfg(not(feature = "serde"))]
//! # fn main() {}
//! ```

#[doc(inline)]
pub use builder::TransformTestCaseBuilder;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use factory::{DefaultMathTransformFactory, MathTransformFactory};
#[doc(inline)]
pub use matrix::Matrix;
#[doc(inline)]
pub use operation::{AffineTransform, Mercator};
#[doc(inline)]
pub use position::DirectPosition;
#[doc(inline)]
pub use tolerance::CalculationType;
#[doc(inline)]
pub use transform::{MathTransform, MathTransform1D, MathTransform2D};
#[doc(inline)]
pub use verifier::TransformTestCase;

pub mod config;
pub mod epsg;
pub mod error;
pub mod factory;
pub mod matrix;
pub mod operation;
pub mod ordinate;
pub mod parameter;
pub mod position;
pub mod sample;
pub mod suite;
pub mod tolerance;
pub mod transform;
pub mod utils;
pub mod validate;
pub mod verifier;

mod builder;
mod internal;
