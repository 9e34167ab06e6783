//! Verification of a transform under test.
//!
//! [`TransformTestCase`] holds the transform, the tolerance settings and the
//! capability flags; its `verify_*` methods either return `Ok(())` or the
//! first failure found.
//!
//! ```
//! # use std::sync::Arc;
//! # use geoconform::*;
//! # fn main() -> Result<()> {
//! let swap = AffineTransform::new(Matrix::from_rows(&[
//!     &[0.0, 1.0, 0.0],
//!     &[1.0, 0.0, 0.0],
//!     &[0.0, 0.0, 1.0],
//! ])?)?;
//! let test = TransformTestCaseBuilder::new()
//!     .transform(Arc::new(swap))
//!     .derivative_deltas(vec![0.1])
//!     .build()?;
//!
//! test.verify_transform(&[3.0, 5.0], &[5.0, 3.0])?;
//! test.verify_consistency(&[3.0, 5.0, -1.0, 2.0])?;
//! test.verify_derivative(&[3.0, 5.0])?;
//!
//! let err = test.verify_transform(&[3.0, 5.0], &[3.0, 5.0]).unwrap_err();
//! assert!(err.is_comparison_failure());
//! # Ok(())}
//! ```
use std::cell::RefCell;
use std::fmt::Debug;
use std::sync::Arc;

use log::warn;

use crate::config::{Configuration, ImplementationDetails, Key};
use crate::tolerance::{self, CalculationType, SharedModifier};
use crate::{Error, MathTransform, Result};

mod compare;
mod consistency;
mod derivative;
mod domain;
mod transform;

#[doc(inline)]
pub use domain::sample_domain;

/// Number of points by which source and target ranges are shifted in overlap checks.
pub const POINTS_OFFSET: usize = 8;

/// Adjusts an actual tuple toward the expected one before comparison.
///
/// Called with the expected tuple, the actual tuple and the kind of
/// calculation; never called for [`CalculationType::Strict`] and
/// [`CalculationType::Identity`] comparisons.
pub type Normalizer = Box<dyn Fn(&[f64], &mut [f64], CalculationType)>;

/// Effective tolerance modifier, computed for one transform and one user modifier.
#[derive(Default)]
struct ModifierCache {
    transform: Option<Arc<dyn MathTransform>>,
    user: Option<SharedModifier>,
    effective: Option<SharedModifier>,
    relaxed: bool,
    valid: bool,
}

fn same<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
        _ => false,
    }
}

/// Verifies a transform against expected values and against itself.
///
/// Make it with [`TransformTestCaseBuilder`](crate::TransformTestCaseBuilder).
pub struct TransformTestCase {
    pub(crate) transform: Option<Arc<dyn MathTransform>>,
    pub(crate) tolerance: f64,
    pub(crate) tolerance_modifier: Option<SharedModifier>,
    pub(crate) derivative_deltas: Option<Vec<f64>>,
    pub(crate) flags: Configuration,
    pub(crate) implementation_details: Vec<Arc<dyn ImplementationDetails>>,
    pub(crate) normalizer: Option<Normalizer>,
    pub(crate) description: Option<String>,
    cache: RefCell<ModifierCache>,
}

impl Debug for TransformTestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformTestCase")
            .field("transform", &self.transform)
            .field("tolerance", &self.tolerance)
            .field("tolerance_modifier", &self.tolerance_modifier)
            .field("derivative_deltas", &self.derivative_deltas)
            .field("flags", &self.flags)
            .field("implementation_details", &self.implementation_details)
            .field("normalizer", &self.normalizer.as_ref().map(|_| ".."))
            .field("description", &self.description)
            .finish()
    }
}

impl TransformTestCase {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        transform: Option<Arc<dyn MathTransform>>,
        tolerance: f64,
        tolerance_modifier: Option<SharedModifier>,
        derivative_deltas: Option<Vec<f64>>,
        flags: Configuration,
        implementation_details: Vec<Arc<dyn ImplementationDetails>>,
        normalizer: Option<Normalizer>,
        description: Option<String>,
    ) -> Self {
        Self {
            transform,
            tolerance,
            tolerance_modifier,
            derivative_deltas,
            flags,
            implementation_details,
            normalizer,
            description,
            cache: RefCell::new(ModifierCache::default()),
        }
    }

    /// Returns the transform under test.
    #[inline]
    pub fn transform(&self) -> Option<&Arc<dyn MathTransform>> {
        self.transform.as_ref()
    }

    /// Replaces the transform under test.
    #[inline]
    pub fn set_transform(&mut self, transform: Arc<dyn MathTransform>) {
        self.transform = Some(transform);
    }

    /// Returns the base tolerance.
    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    #[inline]
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }

    /// Returns the modifier supplied by the caller, without implementation-specific relaxations.
    #[inline]
    pub fn tolerance_modifier(&self) -> Option<&SharedModifier> {
        self.tolerance_modifier.as_ref()
    }

    #[inline]
    pub fn set_tolerance_modifier(&mut self, modifier: Option<SharedModifier>) {
        self.tolerance_modifier = modifier;
    }

    /// Returns the finite-difference steps, one per source dimension.
    #[inline]
    pub fn derivative_deltas(&self) -> Option<&[f64]> {
        self.derivative_deltas.as_deref()
    }

    #[inline]
    pub fn set_derivative_deltas(&mut self, deltas: Option<Vec<f64>>) {
        self.derivative_deltas = deltas;
    }

    #[inline]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns `true` if the check gated by `key` runs.
    #[inline]
    pub fn is_enabled(&self, key: Key) -> bool {
        self.flags.get(key).unwrap_or(true)
    }

    /// Enables or disables the check gated by `key`.
    ///
    /// Implementation details can only disable checks, never enable them.
    /// [`Key::IsToleranceRelaxed`] is a report only and is ignored.
    pub fn enable(&mut self, key: Key, enabled: bool) {
        if key == Key::IsToleranceRelaxed {
            return;
        }
        let forced_off = self
            .implementation_details
            .iter()
            .any(|d| d.configuration().get(key) == Some(false));
        self.flags.put(key, enabled && !forced_off);
    }

    /// Reports every flag, for test reports.
    ///
    /// [`Key::IsToleranceRelaxed`] tells whether an implementation relaxed
    /// the tolerance of the current transform.
    pub fn configuration(&self) -> Configuration {
        let mut c: Configuration = Key::ALL
            .into_iter()
            .filter(|k| *k != Key::IsToleranceRelaxed)
            .map(|k| (k, self.is_enabled(k)))
            .collect();
        self.effective_modifier();
        c.put(Key::IsToleranceRelaxed, self.cache.borrow().relaxed);
        c
    }

    /// Fails if any check is disabled.
    ///
    /// # Errors
    ///
    /// A [`Configuration`](crate::error::ErrorImpl::Configuration) error naming the first disabled flag.
    pub fn assert_all_tests_enabled(&self) -> Result<()> {
        for key in [
            Key::IsDoubleToDoubleSupported,
            Key::IsFloatToFloatSupported,
            Key::IsDoubleToFloatSupported,
            Key::IsFloatToDoubleSupported,
            Key::IsOverlappingArraySupported,
            Key::IsInverseTransformSupported,
            Key::IsDerivativeSupported,
            Key::IsNonSquareMatrixSupported,
            Key::IsNonBidimensionalSpaceSupported,
            Key::IsAxisSwappingSupported,
        ] {
            if !self.is_enabled(key) {
                return Err(Error::new_configuration(format!("{key} is false")));
            }
        }
        Ok(())
    }

    /// Returns the caller's modifier followed by the maximum of the relaxations
    /// the implementations request for the current transform.
    ///
    /// Recomputed whenever the transform or the caller's modifier changes.
    pub(crate) fn effective_modifier(&self) -> Option<SharedModifier> {
        let mut cache = self.cache.borrow_mut();
        if cache.valid
            && same(&cache.transform, &self.transform)
            && same(&cache.user, &self.tolerance_modifier)
        {
            return cache.effective.clone();
        }
        let relaxations: Vec<SharedModifier> = match &self.transform {
            Some(tr) => self
                .implementation_details
                .iter()
                .filter_map(|d| d.needs_relaxed_tolerance(tr.as_ref()))
                .collect(),
            None => Vec::new(),
        };
        let relaxed = tolerance::maximum(&relaxations);
        if let Some(r) = &relaxed {
            warn!("implementation-specific tolerance in effect: {r}");
        }
        cache.relaxed = relaxed.is_some();
        cache.effective = tolerance::concatenate(self.tolerance_modifier.clone(), relaxed);
        cache.transform = self.transform.clone();
        cache.user = self.tolerance_modifier.clone();
        cache.valid = true;
        cache.effective.clone()
    }

    pub(crate) fn require_transform(&self) -> Result<Arc<dyn MathTransform>> {
        self.transform
            .clone()
            .ok_or_else(|| Error::new_configuration("no transform to test"))
    }

    /// A capability declared by `key` was refused by the transform.
    pub(crate) fn refused(&self, key: Key, err: Error) -> Error {
        if err.is_skip() {
            Error::new_contract_violation(format!("{key} is true but the transform refused: {err}"))
        } else {
            err
        }
    }

    pub(crate) fn transform_text(&self) -> Option<String> {
        let tr = self.transform.as_ref()?;
        tr.to_wkt().or_else(|| Some(format!("{tr:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tolerance::relative;
    use crate::{AffineTransform, TransformTestCaseBuilder};

    #[derive(Debug)]
    struct Lenient;

    impl ImplementationDetails for Lenient {
        fn configuration(&self) -> Configuration {
            [(Key::IsOverlappingArraySupported, false)].into_iter().collect()
        }

        fn needs_relaxed_tolerance(&self, transform: &dyn MathTransform) -> Option<SharedModifier> {
            (!transform.is_identity()).then(relative)
        }
    }

    #[test]
    fn test_configuration() {
        let mut test = TransformTestCaseBuilder::new()
            .transform(Arc::new(AffineTransform::identity(2)))
            .implementation_details(Arc::new(Lenient))
            .build()
            .unwrap();
        assert!(!test.is_enabled(Key::IsOverlappingArraySupported));
        test.enable(Key::IsOverlappingArraySupported, true);
        assert!(!test.is_enabled(Key::IsOverlappingArraySupported));
        assert!(test.assert_all_tests_enabled().is_err());

        let c = test.configuration();
        assert_eq!(c.len(), Key::ALL.len());
        assert_eq!(c.get(Key::IsDerivativeSupported), Some(true));
        assert_eq!(c.get(Key::IsToleranceRelaxed), Some(false));

        test.set_transform(Arc::new(
            AffineTransform::new(crate::Matrix::from_rows(&[&[2.0, 0.0], &[0.0, 1.0]]).unwrap()).unwrap(),
        ));
        assert_eq!(test.configuration().get(Key::IsToleranceRelaxed), Some(true));
    }

    #[test]
    fn test_modifier_cache() {
        let mut test = TransformTestCaseBuilder::new()
            .transform(Arc::new(AffineTransform::identity(2)))
            .build()
            .unwrap();
        assert!(test.effective_modifier().is_none());

        let m = relative();
        test.set_tolerance_modifier(Some(Arc::clone(&m)));
        let effective = test.effective_modifier().unwrap();
        assert!(Arc::ptr_eq(&effective, &m));
        // cached
        assert!(Arc::ptr_eq(&test.effective_modifier().unwrap(), &effective));

        test.set_tolerance_modifier(None);
        assert!(test.effective_modifier().is_none());
    }

    #[test]
    fn test_require_transform() {
        let test = TransformTestCaseBuilder::new().build().unwrap();
        assert!(matches!(
            test.require_transform().unwrap_err().kind(),
            crate::error::ErrorImpl::Configuration { .. }
        ));
        assert!(test.transform_text().is_none());
    }
}
