use std::sync::Arc;

use crate::config::{Configuration, ImplementationDetails, Key};
use crate::tolerance::SharedModifier;
use crate::verifier::{Normalizer, TransformTestCase};
use crate::{Error, MathTransform, Result};

/// The builder of [`TransformTestCase`].
///
/// Every check starts enabled; [`enable`](TransformTestCaseBuilder::enable)
/// and the [`ImplementationDetails`] turn them off.
///
/// # Example
///
/// ```
/// # use std::sync::Arc;
/// # use geoconform::*;
/// # use geoconform::config::Key;
/// # use geoconform::tolerance::relative;
/// # fn main() -> Result<()> {
/// let test = TransformTestCaseBuilder::new()
///     .transform(Arc::new(AffineTransform::identity(2)))
///     .tolerance(1e-10)
///     .tolerance_modifier(relative())
///     .derivative_deltas(vec![0.1, 0.2])
///     .enable(Key::IsFloatToDoubleSupported, false)
///     .description("identity".to_string())
///     .build()?;
///
/// assert_eq!(test.tolerance(), 1e-10);
/// assert_eq!(test.derivative_deltas(), Some(&[0.1, 0.2][..]));
/// assert!(!test.is_enabled(Key::IsFloatToDoubleSupported));
/// assert!(test.is_enabled(Key::IsFloatToFloatSupported));
/// assert_eq!(test.description(), Some("identity"));
/// # Ok(())}
/// ```
pub struct TransformTestCaseBuilder {
    transform: Option<Arc<dyn MathTransform>>,
    tolerance: f64,
    tolerance_modifier: Option<SharedModifier>,
    derivative_deltas: Option<Vec<f64>>,
    flags: Configuration,
    implementation_details: Vec<Arc<dyn ImplementationDetails>>,
    normalizer: Option<Normalizer>,
    description: Option<String>,
}

impl std::fmt::Debug for TransformTestCaseBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformTestCaseBuilder")
            .field("transform", &self.transform)
            .field("tolerance", &self.tolerance)
            .field("tolerance_modifier", &self.tolerance_modifier)
            .field("derivative_deltas", &self.derivative_deltas)
            .field("flags", &self.flags)
            .field("implementation_details", &self.implementation_details)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Default for TransformTestCaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformTestCaseBuilder {
    /// Makes a [`TransformTestCaseBuilder`] with a zero tolerance and no transform.
    #[inline]
    pub fn new() -> Self {
        Self {
            transform: None,
            tolerance: 0.0,
            tolerance_modifier: None,
            derivative_deltas: None,
            flags: Configuration::new(),
            implementation_details: Vec::new(),
            normalizer: None,
            description: None,
        }
    }

    /// Sets the transform under test.
    #[inline]
    pub fn transform(mut self, transform: Arc<dyn MathTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Sets the base tolerance, in target units.
    #[inline]
    pub const fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    #[inline]
    pub fn tolerance_modifier(mut self, modifier: SharedModifier) -> Self {
        self.tolerance_modifier = Some(modifier);
        self
    }

    /// Sets the finite-difference steps; the last one is reused for the
    /// source dimensions beyond.
    #[inline]
    pub fn derivative_deltas(mut self, deltas: Vec<f64>) -> Self {
        self.derivative_deltas = Some(deltas);
        self
    }

    /// Adds implementation details; their disabled flags win over [`enable`](TransformTestCaseBuilder::enable).
    #[inline]
    pub fn implementation_details(mut self, details: Arc<dyn ImplementationDetails>) -> Self {
        self.implementation_details.push(details);
        self
    }

    #[inline]
    pub fn normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    #[inline]
    pub fn description(mut self, s: String) -> Self {
        self.description = Some(s);
        self
    }

    /// Enables or disables one check.
    ///
    /// [`Key::IsToleranceRelaxed`] is a report only and is ignored here.
    #[inline]
    pub fn enable(mut self, key: Key, enabled: bool) -> Self {
        if key != Key::IsToleranceRelaxed {
            self.flags.put(key, enabled);
        }
        self
    }

    /// Builds [`TransformTestCase`].
    ///
    /// # Errors
    ///
    /// If the tolerance is negative or NaN, or a derivative delta is not
    /// strictly positive.
    pub fn build(self) -> Result<TransformTestCase> {
        if !(self.tolerance >= 0.0) {
            return Err(Error::new_configuration(format!(
                "tolerance must be positive or zero, got {}",
                self.tolerance
            )));
        }
        if let Some(delta) = self
            .derivative_deltas
            .iter()
            .flatten()
            .find(|d| !(**d > 0.0) || d.is_infinite())
        {
            return Err(Error::new_configuration(format!(
                "derivative deltas must be positive and finite, got {delta}"
            )));
        }

        let mut flags: Configuration = Key::ALL
            .into_iter()
            .filter(|k| *k != Key::IsToleranceRelaxed)
            .map(|k| (k, self.flags.get(k).unwrap_or(true)))
            .collect();
        for details in &self.implementation_details {
            for (key, enabled) in details.configuration().iter() {
                if !enabled && key != Key::IsToleranceRelaxed {
                    flags.put(key, false);
                }
            }
        }

        Ok(TransformTestCase::new(
            self.transform,
            self.tolerance,
            self.tolerance_modifier,
            self.derivative_deltas,
            flags,
            self.implementation_details,
            self.normalizer,
            self.description,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorImpl;

    #[derive(Debug)]
    struct NoFloats;

    impl ImplementationDetails for NoFloats {
        fn configuration(&self) -> Configuration {
            [
                (Key::IsFloatToFloatSupported, false),
                (Key::IsDerivativeSupported, true),
            ]
            .into_iter()
            .collect()
        }
    }

    #[test]
    fn test_flags() {
        let test = TransformTestCaseBuilder::new()
            .enable(Key::IsFloatToFloatSupported, true)
            .enable(Key::IsDerivativeSupported, false)
            .enable(Key::IsToleranceRelaxed, true)
            .implementation_details(Arc::new(NoFloats))
            .build()
            .unwrap();
        assert!(!test.is_enabled(Key::IsFloatToFloatSupported));
        // details only disable
        assert!(!test.is_enabled(Key::IsDerivativeSupported));
        assert!(test.is_enabled(Key::IsAxisSwappingSupported));
        assert_eq!(test.configuration().get(Key::IsToleranceRelaxed), Some(false));
    }

    #[test]
    fn test_invalid() {
        for builder in [
            TransformTestCaseBuilder::new().tolerance(-1.0),
            TransformTestCaseBuilder::new().tolerance(f64::NAN),
            TransformTestCaseBuilder::new().derivative_deltas(vec![0.1, 0.0]),
            TransformTestCaseBuilder::new().derivative_deltas(vec![f64::INFINITY]),
        ] {
            let err = builder.build().unwrap_err();
            assert!(matches!(err.kind(), ErrorImpl::Configuration { .. }));
        }
    }
}
