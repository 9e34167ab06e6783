//! Ready-made test suites run against a [`MathTransformFactory`](crate::MathTransformFactory).
//!
//! Every `test_*` method returns `Ok(())` on success and an error otherwise;
//! an error for which [`Error::is_skip`] is `true` means the implementation
//! lacks something the test needs, which is not a failure.
//!
//! ```
//! # use geoconform::*;
//! # use geoconform::suite::{AffineTransformTest, Outcome};
//! let factory = DefaultMathTransformFactory::new();
//! let suite = AffineTransformTest::new(&factory);
//! for (name, outcome) in suite.run_all() {
//!     assert!(matches!(outcome, Outcome::Passed), "{name}: {outcome}");
//! }
//! ```
use std::fmt::Display;
use std::sync::Arc;

use log::debug;

use crate::config::{Configuration, ImplementationDetails, Key};
use crate::{Error, Result, TransformTestCaseBuilder};

mod affine;
mod parameterized;

pub use affine::AffineTransformTest;
pub use parameterized::ParameterizedTransformTest;

/// Outcome of one test of a suite.
#[derive(Debug)]
pub enum Outcome {
    Passed,
    /// The implementation does not support what the test needs.
    Skipped(Error),
    Failed(Error),
}

impl Outcome {
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl From<Result<()>> for Outcome {
    fn from(value: Result<()>) -> Self {
        match value {
            Ok(()) => Outcome::Passed,
            Err(e) if e.is_skip() => Outcome::Skipped(e),
            Err(e) => Outcome::Failed(e),
        }
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Passed => f.write_str("passed"),
            Outcome::Skipped(e) => write!(f, "skipped: {e}"),
            Outcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Flags and implementation details shared by the tests of a suite.
#[derive(Debug, Clone, Default)]
pub(crate) struct Settings {
    flags: Configuration,
    details: Vec<Arc<dyn ImplementationDetails>>,
}

impl Settings {
    pub(crate) fn enable(&mut self, key: Key, enabled: bool) {
        if key != Key::IsToleranceRelaxed {
            self.flags.put(key, enabled);
        }
    }

    pub(crate) fn add_details(&mut self, details: Arc<dyn ImplementationDetails>) {
        self.details.push(details);
    }

    pub(crate) fn is_enabled(&self, key: Key) -> bool {
        self.flags.get(key).unwrap_or(true)
            && !self
                .details
                .iter()
                .any(|d| d.configuration().get(key) == Some(false))
    }

    /// Skips the test unless `key` is enabled.
    pub(crate) fn require(&self, key: Key) -> Result<()> {
        if self.is_enabled(key) {
            Ok(())
        } else {
            debug!("{key} is false, test skipped");
            Err(Error::new_unsupported(format!("{key} is false")))
        }
    }

    pub(crate) fn configuration(&self) -> Configuration {
        Key::ALL
            .into_iter()
            .filter(|k| *k != Key::IsToleranceRelaxed)
            .map(|k| (k, self.is_enabled(k)))
            .collect()
    }

    pub(crate) fn builder(&self) -> TransformTestCaseBuilder {
        let builder = self
            .flags
            .iter()
            .fold(TransformTestCaseBuilder::new(), |b, (k, v)| b.enable(k, v));
        self.details
            .iter()
            .fold(builder, |b, d| b.implementation_details(Arc::clone(d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NoDerivative;

    impl ImplementationDetails for NoDerivative {
        fn configuration(&self) -> Configuration {
            [(Key::IsDerivativeSupported, false)].into_iter().collect()
        }
    }

    #[test]
    fn test_settings() {
        let mut settings = Settings::default();
        settings.enable(Key::IsAxisSwappingSupported, false);
        settings.add_details(Arc::new(NoDerivative));
        settings.enable(Key::IsDerivativeSupported, true);

        assert!(settings.require(Key::IsAxisSwappingSupported).unwrap_err().is_skip());
        assert!(settings.require(Key::IsDerivativeSupported).is_err());
        assert!(settings.require(Key::IsInverseTransformSupported).is_ok());
        assert_eq!(settings.configuration().len(), 10);

        let test = settings.builder().build().unwrap();
        assert!(!test.is_enabled(Key::IsAxisSwappingSupported));
        assert!(!test.is_enabled(Key::IsDerivativeSupported));
        assert!(test.is_enabled(Key::IsFloatToFloatSupported));
    }

    #[test]
    fn test_outcome() {
        assert!(matches!(Outcome::from(Ok(())), Outcome::Passed));
        let skipped = Outcome::from(Err(Error::new_unsupported("Krovak")));
        assert!(!skipped.is_failure());
        assert_eq!(skipped.to_string(), "skipped: unsupported: Krovak");
        assert!(Outcome::from(Err(Error::new_configuration("x"))).is_failure());
    }
}
