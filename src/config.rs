//! Capability flags of a test case.
//!
//! Every check a [`TransformTestCase`](crate::TransformTestCase) performs
//! beyond the plain forward transform is gated by a [`Key`]. Implementers
//! disable what their library does not support, either in code through
//! [`ImplementationDetails`] or from a properties text:
//!
//! ```
//! # use geoconform::config::{Configuration, Key};
//! # fn main() -> geoconform::Result<()> {
//! let config = Configuration::from_properties(
//!     "# our transforms have no derivative\n\
//!      isDerivativeSupported = false\n\
//!      isFloatToFloatSupported: true\n",
//! )?;
//! assert_eq!(config.get(Key::IsDerivativeSupported), Some(false));
//! assert_eq!(config.get(Key::IsFloatToFloatSupported), Some(true));
//! assert_eq!(config.get(Key::IsInverseTransformSupported), None);
//! # Ok(())}
//! ```
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseConfigurationKind;
use crate::tolerance::SharedModifier;
use crate::{Error, MathTransform, Result};

/// A capability flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum Key {
    /// Arrays of `f64` into arrays of `f64`.
    IsDoubleToDoubleSupported,
    /// Arrays of `f32` into arrays of `f32`.
    IsFloatToFloatSupported,
    /// Arrays of `f64` into arrays of `f32`.
    IsDoubleToFloatSupported,
    /// Arrays of `f32` into arrays of `f64`.
    IsFloatToDoubleSupported,
    /// Source and target ranges overlapping in one buffer.
    IsOverlappingArraySupported,
    IsInverseTransformSupported,
    IsDerivativeSupported,
    /// Transforms whose source and target dimensions differ.
    IsNonSquareMatrixSupported,
    /// Transforms on spaces other than two-dimensional ones.
    IsNonBidimensionalSpaceSupported,
    IsAxisSwappingSupported,
    /// Reported only: whether an implementation-specific tolerance was in effect.
    IsToleranceRelaxed,
}

impl Key {
    pub const ALL: [Key; 11] = [
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
        Key::IsToleranceRelaxed,
    ];

    /// Returns the camel case name used in reports and properties.
    pub fn name(&self) -> &'static str {
        match self {
            Key::IsDoubleToDoubleSupported => "isDoubleToDoubleSupported",
            Key::IsFloatToFloatSupported => "isFloatToFloatSupported",
            Key::IsDoubleToFloatSupported => "isDoubleToFloatSupported",
            Key::IsFloatToDoubleSupported => "isFloatToDoubleSupported",
            Key::IsOverlappingArraySupported => "isOverlappingArraySupported",
            Key::IsInverseTransformSupported => "isInverseTransformSupported",
            Key::IsDerivativeSupported => "isDerivativeSupported",
            Key::IsNonSquareMatrixSupported => "isNonSquareMatrixSupported",
            Key::IsNonBidimensionalSpaceSupported => "isNonBidimensionalSpaceSupported",
            Key::IsAxisSwappingSupported => "isAxisSwappingSupported",
            Key::IsToleranceRelaxed => "isToleranceRelaxed",
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Key {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Key::ALL.into_iter().find(|k| k.name() == s).ok_or(())
    }
}

/// An ordered report of flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Configuration {
    entries: BTreeMap<Key, bool>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, key: Key) -> Option<bool> {
        self.entries.get(&key).copied()
    }

    /// Sets a flag, returning the previous value.
    #[inline]
    pub fn put(&mut self, key: Key, value: bool) -> Option<bool> {
        self.entries.insert(key, value)
    }

    /// Returns the flags in [`Key`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Key, bool)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses `key = value` lines.
    ///
    /// `key: value` is accepted too; blank lines and lines starting
    /// with `#` or `!` are ignored.
    ///
    /// # Errors
    ///
    /// If a line has no separator, an unknown key or a value other than
    /// `true` and `false`.
    pub fn from_properties(s: &str) -> Result<Self> {
        let mut config = Self::new();
        for (lineno, line) in s.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }
            let (key, value) = trimmed
                .split_once(['=', ':'])
                .ok_or_else(|| Error::new_parse_configuration(lineno + 1, ParseConfigurationKind::Separator, line))?;
            let key: Key = key.trim().parse().map_err(|_| {
                Error::new_parse_configuration(lineno + 1, ParseConfigurationKind::Key, line)
            })?;
            let value: bool = value.trim().parse().map_err(|_| {
                Error::new_parse_configuration(lineno + 1, ParseConfigurationKind::Value, line)
            })?;
            config.put(key, value);
        }
        Ok(config)
    }
}

impl FromIterator<(Key, bool)> for Configuration {
    fn from_iter<I: IntoIterator<Item = (Key, bool)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Display for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (k, v) in self.iter() {
            writeln!(f, "{k} = {v}")?;
        }
        Ok(())
    }
}

/// Implementation-specific adjustments of the tests.
///
/// Both methods default to "no adjustment".
pub trait ImplementationDetails: Debug {
    /// Returns the flags to override, typically capabilities set to `false`.
    fn configuration(&self) -> Configuration {
        Configuration::new()
    }

    /// Returns a tolerance modifier relaxing the checks of `transform`, if needed.
    fn needs_relaxed_tolerance(&self, _transform: &dyn MathTransform) -> Option<SharedModifier> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorImpl;

    #[test]
    fn test_key() {
        for k in Key::ALL {
            assert_eq!(k.name().parse::<Key>(), Ok(k));
        }
        assert!("IsDerivativeSupported".parse::<Key>().is_err());
    }

    #[test]
    fn test_put() {
        let mut c = Configuration::new();
        assert_eq!(c.put(Key::IsDerivativeSupported, true), None);
        assert_eq!(c.put(Key::IsDerivativeSupported, false), Some(true));
        c.put(Key::IsDoubleToDoubleSupported, true);
        assert_eq!(
            c.iter().collect::<Vec<_>>(),
            vec![
                (Key::IsDoubleToDoubleSupported, true),
                (Key::IsDerivativeSupported, false)
            ]
        );
        assert_eq!(
            c.to_string(),
            "isDoubleToDoubleSupported = true\nisDerivativeSupported = false\n"
        );
    }

    #[test]
    fn test_from_properties() {
        let c = Configuration::from_properties("\n! comment\n  isAxisSwappingSupported=false  \n").unwrap();
        assert_eq!(c.len(), 1);

        let cases = [
            ("isAxisSwappingSupported false", ParseConfigurationKind::Separator),
            ("isAxisSwapping = false", ParseConfigurationKind::Key),
            ("isAxisSwappingSupported = no", ParseConfigurationKind::Value),
        ];
        for (text, expected) in cases {
            let err = Configuration::from_properties(&format!("# header\n{text}")).unwrap_err();
            match err.kind() {
                ErrorImpl::ParseConfiguration { kind, lineno, line } => {
                    assert_eq!(*kind, expected);
                    assert_eq!(*lineno, 2);
                    assert_eq!(line, text);
                }
                _ => panic!("{err}"),
            }
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() {
        let c: Configuration = [(Key::IsInverseTransformSupported, false)].into_iter().collect();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"isInverseTransformSupported":false}"#);
        assert_eq!(serde_json::from_str::<Configuration>(&json).unwrap(), c);
    }
}
