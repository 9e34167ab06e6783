//! Position-dependent tolerance of coordinate comparisons.
//!
//! A comparison starts from one base tolerance per target dimension, then a
//! [`ToleranceModifier`] may widen or convert it depending on the point and
//! on the kind of [`CalculationType`] being verified.
//!
//! ```
//! # use geoconform::tolerance::*;
//! # fn main() -> geoconform::Result<()> {
//! let modifier = projection(0, 1)?;
//! let mut tol = compute_tolerances(1.0, 2, &[10.0, 45.0], CalculationType::InverseTransform, Some(modifier.as_ref()));
//! // one metre is about 1/111120 of a degree of latitude
//! assert!((tol[1] - 1.0 / (1852.0 * 60.0)).abs() < 1e-15);
//!
//! tol = compute_tolerances(1.0, 2, &[10.0, 45.0], CalculationType::DirectTransform, Some(modifier.as_ref()));
//! assert_eq!(tol, vec![1.0, 1.0]);
//! # Ok(())}
//! ```
use std::any::Any;
use std::fmt::{Debug, Display};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Length of a nautical mile in metres, one minute of arc on a great circle.
pub const NAUTICAL_MILE: f64 = 1852.0;

/// Kind of calculation whose result is being compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum CalculationType {
    /// Exact equality, the tolerance is ignored; `0.0` equals `-0.0`.
    Strict,
    /// Result of a forward transform.
    DirectTransform,
    /// Result of an inverse transform, in source units.
    InverseTransform,
    /// Element of a derivative matrix.
    Derivative,
    /// A value which should have been left untouched, e.g. a source buffer.
    Identity,
}

impl CalculationType {
    /// Returns `true` for the kinds compared with a zero tolerance.
    ///
    /// Only [`CalculationType::Identity`] also tells `0.0` from `-0.0`.
    #[inline]
    pub fn is_exact(&self) -> bool {
        matches!(self, CalculationType::Strict | CalculationType::Identity)
    }
}

impl Display for CalculationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CalculationType::Strict => "STRICT",
            CalculationType::DirectTransform => "DIRECT_TRANSFORM",
            CalculationType::InverseTransform => "INVERSE_TRANSFORM",
            CalculationType::Derivative => "DERIVATIVE",
            CalculationType::Identity => "IDENTITY",
        };
        f.write_str(s)
    }
}

/// Adjusts tolerances in place for one comparison.
///
/// `tolerances` has one element per compared dimension; `position` is the
/// expected position, in the units of the compared values.
pub trait ToleranceModifier: Any + Debug + Display {
    fn adjust(&self, tolerances: &mut [f64], position: &[f64], mode: CalculationType);
}

/// Returns the tolerance of each dimension for one comparison.
///
/// [`CalculationType::Strict`] and [`CalculationType::Identity`] give zeros
/// whatever the modifier; otherwise every element starts at `base` and the
/// modifier, if any, is applied once.
pub fn compute_tolerances(
    base: f64,
    dimension: usize,
    position: &[f64],
    mode: CalculationType,
    modifier: Option<&dyn ToleranceModifier>,
) -> Vec<f64> {
    if mode.is_exact() {
        return vec![0.0; dimension];
    }
    let mut tolerances = vec![base; dimension];
    if let Some(modifier) = modifier {
        modifier.adjust(&mut tolerances, position, mode);
    }
    tolerances
}

/// Multiplies each tolerance by the magnitude of its ordinate, if greater than 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Relative;

impl ToleranceModifier for Relative {
    fn adjust(&self, tolerances: &mut [f64], position: &[f64], _mode: CalculationType) {
        for (t, p) in tolerances.iter_mut().zip(position) {
            let scale = p.abs();
            if scale > 1.0 {
                *t *= scale;
            }
        }
    }
}

impl Display for Relative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Relative[…]")
    }
}

/// Converts metre tolerances to degrees on the λ and φ dimensions.
///
/// The φ tolerance is divided by `1852 × 60`; the λ tolerance additionally by
/// `cos φ`, and becomes 360 (any longitude) at the poles or when it would
/// exceed 360.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geographic {
    lambda: usize,
    phi: usize,
}

impl Geographic {
    /// # Errors
    ///
    /// If `lambda == phi`.
    pub fn new(lambda: usize, phi: usize) -> Result<Self> {
        if lambda == phi {
            return Err(Error::new_configuration(
                "λ and φ dimensions must be different",
            ));
        }
        Ok(Self { lambda, phi })
    }

    fn write_axes(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in 0..=self.lambda.max(self.phi) {
            let c = if i == self.lambda {
                'λ'
            } else if i == self.phi {
                'φ'
            } else {
                '·'
            };
            write!(f, "{c},")?;
        }
        f.write_str("…")
    }
}

impl ToleranceModifier for Geographic {
    fn adjust(&self, tolerances: &mut [f64], position: &[f64], _mode: CalculationType) {
        let Some(&phi) = position.get(self.phi) else {
            return;
        };
        if self.lambda.max(self.phi) >= tolerances.len() {
            return;
        }
        tolerances[self.phi] /= NAUTICAL_MILE * 60.0;
        let mut tol = tolerances[self.lambda];
        if tol != 0.0 {
            tol /= NAUTICAL_MILE * 60.0 * phi.abs().to_radians().cos();
            if !(tol <= 360.0) || phi.abs() == 90.0 {
                tol = 360.0;
            }
            tolerances[self.lambda] = tol;
        }
    }
}

impl Display for Geographic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Geographic[")?;
        self.write_axes(f)?;
        f.write_str("]")
    }
}

/// [`Geographic`] for inverse projections only, direct results stay in metres.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projection(Geographic);

impl Projection {
    /// # Errors
    ///
    /// If `lambda == phi`.
    pub fn new(lambda: usize, phi: usize) -> Result<Self> {
        Geographic::new(lambda, phi).map(Self)
    }
}

impl ToleranceModifier for Projection {
    fn adjust(&self, tolerances: &mut [f64], position: &[f64], mode: CalculationType) {
        if mode == CalculationType::InverseTransform {
            self.0.adjust(tolerances, position, mode);
        }
    }
}

impl Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Projection[")?;
        self.0.write_axes(f)?;
        f.write_str("]")
    }
}

/// Multiplies tolerances by per-dimension factors for some calculation types.
#[derive(Debug, Clone, PartialEq)]
pub struct Scale {
    types: Vec<CalculationType>,
    factors: Vec<f64>,
}

impl ToleranceModifier for Scale {
    fn adjust(&self, tolerances: &mut [f64], _position: &[f64], mode: CalculationType) {
        if self.types.contains(&mode) {
            for (t, s) in tolerances.iter_mut().zip(&self.factors) {
                *t *= s;
            }
        }
    }
}

impl Display for Scale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Scale[")?;
        for (i, t) in self.types.iter().enumerate() {
            if i != 0 {
                f.write_str(",")?;
            }
            write!(f, "{t}")?;
        }
        f.write_str(":")?;
        for factor in &self.factors {
            if *factor == 1.0 {
                f.write_str("·,")?;
            } else if factor.fract() == 0.0 && factor.abs() < i32::MAX as f64 {
                write!(f, "×{},", *factor as i64)?;
            } else {
                write!(f, "×{factor},")?;
            }
        }
        f.write_str("…]")
    }
}

/// Element-wise maximum over several modifiers, each applied to the original tolerances.
#[derive(Debug, Clone)]
pub struct Maximum {
    modifiers: Vec<Arc<dyn ToleranceModifier>>,
}

impl ToleranceModifier for Maximum {
    fn adjust(&self, tolerances: &mut [f64], position: &[f64], mode: CalculationType) {
        let original = tolerances.to_vec();
        let mut copy = vec![0.0; original.len()];
        for modifier in &self.modifiers {
            copy.copy_from_slice(&original);
            modifier.adjust(&mut copy, position, mode);
            for (t, c) in tolerances.iter_mut().zip(&copy) {
                if *c > *t {
                    *t = *c;
                }
            }
        }
    }
}

impl Display for Maximum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Maximum[")?;
        for (i, m) in self.modifiers.iter().enumerate() {
            if i != 0 {
                f.write_str(", ")?;
            }
            write!(f, "{m}")?;
        }
        f.write_str("]")
    }
}

/// Applies `first`, then `second` on the result.
#[derive(Debug, Clone)]
pub struct Concatenate {
    first: Arc<dyn ToleranceModifier>,
    second: Arc<dyn ToleranceModifier>,
}

impl ToleranceModifier for Concatenate {
    fn adjust(&self, tolerances: &mut [f64], position: &[f64], mode: CalculationType) {
        self.first.adjust(tolerances, position, mode);
        self.second.adjust(tolerances, position, mode);
    }
}

impl Display for Concatenate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Concatenate[{} → {}]", self.first, self.second)
    }
}

/// Shared handle on a modifier.
pub type SharedModifier = Arc<dyn ToleranceModifier>;

/// Returns the [`Relative`] modifier.
pub fn relative() -> SharedModifier {
    Arc::new(Relative)
}

/// Returns a [`Geographic`] modifier for (λ, φ) at the given dimensions.
///
/// # Errors
///
/// If `lambda == phi`.
pub fn geographic(lambda: usize, phi: usize) -> Result<SharedModifier> {
    Ok(Arc::new(Geographic::new(lambda, phi)?))
}

/// Returns a [`Projection`] modifier for (λ, φ) at the given dimensions.
///
/// # Errors
///
/// If `lambda == phi`.
pub fn projection(lambda: usize, phi: usize) -> Result<SharedModifier> {
    Ok(Arc::new(Projection::new(lambda, phi)?))
}

/// Returns a [`Scale`] modifier, or `None` if it would change nothing.
///
/// Trailing factors of 1 are dropped; `None` is returned for an empty
/// `types` set or when every factor is 1.
///
/// # Errors
///
/// If a factor is negative or NaN.
///
/// # Example
///
/// ```
/// # use geoconform::tolerance::*;
/// # fn main() -> geoconform::Result<()> {
/// let s = scale(&[CalculationType::InverseTransform], &[1.0, 2.0, 1.0])?.unwrap();
/// assert_eq!(s.to_string(), "Scale[INVERSE_TRANSFORM:·,×2,…]");
///
/// assert!(scale(&[], &[2.0])?.is_none());
/// assert!(scale(&[CalculationType::Derivative], &[1.0, 1.0])?.is_none());
/// assert!(scale(&[CalculationType::Derivative], &[-1.0]).is_err());
/// # Ok(())}
/// ```
pub fn scale(types: &[CalculationType], factors: &[f64]) -> Result<Option<SharedModifier>> {
    let mut types = types.to_vec();
    types.sort();
    types.dedup();
    if types.is_empty() {
        return Ok(None);
    }
    let mut upper = 0;
    for (i, factor) in factors.iter().enumerate() {
        if !(*factor >= 0.0) {
            return Err(Error::new_configuration(format!(
                "illegal scale: factors[{i}] = {factor}"
            )));
        }
        if *factor != 1.0 {
            upper = i + 1;
        }
    }
    if upper == 0 {
        return Ok(None);
    }
    Ok(Some(Arc::new(Scale {
        types,
        factors: factors[..upper].to_vec(),
    })))
}

/// Returns a [`Maximum`] of the given modifiers, flattening nested maxima.
///
/// No modifier gives `None`, a single one is returned as is.
pub fn maximum(modifiers: &[SharedModifier]) -> Option<SharedModifier> {
    match modifiers {
        [] => None,
        [single] => Some(Arc::clone(single)),
        _ => {
            let mut expanded = Vec::with_capacity(modifiers.len());
            for m in modifiers {
                match as_maximum(m.as_ref()) {
                    Some(nested) => expanded.extend(nested.modifiers.iter().cloned()),
                    None => expanded.push(Arc::clone(m)),
                }
            }
            Some(Arc::new(Maximum {
                modifiers: expanded,
            }))
        }
    }
}

/// Returns `first` followed by `second`; a missing side gives the other.
pub fn concatenate(
    first: Option<SharedModifier>,
    second: Option<SharedModifier>,
) -> Option<SharedModifier> {
    match (first, second) {
        (None, s) => s,
        (f, None) => f,
        (Some(first), Some(second)) => Some(Arc::new(Concatenate { first, second })),
    }
}

fn as_maximum(m: &dyn ToleranceModifier) -> Option<&Maximum> {
    let any: &dyn Any = m;
    any.downcast_ref::<Maximum>()
}
