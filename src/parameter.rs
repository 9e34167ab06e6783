//! Named parameters of operation methods.
//!
//! A [`ParameterDescriptorGroup`] describes the parameters of one method, a
//! [`ParameterValueGroup`] holds values for them. Values are checked against
//! their descriptor when set.
//!
//! ```
//! # use geoconform::*;
//! # use geoconform::parameter::*;
//! # fn main() -> Result<()> {
//! let factory = DefaultMathTransformFactory::new();
//! let mut group = factory.default_parameters("Mercator (1SP)")?;
//! assert_eq!(group.name(), "Mercator (variant A)");
//!
//! group.parameter("Scale factor at natural origin")?.set_value(0.997)?;
//! assert_eq!(group.value("Scale factor at natural origin")?.double_value()?, 0.997);
//!
//! // Outside of the domain
//! assert!(group.parameter("Latitude of natural origin")?.set_value(91.0).is_err());
//! # Ok(())}
//! ```
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Unit of measure of a numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Unit {
    Metre,
    Degree,
    /// Dimensionless, e.g. a scale factor.
    Unity,
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Unit::Metre => "metre",
            Unit::Degree => "degree",
            Unit::Unity => "unity",
        };
        f.write_str(s)
    }
}

/// Type of the values a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueType {
    Real,
    Integer,
    Boolean,
    Text,
}

/// A parameter value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl Value {
    /// Returns the type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Real(_) => ValueType::Real,
            Value::Integer(_) => ValueType::Integer,
            Value::Boolean(_) => ValueType::Boolean,
            Value::Text(_) => ValueType::Text,
        }
    }

    /// Returns the numeric value, integers widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns `true` if this value may be stored in a parameter of type `t`.
    pub fn is_instance_of(&self, t: ValueType) -> bool {
        self.value_type() == t || (t == ValueType::Real && matches!(self, Value::Integer(_)))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Real(v) => write!(f, "{v}"),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "\"{v}\""),
        }
    }
}

/// Definition of one parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub value_type: ValueType,
    pub unit: Option<Unit>,
    pub default_value: Option<Value>,
    /// Inclusive lower bound of numeric values.
    pub minimum: Option<f64>,
    /// Inclusive upper bound of numeric values.
    pub maximum: Option<f64>,
    /// Closed set of accepted values, if any.
    pub valid_values: Option<Vec<Value>>,
    /// 0 for optional parameters, 1 for mandatory ones.
    pub minimum_occurs: u32,
    pub maximum_occurs: u32,
}

impl ParameterDescriptor {
    /// Returns `true` if `name` is the name or an alias, ignoring case and surrounding spaces.
    pub fn is_named(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Checks `value` against this descriptor.
    ///
    /// # Errors
    ///
    /// If `value` has the wrong type, is out of bounds or is not a valid value.
    pub fn check(&self, value: &Value) -> Result<()> {
        if !value.is_instance_of(self.value_type) {
            return Err(Error::new_invalid_parameter(
                &self.name,
                format!("{value} is not a {:?} value", self.value_type),
            ));
        }
        if let Some(v) = value.as_f64() {
            let below = self.minimum.is_some_and(|min| !(v >= min));
            let above = self.maximum.is_some_and(|max| !(v <= max));
            if below || above {
                return Err(Error::new_invalid_parameter(
                    &self.name,
                    format!(
                        "{v} is out of [{}, {}]",
                        self.minimum.unwrap_or(f64::NEG_INFINITY),
                        self.maximum.unwrap_or(f64::INFINITY)
                    ),
                ));
            }
        }
        if let Some(valid) = &self.valid_values {
            if !valid.contains(value) {
                return Err(Error::new_invalid_parameter(
                    &self.name,
                    format!("{value} is not a valid value"),
                ));
            }
        }
        Ok(())
    }
}

/// Builds a [`ParameterDescriptor`].
///
/// # Example
///
/// ```
/// # use geoconform::parameter::*;
/// let d = ParameterBuilder::new("Latitude of natural origin")
///     .unit(Unit::Degree)
///     .range(-90.0, 90.0)
///     .default_value(0.0)
///     .build();
///
/// assert_eq!(d.value_type, ValueType::Real);
/// assert_eq!(d.minimum_occurs, 1);
/// assert!(d.check(&Value::Real(45.0)).is_ok());
/// assert!(d.check(&Value::Real(95.0)).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ParameterBuilder {
    descriptor: ParameterDescriptor,
}

impl ParameterBuilder {
    /// Starts a mandatory real parameter.
    pub fn new(name: &str) -> Self {
        Self {
            descriptor: ParameterDescriptor {
                name: name.to_string(),
                aliases: Vec::new(),
                value_type: ValueType::Real,
                unit: None,
                default_value: None,
                minimum: None,
                maximum: None,
                valid_values: None,
                minimum_occurs: 1,
                maximum_occurs: 1,
            },
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.descriptor.aliases.push(alias.to_string());
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.descriptor.value_type = value_type;
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.descriptor.unit = Some(unit);
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.descriptor.default_value = Some(value.into());
        self
    }

    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.descriptor.minimum = Some(minimum);
        self.descriptor.maximum = Some(maximum);
        self
    }

    pub fn minimum(mut self, minimum: f64) -> Self {
        self.descriptor.minimum = Some(minimum);
        self
    }

    pub fn valid_values(mut self, values: Vec<Value>) -> Self {
        self.descriptor.valid_values = Some(values);
        self
    }

    pub fn optional(mut self) -> Self {
        self.descriptor.minimum_occurs = 0;
        self
    }

    pub fn build(self) -> ParameterDescriptor {
        self.descriptor
    }
}

/// Definition of the parameters of one method.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptorGroup {
    pub name: String,
    pub aliases: Vec<String>,
    pub descriptors: Vec<Arc<ParameterDescriptor>>,
    pub minimum_occurs: u32,
    pub maximum_occurs: u32,
}

impl ParameterDescriptorGroup {
    pub fn new(name: &str, aliases: &[&str], descriptors: Vec<ParameterDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            descriptors: descriptors.into_iter().map(Arc::new).collect(),
            minimum_occurs: 1,
            maximum_occurs: 1,
        }
    }

    /// Returns `true` if `name` is the name or an alias, ignoring case and surrounding spaces.
    pub fn is_named(&self, name: &str) -> bool {
        let name = name.trim();
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Looks a descriptor up by name or alias.
    pub fn descriptor(&self, name: &str) -> Result<&Arc<ParameterDescriptor>> {
        self.descriptors
            .iter()
            .find(|d| d.is_named(name))
            .ok_or_else(|| Error::new_parameter_not_found(name))
    }

    /// Makes a value group initialized to the default values.
    pub fn create_value(self: &Arc<Self>) -> ParameterValueGroup {
        ParameterValueGroup {
            descriptor: Arc::clone(self),
            values: self
                .descriptors
                .iter()
                .map(|d| ParameterValue {
                    descriptor: Arc::clone(d),
                    value: d.default_value.clone(),
                })
                .collect(),
        }
    }
}

/// The value of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValue {
    pub(crate) descriptor: Arc<ParameterDescriptor>,
    pub(crate) value: Option<Value>,
}

impl ParameterValue {
    #[inline]
    pub fn descriptor(&self) -> &Arc<ParameterDescriptor> {
        &self.descriptor
    }

    #[inline]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Sets the value after checking it against the descriptor.
    ///
    /// # Errors
    ///
    /// If the descriptor rejects the value; the previous value is kept.
    pub fn set_value(&mut self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.descriptor.check(&value)?;
        self.value = Some(value);
        Ok(())
    }

    /// Returns the value as `f64`.
    ///
    /// # Errors
    ///
    /// If the value is missing or not numeric.
    pub fn double_value(&self) -> Result<f64> {
        match &self.value {
            Some(v) => v.as_f64().ok_or_else(|| {
                Error::new_invalid_parameter(&self.descriptor.name, format!("{v} is not numeric"))
            }),
            None => Err(self.missing()),
        }
    }

    /// Returns the value as `i64`.
    ///
    /// # Errors
    ///
    /// If the value is missing or not an integer.
    pub fn int_value(&self) -> Result<i64> {
        match &self.value {
            Some(Value::Integer(v)) => Ok(*v),
            Some(v) => Err(Error::new_invalid_parameter(
                &self.descriptor.name,
                format!("{v} is not an integer"),
            )),
            None => Err(self.missing()),
        }
    }

    /// Returns the value as `bool`.
    ///
    /// # Errors
    ///
    /// If the value is missing or not a boolean.
    pub fn boolean_value(&self) -> Result<bool> {
        match &self.value {
            Some(Value::Boolean(v)) => Ok(*v),
            Some(v) => Err(Error::new_invalid_parameter(
                &self.descriptor.name,
                format!("{v} is not a boolean"),
            )),
            None => Err(self.missing()),
        }
    }

    fn missing(&self) -> Error {
        Error::new_invalid_parameter(&self.descriptor.name, "no value")
    }
}

/// Values for the parameters of one method.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValueGroup {
    pub(crate) descriptor: Arc<ParameterDescriptorGroup>,
    pub(crate) values: Vec<ParameterValue>,
}

impl ParameterValueGroup {
    #[inline]
    pub fn descriptor(&self) -> &Arc<ParameterDescriptorGroup> {
        &self.descriptor
    }

    /// Returns the method name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    #[inline]
    pub fn values(&self) -> &[ParameterValue] {
        &self.values
    }

    /// Returns the parameter of that name or alias, for modification.
    ///
    /// # Errors
    ///
    /// If the group has no such parameter.
    pub fn parameter(&mut self, name: &str) -> Result<&mut ParameterValue> {
        self.values
            .iter_mut()
            .find(|v| v.descriptor.is_named(name))
            .ok_or_else(|| Error::new_parameter_not_found(name))
    }

    /// Returns the parameter of that name or alias.
    ///
    /// # Errors
    ///
    /// If the group has no such parameter.
    pub fn value(&self, name: &str) -> Result<&ParameterValue> {
        self.values
            .iter()
            .find(|v| v.descriptor.is_named(name))
            .ok_or_else(|| Error::new_parameter_not_found(name))
    }

    /// Returns a numeric parameter, or its absence as `Ok(None)` when optional.
    pub(crate) fn optional_f64(&self, name: &str) -> Result<Option<f64>> {
        let p = self.value(name)?;
        match p.value {
            None if p.descriptor.minimum_occurs == 0 => Ok(None),
            _ => p.double_value().map(Some),
        }
    }
}

impl std::fmt::Display for ParameterValueGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.name())?;
        for p in &self.values {
            match (&p.value, p.descriptor.unit) {
                (Some(v), Some(u)) => writeln!(f, "  {} = {v} {u}", p.descriptor.name)?,
                (Some(v), None) => writeln!(f, "  {} = {v}", p.descriptor.name)?,
                (None, _) => writeln!(f, "  {} = <unset>", p.descriptor.name)?,
            }
        }
        Ok(())
    }
}
