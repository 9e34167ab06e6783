//! Structural checks of the objects supplied by an implementation.
//!
//! A failed check is a [`ContractViolation`](crate::error::ErrorImpl::ContractViolation).
//!
//! ```
//! # use geoconform::*;
//! # use geoconform::validate::Validators;
//! # fn main() -> Result<()> {
//! let factory = DefaultMathTransformFactory::new();
//! let parameters = epsg::create_parameters(&factory, 19905)?;
//! Validators::validate(&parameters)?;
//!
//! let tr = factory.create_parameterized_transform(&parameters)?;
//! Validators::validate(tr.as_ref())?;
//! # Ok(())}
//! ```
use std::sync::Arc;

use log::trace;

use crate::parameter::{ParameterDescriptor, ParameterDescriptorGroup, ParameterValue, ParameterValueGroup, ValueType};
use crate::{Error, MathTransform, Result};

/// An object [`Validators`] knows how to check.
#[derive(Debug, Clone, Copy)]
pub enum Validatable<'a> {
    ParameterDescriptor(&'a ParameterDescriptor),
    ParameterDescriptorGroup(&'a ParameterDescriptorGroup),
    ParameterValue(&'a ParameterValue),
    ParameterValueGroup(&'a ParameterValueGroup),
    MathTransform(&'a dyn MathTransform),
}

impl<'a> From<&'a ParameterDescriptor> for Validatable<'a> {
    fn from(value: &'a ParameterDescriptor) -> Self {
        Validatable::ParameterDescriptor(value)
    }
}

impl<'a> From<&'a ParameterDescriptorGroup> for Validatable<'a> {
    fn from(value: &'a ParameterDescriptorGroup) -> Self {
        Validatable::ParameterDescriptorGroup(value)
    }
}

impl<'a> From<&'a ParameterValue> for Validatable<'a> {
    fn from(value: &'a ParameterValue) -> Self {
        Validatable::ParameterValue(value)
    }
}

impl<'a> From<&'a ParameterValueGroup> for Validatable<'a> {
    fn from(value: &'a ParameterValueGroup) -> Self {
        Validatable::ParameterValueGroup(value)
    }
}

impl<'a> From<&'a (dyn MathTransform + 'static)> for Validatable<'a> {
    fn from(value: &'a (dyn MathTransform + 'static)) -> Self {
        Validatable::MathTransform(value)
    }
}

/// Entry point of the structural checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validators;

impl Validators {
    /// Checks `object`, recursing into the parts it owns.
    ///
    /// # Errors
    ///
    /// A contract violation naming the first broken rule.
    pub fn validate<'a>(object: impl Into<Validatable<'a>>) -> Result<()> {
        match object.into() {
            Validatable::ParameterDescriptor(d) => descriptor(d),
            Validatable::ParameterDescriptorGroup(g) => descriptor_group(g),
            Validatable::ParameterValue(v) => value(v),
            Validatable::ParameterValueGroup(g) => value_group(g),
            Validatable::MathTransform(t) => transform(t),
        }
    }
}

fn violation(message: String) -> Error {
    Error::new_contract_violation(message)
}

fn descriptor(d: &ParameterDescriptor) -> Result<()> {
    trace!("validate descriptor \"{}\"", d.name);
    if d.name.trim().is_empty() {
        return Err(violation("ParameterDescriptor: expected a name.".to_string()));
    }
    let numeric = matches!(d.value_type, ValueType::Real | ValueType::Integer);
    if !numeric && (d.minimum.is_some() || d.maximum.is_some()) {
        return Err(violation(format!(
            "ParameterDescriptor \"{}\": bounds on a {:?} parameter.",
            d.name, d.value_type
        )));
    }
    if let (Some(min), Some(max)) = (d.minimum, d.maximum) {
        if !(min <= max) {
            return Err(violation(format!(
                "ParameterDescriptor \"{}\": inconsistent minimum and maximum values {min} and {max}.",
                d.name
            )));
        }
    }
    for v in d.valid_values.iter().flatten() {
        if !v.is_instance_of(d.value_type) {
            return Err(violation(format!(
                "ParameterDescriptor \"{}\": valid value {v} is not a {:?}.",
                d.name, d.value_type
            )));
        }
    }
    if let Some(default) = &d.default_value {
        d.check(default).map_err(|e| {
            violation(format!("ParameterDescriptor \"{}\": invalid default value, {e}.", d.name))
        })?;
    }
    if d.minimum_occurs > 1 {
        return Err(violation(format!(
            "ParameterDescriptor \"{}\": minimum occurs shall be 0 or 1, got {}.",
            d.name, d.minimum_occurs
        )));
    }
    if d.maximum_occurs != 1 {
        return Err(violation(format!(
            "ParameterDescriptor \"{}\": maximum occurs shall be exactly 1, got {}.",
            d.name, d.maximum_occurs
        )));
    }
    Ok(())
}

fn descriptor_group(g: &ParameterDescriptorGroup) -> Result<()> {
    trace!("validate descriptor group \"{}\"", g.name);
    if g.name.trim().is_empty() {
        return Err(violation("ParameterDescriptorGroup: expected a name.".to_string()));
    }
    for d in &g.descriptors {
        descriptor(d)?;
        let found = g.descriptor(&d.name).map_err(|_| {
            violation(format!(
                "ParameterDescriptorGroup \"{}\": no descriptor for \"{}\".",
                g.name, d.name
            ))
        })?;
        if !Arc::ptr_eq(found, d) {
            return Err(violation(format!(
                "ParameterDescriptorGroup \"{}\": \"{}\" names more than one descriptor.",
                g.name, d.name
            )));
        }
    }
    if g.minimum_occurs > g.maximum_occurs {
        return Err(violation(format!(
            "ParameterDescriptorGroup \"{}\": minimum occurs {} above maximum occurs {}.",
            g.name, g.minimum_occurs, g.maximum_occurs
        )));
    }
    Ok(())
}

fn value(v: &ParameterValue) -> Result<()> {
    let d = v.descriptor();
    descriptor(d)?;
    if let Some(value) = v.value() {
        d.check(value)
            .map_err(|e| violation(format!("ParameterValue \"{}\": {e}.", d.name)))?;
    }
    Ok(())
}

fn value_group(g: &ParameterValueGroup) -> Result<()> {
    let descriptors = g.descriptor();
    descriptor_group(descriptors)?;
    for v in g.values() {
        value(v)?;
        let name = &v.descriptor().name;
        let known = descriptors
            .descriptor(name)
            .is_ok_and(|d| Arc::ptr_eq(d, v.descriptor()));
        if !known {
            return Err(violation(format!(
                "ParameterValueGroup \"{}\": \"{name}\" is not described by the group.",
                g.name()
            )));
        }
        let same = g.value(name).is_ok_and(|found| std::ptr::eq(found, v));
        if !same {
            return Err(violation(format!(
                "ParameterValueGroup \"{}\": \"{name}\" has more than one value.",
                g.name()
            )));
        }
    }
    Ok(())
}

fn transform(t: &dyn MathTransform) -> Result<()> {
    let sd = t.source_dimensions();
    let td = t.target_dimensions();
    if sd == 0 || td == 0 {
        return Err(violation(format!("MathTransform: dimensions {sd} → {td} must be positive.")));
    }
    if t.as_1d().is_some() && (sd != 1 || td != 1) {
        return Err(violation(format!(
            "MathTransform: a {sd}D → {td}D transform declares the one-dimensional capability."
        )));
    }
    if t.as_2d().is_some() && (sd != 2 || td != 2) {
        return Err(violation(format!(
            "MathTransform: a {sd}D → {td}D transform declares the two-dimensional capability."
        )));
    }
    // a refused inverse is fine here
    if let Ok(inverse) = t.inverse() {
        let (isd, itd) = (inverse.source_dimensions(), inverse.target_dimensions());
        if isd != td || itd != sd {
            return Err(violation(format!(
                "MathTransform: the inverse of a {sd}D → {td}D transform is {isd}D → {itd}D."
            )));
        }
    }
    Ok(())
}
