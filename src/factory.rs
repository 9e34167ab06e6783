//! Creation of transforms from named parameters.
use std::fmt::Debug;
use std::sync::Arc;

use log::debug;

use crate::operation::{AffineTransform, Mercator};
use crate::parameter::{ParameterBuilder, ParameterDescriptor, ParameterDescriptorGroup, ParameterValueGroup, Unit};
use crate::{Error, MathTransform, Matrix, Result};

/// Makes transforms from operation methods and their parameters.
///
/// A factory refusing a method returns an [`Unsupported`](crate::error::ErrorImpl::Unsupported) error,
/// which test suites report as skipped, unless the method is listed by
/// [`available_methods`](MathTransformFactory::available_methods).
pub trait MathTransformFactory: Debug {
    /// Returns the names and aliases of the supported methods.
    fn available_methods(&self) -> Vec<&str>;

    /// Returns the parameters of `method`, initialized to their defaults.
    fn default_parameters(&self, method: &str) -> Result<ParameterValueGroup>;

    /// Makes a transform from the method and values of `parameters`.
    fn create_parameterized_transform(
        &self,
        parameters: &ParameterValueGroup,
    ) -> Result<Arc<dyn MathTransform>>;

    /// Makes a transform from an affine matrix.
    fn create_affine_transform(&self, matrix: Matrix) -> Result<Arc<dyn MathTransform>> {
        Ok(Arc::new(AffineTransform::new(matrix)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    MercatorA,
    MercatorB,
    MercatorSpherical,
    PseudoMercator,
}

impl Method {
    const ALL: [Method; 4] = [
        Method::MercatorA,
        Method::MercatorB,
        Method::MercatorSpherical,
        Method::PseudoMercator,
    ];

    fn descriptor(&self) -> ParameterDescriptorGroup {
        match self {
            Method::MercatorA => ParameterDescriptorGroup::new(
                "Mercator (variant A)",
                &["Mercator (1SP)", "Mercator_1SP"],
                vec![
                    semi_major(),
                    semi_minor(),
                    latitude("Latitude of natural origin"),
                    longitude("Longitude of natural origin"),
                    scale_factor(),
                    false_easting(),
                    false_northing(),
                ],
            ),
            Method::MercatorB => ParameterDescriptorGroup::new(
                "Mercator (variant B)",
                &["Mercator (2SP)", "Mercator_2SP"],
                vec![
                    semi_major(),
                    semi_minor(),
                    latitude("Latitude of 1st standard parallel"),
                    longitude("Longitude of natural origin"),
                    false_easting(),
                    false_northing(),
                ],
            ),
            Method::MercatorSpherical => ParameterDescriptorGroup::new(
                "Mercator (Spherical)",
                &["Mercator_Spherical"],
                vec![
                    semi_major(),
                    semi_minor(),
                    latitude("Latitude of natural origin"),
                    longitude("Longitude of natural origin"),
                    scale_factor(),
                    false_easting(),
                    false_northing(),
                ],
            ),
            Method::PseudoMercator => ParameterDescriptorGroup::new(
                "Popular Visualisation Pseudo Mercator",
                &["Pseudo-Mercator"],
                vec![
                    semi_major(),
                    semi_minor(),
                    latitude("Latitude of natural origin"),
                    longitude("Longitude of natural origin"),
                    false_easting(),
                    false_northing(),
                ],
            ),
        }
    }

    fn create(&self, p: &ParameterValueGroup) -> Result<Mercator> {
        let a = p.value("semi_major")?.double_value()?;
        let b = p.value("semi_minor")?.double_value()?;
        let lon0 = p.value("Longitude of natural origin")?.double_value()?;
        let fe = p.value("False easting")?.double_value()?;
        let fn_ = p.value("False northing")?.double_value()?;
        match self {
            Method::MercatorA | Method::MercatorSpherical => {
                let lat0 = p.value("Latitude of natural origin")?.double_value()?;
                if lat0 != 0.0 {
                    return Err(Error::new_invalid_parameter(
                        "Latitude of natural origin",
                        format!("{lat0} is not 0"),
                    ));
                }
                let k0 = p.value("Scale factor at natural origin")?.double_value()?;
                // spherical formulas on the semi-major axis
                let b = if *self == Method::MercatorSpherical { a } else { b };
                Mercator::variant_a(a, b, lon0, k0, fe, fn_)
            }
            Method::MercatorB => {
                let phi1 = p.value("Latitude of 1st standard parallel")?.double_value()?;
                Mercator::variant_b(a, b, phi1, lon0, fe, fn_)
            }
            Method::PseudoMercator => {
                let lat0 = p.value("Latitude of natural origin")?.double_value()?;
                if lat0 != 0.0 {
                    return Err(Error::new_invalid_parameter(
                        "Latitude of natural origin",
                        format!("{lat0} is not 0"),
                    ));
                }
                Mercator::pseudo(a, b, lon0, fe, fn_)
            }
        }
    }
}

fn semi_major() -> ParameterDescriptor {
    ParameterBuilder::new("semi_major")
        .unit(Unit::Metre)
        .minimum(0.0)
        .build()
}

fn semi_minor() -> ParameterDescriptor {
    ParameterBuilder::new("semi_minor")
        .unit(Unit::Metre)
        .minimum(0.0)
        .build()
}

fn latitude(name: &str) -> ParameterDescriptor {
    ParameterBuilder::new(name)
        .unit(Unit::Degree)
        .range(-90.0, 90.0)
        .default_value(0.0)
        .build()
}

fn longitude(name: &str) -> ParameterDescriptor {
    ParameterBuilder::new(name)
        .alias("central_meridian")
        .unit(Unit::Degree)
        .range(-180.0, 180.0)
        .default_value(0.0)
        .build()
}

fn scale_factor() -> ParameterDescriptor {
    ParameterBuilder::new("Scale factor at natural origin")
        .alias("scale_factor")
        .unit(Unit::Unity)
        .minimum(0.0)
        .default_value(1.0)
        .build()
}

fn false_easting() -> ParameterDescriptor {
    ParameterBuilder::new("False easting")
        .alias("false_easting")
        .unit(Unit::Metre)
        .default_value(0.0)
        .build()
}

fn false_northing() -> ParameterDescriptor {
    ParameterBuilder::new("False northing")
        .alias("false_northing")
        .unit(Unit::Metre)
        .default_value(0.0)
        .build()
}

/// A factory of the affine transforms and the Mercator family.
///
/// # Example
///
/// ```
/// # use geoconform::*;
/// # fn main() -> Result<()> {
/// let factory = DefaultMathTransformFactory::new();
/// assert!(factory.available_methods().contains(&"Mercator (2SP)"));
///
/// let mut parameters = factory.default_parameters("Popular Visualisation Pseudo Mercator")?;
/// parameters.parameter("semi_major")?.set_value(6378137.0)?;
/// parameters.parameter("semi_minor")?.set_value(6356752.314)?;
///
/// let tr = factory.create_parameterized_transform(&parameters)?;
/// let mut dst = [0.0; 2];
/// tr.transform(&[0.0, 0.0], &mut dst)?;
/// assert_eq!(dst, [0.0, 0.0]);
///
/// assert!(factory.default_parameters("Krovak").unwrap_err().is_skip());
/// # Ok(())}
/// ```
#[derive(Debug, Clone)]
pub struct DefaultMathTransformFactory {
    methods: Vec<(Method, Arc<ParameterDescriptorGroup>)>,
}

impl DefaultMathTransformFactory {
    pub fn new() -> Self {
        Self {
            methods: Method::ALL
                .iter()
                .map(|m| (*m, Arc::new(m.descriptor())))
                .collect(),
        }
    }

    fn find(&self, name: &str) -> Option<&(Method, Arc<ParameterDescriptorGroup>)> {
        self.methods.iter().find(|(_, d)| d.is_named(name))
    }
}

impl Default for DefaultMathTransformFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MathTransformFactory for DefaultMathTransformFactory {
    fn available_methods(&self) -> Vec<&str> {
        self.methods
            .iter()
            .flat_map(|(_, d)| std::iter::once(d.name.as_str()).chain(d.aliases.iter().map(String::as_str)))
            .collect()
    }

    fn default_parameters(&self, method: &str) -> Result<ParameterValueGroup> {
        self.find(method)
            .map(|(_, d)| d.create_value())
            .ok_or_else(|| Error::new_unsupported(format!("operation method \"{}\"", method.trim())))
    }

    fn create_parameterized_transform(
        &self,
        parameters: &ParameterValueGroup,
    ) -> Result<Arc<dyn MathTransform>> {
        let (method, _) = self.find(parameters.name()).ok_or_else(|| {
            debug!("no operation method for \"{}\"", parameters.name());
            Error::new_unsupported(format!("operation method \"{}\"", parameters.name()))
        })?;
        debug!("create {method:?} transform");
        Ok(Arc::new(method.create(parameters)?))
    }
}
