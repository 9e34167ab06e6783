//! Parameters of the EPSG guidance-note example operations.
//!
//! The codes are those of [`SamplePoints::operation`](crate::sample::SamplePoints::operation);
//! the values are those published in IOGP Publication 373-7-2.
use std::sync::Arc;

use log::debug;

use crate::factory::MathTransformFactory;
use crate::parameter::{ParameterValueGroup, Value};
use crate::{Error, MathTransform, Result};

/// US survey feet per metre.
pub const R_US_FEET: f64 = 3.2808333333333333333;
/// Length of Clarke's foot in metres.
pub const CLARKE_FEET: f64 = 0.3047972654;
/// Length of the international foot in metres.
pub const FEET: f64 = 0.3048;
/// Length of a link in metres.
pub const LINKS: f64 = 0.66 * FEET;

macro_rules! values {
    ($($name:literal => $value:expr),* $(,)?) => {
        vec![$(($name, Value::from($value))),*]
    };
}

/// Returns the method name and the parameter values of an operation.
fn operation(code: u32) -> Option<(&'static str, Vec<(&'static str, Value)>)> {
    let wgs84_b = 6378137.0 * (1.0 - 1.0 / 298.2572236);
    let r = match code {
        // Makassar / NEIEZ
        19905 => ("Mercator (variant A)", values![
            "semi_major" => 6377397.155,
            "semi_minor" => 6377397.155 * (1.0 - 1.0 / 299.1528128),
            "Latitude of natural origin" => 0.0,
            "Longitude of natural origin" => 110.0,
            "Scale factor at natural origin" => 0.997,
            "False easting" => 3900000.0,
            "False northing" => 900000.0,
        ]),
        // Pulkovo 1942 / Caspian Sea Mercator
        19884 => ("Mercator (variant B) ", values![
            "semi_major" => 6378245.0,
            "semi_minor" => 6378245.0 * (1.0 - 1.0 / 298.3),
            "Latitude of 1st standard parallel" => 42.0,
            "Longitude of natural origin" => 51.0,
        ]),
        // WGS 84 / Pseudo-Mercator
        3856 => ("Popular Visualisation Pseudo Mercator", values![
            "semi_major" => 6378137.0,
            "semi_minor" => wgs84_b,
        ]),
        // IGNF:MILLER, not an EPSG code
        310642901 => ("Miller_Cylindrical", values![
            "semi_major" => 6378137.0,
            "semi_minor" => 6378137.0,
        ]),
        // Rectified Skew Orthomorphic Borneo Grid (metres)
        19958 => ("Hotine Oblique Mercator (variant B)", values![
            "semi_major" => 6377298.556,
            "semi_minor" => 6377298.556 * (1.0 - 1.0 / 300.8017),
            "Latitude of projection centre" => 4.0,
            "Longitude of projection centre" => 115.0,
            "Azimuth of initial line" => 53.0 + (18.0 + 56.9537 / 60.0) / 60.0,
            "Angle from Rectified to Skew Grid" => 53.0 + (7.0 + 48.3685 / 60.0) / 60.0,
            "Scale factor on initial line" => 0.99984,
            "Easting at projection centre" => 590476.87,
            "Northing at projection centre" => 442857.65,
        ]),
        // British National Grid
        19916 => ("Transverse Mercator", values![
            "semi_major" => 6377563.396,
            "semi_minor" => 6377563.396 * (1.0 - 1.0 / 299.32496),
            "Latitude of natural origin" => 49.0,
            "Longitude of natural origin" => -2.0,
            "Scale factor at natural origin" => 0.9996012717,
            "False easting" => 400000.00,
            "False northing" => -100000.00,
        ]),
        // South African Survey Grid zone 29
        17529 => ("Transverse Mercator (South Orientated)", values![
            "semi_major" => 6378137.0,
            "semi_minor" => wgs84_b,
            "Latitude of natural origin" => 0.0,
            "Longitude of natural origin" => 29.0,
            "Scale factor at natural origin" => 1.0,
            "False easting" => 0.0,
            "False northing" => 0.0,
        ]),
        // Trinidad 1903 / Trinidad Grid, with the feet and links of the guidance note
        19975 => ("Cassini-Soldner", values![
            "semi_major" => 20926348.0 * FEET,
            "semi_minor" => 20855233.0 * FEET,
            "Latitude of natural origin" => 10.0 + (26.0 + 30.0 / 60.0) / 60.0,
            "Longitude of natural origin" => -(61.0 + 20.0 / 60.0),
            "False easting" => 430000.00 * LINKS,
            "False northing" => 325000.00 * LINKS,
        ]),
        // Vanua Levu Grid
        19878 => ("Hyperbolic Cassini-Soldner", values![
            "semi_major" => 20926202.0 * FEET,
            "semi_minor" => 20854895.0 * FEET,
            "Latitude of natural origin" => -(16.0 + 15.0 / 60.0),
            "Longitude of natural origin" => 179.0 + 20.0 / 60.0,
            "False easting" => 1251331.8 * LINKS,
            "False northing" => 1662888.5 * LINKS,
        ]),
        // JAD69 / Jamaica National Grid
        19910 => ("Lambert Conic Conformal (1SP)", values![
            "semi_major" => 6378206.4,
            "semi_minor" => 6356583.8,
            "Latitude of natural origin" => 18.0,
            "Longitude of natural origin" => -77.0,
            "Scale factor at natural origin" => 1.0,
            "False easting" => 250000.00,
            "False northing" => 150000.00,
        ]),
        // NAD27 / Texas South Central
        14204 => ("Lambert Conic Conformal (2SP)", values![
            "semi_major" => 6378206.4,
            "semi_minor" => 6356583.8,
            "Latitude of 1st standard parallel" => 28.0 + 23.0 / 60.0,
            "Latitude of 2nd standard parallel" => 30.0 + 17.0 / 60.0,
            "Latitude of false origin" => 27.0 + 50.0 / 60.0,
            "Longitude of false origin" => -99.0,
            "Easting at false origin" => 2000000.0 / R_US_FEET,
            "Northing at false origin" => 0.0 / R_US_FEET,
        ]),
        // Michigan CS27 Central zone
        6198 => ("Lambert Conic Conformal (2SP Michigan)", values![
            "semi_major" => 6378206.4,
            "semi_minor" => 6356583.8,
            "Latitude of 1st standard parallel" => 44.0 + 11.0 / 60.0,
            "Latitude of 2nd standard parallel" => 45.0 + 42.0 / 60.0,
            "Latitude of false origin" => 43.0 + 19.0 / 60.0,
            "Longitude of false origin" => -84.0 - 20.0 / 60.0,
            "Easting at false origin" => 2000000.0 / R_US_FEET,
            "Northing at false origin" => 0.0 / R_US_FEET,
            "Ellipsoid scaling factor" => 1.0000382,
        ]),
        // Belge 1972 / Belge Lambert 72
        19902 => ("Lambert Conic Conformal (2SP Belgium)", values![
            "semi_major" => 6378388.0,
            "semi_minor" => 6378388.0 * (1.0 - 1.0 / 297.0),
            "Latitude of 1st standard parallel" => 49.0 + 50.0 / 60.0,
            "Latitude of 2nd standard parallel" => 51.0 + 10.0 / 60.0,
            "Latitude of false origin" => 90.0,
            "Longitude of false origin" => 4.0 + (21.0 + 24.983 / 60.0) / 60.0,
            "Easting at false origin" => 150000.01,
            "Northing at false origin" => 5400088.44,
        ]),
        // Europe Equal Area 2001
        19986 => ("Lambert Azimuthal Equal Area", values![
            "semi_major" => 6378137.0,
            "semi_minor" => 6378137.0 * (1.0 - 1.0 / 298.2572221),
            "Latitude of natural origin" => 52.0,
            "Longitude of natural origin" => 10.0,
            "False easting" => 4321000.00,
            "False northing" => 3210000.00,
        ]),
        // Universal Polar Stereographic North
        16061 => ("Polar Stereographic (variant A)", values![
            "semi_major" => 6378137.0,
            "semi_minor" => wgs84_b,
            "Latitude of natural origin" => 90.0,
            "Longitude of natural origin" => 0.0,
            "Scale factor at natural origin" => 0.994,
            "False easting" => 2000000.00,
            "False northing" => 2000000.00,
        ]),
        // Australian Antarctic Polar Stereographic
        19993 => ("Polar Stereographic (variant B)", values![
            "semi_major" => 6378137.0,
            "semi_minor" => wgs84_b,
            "Latitude of standard parallel" => -71.0,
            "Longitude of origin" => 70.0,
            "False easting" => 6000000.00,
            "False northing" => 6000000.00,
        ]),
        // Petrels 1972 / Terre Adelie Polar Stereographic
        19983 => ("Polar Stereographic (variant C)", values![
            "semi_major" => 6378388.0,
            "semi_minor" => 6378388.0 * (1.0 - 1.0 / 297.0),
            "Latitude of standard parallel" => -67.0,
            "Longitude of origin" => 140.0,
            "Easting at false origin" => 300000.00,
            "Northing at false origin" => 200000.00,
        ]),
        // RD New
        19914 => ("Oblique Stereographic", values![
            "semi_major" => 6377397.155,
            "semi_minor" => 6377397.155 * (1.0 - 1.0 / 299.15281),
            "Latitude of natural origin" => 52.0 + (9.0 + 22.178 / 60.0) / 60.0,
            "Longitude of natural origin" => 5.0 + (23.0 + 15.500 / 60.0) / 60.0,
            "Scale factor at natural origin" => 0.9999079,
            "False easting" => 155000.00,
            "False northing" => 463000.00,
        ]),
        // not an EPSG code
        9818 => ("Polyconic", values![
            "semi_major" => 6378206.4,
            "semi_minor" => 6356583.8,
            "Latitude of natural origin" => 0.0,
            "Longitude of natural origin" => 0.0,
            "False easting" => 0.0,
            "False northing" => 0.0,
        ]),
        // not an EPSG code
        9840 => ("Orthographic", values![
            "semi_major" => 6378137.0,
            "semi_minor" => wgs84_b,
            "Latitude of natural origin" => 55.0,
            "Longitude of natural origin" => 5.0,
            "False easting" => 0.0,
            "False northing" => 0.0,
        ]),
        // Guam 1963 / Yap Islands
        15399 => ("Modified Azimuthal Equidistant", values![
            "semi_major" => 6378206.4,
            "semi_minor" => 6356583.8,
            "Latitude of natural origin" => 9.0 + (32.0 + 48.15 / 60.0) / 60.0,
            "Longitude of natural origin" => 138.0 + (10.0 + 7.48 / 60.0) / 60.0,
            "False easting" => 40000.0,
            "False northing" => 60000.0,
        ]),
        // CRS S-JTSK (Ferro) / Krovak
        19952 => ("Krovak", values![
            "semi_major" => 6377397.155,
            "semi_minor" => 6377397.155 * (1.0 - 1.0 / 299.15281),
            "Latitude of projection centre" => 49.5,
            "Longitude of origin" => 24.0 + 50.0 / 60.0,
            "Co-latitude of cone axis" => 30.0 + (17.0 + 17.3031 / 60.0) / 60.0,
            "Latitude of pseudo standard parallel" => 78.5,
            "Scale factor on pseudo standard parallel" => 0.99990,
        ]),
        // not an EPSG code
        9605 => ("Abridged Molodensky", values![
            "dim" => 3,
            "src_semi_major" => 6378137.0,
            "src_semi_minor" => wgs84_b,
            "X-axis translation" => 84.87,
            "Y-axis translation" => 96.49,
            "Z-axis translation" => 116.95,
            "Semi-major axis length difference" => 251.0,
            "Flattening difference" => 1.41927E-05,
        ]),
        // topocentric example A
        15594 => ("Geographic/topocentric conversions", values![
            "semi_major" => 6378137.0,
            "semi_minor" => wgs84_b,
            "Latitude of topocentric origin" => 55.0,
            "Longitude of topocentric origin" => 5.0,
            "Ellipsoidal height of topocentric origin" => 200.0,
        ]),
        // topocentric example B
        15595 => ("Geocentric/topocentric conversions", values![
            "semi_major" => 6378137.0,
            "semi_minor" => wgs84_b,
            "Geocentric X of topocentric origin" => 3652755.3058,
            "Geocentric Y of topocentric origin" => 319574.6799,
            "Geocentric Z of topocentric origin" => 5201547.3536,
        ]),
        _ => return None,
    };
    Some(r)
}

/// Returns the codes known to [`create_parameters`].
pub fn operation_codes() -> &'static [u32] {
    &[
        19905, 19884, 3856, 310642901, 19958, 19916, 17529, 19975, 19878, 19910, 14204, 6198,
        19902, 19986, 16061, 19993, 19983, 19914, 9818, 9840, 15399, 19952, 9605, 15594, 15595,
    ]
}

/// Makes the parameters of the operation `code` with `factory`.
///
/// # Errors
///
/// If `code` is unknown, if the factory does not support the method
/// (an [`Unsupported`](crate::error::ErrorImpl::Unsupported) error, promoted to a
/// contract violation when the factory lists the method), or if the factory
/// rejects one of the values.
///
/// # Example
///
/// ```
/// # use geoconform::*;
/// # fn main() -> Result<()> {
/// let factory = DefaultMathTransformFactory::new();
/// let parameters = epsg::create_parameters(&factory, 19905)?;
/// assert_eq!(parameters.value("False easting")?.double_value()?, 3900000.0);
///
/// assert!(epsg::create_parameters(&factory, 19916).unwrap_err().is_skip());
/// # Ok(())}
/// ```
pub fn create_parameters<F>(factory: &F, code: u32) -> Result<ParameterValueGroup>
where
    F: MathTransformFactory + ?Sized,
{
    let (method, values) = operation(code)
        .ok_or_else(|| Error::new_configuration(format!("no operation for code EPSG:{code}")))?;
    let mut parameters = factory
        .default_parameters(method)
        .map_err(|e| promote(factory, method, e))?;
    for (name, value) in values {
        parameters.parameter(name)?.set_value(value)?;
    }
    Ok(parameters)
}

/// Makes the transform of the operation `code` with `factory`.
///
/// # Errors
///
/// As [`create_parameters`], and if the factory refuses the parameters.
pub fn create_transform<F>(factory: &F, code: u32) -> Result<Arc<dyn MathTransform>>
where
    F: MathTransformFactory + ?Sized,
{
    let parameters = create_parameters(factory, code)?;
    factory
        .create_parameterized_transform(&parameters)
        .map_err(|e| promote(factory, parameters.name(), e))
}

/// Turns the refusal of an advertised method into a failure.
pub(crate) fn promote<F>(factory: &F, method: &str, err: Error) -> Error
where
    F: MathTransformFactory + ?Sized,
{
    if !err.is_skip() {
        return err;
    }
    let method = method.trim();
    let advertised = factory
        .available_methods()
        .iter()
        .any(|m| m.trim().eq_ignore_ascii_case(method));
    if advertised {
        Error::new_contract_violation(format!(
            "the factory lists \"{method}\" as available but refuses it: {err}"
        ))
    } else {
        debug!("\"{method}\" is not supported, skipped");
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorImpl;
    use crate::factory::DefaultMathTransformFactory;
    use crate::Matrix;

    #[test]
    fn test_constants() {
        assert!((LINKS - 0.201168).abs() < 1e-15);
        assert!((1.0 / R_US_FEET - 0.3048006096).abs() < 1e-10);
    }

    #[test]
    fn test_all_codes() {
        for code in operation_codes() {
            assert!(operation(*code).is_some(), "{code}");
        }
        assert!(operation(4326).is_none());

        let factory = DefaultMathTransformFactory::new();
        assert!(matches!(
            create_parameters(&factory, 4326).unwrap_err().kind(),
            ErrorImpl::Configuration { .. }
        ));
    }

    #[test]
    fn test_mercator() {
        let factory = DefaultMathTransformFactory::new();

        // the method name carries a trailing space
        let parameters = create_parameters(&factory, 19884).unwrap();
        assert_eq!(parameters.name(), "Mercator (variant B)");

        let tr = create_transform(&factory, 3856).unwrap();
        let mut dst = [0.0; 2];
        tr.transform(&[-(100.0 + 20.0 / 60.0), 24.0 + (22.0 + 54.433 / 60.0) / 60.0], &mut dst)
            .unwrap();
        assert!((dst[0] - -11169055.58).abs() < 0.01);
        assert!((dst[1] - 2800000.00).abs() < 0.01);
    }

    #[derive(Debug)]
    struct Boastful(DefaultMathTransformFactory);

    impl MathTransformFactory for Boastful {
        fn available_methods(&self) -> Vec<&str> {
            let mut methods = self.0.available_methods();
            methods.push("Transverse Mercator");
            methods
        }

        fn default_parameters(&self, method: &str) -> Result<ParameterValueGroup> {
            self.0.default_parameters(method)
        }

        fn create_parameterized_transform(
            &self,
            parameters: &ParameterValueGroup,
        ) -> Result<Arc<dyn MathTransform>> {
            self.0.create_parameterized_transform(parameters)
        }

        fn create_affine_transform(&self, matrix: Matrix) -> Result<Arc<dyn MathTransform>> {
            self.0.create_affine_transform(matrix)
        }
    }

    #[test]
    fn test_promotion() {
        let honest = DefaultMathTransformFactory::new();
        assert!(create_transform(&honest, 19916).unwrap_err().is_skip());

        let boastful = Boastful(DefaultMathTransformFactory::new());
        let err = create_transform(&boastful, 19916).unwrap_err();
        assert!(!err.is_skip());
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }));
    }
}
