use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};
use std::sync::Arc;

use crate::matrix::Matrix;
use crate::transform::{check_point_dimensions, MathTransform, MathTransform2D};
use crate::{Error, Result};

const ITERATION_LIMIT: usize = 15;
const ITERATION_TOLERANCE: f64 = 1e-12;

/// The EPSG variants of the Mercator projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MercatorVariant {
    /// Mercator (variant A), a.k.a. Mercator (1SP): scale factor at the equator.
    A,
    /// Mercator (variant B), a.k.a. Mercator (2SP): standard parallel.
    B,
    /// Popular Visualisation Pseudo Mercator: spherical formulas on ellipsoidal coordinates.
    PseudoMercator,
}

impl MercatorVariant {
    /// Returns the EPSG method name.
    pub fn name(&self) -> &'static str {
        match self {
            MercatorVariant::A => "Mercator (variant A)",
            MercatorVariant::B => "Mercator (variant B)",
            MercatorVariant::PseudoMercator => "Popular Visualisation Pseudo Mercator",
        }
    }
}

/// Mercator projection from (longitude, latitude) in degrees to (easting, northing) in metres.
///
/// # Example
///
/// ```
/// # use geoconform::*;
/// # fn main() -> Result<()> {
/// // EPSG:3002 Makassar / NEIEZ
/// let a = 6377397.155;
/// let tr = Mercator::variant_a(a, a * (1.0 - 1.0 / 299.1528128), 110.0, 0.997, 3900000.0, 900000.0)?;
///
/// let mut dst = [0.0; 2];
/// tr.transform(&[120.0, -3.0], &mut dst)?;
/// assert!((dst[0] - 5009726.58).abs() < 0.01);
/// assert!((dst[1] - 569150.82).abs() < 0.01);
/// # Ok(())}
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Mercator {
    variant: MercatorVariant,
    semi_major: f64,
    semi_minor: f64,
    /// Longitude of natural origin \[deg\]
    central_meridian: f64,
    /// Scale factor at natural origin, derived from the standard parallel for variant B
    scale_factor: f64,
    /// Latitude of 1st standard parallel \[deg\], variant B only
    standard_parallel: f64,
    false_easting: f64,
    false_northing: f64,
    eccentricity: f64,
}

impl Mercator {
    /// Makes a Mercator (variant A) projection.
    ///
    /// # Errors
    ///
    /// If the ellipsoid axes or the scale factor are not positive.
    pub fn variant_a(
        semi_major: f64,
        semi_minor: f64,
        central_meridian: f64,
        scale_factor: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self> {
        if !(scale_factor > 0.0) {
            return Err(Error::new_invalid_parameter(
                "Scale factor at natural origin",
                format!("{scale_factor} is not strictly positive"),
            ));
        }
        Self::build(
            MercatorVariant::A,
            semi_major,
            semi_minor,
            central_meridian,
            scale_factor,
            0.0,
            false_easting,
            false_northing,
        )
    }

    /// Makes a Mercator (variant B) projection.
    ///
    /// The scale factor is `cos φ₁ / √(1 − e² sin² φ₁)`.
    ///
    /// # Errors
    ///
    /// If the ellipsoid axes are not positive or `|φ₁| >= 90°`.
    pub fn variant_b(
        semi_major: f64,
        semi_minor: f64,
        standard_parallel: f64,
        central_meridian: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self> {
        if !(standard_parallel.abs() < 90.0) {
            return Err(Error::new_invalid_parameter(
                "Latitude of 1st standard parallel",
                format!("{standard_parallel} is not in the open range (-90, 90)"),
            ));
        }
        let e2 = eccentricity_squared(semi_major, semi_minor);
        let sin = standard_parallel.to_radians().sin();
        let scale_factor = standard_parallel.to_radians().cos() / (1.0 - e2 * sin * sin).sqrt();
        Self::build(
            MercatorVariant::B,
            semi_major,
            semi_minor,
            central_meridian,
            scale_factor,
            standard_parallel,
            false_easting,
            false_northing,
        )
    }

    /// Makes a Popular Visualisation Pseudo Mercator projection.
    ///
    /// Only the semi-major axis is used by the formulas.
    ///
    /// # Errors
    ///
    /// If the ellipsoid axes are not positive.
    pub fn pseudo(
        semi_major: f64,
        semi_minor: f64,
        central_meridian: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self> {
        let mut tr = Self::build(
            MercatorVariant::PseudoMercator,
            semi_major,
            semi_minor,
            central_meridian,
            1.0,
            0.0,
            false_easting,
            false_northing,
        )?;
        tr.eccentricity = 0.0;
        Ok(tr)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        variant: MercatorVariant,
        semi_major: f64,
        semi_minor: f64,
        central_meridian: f64,
        scale_factor: f64,
        standard_parallel: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Result<Self> {
        if !(semi_major > 0.0) {
            return Err(Error::new_invalid_parameter(
                "semi_major",
                format!("{semi_major} is not strictly positive"),
            ));
        }
        if !(semi_minor > 0.0 && semi_minor <= semi_major) {
            return Err(Error::new_invalid_parameter(
                "semi_minor",
                format!("{semi_minor} is not in the range (0, {semi_major}]"),
            ));
        }
        Ok(Self {
            variant,
            semi_major,
            semi_minor,
            central_meridian,
            scale_factor,
            standard_parallel,
            false_easting,
            false_northing,
            eccentricity: eccentricity_squared(semi_major, semi_minor).sqrt(),
        })
    }

    #[inline]
    pub fn variant(&self) -> MercatorVariant {
        self.variant
    }

    /// Returns the scale factor at the equator.
    #[inline]
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    #[inline]
    fn radius(&self) -> f64 {
        self.semi_major * self.scale_factor
    }

    /// ∂N/∂φ with φ in degrees.
    fn northing_rate(&self, phi: f64) -> f64 {
        let e2 = self.eccentricity * self.eccentricity;
        let sin = phi.sin();
        self.radius() * (1.0 - e2) / ((1.0 - e2 * sin * sin) * phi.cos()) * (1.0f64).to_radians()
    }

    fn latitude_from_northing(&self, northing: f64) -> Result<f64> {
        let t = ((self.false_northing - northing) / self.radius()).exp();
        let e = self.eccentricity;
        let half_e = e / 2.0;
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        if e == 0.0 || !phi.is_finite() {
            return Ok(phi);
        }
        for _ in 0..ITERATION_LIMIT {
            let esin = e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - esin) / (1.0 + esin)).powf(half_e)).atan();
            let delta = (next - phi).abs();
            phi = next;
            if delta <= ITERATION_TOLERANCE {
                return Ok(phi);
            }
        }
        Err(Error::new_not_convergent(ITERATION_TOLERANCE, ITERATION_LIMIT))
    }
}

fn eccentricity_squared(a: f64, b: f64) -> f64 {
    let f = (a - b) / a;
    f * (2.0 - f)
}

impl MathTransform for Mercator {
    fn source_dimensions(&self) -> usize {
        2
    }

    fn target_dimensions(&self) -> usize {
        2
    }

    fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
        check_point_dimensions(self, src, dst)?;
        let lambda = (src[0] - self.central_meridian).to_radians();
        let phi = src[1].to_radians();
        let e = self.eccentricity;
        let esin = e * phi.sin();
        let y = (FRAC_PI_4 + phi / 2.0).tan() * ((1.0 - esin) / (1.0 + esin)).powf(e / 2.0);
        dst[0] = self.false_easting + self.radius() * lambda;
        dst[1] = self.false_northing + self.radius() * y.ln();
        Ok(())
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>> {
        Ok(Arc::new(InverseMercator(self.clone())))
    }

    fn derivative(&self, point: &[f64]) -> Result<Matrix> {
        if point.len() != 2 {
            return Err(Error::new_contract_violation("Mercator derivative needs a 2D point"));
        }
        self.derivative_point(point[0], point[1])
    }

    fn as_2d(&self) -> Option<&dyn MathTransform2D> {
        Some(self)
    }

    fn to_wkt(&self) -> Option<String> {
        let mut s = format!(
            "PARAM_MT[\"{}\", PARAMETER[\"semi_major\", {}], PARAMETER[\"semi_minor\", {}]",
            self.variant.name(),
            self.semi_major,
            self.semi_minor
        );
        match self.variant {
            MercatorVariant::A => s.push_str(&format!(
                ", PARAMETER[\"Scale factor at natural origin\", {}]",
                self.scale_factor
            )),
            MercatorVariant::B => s.push_str(&format!(
                ", PARAMETER[\"Latitude of 1st standard parallel\", {}]",
                self.standard_parallel
            )),
            MercatorVariant::PseudoMercator => {}
        }
        s.push_str(&format!(
            ", PARAMETER[\"Longitude of natural origin\", {}], PARAMETER[\"False easting\", {}], PARAMETER[\"False northing\", {}]]",
            self.central_meridian, self.false_easting, self.false_northing
        ));
        Some(s)
    }
}

impl MathTransform2D for Mercator {
    fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut dst = [0.0; 2];
        self.transform(&[x, y], &mut dst)?;
        Ok((dst[0], dst[1]))
    }

    fn derivative_point(&self, _x: f64, y: f64) -> Result<Matrix> {
        let mut m = Matrix::zeros(2, 2);
        m.set(0, 0, self.radius() * (1.0f64).to_radians());
        m.set(1, 1, self.northing_rate(y.to_radians()));
        Ok(m)
    }
}

/// Inverse of [`Mercator`], from (easting, northing) to (longitude, latitude).
#[derive(Debug, Clone, PartialEq)]
pub struct InverseMercator(Mercator);

impl MathTransform for InverseMercator {
    fn source_dimensions(&self) -> usize {
        2
    }

    fn target_dimensions(&self) -> usize {
        2
    }

    fn transform(&self, src: &[f64], dst: &mut [f64]) -> Result<()> {
        check_point_dimensions(self, src, dst)?;
        let p = &self.0;
        let lambda = (src[0] - p.false_easting) / p.radius();
        let phi = p.latitude_from_northing(src[1])?;
        dst[0] = lambda.to_degrees() + p.central_meridian;
        dst[1] = phi.to_degrees();
        Ok(())
    }

    fn inverse(&self) -> Result<Arc<dyn MathTransform>> {
        Ok(Arc::new(self.0.clone()))
    }

    fn derivative(&self, point: &[f64]) -> Result<Matrix> {
        if point.len() != 2 {
            return Err(Error::new_contract_violation("Mercator derivative needs a 2D point"));
        }
        self.derivative_point(point[0], point[1])
    }

    fn as_2d(&self) -> Option<&dyn MathTransform2D> {
        Some(self)
    }

    fn to_wkt(&self) -> Option<String> {
        self.0.to_wkt().map(|s| format!("INVERSE_MT[{s}]"))
    }
}

impl MathTransform2D for InverseMercator {
    fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mut dst = [0.0; 2];
        self.transform(&[x, y], &mut dst)?;
        Ok((dst[0], dst[1]))
    }

    fn derivative_point(&self, _x: f64, y: f64) -> Result<Matrix> {
        let p = &self.0;
        let phi = p.latitude_from_northing(y)?;
        let mut m = Matrix::zeros(2, 2);
        m.set(0, 0, 1.0 / (p.radius() * (1.0f64).to_radians()));
        m.set(1, 1, 1.0 / p.northing_rate(phi));
        Ok(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn makassar() -> Mercator {
        let a = 6377397.155;
        Mercator::variant_a(a, a * (1.0 - 1.0 / 299.1528128), 110.0, 0.997, 3900000.0, 900000.0)
            .unwrap()
    }

    fn assert_close(actual: (f64, f64), expected: (f64, f64), tolerance: f64) {
        assert!(
            (actual.0 - expected.0).abs() <= tolerance && (actual.1 - expected.1).abs() <= tolerance,
            "{actual:?} != {expected:?}"
        );
    }

    #[test]
    fn test_variant_a() {
        let tr = makassar();
        assert_close(tr.transform_point(120.0, -3.0).unwrap(), (5009726.58, 569150.82), 0.01);
        assert_close(tr.transform_point(110.0, 0.0).unwrap(), (3900000.0, 900000.0), 1e-9);
        assert!(Mercator::variant_a(1.0, 1.0, 0.0, 0.0, 0.0, 0.0).is_err());
        assert!(Mercator::variant_a(1.0, 2.0, 0.0, 1.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_variant_b() {
        // EPSG:3388 Pulkovo 1942 / Caspian Sea Mercator
        let a = 6378245.0;
        let tr = Mercator::variant_b(a, a * (1.0 - 1.0 / 298.3), 42.0, 51.0, 0.0, 0.0).unwrap();
        assert!((tr.scale_factor() - 0.744260894).abs() < 1e-9);
        assert_close(tr.transform_point(53.0, 53.0).unwrap(), (165704.29, 5171848.07), 0.01);
        assert!(Mercator::variant_b(a, a, 90.0, 0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_pseudo() {
        // EPSG:3857 WGS 84 / Pseudo-Mercator
        let a = 6378137.0;
        let tr = Mercator::pseudo(a, a * (1.0 - 1.0 / 298.257223563), 0.0, 0.0, 0.0).unwrap();
        let lon = -(100.0 + 20.0 / 60.0);
        let lat = 24.0 + (22.0 + 54.433 / 60.0) / 60.0;
        assert_close(tr.transform_point(lon, lat).unwrap(), (-11169055.58, 2800000.00), 0.01);
    }

    #[test]
    fn test_inverse() {
        let tr = makassar();
        let inv = tr.inverse().unwrap();
        let mut back = [0.0; 2];
        inv.transform(&[5009726.58, 569150.82], &mut back).unwrap();
        assert_close((back[0], back[1]), (120.0, -3.0), 1e-6);

        let twice = inv.inverse().unwrap();
        let mut dst = [0.0; 2];
        twice.transform(&[120.0, -3.0], &mut dst).unwrap();
        assert_close((dst[0], dst[1]), (5009726.58, 569150.82), 0.01);
    }

    #[test]
    fn test_derivative() {
        let tr = makassar();
        let d = tr.derivative(&[115.0, 30.0]).unwrap();
        let delta = 1e-4;
        let (e1, n1) = tr.transform_point(115.0 - delta / 2.0, 30.0 - delta / 2.0).unwrap();
        let (e2, n2) = tr.transform_point(115.0 + delta / 2.0, 30.0 + delta / 2.0).unwrap();
        assert!(((e2 - e1) / delta - d.get(0, 0)).abs() < 1e-3);
        assert!(((n2 - n1) / delta - d.get(1, 1)).abs() < 1e-1);
        assert_eq!(d.get(0, 1), 0.0);
        assert_eq!(d.get(1, 0), 0.0);

        let (e, n) = tr.transform_point(115.0, 30.0).unwrap();
        let inv = tr.inverse().unwrap().derivative(&[e, n]).unwrap();
        assert!((d.multiply(&inv).unwrap().get(1, 1) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_wkt() {
        assert!(makassar()
            .to_wkt()
            .unwrap()
            .starts_with("PARAM_MT[\"Mercator (variant A)\", PARAMETER[\"semi_major\", 6377397.155]"));
    }
}
