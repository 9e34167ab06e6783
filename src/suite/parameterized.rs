use std::sync::Arc;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Configuration, ImplementationDetails, Key};
use crate::parameter::ParameterValueGroup;
use crate::sample::SamplePoints;
use crate::tolerance::{self, CalculationType, SharedModifier, NAUTICAL_MILE};
use crate::validate::{Validatable, Validators};
use crate::{epsg, MathTransform, MathTransformFactory, Result, TransformTestCase};

use super::{Outcome, Settings};

/// Smallest tolerance of the projection tests, in metres.
pub const TRANSFORM_TOLERANCE: f64 = 0.01;

/// Default finite-difference step, in metres on the ground.
pub const DERIVATIVE_DELTA: f64 = 100.0;

/// Number of cells per axis when sampling an area of validity.
const CELLS: usize = 20;

/// Number of cells per axis when sampling a three-dimensional domain.
const CELLS_3D: usize = 10;

/// Tests of the map projections and datum shifts made by a factory from EPSG parameters.
///
/// Each test makes the transform of one EPSG example, compares it with the
/// published sample points, then checks it over its area of validity. A
/// method the factory does not know is a skip; a method the factory lists
/// in [`available_methods`](MathTransformFactory::available_methods) but
/// refuses is a failure.
///
/// ```
/// # use geoconform::*;
/// # use geoconform::suite::{Outcome, ParameterizedTransformTest};
/// let factory = DefaultMathTransformFactory::new();
/// let suite = ParameterizedTransformTest::new(&factory);
///
/// suite.test_mercator_1sp().unwrap();
/// assert!(suite.test_krovak().unwrap_err().is_skip());
/// ```
#[derive(Debug)]
pub struct ParameterizedTransformTest<'a, F: MathTransformFactory + ?Sized> {
    factory: &'a F,
    settings: Settings,
    tolerance: f64,
    tolerance_modifier: Option<SharedModifier>,
    unit_conversion: Option<SharedModifier>,
    derivative_deltas: Option<Vec<f64>>,
    seed: u64,
}

impl<'a, F: MathTransformFactory + ?Sized> ParameterizedTransformTest<'a, F> {
    pub fn new(factory: &'a F) -> Self {
        Self {
            factory,
            settings: Settings::default(),
            tolerance: TRANSFORM_TOLERANCE,
            tolerance_modifier: None,
            unit_conversion: None,
            derivative_deltas: None,
            seed: 0,
        }
    }

    pub fn enable(&mut self, key: Key, enabled: bool) -> &mut Self {
        self.settings.enable(key, enabled);
        self
    }

    pub fn implementation_details(&mut self, details: Arc<dyn ImplementationDetails>) -> &mut Self {
        self.settings.add_details(details);
        self
    }

    /// Sets the tolerance; anything below [`TRANSFORM_TOLERANCE`] is raised to it.
    pub fn set_tolerance(&mut self, tolerance: f64) -> &mut Self {
        self.tolerance = tolerance;
        self
    }

    /// Replaces the modifier each test would choose.
    pub fn set_tolerance_modifier(&mut self, modifier: Option<SharedModifier>) -> &mut Self {
        self.tolerance_modifier = modifier;
        self
    }

    /// Replaces the default deltas of [`DERIVATIVE_DELTA`] metres, converted to degrees.
    pub fn set_derivative_deltas(&mut self, deltas: Option<Vec<f64>>) -> &mut Self {
        self.derivative_deltas = deltas;
        self
    }

    /// Sets the seed of the points sampled in the areas of validity.
    pub fn set_seed(&mut self, seed: u64) -> &mut Self {
        self.seed = seed;
        self
    }

    /// Multiplies `coordinates` by `scale` and scales the tolerances of `mode` alike.
    ///
    /// Used when the tested CRS has other units than the sample points, e.g.
    /// [`CalculationType::DirectTransform`] with `1 / FEET` for projected
    /// coordinates in feet.
    ///
    /// # Errors
    ///
    /// If `scale` is negative or NaN.
    pub fn apply_unit_conversion(
        &mut self,
        mode: CalculationType,
        coordinates: &mut [f64],
        scale: f64,
    ) -> Result<()> {
        let modifier = tolerance::scale(&[mode], &[scale, scale])?;
        for c in coordinates.iter_mut() {
            *c *= scale;
        }
        self.unit_conversion = tolerance::concatenate(self.unit_conversion.take(), modifier);
        Ok(())
    }

    /// Reports the effective flags.
    pub fn configuration(&self) -> Configuration {
        self.settings.configuration()
    }

    /// Runs every test.
    pub fn run_all(&self) -> Vec<(&'static str, Outcome)> {
        let tests: [(&'static str, fn(&Self) -> Result<()>); 28] = [
            ("Mercator (1SP)", Self::test_mercator_1sp),
            ("Mercator (2SP)", Self::test_mercator_2sp),
            ("Mercator (variant C)", Self::test_mercator_variant_c),
            ("Mercator (Spherical)", Self::test_mercator_spherical),
            ("Pseudo Mercator", Self::test_pseudo_mercator),
            ("Miller", Self::test_miller),
            ("Hotine Oblique Mercator", Self::test_hotine_oblique_mercator),
            ("Transverse Mercator", Self::test_transverse_mercator),
            ("Transverse Mercator (South Orientated)", Self::test_transverse_mercator_south_orientated),
            ("Cassini-Soldner", Self::test_cassini_soldner),
            ("Hyperbolic Cassini-Soldner", Self::test_hyperbolic_cassini_soldner),
            ("Lambert Conic Conformal (1SP)", Self::test_lambert_conic_conformal_1sp),
            ("Lambert Conic Conformal (2SP)", Self::test_lambert_conic_conformal_2sp),
            ("Lambert Conic Conformal (Belgium)", Self::test_lambert_conic_conformal_belgium),
            ("Lambert Conic Conformal (Michigan)", Self::test_lambert_conic_conformal_michigan),
            ("Lambert Azimuthal Equal Area", Self::test_lambert_azimuthal_equal_area),
            ("Polar Stereographic (variant A)", Self::test_polar_stereographic_a),
            ("Polar Stereographic (variant B)", Self::test_polar_stereographic_b),
            ("Polar Stereographic (variant C)", Self::test_polar_stereographic_c),
            ("Oblique Stereographic", Self::test_oblique_stereographic),
            ("Polyconic", Self::test_polyconic),
            ("Krovak", Self::test_krovak),
            ("Orthographic", Self::test_orthographic),
            ("Modified Azimuthal Equidistant", Self::test_modified_azimuthal_equidistant),
            ("Abridged Molodensky", Self::test_abridged_molodensky),
            ("Geographic/topocentric", Self::test_geographic_topocentric),
            ("Geocentric/topocentric", Self::test_geocentric_topocentric),
            ("Mercator (1SP) parameters", Self::test_parameters),
        ];
        tests
            .into_iter()
            .map(|(name, test)| (name, Outcome::from(test(self))))
            .collect()
    }

    /// Makassar / NEIEZ, EPSG:3002.
    pub fn test_mercator_1sp(&self) -> Result<()> {
        self.projection_test("Makassar / NEIEZ", 3002, TRANSFORM_TOLERANCE)
    }

    /// Pulkovo 1942 / Caspian Sea Mercator, EPSG:3388.
    pub fn test_mercator_2sp(&self) -> Result<()> {
        self.projection_test("Pulkovo 1942 / Caspian Sea Mercator", 3388, TRANSFORM_TOLERANCE)
    }

    /// The Caspian Sea example with a false origin at 42°N.
    pub fn test_mercator_variant_c(&self) -> Result<()> {
        let mut sample = SamplePoints::for_crs(3388)?;
        sample.set_target_ordinate(0, 1, 1351950.22)?;
        sample.set_source_ordinate(1, 1, 42.0)?;

        let mut parameters = self.default_parameters("Mercator (variant C)")?;
        parameters.parameter("semi_major")?.set_value(6378245.0)?;
        parameters.parameter("semi_minor")?.set_value(6378245.0 * (1.0 - 1.0 / 298.3))?;
        parameters.parameter("Latitude of 1st standard parallel")?.set_value(42.0)?;
        parameters.parameter("Longitude of natural origin")?.set_value(51.0)?;
        parameters.parameter("Latitude of false origin")?.set_value(42.0)?;
        Validators::validate(&parameters)?;

        let transform = self.create_transform(&parameters)?;
        self.verify_projection("Pulkovo 1942 / Caspian Sea Mercator", transform, &sample, TRANSFORM_TOLERANCE)
    }

    /// World Spherical Mercator on the Pseudo-Mercator example.
    pub fn test_mercator_spherical(&self) -> Result<()> {
        let mut sample = SamplePoints::for_crs(3857)?;
        sample.set_target_ordinate(0, 0, -11156569.90)?;
        sample.set_target_ordinate(0, 1, 2796869.94)?;

        let mut parameters = self.default_parameters("Mercator (Spherical)")?;
        parameters.parameter("semi_major")?.set_value(6371007.0)?;
        parameters.parameter("semi_minor")?.set_value(6371007.0)?;
        Validators::validate(&parameters)?;

        let transform = self.create_transform(&parameters)?;
        self.verify_projection("World Spherical Mercator", transform, &sample, TRANSFORM_TOLERANCE)
    }

    /// WGS 84 / Pseudo-Mercator, EPSG:3857.
    pub fn test_pseudo_mercator(&self) -> Result<()> {
        self.projection_test("WGS 84 / Pseudo-Mercator", 3857, TRANSFORM_TOLERANCE)
    }

    pub fn test_miller(&self) -> Result<()> {
        self.projection_test("IGNF:MILLER", 310642901, TRANSFORM_TOLERANCE)
    }

    pub fn test_hotine_oblique_mercator(&self) -> Result<()> {
        self.projection_test("Timbalai 1948 / RSO Borneo (m)", 29873, TRANSFORM_TOLERANCE)
    }

    pub fn test_transverse_mercator(&self) -> Result<()> {
        self.projection_test("OSGB 1936 / British National Grid", 27700, TRANSFORM_TOLERANCE)
    }

    /// Hartebeesthoek94 / Lo29.
    ///
    /// Implementations may flip the axes in the transform or leave it to the
    /// CRS; the expected values follow the direction of the transform.
    pub fn test_transverse_mercator_south_orientated(&self) -> Result<()> {
        let mut sample = SamplePoints::for_crs(2053)?;
        let transform = self.create_sample_transform(&sample)?;
        let test = self.test_case("Hartebeesthoek94 / Lo29", transform, Some(tolerance::projection(0, 1)?), TRANSFORM_TOLERANCE)?;

        let mut check = [0.0; 2];
        test.require_transform()?.transform(&[-0.5, -0.5], &mut check)?;
        if check[1] < 0.0 {
            debug!("south orientated axes are in the transform");
            sample.flip_target();
        }
        test.verify_transform(sample.source_points(), sample.target_points())?;
        self.verify_in_domain_of_validity(&test, &sample)
    }

    pub fn test_cassini_soldner(&self) -> Result<()> {
        self.projection_test("Trinidad 1903 / Trinidad Grid", 2314, TRANSFORM_TOLERANCE)
    }

    pub fn test_hyperbolic_cassini_soldner(&self) -> Result<()> {
        self.projection_test("Vanua Levu 1915 / Vanua Levu Grid", 3139, TRANSFORM_TOLERANCE)
    }

    pub fn test_lambert_conic_conformal_1sp(&self) -> Result<()> {
        self.projection_test("JAD69 / Jamaica National Grid", 24200, TRANSFORM_TOLERANCE)
    }

    pub fn test_lambert_conic_conformal_2sp(&self) -> Result<()> {
        self.projection_test("NAD27 / Texas South Central", 32040, TRANSFORM_TOLERANCE)
    }

    pub fn test_lambert_conic_conformal_belgium(&self) -> Result<()> {
        self.projection_test("Belge 1972 / Belge Lambert 72", 31300, TRANSFORM_TOLERANCE)
    }

    pub fn test_lambert_conic_conformal_michigan(&self) -> Result<()> {
        self.projection_test("NAD27 / Michigan Central", 6201, TRANSFORM_TOLERANCE)
    }

    pub fn test_lambert_azimuthal_equal_area(&self) -> Result<()> {
        self.projection_test("ETRS89 / LAEA Europe", 3035, TRANSFORM_TOLERANCE)
    }

    pub fn test_polar_stereographic_a(&self) -> Result<()> {
        self.projection_test("WGS 84 / UPS North (E,N)", 5041, TRANSFORM_TOLERANCE)
    }

    pub fn test_polar_stereographic_b(&self) -> Result<()> {
        self.projection_test("WGS 84 / Australian Antarctic Polar Stereographic", 3032, TRANSFORM_TOLERANCE)
    }

    pub fn test_polar_stereographic_c(&self) -> Result<()> {
        self.projection_test("Petrels 1972 / Terre Adelie Polar Stereographic", 2985, TRANSFORM_TOLERANCE)
    }

    pub fn test_oblique_stereographic(&self) -> Result<()> {
        self.projection_test("Amersfoort / RD New", 28992, TRANSFORM_TOLERANCE)
    }

    /// American Polyconic; the sample points are accurate to one metre only.
    pub fn test_polyconic(&self) -> Result<()> {
        self.projection_test("American Polyconic", 9818, 0.5)
    }

    pub fn test_krovak(&self) -> Result<()> {
        self.projection_test("CRS S-JTSK (Ferro) / Krovak", 2065, TRANSFORM_TOLERANCE)
    }

    pub fn test_orthographic(&self) -> Result<()> {
        self.projection_test("Orthographic", 9840, TRANSFORM_TOLERANCE)
    }

    pub fn test_modified_azimuthal_equidistant(&self) -> Result<()> {
        self.projection_test("Guam 1963 / Yap Islands", 3295, TRANSFORM_TOLERANCE)
    }

    /// WGS 84 to ED50, to 0.001″ of arc.
    pub fn test_abridged_molodensky(&self) -> Result<()> {
        let sample = SamplePoints::for_crs(4230)?;
        let transform = self.create_sample_transform(&sample)?;
        let test = self.test_case(
            "WGS 84 to ED50",
            transform,
            Some(tolerance::geographic(0, 1)?),
            0.001 * (NAUTICAL_MILE / 60.0),
        )?;
        test.verify_transform(sample.source_points(), sample.target_points())?;
        self.verify_in_domain_3d(&test, &sample, -1000.0, 1000.0)
    }

    pub fn test_geographic_topocentric(&self) -> Result<()> {
        let sample = SamplePoints::for_crs(5819)?;
        let transform = self.create_sample_transform(&sample)?;
        let test = self.test_case("EPSG topocentric example A", transform, None, TRANSFORM_TOLERANCE)?;
        test.verify_transform(sample.source_points(), sample.target_points())?;
        self.verify_in_domain_3d(&test, &sample, -100.0, 100.0)
    }

    pub fn test_geocentric_topocentric(&self) -> Result<()> {
        let sample = SamplePoints::for_crs(5820)?;
        let transform = self.create_sample_transform(&sample)?;
        let test = self.test_case("EPSG topocentric example B", transform, None, TRANSFORM_TOLERANCE)?;
        test.verify_transform(sample.source_points(), sample.target_points())?;
        self.verify_in_domain_3d(&test, &sample, 5000000.0, 5200000.0)
    }

    /// Checks the parameters of EPSG:19905 read back as they were set.
    pub fn test_parameters(&self) -> Result<()> {
        let parameters = epsg::create_parameters(self.factory, 19905)?;
        Validators::validate(&parameters)?;
        for (name, expected) in [
            ("Longitude of natural origin", 110.0),
            ("Scale factor at natural origin", 0.997),
            ("False easting", 3900000.0),
            ("False northing", 900000.0),
        ] {
            let actual = parameters.value(name)?.double_value()?;
            if actual != expected {
                return Err(crate::Error::new_contract_violation(format!(
                    "parameter \"{name}\" is {actual}, expected {expected}"
                )));
            }
        }
        Ok(())
    }

    fn projection_test(&self, description: &str, crs: u32, min_tolerance: f64) -> Result<()> {
        let sample = SamplePoints::for_crs(crs)?;
        let transform = self.create_sample_transform(&sample)?;
        self.verify_projection(description, transform, &sample, min_tolerance)
    }

    fn verify_projection(
        &self,
        description: &str,
        transform: Arc<dyn MathTransform>,
        sample: &SamplePoints,
        min_tolerance: f64,
    ) -> Result<()> {
        let test = self.test_case(description, transform, Some(tolerance::projection(0, 1)?), min_tolerance)?;
        test.verify_transform(sample.source_points(), sample.target_points())?;
        self.verify_in_domain_of_validity(&test, sample)
    }

    fn default_parameters(&self, method: &str) -> Result<ParameterValueGroup> {
        self.factory
            .default_parameters(method)
            .map_err(|e| epsg::promote(self.factory, method, e))
    }

    /// Makes the transform of the operation of `sample`.
    fn create_sample_transform(&self, sample: &SamplePoints) -> Result<Arc<dyn MathTransform>> {
        let parameters = epsg::create_parameters(self.factory, sample.operation())?;
        Validators::validate(&parameters)?;
        self.create_transform(&parameters)
    }

    fn create_transform(&self, parameters: &ParameterValueGroup) -> Result<Arc<dyn MathTransform>> {
        let transform = self
            .factory
            .create_parameterized_transform(parameters)
            .map_err(|e| epsg::promote(self.factory, parameters.name(), e))?;
        Validators::validate(Validatable::MathTransform(transform.as_ref()))?;
        Ok(transform)
    }

    /// Makes the test case of one transform.
    ///
    /// The suite's modifier wins over `default_modifier`; unit conversions
    /// apply after either.
    fn test_case(
        &self,
        description: &str,
        transform: Arc<dyn MathTransform>,
        default_modifier: Option<SharedModifier>,
        min_tolerance: f64,
    ) -> Result<TransformTestCase> {
        let mut tolerance = if self.tolerance >= min_tolerance {
            self.tolerance
        } else {
            min_tolerance
        };
        if !(tolerance >= TRANSFORM_TOLERANCE) {
            tolerance = TRANSFORM_TOLERANCE;
        }
        let deltas = self.derivative_deltas.clone().unwrap_or_else(|| {
            vec![DERIVATIVE_DELTA / (60.0 * NAUTICAL_MILE); transform.source_dimensions()]
        });
        let modifier = tolerance::concatenate(
            self.tolerance_modifier.clone().or(default_modifier),
            self.unit_conversion.clone(),
        );

        let mut builder = self
            .settings
            .builder()
            .transform(transform)
            .tolerance(tolerance)
            .derivative_deltas(deltas)
            .description(description.to_string());
        if let Some(modifier) = modifier {
            builder = builder.tolerance_modifier(modifier);
        }
        builder.build()
    }

    fn rng(&self, sample: &SamplePoints) -> StdRng {
        StdRng::seed_from_u64(self.seed.wrapping_add(u64::from(sample.crs())))
    }

    fn verify_in_domain_of_validity(&self, test: &TransformTestCase, sample: &SamplePoints) -> Result<()> {
        let area = sample.area_of_validity();
        let mut rng = self.rng(sample);
        test.verify_in_domain(
            &[area.min_x, area.min_y],
            &[area.max_x, area.max_y],
            &[CELLS, CELLS],
            Some(&mut rng),
        )?;
        Ok(())
    }

    fn verify_in_domain_3d(&self, test: &TransformTestCase, sample: &SamplePoints, zmin: f64, zmax: f64) -> Result<()> {
        let area = sample.area_of_validity();
        let mut rng = self.rng(sample);
        test.verify_in_domain(
            &[area.min_x, area.min_y, zmin],
            &[area.max_x, area.max_y, zmax],
            &[CELLS_3D, CELLS_3D, CELLS_3D],
            Some(&mut rng),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorImpl;
    use crate::DefaultMathTransformFactory;

    /// Lists "Transverse Mercator" without supporting it.
    #[derive(Debug)]
    struct Boasting(DefaultMathTransformFactory);

    impl MathTransformFactory for Boasting {
        fn available_methods(&self) -> Vec<&str> {
            let mut methods = self.0.available_methods();
            methods.push("Transverse Mercator");
            methods
        }

        fn default_parameters(&self, method: &str) -> Result<ParameterValueGroup> {
            self.0.default_parameters(method)
        }

        fn create_parameterized_transform(&self, parameters: &ParameterValueGroup) -> Result<Arc<dyn MathTransform>> {
            self.0.create_parameterized_transform(parameters)
        }
    }

    #[test]
    fn test_mercator() {
        let _ = env_logger::builder().is_test(true).try_init();

        let factory = DefaultMathTransformFactory::new();
        let suite = ParameterizedTransformTest::new(&factory);
        suite.test_mercator_1sp().unwrap();
        suite.test_mercator_2sp().unwrap();
        suite.test_mercator_spherical().unwrap();
        suite.test_pseudo_mercator().unwrap();
        suite.test_parameters().unwrap();
    }

    #[test]
    fn test_run_all() {
        let factory = DefaultMathTransformFactory::new();
        let suite = ParameterizedTransformTest::new(&factory);
        let outcomes = suite.run_all();
        assert_eq!(outcomes.len(), 28);
        for (name, outcome) in &outcomes {
            assert!(!outcome.is_failure(), "{name}: {outcome}");
        }
        let passed: Vec<&str> = outcomes
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::Passed))
            .map(|(n, _)| *n)
            .collect();
        assert_eq!(
            passed,
            vec![
                "Mercator (1SP)",
                "Mercator (2SP)",
                "Mercator (Spherical)",
                "Pseudo Mercator",
                "Mercator (1SP) parameters"
            ]
        );
    }

    #[test]
    fn test_advertised_but_refused() {
        let factory = Boasting(DefaultMathTransformFactory::new());
        let suite = ParameterizedTransformTest::new(&factory);
        let err = suite.test_transverse_mercator().unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::ContractViolation { .. }), "{err}");
        assert!(suite.test_cassini_soldner().unwrap_err().is_skip());
    }

    #[test]
    fn test_wrong_tolerance() {
        let factory = DefaultMathTransformFactory::new();
        let mut suite = ParameterizedTransformTest::new(&factory);

        // no tolerance at all on eastings
        let exact = tolerance::scale(&[CalculationType::DirectTransform], &[0.0]).unwrap();
        suite.set_tolerance(f64::NAN).set_tolerance_modifier(exact);
        let err = suite.test_mercator_1sp().unwrap_err();
        match err.kind() {
            ErrorImpl::TransformFailure(f) => {
                assert_eq!(f.message, "Unexpected transform result.");
                assert_eq!((f.point, f.ordinate), (0, 0));
                assert_eq!(f.tolerance, 0.0);
            }
            e => panic!("{e:?}"),
        }
    }

    #[test]
    fn test_unit_conversion() {
        let factory = DefaultMathTransformFactory::new();
        let mut suite = ParameterizedTransformTest::new(&factory);
        let mut coordinates = [1.0, -2.5];
        suite
            .apply_unit_conversion(CalculationType::DirectTransform, &mut coordinates, 2.0)
            .unwrap();
        assert_eq!(coordinates, [2.0, -5.0]);
        assert_eq!(
            suite.unit_conversion.as_ref().unwrap().to_string(),
            "Scale[DIRECT_TRANSFORM:×2,×2,…]"
        );
        assert!(suite
            .apply_unit_conversion(CalculationType::DirectTransform, &mut coordinates, -1.0)
            .is_err());
        assert_eq!(coordinates, [2.0, -5.0]);

        // the tolerance doubles, the sample points still pass
        suite.test_mercator_1sp().unwrap();
    }
}
