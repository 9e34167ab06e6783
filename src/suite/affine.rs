use std::sync::Arc;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Configuration, ImplementationDetails, Key};
use crate::epsg::FEET;
use crate::validate::Validators;
use crate::{Error, MathTransformFactory, Matrix, Result, TransformTestCase};

use super::{Outcome, Settings};

/// Smallest tolerance of the affine tests.
pub const TRANSFORM_TOLERANCE: f64 = 1e-8;

/// Approximate number of points sampled in the domain.
const NUM_POINTS: usize = 100;

const DOMAIN: (f64, f64) = (-1000.0, 1000.0);

/// Expected 2D result computed without the implementation under test.
type Reference = fn(f64, f64) -> (f64, f64);

/// Tests of the affine transforms made by a factory.
///
/// Each test builds a transform from a known matrix, checks it over
/// random points of `[-1000, 1000]` in every dimension, and compares
/// two-dimensional results with an independent computation.
#[derive(Debug)]
pub struct AffineTransformTest<'a, F: MathTransformFactory + ?Sized> {
    factory: &'a F,
    settings: Settings,
    tolerance: f64,
}

impl<'a, F: MathTransformFactory + ?Sized> AffineTransformTest<'a, F> {
    pub fn new(factory: &'a F) -> Self {
        Self {
            factory,
            settings: Settings::default(),
            tolerance: TRANSFORM_TOLERANCE,
        }
    }

    /// Enables or disables one check.
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

    /// Reports the effective flags.
    pub fn configuration(&self) -> Configuration {
        self.settings.configuration()
    }

    /// Runs every test.
    pub fn run_all(&self) -> Vec<(&'static str, Outcome)> {
        let tests: [(&'static str, fn(&Self) -> Result<()>); 11] = [
            ("identity 1D", Self::test_identity_1d),
            ("identity 2D", Self::test_identity_2d),
            ("identity 3D", Self::test_identity_3d),
            ("axis swapping", Self::test_axis_swapping),
            ("south orientated", Self::test_south_orientated),
            ("translation", Self::test_translation),
            ("uniform scale", Self::test_uniform_scale),
            ("general scale", Self::test_general_scale),
            ("rotation", Self::test_rotation),
            ("general", Self::test_general),
            ("dimension reduction", Self::test_dimension_reduction),
        ];
        tests
            .into_iter()
            .map(|(name, test)| (name, Outcome::from(test(self))))
            .collect()
    }

    pub fn test_identity_1d(&self) -> Result<()> {
        self.settings.require(Key::IsNonBidimensionalSpaceSupported)?;
        self.run("identity 1D", Matrix::identity(2))
    }

    pub fn test_identity_2d(&self) -> Result<()> {
        self.run_with_reference("identity 2D", Matrix::identity(3), |x, y| (x, y))
    }

    pub fn test_identity_3d(&self) -> Result<()> {
        self.settings.require(Key::IsNonBidimensionalSpaceSupported)?;
        self.run("identity 3D", Matrix::identity(4))
    }

    /// `(x, y) → (y, x)`.
    pub fn test_axis_swapping(&self) -> Result<()> {
        self.settings.require(Key::IsAxisSwappingSupported)?;
        let matrix = Matrix::from_rows(&[&[0.0, 1.0, 0.0], &[1.0, 0.0, 0.0], &[0.0, 0.0, 1.0]])?;
        self.run_with_reference("axis swapping", matrix, |x, y| (y, x))
    }

    /// A rotation of 180°, as used by south orientated projections.
    pub fn test_south_orientated(&self) -> Result<()> {
        let matrix = Matrix::from_rows(&[&[-1.0, 0.0, 0.0], &[0.0, -1.0, 0.0], &[0.0, 0.0, 1.0]])?;
        self.run_with_reference("south orientated", matrix, |x, y| (-x, -y))
    }

    pub fn test_translation(&self) -> Result<()> {
        let matrix = Matrix::from_rows(&[&[1.0, 0.0, 400000.0], &[0.0, 1.0, -100000.0], &[0.0, 0.0, 1.0]])?;
        self.run_with_reference("translation", matrix, |x, y| (x + 400000.0, y - 100000.0))
    }

    /// Feet to metres.
    pub fn test_uniform_scale(&self) -> Result<()> {
        let matrix = Matrix::from_rows(&[&[FEET, 0.0, 0.0], &[0.0, FEET, 0.0], &[0.0, 0.0, 1.0]])?;
        self.run_with_reference("uniform scale", matrix, |x, y| (x * FEET, y * FEET))
    }

    pub fn test_general_scale(&self) -> Result<()> {
        let matrix = Matrix::from_rows(&[&[3.0, 0.0, 0.0], &[0.0, 4.0, 0.0], &[0.0, 0.0, 1.0]])?;
        self.run_with_reference("general scale", matrix, |x, y| (3.0 * x, 4.0 * y))
    }

    /// A rotation of 30°.
    pub fn test_rotation(&self) -> Result<()> {
        let matrix = rotation(30f64.to_radians());
        self.run_with_reference("rotation", matrix, |x, y| {
            let (s, c) = 30f64.to_radians().sin_cos();
            (x * c - y * s, x * s + y * c)
        })
    }

    /// A translation, a scale, a rotation and a translation again.
    pub fn test_general(&self) -> Result<()> {
        let matrix = translation(10.0, -20.0)
            .multiply(&rotation(0.5))?
            .multiply(&Matrix::from_rows(&[&[0.2, 0.0, 0.0], &[0.0, 0.3, 0.0], &[0.0, 0.0, 1.0]])?)?
            .multiply(&translation(300.0, 500.0))?;
        self.run_with_reference("general", matrix, |x, y| {
            let (x, y) = (0.2 * (x + 300.0), 0.3 * (y + 500.0));
            let (s, c) = 0.5f64.sin_cos();
            (x * c - y * s + 10.0, x * s + y * c - 20.0)
        })
    }

    /// From 4D to 2D, dropping the second and fourth ordinates.
    ///
    /// The inverse must give NaN for the dropped ordinates.
    pub fn test_dimension_reduction(&self) -> Result<()> {
        self.settings.require(Key::IsNonSquareMatrixSupported)?;
        let matrix = Matrix::from_rows(&[
            &[2.0, 0.0, 0.0, 0.0, 8.0],
            &[0.0, 0.0, 4.0, 0.0, 5.0],
            &[0.0, 0.0, 0.0, 0.0, 1.0],
        ])?;
        let mut test = self.prepare("dimension reduction", &matrix)?;
        test.enable(Key::IsInverseTransformSupported, false);
        self.verify_internal_consistency(&test, &matrix)?;

        let mut source = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 8.0, 3.0, -7.0, 5.0];
        let target = [8.0, 5.0, 10.0, 9.0, 24.0, -23.0];
        test.verify_transform(&source, &target)?;

        let direct = test.require_transform()?;
        if self.settings.is_enabled(Key::IsInverseTransformSupported) {
            for p in source.chunks_exact_mut(4) {
                p[1] = f64::NAN;
                p[3] = f64::NAN;
            }
            let inverse = direct
                .inverse()
                .map_err(|e| test.refused(Key::IsInverseTransformSupported, e))?;
            test.set_transform(inverse);
            test.verify_transform(&target, &source)?;
        }
        if direct.is_identity() {
            return Err(Error::new_contract_violation(
                "a dimension reduction claims to be an identity",
            ));
        }
        Ok(())
    }

    fn run(&self, name: &str, matrix: Matrix) -> Result<()> {
        let test = self.prepare(name, &matrix)?;
        self.verify_internal_consistency(&test, &matrix)?;
        Ok(())
    }

    /// As [`run`](Self::run), then compares the sampled points with `reference`.
    fn run_with_reference(&self, name: &str, matrix: Matrix, reference: Reference) -> Result<()> {
        let test = self.prepare(name, &matrix)?;
        let points = self.verify_internal_consistency(&test, &matrix)?;
        let source: Vec<f64> = points.iter().map(|v| *v as f64).collect();
        let mut target = Vec::with_capacity(source.len());
        for p in source.chunks_exact(2) {
            let (x, y) = reference(p[0], p[1]);
            target.extend([x, y]);
        }
        test.verify_transform(&source, &target)
    }

    /// Makes the transform of `matrix` and its test case.
    fn prepare(&self, name: &str, matrix: &Matrix) -> Result<TransformTestCase> {
        let transform = self.factory.create_affine_transform(matrix.clone())?;
        Validators::validate(transform.as_ref())?;
        let (sd, td) = (transform.source_dimensions(), transform.target_dimensions());
        if sd + 1 != matrix.num_col() || td + 1 != matrix.num_row() {
            return Err(Error::new_contract_violation(format!(
                "a {}×{} matrix made a {sd}D → {td}D transform",
                matrix.num_row(),
                matrix.num_col()
            )));
        }
        if transform.is_identity() != matrix.is_identity() {
            return Err(Error::new_contract_violation(format!(
                "is_identity() is {} for {name}",
                transform.is_identity()
            )));
        }

        let tolerance = if self.tolerance >= TRANSFORM_TOLERANCE {
            self.tolerance
        } else {
            TRANSFORM_TOLERANCE
        };
        self.settings
            .builder()
            .transform(transform)
            .tolerance(tolerance)
            .derivative_deltas(vec![1.0; sd])
            .description(name.to_string())
            .build()
    }

    fn verify_internal_consistency(&self, test: &TransformTestCase, matrix: &Matrix) -> Result<Vec<f32>> {
        let sd = matrix.num_col() - 1;
        let n = cells_per_axis(sd);
        debug!("{}: {n}^{sd} points", test.description().unwrap_or_default());
        let mut rng = StdRng::seed_from_u64(seed(matrix));
        test.verify_in_domain(&vec![DOMAIN.0; sd], &vec![DOMAIN.1; sd], &vec![n; sd], Some(&mut rng))
    }
}

/// Smallest count whose `dimension`-th power reaches [`NUM_POINTS`].
fn cells_per_axis(dimension: usize) -> usize {
    (1..=NUM_POINTS)
        .find(|n| n.checked_pow(dimension as u32).is_none_or(|p| p >= NUM_POINTS))
        .unwrap_or(NUM_POINTS)
}

/// Derives a seed from the matrix elements, so each matrix has its own points.
fn seed(matrix: &Matrix) -> u64 {
    let mut h = 1u64;
    for j in 0..matrix.num_row() {
        for v in matrix.row(j) {
            h = h.wrapping_mul(31).wrapping_add(v.to_bits());
        }
    }
    h
}

fn rotation(angle: f64) -> Matrix {
    let (s, c) = angle.sin_cos();
    let mut m = Matrix::identity(3);
    m.set(0, 0, c);
    m.set(0, 1, -s);
    m.set(1, 0, s);
    m.set(1, 1, c);
    m
}

fn translation(tx: f64, ty: f64) -> Matrix {
    let mut m = Matrix::identity(3);
    m.set(0, 2, tx);
    m.set(1, 2, ty);
    m
}
