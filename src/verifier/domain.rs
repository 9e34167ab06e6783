use log::trace;
use rand::{Rng, RngCore};

use crate::config::Key;
use crate::ordinate::load;
use crate::{Error, Result};

use super::TransformTestCase;

/// Returns points on a regular grid over `[min, max]`.
///
/// Axis `d` is divided into `counts[d]` cells and one point is put at the
/// center of each cell, the first axis varying fastest. With `rng`, every
/// ordinate is moved randomly within its cell and the points are shuffled,
/// keeping tuples whole.
///
/// # Errors
///
/// A configuration error if the lengths of `min`, `max` and `counts`
/// differ or the number of ordinates overflows.
///
/// # Example
///
/// ```
/// # use geoconform::verifier::sample_domain;
/// # fn main() -> geoconform::Result<()> {
/// let points = sample_domain(&[0.0, 10.0], &[4.0, 11.0], &[2, 2], None)?;
/// assert_eq!(points, vec![1.0, 10.25, 3.0, 10.25, 1.0, 10.75, 3.0, 10.75]);
/// # Ok(())}
/// ```
pub fn sample_domain(
    min: &[f64],
    max: &[f64],
    counts: &[usize],
    mut rng: Option<&mut dyn RngCore>,
) -> Result<Vec<f32>> {
    let dimension = min.len();
    if max.len() != dimension || counts.len() != dimension {
        return Err(Error::new_configuration(format!(
            "domain bounds of length {} and {} with {} cell counts",
            dimension,
            max.len(),
            counts.len()
        )));
    }
    if dimension == 0 {
        return Ok(Vec::new());
    }
    let num_points = counts
        .iter()
        .try_fold(1usize, |acc, n| acc.checked_mul(*n))
        .and_then(|n| n.checked_mul(dimension).map(|_| n))
        .ok_or_else(|| Error::new_configuration(format!("too many points for cell counts {counts:?}")))?;

    let deltas: Vec<f64> = (0..dimension)
        .map(|d| (max[d] - min[d]) / counts[d] as f64)
        .collect();
    let mut points = vec![0f32; num_points * dimension];
    for (p, tuple) in points.chunks_exact_mut(dimension).enumerate() {
        let mut step = 1;
        for d in 0..dimension {
            let index = (p / step) % counts[d];
            step *= counts[d];
            let start = min[d] + deltas[d] / 2.0;
            let mut ordinate = (index as f64 * deltas[d] + start) as f32;
            if let Some(rng) = rng.as_deref_mut() {
                ordinate += (rng.random::<f32>() - 0.5) * deltas[d] as f32;
            }
            tuple[d] = ordinate;
        }
    }

    if let Some(rng) = rng {
        for i in (1..num_points).rev() {
            let j = rng.random_range(0..=i);
            if i != j {
                for d in 0..dimension {
                    points.swap(i * dimension + d, j * dimension + d);
                }
            }
        }
    }
    Ok(points)
}

impl TransformTestCase {
    /// Verifies the transform over a sampled domain.
    ///
    /// The points of [`sample_domain`] go through
    /// [`verify_consistency`](TransformTestCase::verify_consistency), then
    /// [`verify_inverse_f32`](TransformTestCase::verify_inverse_f32) and
    /// [`verify_derivative`](TransformTestCase::verify_derivative) at every
    /// point when enabled. Returns the points.
    ///
    /// # Errors
    ///
    /// A configuration error if derivatives are verified without deltas,
    /// raised before sampling, or the first failure.
    pub fn verify_in_domain(
        &self,
        min: &[f64],
        max: &[f64],
        counts: &[usize],
        rng: Option<&mut dyn RngCore>,
    ) -> Result<Vec<f32>> {
        let derivative = self.is_enabled(Key::IsDerivativeSupported);
        if derivative {
            self.required_deltas()?;
        }
        let transform = self.require_transform()?;
        let sd = transform.source_dimensions();
        if min.len() != sd {
            return Err(Error::new_configuration(format!(
                "a {}D domain for a {sd}D transform",
                min.len()
            )));
        }

        let points = sample_domain(min, max, counts, rng)?;
        trace!("verify {} points in domain", points.len() / sd.max(1));
        self.verify_consistency(&points)?;
        if self.is_enabled(Key::IsInverseTransformSupported) {
            self.verify_inverse_f32(&points)?;
        }
        if derivative {
            let mut point = vec![0.0; sd];
            for tuple in points.chunks_exact(sd) {
                load(tuple, &mut point, true);
                self.verify_derivative(&point)?;
            }
        }
        Ok(points)
    }
}
