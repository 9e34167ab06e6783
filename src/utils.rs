//! Provides misc utilities.

/// Returns the longitude `t` brought into `-180.0..=180.0`.
///
/// # Example
///
/// ```
/// # use geoconform::utils::normalize_longitude;
/// assert_eq!(normalize_longitude(145.0), 145.0);
/// assert_eq!(normalize_longitude(190.0), -170.0);
/// assert_eq!(normalize_longitude(-190.0), 170.0);
/// assert!(normalize_longitude(f64::NAN).is_nan());
/// ```
pub fn normalize_longitude(t: f64) -> f64 {
    let t = t % 360.0;
    if t > 180.0 {
        t - 360.0
    } else if t < -180.0 {
        t + 360.0
    } else {
        t
    }
}

/// Wraps the longitudes of `actual` toward those of `expected`.
///
/// Both arrays hold points of `dimension` ordinates with the longitude at
/// index `lambda`. A longitude is shifted by multiples of 360° so that it
/// differs from the expected one by at most 180°. Intended as the body of
/// a [`Normalizer`](crate::verifier::Normalizer).
///
/// # Example
///
/// ```
/// # use geoconform::utils::wrap_longitude;
/// let expected = [179.5, 10.0, -179.5, 20.0];
/// let mut actual = [-180.5, 10.0, 180.5, 20.0];
/// wrap_longitude(&expected, &mut actual, 2, 0);
/// assert_eq!(actual, [179.5, 10.0, -179.5, 20.0]);
/// ```
pub fn wrap_longitude(expected: &[f64], actual: &mut [f64], dimension: usize, lambda: usize) {
    if dimension == 0 || lambda >= dimension {
        return;
    }
    for (e, a) in expected
        .chunks_exact(dimension)
        .zip(actual.chunks_exact_mut(dimension))
    {
        let delta = a[lambda] - e[lambda];
        if delta.abs() > 180.0 {
            a[lambda] = e[lambda] + normalize_longitude(delta);
        }
    }
}

/// Returns decimal degrees from degrees, minutes and seconds.
///
/// The sign is the one of the result; negate it for west and south.
///
/// # Example
///
/// ```
/// # use geoconform::utils::dms;
/// assert_eq!(dms(10.0, 30.0, 0.0), 10.5);
/// assert_eq!(-dms(61.0, 20.0, 0.0), -(61.0 + 20.0 / 60.0));
/// ```
#[inline]
pub fn dms(degree: f64, minute: f64, second: f64) -> f64 {
    degree + (minute + second / 60.0) / 60.0
}
