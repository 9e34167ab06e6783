//! Sample points of the EPSG guidance notes.
//!
//! Each entry holds the points of one example operation, their expected
//! results and a domain where random points can be tested.
use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::epsg::{LINKS, R_US_FEET};
use crate::utils::dms;
use crate::{Error, Result};

/// An axis-aligned rectangle in units of the source space.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rectangle {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Rectangle {
    #[inline]
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Returns `true` if the rectangle has no area, NaN bounds included.
    #[inline]
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// Points to transform with an operation and the expected results.
///
/// # Example
///
/// ```
/// # use geoconform::sample::SamplePoints;
/// # fn main() -> geoconform::Result<()> {
/// let sample = SamplePoints::for_crs(3002)?;
/// assert_eq!(sample.operation(), 19905);
/// assert_eq!(sample.source_points(), [120.0, -3.0, 110.0, 0.0]);
/// assert_eq!(sample.target_points(), [5009726.58, 569150.82, 3900000.0, 900000.0]);
/// assert!(sample.area_of_validity().contains(120.0, -3.0));
/// # Ok(())}
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SamplePoints {
    crs: u32,
    operation: u32,
    source_dimension: usize,
    target_dimension: usize,
    source_points: Vec<f64>,
    target_points: Vec<f64>,
    area_of_validity: Rectangle,
}

/// A projection example: a point near the origin then the origin itself.
struct Projection {
    operation: u32,
    /// Longitude and latitude of natural origin
    origin: (f64, f64),
    /// False easting and northing
    false_origin: (f64, f64),
    point: (f64, f64),
    projected: (f64, f64),
    area: Rectangle,
}

fn projection(crs: u32) -> Option<Projection> {
    let p = match crs {
        // Makassar / NEIEZ
        3002 => Projection {
            operation: 19905,
            origin: (110.0, 0.0),
            false_origin: (3900000.00, 900000.00),
            point: (120.0, -3.0),
            projected: (5009726.58, 569150.82),
            area: Rectangle::new(117.6, -7.9, 121.0, 2.0),
        },
        // Pulkovo 1942 / Caspian Sea Mercator
        3388 => Projection {
            operation: 19884,
            origin: (51.0, 0.0),
            false_origin: (0.0, 0.0),
            point: (53.0, 53.0),
            projected: (165704.29, 5171848.07),
            area: Rectangle::new(46.68, 36.58, 54.76, 47.11),
        },
        // WGS 84 / Pseudo-Mercator
        3857 => Projection {
            operation: 3856,
            origin: (0.0, 0.0),
            false_origin: (0.0, 0.0),
            point: (-dms(100.0, 20.0, 0.0), dms(24.0, 22.0, 54.433)),
            projected: (-11169055.58, 2800000.00),
            area: Rectangle::new(-180.0, -85.0, 180.0, 85.0),
        },
        // IGNF:MILLER
        310642901 => Projection {
            operation: 310642901,
            origin: (0.0, 0.0),
            false_origin: (0.0, 0.0),
            point: (2.478917, 48.805639),
            projected: (275951.78, 5910061.78),
            area: Rectangle::new(-180.0, -90.0, 180.0, 90.0),
        },
        // Timbalai 1948 / RSO Borneo (m)
        29873 => Projection {
            operation: 19958,
            origin: (115.0, 4.0),
            false_origin: (590476.87, 442857.65),
            point: (dms(115.0, 48.0, 19.8196), dms(5.0, 23.0, 14.1129)),
            projected: (679245.73, 596562.78),
            area: Rectangle::new(109.55, 0.85, 119.26, 7.35),
        },
        // OSGB 1936 / British National Grid
        27700 => Projection {
            operation: 19916,
            origin: (-2.0, 49.0),
            false_origin: (400000.00, -100000.00),
            point: (30.0 / 60.0, 50.0 + 30.0 / 60.0),
            projected: (577274.98, 69740.49),
            area: Rectangle::new(-7.56, 49.96, 1.78, 60.84),
        },
        // Hartebeesthoek94 / Lo29
        2053 => Projection {
            operation: 17529,
            origin: (29.0, 0.0),
            false_origin: (0.0, 0.0),
            point: (dms(28.0, 16.0, 57.479), -dms(25.0, 43.0, 55.302)),
            projected: (71984.48, 2847342.74),
            area: Rectangle::new(27.99, -33.03, 30.00, -22.13),
        },
        // Trinidad 1903 / Trinidad Grid
        2314 => Projection {
            operation: 19975,
            origin: (-dms(61.0, 20.0, 0.0), dms(10.0, 26.0, 30.0)),
            false_origin: (430000.00 * LINKS, 325000.00 * LINKS),
            point: (-62.0, 10.0),
            projected: (66644.94 * LINKS, 82536.22 * LINKS),
            area: Rectangle::new(-62.08, 9.83, -60.00, 11.50),
        },
        // Vanua Levu 1915 / Vanua Levu Grid
        3139 => Projection {
            operation: 19878,
            origin: (dms(179.0, 20.0, 0.0), -dms(16.0, 15.0, 0.0)),
            false_origin: (1251331.8 * LINKS, 1662888.5 * LINKS),
            point: (dms(179.0, 59.0, 39.6115), -dms(16.0, 50.0, 29.2435)),
            projected: (1601528.90 * LINKS, 1336966.01 * LINKS),
            area: Rectangle::new(178.42, -17.07, 180.23, -16.1),
        },
        // JAD69 / Jamaica National Grid
        24200 => Projection {
            operation: 19910,
            origin: (-77.0, 18.0),
            false_origin: (250000.00, 150000.00),
            point: (-dms(76.0, 56.0, 37.26), dms(17.0, 55.0, 55.80)),
            projected: (255966.58, 142493.51),
            area: Rectangle::new(-78.4, 17.65, -76.1, 18.6),
        },
        // NAD27 / Texas South Central
        32040 => Projection {
            operation: 14204,
            origin: (-99.0, 27.0 + 50.0 / 60.0),
            false_origin: (2000000.00 / R_US_FEET, 0.0),
            point: (-96.0, 28.0 + 30.0 / 60.0),
            projected: (2963503.91 / R_US_FEET, 254759.80 / R_US_FEET),
            area: Rectangle::new(-105.0, 27.82, -93.41, 30.66),
        },
        // NAD27 / Michigan Central
        6201 => Projection {
            operation: 6198,
            origin: (-84.0 - 20.0 / 60.0, 43.0 + 19.0 / 60.0),
            false_origin: (2000000.00 / R_US_FEET, 0.0),
            point: (-83.0 - 10.0 / 60.0, 43.0 + 45.0 / 60.0),
            projected: (2308335.75 / R_US_FEET, 160210.48 / R_US_FEET),
            area: Rectangle::new(-87.06, 43.80, -82.27, 45.92),
        },
        // Belge 1972 / Belge Lambert 72
        31300 => Projection {
            operation: 19902,
            origin: (dms(4.0, 21.0, 24.983), 90.0),
            false_origin: (150000.01, 5400088.44),
            point: (dms(5.0, 48.0, 26.533), dms(50.0, 40.0, 46.461)),
            projected: (251763.20, 153034.13),
            area: Rectangle::new(2.54, 49.51, 6.4, 51.5),
        },
        // ETRS89 / LAEA Europe
        3035 => Projection {
            operation: 19986,
            origin: (10.0, 52.0),
            false_origin: (4321000.00, 3210000.00),
            point: (5.0, 50.0),
            projected: (3962799.45, 2999718.85),
            area: Rectangle::new(-31.53, 27.75, 45.00, 71.15),
        },
        // WGS 84 / UPS North, (N,E) and (E,N)
        32661 | 5041 => Projection {
            operation: 16061,
            origin: (0.0, 90.0),
            false_origin: (2000000.00, 2000000.00),
            point: (44.0, 73.0),
            projected: (3320416.75, 632668.43),
            area: Rectangle::new(-180.0, 60.0, 180.0, 90.0),
        },
        // WGS 84 / Australian Antarctic Polar Stereographic
        3032 => Projection {
            operation: 19993,
            origin: (70.0, -90.0),
            false_origin: (6000000.00, 6000000.00),
            point: (120.0, -75.0),
            projected: (7255380.79, 7053389.56),
            area: Rectangle::new(45.0, -90.0, 160.0, -60.0),
        },
        // Petrels 1972 / Terre Adelie Polar Stereographic
        2985 => Projection {
            operation: 19983,
            origin: (140.0, -67.0),
            false_origin: (300000.0, 200000.0),
            point: (dms(140.0, 4.0, 17.040), -dms(66.0, 36.0, 18.820)),
            projected: (303169.52, 244055.72),
            area: Rectangle::new(139.44, -66.78, 141.50, -66.10),
        },
        // Amersfoort / RD New
        28992 => Projection {
            operation: 19914,
            origin: (dms(5.0, 23.0, 15.500), dms(52.0, 9.0, 22.178)),
            false_origin: (155000.000, 463000.000),
            point: (6.0, 53.0),
            projected: (196105.283, 557057.739),
            area: Rectangle::new(3.2, 50.75, 7.24, 53.75),
        },
        // Guam 1963 / Yap Islands
        3295 => Projection {
            operation: 15399,
            origin: (dms(138.0, 10.0, 7.48), dms(9.0, 32.0, 48.15)),
            false_origin: (40000.00, 60000.00),
            point: (dms(138.0, 11.0, 34.908), dms(9.0, 35.0, 47.493)),
            projected: (42665.90, 65509.82),
            area: Rectangle::new(137.99, 9.39, 138.27, 9.69),
        },
        _ => return None,
    };
    Some(p)
}

impl SamplePoints {
    /// Makes sample points, checking the arrays hold whole points.
    ///
    /// # Errors
    ///
    /// If a dimension is zero, if an array is not a multiple of its dimension,
    /// if both arrays do not hold the same number of points, or if the area is empty.
    pub fn new(
        crs: u32,
        operation: u32,
        source_dimension: usize,
        target_dimension: usize,
        source_points: Vec<f64>,
        target_points: Vec<f64>,
        area_of_validity: Rectangle,
    ) -> Result<Self> {
        if source_dimension == 0 || target_dimension == 0 {
            return Err(Error::new_configuration("dimensions must be positive"));
        }
        if source_points.len() % source_dimension != 0 || target_points.len() % target_dimension != 0 {
            return Err(Error::new_configuration(format!(
                "{} source and {} target ordinates are not whole points of dimensions {source_dimension} and {target_dimension}",
                source_points.len(),
                target_points.len()
            )));
        }
        if source_points.len() / source_dimension != target_points.len() / target_dimension {
            return Err(Error::new_configuration(format!(
                "{} source points but {} target points",
                source_points.len() / source_dimension,
                target_points.len() / target_dimension
            )));
        }
        if area_of_validity.is_empty() {
            return Err(Error::new_configuration("empty area of validity"));
        }
        Ok(Self {
            crs,
            operation,
            source_dimension,
            target_dimension,
            source_points,
            target_points,
            area_of_validity,
        })
    }

    /// Returns the sample points of an operation using the CRS `crs`.
    ///
    /// For map projections, the points go from the base CRS to the projected CRS;
    /// for datum shifts, from WGS 84 to the CRS.
    ///
    /// # Errors
    ///
    /// If there is no sample for `crs`.
    pub fn for_crs(crs: u32) -> Result<Self> {
        if let Some(p) = projection(crs) {
            return Self::new(
                crs,
                p.operation,
                2,
                2,
                vec![p.point.0, p.point.1, p.origin.0, p.origin.1],
                vec![p.projected.0, p.projected.1, p.false_origin.0, p.false_origin.1],
                p.area,
            );
        }
        let ed50 = || vec![dms(2.0, 7.0, 46.38), dms(53.0, 48.0, 33.82), 73.0];
        match crs {
            // Polyconic, on the domain of table 19 of Snyder
            9818 => Self::new(
                crs,
                9818,
                2,
                2,
                vec![
                    0.0, 50.0, 1.0, 49.0, 2.0, 48.0, 3.0, 47.0, //
                    0.0, 30.0, 1.0, 29.0, 2.0, 28.0, 3.0, 27.0,
                ],
                vec![
                    0.0, 5540628.0, 73172.0, 5429890.0, 149239.0, 5320144.0, 228119.0, 5211397.0,
                    0.0, 3319933.0, 97440.0, 3209506.0, 196719.0, 3099882.0, 297742.0, 2991002.0,
                ],
                Rectangle::new(0.0, 23.0, 3.0, 50.0),
            ),
            // Orthographic; the arc length must stay below 90°
            9840 => Self::new(
                crs,
                9840,
                2,
                2,
                vec![dms(2.0, 7.0, 46.38), dms(53.0, 48.0, 33.82)],
                vec![-189011.711, -128640.567],
                Rectangle::new(5.0 - 50.0, 55.0 - 60.0, 5.0 + 50.0, 90.0),
            ),
            // CRS S-JTSK (Ferro) / Krovak, without the cartographic pole
            2065 => Self::new(
                crs,
                19952,
                2,
                2,
                vec![dms(16.0, 50.0, 59.1790), dms(50.0, 12.0, 32.4416)],
                vec![-568990.997, -1050538.643],
                Rectangle::new(12.09, 47.74, 22.56, 51.05),
            ),
            // ED50, with Abridged Molodensky
            4230 => Self::new(
                crs,
                9605,
                3,
                3,
                ed50(),
                vec![dms(2.0, 7.0, 51.477), dms(53.0, 48.0, 36.563), 28.091],
                Rectangle::new(-180.0, -80.0, 180.0, 80.0),
            ),
            // topocentric example A
            5819 => Self::new(
                crs,
                15594,
                3,
                3,
                ed50(),
                vec![-189013.869, -128642.040, -4220.171],
                Rectangle::new(1.0, 50.0, 4.0, 60.0),
            ),
            // topocentric example B; the area is in geocentric X and Y
            5820 => Self::new(
                crs,
                15595,
                3,
                3,
                vec![3771793.968, 140253.342, 5124304.349],
                vec![-189013.869, -128642.040, -4220.171],
                Rectangle::new(3700000.0, 120000.0, 3900000.0, 160000.0),
            ),
            _ => Err(Error::new_no_such_sample(crs)),
        }
    }

    /// Returns the code of the CRS using the points, for reports.
    #[inline]
    pub fn crs(&self) -> u32 {
        self.crs
    }

    /// Returns the code of the operation, see [`epsg::create_parameters`](crate::epsg::create_parameters).
    #[inline]
    pub fn operation(&self) -> u32 {
        self.operation
    }

    #[inline]
    pub fn source_dimension(&self) -> usize {
        self.source_dimension
    }

    #[inline]
    pub fn target_dimension(&self) -> usize {
        self.target_dimension
    }

    #[inline]
    pub fn source_points(&self) -> &[f64] {
        &self.source_points
    }

    #[inline]
    pub fn target_points(&self) -> &[f64] {
        &self.target_points
    }

    /// Returns the domain of random points, in units of the source space.
    #[inline]
    pub fn area_of_validity(&self) -> &Rectangle {
        &self.area_of_validity
    }

    /// Returns the number of points.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.source_points.len() / self.source_dimension
    }

    /// Replaces one ordinate of the source point `point`.
    ///
    /// # Errors
    ///
    /// If `point` or `ordinate` is out of range.
    pub fn set_source_ordinate(&mut self, point: usize, ordinate: usize, value: f64) -> Result<()> {
        let index = ordinate_index(point, ordinate, self.source_dimension, self.num_points())?;
        self.source_points[index] = value;
        Ok(())
    }

    /// Replaces one ordinate of the target point `point`.
    ///
    /// # Errors
    ///
    /// If `point` or `ordinate` is out of range.
    pub fn set_target_ordinate(&mut self, point: usize, ordinate: usize, value: f64) -> Result<()> {
        let index = ordinate_index(point, ordinate, self.target_dimension, self.num_points())?;
        self.target_points[index] = value;
        Ok(())
    }

    /// Swaps the two ordinates of every source point.
    ///
    /// # Errors
    ///
    /// If the source points are not two-dimensional.
    pub fn swap_source(&mut self) -> Result<()> {
        if self.source_dimension != 2 {
            return Err(Error::new_configuration(format!(
                "can not swap the axes of {}D points",
                self.source_dimension
            )));
        }
        swap(&mut self.source_points);
        Ok(())
    }

    /// Reverses the sign of every target ordinate.
    pub fn flip_target(&mut self) {
        flip(&mut self.target_points);
    }

    /// Subtracts `prime_meridian` from every source longitude.
    ///
    /// Call it before [`swap_source`](SamplePoints::swap_source).
    pub fn rotate_longitude(&mut self, prime_meridian: f64) {
        for p in self.source_points.chunks_exact_mut(self.source_dimension) {
            p[0] -= prime_meridian;
        }
    }
}

fn ordinate_index(point: usize, ordinate: usize, dimension: usize, num_points: usize) -> Result<usize> {
    if point >= num_points || ordinate >= dimension {
        return Err(Error::new_configuration(format!(
            "no ordinate {ordinate} of point {point} among {num_points} points of dimension {dimension}"
        )));
    }
    Ok(point * dimension + ordinate)
}

impl Display for SamplePoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SamplePoints[CRS={}: {:?} ⇒ {:?}]",
            self.crs, self.source_points, self.target_points
        )
    }
}

/// Swaps the two ordinates of each two-dimensional point.
///
/// A trailing odd ordinate is left as is.
pub fn swap(coordinates: &mut [f64]) {
    for p in coordinates.chunks_exact_mut(2) {
        p.swap(0, 1);
    }
}

/// Reverses the sign of every ordinate.
pub fn flip(coordinates: &mut [f64]) {
    for c in coordinates.iter_mut() {
        *c = -*c;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorImpl;

    const CODES: [u32; 26] = [
        3002, 3388, 3857, 310642901, 29873, 27700, 2053, 2314, 3139, 24200, 32040, 6201, 31300,
        3035, 32661, 5041, 3032, 2985, 28992, 9818, 9840, 3295, 2065, 4230, 5819, 5820,
    ];

    #[test]
    fn test_for_crs() {
        for code in CODES {
            let sample = SamplePoints::for_crs(code).unwrap();
            assert_eq!(sample.crs(), code);
            assert!(sample.num_points() >= 1, "{code}");
            assert_eq!(
                sample.source_points().len() / sample.source_dimension(),
                sample.target_points().len() / sample.target_dimension()
            );
            assert!(!sample.area_of_validity().is_empty());
            assert!(crate::epsg::operation_codes().contains(&sample.operation()), "{code}");
        }
    }

    #[test]
    fn test_values() {
        let s = SamplePoints::for_crs(3857).unwrap();
        assert_eq!(s.source_points()[0], -(100.0 + 20.0 / 60.0));
        assert_eq!(s.source_points()[1], 24.0 + (22.0 + 54.433 / 60.0) / 60.0);
        assert_eq!(s.target_points(), [-11169055.58, 2800000.00, 0.0, 0.0]);

        let s = SamplePoints::for_crs(9818).unwrap();
        assert_eq!(s.num_points(), 8);
        assert_eq!(s.target_points()[15], 2991002.0);

        let s = SamplePoints::for_crs(5820).unwrap();
        assert_eq!((s.source_dimension(), s.num_points()), (3, 1));

        assert_eq!(
            SamplePoints::for_crs(32661).unwrap().target_points(),
            SamplePoints::for_crs(5041).unwrap().target_points()
        );
    }

    #[test]
    fn test_no_such_sample() {
        let err = SamplePoints::for_crs(4326).unwrap_err();
        assert!(matches!(err.kind(), ErrorImpl::NoSuchSample { crs: 4326 }));
    }

    #[test]
    fn test_new() {
        let area = Rectangle::new(0.0, 0.0, 1.0, 1.0);
        assert!(SamplePoints::new(0, 0, 2, 2, vec![0.0; 3], vec![0.0; 4], area).is_err());
        assert!(SamplePoints::new(0, 0, 2, 3, vec![0.0; 4], vec![0.0; 3], area).is_err());
        assert!(SamplePoints::new(0, 0, 0, 2, vec![], vec![], area).is_err());
        assert!(SamplePoints::new(0, 0, 2, 2, vec![], vec![], Rectangle::new(0.0, 0.0, 0.0, 1.0)).is_err());
        assert!(SamplePoints::new(0, 0, 2, 1, vec![0.0; 4], vec![0.0; 2], area).is_ok());
    }

    #[test]
    fn test_rotate_swap_flip() {
        let mut s = SamplePoints::for_crs(3002).unwrap();
        s.rotate_longitude(100.0);
        assert_eq!(s.source_points(), [20.0, -3.0, 10.0, 0.0]);

        s.swap_source().unwrap();
        assert_eq!(s.source_points(), [-3.0, 20.0, 0.0, 10.0]);

        s.flip_target();
        assert_eq!(s.target_points(), [-5009726.58, -569150.82, -3900000.0, -900000.0]);

        let mut datum = SamplePoints::for_crs(5820).unwrap();
        assert!(datum.swap_source().is_err());
        assert_eq!(datum.source_points(), [3771793.968, 140253.342, 5124304.349]);
    }

    #[test]
    fn test_set_ordinate() {
        let mut s = SamplePoints::for_crs(3388).unwrap();
        s.set_target_ordinate(0, 1, 1351950.22).unwrap();
        s.set_source_ordinate(1, 1, 42.0).unwrap();
        assert_eq!(s.target_points()[1], 1351950.22);
        assert_eq!(s.source_points()[3], 42.0);

        // the arrays keep whole points
        let before = s.clone();
        assert!(s.set_source_ordinate(2, 0, 0.0).is_err());
        assert!(s.set_target_ordinate(0, 2, 0.0).is_err());
        assert_eq!(s, before);
        assert_eq!(s.num_points(), 2);
    }
}
