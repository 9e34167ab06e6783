use std::ops::Index;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A coordinate tuple of arbitrary dimension.
///
/// Ordinates change only through [`DirectPosition::set_ordinate`] and
/// [`DirectPosition::set_coordinate`].
///
/// # Example
///
/// ```
/// # use geoconform::*;
/// let mut p = DirectPosition::new(2);
/// assert_eq!(p.dimension(), 2);
/// assert_eq!(p.coordinate(), &[0.0, 0.0]);
///
/// p.set_ordinate(1, 53.0);
/// assert_eq!(p[1], 53.0);
/// assert_eq!(p, DirectPosition::from(vec![0.0, 53.0]));
/// ```
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DirectPosition {
    pub(crate) ordinates: Vec<f64>,
}

impl From<Vec<f64>> for DirectPosition {
    fn from(ordinates: Vec<f64>) -> Self {
        Self { ordinates }
    }
}

impl From<&[f64]> for DirectPosition {
    fn from(ordinates: &[f64]) -> Self {
        Self {
            ordinates: ordinates.to_vec(),
        }
    }
}

impl From<(f64, f64)> for DirectPosition {
    fn from(rhs: (f64, f64)) -> Self {
        Self {
            ordinates: vec![rhs.0, rhs.1],
        }
    }
}

impl Index<usize> for DirectPosition {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.ordinates[index]
    }
}

impl DirectPosition {
    /// Makes a position at the origin.
    pub fn new(dimension: usize) -> Self {
        Self {
            ordinates: vec![0.0; dimension],
        }
    }

    /// Returns the number of ordinates.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.ordinates.len()
    }

    /// Returns the ordinates.
    #[inline]
    pub fn coordinate(&self) -> &[f64] {
        &self.ordinates
    }

    /// Returns the ordinate at `index`, or `None` out of bounds.
    #[inline]
    pub fn ordinate(&self, index: usize) -> Option<&f64> {
        self.ordinates.get(index)
    }

    /// Sets the ordinate at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of bounds.
    #[inline]
    pub fn set_ordinate(&mut self, index: usize, value: f64) {
        self.ordinates[index] = value;
    }

    /// Copies `values` into this position.
    ///
    /// # Panics
    ///
    /// Panics when `values` has not the dimension of this position.
    #[inline]
    pub fn set_coordinate(&mut self, values: &[f64]) {
        self.ordinates.copy_from_slice(values);
    }
}

impl std::fmt::Display for DirectPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("POINT(")?;
        for (i, v) in self.ordinates.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_coordinate() {
        let mut p = DirectPosition::new(3);
        p.set_coordinate(&[1.0, 2.0, 3.0]);
        assert_eq!(p.coordinate(), &[1.0, 2.0, 3.0]);
        assert_eq!(p.ordinate(2), Some(&3.0));
        assert_eq!(p.ordinate(3), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(DirectPosition::from((120.0, -3.0)).to_string(), "POINT(120 -3)");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde() {
        use serde_test::{assert_tokens, Token};

        assert_tokens(
            &DirectPosition::from((1.0, 2.0)),
            &[
                Token::Struct {
                    name: "DirectPosition",
                    len: 1,
                },
                Token::Str("ordinates"),
                Token::Seq { len: Some(2) },
                Token::F64(1.0),
                Token::F64(2.0),
                Token::SeqEnd,
                Token::StructEnd,
            ],
        );
    }
}
