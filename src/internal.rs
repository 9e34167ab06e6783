/// `a * b + c`, fused when the `fma` feature is on.
#[macro_export]
macro_rules! mul_add {
    ($a:expr, $b:expr, $c:expr) => {
        if cfg!(feature = "fma") {
            f64::mul_add($a, $b, $c)
        } else {
            $a * $b + $c
        }
    };
}

/// Sum of the products of `a` and `b`, pairing elements from the front.
#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).fold(0.0, |acc, (x, y)| mul_add!(*x, *y, acc))
}

/// Bit identity of two values, with every NaN collapsed onto one pattern.
#[inline]
pub(crate) fn same_bits(a: f64, b: f64) -> bool {
    if a.is_nan() {
        b.is_nan()
    } else {
        a.to_bits() == b.to_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
        assert_eq!(dot(&[], &[]), 0.0);
    }

    #[test]
    fn test_same_bits() {
        assert!(same_bits(f64::NAN, -f64::NAN));
        assert!(same_bits(f64::INFINITY, f64::INFINITY));
        assert!(!same_bits(0.0, -0.0));
        assert!(!same_bits(f64::NAN, 1.0));
    }
}
