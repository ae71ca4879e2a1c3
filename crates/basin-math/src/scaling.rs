//! Per-element normalization against declared bounds.

use ndarray::Array1;

/// Map `x` into [0, 1] relative to `[min, max]`.
///
/// A zero-width span maps to 0 instead of dividing by zero.
#[inline]
pub fn normalize(x: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span == 0.0 {
        0.0
    } else {
        (x - min) / span
    }
}

/// Inverse of [`normalize`].
#[inline]
pub fn denormalize(z: f64, min: f64, max: f64) -> f64 {
    z * (max - min) + min
}

pub fn normalize_vector(x: &[f64], min: &[f64], max: &[f64]) -> Array1<f64> {
    debug_assert!(x.len() == min.len() && x.len() == max.len());
    x.iter()
        .zip(min.iter().zip(max))
        .map(|(&v, (&lo, &hi))| normalize(v, lo, hi))
        .collect()
}

pub fn denormalize_vector(z: &[f64], min: &[f64], max: &[f64]) -> Array1<f64> {
    debug_assert!(z.len() == min.len() && z.len() == max.len());
    z.iter()
        .zip(min.iter().zip(max))
        .map(|(&v, (&lo, &hi))| denormalize(v, lo, hi))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bounds() {
        assert_eq!(normalize(10.0, 10.0, 20.0), 0.0);
        assert_eq!(normalize(20.0, 10.0, 20.0), 1.0);
        assert!((normalize(12.5, 10.0, 20.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_zero_span_is_zero() {
        assert_eq!(normalize(5.0, 3.0, 3.0), 0.0);
        assert_eq!(denormalize(0.7, 3.0, 3.0), 3.0);
    }

    #[test]
    fn test_vector_roundtrip() {
        let min = [0.0, -5.0, 100.0];
        let max = [1.0e9, 5.0, 200.0];
        let x = [2.5e8, 0.0, 180.0];
        let z = normalize_vector(&x, &min, &max);
        assert!((z[0] - 0.25).abs() < 1e-12);
        assert!((z[1] - 0.5).abs() < 1e-12);
        let back = denormalize_vector(z.as_slice().unwrap(), &min, &max);
        for (a, b) in back.iter().zip(x.iter()) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }
}
