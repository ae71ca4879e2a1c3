//! Reductions used for objective aggregation.

/// Arithmetic mean; 0 for an empty series.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// `q`-th percentile (0..=100) with linear interpolation between order
/// statistics; 0 for an empty series.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Squared shortfall of `delivered` against `demand`.
#[inline]
pub fn squared_deficit(demand: f64, delivered: f64) -> f64 {
    let d = (demand - delivered).max(0.0);
    d * d
}

/// Squared deficit scaled by the squared demand; 0 when there is no demand.
#[inline]
pub fn normalized_deficit(squared: f64, demand: f64) -> f64 {
    if demand == 0.0 {
        0.0
    } else {
        squared / (demand * demand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), 0.0);
        assert!((mean(&[1.0, 2.0, 6.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_endpoints() {
        let v = [5.0, 1.0, 3.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 100.0), 5.0);
        assert_eq!(percentile(&v, 50.0), 3.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        // 5 values: pos = 0.99 * 4 = 3.96
        let v = [10.0, 20.0, 30.0, 40.0, 50.0];
        let p = percentile(&v, 99.0);
        assert!((p - 49.6).abs() < 1e-9, "p99 = {p}");
    }

    #[test]
    fn test_squared_deficit() {
        assert_eq!(squared_deficit(10.0, 4.0), 36.0);
        assert_eq!(squared_deficit(10.0, 12.0), 0.0);
    }

    #[test]
    fn test_normalized_deficit_zero_demand() {
        assert_eq!(normalized_deficit(36.0, 0.0), 0.0);
        assert!((normalized_deficit(36.0, 10.0) - 0.36).abs() < 1e-12);
    }
}
