// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Irrigation Rule
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Hedged irrigation diversion rule.
//!
//! Each district owns two normalized parameters starting at its offset:
//! the hedging threshold `h` and the curvature `m`. Below the threshold the
//! district takes a power-law share of its demand; above it the full demand.

use basin_math::scaling::denormalize;
use basin_types::error::{BasinError, BasinResult};

#[derive(Debug, Clone, Copy, PartialEq)]
struct DistrictParams {
    hedging: f64,
    curvature: f64,
}

#[derive(Debug, Clone)]
pub struct IrrigationRule {
    n_districts: usize,
    /// Physical bounds of (hedging, curvature).
    param_min: [f64; 2],
    param_max: [f64; 2],
    offsets: Vec<usize>,
    theta: Option<Vec<f64>>,
    districts: Vec<DistrictParams>,
}

impl IrrigationRule {
    pub fn new(
        n_districts: usize,
        param_min: &[f64],
        param_max: &[f64],
        offsets: Vec<usize>,
    ) -> BasinResult<Self> {
        if n_districts == 0 {
            return Err(BasinError::ConfigError(
                "irrigation rule needs at least one district".to_string(),
            ));
        }
        if param_min.len() < 2 || param_max.len() < 2 {
            return Err(BasinError::ConfigError(format!(
                "irrigation rule needs bounds for (hedging, curvature), got min={} max={}",
                param_min.len(),
                param_max.len()
            )));
        }
        if offsets.len() != n_districts {
            return Err(BasinError::ConfigError(format!(
                "irrigation rule has {n_districts} districts but {} offsets",
                offsets.len()
            )));
        }
        let n_params = 2 * n_districts;
        if let Some(&bad) = offsets.iter().find(|&&o| o + 1 >= n_params) {
            return Err(BasinError::ConfigError(format!(
                "irrigation offset {bad} does not fit a {n_params}-parameter vector"
            )));
        }
        Ok(IrrigationRule {
            n_districts,
            param_min: [param_min[0], param_min[1]],
            param_max: [param_max[0], param_max[1]],
            offsets,
            theta: None,
            districts: Vec::new(),
        })
    }

    pub fn n_districts(&self) -> usize {
        self.n_districts
    }

    pub fn n_parameters(&self) -> usize {
        2 * self.n_districts
    }

    pub fn has_parameters(&self) -> bool {
        self.theta.is_some()
    }

    pub fn set_parameters(&mut self, theta: &[f64]) -> BasinResult<()> {
        let expected = self.n_parameters();
        if theta.len() != expected {
            return Err(BasinError::ParameterLength {
                expected,
                got: theta.len(),
            });
        }
        self.districts = self
            .offsets
            .iter()
            .map(|&o| DistrictParams {
                hedging: denormalize(theta[o], self.param_min[0], self.param_max[0]),
                curvature: denormalize(theta[o + 1], self.param_min[1], self.param_max[1]),
            })
            .collect();
        self.theta = Some(theta.to_vec());
        Ok(())
    }

    pub fn parameters(&self) -> Option<Vec<f64>> {
        self.theta.clone()
    }

    pub fn clear_parameters(&mut self) {
        self.theta = None;
        self.districts.clear();
    }

    fn district(&self, district: usize) -> BasinResult<DistrictParams> {
        if self.theta.is_none() {
            return Err(BasinError::ConfigError(
                "irrigation rule evaluated before parameters were assigned".to_string(),
            ));
        }
        self.districts.get(district).copied().ok_or_else(|| {
            BasinError::ConfigError(format!(
                "irrigation district {district} outside 0..{}",
                self.n_districts
            ))
        })
    }

    /// Hedging threshold of `district` in physical units (m³/s).
    pub fn hedging(&self, district: usize) -> BasinResult<f64> {
        Ok(self.district(district)?.hedging)
    }

    /// Water diverted to `district` from `available` flow against `demand`.
    ///
    /// Never exceeds `min(available, demand)`.
    pub fn diversion(&self, available: f64, demand: f64, district: usize) -> BasinResult<f64> {
        let p = self.district(district)?;
        if available <= 0.0 {
            return Ok(0.0);
        }
        let cap = available.min(demand.max(0.0));
        if p.hedging <= 0.0 || available > p.hedging {
            return Ok(cap);
        }
        let hedged = demand * (available / p.hedging).powf(p.curvature);
        Ok(available.min(hedged).clamp(0.0, cap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(n: usize) -> IrrigationRule {
        let offsets = (0..n).map(|d| 2 * d).collect();
        IrrigationRule::new(n, &[0.0, 0.0], &[1000.0, 4.0], offsets).unwrap()
    }

    #[test]
    fn test_full_demand_above_threshold() {
        let mut r = rule(1);
        // h = 200, m = 2
        r.set_parameters(&[0.2, 0.5]).unwrap();
        assert!((r.hedging(0).unwrap() - 200.0).abs() < 1e-12);
        assert_eq!(r.diversion(500.0, 80.0, 0).unwrap(), 80.0);
        assert_eq!(r.diversion(500.0, 800.0, 0).unwrap(), 500.0);
    }

    #[test]
    fn test_hedged_below_threshold() {
        let mut r = rule(1);
        r.set_parameters(&[0.2, 0.5]).unwrap();
        // 80 * (100 / 200)^2 = 20
        let d = r.diversion(100.0, 80.0, 0).unwrap();
        assert!((d - 20.0).abs() < 1e-12, "d = {d}");
    }

    #[test]
    fn test_zero_flow_and_zero_threshold() {
        let mut r = rule(1);
        r.set_parameters(&[0.0, 0.5]).unwrap();
        assert_eq!(r.diversion(0.0, 80.0, 0).unwrap(), 0.0);
        assert_eq!(r.diversion(-5.0, 80.0, 0).unwrap(), 0.0);
        assert_eq!(r.diversion(30.0, 80.0, 0).unwrap(), 30.0);
    }

    #[test]
    fn test_offsets_select_district_parameters() {
        let mut r = IrrigationRule::new(2, &[0.0, 0.0], &[100.0, 1.0], vec![2, 0]).unwrap();
        r.set_parameters(&[0.1, 0.0, 0.9, 1.0]).unwrap();
        assert!((r.hedging(0).unwrap() - 90.0).abs() < 1e-12);
        assert!((r.hedging(1).unwrap() - 10.0).abs() < 1e-12);
        assert!(r.hedging(2).is_err());
    }

    #[test]
    fn test_lifecycle() {
        let mut r = rule(3);
        assert_eq!(r.n_parameters(), 6);
        assert!(r.diversion(1.0, 1.0, 0).is_err());
        assert!(matches!(
            r.set_parameters(&[0.5; 5]),
            Err(BasinError::ParameterLength { expected: 6, got: 5 })
        ));
        let theta = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        r.set_parameters(&theta).unwrap();
        assert_eq!(r.parameters().unwrap(), theta);
        r.clear_parameters();
        assert!(!r.has_parameters());
        assert!(r.hedging(0).is_err());
    }

    #[test]
    fn test_rejects_bad_layout() {
        assert!(IrrigationRule::new(2, &[0.0, 0.0], &[1.0, 1.0], vec![0]).is_err());
        assert!(IrrigationRule::new(2, &[0.0, 0.0], &[1.0, 1.0], vec![0, 3]).is_err());
        assert!(IrrigationRule::new(1, &[0.0], &[1.0], vec![0]).is_err());
        assert!(IrrigationRule::new(0, &[0.0, 0.0], &[1.0, 1.0], vec![]).is_err());
    }
}
