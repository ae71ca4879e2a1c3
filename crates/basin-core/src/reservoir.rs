// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Reservoir
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Reservoir hydraulics: geometry, release bounds and mass balance.
//!
//! A `Reservoir` is immutable once built. The storage it integrates from is
//! passed in by the caller, so one instance can serve many concurrent runs.

use basin_math::interp::InterpTable;
use basin_types::config::{
    EnvFlowRuleConfig, IntegrationConfig, RatingConfig, ReservoirConfig,
};
use basin_types::constants::{MM_PER_M, SECONDS_PER_DAY};
use basin_types::error::{BasinError, BasinResult};
use basin_types::state::{IntegrationResult, PeriodContext};
use ndarray::Array2;
use std::path::Path;

/// Storage / level / surface relation.
#[derive(Debug, Clone)]
pub enum Geometry {
    Tabulated {
        storage_level: InterpTable,
        level_storage: InterpTable,
        level_surface: InterpTable,
    },
    /// Prismatic approximation with a fixed surface area (m²).
    ConstantArea { area: f64 },
}

impl Geometry {
    /// From a level / surface / storage table, one relation per row.
    pub fn from_lsv(table: &Array2<f64>) -> BasinResult<Self> {
        Ok(Geometry::Tabulated {
            storage_level: InterpTable::from_rows(table, 2, 0)?,
            level_storage: InterpTable::from_rows(table, 0, 2)?,
            level_surface: InterpTable::from_rows(table, 0, 1)?,
        })
    }

    pub fn constant_area(area: f64) -> BasinResult<Self> {
        if !(area.is_finite() && area > 0.0) {
            return Err(BasinError::ConfigError(format!(
                "constant surface area must be positive, got {area}"
            )));
        }
        Ok(Geometry::ConstantArea { area })
    }
}

/// Release bounds as a function of storage.
#[derive(Debug, Clone)]
pub enum RatingCurve {
    /// Level → minimum and maximum release.
    Curve {
        min_release: InterpTable,
        max_release: InterpTable,
    },
    /// Storage thresholds around a single release capacity.
    StepFunction { lower: f64, upper: f64, capacity: f64 },
    /// No rating available; both bounds are zero.
    Missing,
}

impl RatingCurve {
    /// From a level / min release / max release table.
    pub fn from_table(table: &Array2<f64>) -> BasinResult<Self> {
        Ok(RatingCurve::Curve {
            min_release: InterpTable::from_rows(table, 0, 1)?,
            max_release: InterpTable::from_rows(table, 0, 2)?,
        })
    }

    /// From a `[lower, upper, capacity]` triple.
    pub fn step_function(triple: &[f64]) -> BasinResult<Self> {
        match triple {
            [lower, upper, capacity, ..] => Ok(RatingCurve::StepFunction {
                lower: *lower,
                upper: *upper,
                capacity: *capacity,
            }),
            _ => Err(BasinError::ConfigError(format!(
                "step rating needs 3 values, got {}",
                triple.len()
            ))),
        }
    }
}

/// Floor applied to the bounded release.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EnvFlowRule {
    /// Release at least the period's minimum environmental flow.
    #[default]
    Floor,
    /// Guarantee `floor` always; above it, follow the natural inflow up to
    /// the full requirement.
    GraduatedFloor { floor: f64 },
}

impl EnvFlowRule {
    pub fn apply(&self, release: f64, mef: f64, inflow: f64) -> f64 {
        match *self {
            EnvFlowRule::Floor => release.max(mef),
            EnvFlowRule::GraduatedFloor { floor } => {
                if mef <= floor {
                    release.max(mef)
                } else if inflow <= floor {
                    release.max(floor)
                } else if inflow < mef {
                    release.max(inflow)
                } else {
                    release.max(mef)
                }
            }
        }
    }
}

impl From<&EnvFlowRuleConfig> for EnvFlowRule {
    fn from(cfg: &EnvFlowRuleConfig) -> Self {
        match cfg {
            EnvFlowRuleConfig::Floor => EnvFlowRule::Floor,
            EnvFlowRuleConfig::GraduatedFloor { floor } => {
                EnvFlowRule::GraduatedFloor { floor: *floor }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Evaporation {
    #[default]
    Disabled,
    /// Rate per period of year (mm).
    Monthly(Vec<f64>),
}

/// Sub-step time base of the mass balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationScheme {
    SubDaily { steps_per_day: u32 },
    Daily,
}

impl Default for IntegrationScheme {
    fn default() -> Self {
        IntegrationScheme::SubDaily { steps_per_day: 12 }
    }
}

impl IntegrationScheme {
    /// A sub-daily scheme needs at least one step per day.
    pub fn validate(&self) -> BasinResult<()> {
        match *self {
            IntegrationScheme::SubDaily { steps_per_day: 0 } => Err(BasinError::ConfigError(
                "integration steps_per_day must be at least 1".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Length of one sub-step (s).
    pub fn step_seconds(&self) -> f64 {
        match *self {
            IntegrationScheme::SubDaily { steps_per_day } => {
                SECONDS_PER_DAY / steps_per_day as f64
            }
            IntegrationScheme::Daily => SECONDS_PER_DAY,
        }
    }

    /// Number of sub-steps in a period of `days` days.
    pub fn substeps(&self, days: u32) -> usize {
        match *self {
            IntegrationScheme::SubDaily { steps_per_day } => (steps_per_day * days) as usize,
            IntegrationScheme::Daily => days as usize,
        }
    }
}

impl From<&IntegrationConfig> for IntegrationScheme {
    fn from(cfg: &IntegrationConfig) -> Self {
        match cfg {
            IntegrationConfig::SubDaily { steps_per_day } => IntegrationScheme::SubDaily {
                steps_per_day: *steps_per_day,
            },
            IntegrationConfig::Daily => IntegrationScheme::Daily,
        }
    }
}

/// Operating targets per period of year. Loaded for reference; the
/// simulation does not steer towards them.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleCurve {
    pub period: Vec<f64>,
    pub level: Vec<f64>,
    pub storage: Vec<f64>,
}

impl RuleCurve {
    pub fn from_table(table: &Array2<f64>) -> BasinResult<Self> {
        if table.nrows() < 3 {
            return Err(BasinError::ConfigError(format!(
                "rule curve needs 3 rows, got {}",
                table.nrows()
            )));
        }
        Ok(RuleCurve {
            period: table.row(0).to_vec(),
            level: table.row(1).to_vec(),
            storage: table.row(2).to_vec(),
        })
    }

    /// Target (level, storage) for a 1-based period of year.
    pub fn target(&self, period_of_year: usize) -> Option<(f64, f64)> {
        self.period
            .iter()
            .position(|&p| p as usize == period_of_year)
            .map(|i| (self.level[i], self.storage[i]))
    }
}

#[derive(Debug, Clone)]
pub struct Reservoir {
    name: String,
    capacity: f64,
    initial_storage: f64,
    geometry: Geometry,
    rating: RatingCurve,
    env_flow_rule: EnvFlowRule,
    min_env_flow: Vec<f64>,
    evaporation: Evaporation,
    integration: IntegrationScheme,
    rule_curve: Option<RuleCurve>,
    tailwater: Option<InterpTable>,
}

impl Reservoir {
    pub fn new(
        name: impl Into<String>,
        capacity: f64,
        initial_storage: f64,
        geometry: Geometry,
        rating: RatingCurve,
        min_env_flow: Vec<f64>,
    ) -> Self {
        let name = name.into();
        if matches!(rating, RatingCurve::Missing) {
            log::warn!("reservoir '{name}': rating curve not defined, releases will be zero");
        }
        if initial_storage < 0.0 || initial_storage > capacity {
            log::warn!(
                "reservoir '{name}': initial storage {initial_storage} outside [0, {capacity}]"
            );
        }
        Reservoir {
            name,
            capacity,
            initial_storage,
            geometry,
            rating,
            env_flow_rule: EnvFlowRule::default(),
            min_env_flow,
            evaporation: Evaporation::default(),
            integration: IntegrationScheme::default(),
            rule_curve: None,
            tailwater: None,
        }
    }

    pub fn with_env_flow_rule(mut self, rule: EnvFlowRule) -> Self {
        self.env_flow_rule = rule;
        self
    }

    pub fn with_evaporation(mut self, evaporation: Evaporation) -> Self {
        self.evaporation = evaporation;
        self
    }

    /// Fails for a sub-daily scheme with zero steps per day.
    pub fn with_integration(mut self, scheme: IntegrationScheme) -> BasinResult<Self> {
        scheme.validate().map_err(|e| match e {
            BasinError::ConfigError(msg) => {
                BasinError::ConfigError(format!("reservoir '{}': {msg}", self.name))
            }
            other => other,
        })?;
        self.integration = scheme;
        Ok(self)
    }

    pub fn with_rule_curve(mut self, rule_curve: RuleCurve) -> Self {
        self.rule_curve = Some(rule_curve);
        self
    }

    pub fn with_tailwater(mut self, tailwater: InterpTable) -> Self {
        self.tailwater = Some(tailwater);
        self
    }

    /// Build from a configuration section, loading tables from `base`.
    pub fn from_config(name: &str, cfg: &ReservoirConfig, base: &Path) -> BasinResult<Self> {
        let geometry = match (&cfg.lsv, cfg.surface_area) {
            (Some(table), _) => Geometry::from_lsv(&table.load(base)?)?,
            (None, Some(area)) => Geometry::constant_area(area)?,
            (None, None) => {
                return Err(BasinError::ConfigError(format!(
                    "reservoir '{name}' needs either an lsv table or a surface_area"
                )))
            }
        };
        let rating = match &cfg.rating {
            Some(RatingConfig::Curve { table }) => RatingCurve::from_table(&table.load(base)?)?,
            Some(RatingConfig::StepFunction { table }) => {
                RatingCurve::step_function(&table.load(base)?)?
            }
            None => RatingCurve::Missing,
        };
        let evaporation = match &cfg.evaporation {
            Some(rates) => Evaporation::Monthly(rates.load(base)?),
            None => Evaporation::Disabled,
        };

        let mut reservoir = Reservoir::new(
            name,
            cfg.capacity,
            cfg.initial_storage,
            geometry,
            rating,
            cfg.min_env_flow.load(base)?,
        )
        .with_env_flow_rule((&cfg.env_flow_rule).into())
        .with_evaporation(evaporation)
        .with_integration((&cfg.integration).into())?;

        if let Some(table) = &cfg.rule_curve {
            reservoir = reservoir.with_rule_curve(RuleCurve::from_table(&table.load(base)?)?);
        }
        if let Some(table) = &cfg.tailwater {
            reservoir = reservoir.with_tailwater(InterpTable::from_rows(&table.load(base)?, 0, 1)?);
        }
        Ok(reservoir)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn initial_storage(&self) -> f64 {
        self.initial_storage
    }

    pub fn integration(&self) -> IntegrationScheme {
        self.integration
    }

    pub fn env_flow_rule(&self) -> EnvFlowRule {
        self.env_flow_rule
    }

    pub fn rating(&self) -> &RatingCurve {
        &self.rating
    }

    pub fn rule_curve(&self) -> Option<&RuleCurve> {
        self.rule_curve.as_ref()
    }

    /// Length of the per-period series, checked against the calendar.
    pub(crate) fn seasonal_lengths(&self) -> (usize, Option<usize>) {
        let evap = match &self.evaporation {
            Evaporation::Disabled => None,
            Evaporation::Monthly(rates) => Some(rates.len()),
        };
        (self.min_env_flow.len(), evap)
    }

    pub fn storage_to_level(&self, s: f64) -> f64 {
        match &self.geometry {
            Geometry::Tabulated { storage_level, .. } => storage_level.eval(s),
            Geometry::ConstantArea { area } => s / area,
        }
    }

    pub fn level_to_storage(&self, h: f64) -> f64 {
        match &self.geometry {
            Geometry::Tabulated { level_storage, .. } => level_storage.eval(h),
            Geometry::ConstantArea { area } => h * area,
        }
    }

    pub fn level_to_surface(&self, h: f64) -> f64 {
        match &self.geometry {
            Geometry::Tabulated { level_surface, .. } => level_surface.eval(h),
            Geometry::ConstantArea { area } => *area,
        }
    }

    pub fn min_release(&self, s: f64) -> f64 {
        match &self.rating {
            RatingCurve::Curve { min_release, .. } => min_release.eval(self.storage_to_level(s)),
            RatingCurve::StepFunction {
                upper, capacity, ..
            } => {
                if s >= *upper {
                    *capacity
                } else {
                    0.0
                }
            }
            RatingCurve::Missing => 0.0,
        }
    }

    pub fn max_release(&self, s: f64) -> f64 {
        match &self.rating {
            RatingCurve::Curve { max_release, .. } => max_release.eval(self.storage_to_level(s)),
            RatingCurve::StepFunction {
                lower, capacity, ..
            } => {
                if s <= *lower {
                    0.0
                } else {
                    *capacity
                }
            }
            RatingCurve::Missing => 0.0,
        }
    }

    /// Minimum environmental flow for a 1-based period of year.
    pub fn mef(&self, period_of_year: usize) -> f64 {
        self.min_env_flow[period_of_year - 1]
    }

    /// Decision bounded by the rating, then raised to the environmental floor.
    ///
    /// The floor wins over the rating: the result can exceed `max_release`.
    pub fn actual_release(&self, decision: f64, storage: f64, mef: f64, inflow: f64) -> f64 {
        let bounded = self
            .max_release(storage)
            .min(self.min_release(storage).max(decision));
        self.env_flow_rule.apply(bounded, mef, inflow)
    }

    fn evaporation_rate(&self, period_of_year: usize) -> Option<f64> {
        match &self.evaporation {
            Evaporation::Disabled => None,
            Evaporation::Monthly(rates) => Some(rates[period_of_year - 1]),
        }
    }

    /// Forward-Euler mass balance over `n_substeps` sub-steps.
    ///
    /// Release is re-evaluated at every sub-step storage. Evaporation takes
    /// the period's rate spread over the `n_substeps · Δt` block.
    pub fn integrate(
        &self,
        ctx: &PeriodContext,
        n_substeps: usize,
        s0: f64,
        decision: f64,
        inflow: f64,
    ) -> IntegrationResult {
        if n_substeps == 0 {
            return IntegrationResult {
                storage: s0,
                mean_release: 0.0,
            };
        }
        let dt = self.integration.step_seconds();
        let mef = self.mef(ctx.period_of_year);
        let rate = self.evaporation_rate(ctx.period_of_year);

        let mut s = s0;
        let mut release_sum = 0.0;
        for _ in 0..n_substeps {
            let r = self.actual_release(decision, s, mef, inflow);
            let e = match rate {
                Some(mm) => {
                    let surface = self.level_to_surface(self.storage_to_level(s));
                    mm / MM_PER_M * surface / (dt * n_substeps as f64)
                }
                None => 0.0,
            };
            s += dt * (inflow - r - e);
            release_sum += r;
        }

        IntegrationResult {
            storage: s,
            mean_release: release_sum / n_substeps as f64,
        }
    }

    /// Number of sub-steps this reservoir takes in a period of `days` days.
    pub fn substeps(&self, days: u32) -> usize {
        self.integration.substeps(days)
    }

    /// Downstream water level for a release; 0 without a tailwater curve.
    pub fn release_to_tailwater(&self, release: f64) -> f64 {
        self.tailwater.as_ref().map_or(0.0, |t| t.eval(release))
    }

    pub fn within_capacity(&self, storage: f64) -> bool {
        (0.0..=self.capacity).contains(&storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn rating() -> RatingCurve {
        // level 0..100 m, min 0..50, max 100..500
        RatingCurve::from_table(&array![[0.0, 100.0], [0.0, 50.0], [100.0, 500.0]]).unwrap()
    }

    fn prism(rating: RatingCurve) -> Reservoir {
        Reservoir::new(
            "prism",
            1.0e9,
            5.0e8,
            Geometry::constant_area(1.0e7).unwrap(),
            rating,
            vec![10.0; 12],
        )
    }

    #[test]
    fn test_constant_area_geometry() {
        let r = prism(rating());
        assert!((r.storage_to_level(5.0e8) - 50.0).abs() < 1e-12);
        assert!((r.level_to_storage(20.0) - 2.0e8).abs() < 1e-6);
        assert_eq!(r.level_to_surface(999.0), 1.0e7);
        assert!(Geometry::constant_area(0.0).is_err());
    }

    #[test]
    fn test_tabulated_geometry() {
        // rows: level, surface, storage
        let lsv = array![[0.0, 10.0, 20.0], [0.0, 100.0, 300.0], [0.0, 1000.0, 4000.0]];
        let r = Reservoir::new(
            "lsv",
            4000.0,
            1000.0,
            Geometry::from_lsv(&lsv).unwrap(),
            RatingCurve::Missing,
            vec![0.0; 12],
        );
        assert_eq!(r.storage_to_level(1000.0), 10.0);
        assert!((r.storage_to_level(2500.0) - 15.0).abs() < 1e-12);
        assert!((r.level_to_storage(15.0) - 2500.0).abs() < 1e-12);
        assert!((r.level_to_surface(5.0) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_curve_bounds_follow_level() {
        let r = prism(rating());
        // level 50
        assert!((r.min_release(5.0e8) - 25.0).abs() < 1e-9);
        assert!((r.max_release(5.0e8) - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_step_function_bounds() {
        let r = prism(RatingCurve::step_function(&[100.0, 200.0, 487.0]).unwrap());
        assert_eq!(r.min_release(50.0), 0.0);
        assert_eq!(r.max_release(50.0), 0.0);
        assert_eq!(r.max_release(100.0), 0.0);
        assert_eq!(r.min_release(150.0), 0.0);
        assert_eq!(r.max_release(150.0), 487.0);
        assert_eq!(r.min_release(200.0), 487.0);
        assert_eq!(r.max_release(250.0), 487.0);
        assert!(RatingCurve::step_function(&[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_missing_rating_releases_nothing() {
        let r = prism(RatingCurve::Missing);
        assert_eq!(r.min_release(5.0e8), 0.0);
        assert_eq!(r.max_release(5.0e8), 0.0);
        assert_eq!(r.actual_release(300.0, 5.0e8, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_actual_release_clamps_then_floors() {
        let r = prism(rating());
        assert!((r.actual_release(1000.0, 5.0e8, 0.0, 0.0) - 300.0).abs() < 1e-9);
        assert!((r.actual_release(0.0, 5.0e8, 0.0, 0.0) - 25.0).abs() < 1e-9);
        assert!((r.actual_release(0.0, 5.0e8, 40.0, 0.0) - 40.0).abs() < 1e-9);
        // floor above max release is kept
        assert!((r.actual_release(1000.0, 5.0e8, 400.0, 0.0) - 400.0).abs() < 1e-9);
    }

    #[test]
    fn test_graduated_floor_branches() {
        let rule = EnvFlowRule::GraduatedFloor { floor: 40.0 };
        // requirement at or below the floor
        assert_eq!(rule.apply(10.0, 30.0, 0.0), 30.0);
        // dry: only the floor
        assert_eq!(rule.apply(10.0, 100.0, 20.0), 40.0);
        // intermediate: follow inflow
        assert_eq!(rule.apply(10.0, 100.0, 70.0), 70.0);
        // wet: full requirement
        assert_eq!(rule.apply(10.0, 100.0, 150.0), 100.0);
        assert_eq!(rule.apply(120.0, 100.0, 150.0), 120.0);
    }

    #[test]
    fn test_integrate_balanced_keeps_storage() {
        let r = prism(RatingCurve::from_table(&array![[0.0, 1.0e3], [0.0, 0.0], [1.0e4, 1.0e4]]).unwrap());
        let ctx = PeriodContext::new(0, 1, 31);
        let n = r.substeps(31);
        assert_eq!(n, 372);
        let out = r.integrate(&ctx, n, 5.0e8, 100.0, 100.0);
        assert!((out.storage - 5.0e8).abs() < 1e-3, "storage = {}", out.storage);
        assert!((out.mean_release - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_integrate_mean_release_and_evaporation() {
        let r = prism(rating()).with_evaporation(Evaporation::Monthly(vec![100.0; 12]));
        let ctx = PeriodContext::new(0, 3, 30);
        let out = r.integrate(&ctx, 30 * 12, 5.0e8, 100.0, 0.0);
        assert!((out.mean_release - 100.0).abs() < 1e-9);
        // evaporated volume over the period: 0.1 m * 1e7 m² = 1e6 m³
        let released = out.mean_release * 7200.0 * 360.0;
        let loss = 5.0e8 - out.storage - released;
        assert!((loss - 1.0e6).abs() < 1.0, "loss = {loss}");
    }

    #[test]
    fn test_daily_scheme() {
        let scheme = IntegrationScheme::Daily;
        assert_eq!(scheme.step_seconds(), 86_400.0);
        assert_eq!(scheme.substeps(28), 28);
        let sub = IntegrationScheme::default();
        assert_eq!(sub.step_seconds(), 7200.0);
    }

    #[test]
    fn test_zero_steps_per_day_rejected() {
        let zero = IntegrationScheme::SubDaily { steps_per_day: 0 };
        assert!(zero.validate().is_err());
        let err = prism(rating()).with_integration(zero).unwrap_err();
        assert!(err.to_string().contains("prism"), "{err}");

        let r = prism(rating())
            .with_integration(IntegrationScheme::SubDaily { steps_per_day: 1 })
            .unwrap();
        assert_eq!(r.substeps(30), 30);
        assert!(prism(rating()).with_integration(IntegrationScheme::Daily).is_ok());
    }

    #[test]
    fn test_zero_substeps_is_identity() {
        let r = prism(rating());
        let out = r.integrate(&PeriodContext::new(0, 1, 0), 0, 42.0, 100.0, 5.0);
        assert_eq!(out.storage, 42.0);
        assert_eq!(out.mean_release, 0.0);
    }

    #[test]
    fn test_tailwater_and_rule_curve() {
        let r = prism(rating())
            .with_tailwater(InterpTable::new(vec![0.0, 1000.0], vec![300.0, 310.0]).unwrap())
            .with_rule_curve(
                RuleCurve::from_table(&array![[1.0, 2.0], [480.0, 482.0], [6.0e10, 6.5e10]])
                    .unwrap(),
            );
        assert!((r.release_to_tailwater(500.0) - 305.0).abs() < 1e-12);
        assert_eq!(r.rule_curve().unwrap().target(2), Some((482.0, 6.5e10)));
        assert_eq!(r.rule_curve().unwrap().target(5), None);
        assert_eq!(prism(rating()).release_to_tailwater(500.0), 0.0);
    }

    #[test]
    fn test_within_capacity() {
        let r = prism(rating());
        assert!(r.within_capacity(0.0));
        assert!(r.within_capacity(1.0e9));
        assert!(!r.within_capacity(-1.0));
        assert!(!r.within_capacity(1.1e9));
    }
}
