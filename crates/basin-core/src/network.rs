// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Network Topology
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! River network topology.
//!
//! A `Network` lists its nodes and an ordered routing program. Each step
//! either integrates a reservoir or diverts water to an irrigation
//! district; inflows are signed sums of flows already known at that point
//! of the timestep. `validate` rejects programs that read a flow before it
//! is produced.

use crate::hydropower::{HydropowerPlant, RunOfRiverPlant};
use crate::reservoir::Reservoir;
use basin_types::error::{BasinError, BasinResult};
use basin_types::state::PeriodContext;
use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReservoirId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CatchmentId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DistrictId(pub usize);

/// A flow available during one timestep (m³/s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Catchment(CatchmentId),
    /// Period-mean release of a reservoir integrated earlier in the step.
    Release(ReservoirId),
    /// Release of an earlier period arriving through a transport delay.
    Delayed(ReservoirId),
    Diversion(DistrictId),
}

/// Signed sum of flows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowExpr {
    terms: Vec<(f64, Flow)>,
}

impl FlowExpr {
    pub fn terms(&self) -> &[(f64, Flow)] {
        &self.terms
    }

    pub fn flows(&self) -> impl Iterator<Item = Flow> + '_ {
        self.terms.iter().map(|(_, f)| *f)
    }

    pub fn eval<F: FnMut(Flow) -> f64>(&self, mut value: F) -> f64 {
        self.terms.iter().map(|(sign, f)| sign * value(*f)).sum()
    }
}

impl From<Flow> for FlowExpr {
    fn from(flow: Flow) -> Self {
        FlowExpr {
            terms: vec![(1.0, flow)],
        }
    }
}

impl Add<Flow> for FlowExpr {
    type Output = FlowExpr;
    fn add(mut self, rhs: Flow) -> FlowExpr {
        self.terms.push((1.0, rhs));
        self
    }
}

impl Sub<Flow> for FlowExpr {
    type Output = FlowExpr;
    fn sub(mut self, rhs: Flow) -> FlowExpr {
        self.terms.push((-1.0, rhs));
        self
    }
}

impl Add<Flow> for Flow {
    type Output = FlowExpr;
    fn add(self, rhs: Flow) -> FlowExpr {
        FlowExpr::from(self) + rhs
    }
}

impl Sub<Flow> for Flow {
    type Output = FlowExpr;
    fn sub(self, rhs: Flow) -> FlowExpr {
        FlowExpr::from(self) - rhs
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutingStep {
    Reservoir { id: ReservoirId, inflow: FlowExpr },
    Divert { district: DistrictId, source: FlowExpr },
}

/// Lag between a reservoir's release and its arrival downstream.
///
/// The release of period `t` arrives at `t + lag`, rescaled by
/// `days[p] / delay_days[p]` for the release's period of year `p`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportDelay {
    pub from: ReservoirId,
    pub lag: usize,
    /// Arrivals for the first `lag` periods; missing entries are zero.
    pub initial: Vec<f64>,
    pub delay_days: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrrigationDistrict {
    pub name: String,
    /// Demand per period of year (m³/s).
    pub demand: Vec<f64>,
}

/// Minimum flow reaching the river mouth.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRequirement {
    pub outflow: FlowExpr,
    pub min_flow: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Calendar {
    pub periods_per_year: usize,
    /// 1-based period of year of timestep 0.
    pub initial_period: usize,
    pub days_per_period: Vec<u32>,
}

impl Calendar {
    pub fn monthly(initial_period: usize, days_per_period: Vec<u32>) -> Self {
        Calendar {
            periods_per_year: 12,
            initial_period,
            days_per_period,
        }
    }

    /// `(p0 + t − 1) mod T + 1`.
    pub fn period_of_year(&self, t: usize) -> usize {
        (self.initial_period + t - 1) % self.periods_per_year + 1
    }

    pub fn context(&self, t: usize) -> PeriodContext {
        let p = self.period_of_year(t);
        PeriodContext::new(t, p, self.days_per_period[p - 1])
    }

    fn validate(&self) -> BasinResult<()> {
        if self.periods_per_year == 0 {
            return Err(BasinError::ConfigError(
                "calendar needs at least one period per year".to_string(),
            ));
        }
        if self.initial_period == 0 || self.initial_period > self.periods_per_year {
            return Err(BasinError::ConfigError(format!(
                "initial period {} outside 1..={}",
                self.initial_period, self.periods_per_year
            )));
        }
        check_seasonal("days per period", self.days_per_period.len(), self.periods_per_year)
    }
}

fn check_seasonal(what: &str, len: usize, periods: usize) -> BasinResult<()> {
    if len < periods {
        return Err(BasinError::ConfigError(format!(
            "{what}: {len} values for {periods} periods per year"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Network {
    pub calendar: Calendar,
    pub n_catchments: usize,
    pub reservoirs: Vec<Reservoir>,
    pub districts: Vec<IrrigationDistrict>,
    pub plants: Vec<HydropowerPlant>,
    pub run_of_river: Vec<RunOfRiverPlant>,
    pub delays: Vec<TransportDelay>,
    pub routing: Vec<RoutingStep>,
    pub delta: Option<DeltaRequirement>,
    /// Reservoirs in release-policy output order; also the storage order of
    /// the policy input.
    pub decision_order: Vec<ReservoirId>,
    /// Total inflow of the period before timestep 0.
    pub initial_total_inflow: f64,
}

impl Network {
    pub fn new(calendar: Calendar, n_catchments: usize) -> Self {
        Network {
            calendar,
            n_catchments,
            reservoirs: Vec::new(),
            districts: Vec::new(),
            plants: Vec::new(),
            run_of_river: Vec::new(),
            delays: Vec::new(),
            routing: Vec::new(),
            delta: None,
            decision_order: Vec::new(),
            initial_total_inflow: 0.0,
        }
    }

    /// Adds a reservoir and appends it to the decision order.
    pub fn add_reservoir(&mut self, reservoir: Reservoir) -> ReservoirId {
        let id = ReservoirId(self.reservoirs.len());
        self.reservoirs.push(reservoir);
        self.decision_order.push(id);
        id
    }

    pub fn add_district(&mut self, district: IrrigationDistrict) -> DistrictId {
        let id = DistrictId(self.districts.len());
        self.districts.push(district);
        id
    }

    pub fn add_plant(&mut self, plant: HydropowerPlant) {
        self.plants.push(plant);
    }

    pub fn add_run_of_river(&mut self, plant: RunOfRiverPlant) {
        self.run_of_river.push(plant);
    }

    pub fn add_delay(&mut self, delay: TransportDelay) {
        self.delays.push(delay);
    }

    pub fn route(&mut self, id: ReservoirId, inflow: impl Into<FlowExpr>) {
        self.routing.push(RoutingStep::Reservoir {
            id,
            inflow: inflow.into(),
        });
    }

    pub fn divert(&mut self, district: DistrictId, source: impl Into<FlowExpr>) {
        self.routing.push(RoutingStep::Divert {
            district,
            source: source.into(),
        });
    }

    pub fn set_delta(&mut self, outflow: impl Into<FlowExpr>, min_flow: Vec<f64>) {
        self.delta = Some(DeltaRequirement {
            outflow: outflow.into(),
            min_flow,
        });
    }

    pub fn reservoir(&self, id: ReservoirId) -> &Reservoir {
        &self.reservoirs[id.0]
    }

    pub fn n_decisions(&self) -> usize {
        self.decision_order.len()
    }

    /// Policy input width: one storage per decision, period of year and
    /// lagged total inflow.
    pub fn n_policy_inputs(&self) -> usize {
        self.decision_order.len() + 2
    }

    pub fn delay_from(&self, id: ReservoirId) -> Option<usize> {
        self.delays.iter().position(|d| d.from == id)
    }

    /// Structural checks: ids in range, every flow produced before it is
    /// read, seasonal series long enough, no zero delay divisor.
    pub fn validate(&self) -> BasinResult<()> {
        let periods = self.calendar.periods_per_year;
        self.calendar.validate()?;

        for r in &self.reservoirs {
            let (mef, evap) = r.seasonal_lengths();
            check_seasonal(&format!("reservoir '{}' min_env_flow", r.name()), mef, periods)?;
            if let Some(n) = evap {
                check_seasonal(&format!("reservoir '{}' evaporation", r.name()), n, periods)?;
            }
        }
        for d in &self.districts {
            check_seasonal(&format!("district '{}' demand", d.name), d.demand.len(), periods)?;
        }

        let mut sorted = self.decision_order.clone();
        sorted.sort();
        sorted.dedup();
        if sorted.len() != self.reservoirs.len() || self.decision_order.len() != self.reservoirs.len()
        {
            return Err(BasinError::ConfigError(
                "decision order must list every reservoir exactly once".to_string(),
            ));
        }

        for (i, delay) in self.delays.iter().enumerate() {
            self.check_reservoir(delay.from)?;
            if delay.lag == 0 {
                return Err(BasinError::ConfigError(format!(
                    "transport delay {i} has zero lag"
                )));
            }
            check_seasonal(&format!("transport delay {i} days"), delay.delay_days.len(), periods)?;
            if let Some(p) = delay.delay_days[..periods].iter().position(|&d| d == 0) {
                return Err(BasinError::ConfigError(format!(
                    "transport delay {i} has zero delay days in period {}",
                    p + 1
                )));
            }
            if self.delays[..i].iter().any(|d| d.from == delay.from) {
                return Err(BasinError::ConfigError(format!(
                    "reservoir {} has more than one transport delay",
                    delay.from.0
                )));
            }
        }

        let mut released = vec![false; self.reservoirs.len()];
        let mut diverted = vec![false; self.districts.len()];
        for step in &self.routing {
            match step {
                RoutingStep::Reservoir { id, inflow } => {
                    self.check_reservoir(*id)?;
                    self.check_expr(inflow, &released, &diverted)?;
                    if released[id.0] {
                        return Err(BasinError::ConfigError(format!(
                            "reservoir {} routed twice",
                            id.0
                        )));
                    }
                    released[id.0] = true;
                }
                RoutingStep::Divert { district, source } => {
                    if district.0 >= self.districts.len() {
                        return Err(BasinError::ConfigError(format!(
                            "unknown irrigation district {}",
                            district.0
                        )));
                    }
                    self.check_expr(source, &released, &diverted)?;
                    if diverted[district.0] {
                        return Err(BasinError::ConfigError(format!(
                            "district {} diverted twice",
                            district.0
                        )));
                    }
                    diverted[district.0] = true;
                }
            }
        }
        if let Some(i) = released.iter().position(|r| !r) {
            return Err(BasinError::ConfigError(format!(
                "reservoir '{}' is never routed",
                self.reservoirs[i].name()
            )));
        }
        if let Some(i) = diverted.iter().position(|d| !d) {
            return Err(BasinError::ConfigError(format!(
                "district '{}' is never diverted",
                self.districts[i].name
            )));
        }

        for plant in &self.plants {
            self.check_reservoir(plant.reservoir)?;
            check_seasonal(&format!("plant '{}' target", plant.name), plant.target.len(), periods)?;
        }
        for ror in &self.run_of_river {
            self.check_expr(&ror.source, &released, &diverted)?;
            check_seasonal(
                &format!("run-of-river '{}' requirement", ror.name),
                ror.requirement.len(),
                periods,
            )?;
        }
        if let Some(delta) = &self.delta {
            self.check_expr(&delta.outflow, &released, &diverted)?;
            check_seasonal("delta min_flow", delta.min_flow.len(), periods)?;
        }
        Ok(())
    }

    fn check_reservoir(&self, id: ReservoirId) -> BasinResult<()> {
        if id.0 >= self.reservoirs.len() {
            return Err(BasinError::ConfigError(format!("unknown reservoir {}", id.0)));
        }
        Ok(())
    }

    fn check_expr(&self, expr: &FlowExpr, released: &[bool], diverted: &[bool]) -> BasinResult<()> {
        for flow in expr.flows() {
            match flow {
                Flow::Catchment(c) if c.0 >= self.n_catchments => {
                    return Err(BasinError::ConfigError(format!("unknown catchment {}", c.0)));
                }
                Flow::Release(r) => {
                    self.check_reservoir(r)?;
                    if !released[r.0] {
                        return Err(BasinError::ConfigError(format!(
                            "release of reservoir '{}' read before it is integrated",
                            self.reservoirs[r.0].name()
                        )));
                    }
                }
                Flow::Delayed(r) => {
                    self.check_reservoir(r)?;
                    if self.delay_from(r).is_none() {
                        return Err(BasinError::ConfigError(format!(
                            "delayed release of reservoir '{}' has no transport delay",
                            self.reservoirs[r.0].name()
                        )));
                    }
                }
                Flow::Diversion(d) => {
                    if d.0 >= diverted.len() || !diverted[d.0] {
                        return Err(BasinError::ConfigError(format!(
                            "diversion {} read before it is computed",
                            d.0
                        )));
                    }
                }
                Flow::Catchment(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservoir::{Geometry, RatingCurve};

    fn reservoir(name: &str) -> Reservoir {
        Reservoir::new(
            name,
            1.0e9,
            5.0e8,
            Geometry::constant_area(1.0e7).unwrap(),
            RatingCurve::step_function(&[0.0, 1.0e12, 1.0e4]).unwrap(),
            vec![0.0; 12],
        )
    }

    fn chain() -> (Network, ReservoirId, ReservoirId) {
        let mut net = Network::new(Calendar::monthly(1, vec![30; 12]), 1);
        let up = net.add_reservoir(reservoir("up"));
        let down = net.add_reservoir(reservoir("down"));
        net.route(up, Flow::Catchment(CatchmentId(0)));
        net.route(down, Flow::Release(up));
        (net, up, down)
    }

    #[test]
    fn test_period_of_year_wraps() {
        let cal = Calendar::monthly(10, vec![31; 12]);
        assert_eq!(cal.period_of_year(0), 10);
        assert_eq!(cal.period_of_year(2), 12);
        assert_eq!(cal.period_of_year(3), 1);
        assert_eq!(cal.period_of_year(15), 1);
        assert_eq!(cal.context(3).slot(), 0);
    }

    #[test]
    fn test_flow_expr_eval() {
        let e = Flow::Catchment(CatchmentId(0)) + Flow::Catchment(CatchmentId(1))
            - Flow::Diversion(DistrictId(0));
        let v = e.eval(|f| match f {
            Flow::Catchment(CatchmentId(0)) => 10.0,
            Flow::Catchment(_) => 5.0,
            Flow::Diversion(_) => 3.0,
            _ => 0.0,
        });
        assert!((v - 12.0).abs() < 1e-12);
        assert_eq!(FlowExpr::default().eval(|_| 1.0), 0.0);
    }

    #[test]
    fn test_valid_chain() {
        let (net, _, _) = chain();
        net.validate().unwrap();
        assert_eq!(net.n_policy_inputs(), 4);
    }

    #[test]
    fn test_release_read_before_integration() {
        let mut net = Network::new(Calendar::monthly(1, vec![30; 12]), 1);
        let up = net.add_reservoir(reservoir("up"));
        let down = net.add_reservoir(reservoir("down"));
        net.route(down, Flow::Release(up));
        net.route(up, Flow::Catchment(CatchmentId(0)));
        assert!(net.validate().is_err());
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let (mut net, _, _) = chain();
        net.set_delta(Flow::Catchment(CatchmentId(3)), vec![0.0; 12]);
        assert!(net.validate().is_err());

        let (mut net, _, _) = chain();
        net.divert(DistrictId(0), Flow::Catchment(CatchmentId(0)));
        assert!(net.validate().is_err());
    }

    #[test]
    fn test_delay_checks() {
        let (mut net, up, _) = chain();
        net.routing.pop();
        let down = ReservoirId(1);
        net.route(down, Flow::Delayed(up));
        assert!(net.validate().is_err(), "delayed flow without a delay");

        net.add_delay(TransportDelay {
            from: up,
            lag: 2,
            initial: vec![1.0, 2.0],
            delay_days: vec![30; 12],
        });
        net.validate().unwrap();

        net.delays[0].delay_days[4] = 0;
        assert!(net.validate().is_err(), "zero delay divisor");
    }

    #[test]
    fn test_unrouted_reservoir_and_short_series() {
        let (mut net, _, _) = chain();
        net.routing.pop();
        assert!(net.validate().is_err());

        let (mut net, _, _) = chain();
        net.calendar.days_per_period.truncate(11);
        assert!(net.validate().is_err());
    }
}
