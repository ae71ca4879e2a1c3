// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Network Simulator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Timestep loop over a validated `Network`.
//!
//! Per timestep:
//! 1. period of year `(p0 + t − 1) mod T + 1`
//! 2. catchment inflows plus delayed arrivals → total inflow
//! 3. policy input: storages, period of year, previous total inflow
//! 4. one joint release-policy call
//! 5. routing program in order (integration and diversions)
//! 6. transport delay buffers filled from this step's releases
//! 7. hydropower target-tracking deficit per plant
//! 8. squared and normalized irrigation deficits
//! 9. squared delta flow deficit

use crate::catchment::Catchment;
use crate::network::{Flow, Network, RoutingStep};
use crate::objectives::{Kpis, ObjectiveSeries, StepObjectives};
use basin_control::irrigation::IrrigationRule;
use basin_control::policy::PolicyRegistry;
use basin_math::stats::{normalized_deficit, squared_deficit};
use basin_types::error::{BasinError, BasinResult};
use basin_types::state::ReservoirTrajectory;
use basin_types::tables::write_rows;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Initialized,
    Running,
    Completed,
}

/// Per-step record of one hydropower plant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlantSeries {
    /// Flow through the turbines (m³/s).
    pub turbine_flow: Vec<f64>,
    /// Annualised production (TWh/year).
    pub production: Vec<f64>,
    /// Absolute gap to the period target (TWh/year).
    pub deficit: Vec<f64>,
}

impl PlantSeries {
    fn with_capacity(horizon: usize) -> Self {
        PlantSeries {
            turbine_flow: Vec::with_capacity(horizon),
            production: Vec::with_capacity(horizon),
            deficit: Vec::with_capacity(horizon),
        }
    }

    /// One row per timestep: turbine flow, production, deficit.
    pub fn rows(&self) -> Vec<[f64; 3]> {
        (0..self.deficit.len())
            .map(|t| [self.turbine_flow[t], self.production[t], self.deficit[t]])
            .collect()
    }
}

/// Flows of the timestep being routed, indexed like the network.
struct StepFlows {
    inflow: Vec<f64>,
    arrivals: Vec<f64>,
    release: Vec<f64>,
    diversion: Vec<f64>,
}

impl StepFlows {
    fn value(&self, network: &Network, f: Flow) -> f64 {
        match f {
            Flow::Catchment(c) => self.inflow[c.0],
            Flow::Release(r) => self.release[r.0],
            Flow::Delayed(r) => network.delay_from(r).map_or(0.0, |i| self.arrivals[i]),
            Flow::Diversion(d) => self.diversion[d.0],
        }
    }
}

/// Everything one run produces. Created fresh by `initialize`.
#[derive(Debug, Clone)]
pub struct NetworkState {
    pub reservoirs: Vec<ReservoirTrajectory>,
    /// One series per hydropower plant, in registration order.
    pub plants: Vec<PlantSeries>,
    /// Diversion per district, one entry per timestep.
    pub diversions: Vec<Vec<f64>>,
    pub period_of_year: Vec<usize>,
    pub total_inflow: Vec<f64>,
    pub delta_flow: Vec<f64>,
    /// Arrivals per transport delay, indexed by arrival timestep.
    delay_buffers: Vec<Vec<f64>>,
    previous_total_inflow: f64,
}

impl NetworkState {
    fn new(network: &Network, horizon: usize) -> Self {
        let delay_buffers = network
            .delays
            .iter()
            .map(|d| {
                let mut buf = vec![0.0; horizon + d.lag];
                for (slot, v) in buf.iter_mut().zip(&d.initial).take(d.lag) {
                    *slot = *v;
                }
                buf
            })
            .collect();
        NetworkState {
            reservoirs: network
                .reservoirs
                .iter()
                .map(|r| ReservoirTrajectory::new(r.initial_storage(), horizon))
                .collect(),
            plants: vec![PlantSeries::with_capacity(horizon); network.plants.len()],
            diversions: vec![Vec::with_capacity(horizon); network.districts.len()],
            period_of_year: Vec::with_capacity(horizon),
            total_inflow: Vec::with_capacity(horizon),
            delta_flow: Vec::with_capacity(horizon),
            delay_buffers,
            previous_total_inflow: network.initial_total_inflow,
        }
    }

    pub fn storage(&self, index: usize) -> f64 {
        self.reservoirs[index].current_storage()
    }

    pub fn previous_total_inflow(&self) -> f64 {
        self.previous_total_inflow
    }

    /// Delayed release arriving at timestep `t` through delay `index`.
    pub fn delayed_arrival(&self, index: usize, t: usize) -> f64 {
        self.delay_buffers[index][t]
    }

    /// One file per reservoir (`<name>.txt`: inflow, start level, start
    /// storage, end storage, decision, release), one per hydropower plant
    /// (`<name>_hydropower.txt`: turbine flow, production, deficit), plus
    /// `irrigation.txt` and `delta.txt`.
    pub fn write_tables(&self, network: &Network, dir: &Path) -> BasinResult<()> {
        std::fs::create_dir_all(dir)?;
        for (reservoir, traj) in network.reservoirs.iter().zip(&self.reservoirs) {
            write_rows(&dir.join(format!("{}.txt", reservoir.name())), &traj.rows())?;
        }
        for (plant, series) in network.plants.iter().zip(&self.plants) {
            write_rows(&dir.join(format!("{}_hydropower.txt", plant.name)), &series.rows())?;
        }
        let steps = self.period_of_year.len();
        let irrigation: Vec<Vec<f64>> = (0..steps)
            .map(|t| self.diversions.iter().map(|d| d[t]).collect())
            .collect();
        write_rows(&dir.join("irrigation.txt"), &irrigation)?;
        let delta: Vec<[f64; 1]> = self.delta_flow.iter().map(|&q| [q]).collect();
        write_rows(&dir.join("delta.txt"), &delta)?;
        log::debug!("wrote {steps}-step trajectory tables to {}", dir.display());
        Ok(())
    }
}

pub struct NetworkSimulator<'a> {
    network: &'a Network,
    catchments: &'a [Catchment],
    horizon: usize,
    phase: Phase,
    t: usize,
    state: Option<NetworkState>,
    objectives: ObjectiveSeries,
}

impl<'a> NetworkSimulator<'a> {
    pub fn new(network: &'a Network, catchments: &'a [Catchment], horizon: usize) -> BasinResult<Self> {
        network.validate()?;
        if horizon == 0 {
            return Err(BasinError::ConfigError("horizon must be positive".to_string()));
        }
        if catchments.len() != network.n_catchments {
            return Err(BasinError::ConfigError(format!(
                "network expects {} catchments, got {}",
                network.n_catchments,
                catchments.len()
            )));
        }
        if let Some(c) = catchments.iter().find(|c| c.len() < horizon) {
            return Err(BasinError::ConfigError(format!(
                "catchment '{}' has {} values for a horizon of {horizon}",
                c.name(),
                c.len()
            )));
        }
        Ok(NetworkSimulator {
            network,
            catchments,
            horizon,
            phase: Phase::Idle,
            t: 0,
            state: None,
            objectives: ObjectiveSeries::default(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn current_step(&self) -> usize {
        self.t
    }

    pub fn network(&self) -> &Network {
        self.network
    }

    pub fn state(&self) -> Option<&NetworkState> {
        self.state.as_ref()
    }

    pub fn objectives(&self) -> &ObjectiveSeries {
        &self.objectives
    }

    /// Fresh state at the initial storages; valid from any phase.
    pub fn initialize(&mut self) {
        self.state = Some(NetworkState::new(self.network, self.horizon));
        self.objectives.clear();
        self.t = 0;
        self.phase = Phase::Initialized;
    }

    fn state_ref(&self) -> BasinResult<&NetworkState> {
        self.state
            .as_ref()
            .ok_or_else(|| BasinError::ConfigError("simulator not initialized".to_string()))
    }

    /// Release-policy input for the current timestep.
    pub fn policy_input(&self) -> BasinResult<Vec<f64>> {
        let state = self.state_ref()?;
        let mut input: Vec<f64> = self
            .network
            .decision_order
            .iter()
            .map(|id| state.storage(id.0))
            .collect();
        input.push(self.network.calendar.period_of_year(self.t) as f64);
        input.push(state.previous_total_inflow);
        Ok(input)
    }

    /// Advance one timestep with explicit release decisions, given in
    /// `decision_order`. The irrigation rule is needed only by networks
    /// with diversions.
    pub fn step_with_decisions(
        &mut self,
        decisions: &[f64],
        irrigation: Option<&IrrigationRule>,
    ) -> BasinResult<StepObjectives> {
        let t = self.t;
        if t >= self.horizon {
            return Err(BasinError::HorizonExceeded {
                step: t,
                horizon: self.horizon,
            });
        }
        let network = self.network;
        if decisions.len() != network.n_decisions() {
            return Err(BasinError::ConfigError(format!(
                "expected {} release decisions, got {}",
                network.n_decisions(),
                decisions.len()
            )));
        }
        let catchments = self.catchments;
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| BasinError::ConfigError("simulator not initialized".to_string()))?;

        let ctx = network.calendar.context(t);
        let slot = ctx.slot();

        let mut flows = StepFlows {
            inflow: catchments.iter().map(|c| c.inflow_at(t)).collect(),
            arrivals: state.delay_buffers.iter().map(|b| b[t]).collect(),
            release: vec![0.0; network.reservoirs.len()],
            diversion: vec![0.0; network.districts.len()],
        };
        let total_inflow = flows.inflow.iter().sum::<f64>() + flows.arrivals.iter().sum::<f64>();

        let mut decision = vec![0.0; network.reservoirs.len()];
        for (id, u) in network.decision_order.iter().zip(decisions) {
            decision[id.0] = *u;
        }

        let mut start_level = vec![0.0; network.reservoirs.len()];

        for step in &network.routing {
            match step {
                RoutingStep::Reservoir { id, inflow: expr } => {
                    let q = expr.eval(|f| flows.value(network, f));
                    let reservoir = network.reservoir(*id);
                    let traj = &mut state.reservoirs[id.0];
                    let s0 = traj.current_storage();
                    let h0 = reservoir.storage_to_level(s0);
                    let out = reservoir.integrate(&ctx, reservoir.substeps(ctx.days), s0, decision[id.0], q);

                    traj.storage.push(out.storage);
                    traj.level.push(h0);
                    traj.decision.push(decision[id.0]);
                    traj.release.push(out.mean_release);
                    traj.inflow.push(q);
                    start_level[id.0] = h0;
                    flows.release[id.0] = out.mean_release;

                    if let Some(i) = network.delay_from(*id) {
                        let delay = &network.delays[i];
                        let scale = ctx.days as f64 / delay.delay_days[slot] as f64;
                        state.delay_buffers[i][t + delay.lag] = out.mean_release * scale;
                    }
                }
                RoutingStep::Divert { district, source } => {
                    let available = source.eval(|f| flows.value(network, f));
                    let demand = network.districts[district.0].demand[slot];
                    let rule = irrigation.ok_or_else(|| {
                        BasinError::ConfigError(
                            "network diverts water but no irrigation policy is given".to_string(),
                        )
                    })?;
                    flows.diversion[district.0] = rule.diversion(available, demand, district.0)?;
                }
            }
        }

        let value = |f: Flow| flows.value(network, f);

        let mut hydropower = Vec::with_capacity(network.plants.len());
        for (p, series) in network.plants.iter().zip(state.plants.iter_mut()) {
            let (q, h0) = (flows.release[p.reservoir.0], start_level[p.reservoir.0]);
            let deficit = p.deficit(q, h0, ctx.days, ctx.period_of_year);
            series.turbine_flow.push(p.turbine_flow(q));
            series.production.push(p.production(q, h0, ctx.days));
            series.deficit.push(deficit);
            hydropower.push(deficit);
        }

        let mut irrigation_squared = Vec::with_capacity(network.districts.len());
        let mut irrigation_normalized = Vec::with_capacity(network.districts.len());
        for (d, district) in network.districts.iter().enumerate() {
            let demand = district.demand[slot];
            let sq = squared_deficit(demand, flows.diversion[d]);
            irrigation_squared.push(sq);
            irrigation_normalized.push(normalized_deficit(sq, demand));
            state.diversions[d].push(flows.diversion[d]);
        }

        let (delta_flow, environment) = match &network.delta {
            Some(delta) => {
                let q = delta.outflow.eval(value);
                (q, squared_deficit(delta.min_flow[slot], q))
            }
            None => (0.0, 0.0),
        };

        let run_of_river = network
            .run_of_river
            .iter()
            .map(|p| p.production(p.source.eval(value), ctx.days, ctx.period_of_year))
            .collect();

        state.period_of_year.push(ctx.period_of_year);
        state.total_inflow.push(total_inflow);
        state.delta_flow.push(delta_flow);
        state.previous_total_inflow = total_inflow;

        let objectives = StepObjectives {
            hydropower,
            irrigation_squared,
            irrigation_normalized,
            environment,
            run_of_river,
        };
        log::trace!(
            "t={t} period={} total_inflow={total_inflow:.3} hyd={:.6} env={:.3} irr={:.6}",
            ctx.period_of_year,
            objectives.total_hydropower(),
            objectives.environment,
            objectives.total_irrigation()
        );
        self.objectives.push(objectives.clone());

        self.t += 1;
        self.phase = if self.t == self.horizon {
            Phase::Completed
        } else {
            Phase::Running
        };
        Ok(objectives)
    }

    /// Advance one timestep, taking decisions from the release policy.
    pub fn step(&mut self, policies: &PolicyRegistry) -> BasinResult<StepObjectives> {
        if self.t >= self.horizon {
            return Err(BasinError::HorizonExceeded {
                step: self.t,
                horizon: self.horizon,
            });
        }
        let input = self.policy_input()?;
        let decisions = policies.release()?.norm_output(&input)?;
        self.step_with_decisions(decisions.as_slice().unwrap_or(&[]), policies.irrigation().ok())
    }

    /// Full horizon from the initial storages.
    pub fn run(&mut self, policies: &PolicyRegistry) -> BasinResult<Kpis> {
        let release = policies.release()?;
        if release.n_inputs() != self.network.n_policy_inputs()
            || release.n_outputs() != self.network.n_decisions()
        {
            return Err(BasinError::ConfigError(format!(
                "release policy maps {} inputs to {} outputs; network needs {} to {}",
                release.n_inputs(),
                release.n_outputs(),
                self.network.n_policy_inputs(),
                self.network.n_decisions()
            )));
        }
        self.initialize();
        while self.t < self.horizon {
            self.step(policies)?;
        }
        let kpis = self.objectives.kpis();
        log::debug!(
            "run complete: {} steps, hyd={:.6} env={:.3} irr={:.6}",
            self.horizon,
            kpis.hydropower,
            kpis.environment,
            kpis.irrigation
        );
        Ok(kpis)
    }
}
