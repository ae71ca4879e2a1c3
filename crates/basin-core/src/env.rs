// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Step Environment
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Reset/step facade for external controllers.
//!
//! Actions are normalized release decisions in [0, 1], one per reservoir in
//! decision order, scaled by the release policy's output bounds. Rewards
//! are the negated per-step objective values.

use crate::catchment::Catchment;
use crate::network::Network;
use crate::objectives::Objective;
use crate::simulator::{NetworkSimulator, Phase};
use basin_control::policy::PolicyRegistry;
use basin_math::scaling::denormalize_vector;
use basin_types::error::{BasinError, BasinResult};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Storage per reservoir in decision order (m³).
    pub storages: Vec<f64>,
    pub levels: Vec<f64>,
    /// Period of year of the next step.
    pub period_of_year: usize,
    pub previous_total_inflow: f64,
}

impl Observation {
    /// Same layout as the release-policy input, followed by the levels.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut v = self.storages.clone();
        v.push(self.period_of_year as f64);
        v.push(self.previous_total_inflow);
        v.extend(&self.levels);
        v
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    /// Steps taken since the last reset.
    pub step: usize,
    pub period_of_year: usize,
    /// Period-mean release per reservoir in decision order (m³/s).
    pub releases: Vec<f64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub observation: Observation,
    pub reward: BTreeMap<Objective, f64>,
    /// Some storage became non-finite.
    pub terminated: bool,
    pub truncated: bool,
    pub info: Info,
}

pub struct BasinEnv<'a> {
    sim: NetworkSimulator<'a>,
    policies: &'a PolicyRegistry,
    seed: Option<u64>,
}

impl<'a> BasinEnv<'a> {
    /// The registry supplies the output bounds of the release policy and,
    /// for networks with diversions, a parameterised irrigation rule.
    pub fn new(
        network: &'a Network,
        catchments: &'a [Catchment],
        policies: &'a PolicyRegistry,
        horizon: usize,
    ) -> BasinResult<Self> {
        let release = policies.release()?;
        if release.n_outputs() != network.n_decisions() {
            return Err(BasinError::ConfigError(format!(
                "release policy has {} outputs, network has {} reservoirs",
                release.n_outputs(),
                network.n_decisions()
            )));
        }
        Ok(BasinEnv {
            sim: NetworkSimulator::new(network, catchments, horizon)?,
            policies,
            seed: None,
        })
    }

    pub fn n_actions(&self) -> usize {
        self.sim.network().n_decisions()
    }

    pub fn horizon(&self) -> usize {
        self.sim.horizon()
    }

    pub fn simulator(&self) -> &NetworkSimulator<'a> {
        &self.sim
    }

    /// Restart from the initial storages. The seed is echoed in `Info`;
    /// inflows are whatever series the environment was built on.
    pub fn reset(&mut self, seed: Option<u64>) -> BasinResult<(Observation, Info)> {
        self.seed = seed;
        self.sim.initialize();
        let observation = self.observe()?;
        let info = Info {
            step: 0,
            period_of_year: observation.period_of_year,
            releases: vec![0.0; self.n_actions()],
            seed,
        };
        Ok((observation, info))
    }

    pub fn step(&mut self, action: &[f64]) -> BasinResult<Transition> {
        if self.sim.phase() == Phase::Idle {
            return Err(BasinError::ConfigError(
                "environment stepped before reset".to_string(),
            ));
        }
        let n = self.n_actions();
        if action.len() != n {
            return Err(BasinError::ParameterLength {
                expected: n,
                got: action.len(),
            });
        }
        let clamped: Vec<f64> = action.iter().map(|a| a.clamp(0.0, 1.0)).collect();
        let (lo, hi) = self.policies.release()?.output_bounds();
        let decisions = denormalize_vector(&clamped, lo, hi).to_vec();

        let period_of_year = self.sim.network().calendar.period_of_year(self.sim.current_step());
        let objectives = self
            .sim
            .step_with_decisions(&decisions, self.policies.irrigation().ok())?;

        let observation = self.observe()?;
        let network = self.sim.network();
        let releases = match self.sim.state() {
            Some(state) => network
                .decision_order
                .iter()
                .map(|id| state.reservoirs[id.0].release.last().copied().unwrap_or(0.0))
                .collect(),
            None => vec![0.0; n],
        };
        let reward = [Objective::Hydropower, Objective::Environment, Objective::Irrigation]
            .into_iter()
            .map(|o| (o, -objectives.value(o)))
            .collect();

        Ok(Transition {
            terminated: observation.storages.iter().any(|s| !s.is_finite()),
            truncated: false,
            observation,
            reward,
            info: Info {
                step: self.sim.current_step(),
                period_of_year,
                releases,
                seed: self.seed,
            },
        })
    }

    fn observe(&self) -> BasinResult<Observation> {
        let input = self.sim.policy_input()?;
        let network = self.sim.network();
        let n = network.n_decisions();
        let storages = input[..n].to_vec();
        let levels = network
            .decision_order
            .iter()
            .zip(&storages)
            .map(|(id, &s)| network.reservoir(*id).storage_to_level(s))
            .collect();
        Ok(Observation {
            storages,
            levels,
            period_of_year: input[n] as usize,
            previous_total_inflow: input[n + 1],
        })
    }
}
