// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Evaluator
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Parameter-vector evaluation over an inflow ensemble.
//!
//! Replications share the network and the policies read-only and run in
//! parallel with rayon; each owns its simulator state.

use crate::catchment::InflowEnsemble;
use crate::network::Network;
use crate::objectives::{aggregate_replications, Kpis};
use crate::simulator::NetworkSimulator;
use basin_control::policy::PolicyRegistry;
use basin_types::error::{BasinError, BasinResult};
use rayon::prelude::*;

pub struct Evaluator {
    network: Network,
    ensemble: InflowEnsemble,
    policies: PolicyRegistry,
    horizon: usize,
}

impl Evaluator {
    pub fn new(
        network: Network,
        ensemble: InflowEnsemble,
        policies: PolicyRegistry,
        horizon: usize,
    ) -> BasinResult<Self> {
        if ensemble.is_empty() {
            return Err(BasinError::ConfigError(
                "evaluator needs at least one inflow replication".to_string(),
            ));
        }
        // Construction checks topology and series lengths once up front.
        for member in ensemble.members() {
            NetworkSimulator::new(&network, member, horizon)?;
        }
        Ok(Evaluator {
            network,
            ensemble,
            policies,
            horizon,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    pub fn n_replications(&self) -> usize {
        self.ensemble.len()
    }

    /// Length of the decision-variable vector.
    pub fn n_variables(&self) -> usize {
        self.policies.free_parameter_count()
    }

    /// Length of `Kpis::to_vec`.
    pub fn n_objectives(&self) -> usize {
        3 + self.network.districts.len() + self.network.plants.len()
    }

    /// Assign `theta`, simulate every replication, aggregate, and clear the
    /// parameters again whatever the outcome.
    pub fn evaluate(&mut self, theta: &[f64]) -> BasinResult<Kpis> {
        self.policies.assign_free_parameters(theta)?;
        let result = self.run_replications();
        self.policies.clear_parameters();
        result
    }

    fn run_replications(&self) -> BasinResult<Kpis> {
        let runs = self
            .ensemble
            .members()
            .par_iter()
            .map(|catchments| {
                let mut sim = NetworkSimulator::new(&self.network, catchments, self.horizon)?;
                sim.run(&self.policies)
            })
            .collect::<BasinResult<Vec<Kpis>>>()?;
        log::debug!("evaluated {} replications over {} steps", runs.len(), self.horizon);
        aggregate_replications(&runs)
    }
}
