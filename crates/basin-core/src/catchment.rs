// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Catchment
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Catchment inflow series and their Monte Carlo perturbations.

use basin_types::config::VectorRef;
use basin_types::error::{BasinError, BasinResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Catchment {
    name: String,
    inflow: Vec<f64>,
}

impl Catchment {
    pub fn new(name: impl Into<String>, inflow: Vec<f64>) -> Self {
        Catchment {
            name: name.into(),
            inflow,
        }
    }

    pub fn from_table(name: &str, table: &VectorRef, base: &Path) -> BasinResult<Self> {
        Ok(Catchment::new(name, table.load(base)?))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inflow at absolute timestep `t` (m³/s).
    ///
    /// # Panics
    /// When `t` is beyond the series. Simulators check the length up front.
    #[inline]
    pub fn inflow_at(&self, t: usize) -> f64 {
        self.inflow[t]
    }

    pub fn len(&self) -> usize {
        self.inflow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflow.is_empty()
    }

    pub fn series(&self) -> &[f64] {
        &self.inflow
    }

    /// Copy with every value scaled by an independent draw of `factor`.
    pub fn perturbed<R: Rng + ?Sized, D: Distribution<f64>>(&self, rng: &mut R, factor: &D) -> Self {
        Catchment {
            name: self.name.clone(),
            inflow: self.inflow.iter().map(|q| q * factor.sample(rng)).collect(),
        }
    }
}

/// Catchment sets, one per replication.
#[derive(Debug, Clone)]
pub struct InflowEnsemble {
    members: Vec<Vec<Catchment>>,
}

impl InflowEnsemble {
    /// The historical series as the only member.
    pub fn single(base: Vec<Catchment>) -> Self {
        InflowEnsemble {
            members: vec![base],
        }
    }

    /// Caller-supplied replications, e.g. synthetic streamflow scenarios.
    pub fn from_members(members: Vec<Vec<Catchment>>) -> BasinResult<Self> {
        let width = members.first().map(Vec::len).ok_or_else(|| {
            BasinError::ConfigError("ensemble needs at least one member".to_string())
        })?;
        if let Some(i) = members.iter().position(|m| m.len() != width) {
            return Err(BasinError::ConfigError(format!(
                "ensemble member {i} has {} catchments, member 0 has {width}",
                members[i].len()
            )));
        }
        Ok(InflowEnsemble { members })
    }

    /// `n` identical copies of the historical series.
    pub fn repeated(base: Vec<Catchment>, n: usize) -> Self {
        InflowEnsemble {
            members: vec![base; n.max(1)],
        }
    }

    /// `n` members with multiplicative log-normal noise of shape `sigma`.
    ///
    /// The location is `-σ²/2`, so each factor has unit mean. Member `i`
    /// draws from `StdRng::seed_from_u64(seed + i)`.
    pub fn lognormal(base: &[Catchment], n: usize, sigma: f64, seed: u64) -> BasinResult<Self> {
        if n == 0 {
            return Err(BasinError::ConfigError(
                "ensemble needs at least one member".to_string(),
            ));
        }
        if !(sigma.is_finite() && sigma >= 0.0) {
            return Err(BasinError::ConfigError(format!(
                "ensemble sigma must be finite and non-negative, got {sigma}"
            )));
        }
        let factor = LogNormal::new(-0.5 * sigma * sigma, sigma)
            .map_err(|e| BasinError::ConfigError(format!("invalid log-normal ensemble: {e}")))?;

        let members = (0..n as u64)
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i));
                base.iter().map(|c| c.perturbed(&mut rng, &factor)).collect()
            })
            .collect();
        log::debug!("built {n}-member log-normal inflow ensemble (sigma = {sigma}, seed = {seed})");
        Ok(InflowEnsemble { members })
    }

    pub fn members(&self) -> &[Vec<Catchment>] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
