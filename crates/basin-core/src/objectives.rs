// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Objectives
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-step objective values and their long-run aggregation.
//!
//! Within one run every objective is a time average. Across replications
//! hydropower is averaged, while environment and irrigation take the 99th
//! percentile.

use basin_math::stats::{mean, percentile};
use basin_types::constants::RISK_PERCENTILE;
use basin_types::error::{BasinError, BasinResult};
use serde::{Deserialize, Serialize};

/// Objective categories, all minimised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    Hydropower,
    Environment,
    Irrigation,
}

/// Objective contributions of one timestep.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepObjectives {
    /// |production − target| per plant (TWh/year).
    pub hydropower: Vec<f64>,
    /// max(demand − diversion, 0)² per district.
    pub irrigation_squared: Vec<f64>,
    /// Squared deficit over squared demand per district.
    pub irrigation_normalized: Vec<f64>,
    /// Squared delta flow deficit.
    pub environment: f64,
    /// Run-of-river production per plant (TWh/year); diagnostic only.
    pub run_of_river: Vec<f64>,
}

impl StepObjectives {
    pub fn total_hydropower(&self) -> f64 {
        self.hydropower.iter().sum()
    }

    pub fn total_irrigation(&self) -> f64 {
        self.irrigation_normalized.iter().sum()
    }

    pub fn value(&self, objective: Objective) -> f64 {
        match objective {
            Objective::Hydropower => self.total_hydropower(),
            Objective::Environment => self.environment,
            Objective::Irrigation => self.total_irrigation(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectiveSeries {
    steps: Vec<StepObjectives>,
}

impl ObjectiveSeries {
    pub fn push(&mut self, step: StepObjectives) {
        self.steps.push(step);
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn steps(&self) -> &[StepObjectives] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn column<F: Fn(&StepObjectives) -> f64>(&self, f: F) -> f64 {
        mean(&self.steps.iter().map(f).collect::<Vec<_>>())
    }

    /// Time averages of every series.
    pub fn kpis(&self) -> Kpis {
        let n_districts = self.steps.first().map_or(0, |s| s.irrigation_normalized.len());
        let n_plants = self.steps.first().map_or(0, |s| s.hydropower.len());
        Kpis {
            hydropower: self.column(StepObjectives::total_hydropower),
            environment: self.column(|s| s.environment),
            irrigation: self.column(StepObjectives::total_irrigation),
            irrigation_by_district: (0..n_districts)
                .map(|d| self.column(|s| s.irrigation_normalized[d]))
                .collect(),
            hydropower_by_plant: (0..n_plants)
                .map(|p| self.column(|s| s.hydropower[p]))
                .collect(),
        }
    }
}

/// Long-run objective values of a run or an ensemble of runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub hydropower: f64,
    pub environment: f64,
    pub irrigation: f64,
    pub irrigation_by_district: Vec<f64>,
    pub hydropower_by_plant: Vec<f64>,
}

impl Kpis {
    /// `[hydropower, environment, irrigation, districts.., plants..]`.
    pub fn to_vec(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(3 + self.irrigation_by_district.len() + self.hydropower_by_plant.len());
        v.push(self.hydropower);
        v.push(self.environment);
        v.push(self.irrigation);
        v.extend(&self.irrigation_by_district);
        v.extend(&self.hydropower_by_plant);
        v
    }

    pub fn get(&self, objective: Objective) -> f64 {
        match objective {
            Objective::Hydropower => self.hydropower,
            Objective::Environment => self.environment,
            Objective::Irrigation => self.irrigation,
        }
    }
}

/// Combine per-replication KPIs: mean for hydropower, 99th percentile for
/// environment and irrigation. A single replication is returned unchanged.
pub fn aggregate_replications(runs: &[Kpis]) -> BasinResult<Kpis> {
    match runs {
        [] => Err(BasinError::ConfigError(
            "cannot aggregate zero replications".to_string(),
        )),
        [only] => Ok(only.clone()),
        _ => {
            let n_districts = runs[0].irrigation_by_district.len();
            let n_plants = runs[0].hydropower_by_plant.len();
            if runs.iter().any(|k| {
                k.irrigation_by_district.len() != n_districts
                    || k.hydropower_by_plant.len() != n_plants
            }) {
                return Err(BasinError::ConfigError(
                    "replications disagree on objective layout".to_string(),
                ));
            }

            let gather = |f: fn(&Kpis) -> f64| runs.iter().map(f).collect::<Vec<_>>();
            let risk = |v: Vec<f64>| percentile(&v, RISK_PERCENTILE);

            Ok(Kpis {
                hydropower: mean(&gather(|k| k.hydropower)),
                environment: risk(gather(|k| k.environment)),
                irrigation: risk(gather(|k| k.irrigation)),
                irrigation_by_district: (0..n_districts)
                    .map(|d| risk(runs.iter().map(|k| k.irrigation_by_district[d]).collect()))
                    .collect(),
                hydropower_by_plant: (0..n_plants)
                    .map(|p| mean(&runs.iter().map(|k| k.hydropower_by_plant[p]).collect::<Vec<_>>()))
                    .collect(),
            })
        }
    }
}
