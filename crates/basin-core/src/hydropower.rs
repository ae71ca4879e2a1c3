// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Hydropower
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Hydropower production and target-tracking deficit.
//!
//! Production is reported as an annualised rate (TWh/year) so that each
//! period can be compared with the target curve directly.

use crate::network::{FlowExpr, ReservoirId};
use basin_types::constants::{GRAVITY, HOURS_PER_DAY, MEGA, PERIODS_PER_YEAR_ENERGY, WATER_DENSITY};

/// Annualised energy (TWh/year) of `flow` m³/s through `head` m for `days`.
///
/// `P = q · H · ρ · g · η · 24 · days / 1e6 · 12 / 1e6`
#[inline]
pub fn annualised_energy(flow: f64, head: f64, efficiency: f64, days: u32) -> f64 {
    flow * head * WATER_DENSITY * GRAVITY * efficiency * (HOURS_PER_DAY * days as f64) / MEGA
        * PERIODS_PER_YEAR_ENERGY
        / MEGA
}

/// Turbines sharing one head, fed by a fixed share of the release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurbineGroup {
    /// Fraction of the reservoir release routed to this group.
    pub share: f64,
    /// Turbine discharge capacity (m³/s).
    pub max_flow: f64,
    /// Head at full supply level (m).
    pub rated_head: f64,
    pub efficiency: f64,
}

impl TurbineGroup {
    pub fn single(max_flow: f64, rated_head: f64, efficiency: f64) -> Self {
        TurbineGroup {
            share: 1.0,
            max_flow,
            rated_head,
            efficiency,
        }
    }

    pub fn turbine_flow(&self, release: f64) -> f64 {
        (release * self.share).min(self.max_flow)
    }
}

#[derive(Debug, Clone)]
pub struct HydropowerPlant {
    pub name: String,
    pub reservoir: ReservoirId,
    /// Reservoir level at which the rated head applies (m a.s.l.).
    pub full_supply_level: f64,
    pub groups: Vec<TurbineGroup>,
    /// Target production per period of year (TWh/year).
    pub target: Vec<f64>,
}

impl HydropowerPlant {
    pub fn turbine_flow(&self, release: f64) -> f64 {
        self.groups.iter().map(|g| g.turbine_flow(release)).sum()
    }

    /// Production for a period-mean `release` with reservoir `level` at the
    /// start of the period.
    pub fn production(&self, release: f64, level: f64, days: u32) -> f64 {
        let drawdown = self.full_supply_level - level;
        self.groups
            .iter()
            .map(|g| {
                annualised_energy(g.turbine_flow(release), g.rated_head - drawdown, g.efficiency, days)
            })
            .sum()
    }

    /// Absolute gap to the target of a 1-based period of year.
    pub fn deficit(&self, release: f64, level: f64, days: u32, period_of_year: usize) -> f64 {
        (self.production(release, level, days) - self.target[period_of_year - 1]).abs()
    }
}

/// Run-of-river plant fed by whatever natural flow exceeds its
/// environmental requirement. Reported, not optimised.
#[derive(Debug, Clone)]
pub struct RunOfRiverPlant {
    pub name: String,
    pub source: FlowExpr,
    /// Flow that must bypass the turbines, per period of year (m³/s).
    pub requirement: Vec<f64>,
    pub max_flow: f64,
    pub head: f64,
    pub efficiency: f64,
}

impl RunOfRiverPlant {
    pub fn production(&self, available: f64, days: u32, period_of_year: usize) -> f64 {
        let flow = (available - self.requirement[period_of_year - 1])
            .max(0.0)
            .min(self.max_flow);
        annualised_energy(flow, self.head, self.efficiency, days)
    }
}
