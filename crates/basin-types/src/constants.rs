// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
/// Density of water (kg/m³).
pub const WATER_DENSITY: f64 = 1000.0;

/// Gravitational acceleration (m/s²). Rounded as in the plant ratings.
pub const GRAVITY: f64 = 9.81;

/// Seconds in one day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Hours in one day.
pub const HOURS_PER_DAY: f64 = 24.0;

/// Evaporation rates are tabulated in mm per period.
pub const MM_PER_M: f64 = 1000.0;

/// Wh → TWh and W → MW share this factor.
pub const MEGA: f64 = 1.0e6;

/// Monthly energy is annualised by this factor before comparison with targets.
pub const PERIODS_PER_YEAR_ENERGY: f64 = 12.0;

/// Smallest squared kernel width allowed in the RBF policy.
pub const RBF_MIN_WIDTH_SQ: f64 = 1.0e-6;

/// Percentile used for risk-averse objectives across replications.
pub const RISK_PERCENTILE: f64 = 99.0;
