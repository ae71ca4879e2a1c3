// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Basin Core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Reservoir network simulation.
//!
//! Reservoir mass balance, catchment inflows, hydropower, the network
//! timestep loop, objective aggregation, ensemble evaluation, and the
//! Zambezi cascade assembled from a `BasinConfig`.

pub mod catchment;
pub mod env;
pub mod evaluate;
pub mod hydropower;
pub mod network;
pub mod objectives;
pub mod reservoir;
pub mod simulator;
pub mod zambezi;
