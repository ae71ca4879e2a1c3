// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Basin Control
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Decision policies.
//!
//! Release approximator, irrigation diversion rule, and the registry that
//! spreads one flat parameter vector across them.

pub mod irrigation;
pub mod policy;
pub mod rbf;
