//! Mathematical primitives for the reservoir-network engine.

pub mod interp;
pub mod scaling;
pub mod stats;
