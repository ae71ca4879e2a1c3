// ─────────────────────────────────────────────────────────────────────
// Basin Sim — State
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

/// Timing of one outer timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodContext {
    /// Absolute timestep index, 0-based.
    pub index: usize,
    /// Period of year, 1-based.
    pub period_of_year: usize,
    /// Calendar days in this period.
    pub days: u32,
}

impl PeriodContext {
    pub fn new(index: usize, period_of_year: usize, days: u32) -> Self {
        PeriodContext {
            index,
            period_of_year,
            days,
        }
    }

    /// 0-based position into per-period-of-year series.
    pub fn slot(&self) -> usize {
        self.period_of_year - 1
    }
}

/// Outcome of integrating one reservoir over one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegrationResult {
    /// Storage at the end of the period (m³).
    pub storage: f64,
    /// Release averaged over all sub-steps (m³/s).
    pub mean_release: f64,
}

/// Per-reservoir sequences over one run.
///
/// `storage` has `horizon + 1` entries (initial condition first); the
/// other series have one entry per completed timestep.
#[derive(Debug, Clone, Default)]
pub struct ReservoirTrajectory {
    pub storage: Vec<f64>,
    pub level: Vec<f64>,
    pub decision: Vec<f64>,
    pub release: Vec<f64>,
    pub inflow: Vec<f64>,
}

impl ReservoirTrajectory {
    pub fn new(initial_storage: f64, horizon: usize) -> Self {
        let mut storage = Vec::with_capacity(horizon + 1);
        storage.push(initial_storage);
        ReservoirTrajectory {
            storage,
            level: Vec::with_capacity(horizon),
            decision: Vec::with_capacity(horizon),
            release: Vec::with_capacity(horizon),
            inflow: Vec::with_capacity(horizon),
        }
    }

    /// Storage at the start of the next timestep.
    pub fn current_storage(&self) -> f64 {
        self.storage.last().copied().unwrap_or(0.0)
    }

    /// Completed timesteps.
    pub fn len(&self) -> usize {
        self.release.len()
    }

    pub fn is_empty(&self) -> bool {
        self.release.is_empty()
    }

    /// One row per timestep: inflow, level, start storage, end storage,
    /// decision, release.
    pub fn rows(&self) -> Vec<[f64; 6]> {
        (0..self.len())
            .map(|t| {
                [
                    self.inflow[t],
                    self.level[t],
                    self.storage[t],
                    self.storage[t + 1],
                    self.decision[t],
                    self.release[t],
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_context_slot() {
        let ctx = PeriodContext::new(5, 12, 31);
        assert_eq!(ctx.slot(), 11);
    }

    #[test]
    fn test_trajectory_initialization() {
        let traj = ReservoirTrajectory::new(4.2e9, 240);
        assert_eq!(traj.storage.len(), 1);
        assert!(traj.is_empty());
        assert!((traj.current_storage() - 4.2e9).abs() < 1e-3);
        assert!(traj.rows().is_empty());
    }

    #[test]
    fn test_trajectory_rows() {
        let mut traj = ReservoirTrajectory::new(100.0, 2);
        traj.storage.push(90.0);
        traj.level.push(1.0);
        traj.decision.push(5.0);
        traj.release.push(4.0);
        traj.inflow.push(3.0);
        let rows = traj.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], [3.0, 1.0, 100.0, 90.0, 5.0, 4.0]);
        assert!((traj.current_storage() - 90.0).abs() < 1e-12);
    }
}
