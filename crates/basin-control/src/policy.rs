// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Policy Registry
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Policy functions and the registry that owns the flat parameter vector.
//!
//! The registry slices one flat vector contiguously across its policies in
//! registration order, so an external search can treat the whole decision
//! system as a single point in parameter space.

use crate::irrigation::IrrigationRule;
use crate::rbf::Rbf;
use basin_types::config::PolicyConfig;
use basin_types::error::{BasinError, BasinResult};

/// What a registered policy decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyRole {
    Release,
    Irrigation,
}

#[derive(Debug, Clone)]
pub enum PolicyFunction {
    Rbf(Rbf),
    Irrigation(IrrigationRule),
}

impl PolicyFunction {
    pub fn from_config(config: &PolicyConfig) -> BasinResult<Self> {
        match config {
            PolicyConfig::Rbf {
                n_inputs,
                n_outputs,
                n_structures,
                input_min,
                input_max,
                output_min,
                output_max,
            } => {
                let mut rbf = Rbf::new(*n_inputs, *n_outputs, *n_structures)?;
                rbf.set_input_bounds(input_min, input_max)?;
                rbf.set_output_bounds(output_min, output_max)?;
                Ok(PolicyFunction::Rbf(rbf))
            }
            PolicyConfig::Irrigation {
                n_districts,
                param_min,
                param_max,
                offsets,
            } => Ok(PolicyFunction::Irrigation(IrrigationRule::new(
                *n_districts,
                param_min,
                param_max,
                offsets.clone(),
            )?)),
        }
    }

    pub fn n_parameters(&self) -> usize {
        match self {
            PolicyFunction::Rbf(p) => p.n_parameters(),
            PolicyFunction::Irrigation(p) => p.n_parameters(),
        }
    }

    pub fn set_parameters(&mut self, theta: &[f64]) -> BasinResult<()> {
        match self {
            PolicyFunction::Rbf(p) => p.set_parameters(theta),
            PolicyFunction::Irrigation(p) => p.set_parameters(theta),
        }
    }

    pub fn parameters(&self) -> Option<Vec<f64>> {
        match self {
            PolicyFunction::Rbf(p) => p.parameters(),
            PolicyFunction::Irrigation(p) => p.parameters(),
        }
    }

    pub fn clear_parameters(&mut self) {
        match self {
            PolicyFunction::Rbf(p) => p.clear_parameters(),
            PolicyFunction::Irrigation(p) => p.clear_parameters(),
        }
    }

    pub fn has_parameters(&self) -> bool {
        match self {
            PolicyFunction::Rbf(p) => p.has_parameters(),
            PolicyFunction::Irrigation(p) => p.has_parameters(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    entries: Vec<(PolicyRole, PolicyFunction)>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a policy. Each role may be registered once.
    pub fn register(&mut self, role: PolicyRole, function: PolicyFunction) -> BasinResult<()> {
        if self.entries.iter().any(|(r, _)| *r == role) {
            return Err(BasinError::ConfigError(format!(
                "policy role {role:?} already registered"
            )));
        }
        match (role, &function) {
            (PolicyRole::Release, PolicyFunction::Rbf(_))
            | (PolicyRole::Irrigation, PolicyFunction::Irrigation(_)) => {}
            _ => {
                return Err(BasinError::ConfigError(format!(
                    "policy role {role:?} cannot be served by this function kind"
                )))
            }
        }
        self.entries.push((role, function));
        Ok(())
    }

    pub fn get(&self, role: PolicyRole) -> Option<&PolicyFunction> {
        self.entries.iter().find(|(r, _)| *r == role).map(|(_, f)| f)
    }

    pub fn release(&self) -> BasinResult<&Rbf> {
        match self.get(PolicyRole::Release) {
            Some(PolicyFunction::Rbf(rbf)) => Ok(rbf),
            _ => Err(BasinError::ConfigError(
                "no release policy registered".to_string(),
            )),
        }
    }

    pub fn irrigation(&self) -> BasinResult<&IrrigationRule> {
        match self.get(PolicyRole::Irrigation) {
            Some(PolicyFunction::Irrigation(rule)) => Ok(rule),
            _ => Err(BasinError::ConfigError(
                "no irrigation policy registered".to_string(),
            )),
        }
    }

    pub fn roles(&self) -> impl Iterator<Item = PolicyRole> + '_ {
        self.entries.iter().map(|(r, _)| *r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn free_parameter_count(&self) -> usize {
        self.entries.iter().map(|(_, f)| f.n_parameters()).sum()
    }

    /// Slice `theta` across the policies in registration order.
    ///
    /// A short vector fails without touching any policy; trailing entries
    /// beyond the total are ignored.
    pub fn assign_free_parameters(&mut self, theta: &[f64]) -> BasinResult<()> {
        let expected = self.free_parameter_count();
        if theta.len() < expected {
            return Err(BasinError::ParameterLength {
                expected,
                got: theta.len(),
            });
        }
        if theta.len() > expected {
            log::warn!(
                "ignoring {} surplus policy parameters ({} given, {expected} used)",
                theta.len() - expected,
                theta.len()
            );
        }
        let mut pos = 0;
        for (_, function) in &mut self.entries {
            let n = function.n_parameters();
            function.set_parameters(&theta[pos..pos + n])?;
            pos += n;
        }
        Ok(())
    }

    pub fn clear_parameters(&mut self) {
        for (_, function) in &mut self.entries {
            function.clear_parameters();
        }
    }

    /// Concatenated parameters, or `None` while any policy is unassigned.
    pub fn parameters(&self) -> Option<Vec<f64>> {
        let mut theta = Vec::with_capacity(self.free_parameter_count());
        for (_, function) in &self.entries {
            theta.extend(function.parameters()?);
        }
        Some(theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PolicyRegistry {
        let mut reg = PolicyRegistry::new();
        let irr = IrrigationRule::new(2, &[0.0, 0.0], &[100.0, 2.0], vec![0, 2]).unwrap();
        reg.register(PolicyRole::Irrigation, PolicyFunction::Irrigation(irr))
            .unwrap();
        let rbf = Rbf::new(2, 1, 1).unwrap();
        reg.register(PolicyRole::Release, PolicyFunction::Rbf(rbf)).unwrap();
        reg
    }

    #[test]
    fn test_parameter_partition_follows_registration_order() {
        let mut reg = registry();
        assert_eq!(reg.free_parameter_count(), 4 + 6);
        let theta: Vec<f64> = (0..10).map(|i| i as f64 / 10.0).collect();
        reg.assign_free_parameters(&theta).unwrap();
        assert_eq!(reg.irrigation().unwrap().parameters().unwrap(), &theta[..4]);
        assert_eq!(reg.release().unwrap().parameters().unwrap(), &theta[4..]);
        assert_eq!(reg.parameters().unwrap(), theta);
    }

    #[test]
    fn test_short_vector_rejected() {
        let mut reg = registry();
        let err = reg.assign_free_parameters(&[0.0; 9]).unwrap_err();
        assert!(matches!(err, BasinError::ParameterLength { expected: 10, got: 9 }));
        assert!(reg.parameters().is_none());
    }

    #[test]
    fn test_surplus_ignored() {
        let mut reg = registry();
        let theta = vec![0.5; 12];
        reg.assign_free_parameters(&theta).unwrap();
        assert_eq!(reg.parameters().unwrap().len(), 10);
    }

    #[test]
    fn test_clear_returns_to_unassigned() {
        let mut reg = registry();
        reg.assign_free_parameters(&[0.5; 10]).unwrap();
        reg.clear_parameters();
        assert!(reg.parameters().is_none());
        assert!(!reg.release().unwrap().has_parameters());
    }

    #[test]
    fn test_duplicate_and_mismatched_roles() {
        let mut reg = registry();
        let rbf = Rbf::new(1, 1, 1).unwrap();
        assert!(reg
            .register(PolicyRole::Release, PolicyFunction::Rbf(rbf.clone()))
            .is_err());
        let mut empty = PolicyRegistry::new();
        assert!(empty
            .register(PolicyRole::Irrigation, PolicyFunction::Rbf(rbf))
            .is_err());
        assert!(empty.release().is_err());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_from_config() {
        let cfg: PolicyConfig = serde_json::from_value(serde_json::json!({
            "kind": "rbf",
            "n_inputs": 2, "n_outputs": 1, "n_structures": 3,
            "input_min": [0.0, 1.0], "input_max": [10.0, 12.0],
            "output_min": [0.0], "output_max": [500.0]
        }))
        .unwrap();
        let f = PolicyFunction::from_config(&cfg).unwrap();
        assert_eq!(f.n_parameters(), 1 + 3 * 5);
        match f {
            PolicyFunction::Rbf(rbf) => assert_eq!(rbf.output_bounds().1, &[500.0]),
            other => panic!("Unexpected policy: {other:?}"),
        }

        let bad: PolicyConfig = serde_json::from_value(serde_json::json!({
            "kind": "rbf",
            "n_inputs": 2, "n_outputs": 1, "n_structures": 3,
            "input_min": [0.0], "input_max": [10.0],
            "output_min": [0.0], "output_max": [500.0]
        }))
        .unwrap();
        assert!(PolicyFunction::from_config(&bad).is_err());
    }
}
