// ─────────────────────────────────────────────────────────────────────
// Basin Sim — RBF Policy
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Gaussian radial-basis-function release policy.
//!
//! Inputs are normalized into [0, 1] with the declared input bounds, each
//! structure contributes `exp(-Σ (x_i - c_i)² / b_i²)`, outputs are a biased
//! weighted sum clipped to [0, 1] and denormalized to the output bounds.
//!
//! Flat parameter layout (`M` outputs, `K` inputs, `N` structures):
//! `[β_1..β_M, (c_11, b_11, .., c_1K, b_1K, w_11..w_1M), .., (c_N1, ..)]`.

use basin_math::scaling::{denormalize_vector, normalize_vector};
use basin_types::constants::RBF_MIN_WIDTH_SQ;
use basin_types::error::{BasinError, BasinResult};
use ndarray::{Array1, Array2};

#[derive(Debug, Clone)]
struct RbfParams {
    /// Output bias [M].
    bias: Array1<f64>,
    /// Kernel centers [N, K].
    centers: Array2<f64>,
    /// Kernel widths [N, K].
    widths: Array2<f64>,
    /// Output weights [N, M].
    weights: Array2<f64>,
}

#[derive(Debug, Clone)]
pub struct Rbf {
    n_inputs: usize,
    n_outputs: usize,
    n_structures: usize,
    input_min: Vec<f64>,
    input_max: Vec<f64>,
    output_min: Vec<f64>,
    output_max: Vec<f64>,
    params: Option<RbfParams>,
}

fn check_bounds(what: &str, min: &[f64], max: &[f64], n: usize) -> BasinResult<()> {
    if min.len() != n || max.len() != n {
        return Err(BasinError::ConfigError(format!(
            "RBF {what} bounds need {n} entries, got min={} max={}",
            min.len(),
            max.len()
        )));
    }
    if !min.iter().chain(max).all(|v| v.is_finite()) {
        return Err(BasinError::ConfigError(format!(
            "RBF {what} bounds contain non-finite values"
        )));
    }
    Ok(())
}

impl Rbf {
    /// Network with unit bounds on every input and output.
    pub fn new(n_inputs: usize, n_outputs: usize, n_structures: usize) -> BasinResult<Self> {
        if n_inputs == 0 || n_outputs == 0 || n_structures == 0 {
            return Err(BasinError::ConfigError(format!(
                "RBF dimensions must be positive: inputs={n_inputs} outputs={n_outputs} structures={n_structures}"
            )));
        }
        Ok(Rbf {
            n_inputs,
            n_outputs,
            n_structures,
            input_min: vec![0.0; n_inputs],
            input_max: vec![1.0; n_inputs],
            output_min: vec![0.0; n_outputs],
            output_max: vec![1.0; n_outputs],
            params: None,
        })
    }

    pub fn set_input_bounds(&mut self, min: &[f64], max: &[f64]) -> BasinResult<()> {
        check_bounds("input", min, max, self.n_inputs)?;
        self.input_min = min.to_vec();
        self.input_max = max.to_vec();
        Ok(())
    }

    pub fn set_output_bounds(&mut self, min: &[f64], max: &[f64]) -> BasinResult<()> {
        check_bounds("output", min, max, self.n_outputs)?;
        self.output_min = min.to_vec();
        self.output_max = max.to_vec();
        Ok(())
    }

    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    pub fn n_structures(&self) -> usize {
        self.n_structures
    }

    pub fn output_bounds(&self) -> (&[f64], &[f64]) {
        (&self.output_min, &self.output_max)
    }

    /// `M + N·(2K + M)`.
    pub fn n_parameters(&self) -> usize {
        self.n_outputs + self.n_structures * (2 * self.n_inputs + self.n_outputs)
    }

    pub fn has_parameters(&self) -> bool {
        self.params.is_some()
    }

    pub fn set_parameters(&mut self, theta: &[f64]) -> BasinResult<()> {
        let expected = self.n_parameters();
        if theta.len() != expected {
            return Err(BasinError::ParameterLength {
                expected,
                got: theta.len(),
            });
        }
        let (k, m, n) = (self.n_inputs, self.n_outputs, self.n_structures);

        let bias = Array1::from_vec(theta[..m].to_vec());
        let mut centers = Array2::zeros((n, k));
        let mut widths = Array2::zeros((n, k));
        let mut weights = Array2::zeros((n, m));

        let mut pos = m;
        for j in 0..n {
            for i in 0..k {
                centers[[j, i]] = theta[pos];
                widths[[j, i]] = theta[pos + 1];
                pos += 2;
            }
            for o in 0..m {
                weights[[j, o]] = theta[pos];
                pos += 1;
            }
        }

        self.params = Some(RbfParams {
            bias,
            centers,
            widths,
            weights,
        });
        Ok(())
    }

    /// Flat parameter vector in assignment layout, if assigned.
    pub fn parameters(&self) -> Option<Vec<f64>> {
        let p = self.params.as_ref()?;
        let mut theta = Vec::with_capacity(self.n_parameters());
        theta.extend(p.bias.iter());
        for j in 0..self.n_structures {
            for i in 0..self.n_inputs {
                theta.push(p.centers[[j, i]]);
                theta.push(p.widths[[j, i]]);
            }
            theta.extend(p.weights.row(j).iter());
        }
        Some(theta)
    }

    pub fn clear_parameters(&mut self) {
        self.params = None;
    }

    /// Network response to an already-normalized input, in [0, 1].
    pub fn output(&self, input: &[f64]) -> BasinResult<Array1<f64>> {
        let p = self.params.as_ref().ok_or_else(|| {
            BasinError::ConfigError("RBF policy evaluated before parameters were assigned".to_string())
        })?;
        if input.len() != self.n_inputs {
            return Err(BasinError::ConfigError(format!(
                "RBF expects {} inputs, got {}",
                self.n_inputs,
                input.len()
            )));
        }

        let phi: Array1<f64> = (0..self.n_structures)
            .map(|j| {
                let bf: f64 = (0..self.n_inputs)
                    .map(|i| {
                        let d = input[i] - p.centers[[j, i]];
                        let w = p.widths[[j, i]];
                        d * d / (w * w).max(RBF_MIN_WIDTH_SQ)
                    })
                    .sum();
                (-bf).exp()
            })
            .collect();

        let y = &p.bias + &p.weights.t().dot(&phi);
        Ok(y.mapv(|v| v.clamp(0.0, 1.0)))
    }

    /// Network response in physical units: normalize, evaluate, denormalize.
    pub fn norm_output(&self, input: &[f64]) -> BasinResult<Array1<f64>> {
        if input.len() != self.n_inputs {
            return Err(BasinError::ConfigError(format!(
                "RBF expects {} inputs, got {}",
                self.n_inputs,
                input.len()
            )));
        }
        let z = normalize_vector(input, &self.input_min, &self.input_max);
        let y = self.output(z.as_slice().unwrap_or(&[]))?;
        Ok(denormalize_vector(
            y.as_slice().unwrap_or(&[]),
            &self.output_min,
            &self.output_max,
        ))
    }
}
