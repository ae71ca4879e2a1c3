//! Piecewise-linear lookup tables.
//!
//! Storage/level/surface relations, rating curves and tailwater curves are
//! all paired axes evaluated with linear interpolation inside the domain
//! and linear extrapolation outside it.

use basin_types::error::{BasinError, BasinResult};
use ndarray::Array2;

/// Slope of segment `k` (between breakpoints `k` and `k + 1`).
#[inline]
fn segment_slope(xs: &[f64], ys: &[f64], k: usize) -> f64 {
    (ys[k + 1] - ys[k]) / (xs[k + 1] - xs[k])
}

/// Linear interpolation of `ys` over `xs` at `x`.
///
/// Outside `[xs[0], xs[n-1]]` the nearest boundary segment is extended.
/// A query equal to a breakpoint returns the paired value exactly.
/// `xs` must be strictly increasing with at least two entries.
/// A NaN query returns NaN.
pub fn interp_lin(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    let last = xs.len() - 1;
    if x <= xs[0] {
        return ys[0] + segment_slope(xs, ys, 0) * (x - xs[0]);
    }
    if x >= xs[last] {
        return ys[last] + segment_slope(xs, ys, last - 1) * (x - xs[last]);
    }

    // xs[k] <= x < xs[k + 1]
    let k = xs.partition_point(|&v| v <= x) - 1;
    if xs[k] == x {
        return ys[k];
    }
    ys[k] + segment_slope(xs, ys, k) * (x - xs[k])
}

/// Validated pair of axes for [`interp_lin`].
#[derive(Debug, Clone, PartialEq)]
pub struct InterpTable {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl InterpTable {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> BasinResult<Self> {
        if x.len() < 2 {
            return Err(BasinError::ConfigError(format!(
                "interpolation table needs at least 2 breakpoints, got {}",
                x.len()
            )));
        }
        if x.len() != y.len() {
            return Err(BasinError::ConfigError(format!(
                "interpolation axes differ in length: {} vs {}",
                x.len(),
                y.len()
            )));
        }
        if !x.iter().chain(y.iter()).all(|v| v.is_finite()) {
            return Err(BasinError::ConfigError(
                "interpolation table contains non-finite values".to_string(),
            ));
        }
        if let Some(i) = x.windows(2).position(|w| w[1] <= w[0]) {
            return Err(BasinError::ConfigError(format!(
                "interpolation axis not strictly increasing at index {}: {} -> {}",
                i + 1,
                x[i],
                x[i + 1]
            )));
        }
        Ok(InterpTable { x, y })
    }

    /// Build from two rows of a tabulated relation.
    pub fn from_rows(table: &Array2<f64>, x_row: usize, y_row: usize) -> BasinResult<Self> {
        if x_row >= table.nrows() || y_row >= table.nrows() {
            return Err(BasinError::ConfigError(format!(
                "table has {} rows, requested rows {x_row} and {y_row}",
                table.nrows()
            )));
        }
        Self::new(table.row(x_row).to_vec(), table.row(y_row).to_vec())
    }

    pub fn eval(&self, x: f64) -> f64 {
        let (lo, hi) = self.domain();
        if x < lo || x > hi {
            log::trace!("extrapolating at {x} outside [{lo}, {hi}]");
        }
        interp_lin(&self.x, &self.y, x)
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Always false; construction requires two breakpoints.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}
