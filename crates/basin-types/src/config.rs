// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use crate::error::{BasinError, BasinResult};
use crate::tables;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level model configuration for the Zambezi cascade.
///
/// Numeric series live in flat tables referenced by path; paths resolve
/// against `data_dir`, which itself resolves against the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasinConfig {
    pub name: String,
    #[serde(default)]
    pub data_dir: PathBuf,
    pub simulation: SimulationConfig,
    pub reservoirs: ZambeziReservoirs,
    pub catchments: ZambeziCatchments,
    pub release_policy: PolicyConfig,
    pub irrigation_policy: PolicyConfig,
    pub irrigation_districts: Vec<DistrictConfig>,
    pub hydropower_targets: ZambeziTargets,
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of outer timesteps (months).
    pub horizon: usize,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: usize,
    /// 1-based period of year of the first timestep.
    #[serde(default = "default_initial_period")]
    pub initial_period: usize,
    /// Monte Carlo replications; 1 means a single deterministic run.
    #[serde(default = "default_n_sim")]
    pub n_sim: usize,
    /// Total inflow of the period preceding the first timestep.
    pub initial_total_inflow: f64,
    /// Days in each period of year.
    pub days_per_period: VectorRef,
    /// Days of the period in which a delayed release arrives downstream.
    pub delay_days: VectorRef,
    /// Delayed releases already in transit at the first timestep.
    #[serde(default)]
    pub initial_delayed_release: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensemble: Option<EnsembleConfig>,
}

fn default_periods_per_year() -> usize {
    12
}
fn default_initial_period() -> usize {
    1
}
fn default_n_sim() -> usize {
    1
}

/// Log-normal perturbation of historical inflows for `n_sim > 1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    pub sigma: f64,
    #[serde(default)]
    pub seed: u64,
}

/// Reference to a vector table of `len` values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRef {
    pub file: PathBuf,
    pub len: usize,
}

impl VectorRef {
    pub fn load(&self, base: &Path) -> BasinResult<Vec<f64>> {
        tables::load_vector(&base.join(&self.file), self.len)
    }

    pub fn load_counts(&self, base: &Path) -> BasinResult<Vec<u32>> {
        tables::load_int_vector(&base.join(&self.file), self.len)
    }
}

/// Reference to a `rows × cols` matrix table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixRef {
    pub file: PathBuf,
    pub rows: usize,
    pub cols: usize,
}

impl MatrixRef {
    pub fn load(&self, base: &Path) -> BasinResult<Array2<f64>> {
        tables::load_matrix(&base.join(&self.file), self.rows, self.cols)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservoirConfig {
    pub capacity: f64,
    pub initial_storage: f64,
    /// Constant surface area used when no `lsv` table is given (m²).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_area: Option<f64>,
    /// Level / surface / storage rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lsv: Option<MatrixRef>,
    /// Evaporation rate per period of year (mm). Absent disables evaporation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaporation: Option<VectorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<RatingConfig>,
    /// Period / target level / target storage rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_curve: Option<MatrixRef>,
    /// Discharge / tailwater level rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tailwater: Option<MatrixRef>,
    pub min_env_flow: VectorRef,
    #[serde(default)]
    pub env_flow_rule: EnvFlowRuleConfig,
    #[serde(default)]
    pub integration: IntegrationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RatingConfig {
    /// Level / min release / max release rows.
    Curve { table: MatrixRef },
    /// Lower storage, upper storage, release capacity.
    StepFunction { table: VectorRef },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvFlowRuleConfig {
    #[default]
    Floor,
    GraduatedFloor { floor: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrationConfig {
    SubDaily { steps_per_day: u32 },
    Daily,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        IntegrationConfig::SubDaily { steps_per_day: 12 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZambeziReservoirs {
    pub itezhitezhi: ReservoirConfig,
    pub kafue_gorge_upper: ReservoirConfig,
    pub kafue_gorge_lower: ReservoirConfig,
    pub kariba: ReservoirConfig,
    pub cahora_bassa: ReservoirConfig,
}

impl ZambeziReservoirs {
    /// Sections paired with their key, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ReservoirConfig)> {
        [
            ("itezhitezhi", &self.itezhitezhi),
            ("kafue_gorge_upper", &self.kafue_gorge_upper),
            ("kafue_gorge_lower", &self.kafue_gorge_lower),
            ("kariba", &self.kariba),
            ("cahora_bassa", &self.cahora_bassa),
        ]
        .into_iter()
    }
}

/// Inflow tables, one value per timestep of the horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZambeziCatchments {
    pub itezhitezhi: VectorRef,
    pub kafue_flats: VectorRef,
    pub kariba_lateral: VectorRef,
    pub cahora_bassa: VectorRef,
    pub cuando: VectorRef,
    pub shire: VectorRef,
    pub batoka_gorge: VectorRef,
}

/// Target production per period of year (TWh/year).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZambeziTargets {
    pub itezhitezhi: VectorRef,
    pub kafue_gorge_upper: VectorRef,
    pub kariba: VectorRef,
    pub cahora_bassa: VectorRef,
    pub kafue_gorge_lower: VectorRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Minimum flow kept over Victoria Falls, per period of year.
    pub victoria_falls_mef: VectorRef,
    /// Minimum flow into the delta, per period of year.
    pub delta_mef: VectorRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistrictConfig {
    pub name: String,
    /// Demand per period of year (m³/s).
    pub demand: VectorRef,
}

/// Policy function description. The `kind` tag selects the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    Rbf {
        n_inputs: usize,
        n_outputs: usize,
        n_structures: usize,
        input_min: Vec<f64>,
        input_max: Vec<f64>,
        output_min: Vec<f64>,
        output_max: Vec<f64>,
    },
    Irrigation {
        n_districts: usize,
        /// Bounds of (hedging threshold, curvature).
        param_min: Vec<f64>,
        param_max: Vec<f64>,
        /// Position of each district's first parameter.
        offsets: Vec<usize>,
    },
}

impl BasinConfig {
    /// Load from a JSON file. A relative `data_dir` is taken relative to
    /// the file's directory.
    pub fn from_file(path: &str) -> BasinResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&contents)?;
        if config.data_dir.is_relative() {
            let parent = Path::new(path).parent().unwrap_or_else(|| Path::new(""));
            config.data_dir = parent.join(&config.data_dir);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> BasinResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks that need no table data.
    pub fn validate(&self) -> BasinResult<()> {
        let sim = &self.simulation;
        if sim.horizon == 0 {
            return Err(BasinError::ConfigError("horizon must be positive".to_string()));
        }
        if sim.periods_per_year == 0 {
            return Err(BasinError::ConfigError(
                "periods_per_year must be positive".to_string(),
            ));
        }
        if sim.initial_period == 0 || sim.initial_period > sim.periods_per_year {
            return Err(BasinError::ConfigError(format!(
                "initial_period {} outside 1..={}",
                sim.initial_period, sim.periods_per_year
            )));
        }
        if sim.n_sim == 0 {
            return Err(BasinError::ConfigError("n_sim must be at least 1".to_string()));
        }
        if sim.n_sim > 1 && sim.ensemble.is_none() {
            log::warn!(
                "n_sim = {} without an ensemble section: replications will be identical",
                sim.n_sim
            );
        }
        for (name, reservoir) in self.reservoirs.iter() {
            if let IntegrationConfig::SubDaily { steps_per_day: 0 } = reservoir.integration {
                return Err(BasinError::ConfigError(format!(
                    "reservoir '{name}': integration steps_per_day must be at least 1"
                )));
            }
        }
        if !matches!(self.release_policy, PolicyConfig::Rbf { .. }) {
            return Err(BasinError::ConfigError(
                "release_policy must be of kind 'rbf'".to_string(),
            ));
        }
        if !matches!(self.irrigation_policy, PolicyConfig::Irrigation { .. }) {
            return Err(BasinError::ConfigError(
                "irrigation_policy must be of kind 'irrigation'".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory that table paths are resolved against.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
