// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Zambezi Cascade
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Five-reservoir Zambezi cascade with eight irrigation districts.
//!
//! Kafue branch: Itezhitezhi → (two-month transport delay) → Kafue Gorge
//! Upper → Kafue Gorge Lower. Main stem: Batoka Gorge, Cuando and Kariba
//! lateral inflows → Kariba. Both branches meet above Cahora Bassa, whose
//! outflow plus the Shire feeds the delta.

use crate::catchment::{Catchment, InflowEnsemble};
use crate::env::BasinEnv;
use crate::evaluate::Evaluator;
use crate::hydropower::{HydropowerPlant, RunOfRiverPlant, TurbineGroup};
use crate::network::{
    Calendar, CatchmentId, DistrictId, Flow, FlowExpr, IrrigationDistrict, Network, ReservoirId,
    TransportDelay,
};
use crate::reservoir::Reservoir;
use basin_control::policy::{PolicyFunction, PolicyRegistry, PolicyRole};
use basin_types::config::{BasinConfig, EnsembleConfig, ReservoirConfig, VectorRef};
use basin_types::error::{BasinError, BasinResult};

/// Months between an Itezhitezhi release and its arrival at Kafue Gorge Upper.
pub const ITT_DELAY_LAG: usize = 2;

/// Itezhitezhi releases in transit when no initial arrivals are configured (m³/s).
pub const DEFAULT_DELAYED_RELEASE: [f64; ITT_DELAY_LAG] = [56.183290322580640, 59.670678571428570];

/// Victoria Falls run-of-river plant.
const VICTORIA_FALLS_MAX_FLOW: f64 = 150.0;
const VICTORIA_FALLS_HEAD: f64 = 100.0;
const VICTORIA_FALLS_EFFICIENCY: f64 = 0.88;

/// Reservoirs, in release-decision order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZambeziReservoir {
    Itezhitezhi,
    KafueGorgeUpper,
    Kariba,
    CahoraBassa,
    KafueGorgeLower,
}

impl ZambeziReservoir {
    pub const ALL: [ZambeziReservoir; 5] = [
        ZambeziReservoir::Itezhitezhi,
        ZambeziReservoir::KafueGorgeUpper,
        ZambeziReservoir::Kariba,
        ZambeziReservoir::CahoraBassa,
        ZambeziReservoir::KafueGorgeLower,
    ];

    pub fn id(self) -> ReservoirId {
        ReservoirId(self as usize)
    }

    pub fn name(self) -> &'static str {
        match self {
            ZambeziReservoir::Itezhitezhi => "itezhitezhi",
            ZambeziReservoir::KafueGorgeUpper => "kafue_gorge_upper",
            ZambeziReservoir::Kariba => "kariba",
            ZambeziReservoir::CahoraBassa => "cahora_bassa",
            ZambeziReservoir::KafueGorgeLower => "kafue_gorge_lower",
        }
    }

    fn config(self, config: &BasinConfig) -> &ReservoirConfig {
        let r = &config.reservoirs;
        match self {
            ZambeziReservoir::Itezhitezhi => &r.itezhitezhi,
            ZambeziReservoir::KafueGorgeUpper => &r.kafue_gorge_upper,
            ZambeziReservoir::Kariba => &r.kariba,
            ZambeziReservoir::CahoraBassa => &r.cahora_bassa,
            ZambeziReservoir::KafueGorgeLower => &r.kafue_gorge_lower,
        }
    }

    fn target(self, config: &BasinConfig) -> &VectorRef {
        let t = &config.hydropower_targets;
        match self {
            ZambeziReservoir::Itezhitezhi => &t.itezhitezhi,
            ZambeziReservoir::KafueGorgeUpper => &t.kafue_gorge_upper,
            ZambeziReservoir::Kariba => &t.kariba,
            ZambeziReservoir::CahoraBassa => &t.cahora_bassa,
            ZambeziReservoir::KafueGorgeLower => &t.kafue_gorge_lower,
        }
    }

    /// Turbine groups and full supply level.
    fn turbines(self) -> (Vec<TurbineGroup>, f64) {
        match self {
            ZambeziReservoir::Itezhitezhi => (vec![TurbineGroup::single(612.0, 40.5, 0.89)], 1030.5),
            ZambeziReservoir::KafueGorgeUpper => (vec![TurbineGroup::single(252.0, 397.0, 0.61)], 977.6),
            ZambeziReservoir::Kariba => (
                vec![
                    TurbineGroup { share: 0.488, max_flow: 1200.0, rated_head: 108.0, efficiency: 0.48 },
                    TurbineGroup { share: 0.512, max_flow: 840.0, rated_head: 110.0, efficiency: 0.51 },
                ],
                489.5,
            ),
            ZambeziReservoir::CahoraBassa => (vec![TurbineGroup::single(2260.0, 128.0, 0.73)], 331.0),
            ZambeziReservoir::KafueGorgeLower => (vec![TurbineGroup::single(487.0, 182.7, 0.88)], 586.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZambeziCatchment {
    Itezhitezhi,
    KafueFlats,
    KaribaLateral,
    CahoraBassa,
    Cuando,
    Shire,
    BatokaGorge,
}

impl ZambeziCatchment {
    pub const ALL: [ZambeziCatchment; 7] = [
        ZambeziCatchment::Itezhitezhi,
        ZambeziCatchment::KafueFlats,
        ZambeziCatchment::KaribaLateral,
        ZambeziCatchment::CahoraBassa,
        ZambeziCatchment::Cuando,
        ZambeziCatchment::Shire,
        ZambeziCatchment::BatokaGorge,
    ];

    pub fn id(self) -> CatchmentId {
        CatchmentId(self as usize)
    }

    pub fn name(self) -> &'static str {
        match self {
            ZambeziCatchment::Itezhitezhi => "itezhitezhi",
            ZambeziCatchment::KafueFlats => "kafue_flats",
            ZambeziCatchment::KaribaLateral => "kariba_lateral",
            ZambeziCatchment::CahoraBassa => "cahora_bassa",
            ZambeziCatchment::Cuando => "cuando",
            ZambeziCatchment::Shire => "shire",
            ZambeziCatchment::BatokaGorge => "batoka_gorge",
        }
    }

    fn table(self, config: &BasinConfig) -> &VectorRef {
        let c = &config.catchments;
        match self {
            ZambeziCatchment::Itezhitezhi => &c.itezhitezhi,
            ZambeziCatchment::KafueFlats => &c.kafue_flats,
            ZambeziCatchment::KaribaLateral => &c.kariba_lateral,
            ZambeziCatchment::CahoraBassa => &c.cahora_bassa,
            ZambeziCatchment::Cuando => &c.cuando,
            ZambeziCatchment::Shire => &c.shire,
            ZambeziCatchment::BatokaGorge => &c.batoka_gorge,
        }
    }
}

/// Irrigation districts, numbered as in the basin's planning documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ZambeziDistrict {
    Irr2,
    Irr3,
    Irr4,
    Irr5,
    Irr6,
    Irr7,
    Irr8,
    Irr9,
}

impl ZambeziDistrict {
    pub const ALL: [ZambeziDistrict; 8] = [
        ZambeziDistrict::Irr2,
        ZambeziDistrict::Irr3,
        ZambeziDistrict::Irr4,
        ZambeziDistrict::Irr5,
        ZambeziDistrict::Irr6,
        ZambeziDistrict::Irr7,
        ZambeziDistrict::Irr8,
        ZambeziDistrict::Irr9,
    ];

    pub fn id(self) -> DistrictId {
        DistrictId(self as usize)
    }
}

fn c(x: ZambeziCatchment) -> Flow {
    Flow::Catchment(x.id())
}

fn r(x: ZambeziReservoir) -> Flow {
    Flow::Release(x.id())
}

fn d(x: ZambeziDistrict) -> Flow {
    Flow::Diversion(x.id())
}

/// Seasonal series the cascade needs beyond its nodes.
pub struct CascadeSeries {
    /// Target per plant, in `ZambeziReservoir::ALL` order.
    pub targets: Vec<Vec<f64>>,
    pub victoria_falls_mef: Vec<f64>,
    pub delta_mef: Vec<f64>,
}

/// Add the routing program, plants and delta requirement to a network
/// whose reservoirs, districts and Itezhitezhi delay are already in place.
pub fn assemble(network: &mut Network, series: CascadeSeries) -> BasinResult<()> {
    use ZambeziCatchment as C;
    use ZambeziDistrict::*;
    use ZambeziReservoir::*;

    if series.targets.len() != ZambeziReservoir::ALL.len() {
        return Err(BasinError::ConfigError(format!(
            "expected {} hydropower targets, got {}",
            ZambeziReservoir::ALL.len(),
            series.targets.len()
        )));
    }

    // Kafue branch.
    network.route(Itezhitezhi.id(), c(C::Itezhitezhi));
    let kafue_flats = c(C::KafueFlats) + Flow::Delayed(Itezhitezhi.id());
    network.divert(Irr4.id(), kafue_flats.clone());
    network.route(KafueGorgeUpper.id(), kafue_flats - d(Irr4));
    network.route(KafueGorgeLower.id(), r(KafueGorgeUpper));

    // Main stem above Kariba.
    let kariba_in = c(C::BatokaGorge) + c(C::Cuando) + c(C::KaribaLateral);
    network.divert(Irr2.id(), kariba_in.clone());
    network.route(Kariba.id(), kariba_in - d(Irr2));

    // Confluence above Cahora Bassa.
    network.divert(Irr3.id(), r(Kariba));
    network.divert(Irr5.id(), r(KafueGorgeLower));
    network.divert(Irr6.id(), r(Kariba) - d(Irr3) + r(KafueGorgeLower) - d(Irr5));
    let cahora_in = FlowExpr::from(c(C::CahoraBassa)) + r(KafueGorgeLower) + r(Kariba)
        - d(Irr3)
        - d(Irr5)
        - d(Irr6);
    network.route(CahoraBassa.id(), cahora_in);

    // Below Cahora Bassa.
    network.divert(Irr7.id(), r(CahoraBassa));
    network.divert(Irr8.id(), r(CahoraBassa) - d(Irr7));
    network.divert(Irr9.id(), r(CahoraBassa) - d(Irr7) + c(C::Shire) - d(Irr8));
    network.set_delta(
        r(CahoraBassa) - d(Irr7) - d(Irr8) + c(C::Shire) - d(Irr9),
        series.delta_mef,
    );

    for (reservoir, target) in ZambeziReservoir::ALL.into_iter().zip(series.targets) {
        let (groups, full_supply_level) = reservoir.turbines();
        network.add_plant(HydropowerPlant {
            name: reservoir.name().to_string(),
            reservoir: reservoir.id(),
            full_supply_level,
            groups,
            target,
        });
    }
    network.add_run_of_river(RunOfRiverPlant {
        name: "victoria_falls".to_string(),
        source: c(C::BatokaGorge) + c(C::Cuando),
        requirement: series.victoria_falls_mef,
        max_flow: VICTORIA_FALLS_MAX_FLOW,
        head: VICTORIA_FALLS_HEAD,
        efficiency: VICTORIA_FALLS_EFFICIENCY,
    });
    network.validate()
}

/// Everything needed to simulate or optimise the cascade.
pub struct ZambeziModel {
    pub network: Network,
    /// Historical inflows, in `ZambeziCatchment::ALL` order.
    pub catchments: Vec<Catchment>,
    /// Irrigation rule first, release policy second.
    pub policies: PolicyRegistry,
    pub horizon: usize,
    pub n_sim: usize,
    pub ensemble: Option<EnsembleConfig>,
}

impl ZambeziModel {
    /// Load every table referenced by `config` and assemble the cascade.
    pub fn build(config: &BasinConfig) -> BasinResult<Self> {
        config.validate()?;
        let base = config.data_dir();
        let sim = &config.simulation;

        let calendar = Calendar {
            periods_per_year: sim.periods_per_year,
            initial_period: sim.initial_period,
            days_per_period: sim.days_per_period.load_counts(base)?,
        };
        let mut network = Network::new(calendar, ZambeziCatchment::ALL.len());
        network.initial_total_inflow = sim.initial_total_inflow;

        for reservoir in ZambeziReservoir::ALL {
            let loaded = Reservoir::from_config(reservoir.name(), reservoir.config(config), base)?;
            network.add_reservoir(loaded);
        }

        if config.irrigation_districts.len() != ZambeziDistrict::ALL.len() {
            return Err(BasinError::ConfigError(format!(
                "the cascade has {} irrigation districts, config lists {}",
                ZambeziDistrict::ALL.len(),
                config.irrigation_districts.len()
            )));
        }
        for district in &config.irrigation_districts {
            network.add_district(IrrigationDistrict {
                name: district.name.clone(),
                demand: district.demand.load(base)?,
            });
        }

        let initial = if sim.initial_delayed_release.is_empty() {
            DEFAULT_DELAYED_RELEASE.to_vec()
        } else {
            sim.initial_delayed_release.clone()
        };
        network.add_delay(TransportDelay {
            from: ZambeziReservoir::Itezhitezhi.id(),
            lag: ITT_DELAY_LAG,
            initial,
            delay_days: sim.delay_days.load_counts(base)?,
        });

        let targets = ZambeziReservoir::ALL
            .into_iter()
            .map(|r| r.target(config).load(base))
            .collect::<BasinResult<Vec<_>>>()?;
        assemble(
            &mut network,
            CascadeSeries {
                targets,
                victoria_falls_mef: config.environment.victoria_falls_mef.load(base)?,
                delta_mef: config.environment.delta_mef.load(base)?,
            },
        )?;

        let catchments = ZambeziCatchment::ALL
            .into_iter()
            .map(|c| Catchment::from_table(c.name(), c.table(config), base))
            .collect::<BasinResult<Vec<_>>>()?;

        let mut policies = PolicyRegistry::new();
        policies.register(
            PolicyRole::Irrigation,
            PolicyFunction::from_config(&config.irrigation_policy)?,
        )?;
        policies.register(
            PolicyRole::Release,
            PolicyFunction::from_config(&config.release_policy)?,
        )?;

        let release = policies.release()?;
        if release.n_inputs() != network.n_policy_inputs() || release.n_outputs() != network.n_decisions() {
            return Err(BasinError::ConfigError(format!(
                "release policy must map {} inputs to {} outputs, got {} to {}",
                network.n_policy_inputs(),
                network.n_decisions(),
                release.n_inputs(),
                release.n_outputs()
            )));
        }
        let irrigation = policies.irrigation()?;
        if irrigation.n_districts() != network.districts.len() {
            return Err(BasinError::ConfigError(format!(
                "irrigation policy covers {} districts, network has {}",
                irrigation.n_districts(),
                network.districts.len()
            )));
        }

        log::info!(
            "assembled '{}': {} reservoirs, {} districts, horizon {}, {} free parameters",
            config.name,
            network.reservoirs.len(),
            network.districts.len(),
            sim.horizon,
            policies.free_parameter_count()
        );

        Ok(ZambeziModel {
            network,
            catchments,
            policies,
            horizon: sim.horizon,
            n_sim: sim.n_sim,
            ensemble: sim.ensemble.clone(),
        })
    }

    /// Inflow replications: log-normal members when an ensemble is
    /// configured, otherwise the historical series once (identical copies
    /// aggregate to the same values).
    pub fn inflow_ensemble(&self) -> BasinResult<InflowEnsemble> {
        match &self.ensemble {
            Some(e) if self.n_sim > 1 => InflowEnsemble::lognormal(&self.catchments, self.n_sim, e.sigma, e.seed),
            _ => Ok(InflowEnsemble::single(self.catchments.clone())),
        }
    }

    pub fn evaluator(self) -> BasinResult<Evaluator> {
        let ensemble = self.inflow_ensemble()?;
        Evaluator::new(self.network, ensemble, self.policies, self.horizon)
    }

    /// Step environment over the historical inflows.
    pub fn env(&self) -> BasinResult<BasinEnv<'_>> {
        BasinEnv::new(&self.network, &self.catchments, &self.policies, self.horizon)
    }
}
