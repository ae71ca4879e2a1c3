// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Property-Based Tests (proptest) for basin-core
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for basin-core using proptest.
//!
//! Covers: release bounded by the rating curve, per-period mass balance of
//! a single reservoir and of every reservoir in a simulated chain,
//! aggregation of replications.

use basin_core::catchment::Catchment;
use basin_core::network::{Calendar, CatchmentId, Flow, Network};
use basin_core::objectives::{aggregate_replications, Kpis};
use basin_core::reservoir::{Geometry, RatingCurve, Reservoir};
use basin_core::simulator::NetworkSimulator;
use basin_math::stats::{mean, percentile};
use basin_types::constants::{RISK_PERCENTILE, SECONDS_PER_DAY};
use basin_types::state::PeriodContext;
use ndarray::array;
use proptest::prelude::*;

fn reservoir(min_at_top: f64, max_at_top: f64) -> Reservoir {
    // levels 0..100 m; min release rises 0 → min_at_top, max 50 → max_at_top
    let rating = RatingCurve::from_table(&array![
        [0.0, 100.0],
        [0.0, min_at_top],
        [50.0, max_at_top]
    ])
    .unwrap();
    Reservoir::new(
        "prop",
        1.0e9,
        5.0e8,
        Geometry::constant_area(1.0e7).unwrap(),
        rating,
        vec![0.0; 12],
    )
}

proptest! {
    #[test]
    fn prop_release_within_rating(
        decision in -100.0f64..3000.0,
        storage in 0.0f64..1.0e9,
        min_top in 0.0f64..200.0,
        extra in 0.0f64..2000.0,
    ) {
        let r = reservoir(min_top, min_top + 50.0 + extra);
        let lo = r.min_release(storage);
        let hi = r.max_release(storage);
        let rel = r.actual_release(decision, storage, 0.0, 0.0);
        prop_assert!(lo <= hi + 1e-9, "lo = {lo}, hi = {hi}");
        prop_assert!(rel >= lo - 1e-9 && rel <= hi + 1e-9, "rel = {rel} outside [{lo}, {hi}]");
    }

    #[test]
    fn prop_single_reservoir_mass_balance(
        s0 in 1.0e8f64..9.0e8,
        decision in 0.0f64..400.0,
        inflow in 0.0f64..500.0,
        days in 28u32..32,
    ) {
        let r = reservoir(0.0, 1000.0);
        let ctx = PeriodContext::new(0, 1, days);
        let n = r.substeps(days);
        let out = r.integrate(&ctx, n, s0, decision, inflow);
        let period = days as f64 * SECONDS_PER_DAY;
        let expected = s0 + period * (inflow - out.mean_release);
        prop_assert!(
            (out.storage - expected).abs() <= 1e-9 * s0.max(1.0) + 1e-3,
            "end storage {} vs balance {expected}",
            out.storage
        );
    }

    #[test]
    fn prop_chain_mass_balance(
        inflow in prop::collection::vec(0.0f64..800.0, 6),
        decisions in prop::collection::vec(0.0f64..600.0, 12),
    ) {
        let mut net = Network::new(Calendar::monthly(3, vec![30; 12]), 1);
        let up = net.add_reservoir(reservoir(0.0, 1000.0));
        let down = net.add_reservoir(reservoir(0.0, 1000.0));
        net.route(up, Flow::Catchment(CatchmentId(0)));
        net.route(down, Flow::Release(up));
        let catchments = vec![Catchment::new("q", inflow.clone())];

        let mut sim = NetworkSimulator::new(&net, &catchments, 6).unwrap();
        sim.initialize();
        for pair in decisions.chunks(2) {
            sim.step_with_decisions(pair, None).unwrap();
        }
        let state = sim.state().unwrap();
        let period = 30.0 * SECONDS_PER_DAY;
        for traj in &state.reservoirs {
            for t in 0..6 {
                let ds = traj.storage[t + 1] - traj.storage[t];
                let balance = period * (traj.inflow[t] - traj.release[t]);
                prop_assert!((ds - balance).abs() < 1e-3, "t={t}: ds = {ds}, balance = {balance}");
            }
        }
        let up_release = &state.reservoirs[up.0].release;
        prop_assert_eq!(&state.reservoirs[down.0].inflow, up_release);
    }

    #[test]
    fn prop_aggregation_orders(
        runs in prop::collection::vec(
            (0.0f64..1.0e4, 0.0f64..1.0e4, 0.0f64..1.0e4, 0.0f64..1.0e4, 0.0f64..1.0e4),
            2..12,
        ),
    ) {
        let kpis: Vec<Kpis> = runs
            .iter()
            .map(|&(hyd, env, irr, district, plant)| Kpis {
                hydropower: hyd,
                environment: env,
                irrigation: irr,
                irrigation_by_district: vec![district],
                hydropower_by_plant: vec![plant],
            })
            .collect();
        let agg = aggregate_replications(&kpis).unwrap();

        let column = |i: usize| -> Vec<f64> {
            runs.iter()
                .map(|r| [r.0, r.1, r.2, r.3, r.4][i])
                .collect()
        };
        let (hyd, env, irr, district, plant) =
            (column(0), column(1), column(2), column(3), column(4));

        prop_assert!((agg.hydropower - mean(&hyd)).abs() < 1e-9 * mean(&hyd).max(1.0));
        prop_assert!((agg.hydropower_by_plant[0] - mean(&plant)).abs() < 1e-9 * mean(&plant).max(1.0));
        prop_assert_eq!(agg.environment, percentile(&env, RISK_PERCENTILE));
        prop_assert_eq!(agg.irrigation, percentile(&irr, RISK_PERCENTILE));
        prop_assert_eq!(agg.irrigation_by_district[0], percentile(&district, RISK_PERCENTILE));

        // the risk percentile sits between the mean and the worst replication
        for (value, xs) in [
            (agg.environment, &env),
            (agg.irrigation, &irr),
            (agg.irrigation_by_district[0], &district),
        ] {
            let max = xs.iter().cloned().fold(f64::MIN, f64::max);
            prop_assert!(value >= mean(xs) - 1e-9 && value <= max + 1e-9, "{value} vs {xs:?}");
        }
    }
}
