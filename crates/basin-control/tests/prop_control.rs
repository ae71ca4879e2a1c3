// ─────────────────────────────────────────────────────────────────────
// Basin Sim — Property-Based Tests (proptest) for basin-control
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Property-based tests for basin-control using proptest.
//!
//! Covers: registry parameter round trip, RBF output range, irrigation
//! diversion never exceeding available flow or demand.

use basin_control::irrigation::IrrigationRule;
use basin_control::policy::{PolicyFunction, PolicyRegistry, PolicyRole};
use basin_control::rbf::Rbf;
use proptest::prelude::*;

fn registry(k: usize, m: usize, n: usize, districts: usize) -> PolicyRegistry {
    let mut reg = PolicyRegistry::new();
    let offsets = (0..districts).map(|d| 2 * d).collect();
    let irr = IrrigationRule::new(districts, &[0.0, 0.0], &[500.0, 3.0], offsets).unwrap();
    reg.register(PolicyRole::Irrigation, PolicyFunction::Irrigation(irr))
        .unwrap();
    reg.register(PolicyRole::Release, PolicyFunction::Rbf(Rbf::new(k, m, n).unwrap()))
        .unwrap();
    reg
}

proptest! {
    #[test]
    fn prop_registry_roundtrip(
        k in 1usize..5,
        m in 1usize..4,
        n in 1usize..5,
        districts in 1usize..6,
        seed in prop::collection::vec(-2.0f64..2.0, 200),
    ) {
        let mut reg = registry(k, m, n, districts);
        let total = reg.free_parameter_count();
        prop_assert_eq!(total, 2 * districts + m + n * (2 * k + m));
        let theta: Vec<f64> = seed.iter().cycle().take(total).copied().collect();
        reg.assign_free_parameters(&theta).unwrap();
        prop_assert_eq!(reg.parameters().unwrap(), theta);
    }

    #[test]
    fn prop_rbf_output_in_unit_interval(
        theta in prop::collection::vec(-3.0f64..3.0, 1 + 3 * 5),
        x in prop::collection::vec(-1.0f64..2.0, 2),
    ) {
        let mut rbf = Rbf::new(2, 1, 3).unwrap();
        rbf.set_parameters(&theta).unwrap();
        let y = rbf.output(&x).unwrap();
        prop_assert!(y[0] >= 0.0 && y[0] <= 1.0, "y = {}", y[0]);
    }

    #[test]
    fn prop_diversion_bounded(
        h in 0.0f64..1.0,
        m in 0.0f64..1.0,
        q in -100.0f64..2000.0,
        w in 0.0f64..800.0,
    ) {
        let mut rule = IrrigationRule::new(1, &[0.0, 0.0], &[1000.0, 4.0], vec![0]).unwrap();
        rule.set_parameters(&[h, m]).unwrap();
        let d = rule.diversion(q, w, 0).unwrap();
        prop_assert!(d >= 0.0, "d = {d}");
        prop_assert!(d <= q.max(0.0).min(w) + 1e-9, "d = {d}, q = {q}, w = {w}");
    }
}
