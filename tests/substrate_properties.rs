// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end behaviour of the substrate through the public API.

use approx::assert_relative_eq;

use quantum_substrate::computer::BuildSummary;
use quantum_substrate::declaration::DriverKind;
use quantum_substrate::validation::validate_density_matrix;
use quantum_substrate::{
    CacheKey, IconDeclaration, OperatorCache, Pole, QuantumComputer, QuantumSubstrate,
};

const SEED: u64 = 2026;

/// `sun`/`moon` on qubit 0, `wheat`/`soil` on qubit 1, operators built.
fn pair(declarations: &[IconDeclaration]) -> QuantumComputer {
    let mut qc = QuantumComputer::with_seed("pair", SEED);
    qc.allocate_axis("sun", "moon").unwrap();
    qc.allocate_axis("wheat", "soil").unwrap();
    qc.build_operators(declarations, None).unwrap();
    qc
}

/// Same axes as [`pair`], built through `cache`.
fn pair_through(declarations: &[IconDeclaration], cache: &OperatorCache) -> (QuantumComputer, BuildSummary) {
    let mut qc = QuantumComputer::with_seed("pair", SEED);
    qc.allocate_axis("sun", "moon").unwrap();
    qc.allocate_axis("wheat", "soil").unwrap();
    let summary = qc.build_operators(declarations, Some(cache)).unwrap();
    (qc, summary)
}

fn busy_declarations() -> Vec<IconDeclaration> {
    vec![
        IconDeclaration::new("sun")
            .with_self_energy(0.3)
            .with_driver(DriverKind::Cosine, 0.2, 0.0, 0.1)
            .with_coupling("wheat", 0.4)
            .with_outgoing("wheat", 0.05),
        IconDeclaration::new("wheat")
            .with_incoming("sun", 0.05)
            .with_decay("soil", 0.02)
            .with_gated("soil", 0.1, "sun", 1.0, false),
        IconDeclaration::new("moon").with_driver(DriverKind::Pulse, 0.5, 0.0, 0.2),
    ]
}

#[test]
fn trace_is_preserved_through_evolution() {
    let mut qc = pair(&busy_declarations());
    qc.prepare_basis_state(&["sun"]).unwrap();

    for _ in 0..50 {
        let report = qc.evolve(0.1).unwrap();
        assert!(report.max_trace_drift < 1e-3, "drift {}", report.max_trace_drift);
        assert_eq!(report.invariant_violations, 0);
        assert_relative_eq!(qc.get_trace(), 1.0, epsilon = 1e-12);
    }
}

#[test]
fn state_stays_physical_after_every_operation() {
    let mut qc = pair(&busy_declarations());
    qc.prepare_basis_state(&["sun", "wheat"]).unwrap();
    validate_density_matrix(qc.density_matrix(), 1e-9).unwrap();

    for _ in 0..20 {
        qc.evolve(0.25).unwrap();
        validate_density_matrix(qc.density_matrix(), 1e-9).unwrap();
    }

    qc.allocate_axis("river", "stone").unwrap();
    validate_density_matrix(qc.density_matrix(), 1e-9).unwrap();

    qc.evolve(0.5).unwrap();
    validate_density_matrix(qc.density_matrix(), 1e-9).unwrap();

    qc.measure_register(0).unwrap();
    validate_density_matrix(qc.density_matrix(), 1e-9).unwrap();

    qc.measure_all_qubits().unwrap();
    validate_density_matrix(qc.density_matrix(), 1e-9).unwrap();

    qc.reset_to_ground_state();
    validate_density_matrix(qc.density_matrix(), 1e-9).unwrap();
}

#[test]
fn cached_operators_equal_a_fresh_build() {
    let dir = tempfile::tempdir().unwrap();
    let decls = busy_declarations();

    let fresh = pair(&decls);

    let mut first = QuantumComputer::with_seed("pair", SEED);
    first.allocate_axis("sun", "moon").unwrap();
    first.allocate_axis("wheat", "soil").unwrap();
    let writer = OperatorCache::new(Some(dir.path().to_path_buf()), None);
    assert!(!first.build_operators(&decls, Some(&writer)).unwrap().cache_hit);

    // A new cache over the same directory only has the on-disk copy.
    let reader = OperatorCache::new(Some(dir.path().to_path_buf()), None);
    let mut second = QuantumComputer::with_seed("pair", SEED);
    second.allocate_axis("sun", "moon").unwrap();
    second.allocate_axis("wheat", "soil").unwrap();
    let summary = second.build_operators(&decls, Some(&reader)).unwrap();
    assert!(summary.cache_hit);
    assert_eq!(reader.stats().hits, 1);

    assert_eq!(second.operators(), fresh.operators());
    assert_eq!(first.operators(), fresh.operators());

    // Same evolution either way.
    let mut a = fresh;
    a.prepare_basis_state(&["sun"]).unwrap();
    second.prepare_basis_state(&["sun"]).unwrap();
    a.evolve(1.0).unwrap();
    second.evolve(1.0).unwrap();
    assert_relative_eq!(
        a.get_population("wheat").unwrap(),
        second.get_population("wheat").unwrap(),
        epsilon = 1e-14
    );
}

#[test]
fn bundled_tier_serves_when_writable_tier_is_empty() {
    let bundled = tempfile::tempdir().unwrap();
    let writable = tempfile::tempdir().unwrap();
    let decls = busy_declarations();

    let mut seeder = QuantumComputer::with_seed("pair", SEED);
    seeder.allocate_axis("sun", "moon").unwrap();
    seeder.allocate_axis("wheat", "soil").unwrap();
    seeder
        .build_operators(&decls, Some(&OperatorCache::new(Some(bundled.path().to_path_buf()), None)))
        .unwrap();

    let cache = OperatorCache::new(
        Some(writable.path().to_path_buf()),
        Some(bundled.path().to_path_buf()),
    );
    let mut qc = QuantumComputer::with_seed("pair", SEED);
    qc.allocate_axis("sun", "moon").unwrap();
    qc.allocate_axis("wheat", "soil").unwrap();
    assert!(qc.build_operators(&decls, Some(&cache)).unwrap().cache_hit);
}

#[test]
fn malformed_cache_file_falls_back_to_a_fresh_build() {
    let dir = tempfile::tempdir().unwrap();
    let decls = busy_declarations();

    pair_through(&decls, &OperatorCache::new(Some(dir.path().to_path_buf()), None));

    let path = dir.path().join("pair.json");
    let mut entry: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    entry["operators"]["hamiltonian"]["dim"] = serde_json::json!([4, 3]);
    std::fs::write(&path, serde_json::to_vec(&entry).unwrap()).unwrap();

    let cache = OperatorCache::new(Some(dir.path().to_path_buf()), None);
    let (mut qc, summary) = pair_through(&decls, &cache);
    assert!(!summary.cache_hit);
    assert_eq!(qc.operators(), pair(&decls).operators());

    qc.prepare_basis_state(&["sun"]).unwrap();
    qc.evolve(1.0).unwrap();
    validate_density_matrix(qc.density_matrix(), 1e-9).unwrap();
}

#[test]
fn out_of_range_cached_operator_is_not_served() {
    let dir = tempfile::tempdir().unwrap();
    let decls = busy_declarations();
    pair_through(&decls, &OperatorCache::new(Some(dir.path().to_path_buf()), None));

    let path = dir.path().join("pair.json");
    let mut entry: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    entry["operators"]["lindblad"][0]["from"] = serde_json::json!(99);
    std::fs::write(&path, serde_json::to_vec(&entry).unwrap()).unwrap();

    let cache = OperatorCache::new(Some(dir.path().to_path_buf()), None);
    let (mut qc, summary) = pair_through(&decls, &cache);
    assert!(!summary.cache_hit);
    qc.evolve(0.5).unwrap();
}

#[test]
fn cache_key_ignores_declaration_order() {
    let mut decls = busy_declarations();
    let key = CacheKey::compute("forest", &decls).unwrap();
    decls.reverse();
    assert_eq!(CacheKey::compute("forest", &decls).unwrap(), key);

    decls[0] = decls[0].clone().with_self_energy(0.9);
    assert_ne!(CacheKey::compute("forest", &decls).unwrap(), key);
    assert_ne!(CacheKey::compute("meadow", &busy_declarations()).unwrap(), key);
}

#[test]
fn allocation_doubles_dimension_with_new_axis_in_ground() {
    let mut qc = pair(&busy_declarations());
    qc.prepare_basis_state(&["sun"]).unwrap();
    qc.evolve(0.5).unwrap();
    let before = qc.get_population("sun").unwrap();

    let q = qc.allocate_axis("river", "stone").unwrap();
    assert_eq!(q, 2);
    assert_eq!(qc.register().dimension(), 8);
    assert_eq!(qc.density_matrix().dim(), 8);

    let marginal = qc.get_marginal(q).unwrap();
    assert_relative_eq!(marginal[(0, 0)].re, 0.0);
    assert_relative_eq!(marginal[(1, 1)].re, 1.0);
    assert_relative_eq!(qc.get_population("stone").unwrap(), 1.0);
    assert_relative_eq!(qc.get_population("sun").unwrap(), before, epsilon = 1e-14);

    // Built operators follow the register, so evolution keeps working.
    qc.evolve(0.5).unwrap();
    assert_relative_eq!(qc.get_population("stone").unwrap(), 1.0, epsilon = 1e-12);
}

#[test]
fn exchange_coupling_oscillates() {
    let mut qc = pair(&[IconDeclaration::new("sun").with_coupling("wheat", 0.5)]);
    qc.prepare_basis_state(&["sun"]).unwrap();

    let history: Vec<f64> = (0..200)
        .map(|_| {
            qc.evolve(0.05).unwrap();
            qc.get_population("sun").unwrap()
        })
        .collect();

    let dropped = history
        .iter()
        .position(|&p| p < 0.8)
        .expect("population never left the start state");
    assert!(dropped < 100);

    let (min_at, min) = history
        .iter()
        .copied()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap();
    let recovered = history[min_at..].iter().copied().fold(0.0, f64::max);
    assert!(recovered > min + 0.5, "min {min}, recovered {recovered}");

    // P(sun) = cos²(Jt) at t = 10
    assert_relative_eq!(history[199], (0.5_f64 * 10.0).cos().powi(2), epsilon = 1e-6);
}

#[test]
fn dissipative_transfer_moves_population() {
    let mut qc = pair(&[
        IconDeclaration::new("sun").with_outgoing("wheat", 0.1),
        IconDeclaration::new("wheat").with_incoming("sun", 0.1),
    ]);
    qc.prepare_basis_state(&["sun"]).unwrap();

    for _ in 0..100 {
        qc.evolve(0.016).unwrap();
    }

    let source = qc.get_population("sun").unwrap();
    let target = qc.get_population("wheat").unwrap();
    assert!(target > 0.2, "target {target}");
    assert!(source < 0.8, "source {source}");
    assert!((source + target - 1.0).abs() < 0.01);
    // Both declarations add their rates.
    assert_relative_eq!(source, (-0.2_f64 * 1.6).exp(), epsilon = 1e-6);
}

#[test]
fn measurement_collapses_and_repeats() {
    let mut qc = pair(&[IconDeclaration::new("sun").with_coupling("wheat", 0.5)]);
    qc.prepare_basis_state(&["sun"]).unwrap();
    qc.evolve(std::f64::consts::FRAC_PI_4 / 0.5).unwrap();
    assert_relative_eq!(qc.get_population("sun").unwrap(), 0.5, epsilon = 1e-6);

    let first = qc.measure_register(0).unwrap();
    assert_relative_eq!(first.probability, 0.5, epsilon = 1e-6);
    let again = qc.measure_register(0).unwrap();
    assert_eq!(again.pole, first.pole);
    assert_relative_eq!(again.probability, 1.0, epsilon = 1e-12);

    // The exchange keeps one excitation, so qubit 1 is now fixed as well.
    let partner = qc.measure_register(1).unwrap();
    assert_eq!(partner.pole, first.pole.opposite());
    assert_relative_eq!(partner.probability, 1.0, epsilon = 1e-9);
}

#[test]
fn same_seed_gives_same_outcomes() {
    let run = || {
        let mut qc = pair(&[IconDeclaration::new("sun").with_coupling("wheat", 0.5)]);
        (0..10)
            .map(|_| {
                qc.prepare_basis_state(&["sun"]).unwrap();
                qc.evolve(0.8).unwrap();
                qc.measure_all_qubits().unwrap()
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn closed_gate_blocks_transfer() {
    // soil -> wheat, gated on sun; the register starts in ground, so sun is empty
    let mut shut = pair(&[IconDeclaration::new("wheat").with_gated("soil", 0.5, "sun", 1.0, false)]);
    for _ in 0..20 {
        shut.evolve(0.1).unwrap();
    }
    assert_relative_eq!(shut.get_population("wheat").unwrap(), 0.0, epsilon = 1e-12);
    assert_relative_eq!(shut.get_population("soil").unwrap(), 1.0, epsilon = 1e-12);

    // Inverted, an empty gate means full rate.
    let mut open = pair(&[IconDeclaration::new("wheat").with_gated("soil", 0.5, "sun", 1.0, true)]);
    open.evolve(2.0).unwrap();
    assert_relative_eq!(
        open.get_population("wheat").unwrap(),
        1.0 - (-0.5_f64 * 2.0).exp(),
        epsilon = 1e-6
    );
}

#[test]
fn substrate_trait_object_drives_a_computer() {
    let mut boxed: Box<dyn QuantumSubstrate> = Box::new(pair(&[
        IconDeclaration::new("sun").with_coupling("wheat", 0.5),
    ]));
    boxed.evolve(1.0).unwrap();
    assert_relative_eq!(boxed.get_trace(), 1.0, epsilon = 1e-12);
    let outcome = boxed.measure_register(1).unwrap();
    // Nothing was excited, so the exchange never moved the ground state.
    assert_eq!(outcome.pole, Pole::South);
}
