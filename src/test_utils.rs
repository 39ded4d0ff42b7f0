// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test fixtures.
//!
//! The standard fixture is a two-axis register: `sun`/`moon` on qubit 0 and
//! `wheat`/`soil` on qubit 1. Ground is (moon, soil) = basis 3.

use crate::computer::QuantumComputer;
use crate::declaration::IconDeclaration;
use crate::register::RegisterMap;

/// Seed used by every fixture computer.
pub const TEST_SEED: u64 = 0x5eed;

/// Two-axis register with no system attached.
pub fn pair_register() -> RegisterMap {
    let mut register = RegisterMap::new();
    register.allocate_axis("sun", "moon").unwrap();
    register.allocate_axis("wheat", "soil").unwrap();
    register
}

/// Seeded computer with the two standard axes and no operators.
pub fn pair_computer(name: &str) -> QuantumComputer {
    let mut qc = QuantumComputer::with_seed(name, TEST_SEED);
    qc.allocate_axis("sun", "moon").unwrap();
    qc.allocate_axis("wheat", "soil").unwrap();
    qc
}

/// [`pair_computer`] with operators built from `declarations`, uncached.
pub fn ready_pair(declarations: &[IconDeclaration]) -> QuantumComputer {
    let mut qc = pair_computer("pair");
    qc.build_operators(declarations, None).unwrap();
    qc
}

/// `sun → wheat` transfer declared from both ends at the same rate.
pub fn transfer_declarations(rate: f64) -> Vec<IconDeclaration> {
    vec![
        IconDeclaration::new("sun").with_outgoing("wheat", rate),
        IconDeclaration::new("wheat").with_incoming("sun", rate),
    ]
}

/// Exchange coupling of strength `j` between `sun` and `wheat`.
pub fn exchange_declarations(j: f64) -> Vec<IconDeclaration> {
    vec![IconDeclaration::new("sun").with_coupling("wheat", j)]
}
