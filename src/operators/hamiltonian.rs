// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hamiltonian construction.
//!
//! The static part holds self-energies on the diagonal and exchange
//! couplings off the diagonal. Driven self-energies are kept separately as
//! [`DrivenTerm`]s and added to the diagonal at each integration step.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{usable, BuildReport};
use crate::declaration::{DriverKind, IconDeclaration};
use crate::math::complex::c;
use crate::math::ComplexMatrix;
use crate::register::{Pole, RegisterMap};

/// Time-dependent diagonal contribution of one driven label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivenTerm {
    pub label: String,
    pub qubit: usize,
    pub pole: Pole,
    /// Basis states whose diagonal entry the driver shifts.
    pub basis_indices: Vec<usize>,
    pub kind: DriverKind,
    pub frequency: f64,
    pub phase: f64,
    pub amplitude: f64,
}

impl DrivenTerm {
    /// Driver value at simulated time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        self.kind
            .evaluate(t, self.frequency, self.phase, self.amplitude)
    }

    /// Same term after a new most-significant qubit of dimension offset `dim`.
    pub(crate) fn extended(&self, dim: usize) -> Self {
        let mut term = self.clone();
        term.basis_indices
            .extend(self.basis_indices.iter().map(|&b| b + dim));
        term
    }
}

/// Static Hamiltonian: self-energies plus exchange couplings.
pub fn build_hamiltonian(
    declarations: &[IconDeclaration],
    register: &RegisterMap,
    report: &mut BuildReport,
) -> ComplexMatrix {
    let mut h = ComplexMatrix::zeros(register.dimension());

    for decl in declarations {
        let Some((qubit, pole)) = register.locate(&decl.label) else {
            report.skip(&decl.label, "label", "label is not assigned to any axis");
            continue;
        };

        if !usable(decl.self_energy) {
            report.skip(&decl.label, "self_energy", format!("non-finite value {}", decl.self_energy));
        } else if decl.self_energy != 0.0 {
            let diag = h.as_array_mut();
            for basis in register.states_with(qubit, pole) {
                diag[[basis, basis]] += c(decl.self_energy);
            }
        }

        for (other, &strength) in &decl.hamiltonian_couplings {
            let term = format!("hamiltonian_couplings[{other}]");
            let Some((other_qubit, other_pole)) = register.locate(other) else {
                report.skip(&decl.label, term, format!("unknown label '{other}'"));
                continue;
            };
            if !usable(strength) {
                report.skip(&decl.label, term, format!("non-finite strength {strength}"));
                continue;
            }
            if other_qubit == qubit {
                report.skip(&decl.label, term, "both labels sit on the same axis");
                continue;
            }
            exchange_coupling(&mut h, (qubit, pole), (other_qubit, other_pole), strength);
        }
    }

    debug!(dim = h.dim(), "Built static Hamiltonian");
    h
}

/// Add J·(|i⟩⟨j| + |j⟩⟨i|) for every basis pair that swaps occupation
/// between label a = (qubit, pole) and label b.
///
/// A basis state i with qubit a at its pole and qubit b away from its pole
/// couples to i with both bits flipped. The qubits must differ.
pub fn exchange_coupling(
    h: &mut ComplexMatrix,
    (qa, pa): (usize, Pole),
    (qb, pb): (usize, Pole),
    strength: f64,
) {
    if qa == qb || strength == 0.0 {
        return;
    }
    let dim = h.dim();
    let flip = (1 << qa) | (1 << qb);
    let m = h.as_array_mut();
    for i in 0..dim {
        if RegisterMap::has_pole(i, qa, pa) && !RegisterMap::has_pole(i, qb, pb) {
            let j = i ^ flip;
            if j < dim {
                m[[i, j]] += c(strength);
                m[[j, i]] += c(strength);
            }
        }
    }
}

/// One [`DrivenTerm`] per declaration with a usable driver.
pub fn driven_terms(
    declarations: &[IconDeclaration],
    register: &RegisterMap,
    report: &mut BuildReport,
) -> Vec<DrivenTerm> {
    let mut terms = Vec::new();
    for decl in declarations {
        let Some(driver) = &decl.driver else {
            continue;
        };
        // Unknown labels were already reported by the Hamiltonian pass.
        let Some((qubit, pole)) = register.locate(&decl.label) else {
            continue;
        };
        if ![driver.frequency, driver.phase, driver.amplitude]
            .into_iter()
            .all(usable)
        {
            report.skip(&decl.label, "driver", "non-finite frequency, phase or amplitude");
            continue;
        }
        terms.push(DrivenTerm {
            label: decl.label.clone(),
            qubit,
            pole,
            basis_indices: register.states_with(qubit, pole).collect(),
            kind: driver.kind,
            frequency: driver.frequency,
            phase: driver.phase,
            amplitude: driver.amplitude,
        });
    }
    terms
}

/// H(t) = H_static + Σ driven diagonal shifts at time `t`.
pub fn apply_driven_terms(static_h: &ComplexMatrix, terms: &[DrivenTerm], t: f64) -> ComplexMatrix {
    let mut h = static_h.clone();
    let dim = h.dim();
    let m = h.as_array_mut();
    for term in terms {
        let value = c(term.value_at(t));
        for &b in term.basis_indices.iter().filter(|&&b| b < dim) {
            m[[b, b]] += value;
        }
    }
    h
}
