// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Operator construction from declarations.
//!
//! Turns a declaration set plus a [`RegisterMap`] into the pieces of the
//! Gorini–Kossakowski–Sudarshan–Lindblad master equation:
//!
//!   dρ/dt = -i[H(t), ρ] + Σ_k γ_k (L_k ρ L_k† − ½{L_k†L_k, ρ})
//!
//! - [`hamiltonian`]: static Hamiltonian and time-dependent driven terms
//! - [`lindblad`]: basis-transfer collapse operators, plain and gated
//! - [`dissipator`]: the right-hand side of the master equation
//!
//! Building is lenient: a term that references an unknown label or carries
//! a non-finite / negative value is skipped with a warning and recorded in
//! the [`BuildReport`]; everything else still builds.

pub mod dissipator;
pub mod hamiltonian;
pub mod lindblad;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::declaration::IconDeclaration;
use crate::math::ComplexMatrix;
use crate::register::RegisterMap;

pub use dissipator::{dissipator, lindblad_rhs, Channel};
pub use hamiltonian::{apply_driven_terms, build_hamiltonian, driven_terms, exchange_coupling, DrivenTerm};
pub use lindblad::{build_lindblad, transfer_operators, GatedLindblad, LindbladOperator};

/// A declaration term that was left out of the build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTerm {
    /// Label whose declaration carried the term.
    pub label: String,
    /// Which term (e.g. "hamiltonian_couplings[wheat]").
    pub term: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Terms skipped during a lenient build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub skipped: Vec<SkippedTerm>,
}

impl BuildReport {
    /// Record and log a skipped term.
    pub fn skip(&mut self, label: &str, term: impl Into<String>, reason: impl Into<String>) {
        let term = term.into();
        let reason = reason.into();
        warn!(label = %label, term = %term, reason = %reason, "Skipping declaration term");
        self.skipped.push(SkippedTerm {
            label: label.to_string(),
            term,
            reason,
        });
    }

    /// Whether every term was built.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Everything the integrator needs, in a form that can be cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltOperators {
    /// Time-independent Hamiltonian.
    pub hamiltonian: ComplexMatrix,
    /// Diagonal terms re-evaluated every step.
    pub driven: Vec<DrivenTerm>,
    /// Collapse operators with their rate folded into the amplitude.
    pub lindblad: Vec<LindbladOperator>,
    /// Collapse operators whose rate depends on a live population.
    pub gated: Vec<GatedLindblad>,
}

impl BuiltOperators {
    /// Operators with no dynamics at all.
    pub fn empty(dim: usize) -> Self {
        Self {
            hamiltonian: ComplexMatrix::zeros(dim),
            driven: Vec::new(),
            lindblad: Vec::new(),
            gated: Vec::new(),
        }
    }

    /// Hilbert-space dimension the operators act on.
    pub fn dimension(&self) -> usize {
        self.hamiltonian.dim()
    }

    /// Number of collapse channels, plain and gated.
    pub fn channel_count(&self) -> usize {
        self.lindblad.len() + self.gated.len()
    }

    /// Upper bound on the fastest rate of the master-equation generator.
    ///
    /// 2‖H‖∞ bounds the commutator (driven terms at full amplitude); the
    /// largest total outflow from one basis state bounds the dissipator
    /// (gated channels at their base rate).
    pub fn rate_bound(&self) -> f64 {
        let dim = self.dimension();

        let mut row = vec![0.0_f64; dim];
        for ((i, _), z) in self.hamiltonian.as_array().indexed_iter() {
            row[i] += z.norm();
        }
        for term in &self.driven {
            for &b in &term.basis_indices {
                if let Some(r) = row.get_mut(b) {
                    *r += term.amplitude.abs();
                }
            }
        }

        let mut outflow = vec![0.0_f64; dim];
        let plain = self.lindblad.iter().map(|op| (op.from, op.rate()));
        let gated = self
            .gated
            .iter()
            .map(|g| (g.operator.from, g.base_rate * g.operator.rate()));
        for (from, rate) in plain.chain(gated) {
            if let Some(o) = outflow.get_mut(from) {
                *o += rate;
            }
        }

        let h_norm = row.into_iter().fold(0.0, f64::max);
        let out = outflow.into_iter().fold(0.0, f64::max);
        2.0 * h_norm + out
    }

    /// Check that every term fits a register of `num_qubits` axes: finite
    /// values and basis indices inside the Hilbert space.
    pub fn check_shape(&self, num_qubits: usize) -> std::result::Result<(), String> {
        let dim = 1usize << num_qubits;
        if self.dimension() != dim {
            return Err(format!(
                "hamiltonian is {0}×{0}, register needs {dim}×{dim}",
                self.dimension()
            ));
        }
        if !self.hamiltonian.is_finite() {
            return Err("hamiltonian has non-finite entries".into());
        }
        for term in &self.driven {
            if term.qubit >= num_qubits || !term.amplitude.is_finite() {
                return Err(format!("driven term '{}' is malformed", term.label));
            }
            if let Some(b) = term.basis_indices.iter().find(|&&b| b >= dim) {
                return Err(format!("driven term '{}' names basis {b}", term.label));
            }
        }
        let ops = self.lindblad.iter().chain(self.gated.iter().map(|g| &g.operator));
        for op in ops {
            if op.from >= dim || op.to >= dim || !op.amplitude.is_finite() {
                return Err(format!("collapse operator {} → {} is malformed", op.from, op.to));
            }
        }
        for g in &self.gated {
            let rate_ok = g.base_rate.is_finite() && g.base_rate >= 0.0;
            let power_ok = g.power.is_finite() && g.power >= 0.0;
            if g.gate_qubit >= num_qubits || !rate_ok || !power_ok {
                return Err(format!("gated channel on '{}' is malformed", g.gate_label));
            }
        }
        Ok(())
    }

    /// Operators for the register after one more axis is allocated: every
    /// term is tensored with the identity on the new qubit.
    pub fn extend_for_new_qubit(&self) -> Self {
        let dim = self.dimension();
        Self {
            hamiltonian: self.hamiltonian.tensor_identity(),
            driven: self.driven.iter().map(|d| d.extended(dim)).collect(),
            lindblad: self
                .lindblad
                .iter()
                .flat_map(|op| [op.clone(), op.shifted(dim)])
                .collect(),
            gated: self
                .gated
                .iter()
                .flat_map(|g| [g.clone(), g.shifted(dim)])
                .collect(),
        }
    }
}

/// Build every operator for a declaration set.
pub fn build_operators(
    declarations: &[IconDeclaration],
    register: &RegisterMap,
) -> (BuiltOperators, BuildReport) {
    let mut report = BuildReport::default();

    let hamiltonian = build_hamiltonian(declarations, register, &mut report);
    let driven = driven_terms(declarations, register, &mut report);
    let (lindblad, gated) = build_lindblad(declarations, register, &mut report);

    debug!(
        dim = register.dimension(),
        driven = driven.len(),
        lindblad = lindblad.len(),
        gated = gated.len(),
        skipped = report.skipped.len(),
        "Built operators"
    );

    (
        BuiltOperators {
            hamiltonian,
            driven,
            lindblad,
            gated,
        },
        report,
    )
}

/// Whether a declared number may be used at all.
pub(crate) fn usable(value: f64) -> bool {
    value.is_finite()
}
