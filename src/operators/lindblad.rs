// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Collapse operators for population transfer between labels.
//!
//! Every transfer rule expands into single-entry operators
//! L = √γ |to⟩⟨from|, one per basis state the rule applies to. Gated rules
//! keep an unscaled operator and recompute their rate from the live
//! density matrix before each integration step.

use serde::{Deserialize, Serialize};

use super::{usable, BuildReport};
use crate::declaration::IconDeclaration;
use crate::error::{ConfigurationError, Result};
use crate::math::complex::c;
use crate::math::ComplexMatrix;
use crate::register::{Pole, RegisterMap};

/// L = amplitude · |to⟩⟨from|.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LindbladOperator {
    pub from: usize,
    pub to: usize,
    pub amplitude: f64,
}

impl LindbladOperator {
    pub fn new(from: usize, to: usize, amplitude: f64) -> Self {
        Self { from, to, amplitude }
    }

    /// γ = amplitude².
    pub fn rate(&self) -> f64 {
        self.amplitude * self.amplitude
    }

    /// Dense form in a space of dimension `dim`.
    pub fn matrix(&self, dim: usize) -> Result<ComplexMatrix> {
        let mut m = ComplexMatrix::zeros(dim);
        m.set(self.to, self.from, c(self.amplitude))?;
        Ok(m)
    }

    pub(crate) fn shifted(&self, offset: usize) -> Self {
        Self {
            from: self.from + offset,
            to: self.to + offset,
            amplitude: self.amplitude,
        }
    }
}

/// Transfer whose rate follows the population of a gate label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatedLindblad {
    /// Unscaled operator (amplitude 1).
    pub operator: LindbladOperator,
    pub base_rate: f64,
    pub gate_label: String,
    pub gate_qubit: usize,
    pub gate_pole: Pole,
    pub power: f64,
    pub inverted: bool,
}

impl GatedLindblad {
    /// base_rate · P^power, or base_rate · (1 − P)^power when inverted.
    pub fn effective_rate(&self, gate_population: f64) -> f64 {
        let p = gate_population.clamp(0.0, 1.0);
        let factor = if self.inverted { 1.0 - p } else { p };
        self.base_rate * factor.powf(self.power)
    }

    /// Gate population read from the diagonal of ρ.
    pub fn gate_population(&self, diagonal: &[f64]) -> f64 {
        diagonal
            .iter()
            .enumerate()
            .filter(|(b, _)| RegisterMap::has_pole(*b, self.gate_qubit, self.gate_pole))
            .map(|(_, p)| p)
            .sum()
    }

    pub(crate) fn shifted(&self, offset: usize) -> Self {
        Self {
            operator: self.operator.shifted(offset),
            ..self.clone()
        }
    }
}

/// Expand a `source → target` transfer into basis-level operators.
///
/// For labels on different axes, each basis state with the source occupied
/// and the target unoccupied moves to the state with both bits flipped. For
/// the two poles of one axis, each basis state with the source occupied
/// moves to the state with that bit flipped.
pub fn transfer_operators(
    register: &RegisterMap,
    source: &str,
    target: &str,
    amplitude: f64,
) -> Result<Vec<LindbladOperator>> {
    let (qs, ps) = register.resolve(source)?;
    let (qt, pt) = register.resolve(target)?;

    let ops = if qs == qt {
        if ps == pt {
            return Err(ConfigurationError::InvalidValue {
                field: "target".into(),
                message: format!("'{source}' cannot transfer into itself"),
            }
            .into());
        }
        register
            .states_with(qs, ps)
            .map(|i| LindbladOperator::new(i, i ^ (1 << qs), amplitude))
            .collect()
    } else {
        let flip = (1 << qs) | (1 << qt);
        register
            .states_with(qs, ps)
            .filter(|&i| !RegisterMap::has_pole(i, qt, pt))
            .map(|i| LindbladOperator::new(i, i ^ flip, amplitude))
            .collect()
    };
    Ok(ops)
}

/// Plain and gated collapse operators for a declaration set.
pub fn build_lindblad(
    declarations: &[IconDeclaration],
    register: &RegisterMap,
    report: &mut BuildReport,
) -> (Vec<LindbladOperator>, Vec<GatedLindblad>) {
    let mut plain = Vec::new();
    let mut gated = Vec::new();

    for decl in declarations {
        let label = decl.label.as_str();
        if !register.contains(label) {
            continue;
        }

        let mut transfer = |term: String, source: &str, target: &str, rate: f64| {
            if !valid_rate(report, label, &term, rate) {
                return;
            }
            match transfer_operators(register, source, target, rate.sqrt()) {
                Ok(ops) => plain.extend(ops),
                Err(e) => report.skip(label, term, e.to_string()),
            }
        };

        for (target, &rate) in &decl.lindblad_outgoing {
            transfer(format!("lindblad_outgoing[{target}]"), label, target.as_str(), rate);
        }
        for (source, &rate) in &decl.lindblad_incoming {
            transfer(format!("lindblad_incoming[{source}]"), source.as_str(), label, rate);
        }
        if let Some(decay) = &decl.decay {
            transfer("decay".to_string(), label, decay.target.as_str(), decay.rate);
        }

        for (k, spec) in decl.gated_lindblad.iter().enumerate() {
            let term = format!("gated_lindblad[{k}]");
            if !valid_rate(report, label, &term, spec.rate) {
                continue;
            }
            if !usable(spec.power) || spec.power < 0.0 {
                report.skip(label, term, format!("invalid power {}", spec.power));
                continue;
            }
            let Some((gate_qubit, gate_pole)) = register.locate(&spec.gate) else {
                report.skip(label, term, format!("unknown gate label '{}'", spec.gate));
                continue;
            };
            match transfer_operators(register, &spec.source, label, 1.0) {
                Ok(ops) => gated.extend(ops.into_iter().map(|operator| GatedLindblad {
                    operator,
                    base_rate: spec.rate,
                    gate_label: spec.gate.clone(),
                    gate_qubit,
                    gate_pole,
                    power: spec.power,
                    inverted: spec.inverted,
                })),
                Err(e) => report.skip(label, term, e.to_string()),
            }
        }
    }

    (plain, gated)
}

/// Finite and non-negative; zero rates build nothing but are not an error.
fn valid_rate(report: &mut BuildReport, label: &str, term: &str, rate: f64) -> bool {
    if !usable(rate) || rate < 0.0 {
        report.skip(label, term, format!("invalid rate {rate}"));
        return false;
    }
    rate > 0.0
}
