// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Projective measurement with Born-rule sampling.

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::QuantumComputer;
use crate::error::{ConfigurationError, Error, Result};
use crate::math::ComplexMatrix;
use crate::register::{Pole, RegisterMap};

/// Result of measuring one axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementOutcome {
    pub qubit: usize,
    pub pole: Pole,
    /// Label of the observed pole.
    pub label: String,
    /// Probability the outcome had before collapse.
    pub probability: f64,
}

impl QuantumComputer {
    /// Measure one axis: sample a pole from its marginal, then project ρ
    /// onto it and renormalize.
    pub fn measure_register(&mut self, qubit: usize) -> Result<MeasurementOutcome> {
        self.check_measurable()?;
        let n = self.register.num_qubits();
        if qubit >= n {
            return Err(ConfigurationError::out_of_range(qubit, n).into());
        }

        let u = self.rng.gen::<f64>();
        let (pole, probability) = collapse_qubit(&mut self.rho, qubit, u)?;
        let label = self
            .register
            .axis(qubit)
            .map(|axis| axis.label(pole).to_string())
            .unwrap_or_default();

        debug!(system = %self.name, qubit, %pole, label = %label, probability, "Measured axis");
        Ok(MeasurementOutcome {
            qubit,
            pole,
            label,
            probability,
        })
    }

    /// Measure every axis at once: ρ collapses to |b⟩⟨b| for a basis state
    /// sampled from the diagonal.
    pub fn measure_all_qubits(&mut self) -> Result<usize> {
        self.check_measurable()?;
        let u = self.rng.gen::<f64>();
        let basis = sample_index(&self.rho.diagonal_real(), u);
        self.rho = ComplexMatrix::basis_projector(self.rho.dim(), basis)?;
        debug!(system = %self.name, basis, "Measured all axes");
        Ok(basis)
    }

    fn check_measurable(&self) -> Result<()> {
        if self.register.num_qubits() == 0 {
            return Err(Error::EmptySystem(format!("'{}' has no axes to measure", self.name)));
        }
        if self.operators.is_none() {
            return Err(Error::NotReady(format!(
                "operators for '{}' have not been built",
                self.name
            )));
        }
        Ok(())
    }
}

/// Index whose cumulative weight first exceeds `u · Σw`. Negative weights
/// count as zero; the result is always an index with nonzero weight unless
/// every weight is zero.
pub(crate) fn sample_index(weights: &[f64], u: f64) -> usize {
    let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    let target = u.clamp(0.0, 1.0) * total;
    let mut acc = 0.0;
    let mut last_nonzero = 0;
    for (i, w) in weights.iter().enumerate() {
        let w = w.max(0.0);
        if w == 0.0 {
            continue;
        }
        acc += w;
        last_nonzero = i;
        if target < acc {
            return i;
        }
    }
    last_nonzero
}

/// Project ρ onto the pole of `qubit` selected by `u` and renormalize.
fn collapse_qubit(rho: &mut ComplexMatrix, qubit: usize, u: f64) -> Result<(Pole, f64)> {
    let dim = rho.dim();
    let diagonal = rho.diagonal_real();
    let weights = [Pole::North, Pole::South].map(|pole| {
        diagonal
            .iter()
            .enumerate()
            .filter(|(b, _)| RegisterMap::has_pole(*b, qubit, pole))
            .map(|(_, p)| p.max(0.0))
            .sum::<f64>()
    });
    let total = weights[0] + weights[1];
    if total.is_nan() || total <= 0.0 {
        return Err(Error::NumericInvariant("no probability mass to measure".into()));
    }

    let pole = Pole::from_bit(sample_index(&weights, u));
    let kept = weights[pole.bit()];

    let m = rho.as_array_mut();
    for i in 0..dim {
        for j in 0..dim {
            if RegisterMap::has_pole(i, qubit, pole) && RegisterMap::has_pole(j, qubit, pole) {
                m[[i, j]] /= kept;
            } else {
                m[[i, j]] = Default::default();
            }
        }
    }
    Ok((pole, kept / total))
}
