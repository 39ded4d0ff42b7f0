// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Read-only queries on the density matrix: populations, reduced states,
//! Bloch vectors, entropies and lookahead previews.

use serde::Serialize;
use tracing::debug;

use super::integrate::{purity, trace_real};
use super::QuantumComputer;
use crate::error::{ConfigurationError, Result};
use crate::math::ComplexMatrix;
use crate::register::{Pole, RegisterMap};

/// Eigenvalues below this do not contribute to the entropy.
const ENTROPY_EPSILON: f64 = 1e-15;

/// Single-qubit state as a point in the unit ball.
///
/// z = P(north) − P(south); θ is measured from the north pole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlochVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub r: f64,
    pub theta: f64,
    pub phi: f64,
}

/// Mutual information of one qubit pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairInformation {
    pub qubit_a: usize,
    pub qubit_b: usize,
    /// In bits.
    pub value: f64,
}

/// One step of a lookahead preview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookaheadFrame {
    pub time: f64,
    /// P(north) per qubit.
    pub north_populations: Vec<f64>,
}

/// Snapshot of the numerical health of a system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub name: String,
    pub num_qubits: usize,
    pub dimension: usize,
    pub time: f64,
    pub trace: f64,
    pub purity: f64,
    /// Largest |ρ_ij − ρ_ji*|.
    pub hermiticity_error: f64,
    pub min_population: f64,
    pub operators_built: bool,
    pub channels: usize,
}

impl QuantumComputer {
    /// Total probability that `label` is occupied.
    pub fn get_population(&self, label: &str) -> Result<f64> {
        let (qubit, pole) = self.register.resolve(label)?;
        Ok(self
            .register
            .states_with(qubit, pole)
            .map(|b| self.rho[(b, b)].re)
            .sum())
    }

    /// ρ[b, b].
    pub fn get_basis_probability(&self, basis: usize) -> Result<f64> {
        Ok(self.rho.get(basis, basis)?.re)
    }

    /// 2 × 2 reduced density matrix of one qubit; index 0 is north.
    pub fn get_marginal(&self, qubit: usize) -> Result<ComplexMatrix> {
        self.check_qubit(qubit)?;
        Ok(reduced_density_matrix(&self.rho, &[qubit]))
    }

    /// 4 × 4 reduced density matrix of two qubits, indexed by
    /// `bit_a + 2·bit_b`.
    pub fn pair_marginal(&self, qubit_a: usize, qubit_b: usize) -> Result<ComplexMatrix> {
        self.check_pair(qubit_a, qubit_b)?;
        Ok(reduced_density_matrix(&self.rho, &[qubit_a, qubit_b]))
    }

    pub fn bloch_vector(&self, qubit: usize) -> Result<BlochVector> {
        let m = self.get_marginal(qubit)?;
        let off = m[(0, 1)];
        let (x, y, z) = (2.0 * off.re, -2.0 * off.im, m[(0, 0)].re - m[(1, 1)].re);
        let r = (x * x + y * y + z * z).sqrt();
        let theta = if r > 1e-12 { (z / r).clamp(-1.0, 1.0).acos() } else { 0.0 };
        Ok(BlochVector {
            x,
            y,
            z,
            r,
            theta,
            phi: y.atan2(x),
        })
    }

    /// Tr(ρ²).
    pub fn purity(&self) -> f64 {
        purity(&self.rho)
    }

    /// Von Neumann entropy in bits of the given qubits' reduced state.
    /// An empty slice means the whole register.
    pub fn subsystem_entropy(&self, qubits: &[usize]) -> Result<f64> {
        if qubits.is_empty() {
            return Ok(von_neumann_entropy(&self.rho));
        }
        for &q in qubits {
            self.check_qubit(q)?;
        }
        Ok(von_neumann_entropy(&reduced_density_matrix(&self.rho, qubits)))
    }

    /// I(A:B) = S(A) + S(B) − S(AB), in bits, clipped at zero.
    pub fn mutual_information(&self, qubit_a: usize, qubit_b: usize) -> Result<f64> {
        self.check_pair(qubit_a, qubit_b)?;
        let s_a = von_neumann_entropy(&reduced_density_matrix(&self.rho, &[qubit_a]));
        let s_b = von_neumann_entropy(&reduced_density_matrix(&self.rho, &[qubit_b]));
        let s_ab = von_neumann_entropy(&reduced_density_matrix(&self.rho, &[qubit_a, qubit_b]));
        Ok((s_a + s_b - s_ab).max(0.0))
    }

    /// Mutual information of every pair (a < b), in upper-triangular order.
    pub fn all_mutual_information(&self) -> Vec<PairInformation> {
        let n = self.register.num_qubits();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for a in 0..n {
            for b in (a + 1)..n {
                if let Ok(value) = self.mutual_information(a, b) {
                    out.push(PairInformation {
                        qubit_a: a,
                        qubit_b: b,
                        value,
                    });
                }
            }
        }
        out
    }

    /// Evolve a copy `steps` times by `dt` and record per-qubit north
    /// populations after each step. The live system is not touched.
    pub fn lookahead(&self, steps: usize, dt: f64) -> Result<Vec<LookaheadFrame>> {
        let mut preview = self.clone();
        let mut frames = Vec::with_capacity(steps);
        for _ in 0..steps {
            preview.evolve(dt)?;
            frames.push(LookaheadFrame {
                time: preview.time,
                north_populations: north_populations(&preview.rho, preview.register.num_qubits()),
            });
        }
        debug!(system = %self.name, steps, dt, "Computed lookahead");
        Ok(frames)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let diagonal = self.rho.diagonal_real();
        Diagnostics {
            name: self.name.clone(),
            num_qubits: self.register.num_qubits(),
            dimension: self.register.dimension(),
            time: self.time,
            trace: trace_real(&self.rho),
            purity: purity(&self.rho),
            hermiticity_error: self.rho.max_abs_diff(&self.rho.dagger()),
            min_population: diagonal.iter().copied().fold(f64::INFINITY, f64::min),
            operators_built: self.operators.is_some(),
            channels: self.operators.as_ref().map_or(0, |ops| ops.channel_count()),
        }
    }

    fn check_qubit(&self, qubit: usize) -> Result<()> {
        let n = self.register.num_qubits();
        if qubit >= n {
            return Err(ConfigurationError::out_of_range(qubit, n).into());
        }
        Ok(())
    }

    fn check_pair(&self, qubit_a: usize, qubit_b: usize) -> Result<()> {
        self.check_qubit(qubit_a)?;
        self.check_qubit(qubit_b)?;
        if qubit_a == qubit_b {
            return Err(ConfigurationError::InvalidValue {
                field: "qubit_b".into(),
                message: format!("pair needs two distinct qubits, got {qubit_a} twice"),
            }
            .into());
        }
        Ok(())
    }
}

/// Partial trace keeping `keep` (in that order, first = least significant
/// bit of the reduced index).
pub fn reduced_density_matrix(rho: &ComplexMatrix, keep: &[usize]) -> ComplexMatrix {
    let dim = rho.dim();
    let kept_mask: usize = keep.iter().fold(0, |mask, &q| mask | (1 << q));
    let reduce = |basis: usize| -> usize {
        keep.iter()
            .enumerate()
            .fold(0, |acc, (k, &q)| acc | (((basis >> q) & 1) << k))
    };

    let mut out = ComplexMatrix::zeros(1 << keep.len());
    let m = out.as_array_mut();
    let src = rho.as_array();
    for i in 0..dim {
        for j in 0..dim {
            if i & !kept_mask == j & !kept_mask {
                m[[reduce(i), reduce(j)]] += src[[i, j]];
            }
        }
    }
    out
}

/// S(ρ) = −Σ λ log₂ λ over the eigenvalues of ρ, clipped at zero.
pub fn von_neumann_entropy(rho: &ComplexMatrix) -> f64 {
    let entropy: f64 = rho
        .eigensystem()
        .values
        .into_iter()
        .filter(|&lambda| lambda > ENTROPY_EPSILON)
        .map(|lambda| -lambda * lambda.log2())
        .sum();
    entropy.max(0.0)
}

fn north_populations(rho: &ComplexMatrix, num_qubits: usize) -> Vec<f64> {
    let diagonal = rho.diagonal_real();
    (0..num_qubits)
        .map(|q| {
            diagonal
                .iter()
                .enumerate()
                .filter(|(b, _)| RegisterMap::has_pole(*b, q, Pole::North))
                .map(|(_, p)| p)
                .sum::<f64>()
        })
        .collect()
}
