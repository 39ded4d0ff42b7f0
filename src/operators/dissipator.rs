// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lindblad dissipator computation.
//!
//! Computes D[L](ρ) = γ (L ρ L† − ½{L†L, ρ}) for each collapse operator.
//! Transfer operators have a single nonzero entry, so their contribution
//! touches one diagonal element, one row and one column of ρ and is
//! evaluated in O(n) instead of through dense products.
//!
//! Ref: Breuer & Petruccione, "The Theory of Open Quantum Systems" (2002), Ch. 3.

use ndarray::Array2;
use num_complex::Complex64;

use super::lindblad::LindbladOperator;
use crate::math::complex::{c, I};
use crate::math::ComplexMatrix;

/// A collapse operator with the rate multiplier in force for one step.
///
/// Plain operators use a multiplier of 1 (their rate is folded into the
/// amplitude); gated operators carry their current effective rate.
#[derive(Debug, Clone, Copy)]
pub struct Channel<'a> {
    pub operator: &'a LindbladOperator,
    pub multiplier: f64,
}

impl<'a> Channel<'a> {
    pub fn new(operator: &'a LindbladOperator, multiplier: f64) -> Self {
        Self {
            operator,
            multiplier,
        }
    }

    /// γ seen by the dissipator.
    pub fn rate(&self) -> f64 {
        self.multiplier * self.operator.rate()
    }
}

/// Dissipator for an arbitrary dense collapse operator.
///
/// D[L](ρ) = γ (L ρ L† − ½ L†L ρ − ½ ρ L†L)
///
/// This is the Lindblad–Gorini–Kossakowski–Sudarshan (LGKS) form.
pub fn dissipator(l: &ComplexMatrix, rate: f64, rho: &ComplexMatrix) -> ComplexMatrix {
    if rate == 0.0 {
        return ComplexMatrix::zeros(rho.dim());
    }

    let l_dag = l.dagger();
    let l_dag_l = &l_dag * l;
    let l_rho_ldag = &(l * rho) * &l_dag;

    (&l_rho_ldag - &l_dag_l.anticommutator(rho).scale(c(0.5))).scale(c(rate))
}

/// Add D[L](ρ) of a single-entry transfer operator into `out`.
///
/// With L = a|t⟩⟨f| and γ = multiplier·a²:
///   out[t, t] += γ ρ[f, f]
///   out[f, k] −= ½γ ρ[f, k]   for every k
///   out[k, f] −= ½γ ρ[k, f]   for every k
pub fn transfer_dissipator_into(
    channel: &Channel<'_>,
    rho: &Array2<Complex64>,
    out: &mut Array2<Complex64>,
) {
    let gamma = channel.rate();
    if gamma == 0.0 {
        return;
    }
    let n = rho.nrows();
    let (f, t) = (channel.operator.from, channel.operator.to);
    if f >= n || t >= n {
        return;
    }

    let half = 0.5 * gamma;
    out[[t, t]] += rho[[f, f]] * gamma;
    for k in 0..n {
        out[[f, k]] -= rho[[f, k]] * half;
        out[[k, f]] -= rho[[k, f]] * half;
    }
}

/// Full Lindblad RHS: dρ/dt = −i[H, ρ] + Σ_k D[L_k](ρ).
///
/// This is the generator of the quantum dynamical semigroup.
pub fn lindblad_rhs(hamiltonian: &ComplexMatrix, channels: &[Channel<'_>], rho: &ComplexMatrix) -> ComplexMatrix {
    let mut drho = hamiltonian.commutator(rho).scale(-I);
    let rho_arr = rho.as_array();
    let out = drho.as_array_mut();
    for channel in channels {
        transfer_dissipator_into(channel, rho_arr, out);
    }
    drho
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::complex::{ONE, ZERO};
    use approx::assert_relative_eq;

    fn mixed_state() -> ComplexMatrix {
        // A valid 3-level state with coherences
        ComplexMatrix::from_rows(&[
            vec![c(0.5), Complex64::new(0.1, 0.05), Complex64::new(0.0, -0.1)],
            vec![Complex64::new(0.1, -0.05), c(0.3), c(0.05)],
            vec![Complex64::new(0.0, 0.1), c(0.05), c(0.2)],
        ])
        .unwrap()
    }

    #[test]
    fn test_dissipator_ground_state_is_fixed_point() {
        // L = |0⟩⟨1| leaves |0⟩⟨0| alone
        let l = LindbladOperator::new(1, 0, 1.0).matrix(2).unwrap();
        let rho = ComplexMatrix::from_rows(&[vec![ONE, ZERO], vec![ZERO, ZERO]]).unwrap();
        let d = dissipator(&l, 1e6, &rho);
        assert!(d.max_abs_diff(&ComplexMatrix::zeros(2)) < 1e-15);
    }

    #[test]
    fn test_dissipator_excited_state_decays() {
        let gamma = 1e6;
        let l = LindbladOperator::new(1, 0, 1.0).matrix(2).unwrap();
        let rho = ComplexMatrix::from_rows(&[vec![ZERO, ZERO], vec![ZERO, ONE]]).unwrap();
        let d = dissipator(&l, gamma, &rho);
        assert_relative_eq!(d[(0, 0)].re, gamma, epsilon = 1.0);
        assert_relative_eq!(d[(1, 1)].re, -gamma, epsilon = 1.0);
    }

    #[test]
    fn test_fast_path_matches_dense() {
        let rho = mixed_state();
        let op = LindbladOperator::new(0, 2, 0.7);
        let channel = Channel::new(&op, 1.3);

        let dense = dissipator(&op.matrix(3).unwrap(), 1.3, &rho);

        let mut fast = Array2::zeros((3, 3));
        transfer_dissipator_into(&channel, rho.as_array(), &mut fast);
        let fast = ComplexMatrix::from_array(fast).unwrap();

        assert!(fast.max_abs_diff(&dense) < 1e-14);
    }

    #[test]
    fn test_dissipator_preserves_trace() {
        let rho = mixed_state();
        let op = LindbladOperator::new(1, 2, 0.4);
        let mut out = Array2::zeros((3, 3));
        transfer_dissipator_into(&Channel::new(&op, 1.0), rho.as_array(), &mut out);
        let trace: Complex64 = out.diag().iter().sum();
        assert_relative_eq!(trace.re, 0.0, epsilon = 1e-15);
        assert_relative_eq!(trace.im, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_zero_multiplier_is_inert() {
        let rho = mixed_state();
        let op = LindbladOperator::new(0, 1, 1.0);
        let mut out = Array2::zeros((3, 3));
        transfer_dissipator_into(&Channel::new(&op, 0.0), rho.as_array(), &mut out);
        assert!(out.iter().all(|z| *z == ZERO));
    }

    #[test]
    fn test_rhs_is_hermitian_and_traceless() {
        let rho = mixed_state();
        let h = ComplexMatrix::from_rows(&[
            vec![c(0.2), c(0.3), ZERO],
            vec![c(0.3), ZERO, Complex64::new(0.0, 0.1)],
            vec![ZERO, Complex64::new(0.0, -0.1), c(-0.4)],
        ])
        .unwrap();
        let ops = [LindbladOperator::new(0, 1, 0.5), LindbladOperator::new(2, 0, 0.3)];
        let channels: Vec<Channel<'_>> = ops.iter().map(|op| Channel::new(op, 1.0)).collect();

        let drho = lindblad_rhs(&h, &channels, &rho);
        assert!(drho.is_hermitian(1e-14));
        assert_relative_eq!(drho.trace().re, 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_rhs_without_channels_is_commutator() {
        let rho = mixed_state();
        let h = ComplexMatrix::identity(3).scale(c(2.0));
        // [c·I, ρ] = 0
        let drho = lindblad_rhs(&h, &[], &rho);
        assert!(drho.max_abs_diff(&ComplexMatrix::zeros(3)) < 1e-15);
    }
}
