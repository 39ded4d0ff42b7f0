// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! RK4 integrator for the Lindblad master equation.
//!
//! Integrates dρ/dt = -i[H(t), ρ] + Σ D[L](ρ) using classical 4th-order
//! Runge–Kutta. H and the channel rates are frozen for the duration of one
//! step; the caller re-evaluates them between steps.
//!
//! The substep is the smaller of the configured `max_dt` and
//! [`STABILITY_BUDGET`] divided by the fastest rate in the generator, so
//! stiff couplings or decays shrink the step instead of diverging.
//!
//! Ref: Press et al., "Numerical Recipes" (2007), §17.1.

use crate::math::complex::c;
use crate::math::ComplexMatrix;
use crate::operators::{lindblad_rhs, Channel};

/// Single RK4 step.
pub fn rk4_step(
    rho: &ComplexMatrix,
    hamiltonian: &ComplexMatrix,
    channels: &[Channel<'_>],
    dt: f64,
) -> ComplexMatrix {
    let half_dt = c(0.5 * dt);

    let k1 = lindblad_rhs(hamiltonian, channels, rho);
    let rho2 = rho + &k1.scale(half_dt);
    let k2 = lindblad_rhs(hamiltonian, channels, &rho2);
    let rho3 = rho + &k2.scale(half_dt);
    let k3 = lindblad_rhs(hamiltonian, channels, &rho3);
    let rho4 = rho + &k3.scale(c(dt));
    let k4 = lindblad_rhs(hamiltonian, channels, &rho4);

    let two = c(2.0);
    let sum = &(&(&k1 + &k2.scale(two)) + &k3.scale(two)) + &k4;
    rho + &sum.scale(c(dt / 6.0))
}

/// Largest h · rate allowed per substep. RK4 is stable up to about 2.8 on
/// both the real and imaginary axes; a quarter keeps it accurate as well.
pub const STABILITY_BUDGET: f64 = 0.25;

/// Largest substep for a generator whose fastest rate is `rate_bound`.
pub fn stable_step(max_dt: f64, rate_bound: f64) -> f64 {
    if rate_bound.is_finite() && rate_bound > 0.0 {
        max_dt.min(STABILITY_BUDGET / rate_bound)
    } else {
        max_dt
    }
}

/// Number of substeps of at most `h_max` covering `dt`, or `None` when more
/// than `limit` would be needed.
pub fn substep_count(dt: f64, h_max: f64, limit: usize) -> Option<usize> {
    if dt <= 0.0 {
        return Some(0);
    }
    let n = (dt / h_max).ceil();
    if !n.is_finite() || n > limit as f64 {
        return None;
    }
    Some((n as usize).max(1))
}

/// Trace of a density matrix (real part).
pub fn trace_real(rho: &ComplexMatrix) -> f64 {
    rho.trace().re
}

/// Purity Tr(ρ²), computed as Σ|ρ_ij|² for Hermitian ρ.
pub fn purity(rho: &ComplexMatrix) -> f64 {
    rho.as_array().iter().map(|z| z.norm_sqr()).sum()
}

/// How far ρ sits outside the physical set, before any correction.
///
/// The largest of: a population below 0, a population above 1, and purity
/// above 1. Zero for a valid density matrix; infinite if any entry is not
/// finite.
pub fn physicality_excursion(rho: &ComplexMatrix) -> f64 {
    if rho.as_array().iter().any(|z| !z.re.is_finite() || !z.im.is_finite()) {
        return f64::INFINITY;
    }
    let trace = trace_real(rho);
    let scale = if trace > 0.0 { trace } else { 1.0 };
    let below = rho
        .diagonal_real()
        .iter()
        .fold(0.0_f64, |acc, &p| acc.max(-p).max(p - scale));
    let over_pure = purity(rho) - scale * scale;
    below.max(over_pure).max(0.0)
}

/// Hermitize, clip negative populations and rescale to unit trace.
///
/// Returns the trace before rescaling, or `None` if it is not a usable
/// normalizer (non-finite or numerically zero). The trace is checked first,
/// so ρ is left untouched on `None`.
pub fn restore_physicality(rho: &mut ComplexMatrix) -> Option<f64> {
    let raw = trace_real(rho);
    if !raw.is_finite() || raw.abs() < 1e-12 {
        return None;
    }
    rho.hermitize();
    let n = rho.dim();
    {
        let m = rho.as_array_mut();
        for i in 0..n {
            if m[[i, i]].re < 0.0 {
                m[[i, i]].re = 0.0;
            }
        }
    }
    let trace = trace_real(rho);
    if !trace.is_finite() || trace.abs() < 1e-12 {
        return None;
    }
    *rho = rho.scale(c(1.0 / trace));
    Some(trace)
}
