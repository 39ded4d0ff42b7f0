// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Hermitian eigendecomposition by cyclic complex Jacobi rotations.
//!
//! Each rotation first removes the phase of the pivot A_pq, then applies
//! the real symmetric Jacobi rotation to the resulting 2 × 2 block.
//!
//! Ref: Press et al., "Numerical Recipes" (2007), §11.1.

use ndarray::Array2;
use num_complex::Complex64;

use super::complex::{c, ComplexExt, ONE, ZERO};
use super::matrix::ComplexMatrix;

const MAX_SWEEPS: usize = 64;
const OFF_DIAGONAL_TOLERANCE: f64 = 1e-14;

/// Eigenvalues (ascending) with matching eigenvectors stored as columns.
#[derive(Debug, Clone)]
pub struct Eigensystem {
    /// Real eigenvalues, ascending.
    pub values: Vec<f64>,
    /// Unitary matrix whose column k is the eigenvector of `values[k]`.
    pub vectors: ComplexMatrix,
}

impl ComplexMatrix {
    /// Eigensystem of a Hermitian matrix.
    ///
    /// The result for non-Hermitian input is unspecified (only the Hermitian
    /// part's pivots are used) but the call never panics.
    pub fn eigensystem(&self) -> Eigensystem {
        let n = self.dim();
        let mut a = self.as_array().clone();
        let mut v: Array2<Complex64> = Array2::from_diag_elem(n, ONE);

        let scale = a.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt().max(1.0);

        for _ in 0..MAX_SWEEPS {
            if off_diagonal_norm(&a) <= OFF_DIAGONAL_TOLERANCE * scale {
                break;
            }
            for p in 0..n {
                for q in (p + 1)..n {
                    rotate(&mut a, &mut v, p, q);
                }
            }
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| a[[i, i]].re.total_cmp(&a[[j, j]].re));

        let values = order.iter().map(|&k| a[[k, k]].re).collect();
        let mut vectors = Array2::zeros((n, n));
        for (dst, &src) in order.iter().enumerate() {
            for row in 0..n {
                vectors[[row, dst]] = v[[row, src]];
            }
        }

        Eigensystem {
            values,
            vectors: ComplexMatrix::from_array(vectors)
                .unwrap_or_else(|_| ComplexMatrix::identity(n)),
        }
    }
}

fn off_diagonal_norm(a: &Array2<Complex64>) -> f64 {
    let n = a.nrows();
    let mut sum = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                sum += a[[i, j]].norm_sqr();
            }
        }
    }
    sum.sqrt()
}

/// Zero A_pq with U = D·P, D = diag(1, e^{-iφ}), P the real Jacobi rotation,
/// and accumulate A ← U†AU, V ← VU.
fn rotate(a: &mut Array2<Complex64>, v: &mut Array2<Complex64>, p: usize, q: usize) {
    let n = a.nrows();
    let apq = a[[p, q]];
    let r = apq.norm();
    let Some(phase) = apq.checked_div(c(r)) else {
        return;
    };

    let theta = (a[[q, q]].re - a[[p, p]].re) / (2.0 * r);
    let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
    let cs = 1.0 / (t * t + 1.0).sqrt();
    let sn = t * cs;

    let u_pp = c(cs);
    let u_pq = c(sn);
    let u_qp = -phase.conj() * sn;
    let u_qq = phase.conj() * cs;

    for k in 0..n {
        let akp = a[[k, p]];
        let akq = a[[k, q]];
        a[[k, p]] = akp * u_pp + akq * u_qp;
        a[[k, q]] = akp * u_pq + akq * u_qq;
    }
    for k in 0..n {
        let apk = a[[p, k]];
        let aqk = a[[q, k]];
        a[[p, k]] = u_pp.conj() * apk + u_qp.conj() * aqk;
        a[[q, k]] = u_pq.conj() * apk + u_qq.conj() * aqk;
    }
    for k in 0..n {
        let vkp = v[[k, p]];
        let vkq = v[[k, q]];
        v[[k, p]] = vkp * u_pp + vkq * u_qp;
        v[[k, q]] = vkp * u_pq + vkq * u_qq;
    }

    a[[p, q]] = ZERO;
    a[[q, p]] = ZERO;
}
