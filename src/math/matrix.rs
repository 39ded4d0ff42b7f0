// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dense square complex matrices.
//!
//! `ComplexMatrix` wraps an `ndarray::Array2<Complex64>` and guarantees the
//! matrix is square. Element access through [`ComplexMatrix::get`] and
//! [`ComplexMatrix::set`] is bounds-checked; the arithmetic operators follow
//! ndarray and panic on dimension mismatch.

use std::ops::{Add, Index, Mul, Sub};

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Deserializer, Serialize};

use super::complex::{c, ComplexExt, ONE, ZERO};
use crate::error::{ConfigurationError, Result};

/// Dense n × n complex matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ComplexMatrix(Array2<Complex64>);

/// Goes through [`ComplexMatrix::from_array`], so non-square input is rejected.
impl<'de> Deserialize<'de> for ComplexMatrix {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let array = Array2::<Complex64>::deserialize(deserializer)?;
        Self::from_array(array).map_err(serde::de::Error::custom)
    }
}

impl ComplexMatrix {
    /// Zero matrix of dimension `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self(Array2::zeros((dim, dim)))
    }

    /// Identity matrix of dimension `dim`.
    pub fn identity(dim: usize) -> Self {
        Self(Array2::from_diag_elem(dim, ONE))
    }

    /// Projector |b⟩⟨b| onto a single basis state.
    pub fn basis_projector(dim: usize, basis: usize) -> Result<Self> {
        if basis >= dim {
            return Err(ConfigurationError::out_of_range(basis, dim).into());
        }
        let mut m = Self::zeros(dim);
        m.0[[basis, basis]] = ONE;
        Ok(m)
    }

    /// Wrap an existing array. Fails if it is not square.
    pub fn from_array(array: Array2<Complex64>) -> Result<Self> {
        if array.nrows() != array.ncols() {
            return Err(ConfigurationError::InvalidValue {
                field: "matrix".into(),
                message: format!(
                    "must be square, got {} × {}",
                    array.nrows(),
                    array.ncols()
                ),
            }
            .into());
        }
        Ok(Self(array))
    }

    /// Build from row vectors. Fails unless every row has `rows.len()` entries.
    pub fn from_rows(rows: &[Vec<Complex64>]) -> Result<Self> {
        let n = rows.len();
        let mut m = Self::zeros(n);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(ConfigurationError::InvalidValue {
                    field: "matrix".into(),
                    message: format!("row {} has {} entries, expected {}", i, row.len(), n),
                }
                .into());
            }
            for (j, z) in row.iter().enumerate() {
                m.0[[i, j]] = *z;
            }
        }
        Ok(m)
    }

    /// Dimension n.
    pub fn dim(&self) -> usize {
        self.0.nrows()
    }

    /// Borrow the underlying array.
    pub fn as_array(&self) -> &Array2<Complex64> {
        &self.0
    }

    pub(crate) fn as_array_mut(&mut self) -> &mut Array2<Complex64> {
        &mut self.0
    }

    /// Bounds-checked element read.
    pub fn get(&self, row: usize, col: usize) -> Result<Complex64> {
        self.check_index(row, col)?;
        Ok(self.0[[row, col]])
    }

    /// Bounds-checked element write.
    pub fn set(&mut self, row: usize, col: usize, value: Complex64) -> Result<()> {
        self.check_index(row, col)?;
        self.0[[row, col]] = value;
        Ok(())
    }

    fn check_index(&self, row: usize, col: usize) -> Result<()> {
        let n = self.dim();
        if row >= n {
            return Err(ConfigurationError::out_of_range(row, n).into());
        }
        if col >= n {
            return Err(ConfigurationError::out_of_range(col, n).into());
        }
        Ok(())
    }

    /// Multiply every entry by `factor`.
    pub fn scale(&self, factor: Complex64) -> Self {
        Self(&self.0 * factor)
    }

    /// Conjugate transpose M†.
    pub fn dagger(&self) -> Self {
        Self(self.0.t().mapv(|z| z.conj()))
    }

    /// Tr(M).
    pub fn trace(&self) -> Complex64 {
        self.0.diag().iter().fold(ZERO, |acc, z| acc + z)
    }

    /// Real parts of the diagonal.
    pub fn diagonal_real(&self) -> Vec<f64> {
        self.0.diag().iter().map(|z| z.re).collect()
    }

    /// [A, B] = AB − BA.
    pub fn commutator(&self, other: &ComplexMatrix) -> Self {
        Self(self.0.dot(&other.0) - other.0.dot(&self.0))
    }

    /// {A, B} = AB + BA.
    pub fn anticommutator(&self, other: &ComplexMatrix) -> Self {
        Self(self.0.dot(&other.0) + other.0.dot(&self.0))
    }

    /// Largest |A_ij − B_ij|. Matrices of different size compare as infinitely far apart.
    pub fn max_abs_diff(&self, other: &ComplexMatrix) -> f64 {
        if self.dim() != other.dim() {
            return f64::INFINITY;
        }
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }

    /// Whether M = M† within `tolerance`.
    pub fn is_hermitian(&self, tolerance: f64) -> bool {
        let n = self.dim();
        for i in 0..n {
            for j in i..n {
                if !self.0[[i, j]].approx_eq(self.0[[j, i]].conj(), tolerance) {
                    return false;
                }
            }
        }
        true
    }

    /// Whether every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|z| z.re.is_finite() && z.im.is_finite())
    }

    /// Replace M with (M + M†)/2, making it exactly Hermitian.
    pub fn hermitize(&mut self) {
        let n = self.dim();
        for i in 0..n {
            self.0[[i, i]].im = 0.0;
            for j in (i + 1)..n {
                let avg = (self.0[[i, j]] + self.0[[j, i]].conj()) * c(0.5);
                self.0[[i, j]] = avg;
                self.0[[j, i]] = avg.conj();
            }
        }
    }

    /// Double the dimension, placing the existing content in the block
    /// selected by `placeholder_bit` of the new most-significant qubit.
    ///
    /// Entry (i, j) moves to (i + bit·n, j + bit·n); every other entry is zero.
    /// For a density matrix this is ρ ⊗ |bit⟩⟨bit|.
    pub fn embed_doubled(&self, placeholder_bit: usize) -> Self {
        let n = self.dim();
        let offset = (placeholder_bit & 1) * n;
        let mut out = Array2::zeros((2 * n, 2 * n));
        for ((i, j), z) in self.0.indexed_iter() {
            out[[i + offset, j + offset]] = *z;
        }
        Self(out)
    }

    /// M ⊗ I₂ with the identity acting on a new most-significant qubit.
    pub fn tensor_identity(&self) -> Self {
        let n = self.dim();
        let mut out = Array2::zeros((2 * n, 2 * n));
        for ((i, j), z) in self.0.indexed_iter() {
            out[[i, j]] = *z;
            out[[i + n, j + n]] = *z;
        }
        Self(out)
    }
}

impl Index<(usize, usize)> for ComplexMatrix {
    type Output = Complex64;

    fn index(&self, (row, col): (usize, usize)) -> &Complex64 {
        &self.0[[row, col]]
    }
}

impl Add for &ComplexMatrix {
    type Output = ComplexMatrix;

    fn add(self, rhs: &ComplexMatrix) -> ComplexMatrix {
        ComplexMatrix(&self.0 + &rhs.0)
    }
}

impl Sub for &ComplexMatrix {
    type Output = ComplexMatrix;

    fn sub(self, rhs: &ComplexMatrix) -> ComplexMatrix {
        ComplexMatrix(&self.0 - &rhs.0)
    }
}

/// Matrix product.
impl Mul for &ComplexMatrix {
    type Output = ComplexMatrix;

    fn mul(self, rhs: &ComplexMatrix) -> ComplexMatrix {
        ComplexMatrix(self.0.dot(&rhs.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pauli_x() -> ComplexMatrix {
        ComplexMatrix::from_rows(&[vec![ZERO, ONE], vec![ONE, ZERO]]).unwrap()
    }

    fn pauli_y() -> ComplexMatrix {
        let i = Complex64::new(0.0, 1.0);
        ComplexMatrix::from_rows(&[vec![ZERO, -i], vec![i, ZERO]]).unwrap()
    }

    fn pauli_z() -> ComplexMatrix {
        ComplexMatrix::from_rows(&[vec![ONE, ZERO], vec![ZERO, -ONE]]).unwrap()
    }

    #[test]
    fn test_get_set_bounds_checked() {
        let mut m = ComplexMatrix::zeros(2);
        m.set(1, 0, Complex64::new(2.0, 1.0)).unwrap();
        assert_eq!(m.get(1, 0).unwrap(), Complex64::new(2.0, 1.0));
        assert!(m.get(2, 0).is_err());
        assert!(m.set(0, 5, ONE).is_err());
    }

    #[test]
    fn test_from_array_rejects_non_square() {
        let a = Array2::<Complex64>::zeros((2, 3));
        assert!(ComplexMatrix::from_array(a).is_err());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(ComplexMatrix::from_rows(&[vec![ONE, ZERO], vec![ONE]]).is_err());
    }

    #[test]
    fn test_pauli_commutator() {
        // [X, Y] = 2iZ
        let comm = pauli_x().commutator(&pauli_y());
        let expected = pauli_z().scale(Complex64::new(0.0, 2.0));
        assert!(comm.max_abs_diff(&expected) < 1e-12);
    }

    #[test]
    fn test_pauli_anticommutator_vanishes() {
        let anti = pauli_x().anticommutator(&pauli_z());
        assert!(anti.max_abs_diff(&ComplexMatrix::zeros(2)) < 1e-12);
    }

    #[test]
    fn test_mul_and_identity() {
        let x = pauli_x();
        let xx = &x * &x;
        assert!(xx.max_abs_diff(&ComplexMatrix::identity(2)) < 1e-12);
    }

    #[test]
    fn test_add_sub() {
        let x = pauli_x();
        let z = pauli_z();
        let sum = &x + &z;
        assert_eq!(sum[(0, 0)], ONE);
        assert_eq!(sum[(0, 1)], ONE);
        let back = &sum - &z;
        assert!(back.max_abs_diff(&x) < 1e-15);
    }

    #[test]
    fn test_dagger_and_trace() {
        let mut m = ComplexMatrix::zeros(2);
        m.set(0, 1, Complex64::new(1.0, 2.0)).unwrap();
        m.set(1, 0, Complex64::new(3.0, 4.0)).unwrap();
        m.set(1, 1, Complex64::new(0.5, 0.0)).unwrap();
        let dag = m.dagger();
        assert_eq!(dag[(0, 1)], Complex64::new(3.0, -4.0));
        assert_eq!(dag[(1, 0)], Complex64::new(1.0, -2.0));
        assert_relative_eq!(m.trace().re, 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_is_hermitian_and_hermitize() {
        assert!(pauli_y().is_hermitian(1e-12));
        let mut m = ComplexMatrix::zeros(2);
        m.set(0, 1, Complex64::new(1.0, 1.0)).unwrap();
        assert!(!m.is_hermitian(1e-12));
        m.hermitize();
        assert!(m.is_hermitian(1e-15));
        assert_eq!(m[(0, 1)], Complex64::new(0.5, 0.5));
        assert_eq!(m[(1, 0)], Complex64::new(0.5, -0.5));
    }

    #[test]
    fn test_embed_doubled_preserves_content() {
        let mut m = ComplexMatrix::zeros(2);
        m.set(0, 0, c(0.25)).unwrap();
        m.set(1, 1, c(0.75)).unwrap();
        m.set(0, 1, Complex64::new(0.1, 0.2)).unwrap();

        let low = m.embed_doubled(0);
        assert_eq!(low.dim(), 4);
        assert_eq!(low[(0, 1)], Complex64::new(0.1, 0.2));
        assert_eq!(low[(2, 2)], ZERO);

        let high = m.embed_doubled(1);
        assert_eq!(high[(2, 2)], c(0.25));
        assert_eq!(high[(3, 3)], c(0.75));
        assert_eq!(high[(2, 3)], Complex64::new(0.1, 0.2));
        assert_eq!(high[(0, 0)], ZERO);
        assert_relative_eq!(high.trace().re, 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_tensor_identity_blocks() {
        let x = pauli_x();
        let big = x.tensor_identity();
        assert_eq!(big.dim(), 4);
        assert_eq!(big[(0, 1)], ONE);
        assert_eq!(big[(2, 3)], ONE);
        assert_eq!(big[(0, 3)], ZERO);
    }

    #[test]
    fn test_basis_projector() {
        let p = ComplexMatrix::basis_projector(4, 3).unwrap();
        assert_eq!(p[(3, 3)], ONE);
        assert_relative_eq!(p.trace().re, 1.0);
        assert!(ComplexMatrix::basis_projector(4, 4).is_err());
    }

    #[test]
    fn test_serde_round_trip_json() {
        let y = pauli_y();
        let json = serde_json::to_string(&y).unwrap();
        let back: ComplexMatrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, y);
    }

    #[test]
    fn test_deserialize_rejects_non_square() {
        let rect: Array2<Complex64> = Array2::zeros((4, 3));
        let json = serde_json::to_string(&rect).unwrap();
        assert!(serde_json::from_str::<ComplexMatrix>(&json).is_err());
    }

    #[test]
    fn test_is_finite() {
        let mut m = pauli_y();
        assert!(m.is_finite());
        m.set(0, 1, Complex64::new(0.0, f64::INFINITY)).unwrap();
        assert!(!m.is_finite());
    }
}
