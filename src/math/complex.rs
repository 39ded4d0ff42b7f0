// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Complex scalar helpers on top of `num_complex::Complex64`.
//!
//! `Complex64` already provides add/sub/mul/div, `scale`, `conj`, `norm`,
//! `norm_sqr`, `arg` and `from_polar`. This module adds the few operations
//! the substrate needs beyond that.

use num_complex::Complex64;

/// Denominators with |z|² below this are treated as zero by [`ComplexExt::checked_div`].
pub const DIV_EPSILON: f64 = 1e-300;

/// Zero.
pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);
/// One.
pub const ONE: Complex64 = Complex64::new(1.0, 0.0);
/// Imaginary unit.
pub const I: Complex64 = Complex64::new(0.0, 1.0);

/// Real scalar as a complex number.
#[inline]
pub fn c(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

/// Extra scalar operations.
pub trait ComplexExt {
    /// Squared magnitude |z|².
    fn abs_sq(&self) -> f64;

    /// Division that returns `None` instead of inf/NaN when the denominator
    /// is (numerically) zero.
    fn checked_div(&self, rhs: Complex64) -> Option<Complex64>;

    /// Component-wise comparison within `tol`.
    fn approx_eq(&self, other: Complex64, tol: f64) -> bool;
}

impl ComplexExt for Complex64 {
    #[inline]
    fn abs_sq(&self) -> f64 {
        self.norm_sqr()
    }

    fn checked_div(&self, rhs: Complex64) -> Option<Complex64> {
        if rhs.norm_sqr() < DIV_EPSILON {
            None
        } else {
            Some(*self / rhs)
        }
    }

    fn approx_eq(&self, other: Complex64, tol: f64) -> bool {
        (self.re - other.re).abs() <= tol && (self.im - other.im).abs() <= tol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_checked_div_regular() {
        let a = Complex64::new(1.0, 2.0);
        let b = Complex64::new(3.0, -1.0);
        let q = a.checked_div(b).unwrap();
        // (1+2i)/(3-i) = (1+2i)(3+i)/10 = (1+7i)/10
        assert_relative_eq!(q.re, 0.1, epsilon = 1e-12);
        assert_relative_eq!(q.im, 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_checked_div_near_zero_denominator() {
        let a = Complex64::new(1.0, 0.0);
        assert!(a.checked_div(ZERO).is_none());
        assert!(a.checked_div(Complex64::new(1e-200, 0.0)).is_none());
    }

    #[test]
    fn test_abs_sq_and_polar() {
        let z = Complex64::from_polar(2.0, PI / 3.0);
        assert_relative_eq!(z.abs_sq(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(z.norm(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(z.arg(), PI / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constants() {
        assert_eq!(I * I, -ONE);
        assert_eq!(c(2.5) + ZERO, Complex64::new(2.5, 0.0));
        let z = Complex64::new(1.5, -2.0);
        assert_eq!(z.conj(), Complex64::new(1.5, 2.0));
        assert_eq!(z * I, Complex64::new(2.0, 1.5));
    }

    #[test]
    fn test_approx_eq() {
        let z = Complex64::new(0.5, 0.5);
        assert!(z.approx_eq(Complex64::new(0.5 + 1e-10, 0.5), 1e-9));
        assert!(!z.approx_eq(Complex64::new(0.6, 0.5), 1e-9));
    }
}
