// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Complex scalar and dense matrix primitives.

pub mod complex;
pub mod eigen;
pub mod matrix;

pub use complex::{c, ComplexExt, I, ONE, ZERO};
pub use eigen::Eigensystem;
pub use matrix::ComplexMatrix;
pub use num_complex::Complex64;
