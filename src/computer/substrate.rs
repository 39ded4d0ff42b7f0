// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! The interface consumers of a simulated substrate program against.

use super::{BuildSummary, EvolutionReport, MeasurementOutcome, QuantumComputer};
use crate::cache::OperatorCache;
use crate::declaration::IconDeclaration;
use crate::error::Result;
use crate::math::ComplexMatrix;
use crate::register::RegisterMap;

/// Operations every substrate exposes.
///
/// Mutating operations take `&mut self`; a failed call leaves the state as
/// it was.
pub trait QuantumSubstrate {
    /// Configuration name, also the cache namespace.
    fn name(&self) -> &str;

    /// Read-only label mapping.
    fn register(&self) -> &RegisterMap;

    fn allocate_axis(&mut self, north: &str, south: &str) -> Result<usize>;

    fn build_operators(
        &mut self,
        declarations: &[IconDeclaration],
        cache: Option<&OperatorCache>,
    ) -> Result<BuildSummary>;

    /// Advance simulated time by `dt`.
    fn evolve(&mut self, dt: f64) -> Result<EvolutionReport>;

    fn get_population(&self, label: &str) -> Result<f64>;

    fn get_basis_probability(&self, basis: usize) -> Result<f64>;

    fn get_marginal(&self, qubit: usize) -> Result<ComplexMatrix>;

    fn measure_register(&mut self, qubit: usize) -> Result<MeasurementOutcome>;

    fn measure_all_qubits(&mut self) -> Result<usize>;

    fn add_coupling(&mut self, qubit_a: usize, qubit_b: usize, strength: f64) -> Result<()>;

    fn reset_to_ground_state(&mut self);

    fn get_trace(&self) -> f64;
}

impl QuantumSubstrate for QuantumComputer {
    fn name(&self) -> &str {
        QuantumComputer::name(self)
    }

    fn register(&self) -> &RegisterMap {
        QuantumComputer::register(self)
    }

    fn allocate_axis(&mut self, north: &str, south: &str) -> Result<usize> {
        QuantumComputer::allocate_axis(self, north, south)
    }

    fn build_operators(
        &mut self,
        declarations: &[IconDeclaration],
        cache: Option<&OperatorCache>,
    ) -> Result<BuildSummary> {
        QuantumComputer::build_operators(self, declarations, cache)
    }

    fn evolve(&mut self, dt: f64) -> Result<EvolutionReport> {
        QuantumComputer::evolve(self, dt)
    }

    fn get_population(&self, label: &str) -> Result<f64> {
        QuantumComputer::get_population(self, label)
    }

    fn get_basis_probability(&self, basis: usize) -> Result<f64> {
        QuantumComputer::get_basis_probability(self, basis)
    }

    fn get_marginal(&self, qubit: usize) -> Result<ComplexMatrix> {
        QuantumComputer::get_marginal(self, qubit)
    }

    fn measure_register(&mut self, qubit: usize) -> Result<MeasurementOutcome> {
        QuantumComputer::measure_register(self, qubit)
    }

    fn measure_all_qubits(&mut self) -> Result<usize> {
        QuantumComputer::measure_all_qubits(self)
    }

    fn add_coupling(&mut self, qubit_a: usize, qubit_b: usize, strength: f64) -> Result<()> {
        QuantumComputer::add_coupling(self, qubit_a, qubit_b, strength)
    }

    fn reset_to_ground_state(&mut self) {
        QuantumComputer::reset_to_ground_state(self)
    }

    fn get_trace(&self) -> f64 {
        QuantumComputer::get_trace(self)
    }
}
