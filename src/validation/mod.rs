// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Input validation for declaration sets and density matrices.
//!
//! The operator builders skip bad terms with a warning. These checks reject
//! them up front instead, and are what strict mode runs before a build.

use std::collections::HashSet;

use crate::config::ResourceLimits;
use crate::declaration::{IconDeclaration, SubstrateDefinition};
use crate::error::{ConfigurationError, Result};
use crate::math::ComplexMatrix;
use crate::register::RegisterMap;

/// Validate that a register of `num_qubits` axes fits the configured limit.
pub fn validate_qubit_count(num_qubits: usize, limits: &ResourceLimits) -> Result<()> {
    if num_qubits > limits.max_qubits {
        return Err(invalid(
            "axes",
            format!(
                "{} axes requested, limit is {}",
                num_qubits, limits.max_qubits
            ),
        ));
    }
    Ok(())
}

/// Validate every declaration against the register it will be built for.
///
/// Returns the first problem found.
pub fn validate_declarations(
    declarations: &[IconDeclaration],
    register: &RegisterMap,
) -> Result<()> {
    let mut seen = HashSet::new();
    for decl in declarations {
        let label = decl.label.as_str();
        if label.is_empty() {
            return Err(invalid("label", "must not be empty"));
        }
        if !seen.insert(label) {
            return Err(ConfigurationError::LabelConflict {
                label: label.to_string(),
            }
            .into());
        }
        known(register, label)?;

        finite(&format!("{label}.self_energy"), decl.self_energy)?;

        if let Some(driver) = &decl.driver {
            finite(&format!("{label}.driver.frequency"), driver.frequency)?;
            finite(&format!("{label}.driver.phase"), driver.phase)?;
            finite(&format!("{label}.driver.amplitude"), driver.amplitude)?;
        }

        for (other, &strength) in &decl.hamiltonian_couplings {
            let field = format!("{label}.hamiltonian_couplings[{other}]");
            known(register, other)?;
            finite(&field, strength)?;
            if register.qubit(other) == register.qubit(label) {
                return Err(invalid(&field, "exchange needs two different axes"));
            }
        }

        for (target, &rate) in &decl.lindblad_outgoing {
            transfer(register, &format!("{label}.lindblad_outgoing[{target}]"), label, target, rate)?;
        }
        for (source, &rate) in &decl.lindblad_incoming {
            transfer(register, &format!("{label}.lindblad_incoming[{source}]"), source, label, rate)?;
        }

        if let Some(decay) = &decl.decay {
            transfer(register, &format!("{label}.decay"), label, &decay.target, decay.rate)?;
        }

        for (i, gated) in decl.gated_lindblad.iter().enumerate() {
            let field = format!("{label}.gated_lindblad[{i}]");
            transfer(register, &field, &gated.source, label, gated.rate)?;
            known(register, &gated.gate)?;
            finite(&format!("{field}.power"), gated.power)?;
            if gated.power < 0.0 {
                return Err(invalid(&field, format!("power must be >= 0, got {}", gated.power)));
            }
        }
    }
    Ok(())
}

/// Validate a whole definition file: axis count, axis labels, then
/// declarations. Returns the register the axes describe.
pub fn validate_definition(
    definition: &SubstrateDefinition,
    limits: &ResourceLimits,
) -> Result<RegisterMap> {
    validate_qubit_count(definition.axes.len(), limits)?;
    let mut register = RegisterMap::new();
    for axis in &definition.axes {
        register.allocate_axis(&axis.north, &axis.south)?;
    }
    validate_declarations(&definition.declarations, &register)?;
    Ok(register)
}

/// Validate that ρ is a density matrix: unit trace, Hermitian, populations
/// within [0, 1], all to within `tolerance`.
pub fn validate_density_matrix(rho: &ComplexMatrix, tolerance: f64) -> Result<()> {
    let trace = rho.trace();
    if !trace.re.is_finite() || (trace.re - 1.0).abs() > tolerance || trace.im.abs() > tolerance {
        return Err(invalid("rho", format!("trace is {trace}, expected 1")));
    }
    if !rho.is_hermitian(tolerance) {
        return Err(invalid("rho", "not Hermitian"));
    }
    for (i, p) in rho.diagonal_real().into_iter().enumerate() {
        if !(-tolerance..=1.0 + tolerance).contains(&p) {
            return Err(invalid(
                "rho",
                format!("population {} at index {} outside [0, 1]", p, i),
            ));
        }
    }
    Ok(())
}

fn transfer(register: &RegisterMap, field: &str, source: &str, target: &str, rate: f64) -> Result<()> {
    known(register, source)?;
    known(register, target)?;
    finite(field, rate)?;
    if rate < 0.0 {
        return Err(invalid(field, format!("rate must be >= 0, got {}", rate)));
    }
    if source == target {
        return Err(invalid(field, "source and target are the same label"));
    }
    Ok(())
}

fn known(register: &RegisterMap, label: &str) -> Result<()> {
    if register.contains(label) {
        Ok(())
    } else {
        Err(ConfigurationError::unknown(label).into())
    }
}

fn finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite, got {}", value)))
    }
}

fn invalid(field: &str, message: impl Into<String>) -> crate::error::Error {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
    .into()
}
