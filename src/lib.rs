// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quantum substrate simulator
//!
//! This crate simulates a small register of two-level systems ("axes") as a
//! dense density matrix driven by the Lindblad master equation. Couplings,
//! dissipative transfers, decays and drivers are declared per label and
//! turned into operators once per configuration, optionally through a
//! two-tier operator cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          EvolutionScheduler              │
//! │   (round-robin batches of substrates)    │
//! ├─────────────────────────────────────────┤
//! │   QuantumSubstrate / QuantumComputer     │
//! │  evolve · measure · populations · MI     │
//! ├──────────────────┬──────────────────────┤
//! │ Operator builders│   OperatorCache       │
//! │ (H, L, gated L)  │ (memory/disk/bundled) │
//! ├──────────────────┴──────────────────────┤
//! │   RegisterMap · ComplexMatrix · RK4      │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`register`]: label ↔ (qubit, pole) bookkeeping
//! - [`declaration`]: declarative coupling and decay rules
//! - [`operators`]: Hamiltonian and Lindblad operator builders
//! - [`cache`]: content-addressed operator cache
//! - [`computer`]: the simulated system and the [`QuantumSubstrate`] trait
//! - [`scheduler`]: round-robin evolution of many systems
//! - [`config`]: Configuration management
//! - [`validation`]: Input validation utilities
//! - [`error`]: Error types

pub mod cache;
pub mod computer;
pub mod config;
pub mod declaration;
pub mod error;
pub mod math;
pub mod operators;
pub mod register;
pub mod scheduler;
pub mod validation;

pub use cache::{CacheKey, OperatorCache};
pub use computer::{EvolutionSettings, QuantumComputer, QuantumSubstrate};
pub use config::Config;
pub use declaration::{IconDeclaration, SubstrateDefinition};
pub use error::{Error, Result};
pub use register::{Pole, RegisterMap};
pub use scheduler::EvolutionScheduler;

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
