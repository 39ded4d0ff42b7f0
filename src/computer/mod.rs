// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! The simulated quantum computer.
//!
//! A [`QuantumComputer`] owns a [`RegisterMap`], the density matrix ρ and
//! the operators built from a declaration set. It is the only thing that
//! mutates ρ. Consumers normally program against the [`QuantumSubstrate`]
//! trait.
//!
//! Lifecycle: created empty (zero axes, ρ = [1]) → axes allocated one at a
//! time → operators built → evolved, queried and measured → reset.

pub mod integrate;
mod measurement;
mod observables;
pub mod substrate;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::cache::{CacheKey, CachedOperators, OperatorCache};
use crate::declaration::IconDeclaration;
use crate::error::{ConfigurationError, Error, Result};
use crate::math::ComplexMatrix;
use crate::operators::{
    self, apply_driven_terms, exchange_coupling, BuiltOperators, Channel, SkippedTerm,
};
use crate::register::{Pole, RegisterMap};
use crate::validation;

pub use measurement::MeasurementOutcome;
pub use observables::{
    reduced_density_matrix, von_neumann_entropy, BlochVector, Diagnostics, LookaheadFrame,
    PairInformation,
};
pub use substrate::QuantumSubstrate;

/// Integration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionSettings {
    /// Largest integration substep.
    #[serde(default = "default_max_dt")]
    pub max_dt: f64,

    /// Largest tolerated |Tr(ρ) − 1| after a step before renormalization.
    #[serde(default = "default_trace_tolerance")]
    pub trace_tolerance: f64,

    /// Most substeps one `evolve` call may take; longer intervals are
    /// rejected rather than run unbounded.
    #[serde(default = "default_max_substeps")]
    pub max_substeps: usize,

    /// Measurement RNG seed. `None` seeds from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_max_dt() -> f64 {
    0.02
}

fn default_trace_tolerance() -> f64 {
    1e-3
}

fn default_max_substeps() -> usize {
    1_000_000
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self {
            max_dt: default_max_dt(),
            trace_tolerance: default_trace_tolerance(),
            max_substeps: default_max_substeps(),
            seed: None,
        }
    }
}

impl EvolutionSettings {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_dt.is_finite() && self.max_dt > 0.0) {
            return Err(Error::Config(format!(
                "evolution.max_dt must be positive, got {}",
                self.max_dt
            )));
        }
        if !(self.trace_tolerance.is_finite() && self.trace_tolerance > 0.0) {
            return Err(Error::Config(format!(
                "evolution.trace_tolerance must be positive, got {}",
                self.trace_tolerance
            )));
        }
        if self.max_substeps == 0 {
            return Err(Error::Config("evolution.max_substeps cannot be 0".into()));
        }
        Ok(())
    }
}

/// Outcome of the last operator build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildSummary {
    pub key: CacheKey,
    pub cache_hit: bool,
    pub skipped: Vec<SkippedTerm>,
}

/// What one call to `evolve` did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvolutionReport {
    pub t_start: f64,
    pub t_end: f64,
    pub steps: usize,
    pub substep_dt: f64,
    /// Largest |Tr(ρ) − 1| seen before renormalization.
    pub max_trace_drift: f64,
    /// Largest step outside the physical set before clipping (see
    /// [`integrate::physicality_excursion`]).
    pub max_excursion: f64,
    /// Steps whose drift or excursion exceeded the tolerance.
    pub invariant_violations: usize,
}

/// Exchange term added on top of the declared Hamiltonian.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ExtraCoupling {
    qubit_a: usize,
    qubit_b: usize,
    strength: f64,
}

/// Density-matrix simulator over a labelled register.
#[derive(Debug, Clone)]
pub struct QuantumComputer {
    name: String,
    settings: EvolutionSettings,
    strict: bool,
    register: RegisterMap,
    rho: ComplexMatrix,
    operators: Option<BuiltOperators>,
    couplings: Vec<ExtraCoupling>,
    build: Option<BuildSummary>,
    time: f64,
    rng: StdRng,
}

impl QuantumComputer {
    /// Empty system: zero axes, ρ = [1]. Fails on invalid settings.
    pub fn new(name: &str, settings: EvolutionSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self::with_settings(name, settings))
    }

    /// Empty system with default settings and a fixed measurement seed.
    pub fn with_seed(name: &str, seed: u64) -> Self {
        Self::with_settings(
            name,
            EvolutionSettings {
                seed: Some(seed),
                ..Default::default()
            },
        )
    }

    fn with_settings(name: &str, settings: EvolutionSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            name: name.to_string(),
            settings,
            strict: false,
            register: RegisterMap::new(),
            rho: ComplexMatrix::identity(1),
            operators: None,
            couplings: Vec::new(),
            build: None,
            time: 0.0,
            rng,
        }
    }

    /// Reject declaration sets with validation errors instead of skipping
    /// the offending terms.
    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &EvolutionSettings {
        &self.settings
    }

    pub fn register(&self) -> &RegisterMap {
        &self.register
    }

    /// Current density matrix.
    pub fn density_matrix(&self) -> &ComplexMatrix {
        &self.rho
    }

    /// Simulated time reached by `evolve`.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Whether operators have been built.
    pub fn is_ready(&self) -> bool {
        self.operators.is_some()
    }

    pub fn operators(&self) -> Option<&BuiltOperators> {
        self.operators.as_ref()
    }

    pub fn build_summary(&self) -> Option<&BuildSummary> {
        self.build.as_ref()
    }

    /// Add an axis. ρ becomes ρ ⊗ |ground⟩⟨ground| and built operators are
    /// extended with the identity on the new qubit.
    pub fn allocate_axis(&mut self, north: &str, south: &str) -> Result<usize> {
        let qubit = self.register.allocate_axis(north, south)?;
        self.rho = self.rho.embed_doubled(Pole::GROUND.bit());
        self.operators = self
            .operators
            .as_ref()
            .map(BuiltOperators::extend_for_new_qubit);
        info!(
            system = %self.name,
            qubit,
            north,
            south,
            dim = self.register.dimension(),
            "Allocated axis"
        );
        Ok(qubit)
    }

    /// Build operators for the current register, through the cache when
    /// one is given.
    pub fn build_operators(
        &mut self,
        declarations: &[IconDeclaration],
        cache: Option<&OperatorCache>,
    ) -> Result<BuildSummary> {
        if self.strict {
            validation::validate_declarations(declarations, &self.register)?;
        }

        let key = CacheKey::compute(&self.name, declarations)?;

        let cached = cache
            .and_then(|c| c.try_load(&self.name, &key))
            .filter(|entry| {
                let Some(reason) = entry.mismatch(&self.register) else {
                    return true;
                };
                if entry.axes == self.register.axes() {
                    warn!(system = %self.name, reason = %reason, "Ignoring malformed cached operators");
                } else {
                    debug!(system = %self.name, "Cached operators built for other axes");
                }
                false
            });

        let (mut ops, report, cache_hit) = match cached {
            Some(entry) => (entry.operators, entry.report, true),
            None => {
                let (ops, report) = operators::build_operators(declarations, &self.register);
                if let Some(cache) = cache {
                    let entry = CachedOperators::new(
                        &self.name,
                        key.clone(),
                        &self.register,
                        ops.clone(),
                        report.clone(),
                    );
                    if let Err(e) = cache.save(&entry) {
                        warn!(system = %self.name, error = %e, "Failed to save operators");
                    }
                }
                (ops, report, false)
            }
        };

        for coupling in &self.couplings {
            apply_extra_coupling(&mut ops, coupling);
        }

        info!(
            system = %self.name,
            key = %key,
            cache_hit,
            skipped = report.skipped.len(),
            channels = ops.channel_count(),
            "Operators ready"
        );

        let summary = BuildSummary {
            key,
            cache_hit,
            skipped: report.skipped,
        };
        self.operators = Some(ops);
        self.build = Some(summary.clone());
        Ok(summary)
    }

    /// Exchange coupling between the north poles of two axes. Kept across
    /// rebuilds.
    pub fn add_coupling(&mut self, qubit_a: usize, qubit_b: usize, strength: f64) -> Result<()> {
        let n = self.register.num_qubits();
        for q in [qubit_a, qubit_b] {
            if q >= n {
                return Err(ConfigurationError::out_of_range(q, n).into());
            }
        }
        if qubit_a == qubit_b {
            return Err(ConfigurationError::InvalidValue {
                field: "qubit_b".into(),
                message: format!("cannot couple qubit {qubit_a} to itself"),
            }
            .into());
        }
        if !strength.is_finite() {
            return Err(ConfigurationError::InvalidValue {
                field: "strength".into(),
                message: format!("must be finite, got {strength}"),
            }
            .into());
        }

        let coupling = ExtraCoupling {
            qubit_a,
            qubit_b,
            strength,
        };
        if let Some(ops) = &mut self.operators {
            apply_extra_coupling(ops, &coupling);
        }
        self.couplings.push(coupling);
        debug!(system = %self.name, qubit_a, qubit_b, strength, "Added coupling");
        Ok(())
    }

    /// Advance the internal clock by `dt`.
    pub fn evolve(&mut self, dt: f64) -> Result<EvolutionReport> {
        self.evolve_at(self.time, dt)
    }

    /// Integrate from simulated time `t` to `t + dt`.
    ///
    /// The substep is `max_dt`, shrunk to keep RK4 stable for the fastest
    /// rate in the operators. Driven terms and gated rates are re-evaluated
    /// before every substep. On failure ρ and the clock are left as they were.
    pub fn evolve_at(&mut self, t: f64, dt: f64) -> Result<EvolutionReport> {
        if !dt.is_finite() || dt < 0.0 || !t.is_finite() {
            return Err(ConfigurationError::InvalidValue {
                field: "dt".into(),
                message: format!("need finite t and non-negative dt, got t={t}, dt={dt}"),
            }
            .into());
        }
        let Some(ops) = &self.operators else {
            return Err(Error::NotReady(format!(
                "operators for '{}' have not been built",
                self.name
            )));
        };

        let h_max = integrate::stable_step(self.settings.max_dt, ops.rate_bound());
        let limit = self.settings.max_substeps;
        let Some(steps) = integrate::substep_count(dt, h_max, limit) else {
            return Err(ConfigurationError::InvalidValue {
                field: "dt".into(),
                message: format!("{dt} needs more than {limit} substeps of {h_max}"),
            }
            .into());
        };
        let h = if steps == 0 { 0.0 } else { dt / steps as f64 };
        let mut report = EvolutionReport {
            t_start: t,
            t_end: t + dt,
            steps,
            substep_dt: h,
            max_trace_drift: 0.0,
            max_excursion: 0.0,
            invariant_violations: 0,
        };

        let mut rho = self.rho.clone();
        for step in 0..steps {
            let now = t + step as f64 * h;

            let hamiltonian = if ops.driven.is_empty() {
                None
            } else {
                Some(apply_driven_terms(&ops.hamiltonian, &ops.driven, now))
            };
            let hamiltonian = hamiltonian.as_ref().unwrap_or(&ops.hamiltonian);

            let diagonal = rho.diagonal_real();
            let channels: Vec<Channel<'_>> = ops
                .lindblad
                .iter()
                .map(|op| Channel::new(op, 1.0))
                .chain(ops.gated.iter().map(|g| {
                    Channel::new(&g.operator, g.effective_rate(g.gate_population(&diagonal)))
                }))
                .collect();

            let mut next = integrate::rk4_step(&rho, hamiltonian, &channels, h);

            let excursion = integrate::physicality_excursion(&next);
            if !excursion.is_finite() {
                return Err(Error::NumericInvariant(format!(
                    "state of '{}' became non-finite at t={now}",
                    self.name
                )));
            }
            let drift = (integrate::trace_real(&next) - 1.0).abs();
            report.max_trace_drift = report.max_trace_drift.max(drift);
            report.max_excursion = report.max_excursion.max(excursion);

            let tolerance = self.settings.trace_tolerance;
            if drift > tolerance || excursion > tolerance {
                report.invariant_violations += 1;
                error!(
                    system = %self.name,
                    step,
                    time = now,
                    drift,
                    excursion,
                    tolerance,
                    "Density matrix left the physical set"
                );
            }

            if integrate::restore_physicality(&mut next).is_none() {
                return Err(Error::NumericInvariant(format!(
                    "trace of '{}' collapsed at t={now}",
                    self.name
                )));
            }
            rho = next;
        }

        self.rho = rho;
        self.time = t + dt;
        debug!(
            system = %self.name,
            t_end = self.time,
            steps,
            max_trace_drift = report.max_trace_drift,
            "Evolved"
        );
        Ok(report)
    }

    /// ρ = |b⟩⟨b| for the basis state naming `labels`; axes not named take
    /// their ground pole. Returns b.
    pub fn prepare_basis_state<S: AsRef<str>>(&mut self, labels: &[S]) -> Result<usize> {
        let basis = self.register.labels_to_basis(labels)?;
        self.rho = ComplexMatrix::basis_projector(self.register.dimension(), basis)?;
        debug!(system = %self.name, basis, "Prepared basis state");
        Ok(basis)
    }

    /// ρ = |ground⟩⟨ground|.
    pub fn reset_to_ground_state(&mut self) {
        let ground = self.register.ground_state_index();
        let dim = self.register.dimension();
        self.rho = ComplexMatrix::basis_projector(dim, ground)
            .unwrap_or_else(|_| ComplexMatrix::identity(dim));
        debug!(system = %self.name, ground, "Reset to ground state");
    }

    /// Tr(ρ), for diagnostics.
    pub fn get_trace(&self) -> f64 {
        integrate::trace_real(&self.rho)
    }
}

fn apply_extra_coupling(ops: &mut BuiltOperators, coupling: &ExtraCoupling) {
    exchange_coupling(
        &mut ops.hamiltonian,
        (coupling.qubit_a, Pole::North),
        (coupling.qubit_b, Pole::North),
        coupling.strength,
    );
}
