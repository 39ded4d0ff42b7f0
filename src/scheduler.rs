// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Round-robin evolution of many independent substrates.
//!
//! Each tick advances one fixed-size batch of slots. A slot is evolved by the
//! time elapsed since *its own* last evolution, so slots that wait several
//! ticks catch up in one larger step instead of losing time.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::computer::{EvolutionReport, QuantumSubstrate};
use crate::error::{ConfigurationError, Error};

/// Scheduler tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Slots evolved per tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Steps run by `prime_lookahead_buffers`.
    #[serde(default = "default_lookahead_steps")]
    pub lookahead_steps: usize,

    /// Step length used by `prime_lookahead_buffers`.
    #[serde(default = "default_lookahead_dt")]
    pub lookahead_dt: f64,
}

fn default_batch_size() -> usize {
    2
}

fn default_lookahead_steps() -> usize {
    5
}

fn default_lookahead_dt() -> f64 {
    0.1
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            lookahead_steps: default_lookahead_steps(),
            lookahead_dt: default_lookahead_dt(),
        }
    }
}

/// What happened to one slot during a tick.
#[derive(Debug)]
pub struct SlotResult {
    pub index: usize,
    pub name: String,
    /// Elapsed time the slot was asked to cover.
    pub dt: f64,
    pub outcome: std::result::Result<EvolutionReport, Error>,
}

/// Result of one [`EvolutionScheduler::tick`].
#[derive(Debug, Default)]
pub struct TickReport {
    pub tick: u64,
    pub now: f64,
    pub slots: Vec<SlotResult>,
}

impl TickReport {
    /// Indices of the slots that were evolved.
    pub fn evolved(&self) -> Vec<usize> {
        self.slots.iter().map(|s| s.index).collect()
    }

    /// Slots whose evolution failed.
    pub fn failures(&self) -> impl Iterator<Item = &SlotResult> {
        self.slots.iter().filter(|s| s.outcome.is_err())
    }
}

struct Slot<S> {
    name: String,
    system: S,
    last_evolved: f64,
}

/// Round-robin driver over registered substrates.
pub struct EvolutionScheduler<S: QuantumSubstrate> {
    settings: SchedulerSettings,
    slots: Vec<Slot<S>>,
    cursor: usize,
    ticks: u64,
    primed: bool,
}

impl<S: QuantumSubstrate> EvolutionScheduler<S> {
    /// A zero batch size is raised to one.
    pub fn new(mut settings: SchedulerSettings) -> Self {
        settings.batch_size = settings.batch_size.max(1);
        Self {
            settings,
            slots: Vec::new(),
            cursor: 0,
            ticks: 0,
            primed: false,
        }
    }

    /// Add a substrate whose clock starts at `now`. Returns its slot index.
    pub fn register(&mut self, name: &str, system: S, now: f64) -> usize {
        self.slots.push(Slot {
            name: name.to_string(),
            system,
            last_evolved: now,
        });
        let index = self.slots.len() - 1;
        info!(slot = index, name, "Registered substrate");
        index
    }

    /// Advance the next batch of slots to `now`.
    ///
    /// A slot whose evolution fails keeps its previous timestamp, so the
    /// missed interval is retried on its next turn. Other slots in the batch
    /// still run.
    pub fn tick(&mut self, now: f64) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            now,
            slots: Vec::new(),
        };
        if self.slots.is_empty() {
            return report;
        }

        let count = self.settings.batch_size.min(self.slots.len());
        for offset in 0..count {
            let index = (self.cursor + offset) % self.slots.len();
            let slot = &mut self.slots[index];
            let dt = now - slot.last_evolved;

            let outcome = if !dt.is_finite() || dt < 0.0 {
                Err(ConfigurationError::InvalidValue {
                    field: "now".into(),
                    message: format!("clock moved backwards: now={now}, last={}", slot.last_evolved),
                }
                .into())
            } else {
                slot.system.evolve(dt)
            };

            match &outcome {
                Ok(_) => slot.last_evolved = now,
                Err(e) => warn!(slot = index, name = %slot.name, dt, error = %e, "Evolution failed"),
            }

            report.slots.push(SlotResult {
                index,
                name: slot.name.clone(),
                dt,
                outcome,
            });
        }
        self.cursor = (self.cursor + count) % self.slots.len();

        debug!(tick = self.ticks, now, evolved = count, "Scheduler tick");
        report
    }

    /// Pre-evolve every slot by `lookahead_steps × lookahead_dt`, once.
    ///
    /// Returns `false` if priming already happened. Slot timestamps are not
    /// changed.
    pub fn prime_lookahead_buffers(&mut self) -> bool {
        if self.primed {
            return false;
        }
        let SchedulerSettings {
            lookahead_steps,
            lookahead_dt,
            ..
        } = self.settings;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            for step in 0..lookahead_steps {
                if let Err(e) = slot.system.evolve(lookahead_dt) {
                    warn!(slot = index, name = %slot.name, step, error = %e, "Lookahead priming failed");
                    break;
                }
            }
        }
        self.primed = true;
        info!(slots = self.slots.len(), lookahead_steps, lookahead_dt, "Primed lookahead buffers");
        true
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&S> {
        self.slots.get(index).map(|s| &s.system)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut S> {
        self.slots.get_mut(index).map(|s| &mut s.system)
    }

    /// Slot index registered under `name`.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.name == name)
    }

    /// Time the slot was last advanced to.
    pub fn last_evolved(&self, index: usize) -> Option<f64> {
        self.slots.get(index).map(|s| s.last_evolved)
    }

    pub fn batch_size(&self) -> usize {
        self.settings.batch_size
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computer::QuantumComputer;
    use crate::test_utils::{exchange_declarations, pair_computer, ready_pair};
    use approx::assert_relative_eq;

    fn scheduler_with(n: usize) -> EvolutionScheduler<QuantumComputer> {
        let mut sched = EvolutionScheduler::new(SchedulerSettings::default());
        for i in 0..n {
            let mut qc = ready_pair(&exchange_declarations(0.5));
            qc.prepare_basis_state(&["sun"]).unwrap();
            sched.register(&format!("slot{i}"), qc, 0.0);
        }
        sched
    }

    #[test]
    fn test_round_robin_batches() {
        let mut sched = scheduler_with(3);
        assert_eq!(sched.tick(1.0).evolved(), vec![0, 1]);
        assert_eq!(sched.tick(2.0).evolved(), vec![2, 0]);
        assert_eq!(sched.tick(3.0).evolved(), vec![1, 2]);
    }

    #[test]
    fn test_per_slot_elapsed_time() {
        let mut sched = scheduler_with(3);
        sched.tick(1.0);
        let report = sched.tick(2.0);
        // slot 2 waited since 0.0, slot 0 since 1.0
        assert_relative_eq!(report.slots[0].dt, 2.0);
        assert_relative_eq!(report.slots[1].dt, 1.0);
        assert_relative_eq!(sched.get(2).unwrap().time(), 2.0, epsilon = 1e-12);
        assert_eq!(sched.last_evolved(0), Some(2.0));
        assert_eq!(sched.last_evolved(1), Some(1.0));
    }

    #[test]
    fn test_failure_does_not_stop_batch() {
        let mut sched = EvolutionScheduler::new(SchedulerSettings::default());
        // never built: evolve fails with NotReady
        sched.register("broken", pair_computer("broken"), 0.0);
        sched.register("fine", ready_pair(&exchange_declarations(0.5)), 0.0);

        let report = sched.tick(1.0);
        assert_eq!(report.slots.len(), 2);
        assert_eq!(report.failures().count(), 1);
        assert!(matches!(report.slots[0].outcome, Err(Error::NotReady(_))));
        assert!(report.slots[1].outcome.is_ok());
        assert_eq!(sched.last_evolved(0), Some(0.0));
        assert_eq!(sched.last_evolved(1), Some(1.0));
    }

    #[test]
    fn test_clock_going_backwards_is_reported() {
        let mut sched = scheduler_with(1);
        sched.tick(2.0);
        let report = sched.tick(1.0);
        assert_eq!(report.failures().count(), 1);
        assert!(matches!(
            report.slots[0].outcome,
            Err(Error::Configuration(ConfigurationError::InvalidValue { .. }))
        ));
        assert_eq!(sched.last_evolved(0), Some(2.0));
    }

    #[test]
    fn test_empty_scheduler_tick() {
        let mut sched: EvolutionScheduler<QuantumComputer> =
            EvolutionScheduler::new(SchedulerSettings::default());
        assert!(sched.tick(1.0).slots.is_empty());
        assert!(sched.is_empty());
    }

    #[test]
    fn test_prime_runs_once() {
        let mut sched = scheduler_with(2);
        assert!(!sched.is_primed());
        assert!(sched.prime_lookahead_buffers());
        assert!(!sched.prime_lookahead_buffers());

        let qc = sched.get(0).unwrap();
        // 5 × 0.1 of exchange moved population off the start state
        assert_relative_eq!(qc.time(), 0.5, epsilon = 1e-12);
        assert!(qc.get_population("sun").unwrap() < 1.0);
        assert_eq!(sched.last_evolved(0), Some(0.0));
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        let sched: EvolutionScheduler<QuantumComputer> = EvolutionScheduler::new(SchedulerSettings {
            batch_size: 0,
            ..Default::default()
        });
        assert_eq!(sched.batch_size(), 1);
    }

    #[test]
    fn test_lookup() {
        let mut sched = scheduler_with(2);
        assert_eq!(sched.find("slot1"), Some(1));
        assert_eq!(sched.find("missing"), None);
        assert_eq!(sched.len(), 2);
        sched.get_mut(1).unwrap().reset_to_ground_state();
        assert_relative_eq!(sched.get(1).unwrap().get_population("moon").unwrap(), 1.0);
    }
}
