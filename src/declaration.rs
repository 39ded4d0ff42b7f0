// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Declarative coupling, decay and driver rules.
//!
//! Declarations are supplied by a content layer, usually as YAML:
//!
//! ```yaml
//! name: forest
//! axes:
//!   - { north: sun, south: moon }
//!   - { north: wheat, south: soil }
//! declarations:
//!   - label: sun
//!     self_energy: 0.5
//!     driver: { kind: cosine, frequency: 0.1, phase: 0.0, amplitude: 0.2 }
//!     hamiltonian_couplings: { wheat: 0.3 }
//!   - label: wheat
//!     lindblad_incoming: { soil: 0.05 }
//!     decay: { rate: 0.01, target: soil }
//!     gated_lindblad:
//!       - { source: soil, rate: 0.2, gate: sun, power: 1.0 }
//! ```

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::register::AxisLabels;

/// Time-dependent driver shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// A·cos(2πft + φ)
    Cosine,
    /// A·sin(2πft + φ)
    Sine,
    /// A while (f·t mod 1) < 0.5, else 0
    Pulse,
}

impl DriverKind {
    /// Driver value at simulated time `t`.
    pub fn evaluate(self, t: f64, frequency: f64, phase: f64, amplitude: f64) -> f64 {
        match self {
            DriverKind::Cosine => amplitude * (2.0 * PI * frequency * t + phase).cos(),
            DriverKind::Sine => amplitude * (2.0 * PI * frequency * t + phase).sin(),
            DriverKind::Pulse => {
                if (frequency * t).rem_euclid(1.0) < 0.5 {
                    amplitude
                } else {
                    0.0
                }
            }
        }
    }
}

/// Driver attached to a label's self-energy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverSpec {
    pub kind: DriverKind,
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub phase: f64,
    #[serde(default = "default_one")]
    pub amplitude: f64,
}

/// Irreversible decay of a label into a target label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecaySpec {
    pub rate: f64,
    pub target: String,
}

/// Transfer from `source` into the declaring label, scaled by a live gate
/// population: `rate · P(gate)^power`, or `rate · (1 − P(gate))^power` when
/// `inverted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatedSpec {
    pub source: String,
    pub rate: f64,
    pub gate: String,
    #[serde(default = "default_one")]
    pub power: f64,
    #[serde(default)]
    pub inverted: bool,
}

/// Every rule attached to one label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IconDeclaration {
    pub label: String,

    #[serde(default)]
    pub self_energy: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverSpec>,

    /// Exchange couplings J to other labels.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub hamiltonian_couplings: BTreeMap<String, f64>,

    /// Transfer rates from this label to others.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lindblad_outgoing: BTreeMap<String, f64>,

    /// Transfer rates from others into this label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lindblad_incoming: BTreeMap<String, f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay: Option<DecaySpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gated_lindblad: Vec<GatedSpec>,
}

impl IconDeclaration {
    /// Declaration with only a label.
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..Default::default()
        }
    }

    pub fn with_self_energy(mut self, energy: f64) -> Self {
        self.self_energy = energy;
        self
    }

    pub fn with_driver(mut self, kind: DriverKind, frequency: f64, phase: f64, amplitude: f64) -> Self {
        self.driver = Some(DriverSpec {
            kind,
            frequency,
            phase,
            amplitude,
        });
        self
    }

    pub fn with_coupling(mut self, other: &str, strength: f64) -> Self {
        self.hamiltonian_couplings.insert(other.to_string(), strength);
        self
    }

    pub fn with_outgoing(mut self, target: &str, rate: f64) -> Self {
        self.lindblad_outgoing.insert(target.to_string(), rate);
        self
    }

    pub fn with_incoming(mut self, source: &str, rate: f64) -> Self {
        self.lindblad_incoming.insert(source.to_string(), rate);
        self
    }

    pub fn with_decay(mut self, target: &str, rate: f64) -> Self {
        self.decay = Some(DecaySpec {
            rate,
            target: target.to_string(),
        });
        self
    }

    pub fn with_gated(mut self, source: &str, rate: f64, gate: &str, power: f64, inverted: bool) -> Self {
        self.gated_lindblad.push(GatedSpec {
            source: source.to_string(),
            rate,
            gate: gate.to_string(),
            power,
            inverted,
        });
        self
    }
}

/// On-disk description of one substrate: axes plus declarations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubstrateDefinition {
    /// Configuration name, also the cache namespace.
    pub name: String,

    #[serde(default)]
    pub axes: Vec<AxisLabels>,

    #[serde(default)]
    pub declarations: Vec<IconDeclaration>,
}

impl SubstrateDefinition {
    /// Parse YAML (JSON is accepted too, being a YAML subset).
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}

fn default_one() -> f64 {
    1.0
}
