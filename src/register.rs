// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Mapping between qubit axes, basis integers and domain labels.
//!
//! # Bit convention
//!
//! Qubit `k` occupies bit `k` of a basis integer (least-significant first).
//! A clear bit selects the axis' **north** label, a set bit its **south**
//! label. South is the ground pole, so the canonical ground state of an
//! n-qubit register is the all-ones integer `2^n − 1`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigurationError, Result};

/// One of the two poles of a qubit axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pole {
    /// Bit value 0
    North,
    /// Bit value 1 (ground)
    South,
}

impl Pole {
    /// Pole every new axis starts in and `reset_to_ground_state` returns to.
    pub const GROUND: Pole = Pole::South;

    /// Bit value encoding this pole.
    pub fn bit(self) -> usize {
        match self {
            Pole::North => 0,
            Pole::South => 1,
        }
    }

    /// Pole encoded by a bit value.
    pub fn from_bit(bit: usize) -> Self {
        if bit & 1 == 0 {
            Pole::North
        } else {
            Pole::South
        }
    }

    /// The other pole of the same axis.
    pub fn opposite(self) -> Self {
        match self {
            Pole::North => Pole::South,
            Pole::South => Pole::North,
        }
    }
}

impl fmt::Display for Pole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pole::North => write!(f, "north"),
            Pole::South => write!(f, "south"),
        }
    }
}

/// Label pair of one allocated axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisLabels {
    pub north: String,
    pub south: String,
}

impl AxisLabels {
    /// Label of the given pole.
    pub fn label(&self, pole: Pole) -> &str {
        match pole {
            Pole::North => &self.north,
            Pole::South => &self.south,
        }
    }
}

/// Bijection between (qubit, pole) pairs and labels.
#[derive(Debug, Clone, Default)]
pub struct RegisterMap {
    axes: Vec<AxisLabels>,
    labels: HashMap<String, (usize, Pole)>,
}

impl RegisterMap {
    /// Empty register (zero qubits, dimension 1).
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next qubit index to a north/south label pair.
    ///
    /// Fails with `LabelConflict` if either label is already assigned or the
    /// two labels are equal; the register is left unchanged.
    pub fn allocate_axis(&mut self, north: &str, south: &str) -> Result<usize> {
        for label in [north, south] {
            if self.labels.contains_key(label) {
                return Err(ConfigurationError::LabelConflict {
                    label: label.to_string(),
                }
                .into());
            }
        }
        if north == south {
            return Err(ConfigurationError::LabelConflict {
                label: north.to_string(),
            }
            .into());
        }

        let qubit = self.axes.len();
        self.labels.insert(north.to_string(), (qubit, Pole::North));
        self.labels.insert(south.to_string(), (qubit, Pole::South));
        self.axes.push(AxisLabels {
            north: north.to_string(),
            south: south.to_string(),
        });
        debug!(qubit, north, south, "Allocated axis");
        Ok(qubit)
    }

    /// Number of allocated axes.
    pub fn num_qubits(&self) -> usize {
        self.axes.len()
    }

    /// Hilbert-space dimension 2^n.
    pub fn dimension(&self) -> usize {
        1 << self.axes.len()
    }

    /// Basis index of the all-ground state.
    pub fn ground_state_index(&self) -> usize {
        if Pole::GROUND.bit() == 1 {
            self.dimension() - 1
        } else {
            0
        }
    }

    /// Qubit index of a label.
    pub fn qubit(&self, label: &str) -> Option<usize> {
        self.labels.get(label).map(|&(q, _)| q)
    }

    /// Pole of a label.
    pub fn pole(&self, label: &str) -> Option<Pole> {
        self.labels.get(label).map(|&(_, p)| p)
    }

    /// Qubit index and pole of a label.
    pub fn locate(&self, label: &str) -> Option<(usize, Pole)> {
        self.labels.get(label).copied()
    }

    /// Like [`locate`](Self::locate), but an unknown label is an error.
    pub fn resolve(&self, label: &str) -> Result<(usize, Pole)> {
        self.locate(label)
            .ok_or_else(|| ConfigurationError::unknown(label).into())
    }

    /// Label pair of an axis.
    pub fn axis(&self, qubit: usize) -> Option<&AxisLabels> {
        self.axes.get(qubit)
    }

    /// All axes in qubit order.
    pub fn axes(&self) -> &[AxisLabels] {
        &self.axes
    }

    /// All labels in qubit order, north before south.
    pub fn labels(&self) -> Vec<&str> {
        self.axes
            .iter()
            .flat_map(|a| [a.north.as_str(), a.south.as_str()])
            .collect()
    }

    /// Whether a label is assigned.
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    /// Pole of `qubit` within basis state `basis`.
    #[inline]
    pub fn pole_of(basis: usize, qubit: usize) -> Pole {
        Pole::from_bit(basis >> qubit)
    }

    /// Whether `basis` has `qubit` at `pole`.
    #[inline]
    pub fn has_pole(basis: usize, qubit: usize, pole: Pole) -> bool {
        (basis >> qubit) & 1 == pole.bit()
    }

    /// Decode a basis integer into one label per axis.
    pub fn basis_to_labels(&self, basis: usize) -> Result<Vec<&str>> {
        if basis >= self.dimension() {
            return Err(ConfigurationError::out_of_range(basis, self.dimension()).into());
        }
        Ok(self
            .axes
            .iter()
            .enumerate()
            .map(|(q, axis)| axis.label(Self::pole_of(basis, q)))
            .collect())
    }

    /// Encode labels into a basis integer. Axes not mentioned take the ground pole.
    pub fn labels_to_basis<S: AsRef<str>>(&self, labels: &[S]) -> Result<usize> {
        let mut basis = self.ground_state_index();
        let mut seen = vec![false; self.num_qubits()];
        for label in labels {
            let label = label.as_ref();
            let (q, pole) = self.resolve(label)?;
            if seen[q] {
                return Err(ConfigurationError::LabelConflict {
                    label: label.to_string(),
                }
                .into());
            }
            seen[q] = true;
            basis = (basis & !(1 << q)) | (pole.bit() << q);
        }
        Ok(basis)
    }

    /// Iterator over basis states that have `qubit` at `pole`.
    pub fn states_with(&self, qubit: usize, pole: Pole) -> impl Iterator<Item = usize> {
        (0..self.dimension()).filter(move |&b| Self::has_pole(b, qubit, pole))
    }
}
