// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the substrate.

use std::fmt;

/// Result type alias for substrate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Substrate error types.
#[derive(Debug)]
pub enum Error {
    /// Invalid configuration file or value
    Config(String),
    /// Bad label, index or declaration value
    Configuration(ConfigurationError),
    /// Trace or Hermiticity drift the integrator could not recover from
    NumericInvariant(String),
    /// Operation requires built operators
    NotReady(String),
    /// Operation requires at least one allocated axis
    EmptySystem(String),
    /// Operator cache failure
    Cache(String),
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Configuration(e) => write!(f, "Invalid input: {}", e),
            Error::NumericInvariant(msg) => write!(f, "Numeric invariant violated: {}", msg),
            Error::NotReady(msg) => write!(f, "System not ready: {}", msg),
            Error::EmptySystem(msg) => write!(f, "Empty system: {}", msg),
            Error::Cache(msg) => write!(f, "Cache error: {}", msg),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Configuration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ConfigurationError> for Error {
    fn from(e: ConfigurationError) -> Self {
        Error::Configuration(e)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Errors raised by malformed labels, indices and declaration values.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Label already assigned to an axis
    LabelConflict { label: String },
    /// Label not present in the register
    UnknownLabel { label: String },
    /// Qubit, basis or matrix index outside the valid range
    IndexOutOfRange { index: usize, len: usize },
    /// Field value rejected (non-finite, negative rate, ...)
    InvalidValue { field: String, message: String },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::LabelConflict { label } => {
                write!(f, "label '{}' is already assigned", label)
            }
            ConfigurationError::UnknownLabel { label } => {
                write!(f, "unknown label '{}'", label)
            }
            ConfigurationError::IndexOutOfRange { index, len } => {
                write!(f, "index {} out of range (len {})", index, len)
            }
            ConfigurationError::InvalidValue { field, message } => {
                write!(f, "field '{}': {}", field, message)
            }
        }
    }
}

impl std::error::Error for ConfigurationError {}

impl ConfigurationError {
    pub(crate) fn out_of_range(index: usize, len: usize) -> Self {
        ConfigurationError::IndexOutOfRange { index, len }
    }

    pub(crate) fn unknown(label: &str) -> Self {
        ConfigurationError::UnknownLabel {
            label: label.to_string(),
        }
    }
}
