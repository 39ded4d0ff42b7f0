// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for the substrate.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. config file (qsubstrate.yaml)
//! 3. Environment variables (QSUB_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::cache::OperatorCache;
use crate::computer::EvolutionSettings;
use crate::error::{Error, Result};
use crate::scheduler::SchedulerSettings;

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Integrator settings
    #[serde(default)]
    pub evolution: EvolutionSettings,

    /// Round-robin scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerSettings,

    /// Operator cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                config = Self::from_file(path)?;
            }
        } else {
            for path in &["qsubstrate.yaml", "qsubstrate.yml", "config.yaml"] {
                let path = Path::new(path);
                if path.exists() {
                    config = Self::from_file(path)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = parsed_env("QSUB_MAX_DT") {
            self.evolution.max_dt = v;
        }
        if let Some(v) = parsed_env("QSUB_TRACE_TOLERANCE") {
            self.evolution.trace_tolerance = v;
        }
        if let Some(v) = parsed_env("QSUB_MAX_SUBSTEPS") {
            self.evolution.max_substeps = v;
        }
        if let Some(v) = parsed_env("QSUB_SEED") {
            self.evolution.seed = Some(v);
        }
        if let Some(v) = parsed_env("QSUB_BATCH_SIZE") {
            self.scheduler.batch_size = v;
        }
        if let Ok(val) = env::var("QSUB_CACHE_ENABLED") {
            self.cache.enabled = is_truthy(&val);
        }
        if let Ok(val) = env::var("QSUB_CACHE_DIR") {
            self.cache.writable_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("QSUB_BUNDLED_CACHE_DIR") {
            self.cache.bundled_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("QSUB_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("QSUB_LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("QSUB_STRICT_VALIDATION") {
            self.validation.strict = is_truthy(&val);
        }
        if let Some(v) = parsed_env("QSUB_MAX_QUBITS") {
            self.validation.limits.max_qubits = v;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.evolution.validate()?;
        if self.scheduler.batch_size == 0 {
            return Err(Error::Config("scheduler.batch_size cannot be 0".into()));
        }
        let lookahead_dt = self.scheduler.lookahead_dt;
        if !(lookahead_dt.is_finite() && lookahead_dt > 0.0) {
            return Err(Error::Config(format!(
                "scheduler.lookahead_dt must be positive, got {lookahead_dt}"
            )));
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(Error::Config(format!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            )));
        }
        let max_qubits = self.validation.limits.max_qubits;
        if max_qubits == 0 || max_qubits > MAX_SUPPORTED_QUBITS {
            return Err(Error::Config(format!(
                "validation.limits.max_qubits must be in 1..={MAX_SUPPORTED_QUBITS}, got {max_qubits}"
            )));
        }
        if max_qubits > 8 {
            tracing::warn!(
                max_qubits,
                "Density matrices above 8 qubits need 4^n complex entries per state; \
                 evolution will be slow"
            );
        }
        Ok(())
    }
}

/// Hard ceiling on `validation.limits.max_qubits`.
pub const MAX_SUPPORTED_QUBITS: usize = 12;

fn parsed_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn is_truthy(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

fn default_true() -> bool {
    true
}

/// Operator cache configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether builds go through the cache at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory entries are written to (and read from first)
    #[serde(default = "default_cache_dir")]
    pub writable_dir: Option<PathBuf>,

    /// Read-only directory of pre-built entries
    #[serde(default)]
    pub bundled_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            writable_dir: default_cache_dir(),
            bundled_dir: None,
        }
    }
}

impl CacheConfig {
    /// Cache described by this section, or `None` when disabled.
    pub fn open(&self) -> Option<OperatorCache> {
        self.enabled
            .then(|| OperatorCache::new(self.writable_dir.clone(), self.bundled_dir.clone()))
    }
}

fn default_cache_dir() -> Option<PathBuf> {
    Some(PathBuf::from("./operator_cache"))
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

/// Validation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Reject invalid declaration sets instead of skipping bad terms
    #[serde(default)]
    pub strict: bool,

    /// Resource limits
    #[serde(default)]
    pub limits: ResourceLimits,
}

/// Resource limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum axes per substrate
    #[serde(default = "default_max_qubits")]
    pub max_qubits: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_qubits: default_max_qubits(),
        }
    }
}

fn default_max_qubits() -> usize {
    8
}
