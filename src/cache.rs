// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Content-addressed cache of built operators.
//!
//! Entries are looked up by configuration name and validated against a
//! [`CacheKey`] derived from the declaration set, so an entry built from
//! different declarations is never served. Three tiers are consulted in
//! order: memory, the writable directory, then the read-only bundled
//! directory shipped with the content.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::declaration::IconDeclaration;
use crate::error::{Error, Result};
use crate::operators::{BuildReport, BuiltOperators};
use crate::register::{AxisLabels, RegisterMap};

/// Bumped whenever operator construction changes meaning.
const KEY_DOMAIN: &[u8] = b"quantum-substrate/operators/v1";

/// SHA-256 fingerprint of a configuration name and declaration set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hash the declarations in canonical order.
    ///
    /// Declarations are sorted by label (ties broken by content), so the key
    /// does not depend on the order they were supplied in. Maps inside a
    /// declaration are already ordered.
    pub fn compute(config_name: &str, declarations: &[IconDeclaration]) -> Result<Self> {
        let mut canonical = Vec::with_capacity(declarations.len());
        for d in declarations {
            canonical.push((d.label.as_str(), serde_json::to_vec(d)?));
        }
        canonical.sort();

        let mut hasher = Sha256::new();
        hasher.update(KEY_DOMAIN);
        hasher.update([0u8]);
        hasher.update(config_name.as_bytes());
        hasher.update([0u8]);
        for (_, json) in &canonical {
            hasher.update(json);
            hasher.update(b"\n");
        }

        let digest = hasher.finalize();
        Ok(Self(digest.iter().map(|b| format!("{b:02x}")).collect()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One cached build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedOperators {
    pub key: CacheKey,
    pub config_name: String,
    /// Axes the operators were built against.
    pub axes: Vec<AxisLabels>,
    pub operators: BuiltOperators,
    /// Terms skipped by the original build.
    pub report: BuildReport,
}

impl CachedOperators {
    pub fn new(
        config_name: &str,
        key: CacheKey,
        register: &RegisterMap,
        operators: BuiltOperators,
        report: BuildReport,
    ) -> Self {
        Self {
            key,
            config_name: config_name.to_string(),
            axes: register.axes().to_vec(),
            operators,
            report,
        }
    }

    /// Why this entry cannot serve `register`, if it cannot: built for other
    /// axes, or operators that do not fit the Hilbert space.
    pub fn mismatch(&self, register: &RegisterMap) -> Option<String> {
        if self.axes != register.axes() {
            return Some("built for other axes".into());
        }
        self.operators.check_shape(register.num_qubits()).err()
    }

}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub memory_entries: usize,
}

impl CacheStats {
    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Memory tier in front of a writable and a bundled directory tier.
#[derive(Debug, Default)]
pub struct OperatorCache {
    writable_dir: Option<PathBuf>,
    bundled_dir: Option<PathBuf>,
    memory: RwLock<HashMap<String, CachedOperators>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl OperatorCache {
    /// Cache backed by the given directories. Either may be absent.
    pub fn new(writable_dir: Option<PathBuf>, bundled_dir: Option<PathBuf>) -> Self {
        Self {
            writable_dir,
            bundled_dir,
            ..Default::default()
        }
    }

    /// Cache with only the memory tier.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Look up an entry. `None` on a miss, a stale key or an unreadable file.
    pub fn try_load(&self, config_name: &str, key: &CacheKey) -> Option<CachedOperators> {
        if let Some(entry) = self.memory.read().get(config_name) {
            if entry.key == *key {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(config = config_name, tier = "memory", "Cache hit");
                return Some(entry.clone());
            }
        }

        let tiers = [("writable", &self.writable_dir), ("bundled", &self.bundled_dir)];
        for (tier, dir) in tiers {
            let Some(dir) = dir else { continue };
            let Some(entry) = read_entry(&entry_path(dir, config_name)) else {
                continue;
            };
            if entry.key != *key {
                debug!(config = config_name, tier, "Stale cache entry ignored");
                continue;
            }
            self.hits.fetch_add(1, Ordering::Relaxed);
            info!(config = config_name, tier, key = %key, "Cache hit");
            self.memory
                .write()
                .insert(config_name.to_string(), entry.clone());
            return Some(entry);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(config = config_name, key = %key, "Cache miss");
        None
    }

    /// Store an entry in memory and, if configured, the writable directory,
    /// replacing whatever was there.
    pub fn save(&self, entry: &CachedOperators) -> Result<()> {
        self.memory
            .write()
            .insert(entry.config_name.clone(), entry.clone());

        let Some(dir) = &self.writable_dir else {
            return Ok(());
        };
        fs::create_dir_all(dir)
            .map_err(|e| Error::Cache(format!("cannot create {}: {e}", dir.display())))?;

        let path = entry_path(dir, &entry.config_name);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_vec(entry)?;
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|e| Error::Cache(format!("cannot write {}: {e}", path.display())))?;

        info!(config = %entry.config_name, key = %entry.key, path = %path.display(), "Saved operators to cache");
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            memory_entries: self.memory.read().len(),
        }
    }

    /// Drop the memory tier. Directory tiers are untouched.
    pub fn clear_memory(&self) {
        self.memory.write().clear();
    }
}

/// `<dir>/<name>.json`, with anything but alphanumerics, `-` and `_` replaced.
fn entry_path(dir: &Path, config_name: &str) -> PathBuf {
    let stem: String = config_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{stem}.json"))
}

fn read_entry(path: &Path) -> Option<CachedOperators> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(entry) => Some(entry),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable cache entry");
            None
        }
    }
}
