// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Persistence port for tuning records.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::TunerError;

/// Injected persistence for per-layer tuning records.
///
/// One record per layer name, holding a single token. Writes replace
/// the record wholesale.
pub trait TuningStore: Send + Sync {
    /// Returns the persisted token for `layer`, if any. Read failures
    /// are indistinguishable from absence.
    fn load(&self, layer: &str) -> Option<String>;

    /// Persists (or overwrites) the token for `layer`.
    fn store(&self, layer: &str, token: &str) -> Result<(), TunerError>;
}

/// Directory-backed store: one `<layer>.txt` file per layer.
#[derive(Debug, Clone)]
pub struct FsTuningStore {
    dir: PathBuf,
}

impl FsTuningStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, layer: &str) -> PathBuf {
        self.dir.join(format!("{layer}.txt"))
    }
}

impl TuningStore for FsTuningStore {
    fn load(&self, layer: &str) -> Option<String> {
        let raw = std::fs::read_to_string(self.record_path(layer)).ok()?;
        let token = raw.lines().next()?.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    fn store(&self, layer: &str, token: &str) -> Result<(), TunerError> {
        let wrap = |source| TunerError::Persist {
            layer: layer.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(wrap)?;
        std::fs::write(self.record_path(layer), token).map_err(wrap)
    }
}

/// In-memory store for tests and tuning-disabled runs.
#[derive(Debug, Default)]
pub struct MemoryTuningStore {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryTuningStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TuningStore for MemoryTuningStore {
    fn load(&self, layer: &str) -> Option<String> {
        self.records.lock().ok()?.get(layer).cloned()
    }

    fn store(&self, layer: &str, token: &str) -> Result<(), TunerError> {
        if let Ok(mut records) = self.records.lock() {
            records.insert(layer.to_string(), token.to_string());
        }
        Ok(())
    }
}
