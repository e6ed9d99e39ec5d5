// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Runtime configuration.
//!
//! Host-side options live in a TOML file; network-level options
//! (execution mode, auto-tuning, RAM budget) live in the network
//! manifest itself.
//!
//! # Example
//! ```toml
//! network_dir = "/data/alexnet"
//! tuning_dir = "/data/alexnet/tuning"
//! profiling = true
//! ```

use std::path::{Path, PathBuf};

use crate::RuntimeError;

/// Name of the manifest file inside `network_dir`.
pub const MANIFEST_FILE: &str = "network.json";

/// Default tuning subdirectory inside `network_dir`.
const DEFAULT_TUNING_DIR: &str = "tuning";

/// Host-side runtime options.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RuntimeConfig {
    /// Directory holding `network.json` and the parameter files it
    /// references.
    pub network_dir: PathBuf,
    /// Where tuning records live. Defaults to `<network_dir>/tuning`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuning_dir: Option<PathBuf>,
    /// Log a per-layer timing breakdown after each forward pass.
    #[serde(default)]
    pub profiling: bool,
}

impl RuntimeConfig {
    pub fn new(network_dir: impl Into<PathBuf>) -> Self {
        Self {
            network_dir: network_dir.into(),
            tuning_dir: None,
            profiling: false,
        }
    }

    /// Parses a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, RuntimeError> {
        toml::from_str(text).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    /// Loads a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Serializes back to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self).map_err(|e| RuntimeError::Config(e.to_string()))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.network_dir.join(MANIFEST_FILE)
    }

    pub fn tuning_dir(&self) -> PathBuf {
        self.tuning_dir
            .clone()
            .unwrap_or_else(|| self.network_dir.join(DEFAULT_TUNING_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let c = RuntimeConfig::from_toml(r#"network_dir = "/data/net""#).unwrap();
        assert_eq!(c.network_dir, PathBuf::from("/data/net"));
        assert!(!c.profiling);
        assert_eq!(c.tuning_dir(), PathBuf::from("/data/net/tuning"));
        assert_eq!(c.manifest_path(), PathBuf::from("/data/net/network.json"));
    }

    #[test]
    fn test_parse_full_and_round_trip() {
        let c = RuntimeConfig::from_toml(
            r#"
            network_dir = "/data/net"
            tuning_dir = "/tmp/tune"
            profiling = true
            "#,
        )
        .unwrap();
        assert!(c.profiling);
        assert_eq!(c.tuning_dir(), PathBuf::from("/tmp/tune"));
        let back = RuntimeConfig::from_toml(&c.to_toml().unwrap()).unwrap();
        assert_eq!(back.network_dir, c.network_dir);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        assert!(matches!(
            RuntimeConfig::from_toml("network_dir = 12"),
            Err(RuntimeError::Config(_))
        ));
    }
}
