// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON network manifest parsing.
//!
//! The manifest (`network.json`) carries the global execution options
//! and the ordered layer list with per-type keyword arguments.
//!
//! # Format
//! ```json
//! {
//!   "name": "alexnet",
//!   "execution_mode": "parallel",
//!   "auto_tuning": "on",
//!   "allocated_ram_mb": 120,
//!   "layers": [
//!     { "name": "conv1", "type": "Convolution",
//!       "parameters_file": "conv1.safetensors",
//!       "pad": 0, "stride": 4, "group": 1 },
//!     { "name": "relu1", "type": "ReLU" },
//!     { "name": "pool1", "type": "Pooling",
//!       "pool": "max", "kernel_size": 3, "pad": 0, "stride": 2 },
//!     ...
//!   ]
//! }
//! ```

use std::path::Path;

use crate::ModelError;

/// Top-level network manifest, deserialized from `network.json`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NetworkManifest {
    /// Human-readable network name (e.g., `"alexnet"`).
    pub name: String,
    /// `"parallel"` or `"sequential"`.
    pub execution_mode: String,
    /// `"on"` or `"off"`.
    pub auto_tuning: String,
    /// RAM granted for eagerly resident parameters, in megabytes.
    pub allocated_ram_mb: u64,
    /// Ordered layer entries.
    pub layers: Vec<ManifestLayer>,
}

/// A single layer entry. Keyword arguments not used by the layer's type
/// stay `None`; resolution checks for the required ones.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ManifestLayer {
    pub name: String,
    #[serde(rename = "type")]
    pub layer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pad: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub norm_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topk: Option<usize>,
}

impl NetworkManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }
}
