// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for manifest parsing and network resolution.

/// Errors raised while loading or resolving a network definition.
///
/// All of these are fatal at construction time and abort the network
/// build; none can occur during compute.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Failed to read the manifest file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest is not valid JSON.
    #[error("manifest parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A network-level field is missing or malformed.
    #[error("invalid network definition: {0}")]
    InvalidNetwork(String),

    /// A layer entry is malformed.
    #[error("invalid layer '{layer}': {detail}")]
    InvalidLayer { layer: String, detail: String },

    /// A layer entry lacks a required keyword argument.
    #[error("layer '{layer}' is missing required field '{field}'")]
    MissingField { layer: String, field: &'static str },
}
