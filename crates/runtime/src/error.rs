// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for pipeline construction and layer execution.

/// Errors from building or running a network pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Manifest loading or resolution failed.
    #[error(transparent)]
    Model(#[from] model_ir::ModelError),

    /// Runtime configuration file problems.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O outside parameter loading (config files, input blobs).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parameter file is missing, unreadable, or has the wrong
    /// tensors. Fatal at construction (eager layers) or first compute
    /// (lazy layers).
    #[error("failed to load parameters for layer '{layer}' from '{file}': {detail}")]
    ParameterLoad {
        layer: String,
        file: String,
        detail: String,
    },

    /// A layer received a blob rank it does not accept. Fatal per call.
    #[error("layer '{layer}' expected {expected} input, got {actual}")]
    UnsupportedInputShape {
        layer: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A shape inconsistency detected during compute (e.g. channels not
    /// divisible by the configured group).
    #[error("layer '{layer}': {detail}")]
    Compute { layer: String, detail: String },
}
