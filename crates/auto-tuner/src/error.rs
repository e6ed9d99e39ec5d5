// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tuning persistence.

/// Errors from the tuning persistence port.
///
/// Reads never error: an unreadable or unparseable record is treated as
/// absent and simply triggers re-tuning. Writes can fail, and callers
/// are expected to log rather than abort on failure.
#[derive(Debug, thiserror::Error)]
pub enum TunerError {
    /// Writing a tuning record failed.
    #[error("failed to persist tuning record for layer '{layer}'")]
    Persist {
        layer: String,
        #[source]
        source: std::io::Error,
    },
}
