// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for budget parsing.

/// Errors from memory budget handling.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// The human-readable budget string could not be parsed.
    #[error("invalid memory budget '{0}' (expected e.g. '64M', '1G', or bytes)")]
    InvalidBudget(String),
}
