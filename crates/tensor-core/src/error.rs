// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor construction and shape handling.

/// Errors that can occur when building or reinterpreting tensors.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// The provided buffer length does not match the product of the dimensions.
    #[error("buffer length mismatch: shape {shape:?} needs {expected} elements, got {actual}")]
    BufferLengthMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    /// A blob of one rank was handed to a consumer expecting another.
    #[error("rank mismatch: expected {expected}, got {actual}")]
    RankMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A dimension that must divide evenly does not (e.g. channels vs. group).
    #[error("dimension {dim} = {value} is not divisible by {divisor}")]
    NotDivisible {
        dim: &'static str,
        value: usize,
        divisor: usize,
    },
}
