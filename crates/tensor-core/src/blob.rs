// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The tagged value passed between network layers.

use crate::{Tensor2, Tensor4, TensorError};

/// A layer input/output.
///
/// Layers match exhaustively on the variant they accept instead of
/// inspecting payload types at runtime. [`Blob::Scalar`] is produced only
/// by the accuracy layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Blob {
    Rank4(Tensor4),
    Rank2(Tensor2),
    Scalar(f32),
}

impl Blob {
    /// Short rank tag used in error messages and logs.
    pub fn rank_name(&self) -> &'static str {
        match self {
            Blob::Rank4(_) => "rank-4",
            Blob::Rank2(_) => "rank-2",
            Blob::Scalar(_) => "scalar",
        }
    }

    /// Human-readable shape, for logging.
    pub fn shape_string(&self) -> String {
        match self {
            Blob::Rank4(t) => {
                let (n, c, h, w) = t.dims();
                format!("({n}, {c}, {h}, {w})")
            }
            Blob::Rank2(t) => {
                let (n, c) = t.dims();
                format!("({n}, {c})")
            }
            Blob::Scalar(_) => "()".to_string(),
        }
    }

    /// Unwraps a rank-4 tensor.
    ///
    /// # Errors
    /// [`TensorError::RankMismatch`] when the blob holds another variant.
    pub fn into_rank4(self) -> Result<Tensor4, TensorError> {
        match self {
            Blob::Rank4(t) => Ok(t),
            other => Err(TensorError::RankMismatch {
                expected: "rank-4",
                actual: other.rank_name(),
            }),
        }
    }

    /// Unwraps a rank-2 tensor.
    ///
    /// # Errors
    /// [`TensorError::RankMismatch`] when the blob holds another variant.
    pub fn into_rank2(self) -> Result<Tensor2, TensorError> {
        match self {
            Blob::Rank2(t) => Ok(t),
            other => Err(TensorError::RankMismatch {
                expected: "rank-2",
                actual: other.rank_name(),
            }),
        }
    }
}

impl From<Tensor4> for Blob {
    fn from(t: Tensor4) -> Self {
        Blob::Rank4(t)
    }
}

impl From<Tensor2> for Blob {
    fn from(t: Tensor2) -> Self {
        Blob::Rank2(t)
    }
}
