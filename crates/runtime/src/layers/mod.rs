// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The layer engines.
//!
//! Each engine owns its parameters, its tuning state, and its
//! compute-strategy selection. Engines are built once when the pipeline
//! is constructed and mutated only by their own tuning or lazy
//! parameter loading.

mod accuracy;
mod convolution;
mod fully_connected;
mod lrn;
mod nonlinear;
mod pooling;
mod softmax;

pub use accuracy::Accuracy;
pub use convolution::Convolution;
pub use fully_connected::FullyConnected;
pub use lrn::Lrn;
pub use nonlinear::NonLinear;
pub use pooling::Pooling;
pub use softmax::Softmax;

use tensor_core::Blob;

use crate::RuntimeError;

/// One network layer.
///
/// `compute` takes `&mut self` because the first call may tune (fixing
/// the strategy choice) or lazily load parameters.
pub trait Layer: Send {
    fn name(&self) -> &str;

    /// Layer type tag for logs and metrics.
    fn kind(&self) -> &'static str;

    fn compute(&mut self, input: Blob) -> Result<Blob, RuntimeError>;
}

/// Shared helper: the typed error for a blob of the wrong rank.
pub(crate) fn shape_error(layer: &str, expected: &'static str, got: &Blob) -> RuntimeError {
    RuntimeError::UnsupportedInputShape {
        layer: layer.to_string(),
        expected,
        actual: got.rank_name(),
    }
}
