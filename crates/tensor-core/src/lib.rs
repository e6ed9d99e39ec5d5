// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Dense tensor types and numeric kernels for on-device CNN inference.
//!
//! This crate provides:
//! - [`Tensor4`] / [`Tensor2`] — dense, row-major f32 tensors for batched
//!   feature maps `(n, c, h, w)` and score matrices `(n, c)`.
//! - [`Blob`] — the tagged value passed between network layers.
//! - [`kernels`] — the scalar numeric kernels (convolution window
//!   accumulation, pooling reductions, inner product, exp-normalize,
//!   channel-window power sums, argsort).
//! - [`layout`] — channel-innermost vector packing used by the SIMD
//!   compute backend, including group-aware channel padding.
//!
//! # Design Goals
//! - Exact, well-specified numeric semantics; layer engines above this
//!   crate never re-implement index arithmetic.
//! - No allocation inside the innermost loops.
//! - Clean error types via `thiserror`.

mod blob;
mod error;
pub mod kernels;
pub mod layout;
mod tensor;

pub use blob::Blob;
pub use error::TensorError;
pub use tensor::{Tensor2, Tensor4};
