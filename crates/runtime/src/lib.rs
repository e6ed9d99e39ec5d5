// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CNN inference runtime.
//!
//! Assembles a resolved network definition into a chain of layer
//! engines and runs forward passes over batched [`tensor_core::Blob`]
//! values. Execution mode, auto-tuning, and the parameter RAM budget
//! come from the network manifest; host-side options (directories,
//! profiling) from [`RuntimeConfig`].
//!
//! ```no_run
//! use runtime::{NetworkPipeline, RuntimeConfig};
//! use tensor_core::{Blob, Tensor4};
//!
//! # fn main() -> Result<(), runtime::RuntimeError> {
//! let config = RuntimeConfig::new("/data/alexnet");
//! let mut pipeline = NetworkPipeline::from_config(&config)?;
//! let input = Tensor4::zeros(1, 3, 227, 227);
//! let output = pipeline.forward(Blob::Rank4(input))?;
//! println!("{}", output.shape_string());
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
mod error;
pub mod executor;
pub mod layers;
pub mod metrics;
pub mod params;
mod pipeline;

pub use config::{RuntimeConfig, MANIFEST_FILE};
pub use error::RuntimeError;
pub use metrics::{InferenceMetrics, LayerMetrics};
pub use pipeline::NetworkPipeline;
