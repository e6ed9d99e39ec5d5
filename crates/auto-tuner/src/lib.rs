// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # auto-tuner
//!
//! On-device candidate selection for layers with multiple execution
//! strategies.
//!
//! Convolution and fully-connected layers choose among vector-layout
//! kernel variants; pooling and normalization layers choose a worker
//! thread count. On first use a layer benchmarks every applicable
//! candidate on a representative input slice, keeps the fastest, and
//! persists the choice under its layer name so later runs (and later
//! process starts) skip the benchmark.
//!
//! The pieces are deliberately separable:
//! - [`select_best`] is a pure function over measured timings.
//! - [`TuningState`] is a plain value owned by each layer.
//! - [`TuningStore`] is the injected persistence port; [`FsTuningStore`]
//!   keeps one plain-text token file per layer name.

mod candidate;
mod error;
mod state;
mod store;

pub use candidate::{ConvVariant, FcVariant, WorkerCount, DEFAULT_WORKER_COUNT};
pub use error::TunerError;
pub use state::{select_best, TuningState};
pub use store::{FsTuningStore, MemoryTuningStore, TuningStore};
