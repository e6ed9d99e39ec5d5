// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-planner
//!
//! RAM budget accounting for layer parameters.
//!
//! Mobile deployments cannot hold every layer's weights resident at
//! once. The planner takes the per-layer parameter file sizes and the
//! RAM the application grants the network, then decides which layers
//! load their parameters eagerly at construction (fast repeated
//! inference) and which load lazily per call (bounded memory). Larger
//! files get priority: evicting a reload of the biggest blob saves the
//! most I/O per inference.

mod budget;
mod error;
mod plan;

pub use budget::{MemoryBudget, MAX_PARAM_BYTES};
pub use error::PlannerError;
pub use plan::LoadPlan;
