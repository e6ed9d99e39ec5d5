// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-ir
//!
//! The network's intermediate representation.
//!
//! A network arrives as a JSON manifest (`network.json`) listing global
//! execution options and an ordered layer sequence with per-type
//! keyword arguments. This crate parses the manifest, validates it, and
//! resolves it into typed layer definitions the runtime builds engines
//! from. All configuration errors surface here, at construction time;
//! compute never sees a half-validated network.

mod error;
mod layer;
mod manifest;
mod network;

pub use error::ModelError;
pub use layer::{
    AccuracySpec, ConvolutionSpec, ExecutionMode, FullyConnectedSpec, LayerDef, LayerKind,
    LayerSpec, LrnSpec, PoolMethod, PoolingSpec,
};
pub use manifest::{ManifestLayer, NetworkManifest};
pub use network::NetworkDef;
