// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Resolution from the raw manifest to a validated network definition.

use std::collections::HashSet;
use std::path::Path;

use crate::{
    AccuracySpec, ConvolutionSpec, ExecutionMode, FullyConnectedSpec, LayerDef, LayerKind,
    LayerSpec, LrnSpec, ManifestLayer, ModelError, NetworkManifest, PoolMethod, PoolingSpec,
};

/// A validated network: typed options and typed layers in order.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkDef {
    pub name: String,
    pub execution_mode: ExecutionMode,
    pub auto_tuning: bool,
    pub allocated_ram_mb: u64,
    pub layers: Vec<LayerDef>,
}

impl NetworkDef {
    /// Loads and resolves `network.json` at `path`.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        Self::resolve(&NetworkManifest::from_file(path)?)
    }

    /// Resolves a parsed manifest, checking every required field.
    ///
    /// # Errors
    /// [`ModelError::InvalidNetwork`], [`ModelError::InvalidLayer`], or
    /// [`ModelError::MissingField`]; all fatal for the network build.
    pub fn resolve(manifest: &NetworkManifest) -> Result<Self, ModelError> {
        let execution_mode = ExecutionMode::from_str_loose(&manifest.execution_mode)
            .ok_or_else(|| {
                ModelError::InvalidNetwork(format!(
                    "unrecognised execution_mode '{}'",
                    manifest.execution_mode
                ))
            })?;

        let auto_tuning = match manifest.auto_tuning.to_lowercase().as_str() {
            "on" => true,
            "off" => false,
            other => {
                return Err(ModelError::InvalidNetwork(format!(
                    "auto_tuning must be 'on' or 'off', got '{other}'"
                )))
            }
        };

        if manifest.layers.is_empty() {
            return Err(ModelError::InvalidNetwork("network has no layers".into()));
        }

        let mut seen = HashSet::new();
        let mut layers = Vec::with_capacity(manifest.layers.len());
        for entry in &manifest.layers {
            if !seen.insert(entry.name.as_str()) {
                return Err(ModelError::InvalidLayer {
                    layer: entry.name.clone(),
                    detail: "duplicate layer name".into(),
                });
            }
            layers.push(LayerDef {
                name: entry.name.clone(),
                spec: resolve_layer(entry)?,
            });
        }

        Ok(Self {
            name: manifest.name.clone(),
            execution_mode,
            auto_tuning,
            allocated_ram_mb: manifest.allocated_ram_mb,
            layers,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// One-line summary for startup logging.
    pub fn summary(&self) -> String {
        format!(
            "network '{}': {} layers, {} mode, auto-tuning {}, {} MB parameter budget",
            self.name,
            self.layers.len(),
            self.execution_mode.as_str(),
            if self.auto_tuning { "on" } else { "off" },
            self.allocated_ram_mb,
        )
    }
}

fn require<T: Clone>(
    entry: &ManifestLayer,
    field: &'static str,
    value: &Option<T>,
) -> Result<T, ModelError> {
    value.clone().ok_or(ModelError::MissingField {
        layer: entry.name.clone(),
        field,
    })
}

fn resolve_layer(entry: &ManifestLayer) -> Result<LayerSpec, ModelError> {
    let kind = LayerKind::from_str_loose(&entry.layer_type).ok_or_else(|| {
        ModelError::InvalidLayer {
            layer: entry.name.clone(),
            detail: format!("unrecognised layer type '{}'", entry.layer_type),
        }
    })?;

    let invalid = |detail: String| ModelError::InvalidLayer {
        layer: entry.name.clone(),
        detail,
    };

    match kind {
        LayerKind::Convolution => {
            let group = require(entry, "group", &entry.group)?;
            if group == 0 {
                return Err(invalid("group must be positive".into()));
            }
            let stride = require(entry, "stride", &entry.stride)?;
            if stride == 0 {
                return Err(invalid("stride must be positive".into()));
            }
            Ok(LayerSpec::Convolution(ConvolutionSpec {
                params_file: require(entry, "parameters_file", &entry.parameters_file)?,
                pad: require(entry, "pad", &entry.pad)?,
                stride,
                group,
            }))
        }
        LayerKind::Pooling => {
            let pool = require(entry, "pool", &entry.pool)?;
            let method = PoolMethod::from_str_loose(&pool)
                .ok_or_else(|| invalid(format!("unknown pool method '{pool}'")))?;
            let kernel_size = require(entry, "kernel_size", &entry.kernel_size)?;
            let stride = require(entry, "stride", &entry.stride)?;
            if kernel_size == 0 || stride == 0 {
                return Err(invalid("kernel_size and stride must be positive".into()));
            }
            Ok(LayerSpec::Pooling(PoolingSpec {
                method,
                kernel_size,
                pad: require(entry, "pad", &entry.pad)?,
                stride,
            }))
        }
        LayerKind::Lrn => {
            let local_size = require(entry, "local_size", &entry.local_size)?;
            if local_size == 0 {
                return Err(invalid("local_size must be positive".into()));
            }
            let norm_region = require(entry, "norm_region", &entry.norm_region)?;
            if norm_region != "across_channels" {
                tracing::warn!(
                    layer = %entry.name,
                    %norm_region,
                    "norm_region other than 'across_channels' produces all-zero output",
                );
            }
            Ok(LayerSpec::Lrn(LrnSpec {
                norm_region,
                local_size,
                alpha: require(entry, "alpha", &entry.alpha)?,
                beta: require(entry, "beta", &entry.beta)?,
            }))
        }
        LayerKind::FullyConnected => Ok(LayerSpec::FullyConnected(FullyConnectedSpec {
            params_file: require(entry, "parameters_file", &entry.parameters_file)?,
        })),
        LayerKind::Softmax => Ok(LayerSpec::Softmax),
        LayerKind::Relu => Ok(LayerSpec::Relu),
        LayerKind::Accuracy => {
            let topk = require(entry, "topk", &entry.topk)?;
            if topk == 0 {
                return Err(invalid("topk must be positive".into()));
            }
            Ok(LayerSpec::Accuracy(AccuracySpec {
                params_file: require(entry, "parameters_file", &entry.parameters_file)?,
                topk,
            }))
        }
    }
}
