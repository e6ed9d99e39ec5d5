// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Typed layer configuration, resolved from manifest entries.

/// How the network executes: plain scalar loops, or the vectorized /
/// multithreaded paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Parallel,
}

impl ExecutionMode {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sequential" | "seq" => Some(ExecutionMode::Sequential),
            "parallel" | "par" => Some(ExecutionMode::Parallel),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::Parallel => "parallel",
        }
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, ExecutionMode::Parallel)
    }
}

/// Layer type tags accepted in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Convolution,
    Pooling,
    Lrn,
    FullyConnected,
    Softmax,
    Relu,
    Accuracy,
}

impl LayerKind {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "convolution" | "conv" => Some(LayerKind::Convolution),
            "pooling" | "pool" => Some(LayerKind::Pooling),
            "lrn" => Some(LayerKind::Lrn),
            "fullyconnected" | "fully_connected" | "innerproduct" => {
                Some(LayerKind::FullyConnected)
            }
            "softmax" => Some(LayerKind::Softmax),
            "relu" => Some(LayerKind::Relu),
            "accuracy" => Some(LayerKind::Accuracy),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Convolution => "Convolution",
            LayerKind::Pooling => "Pooling",
            LayerKind::Lrn => "LRN",
            LayerKind::FullyConnected => "FullyConnected",
            LayerKind::Softmax => "Softmax",
            LayerKind::Relu => "ReLU",
            LayerKind::Accuracy => "Accuracy",
        }
    }
}

/// Pooling reduction method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMethod {
    Max,
    /// Padded average: the divisor is the full window area, pad cells
    /// included.
    Ave,
}

impl PoolMethod {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "max" => Some(PoolMethod::Max),
            "ave" | "avg" | "average" => Some(PoolMethod::Ave),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConvolutionSpec {
    pub params_file: String,
    pub pad: usize,
    pub stride: usize,
    pub group: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoolingSpec {
    pub method: PoolMethod,
    pub kernel_size: usize,
    pub pad: usize,
    pub stride: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LrnSpec {
    /// Only `"across_channels"` normalizes; any other region value is
    /// accepted but computes an all-zero output, preserved from the
    /// reference network format.
    pub norm_region: String,
    pub local_size: usize,
    pub alpha: f64,
    pub beta: f64,
}

impl LrnSpec {
    pub fn is_across_channels(&self) -> bool {
        self.norm_region == "across_channels"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FullyConnectedSpec {
    pub params_file: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccuracySpec {
    pub params_file: String,
    pub topk: usize,
}

/// A resolved, type-checked layer configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSpec {
    Convolution(ConvolutionSpec),
    Pooling(PoolingSpec),
    Lrn(LrnSpec),
    FullyConnected(FullyConnectedSpec),
    Softmax,
    Relu,
    Accuracy(AccuracySpec),
}

impl LayerSpec {
    pub fn kind(&self) -> LayerKind {
        match self {
            LayerSpec::Convolution(_) => LayerKind::Convolution,
            LayerSpec::Pooling(_) => LayerKind::Pooling,
            LayerSpec::Lrn(_) => LayerKind::Lrn,
            LayerSpec::FullyConnected(_) => LayerKind::FullyConnected,
            LayerSpec::Softmax => LayerKind::Softmax,
            LayerSpec::Relu => LayerKind::Relu,
            LayerSpec::Accuracy(_) => LayerKind::Accuracy,
        }
    }

    /// The parameter file this layer reads, if any.
    pub fn params_file(&self) -> Option<&str> {
        match self {
            LayerSpec::Convolution(s) => Some(&s.params_file),
            LayerSpec::FullyConnected(s) => Some(&s.params_file),
            LayerSpec::Accuracy(s) => Some(&s.params_file),
            _ => None,
        }
    }
}

/// A named layer in network order.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDef {
    /// Unique name; doubles as the tuning-record key.
    pub name: String,
    pub spec: LayerSpec,
}
