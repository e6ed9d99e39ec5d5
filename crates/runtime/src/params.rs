// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Parameter loading.
//!
//! Layers pull their learned parameters through the [`ParamStore`]
//! port. The production implementation memory-maps one SafeTensors file
//! per parameterised layer (tensors named `weight` and `bias`, or
//! `label` for accuracy layers); [`MemoryParamStore`] backs tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tensor_core::Tensor4;

use crate::RuntimeError;

/// Convolution parameters: `(n_k, c_k, h_k, w_k)` weights plus one bias
/// per output filter.
#[derive(Debug, Clone)]
pub struct ConvParams {
    pub weights: Tensor4,
    pub bias: Vec<f32>,
}

/// Fully-connected parameters: row-major `(n_out, c_in)` weights plus
/// one bias per output neuron. `c_in = weights.len() / bias.len()`.
#[derive(Debug, Clone)]
pub struct FcParams {
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl FcParams {
    pub fn input_features(&self) -> usize {
        self.weights.len() / self.bias.len()
    }

    pub fn output_features(&self) -> usize {
        self.bias.len()
    }
}

/// Port through which layers load parameters, keyed by the manifest's
/// per-layer file reference.
pub trait ParamStore: Send + Sync {
    fn conv_params(&self, layer: &str, file: &str) -> Result<ConvParams, RuntimeError>;

    fn fc_params(&self, layer: &str, file: &str) -> Result<FcParams, RuntimeError>;

    /// Ground-truth labels for an accuracy layer, one per batch item.
    fn labels(&self, layer: &str, file: &str) -> Result<Vec<i64>, RuntimeError>;

    /// On-disk size of a parameter file, for load planning. Unknown
    /// files report 0 and plan as lazy.
    fn file_size(&self, file: &str) -> u64;
}

// ── SafeTensors-backed store ───────────────────────────────────────────

/// Loads parameters from SafeTensors files under a root directory.
pub struct SafeTensorsStore {
    root: PathBuf,
}

impl SafeTensorsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    fn with_file<T>(
        &self,
        layer: &str,
        file: &str,
        f: impl FnOnce(&safetensors::SafeTensors<'_>) -> Result<T, String>,
    ) -> Result<T, RuntimeError> {
        let wrap = |detail: String| RuntimeError::ParameterLoad {
            layer: layer.to_string(),
            file: file.to_string(),
            detail,
        };
        let handle = std::fs::File::open(self.path(file)).map_err(|e| wrap(e.to_string()))?;
        // mapped read-only for the lifetime of this call
        let mmap = unsafe { memmap2::Mmap::map(&handle) }.map_err(|e| wrap(e.to_string()))?;
        let tensors =
            safetensors::SafeTensors::deserialize(&mmap).map_err(|e| wrap(e.to_string()))?;
        f(&tensors).map_err(wrap)
    }
}

fn tensor_f32(
    tensors: &safetensors::SafeTensors<'_>,
    name: &str,
) -> Result<(Vec<usize>, Vec<f32>), String> {
    let view = tensors
        .tensor(name)
        .map_err(|e| format!("tensor '{name}': {e}"))?;
    if view.dtype() != safetensors::Dtype::F32 {
        return Err(format!(
            "tensor '{name}' has dtype {:?}, expected F32",
            view.dtype()
        ));
    }
    let values = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((view.shape().to_vec(), values))
}

impl ParamStore for SafeTensorsStore {
    fn conv_params(&self, layer: &str, file: &str) -> Result<ConvParams, RuntimeError> {
        self.with_file(layer, file, |tensors| {
            let (shape, data) = tensor_f32(tensors, "weight")?;
            let &[n, c, h, w] = shape.as_slice() else {
                return Err(format!("weight tensor must be rank 4, got shape {shape:?}"));
            };
            let weights = Tensor4::from_vec(n, c, h, w, data).map_err(|e| e.to_string())?;
            let (bias_shape, bias) = tensor_f32(tensors, "bias")?;
            if bias_shape != [n] {
                return Err(format!(
                    "bias shape {bias_shape:?} does not match {n} filters"
                ));
            }
            Ok(ConvParams { weights, bias })
        })
    }

    fn fc_params(&self, layer: &str, file: &str) -> Result<FcParams, RuntimeError> {
        self.with_file(layer, file, |tensors| {
            let (shape, weights) = tensor_f32(tensors, "weight")?;
            let &[n_out, _c_in] = shape.as_slice() else {
                return Err(format!("weight tensor must be rank 2, got shape {shape:?}"));
            };
            let (bias_shape, bias) = tensor_f32(tensors, "bias")?;
            if bias_shape != [n_out] {
                return Err(format!(
                    "bias shape {bias_shape:?} does not match {n_out} outputs"
                ));
            }
            Ok(FcParams { weights, bias })
        })
    }

    fn labels(&self, layer: &str, file: &str) -> Result<Vec<i64>, RuntimeError> {
        self.with_file(layer, file, |tensors| {
            // labels ship as a float (n, 1, 1, 1) tensor; truncate to ints
            let (shape, data) = tensor_f32(tensors, "label")?;
            if shape.len() != 4 || shape[1..] != [1, 1, 1] {
                return Err(format!(
                    "label tensor must have shape (n, 1, 1, 1), got {shape:?}"
                ));
            }
            Ok(data.into_iter().map(|v| v as i64).collect())
        })
    }

    fn file_size(&self, file: &str) -> u64 {
        std::fs::metadata(self.path(file))
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

// ── In-memory store for tests ──────────────────────────────────────────

/// Test double keyed by file reference.
#[derive(Default)]
pub struct MemoryParamStore {
    conv: Mutex<HashMap<String, ConvParams>>,
    fc: Mutex<HashMap<String, FcParams>>,
    labels: Mutex<HashMap<String, Vec<i64>>>,
    sizes: Mutex<HashMap<String, u64>>,
}

impl MemoryParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_conv(&self, file: &str, params: ConvParams) {
        let bytes = (params.weights.num_elements() + params.bias.len()) as u64 * 4;
        self.sizes.lock().unwrap().insert(file.to_string(), bytes);
        self.conv.lock().unwrap().insert(file.to_string(), params);
    }

    pub fn insert_fc(&self, file: &str, params: FcParams) {
        let bytes = (params.weights.len() + params.bias.len()) as u64 * 4;
        self.sizes.lock().unwrap().insert(file.to_string(), bytes);
        self.fc.lock().unwrap().insert(file.to_string(), params);
    }

    pub fn insert_labels(&self, file: &str, labels: Vec<i64>) {
        let bytes = labels.len() as u64 * 4;
        self.sizes.lock().unwrap().insert(file.to_string(), bytes);
        self.labels.lock().unwrap().insert(file.to_string(), labels);
    }
}

fn missing(layer: &str, file: &str) -> RuntimeError {
    RuntimeError::ParameterLoad {
        layer: layer.to_string(),
        file: file.to_string(),
        detail: "no such entry".into(),
    }
}

impl ParamStore for MemoryParamStore {
    fn conv_params(&self, layer: &str, file: &str) -> Result<ConvParams, RuntimeError> {
        self.conv
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .ok_or_else(|| missing(layer, file))
    }

    fn fc_params(&self, layer: &str, file: &str) -> Result<FcParams, RuntimeError> {
        self.fc
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .ok_or_else(|| missing(layer, file))
    }

    fn labels(&self, layer: &str, file: &str) -> Result<Vec<i64>, RuntimeError> {
        self.labels
            .lock()
            .unwrap()
            .get(file)
            .cloned()
            .ok_or_else(|| missing(layer, file))
    }

    fn file_size(&self, file: &str) -> u64 {
        self.sizes.lock().unwrap().get(file).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryParamStore::new();
        let weights = Tensor4::zeros(2, 3, 3, 3);
        store.insert_conv(
            "conv1.safetensors",
            ConvParams {
                weights,
                bias: vec![0.0, 0.0],
            },
        );
        let p = store.conv_params("conv1", "conv1.safetensors").unwrap();
        assert_eq!(p.weights.dims(), (2, 3, 3, 3));
        assert_eq!(store.file_size("conv1.safetensors"), (54 + 2) * 4);
    }

    #[test]
    fn test_missing_entry_is_parameter_load_error() {
        let store = MemoryParamStore::new();
        let err = store.conv_params("conv1", "nope").unwrap_err();
        assert!(matches!(err, RuntimeError::ParameterLoad { .. }));
    }

    #[test]
    fn test_fc_params_feature_counts() {
        let p = FcParams {
            weights: vec![0.0; 12],
            bias: vec![0.0; 3],
        };
        assert_eq!(p.input_features(), 4);
        assert_eq!(p.output_features(), 3);
    }

    #[test]
    fn test_safetensors_store_reports_zero_for_missing_file() {
        let store = SafeTensorsStore::new("/nonexistent");
        assert_eq!(store.file_size("x.safetensors"), 0);
    }
}
