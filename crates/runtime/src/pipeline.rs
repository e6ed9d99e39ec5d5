// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Network assembly and the forward pass.
//!
//! [`NetworkPipeline`] turns a resolved network definition into an
//! ordered chain of layer engines. Assembly makes two decisions per
//! layer:
//!
//! - eager or lazy parameter loading, from the memory planner's greedy
//!   plan over the manifest's parameter file sizes and RAM budget;
//! - in parallel mode, a ReLU entry directly after a convolution or
//!   fully-connected layer fuses into that layer instead of running
//!   standalone.
//!
//! The forward pass threads one [`Blob`] through the chain and records
//! per-layer timing.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use auto_tuner::{FsTuningStore, TuningStore};
use memory_planner::{LoadPlan, MemoryBudget};
use model_ir::{LayerSpec, NetworkDef};
use tensor_core::Blob;

use crate::backend::{ComputeBackend, CpuVectorBackend};
use crate::config::RuntimeConfig;
use crate::layers::{
    Accuracy, Convolution, FullyConnected, Layer, Lrn, NonLinear, Pooling, Softmax,
};
use crate::metrics::{InferenceMetrics, LayerMetrics};
use crate::params::{ParamStore, SafeTensorsStore};
use crate::RuntimeError;

pub struct NetworkPipeline {
    name: String,
    profiling: bool,
    layers: Vec<Box<dyn Layer>>,
}

impl NetworkPipeline {
    /// Assembles a pipeline from a resolved definition and the three
    /// injected ports.
    pub fn build(
        def: &NetworkDef,
        params: Arc<dyn ParamStore>,
        tuning: Arc<dyn TuningStore>,
        backend: Arc<dyn ComputeBackend>,
    ) -> Result<Self, RuntimeError> {
        let parallel = def.execution_mode.is_parallel();
        let auto_tuning = def.auto_tuning;

        let sizes: Vec<u64> = def
            .layers
            .iter()
            .map(|l| l.spec.params_file().map_or(0, |f| params.file_size(f)))
            .collect();
        let budget = MemoryBudget::from_mb(def.allocated_ram_mb);
        let plan = LoadPlan::plan(&sizes, budget);
        tracing::info!(
            network = %def.name,
            resident_mb = plan.resident_bytes() as f64 / (1024.0 * 1024.0),
            eager = plan.num_eager(),
            "{}",
            def.summary(),
        );

        let mut layers: Vec<Box<dyn Layer>> = Vec::with_capacity(def.layers.len());
        let mut i = 0;
        while i < def.layers.len() {
            let entry = &def.layers[i];
            let fuse_relu = parallel
                && matches!(
                    entry.spec,
                    LayerSpec::Convolution(_) | LayerSpec::FullyConnected(_)
                )
                && def
                    .layers
                    .get(i + 1)
                    .is_some_and(|next| matches!(next.spec, LayerSpec::Relu));

            match &entry.spec {
                LayerSpec::Convolution(spec) => {
                    let mut conv = Convolution::new(
                        &entry.name,
                        spec.clone(),
                        parallel,
                        auto_tuning,
                        plan.is_eager(i),
                        params.clone(),
                        tuning.clone(),
                        backend.clone(),
                    )?;
                    if fuse_relu {
                        conv.set_fused_relu();
                    }
                    layers.push(Box::new(conv));
                }
                LayerSpec::FullyConnected(spec) => {
                    let mut fc = FullyConnected::new(
                        &entry.name,
                        spec.clone(),
                        parallel,
                        auto_tuning,
                        plan.is_eager(i),
                        params.clone(),
                        tuning.clone(),
                        backend.clone(),
                    )?;
                    if fuse_relu {
                        fc.set_fused_relu();
                    }
                    layers.push(Box::new(fc));
                }
                LayerSpec::Pooling(spec) => {
                    layers.push(Box::new(Pooling::new(
                        &entry.name,
                        spec.clone(),
                        parallel,
                        auto_tuning,
                        tuning.clone(),
                    )));
                }
                LayerSpec::Lrn(spec) => {
                    layers.push(Box::new(Lrn::new(
                        &entry.name,
                        spec.clone(),
                        parallel,
                        auto_tuning,
                        tuning.clone(),
                    )));
                }
                LayerSpec::Relu => {
                    layers.push(Box::new(NonLinear::new(&entry.name)));
                }
                LayerSpec::Softmax => {
                    layers.push(Box::new(Softmax::new(&entry.name)));
                }
                LayerSpec::Accuracy(spec) => {
                    layers.push(Box::new(Accuracy::new(
                        &entry.name,
                        spec.clone(),
                        params.clone(),
                    )));
                }
            }

            if fuse_relu {
                tracing::debug!(
                    layer = %entry.name,
                    relu = %def.layers[i + 1].name,
                    "relu fused into preceding layer",
                );
                i += 2;
            } else {
                i += 1;
            }
        }

        Ok(Self {
            name: def.name.clone(),
            profiling: false,
            layers,
        })
    }

    /// Assembles the production pipeline for a host config: manifest
    /// and SafeTensors files from `network_dir`, tuning records as text
    /// files under the tuning directory, CPU backend.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        let def = NetworkDef::from_file(&config.manifest_path())?;
        let params = Arc::new(SafeTensorsStore::new(&config.network_dir));
        let tuning = Arc::new(FsTuningStore::new(config.tuning_dir()));
        let mut pipeline = Self::build(&def, params, tuning, Arc::new(CpuVectorBackend::new()))?;
        pipeline.profiling = config.profiling;
        Ok(pipeline)
    }

    /// Loads and resolves the manifest without building engines.
    pub fn load_definition(manifest: &Path) -> Result<NetworkDef, RuntimeError> {
        Ok(NetworkDef::from_file(manifest)?)
    }

    pub fn set_profiling(&mut self, on: bool) {
        self.profiling = on;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// Runs one forward pass, returning the final blob and the
    /// per-layer timing.
    pub fn compute(&mut self, input: Blob) -> Result<(Blob, InferenceMetrics), RuntimeError> {
        let mut blob = input;
        let mut metrics = InferenceMetrics::default();
        for layer in &mut self.layers {
            let started = Instant::now();
            blob = layer.compute(blob)?;
            metrics.record(LayerMetrics {
                name: layer.name().to_string(),
                kind: layer.kind(),
                elapsed: started.elapsed(),
                output_shape: blob.shape_string(),
            });
        }
        if self.profiling {
            tracing::info!(network = %self.name, "{}", metrics.summary());
        }
        Ok((blob, metrics))
    }

    /// Forward pass without the timing breakdown.
    pub fn forward(&mut self, input: Blob) -> Result<Blob, RuntimeError> {
        Ok(self.compute(input)?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ConvParams, FcParams, MemoryParamStore};
    use auto_tuner::MemoryTuningStore;
    use model_ir::NetworkManifest;
    use tensor_core::Tensor4;

    fn manifest_json(mode: &str) -> String {
        format!(
            r#"{{
                "name": "tiny", "execution_mode": "{mode}",
                "auto_tuning": "off", "allocated_ram_mb": 16,
                "layers": [
                    {{ "name": "conv1", "type": "Convolution",
                       "parameters_file": "conv1.params",
                       "pad": 1, "stride": 1, "group": 1 }},
                    {{ "name": "relu1", "type": "ReLU" }},
                    {{ "name": "pool1", "type": "Pooling",
                       "pool": "max", "kernel_size": 2, "pad": 0, "stride": 2 }},
                    {{ "name": "fc1", "type": "FullyConnected",
                       "parameters_file": "fc1.params" }},
                    {{ "name": "prob", "type": "Softmax" }}
                ]
            }}"#
        )
    }

    fn stores() -> Arc<MemoryParamStore> {
        let store = MemoryParamStore::new();
        store.insert_conv(
            "conv1.params",
            ConvParams {
                weights: Tensor4::from_vec(
                    2,
                    3,
                    3,
                    3,
                    (0..54).map(|v| ((v % 5) as f32 - 2.0) * 0.1).collect(),
                )
                .unwrap(),
                bias: vec![0.1, -0.1],
            },
        );
        // conv output on 6x6 input: (2, 6, 6) -> pooled (2, 3, 3) -> 18
        store.insert_fc(
            "fc1.params",
            FcParams {
                weights: (0..4 * 18).map(|v| ((v % 7) as f32 - 3.0) * 0.05).collect(),
                bias: vec![0.0; 4],
            },
        );
        Arc::new(store)
    }

    fn build_pipeline(mode: &str) -> NetworkPipeline {
        let manifest = NetworkManifest::from_json(&manifest_json(mode)).unwrap();
        let def = NetworkDef::resolve(&manifest).unwrap();
        NetworkPipeline::build(
            &def,
            stores(),
            Arc::new(MemoryTuningStore::new()),
            Arc::new(CpuVectorBackend::new()),
        )
        .unwrap()
    }

    fn sample_input() -> Blob {
        Blob::Rank4(
            Tensor4::from_vec(
                1,
                3,
                6,
                6,
                (0..108).map(|v| ((v % 9) as f32 - 4.0) * 0.2).collect(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_parallel_fuses_relu_into_convolution() {
        let pipeline = build_pipeline("parallel");
        // conv1+relu1 fused: 4 engines instead of 5
        assert_eq!(pipeline.num_layers(), 4);
    }

    #[test]
    fn test_sequential_keeps_standalone_relu() {
        let pipeline = build_pipeline("sequential");
        assert_eq!(pipeline.num_layers(), 5);
    }

    #[test]
    fn test_modes_agree_end_to_end() {
        let mut seq = build_pipeline("sequential");
        let mut par = build_pipeline("parallel");
        let a = seq
            .forward(sample_input())
            .unwrap()
            .into_rank2()
            .unwrap();
        let b = par
            .forward(sample_input())
            .unwrap()
            .into_rank2()
            .unwrap();
        assert_eq!(a.dims(), b.dims());
        for (x, y) in a.data().iter().zip(b.data()) {
            assert!((x - y).abs() < 1e-5, "{x} vs {y}");
        }
    }

    #[test]
    fn test_metrics_cover_every_engine() {
        let mut pipeline = build_pipeline("sequential");
        let (out, metrics) = pipeline.compute(sample_input()).unwrap();
        assert!(matches!(out, Blob::Rank2(_)));
        assert_eq!(metrics.layers.len(), 5);
        assert_eq!(metrics.layers[0].name, "conv1");
        assert!(metrics.total >= metrics.layers[0].elapsed);
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let mut pipeline = build_pipeline("sequential");
        let out = pipeline
            .forward(sample_input())
            .unwrap()
            .into_rank2()
            .unwrap();
        let sum: f32 = out.row(0).iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_missing_eager_params_fail_at_build() {
        let manifest = NetworkManifest::from_json(&manifest_json("sequential")).unwrap();
        let def = NetworkDef::resolve(&manifest).unwrap();
        let empty = Arc::new(MemoryParamStore::new());
        // zero file sizes plan everything lazy, so the build succeeds
        // and the failure surfaces on the first forward pass
        let mut pipeline = NetworkPipeline::build(
            &def,
            empty,
            Arc::new(MemoryTuningStore::new()),
            Arc::new(CpuVectorBackend::new()),
        )
        .unwrap();
        let err = pipeline.forward(sample_input()).unwrap_err();
        assert!(matches!(err, RuntimeError::ParameterLoad { .. }));
    }
}
