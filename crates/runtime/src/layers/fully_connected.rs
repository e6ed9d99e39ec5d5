// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The fully-connected (inner product) layer engine.
//!
//! Rank-4 input flattens to one row per image; rank-2 passes through as
//! rows. Sequential execution runs scalar dot products; parallel
//! execution pads rows and weights to the variant's vector width and
//! dispatches one backend call for the whole batch. Two layout variants
//! exist (input width 4 or 8) and tuning picks between them on the
//! first row of the first call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use auto_tuner::{select_best, FcVariant, TuningState, TuningStore};
use model_ir::FullyConnectedSpec;
use tensor_core::{kernels, layout, Blob, Tensor2};

use crate::backend::{ComputeBackend, FcGeometry};
use crate::params::{FcParams, ParamStore};
use crate::RuntimeError;

use super::{shape_error, Layer};

const TUNING_REPS: usize = 4;

/// Weights and bias padded for one layout variant.
struct PackedWeights {
    variant: FcVariant,
    weights: Vec<f32>,
    bias: Vec<f32>,
    c_in: usize,
    c_pad: usize,
}

pub struct FullyConnected {
    name: String,
    spec: FullyConnectedSpec,
    parallel: bool,
    eager: bool,
    fused_relu: bool,
    params_store: Arc<dyn ParamStore>,
    tuning_store: Arc<dyn TuningStore>,
    backend: Arc<dyn ComputeBackend>,
    state: TuningState<FcVariant>,
    params: Option<FcParams>,
    packed: Option<PackedWeights>,
}

impl FullyConnected {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        spec: FullyConnectedSpec,
        parallel: bool,
        auto_tuning: bool,
        eager: bool,
        params_store: Arc<dyn ParamStore>,
        tuning_store: Arc<dyn TuningStore>,
        backend: Arc<dyn ComputeBackend>,
    ) -> Result<Self, RuntimeError> {
        let mut state = TuningState::from_stored(
            tuning_store.load(name).as_deref(),
            FcVariant::from_token,
        );
        if state.needs_tuning() && !auto_tuning {
            state = TuningState::Tuned(FcVariant::DEFAULT);
        }

        let mut layer = Self {
            name: name.to_string(),
            spec,
            parallel,
            eager,
            fused_relu: false,
            params_store,
            tuning_store,
            backend,
            state,
            params: None,
            packed: None,
        };

        if eager && (!parallel || !layer.state.needs_tuning()) {
            let params = layer.load_params()?;
            if layer.parallel {
                if let Some(variant) = layer.state.choice() {
                    layer.packed = Some(Self::pack_weights(&params, variant));
                }
            }
            layer.params = Some(params);
        }

        Ok(layer)
    }

    pub fn set_fused_relu(&mut self) {
        self.fused_relu = true;
    }

    pub fn variant(&self) -> Option<FcVariant> {
        self.state.choice()
    }

    fn load_params(&self) -> Result<FcParams, RuntimeError> {
        let started = Instant::now();
        let params = self
            .params_store
            .fc_params(&self.name, &self.spec.params_file)?;
        if params.bias.is_empty() || params.weights.len() % params.bias.len() != 0 {
            return Err(RuntimeError::ParameterLoad {
                layer: self.name.clone(),
                file: self.spec.params_file.clone(),
                detail: format!(
                    "{} weights do not divide into {} output rows",
                    params.weights.len(),
                    params.bias.len()
                ),
            });
        }
        tracing::debug!(
            layer = %self.name,
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "inner product parameters loaded",
        );
        Ok(params)
    }

    fn pack_weights(params: &FcParams, variant: FcVariant) -> PackedWeights {
        let c_in = params.input_features();
        let c_pad = layout::padded_channels(c_in, variant.input_width(), 1);
        let mut weights = Vec::with_capacity(params.output_features() * c_pad);
        for row in params.weights.chunks_exact(c_in) {
            weights.extend(layout::pad_row(row, c_pad));
        }
        PackedWeights {
            variant,
            weights,
            bias: params.bias.clone(),
            c_in,
            c_pad,
        }
    }

    /// Flattens the incoming blob to `(n, features)` rows.
    fn rows(&self, input: &Blob) -> Result<(usize, usize, Vec<f32>), RuntimeError> {
        match input {
            Blob::Rank4(t) => {
                let (n, c, h, w) = t.dims();
                Ok((n, c * h * w, t.data().to_vec()))
            }
            Blob::Rank2(t) => {
                let (n, c) = t.dims();
                Ok((n, c, t.data().to_vec()))
            }
            other => Err(shape_error(&self.name, "rank-4 or rank-2", other)),
        }
    }

    fn check_features(&self, features: usize, c_in: usize) -> Result<(), RuntimeError> {
        if features != c_in {
            return Err(RuntimeError::Compute {
                layer: self.name.clone(),
                detail: format!("input has {features} features, weights expect {c_in}"),
            });
        }
        Ok(())
    }

    fn forward(
        &mut self,
        n: usize,
        features: usize,
        data: &[f32],
    ) -> Result<Tensor2, RuntimeError> {
        if !self.parallel {
            let params = match self.params.take() {
                Some(p) => p,
                None => self.load_params()?,
            };
            self.check_features(features, params.input_features())?;
            let out = self.sequential(n, features, data, &params);
            if self.eager {
                self.params = Some(params);
            }
            return Ok(out);
        }

        if self.state.needs_tuning() {
            return self.tune_then_compute(n, features, data);
        }

        let packed = match self.packed.take() {
            Some(p) => p,
            None => {
                let params = self.load_params()?;
                let variant = self.state.choice().unwrap_or(FcVariant::DEFAULT);
                let packed = Self::pack_weights(&params, variant);
                if self.eager {
                    self.params = Some(params);
                }
                packed
            }
        };
        self.check_features(features, packed.c_in)?;
        let out = self.vectorized(n, features, data, &packed);
        if self.eager {
            self.packed = Some(packed);
        }
        Ok(out)
    }

    fn sequential(&self, n: usize, features: usize, data: &[f32], params: &FcParams) -> Tensor2 {
        let n_out = params.output_features();
        let mut out = Tensor2::zeros(n, n_out);
        for row in 0..n {
            let input_row = &data[row * features..(row + 1) * features];
            for j in 0..n_out {
                let w_row = &params.weights[j * features..(j + 1) * features];
                let mut v = kernels::inner_product(input_row, w_row) + params.bias[j];
                if self.fused_relu && v < 0.0 {
                    v = 0.0;
                }
                out.row_mut(row)[j] = v;
            }
        }
        out
    }

    fn vectorized(&self, n: usize, features: usize, data: &[f32], packed: &PackedWeights) -> Tensor2 {
        let mut rows = Vec::with_capacity(n * packed.c_pad);
        for row in data.chunks_exact(features) {
            rows.extend(layout::pad_row(row, packed.c_pad));
        }
        let geom = FcGeometry {
            c_pad: packed.c_pad,
            n_out: packed.bias.len(),
            in_vw: packed.variant.input_width(),
        };
        let mut values =
            self.backend
                .inner_product_forward(&rows, n, &packed.weights, &packed.bias, &geom);
        if self.fused_relu {
            for v in &mut values {
                if *v < 0.0 {
                    *v = 0.0;
                }
            }
        }
        // dimensions hold by construction of `values`
        Tensor2::from_vec(n, geom.n_out, values).unwrap_or_else(|_| Tensor2::zeros(n, geom.n_out))
    }

    fn tune_then_compute(
        &mut self,
        n: usize,
        features: usize,
        data: &[f32],
    ) -> Result<Tensor2, RuntimeError> {
        let params = self.load_params()?;
        self.check_features(features, params.input_features())?;
        let first_row = &data[..features];

        let mut timings = vec![Duration::ZERO; FcVariant::ALL.len()];
        for (i, &variant) in FcVariant::ALL.iter().enumerate() {
            for _ in 0..TUNING_REPS {
                // packing counts toward the measurement; its cost
                // differs between the two layouts
                let started = Instant::now();
                let packed = Self::pack_weights(&params, variant);
                self.vectorized(1, features, first_row, &packed);
                timings[i] += started.elapsed();
            }
        }
        let chosen = FcVariant::ALL[select_best(&timings)];
        self.state = TuningState::Tuned(chosen);
        if let Err(e) = self.tuning_store.store(&self.name, chosen.token()) {
            tracing::warn!(layer = %self.name, error = %e, "could not persist tuning record");
        }
        tracing::info!(layer = %self.name, variant = chosen.token(), "inner product variant tuned");

        // the tuning call's own batch always runs the widest variant;
        // the persisted winner takes over from the next call
        let wide = Self::pack_weights(&params, FcVariant::TUNING_COMPUTE);
        let out = self.vectorized(n, features, data, &wide);
        if self.eager {
            self.packed = Some(Self::pack_weights(&params, chosen));
            self.params = Some(params);
        }
        Ok(out)
    }
}

impl Layer for FullyConnected {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "FullyConnected"
    }

    fn compute(&mut self, input: Blob) -> Result<Blob, RuntimeError> {
        let (n, features, data) = self.rows(&input)?;
        let started = Instant::now();
        let output = self.forward(n, features, &data)?;
        tracing::debug!(
            layer = %self.name,
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "inner product computed",
        );
        Ok(Blob::Rank2(output))
    }
}
