// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The convolution layer engine.
//!
//! Two execution paths share one numeric definition:
//! - sequential: scalar loops over groups via
//!   `kernels::conv_accumulate`;
//! - parallel: filters and bias pre-packed into the vector layout, one
//!   backend dispatch per image with double-buffered input packing
//!   (image `n + 1` is packed before image `n`'s result is consumed),
//!   ReLU fused into the unpack when attached.
//!
//! Eight layout variants exist (input width 4/8 x output width
//! 1/2/4/8). With auto-tuning on and nothing persisted, the first
//! parallel call benchmarks the applicable four on a one-image slice
//! and persists the winner. The tuning call's own full-batch compute
//! always runs the widest variant regardless of the winner, a quirk
//! kept for compatibility with the reference behavior.

use std::sync::Arc;
use std::time::{Duration, Instant};

use auto_tuner::{select_best, ConvVariant, TuningState, TuningStore};
use model_ir::ConvolutionSpec;
use tensor_core::{kernels, layout, Blob, Tensor4};

use crate::backend::{ComputeBackend, ConvGeometry};
use crate::params::{ConvParams, ParamStore};
use crate::RuntimeError;

use super::{shape_error, Layer};

const TUNING_REPS: usize = 4;

/// Filters and bias packed for one layout variant.
struct PackedKernel {
    variant: ConvVariant,
    filters: Vec<f32>,
    bias: Vec<f32>,
    n_k: usize,
    h_k: usize,
    w_k: usize,
    n_pad: usize,
    c_k_pad: usize,
}

pub struct Convolution {
    name: String,
    spec: ConvolutionSpec,
    parallel: bool,
    eager: bool,
    fused_relu: bool,
    params_store: Arc<dyn ParamStore>,
    tuning_store: Arc<dyn TuningStore>,
    backend: Arc<dyn ComputeBackend>,
    state: TuningState<ConvVariant>,
    params: Option<ConvParams>,
    packed: Option<PackedKernel>,
}

impl Convolution {
    /// Builds the engine, loading parameters now when the load plan
    /// marked this layer eager (deferred if the first call must tune,
    /// since tuning reloads anyway).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        spec: ConvolutionSpec,
        parallel: bool,
        auto_tuning: bool,
        eager: bool,
        params_store: Arc<dyn ParamStore>,
        tuning_store: Arc<dyn TuningStore>,
        backend: Arc<dyn ComputeBackend>,
    ) -> Result<Self, RuntimeError> {
        let mut state = TuningState::from_stored(
            tuning_store.load(name).as_deref(),
            ConvVariant::from_token,
        );
        if state.needs_tuning() && !auto_tuning {
            state = TuningState::Tuned(ConvVariant::DEFAULT);
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
                    layer.packed = Some(Self::pack_kernel(&params, variant, layer.spec.group));
                }
            }
            layer.params = Some(params);
        }

        Ok(layer)
    }

    /// Attaches the fused ReLU (parallel-mode attachment from the
    /// manifest's following ReLU entry).
    pub fn set_fused_relu(&mut self) {
        self.fused_relu = true;
    }

    /// The current variant choice, if tuned.
    pub fn variant(&self) -> Option<ConvVariant> {
        self.state.choice()
    }

    fn load_params(&self) -> Result<ConvParams, RuntimeError> {
        let started = Instant::now();
        let params = self
            .params_store
            .conv_params(&self.name, &self.spec.params_file)?;
        let (n_k, _, _, _) = params.weights.dims();
        if n_k % self.spec.group != 0 {
            return Err(RuntimeError::ParameterLoad {
                layer: self.name.clone(),
                file: self.spec.params_file.clone(),
                detail: format!(
                    "{n_k} filters not divisible by group {}",
                    self.spec.group
                ),
            });
        }
        if params.bias.len() != n_k {
            return Err(RuntimeError::ParameterLoad {
                layer: self.name.clone(),
                file: self.spec.params_file.clone(),
                detail: format!(
                    "bias length {} does not match {n_k} filters",
                    params.bias.len()
                ),
            });
        }
        tracing::debug!(
            layer = %self.name,
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "convolution parameters loaded",
        );
        Ok(params)
    }

    fn pack_kernel(params: &ConvParams, variant: ConvVariant, group: usize) -> PackedKernel {
        let (n_k, c_k, h_k, w_k) = params.weights.dims();
        let n_pad = layout::padded_channels(n_k, variant.output_width(), group);
        let c_k_pad = layout::padded_channels(c_k, variant.input_width(), 1);
        PackedKernel {
            variant,
            filters: layout::pack_filters(&params.weights, n_pad, c_k_pad, group),
            bias: layout::pack_bias(&params.bias, n_pad, group),
            n_k,
            h_k,
            w_k,
            n_pad,
            c_k_pad,
        }
    }

    fn forward(&mut self, input: &Tensor4) -> Result<Tensor4, RuntimeError> {
        let (_, c_i, _, _) = input.dims();
        if c_i % self.spec.group != 0 {
            return Err(RuntimeError::Compute {
                layer: self.name.clone(),
                detail: format!(
                    "{c_i} input channels not divisible by group {}",
                    self.spec.group
                ),
            });
        }

        if !self.parallel {
            let params = match self.params.take() {
                Some(p) => p,
                None => self.load_params()?,
            };
            let out = self.sequential(input, &params)?;
            if self.eager {
                self.params = Some(params);
            }
            return Ok(out);
        }

        if self.state.needs_tuning() {
            return self.tune_then_compute(input);
        }

        let packed = match self.packed.take() {
            Some(p) => p,
            None => {
                let params = self.load_params()?;
                let variant = self.state.choice().unwrap_or(ConvVariant::DEFAULT);
                let packed = Self::pack_kernel(&params, variant, self.spec.group);
                if self.eager {
                    self.params = Some(params);
                }
                packed
            }
        };
        let out = self.vectorized(input, &packed)?;
        // lazy layers release the packed buffers here; eager layers
        // keep them across calls
        if self.eager {
            self.packed = Some(packed);
        }
        Ok(out)
    }

    fn sequential(&self, input: &Tensor4, params: &ConvParams) -> Result<Tensor4, RuntimeError> {
        let (n_i, c_i, h_i, w_i) = input.dims();
        let (n_k, c_k, h_k, w_k) = params.weights.dims();
        let group = self.spec.group;
        if c_k * group != c_i {
            return Err(RuntimeError::Compute {
                layer: self.name.clone(),
                detail: format!(
                    "weights cover {c_k} channels per group but input has {c_i} over {group} group(s)"
                ),
            });
        }
        let (pad, stride) = (self.spec.pad, self.spec.stride);
        let h_o = kernels::conv_output_dim(h_i, pad, h_k, stride);
        let w_o = kernels::conv_output_dim(w_i, pad, w_k, stride);
        let slice_c = c_i / group;
        let filters_per_group = n_k / group;
        let cube = c_k * h_k * w_k;

        let mut out = Tensor4::zeros(n_i, n_k, h_o, w_o);
        for n in 0..n_i {
            let image = input.image(n);
            for g in 0..group {
                let img_slice = &image[g * slice_c * h_i * w_i..(g + 1) * slice_c * h_i * w_i];
                for k in 0..filters_per_group {
                    let f = g * filters_per_group + k;
                    let cube_slice = &params.weights.data()[f * cube..(f + 1) * cube];
                    for x in 0..h_o {
                        for y in 0..w_o {
                            let mut v = kernels::conv_accumulate(
                                img_slice,
                                slice_c,
                                h_i,
                                w_i,
                                cube_slice,
                                h_k,
                                w_k,
                                x * stride,
                                y * stride,
                                pad,
                                pad,
                            ) + params.bias[f];
                            if self.fused_relu && v < 0.0 {
                                v = 0.0;
                            }
                            *out.at_mut(n, f, x, y) = v;
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn vectorized(&self, input: &Tensor4, packed: &PackedKernel) -> Result<Tensor4, RuntimeError> {
        let (n_i, c_i, h_i, w_i) = input.dims();
        let group = self.spec.group;
        let in_vw = packed.variant.input_width();
        let c_pad = layout::padded_channels(c_i, in_vw, group);
        if c_pad != packed.c_k_pad * group {
            return Err(RuntimeError::Compute {
                layer: self.name.clone(),
                detail: format!(
                    "packed kernel expects {} input channels per group, input pads to {}",
                    packed.c_k_pad,
                    c_pad / group
                ),
            });
        }
        let (pad, stride) = (self.spec.pad, self.spec.stride);
        let h_o = kernels::conv_output_dim(h_i, pad, packed.h_k, stride);
        let w_o = kernels::conv_output_dim(w_i, pad, packed.w_k, stride);
        let geom = ConvGeometry {
            c_pad,
            h_i,
            w_i,
            n_pad: packed.n_pad,
            c_k_pad: packed.c_k_pad,
            h_k: packed.h_k,
            w_k: packed.w_k,
            h_o,
            w_o,
            pad: (pad, pad),
            stride: (stride, stride),
            group,
            in_vw,
            out_vw: packed.variant.output_width(),
        };

        let mut out = Tensor4::zeros(n_i, packed.n_k, h_o, w_o);
        let mut front = layout::pack_image(input.image(0), c_i, h_i, w_i, c_pad, group);
        for n in 0..n_i {
            let result = self
                .backend
                .conv_forward(&front, &packed.filters, &packed.bias, &geom);
            // pack the next image before consuming this result
            if n + 1 < n_i {
                front = layout::pack_image(input.image(n + 1), c_i, h_i, w_i, c_pad, group);
            }
            let planar = layout::unpack_image(
                &result,
                h_o,
                w_o,
                packed.n_pad,
                packed.n_k,
                group,
                self.fused_relu,
            );
            out.image_mut(n).copy_from_slice(&planar);
        }
        Ok(out)
    }

    fn tune_then_compute(&mut self, input: &Tensor4) -> Result<Tensor4, RuntimeError> {
        let params = self.load_params()?;
        let (_, c_i, h_i, w_i) = input.dims();
        let slice = Tensor4::from_vec(1, c_i, h_i, w_i, input.image(0).to_vec())
            .map_err(|e| RuntimeError::Compute {
                layer: self.name.clone(),
                detail: e.to_string(),
            })?;

        let candidates: &[ConvVariant] = if c_i < 5 {
            &ConvVariant::NARROW
        } else {
            &ConvVariant::WIDE
        };
        let mut timings = vec![Duration::ZERO; candidates.len()];
        for (i, &variant) in candidates.iter().enumerate() {
            for _ in 0..TUNING_REPS {
                // layout cost differs per variant and is paid on every
                // lazy-load call, so it counts toward the measurement
                let started = Instant::now();
                let packed = Self::pack_kernel(&params, variant, self.spec.group);
                self.vectorized(&slice, &packed)?;
                timings[i] += started.elapsed();
            }
        }
        let chosen = candidates[select_best(&timings)];
        self.state = TuningState::Tuned(chosen);
        if let Err(e) = self.tuning_store.store(&self.name, chosen.token()) {
            tracing::warn!(layer = %self.name, error = %e, "could not persist tuning record");
        }
        tracing::info!(layer = %self.name, variant = chosen.token(), "convolution variant tuned");

        // the tuning call's own batch always runs the widest variant;
        // the persisted winner takes over from the next call
        let wide = Self::pack_kernel(&params, ConvVariant::TUNING_COMPUTE, self.spec.group);
        let out = self.vectorized(input, &wide)?;
        if self.eager {
            self.packed = Some(Self::pack_kernel(&params, chosen, self.spec.group));
            self.params = Some(params);
        }
        Ok(out)
    }
}

impl Layer for Convolution {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "Convolution"
    }

    fn compute(&mut self, input: Blob) -> Result<Blob, RuntimeError> {
        let input = match input {
            Blob::Rank4(t) => t,
            other => return Err(shape_error(&self.name, "rank-4", &other)),
        };
        let started = Instant::now();
        let output = self.forward(&input)?;
        tracing::debug!(
            layer = %self.name,
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "convolution computed",
        );
        Ok(Blob::Rank4(output))
    }
}
