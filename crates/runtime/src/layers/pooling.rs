// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The pooling layer engine (max or average).
//!
//! Channels are independent, so parallel execution partitions the
//! channel axis across scoped worker threads, one image at a time. The
//! worker count is the tunable: with auto-tuning on and nothing
//! persisted, the first parallel call benchmarks 4, 6 and 8 workers on
//! a one-image slice and persists the winner.

use std::sync::Arc;
use std::time::{Duration, Instant};

use auto_tuner::{select_best, TuningState, TuningStore, WorkerCount, DEFAULT_WORKER_COUNT};
use model_ir::{PoolMethod, PoolingSpec};
use tensor_core::{kernels, Blob, Tensor4};

use crate::executor::run_channel_partitioned;
use crate::RuntimeError;

use super::{shape_error, Layer};

const TUNING_REPS: usize = 4;

pub struct Pooling {
    name: String,
    spec: PoolingSpec,
    parallel: bool,
    tuning_store: Arc<dyn TuningStore>,
    state: TuningState<WorkerCount>,
}

/// Pools one channel plane into `out_plane` (`h_o * w_o` long).
#[allow(clippy::too_many_arguments)]
fn pool_plane(
    method: PoolMethod,
    plane: &[f32],
    h_i: usize,
    w_i: usize,
    pad: usize,
    stride: usize,
    kernel_size: usize,
    h_o: usize,
    w_o: usize,
    out_plane: &mut [f32],
) {
    for x in 0..h_o {
        let x_l = x * stride;
        let x_h = x_l + kernel_size;
        for y in 0..w_o {
            let y_l = y * stride;
            let y_h = y_l + kernel_size;
            out_plane[x * w_o + y] = match method {
                PoolMethod::Max => {
                    kernels::pool_max(plane, h_i, w_i, pad, pad, x_l, x_h, y_l, y_h)
                }
                PoolMethod::Ave => {
                    kernels::pool_mean(plane, h_i, w_i, pad, pad, x_l, x_h, y_l, y_h)
                }
            };
        }
    }
}

impl Pooling {
    pub fn new(
        name: &str,
        spec: PoolingSpec,
        parallel: bool,
        auto_tuning: bool,
        tuning_store: Arc<dyn TuningStore>,
    ) -> Self {
        let mut state = TuningState::from_stored(
            tuning_store.load(name).as_deref(),
            WorkerCount::from_token,
        );
        if state.needs_tuning() && !auto_tuning {
            state = TuningState::Tuned(DEFAULT_WORKER_COUNT);
        }
        Self {
            name: name.to_string(),
            spec,
            parallel,
            tuning_store,
            state,
        }
    }

    pub fn workers(&self) -> Option<WorkerCount> {
        self.state.choice()
    }

    fn output_dims(&self, h_i: usize, w_i: usize) -> (usize, usize) {
        (
            kernels::conv_output_dim(h_i, self.spec.pad, self.spec.kernel_size, self.spec.stride),
            kernels::conv_output_dim(w_i, self.spec.pad, self.spec.kernel_size, self.spec.stride),
        )
    }

    fn sequential(&self, input: &Tensor4) -> Tensor4 {
        let (n_i, c_i, h_i, w_i) = input.dims();
        let (h_o, w_o) = self.output_dims(h_i, w_i);
        let mut out = Tensor4::zeros(n_i, c_i, h_o, w_o);
        for n in 0..n_i {
            for c in 0..c_i {
                let plane = input.channel_plane(n, c);
                let base = c * h_o * w_o;
                pool_plane(
                    self.spec.method,
                    plane,
                    h_i,
                    w_i,
                    self.spec.pad,
                    self.spec.stride,
                    self.spec.kernel_size,
                    h_o,
                    w_o,
                    &mut out.image_mut(n)[base..base + h_o * w_o],
                );
            }
        }
        out
    }

    fn partitioned(&self, input: &Tensor4, workers: usize) -> Tensor4 {
        let (n_i, c_i, h_i, w_i) = input.dims();
        let (h_o, w_o) = self.output_dims(h_i, w_i);
        let plane_o = h_o * w_o;
        let mut out = Tensor4::zeros(n_i, c_i, h_o, w_o);
        for n in 0..n_i {
            run_channel_partitioned(workers, c_i, plane_o, out.image_mut(n), |c0, c1, slice| {
                for c in c0..c1 {
                    let local = (c - c0) * plane_o;
                    pool_plane(
                        self.spec.method,
                        input.channel_plane(n, c),
                        h_i,
                        w_i,
                        self.spec.pad,
                        self.spec.stride,
                        self.spec.kernel_size,
                        h_o,
                        w_o,
                        &mut slice[local..local + plane_o],
                    );
                }
            });
        }
        out
    }

    fn tune_then_compute(&mut self, input: &Tensor4) -> Result<Tensor4, RuntimeError> {
        let (_, c_i, h_i, w_i) = input.dims();
        let slice = Tensor4::from_vec(1, c_i, h_i, w_i, input.image(0).to_vec())
            .map_err(|e| RuntimeError::Compute {
                layer: self.name.clone(),
                detail: e.to_string(),
            })?;

        let mut timings = vec![Duration::ZERO; WorkerCount::CANDIDATES.len()];
        for (i, candidate) in WorkerCount::CANDIDATES.into_iter().enumerate() {
            for _ in 0..TUNING_REPS {
                let started = Instant::now();
                self.partitioned(&slice, candidate.get());
                timings[i] += started.elapsed();
            }
        }
        let chosen = WorkerCount::CANDIDATES[select_best(&timings)];
        self.state = TuningState::Tuned(chosen);
        if let Err(e) = self.tuning_store.store(&self.name, &chosen.token()) {
            tracing::warn!(layer = %self.name, error = %e, "could not persist tuning record");
        }
        tracing::info!(layer = %self.name, workers = chosen.get(), "pooling worker count tuned");

        Ok(self.partitioned(input, chosen.get()))
    }
}

impl Layer for Pooling {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "Pooling"
    }

    fn compute(&mut self, input: Blob) -> Result<Blob, RuntimeError> {
        let input = match input {
            Blob::Rank4(t) => t,
            other => return Err(shape_error(&self.name, "rank-4", &other)),
        };
        let started = Instant::now();
        let output = if !self.parallel {
            self.sequential(&input)
        } else if self.state.needs_tuning() {
            self.tune_then_compute(&input)?
        } else {
            let workers = self.state.choice().unwrap_or(DEFAULT_WORKER_COUNT);
            self.partitioned(&input, workers.get())
        };
        tracing::debug!(
            layer = %self.name,
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "pooling computed",
        );
        Ok(Blob::Rank4(output))
    }
}
