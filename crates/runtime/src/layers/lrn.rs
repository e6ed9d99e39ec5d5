// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Local response normalization across channels.
//!
//! Each value divides by `(1 + f * agg)^beta`, where `agg` aggregates
//! squared values over a window of `local_size` channels centered on
//! the value's channel. Interior channels use the window MEAN scaled by
//! `alpha`; channels whose window straddles either channel edge use the
//! clamped-window SUM scaled by `alpha / local_size`. The two agree
//! only when the clamped window still holds `local_size` channels.
//!
//! Only `across_channels` normalization is supported; a manifest
//! requesting within-channel normalization yields an all-zero output
//! (flagged with a warning when the manifest is resolved).
//!
//! Parallel execution and worker-count tuning mirror pooling: channels
//! partition across scoped threads, one image at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use auto_tuner::{select_best, TuningState, TuningStore, WorkerCount, DEFAULT_WORKER_COUNT};
use model_ir::LrnSpec;
use tensor_core::{kernels, Blob, Tensor4};

use crate::executor::run_channel_partitioned;
use crate::RuntimeError;

use super::{shape_error, Layer};

const TUNING_REPS: usize = 4;

pub struct Lrn {
    name: String,
    spec: LrnSpec,
    parallel: bool,
    tuning_store: Arc<dyn TuningStore>,
    state: TuningState<WorkerCount>,
}

/// Normalizes one output channel of one image into `out_plane`.
fn normalize_channel(
    image: &[f32],
    c: usize,
    c_total: usize,
    h: usize,
    w: usize,
    spec: &LrnSpec,
    out_plane: &mut [f32],
) {
    let half = (spec.local_size - 1) / 2;
    let (agg, factor) = if c < half {
        let hi = (c + half + 1).min(c_total);
        (
            kernels::channel_power_sum(image, h, w, 0, hi, 2.0),
            (spec.alpha / spec.local_size as f64) as f32,
        )
    } else if c + half + 1 > c_total {
        (
            kernels::channel_power_sum(image, h, w, c - half, c_total, 2.0),
            (spec.alpha / spec.local_size as f64) as f32,
        )
    } else {
        (
            kernels::channel_power_mean(image, h, w, c - half, c + half + 1, 2.0),
            spec.alpha as f32,
        )
    };

    let plane = h * w;
    let src = &image[c * plane..(c + 1) * plane];
    for ((out, &v), &a) in out_plane.iter_mut().zip(src).zip(&agg) {
        let divisor = ((a * factor + 1.0) as f64).powf(spec.beta) as f32;
        *out = v / divisor;
    }
}

impl Lrn {
    pub fn new(
        name: &str,
        spec: LrnSpec,
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

    fn sequential(&self, input: &Tensor4) -> Tensor4 {
        let (n_i, c_i, h_i, w_i) = input.dims();
        let plane = h_i * w_i;
        let mut out = Tensor4::zeros(n_i, c_i, h_i, w_i);
        for n in 0..n_i {
            let image = input.image(n);
            let out_image = out.image_mut(n);
            for c in 0..c_i {
                normalize_channel(
                    image,
                    c,
                    c_i,
                    h_i,
                    w_i,
                    &self.spec,
                    &mut out_image[c * plane..(c + 1) * plane],
                );
            }
        }
        out
    }

    fn partitioned(&self, input: &Tensor4, workers: usize) -> Tensor4 {
        let (n_i, c_i, h_i, w_i) = input.dims();
        let plane = h_i * w_i;
        let mut out = Tensor4::zeros(n_i, c_i, h_i, w_i);
        for n in 0..n_i {
            let image = input.image(n);
            run_channel_partitioned(workers, c_i, plane, out.image_mut(n), |c0, c1, slice| {
                for c in c0..c1 {
                    let local = (c - c0) * plane;
                    normalize_channel(
                        image,
                        c,
                        c_i,
                        h_i,
                        w_i,
                        &self.spec,
                        &mut slice[local..local + plane],
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
        tracing::info!(layer = %self.name, workers = chosen.get(), "normalization worker count tuned");

        Ok(self.partitioned(input, chosen.get()))
    }
}

impl Layer for Lrn {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "LRN"
    }

    fn compute(&mut self, input: Blob) -> Result<Blob, RuntimeError> {
        let input = match input {
            Blob::Rank4(t) => t,
            other => return Err(shape_error(&self.name, "rank-4", &other)),
        };
        let started = Instant::now();
        let output = if !self.spec.is_across_channels() {
            let (n, c, h, w) = input.dims();
            Tensor4::zeros(n, c, h, w)
        } else if !self.parallel {
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
            "normalization computed",
        );
        Ok(Blob::Rank4(output))
    }
}
