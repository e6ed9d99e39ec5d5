// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Top-k accuracy against a ground-truth label file.
//!
//! The terminal layer of evaluation manifests: scores one rank-2 row of
//! class probabilities per image against one label per image and
//! reduces the batch to a single scalar hit rate.

use std::sync::Arc;
use std::time::Instant;

use model_ir::AccuracySpec;
use tensor_core::{kernels, Blob, Tensor2};

use crate::params::ParamStore;
use crate::RuntimeError;

use super::{shape_error, Layer};

pub struct Accuracy {
    name: String,
    spec: AccuracySpec,
    params_store: Arc<dyn ParamStore>,
    labels: Option<Vec<i64>>,
}

impl Accuracy {
    pub fn new(name: &str, spec: AccuracySpec, params_store: Arc<dyn ParamStore>) -> Self {
        Self {
            name: name.to_string(),
            spec,
            params_store,
            labels: None,
        }
    }

    fn load_labels(&mut self) -> Result<(), RuntimeError> {
        if self.labels.is_none() {
            let started = Instant::now();
            let labels = self
                .params_store
                .labels(&self.name, &self.spec.params_file)?;
            tracing::debug!(
                layer = %self.name,
                count = labels.len(),
                elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
                "labels loaded",
            );
            self.labels = Some(labels);
        }
        Ok(())
    }

    fn score(&mut self, rows: &Tensor2) -> Result<f32, RuntimeError> {
        let (n, c) = rows.dims();
        let topk = self.spec.topk;
        self.load_labels()?;
        let labels = self.labels.as_deref().unwrap_or_default();
        if labels.len() < n {
            return Err(RuntimeError::Compute {
                layer: self.name.clone(),
                detail: format!("{} labels for a batch of {n}", labels.len()),
            });
        }
        let mut hits = 0usize;
        for row in 0..n {
            let label = labels[row];
            if label < 0 || label as usize >= c {
                return Err(RuntimeError::Compute {
                    layer: self.name.clone(),
                    detail: format!("label {label} outside {c} classes"),
                });
            }
            let ranking = kernels::argsort_descending(rows.row(row));
            if kernels::top_k_match(&ranking, label as usize, topk) {
                hits += 1;
            }
        }
        Ok(hits as f32 / n as f32)
    }
}

impl Layer for Accuracy {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "Accuracy"
    }

    fn compute(&mut self, input: Blob) -> Result<Blob, RuntimeError> {
        let rows = match input {
            Blob::Rank2(t) => t,
            other => return Err(shape_error(&self.name, "rank-2", &other)),
        };
        let started = Instant::now();
        let accuracy = self.score(&rows)?;
        tracing::debug!(
            layer = %self.name,
            accuracy,
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "accuracy computed",
        );
        Ok(Blob::Scalar(accuracy))
    }
}
