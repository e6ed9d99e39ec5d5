// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Softmax over class scores.
//!
//! Rank-4 input is read as one score per channel (spatial dims already
//! reduced to 1x1); rank-2 rows pass straight through. Exponentiation
//! uses the engine's truncated base, see
//! [`tensor_core::kernels::EXP_BASE`].

use std::time::Instant;

use tensor_core::{kernels, Blob, Tensor2};

use crate::RuntimeError;

use super::{shape_error, Layer};

pub struct Softmax {
    name: String,
}

impl Softmax {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    fn rows(&self, input: Blob) -> Result<Tensor2, RuntimeError> {
        match input {
            Blob::Rank2(t) => Ok(t),
            Blob::Rank4(t) => {
                let (n, c, _, _) = t.dims();
                let mut rows = Tensor2::zeros(n, c);
                for row in 0..n {
                    for j in 0..c {
                        rows.row_mut(row)[j] = t.at(row, j, 0, 0);
                    }
                }
                Ok(rows)
            }
            other => Err(shape_error(&self.name, "rank-4 or rank-2", &other)),
        }
    }
}

impl Layer for Softmax {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "Softmax"
    }

    fn compute(&mut self, input: Blob) -> Result<Blob, RuntimeError> {
        let rows = self.rows(input)?;
        let started = Instant::now();
        let (n, c) = rows.dims();
        let mut out = Tensor2::zeros(n, c);
        for row in 0..n {
            let probs = kernels::averaged_exp(rows.row(row));
            out.row_mut(row).copy_from_slice(&probs);
        }
        tracing::debug!(
            layer = %self.name,
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "softmax computed",
        );
        Ok(Blob::Rank2(out))
    }
}
