// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Standalone ReLU.
//!
//! In sequential mode (and wherever fusion into the preceding layer is
//! not possible) the manifest's ReLU entries run as their own layer.

use std::time::Instant;

use tensor_core::Blob;

use crate::RuntimeError;

use super::{shape_error, Layer};

pub struct NonLinear {
    name: String,
}

impl NonLinear {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

fn relu_in_place(values: &mut [f32]) {
    for v in values {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

impl Layer for NonLinear {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ReLU"
    }

    fn compute(&mut self, input: Blob) -> Result<Blob, RuntimeError> {
        let started = Instant::now();
        let output = match input {
            Blob::Rank4(mut t) => {
                relu_in_place(t.data_mut());
                Blob::Rank4(t)
            }
            Blob::Rank2(mut t) => {
                relu_in_place(t.data_mut());
                Blob::Rank2(t)
            }
            other => return Err(shape_error(&self.name, "rank-4 or rank-2", &other)),
        };
        tracing::debug!(
            layer = %self.name,
            elapsed_ms = started.elapsed().as_secs_f64() * 1e3,
            "relu computed",
        );
        Ok(output)
    }
}
