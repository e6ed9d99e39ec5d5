// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-layer timing collected during a forward pass.

use std::time::Duration;

/// Timing for one layer of one forward pass.
#[derive(Debug, Clone)]
pub struct LayerMetrics {
    pub name: String,
    pub kind: &'static str,
    pub elapsed: Duration,
    /// Shape of the blob the layer produced, for logs.
    pub output_shape: String,
}

/// Timing for one complete forward pass.
#[derive(Debug, Clone, Default)]
pub struct InferenceMetrics {
    pub layers: Vec<LayerMetrics>,
    pub total: Duration,
}

impl InferenceMetrics {
    pub fn record(&mut self, layer: LayerMetrics) {
        self.total += layer.elapsed;
        self.layers.push(layer);
    }

    /// The slowest layer, if any ran.
    pub fn slowest(&self) -> Option<&LayerMetrics> {
        self.layers.iter().max_by_key(|l| l.elapsed)
    }

    /// Multi-line human-readable breakdown.
    pub fn summary(&self) -> String {
        let mut s = format!("forward pass: {:.2} ms total\n", ms(self.total));
        for l in &self.layers {
            s.push_str(&format!(
                "  {:<20} {:<15} {:>9.3} ms  -> {}\n",
                l.name,
                l.kind,
                ms(l.elapsed),
                l.output_shape,
            ));
        }
        s
    }
}

fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}
