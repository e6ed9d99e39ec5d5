// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cnn-rt run` command: one forward pass through a network.

use std::path::PathBuf;

use anyhow::Context;
use runtime::{NetworkPipeline, RuntimeConfig};
use tensor_core::{kernels, Blob, Tensor4};

pub fn execute(
    network: PathBuf,
    tuning_dir: Option<PathBuf>,
    input: Option<PathBuf>,
    shape: String,
    batch: usize,
    profile: bool,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             cnn-rt · Inference Runner                ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let mut config = RuntimeConfig::new(&network);
    config.tuning_dir = tuning_dir;
    config.profiling = profile;

    let tensor = match &input {
        Some(path) => load_input(path)?,
        None => {
            let (c, h, w) = super::parse_shape(&shape)?;
            super::synthetic_input(batch.max(1), c, h, w)?
        }
    };
    let (n, c, h, w) = tensor.dims();

    println!("  Config:");
    println!("   Network:  {}", network.display());
    println!("   Tuning:   {}", config.tuning_dir().display());
    println!(
        "   Input:    ({n}, {c}, {h}, {w}){}",
        if input.is_some() { "" } else { "  [synthetic]" },
    );
    println!();

    println!("  [1/2] Building pipeline...");
    let mut pipeline = NetworkPipeline::from_config(&config)
        .with_context(|| format!("failed to build network from '{}'", network.display()))?;
    println!(
        "        Network '{}' ready ({} layers).",
        pipeline.name(),
        pipeline.num_layers(),
    );
    println!();

    println!("  [2/2] Running forward pass...");
    let (output, metrics) = pipeline.compute(Blob::Rank4(tensor))?;
    println!();

    print_output(&output);

    println!("  Metrics:");
    for line in metrics.summary().lines() {
        println!("   {line}");
    }
    if let Some(slowest) = metrics.slowest() {
        println!("   slowest: {} ({})", slowest.name, slowest.kind);
    }
    println!();

    Ok(())
}

fn print_output(output: &Blob) {
    println!("  Results:");
    match output {
        Blob::Scalar(accuracy) => {
            println!("   Accuracy: {:.2}%", accuracy * 100.0);
        }
        Blob::Rank2(rows) => {
            let (n, _) = rows.dims();
            for row in 0..n {
                let ranking = kernels::argsort_descending(rows.row(row));
                let top: Vec<String> = ranking
                    .iter()
                    .take(5)
                    .map(|&c| format!("{c} ({:.4})", rows.row(row)[c]))
                    .collect();
                println!("   image {row}: top classes {}", top.join(", "));
            }
        }
        Blob::Rank4(_) => {
            println!("   Output tensor: {}", output.shape_string());
        }
    }
    println!();
}

/// Loads a rank-4 F32 tensor named "data" from a SafeTensors file.
fn load_input(path: &std::path::Path) -> anyhow::Result<Tensor4> {
    let handle = std::fs::File::open(path)
        .with_context(|| format!("cannot open input '{}'", path.display()))?;
    let mmap = unsafe { memmap2::Mmap::map(&handle) }?;
    let tensors = safetensors::SafeTensors::deserialize(&mmap)?;
    let view = tensors.tensor("data").context("no tensor named 'data'")?;
    anyhow::ensure!(
        view.dtype() == safetensors::Dtype::F32,
        "input tensor must be F32, got {:?}",
        view.dtype(),
    );
    let &[n, c, h, w] = view.shape() else {
        anyhow::bail!("input tensor must be rank 4, got shape {:?}", view.shape());
    };
    let data = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok(Tensor4::from_vec(n, c, h, w, data)?)
}
