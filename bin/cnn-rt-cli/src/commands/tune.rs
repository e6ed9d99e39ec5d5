// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cnn-rt tune` command: warm-up passes that let every tunable layer
//! benchmark its candidates and persist the winners.

use std::path::PathBuf;

use anyhow::Context;
use auto_tuner::{FsTuningStore, TuningStore};
use model_ir::NetworkDef;
use runtime::{NetworkPipeline, RuntimeConfig};
use tensor_core::Blob;

pub fn execute(
    network: PathBuf,
    tuning_dir: Option<PathBuf>,
    shape: String,
    passes: usize,
) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║              cnn-rt · Auto-Tuner Warm-up              ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let mut config = RuntimeConfig::new(&network);
    config.tuning_dir = tuning_dir;

    let manifest = config.manifest_path();
    let def = NetworkDef::from_file(&manifest)
        .with_context(|| format!("failed to load '{}'", manifest.display()))?;
    if !def.execution_mode.is_parallel() {
        anyhow::bail!("network '{}' runs in sequential mode; tuning applies only to parallel execution", def.name);
    }
    if !def.auto_tuning {
        anyhow::bail!("network '{}' has auto_tuning off; enable it in the manifest first", def.name);
    }

    let (c, h, w) = super::parse_shape(&shape)?;
    let input = super::synthetic_input(1, c, h, w)?;

    println!("  Network: {}", def.summary());
    println!("  Records: {}", config.tuning_dir().display());
    println!();

    let mut pipeline = NetworkPipeline::from_config(&config)?;
    for pass in 0..passes.max(1) {
        println!("  Pass {}/{}...", pass + 1, passes.max(1));
        pipeline.forward(Blob::Rank4(input.clone()))?;
    }
    println!();

    // ── Persisted records ──────────────────────────────────────
    println!("  {:<20} {:>10}", "Layer", "Choice");
    println!("  {}", "-".repeat(32));
    let store = FsTuningStore::new(config.tuning_dir());
    for layer in &def.layers {
        if let Some(token) = store.load(&layer.name) {
            println!("  {:<20} {:>10}", layer.name, token);
        }
    }
    println!();

    Ok(())
}
