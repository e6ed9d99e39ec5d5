// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `cnn-rt inspect` command: layer table, parameter sizes, load plan.

use std::path::PathBuf;

use anyhow::Context;
use memory_planner::{LoadPlan, MemoryBudget};
use model_ir::{LayerSpec, NetworkDef};
use runtime::params::{ParamStore, SafeTensorsStore};
use runtime::MANIFEST_FILE;

pub fn execute(network: PathBuf) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║             cnn-rt · Network Inspector               ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let manifest = network.join(MANIFEST_FILE);
    let def = NetworkDef::from_file(&manifest)
        .with_context(|| format!("failed to load '{}'", manifest.display()))?;
    let store = SafeTensorsStore::new(&network);

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", def.summary());
    println!();

    // ── Load plan ──────────────────────────────────────────────
    let sizes: Vec<u64> = def
        .layers
        .iter()
        .map(|l| l.spec.params_file().map_or(0, |f| store.file_size(f)))
        .collect();
    let budget = MemoryBudget::from_mb(def.allocated_ram_mb);
    let plan = LoadPlan::plan(&sizes, budget);

    // ── Per-layer detail ───────────────────────────────────────
    println!(
        "  {:<4} {:<20} {:<16} {:<24} {:>10} {:>6}",
        "Idx", "Name", "Type", "Parameters", "Size", "Load",
    );
    println!("  {}", "-".repeat(86));
    for (i, layer) in def.layers.iter().enumerate() {
        let file = layer.spec.params_file().unwrap_or("-");
        let size = if sizes[i] == 0 {
            "-".to_string()
        } else {
            format!("{:.1} KB", sizes[i] as f64 / 1024.0)
        };
        let load = match (layer.spec.params_file(), plan.is_eager(i)) {
            (None, _) => "-",
            (Some(_), true) => "eager",
            (Some(_), false) => "lazy",
        };
        println!(
            "  {:<4} {:<20} {:<16} {:<24} {:>10} {:>6}",
            i,
            truncate(&layer.name, 20),
            layer.spec.kind().as_str(),
            truncate(file, 24),
            size,
            load,
        );
    }
    println!();

    println!("  Load plan:");
    println!("   Budget:   {budget}");
    println!(
        "   Resident: {:.1} MB across {} eager layer(s)",
        plan.resident_bytes() as f64 / (1024.0 * 1024.0),
        plan.num_eager(),
    );
    println!();

    // ── Configuration notes ────────────────────────────────────
    let mut notes = Vec::new();
    for layer in &def.layers {
        if let LayerSpec::Lrn(spec) = &layer.spec {
            if !spec.is_across_channels() {
                notes.push(format!(
                    "{}: norm_region '{}' computes an all-zero output",
                    layer.name, spec.norm_region,
                ));
            }
        }
    }
    if !def.execution_mode.is_parallel() && def.auto_tuning {
        notes.push("auto_tuning is on but sequential mode never tunes".to_string());
    }
    if !notes.is_empty() {
        println!("  Notes:");
        for note in &notes {
            println!("   - {note}");
        }
        println!();
    }

    Ok(())
}

/// Truncates a string to `max_len` with ellipsis if needed.
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
