// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # cnn-rt
//!
//! Command-line interface for the mobile-cnn-rt inference runtime.
//!
//! ## Usage
//! ```bash
//! # Run a forward pass
//! cnn-rt run --network ./networks/alexnet --input image.safetensors
//!
//! # Inspect a network: layers, parameter sizes, load plan
//! cnn-rt inspect --network ./networks/alexnet
//!
//! # Warm the auto-tuner and print the persisted choices
//! cnn-rt tune --network ./networks/alexnet --shape 3,227,227
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cnn-rt",
    about = "On-device CNN inference runtime",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a forward pass through a network.
    Run {
        /// Directory holding network.json and its parameter files.
        #[arg(short, long)]
        network: std::path::PathBuf,

        /// Tuning-record directory (defaults to <network>/tuning).
        #[arg(long)]
        tuning_dir: Option<std::path::PathBuf>,

        /// SafeTensors file with a rank-4 F32 tensor named "data".
        /// Without it a synthetic ramp input is generated from --shape.
        #[arg(short, long)]
        input: Option<std::path::PathBuf>,

        /// Synthetic input shape as "channels,height,width".
        #[arg(long, default_value = "3,227,227")]
        shape: String,

        /// Synthetic batch size.
        #[arg(long, default_value_t = 1)]
        batch: usize,

        /// Print the per-layer timing breakdown.
        #[arg(short, long)]
        profile: bool,
    },

    /// Inspect a network: layer table, parameter sizes, load plan.
    Inspect {
        /// Directory holding network.json and its parameter files.
        #[arg(short, long)]
        network: std::path::PathBuf,
    },

    /// Run warm-up passes so every layer tunes and persists its choice.
    Tune {
        /// Directory holding network.json and its parameter files.
        #[arg(short, long)]
        network: std::path::PathBuf,

        /// Tuning-record directory (defaults to <network>/tuning).
        #[arg(long)]
        tuning_dir: Option<std::path::PathBuf>,

        /// Synthetic input shape as "channels,height,width".
        #[arg(long, default_value = "3,227,227")]
        shape: String,

        /// Number of warm-up forward passes.
        #[arg(long, default_value_t = 2)]
        passes: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            network,
            tuning_dir,
            input,
            shape,
            batch,
            profile,
        } => commands::run::execute(network, tuning_dir, input, shape, batch, profile),
        Commands::Inspect { network } => commands::inspect::execute(network),
        Commands::Tune {
            network,
            tuning_dir,
            shape,
            passes,
        } => commands::tune::execute(network, tuning_dir, shape, passes),
    }
}
