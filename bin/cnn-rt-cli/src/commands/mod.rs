// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared CLI helpers.

pub mod inspect;
pub mod run;
pub mod tune;

use tracing_subscriber::EnvFilter;

/// Initializes tracing from the `-v` count; `RUST_LOG` overrides.
pub fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Parses a "channels,height,width" shape argument.
pub fn parse_shape(s: &str) -> anyhow::Result<(usize, usize, usize)> {
    let parts: Vec<usize> = s
        .split(',')
        .map(|p| p.trim().parse())
        .collect::<Result<_, _>>()
        .map_err(|_| anyhow::anyhow!("invalid shape '{s}', expected 'channels,height,width'"))?;
    match parts.as_slice() {
        &[c, h, w] if c > 0 && h > 0 && w > 0 => Ok((c, h, w)),
        _ => Err(anyhow::anyhow!(
            "invalid shape '{s}', expected three positive integers"
        )),
    }
}

/// Builds a deterministic ramp-filled input batch for synthetic runs.
pub fn synthetic_input(
    batch: usize,
    c: usize,
    h: usize,
    w: usize,
) -> anyhow::Result<tensor_core::Tensor4> {
    let count = batch * c * h * w;
    let data = (0..count).map(|v| ((v % 255) as f32 / 255.0) - 0.5).collect();
    Ok(tensor_core::Tensor4::from_vec(batch, c, h, w, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shape() {
        assert_eq!(parse_shape("3,227,227").unwrap(), (3, 227, 227));
        assert_eq!(parse_shape(" 1, 8, 8 ").unwrap(), (1, 8, 8));
        assert!(parse_shape("3,227").is_err());
        assert!(parse_shape("3,0,227").is_err());
        assert!(parse_shape("a,b,c").is_err());
    }

    #[test]
    fn test_synthetic_input_shape() {
        let t = synthetic_input(2, 3, 4, 4).unwrap();
        assert_eq!(t.dims(), (2, 3, 4, 4));
    }
}
