// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory budget type.

use crate::PlannerError;

/// Hard ceiling on the parameter budget: 400 MB. Requests above this
/// are clamped, matching what low-end device memory realistically
/// tolerates for resident weights.
pub const MAX_PARAM_BYTES: u64 = 419_430_400;

/// A byte budget for eagerly resident layer parameters.
///
/// # Examples
/// ```
/// use memory_planner::MemoryBudget;
///
/// let b = MemoryBudget::parse("64M").unwrap();
/// assert_eq!(b.bytes(), 64 * 1024 * 1024);
/// assert_eq!(MemoryBudget::from_mb(1_000_000).bytes(),
///            memory_planner::MAX_PARAM_BYTES);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MemoryBudget {
    bytes: u64,
}

impl MemoryBudget {
    /// Budget from raw bytes, clamped to [`MAX_PARAM_BYTES`].
    pub fn from_bytes(bytes: u64) -> Self {
        Self {
            bytes: bytes.min(MAX_PARAM_BYTES),
        }
    }

    /// Budget from megabytes, clamped to [`MAX_PARAM_BYTES`].
    pub fn from_mb(mb: u64) -> Self {
        Self::from_bytes(mb.saturating_mul(1024 * 1024))
    }

    /// Parses a human-readable budget: `"64M"`, `"1G"`, `"512K"`, or a
    /// plain byte count.
    ///
    /// # Errors
    /// [`PlannerError::InvalidBudget`] on anything else.
    pub fn parse(s: &str) -> Result<Self, PlannerError> {
        let s = s.trim();
        let invalid = || PlannerError::InvalidBudget(s.to_string());
        if s.is_empty() {
            return Err(invalid());
        }
        let (digits, multiplier) = match s.as_bytes()[s.len() - 1].to_ascii_uppercase() {
            b'K' => (&s[..s.len() - 1], 1024u64),
            b'M' => (&s[..s.len() - 1], 1024 * 1024),
            b'G' => (&s[..s.len() - 1], 1024 * 1024 * 1024),
            _ => (s, 1),
        };
        let value: u64 = digits.trim().parse().map_err(|_| invalid())?;
        Ok(Self::from_bytes(value.saturating_mul(multiplier)))
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn mb(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0)
    }
}

impl std::fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1} MB", self.mb())
    }
}
