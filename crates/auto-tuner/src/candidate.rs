// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tuning candidate vocabularies.
//!
//! Each candidate renders to a single persistable token and parses back
//! from one; a token outside the candidate set is invalid and callers
//! treat it as "never tuned".

/// Vector-layout variant for the convolution backend kernel, named by
/// input vector width x output vector width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvVariant {
    F4F1,
    F4F2,
    F4F4,
    F4F8,
    F8F1,
    F8F2,
    F8F4,
    F8F8,
}

impl ConvVariant {
    /// The four input-width-4 variants, benchmarked for narrow inputs
    /// (fewer than five channels).
    pub const NARROW: [ConvVariant; 4] = [
        ConvVariant::F4F1,
        ConvVariant::F4F2,
        ConvVariant::F4F4,
        ConvVariant::F4F8,
    ];

    /// The four input-width-8 variants, benchmarked otherwise.
    pub const WIDE: [ConvVariant; 4] = [
        ConvVariant::F8F1,
        ConvVariant::F8F2,
        ConvVariant::F8F4,
        ConvVariant::F8F8,
    ];

    /// Fallback when tuning is disabled and no persisted choice exists.
    pub const DEFAULT: ConvVariant = ConvVariant::F4F2;

    /// The variant the one-shot tuning compute itself uses (the widest
    /// input/output combination), independent of which variant wins.
    pub const TUNING_COMPUTE: ConvVariant = ConvVariant::F4F8;

    pub fn token(self) -> &'static str {
        match self {
            ConvVariant::F4F1 => "F4F1",
            ConvVariant::F4F2 => "F4F2",
            ConvVariant::F4F4 => "F4F4",
            ConvVariant::F4F8 => "F4F8",
            ConvVariant::F8F1 => "F8F1",
            ConvVariant::F8F2 => "F8F2",
            ConvVariant::F8F4 => "F8F4",
            ConvVariant::F8F8 => "F8F8",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "F4F1" => Some(ConvVariant::F4F1),
            "F4F2" => Some(ConvVariant::F4F2),
            "F4F4" => Some(ConvVariant::F4F4),
            "F4F8" => Some(ConvVariant::F4F8),
            "F8F1" => Some(ConvVariant::F8F1),
            "F8F2" => Some(ConvVariant::F8F2),
            "F8F4" => Some(ConvVariant::F8F4),
            "F8F8" => Some(ConvVariant::F8F8),
            _ => None,
        }
    }

    /// Input vector width (channels per packed lane).
    pub fn input_width(self) -> usize {
        match self {
            ConvVariant::F4F1 | ConvVariant::F4F2 | ConvVariant::F4F4 | ConvVariant::F4F8 => 4,
            _ => 8,
        }
    }

    /// Output vector width (filters per packed lane).
    pub fn output_width(self) -> usize {
        match self {
            ConvVariant::F4F1 | ConvVariant::F8F1 => 1,
            ConvVariant::F4F2 | ConvVariant::F8F2 => 2,
            ConvVariant::F4F4 | ConvVariant::F8F4 => 4,
            ConvVariant::F4F8 | ConvVariant::F8F8 => 8,
        }
    }
}

/// Vector-layout variant for the fully-connected backend kernel. Output
/// width is fixed at one; only the input width varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FcVariant {
    F4F1,
    F8F1,
}

impl FcVariant {
    pub const ALL: [FcVariant; 2] = [FcVariant::F4F1, FcVariant::F8F1];

    /// Fallback when tuning is disabled and no persisted choice exists.
    pub const DEFAULT: FcVariant = FcVariant::F4F1;

    /// The variant the one-shot tuning compute itself uses (the widest
    /// input width), independent of which variant wins.
    pub const TUNING_COMPUTE: FcVariant = FcVariant::F8F1;

    pub fn token(self) -> &'static str {
        match self {
            FcVariant::F4F1 => "F4F1",
            FcVariant::F8F1 => "F8F1",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "F4F1" => Some(FcVariant::F4F1),
            "F8F1" => Some(FcVariant::F8F1),
            _ => None,
        }
    }

    pub fn input_width(self) -> usize {
        match self {
            FcVariant::F4F1 => 4,
            FcVariant::F8F1 => 8,
        }
    }
}

/// Worker thread count used to channel-partition pooling and
/// normalization layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerCount(pub usize);

/// Thread count used when tuning is disabled and nothing is persisted.
pub const DEFAULT_WORKER_COUNT: WorkerCount = WorkerCount(4);

impl WorkerCount {
    pub const CANDIDATES: [WorkerCount; 3] = [WorkerCount(4), WorkerCount(6), WorkerCount(8)];

    pub fn token(self) -> String {
        self.0.to_string()
    }

    /// Parses a persisted token, accepting only the candidate set.
    pub fn from_token(s: &str) -> Option<Self> {
        let n: usize = s.parse().ok()?;
        Self::CANDIDATES.into_iter().find(|w| w.0 == n)
    }

    pub fn get(self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv_variant_token_round_trip() {
        for v in ConvVariant::NARROW.into_iter().chain(ConvVariant::WIDE) {
            assert_eq!(ConvVariant::from_token(v.token()), Some(v));
        }
        assert_eq!(ConvVariant::from_token("F16F1"), None);
    }

    #[test]
    fn test_conv_variant_widths() {
        assert_eq!(ConvVariant::F4F8.input_width(), 4);
        assert_eq!(ConvVariant::F4F8.output_width(), 8);
        assert_eq!(ConvVariant::F8F1.input_width(), 8);
        assert_eq!(ConvVariant::F8F1.output_width(), 1);
    }

    #[test]
    fn test_fc_variant_tokens() {
        assert_eq!(FcVariant::from_token("F8F1"), Some(FcVariant::F8F1));
        assert_eq!(FcVariant::from_token("F8F2"), None);
    }

    #[test]
    fn test_worker_count_rejects_off_candidate_values() {
        assert_eq!(WorkerCount::from_token("6"), Some(WorkerCount(6)));
        assert_eq!(WorkerCount::from_token("5"), None);
        assert_eq!(WorkerCount::from_token("six"), None);
    }
}
