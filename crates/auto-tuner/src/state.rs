// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tuning state owned by each layer, and the pure selection rule.

use std::time::Duration;

/// A layer's tuning state.
///
/// Constructed from the persisted record at layer build time; flips to
/// [`TuningState::Tuned`] exactly once, after the first tuning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuningState<C> {
    /// A valid persisted or freshly measured choice.
    Tuned(C),
    /// Nothing persisted, or the persisted token was invalid.
    NeedsTuning,
}

impl<C: Copy> TuningState<C> {
    /// Builds the state from an optional persisted token. Any token the
    /// parser rejects counts as absent.
    pub fn from_stored(token: Option<&str>, parse: impl Fn(&str) -> Option<C>) -> Self {
        match token.and_then(|t| parse(t.trim())) {
            Some(choice) => TuningState::Tuned(choice),
            None => TuningState::NeedsTuning,
        }
    }

    pub fn choice(&self) -> Option<C> {
        match self {
            TuningState::Tuned(c) => Some(*c),
            TuningState::NeedsTuning => None,
        }
    }

    pub fn needs_tuning(&self) -> bool {
        matches!(self, TuningState::NeedsTuning)
    }
}

/// Index of the minimum cumulative timing. Ties break toward the
/// lowest-indexed candidate.
///
/// # Panics
/// Panics when `timings` is empty; candidate sets are compile-time
/// constants and never empty.
pub fn select_best(timings: &[Duration]) -> usize {
    let mut best = 0;
    for (i, t) in timings.iter().enumerate().skip(1) {
        if *t < timings[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_best_minimum() {
        let t = [
            Duration::from_micros(30),
            Duration::from_micros(10),
            Duration::from_micros(20),
        ];
        assert_eq!(select_best(&t), 1);
    }

    #[test]
    fn test_select_best_tie_takes_lowest_index() {
        let t = [
            Duration::from_micros(10),
            Duration::from_micros(10),
            Duration::from_micros(10),
        ];
        assert_eq!(select_best(&t), 0);
        let t = [
            Duration::from_micros(20),
            Duration::from_micros(10),
            Duration::from_micros(10),
        ];
        assert_eq!(select_best(&t), 1);
    }

    #[test]
    fn test_state_from_stored() {
        let parse = |s: &str| if s == "ok" { Some(7u32) } else { None };
        assert_eq!(
            TuningState::from_stored(Some("ok"), parse),
            TuningState::Tuned(7)
        );
        assert_eq!(
            TuningState::from_stored(Some(" ok \n"), parse),
            TuningState::Tuned(7)
        );
        assert_eq!(
            TuningState::<u32>::from_stored(Some("bogus"), parse),
            TuningState::NeedsTuning
        );
        assert_eq!(
            TuningState::<u32>::from_stored(None, parse),
            TuningState::NeedsTuning
        );
    }
}
