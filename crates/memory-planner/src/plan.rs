// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Eager/lazy parameter load planning.

use crate::MemoryBudget;

/// Which layers load parameters eagerly at construction.
///
/// Greedy by decreasing file size: the biggest blobs that fit the
/// budget stay resident, everything else reloads lazily per call. Ties
/// keep descriptor order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    eager: Vec<bool>,
    resident_bytes: u64,
}

impl LoadPlan {
    /// Plans eager loads for parameter files of the given sizes (in
    /// descriptor order; zero means the layer has no parameters).
    pub fn plan(sizes: &[u64], budget: MemoryBudget) -> Self {
        // stable sort keeps descriptor order among equal sizes
        let mut order: Vec<usize> = (0..sizes.len()).collect();
        order.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]));

        let mut eager = vec![false; sizes.len()];
        let mut remaining = budget.bytes();
        for i in order {
            if sizes[i] == 0 {
                continue;
            }
            if sizes[i] <= remaining {
                eager[i] = true;
                remaining -= sizes[i];
            }
        }
        let resident_bytes = budget.bytes() - remaining;

        tracing::debug!(
            resident = resident_bytes,
            budget = budget.bytes(),
            eager = eager.iter().filter(|&&e| e).count(),
            total = sizes.len(),
            "parameter load plan",
        );

        Self {
            eager,
            resident_bytes,
        }
    }

    /// Whether layer `i` (descriptor order) loads at construction.
    pub fn is_eager(&self, i: usize) -> bool {
        self.eager[i]
    }

    pub fn eager_flags(&self) -> &[bool] {
        &self.eager
    }

    /// Bytes kept resident under the plan.
    pub fn resident_bytes(&self) -> u64 {
        self.resident_bytes
    }

    pub fn num_eager(&self) -> usize {
        self.eager.iter().filter(|&&e| e).count()
    }
}
