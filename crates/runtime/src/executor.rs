// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Channel-partitioned worker dispatch.
//!
//! Pooling and normalization parallelize by splitting the channel axis
//! into contiguous slices, one worker per slice, one image at a time.
//! Workers borrow disjoint output regions; the scope join is the
//! barrier before the caller consumes the image's result.

/// The channel range worker `i` of `workers` covers, with
/// `chunk = ceil(channels / workers)`. Trailing workers can get an
/// empty range when channels don't fill every slot.
pub fn channel_range(channels: usize, workers: usize, i: usize) -> (usize, usize) {
    let chunk = channels.div_ceil(workers);
    let start = (i * chunk).min(channels);
    let end = ((i + 1) * chunk).min(channels);
    (start, end)
}

/// Runs `work` across `workers` scoped threads, each owning the output
/// region for a contiguous channel slice.
///
/// `out` must be `channels * plane_len` long, channel-major; `work`
/// receives `(c_start, c_end, out_slice)` where `out_slice` covers
/// exactly those channels. Returns only after every worker finished.
pub fn run_channel_partitioned<F>(
    workers: usize,
    channels: usize,
    plane_len: usize,
    out: &mut [f32],
    work: F,
) where
    F: Fn(usize, usize, &mut [f32]) + Sync,
{
    debug_assert_eq!(out.len(), channels * plane_len);
    let chunk = channels.div_ceil(workers);
    std::thread::scope(|scope| {
        for (i, slice) in out.chunks_mut(chunk * plane_len).enumerate() {
            let (start, end) = channel_range(channels, workers, i);
            if start >= end {
                continue;
            }
            let work = &work;
            scope.spawn(move || work(start, end, slice));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_range_even_split() {
        // 8 channels over 4 workers: 2 each
        assert_eq!(channel_range(8, 4, 0), (0, 2));
        assert_eq!(channel_range(8, 4, 3), (6, 8));
    }

    #[test]
    fn test_channel_range_uneven_split_clamps() {
        // 10 channels over 4 workers: chunk 3, last worker gets 1
        assert_eq!(channel_range(10, 4, 0), (0, 3));
        assert_eq!(channel_range(10, 4, 3), (9, 10));
        // 3 channels over 4 workers: worker 3 is empty
        assert_eq!(channel_range(3, 4, 3), (3, 3));
    }

    #[test]
    fn test_run_partitioned_covers_all_channels() {
        let channels = 10;
        let plane = 4;
        let mut out = vec![0.0f32; channels * plane];
        run_channel_partitioned(4, channels, plane, &mut out, |c0, c1, slice| {
            for c in c0..c1 {
                let local = (c - c0) * plane;
                for p in 0..plane {
                    slice[local + p] = (c * plane + p) as f32;
                }
            }
        });
        let expected: Vec<f32> = (0..channels * plane).map(|v| v as f32).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_run_partitioned_more_workers_than_channels() {
        let mut out = vec![0.0f32; 2 * 3];
        run_channel_partitioned(8, 2, 3, &mut out, |c0, c1, slice| {
            for c in c0..c1 {
                for p in 0..3 {
                    slice[(c - c0) * 3 + p] = 1.0;
                }
            }
        });
        assert!(out.iter().all(|&v| v == 1.0));
    }
}
