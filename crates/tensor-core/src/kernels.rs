// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scalar numeric kernels shared by the layer engines.
//!
//! These functions define the engine's numeric semantics; every layer
//! engine (sequential or parallel) reduces to them or to the packed
//! equivalents in the compute backend. Padding is virtual throughout:
//! callers pass unpadded buffers plus the pad amounts, and coordinates
//! live in the padded frame `[0, dim + 2*pad)`.

/// Output spatial size shared by convolution and pooling:
/// `ceil((in + 2*pad - kernel) / stride) + 1`.
///
/// The division is genuine floating point followed by `ceil`, so
/// non-integer quotients round up. A 7-wide input with a 3-wide kernel
/// and stride 2 gives `ceil(4/2) + 1 = 3`.
pub fn conv_output_dim(input: usize, pad: usize, kernel: usize, stride: usize) -> usize {
    (((input + 2 * pad - kernel) as f64 / stride as f64).ceil() as usize) + 1
}

/// Accumulates one kernel cube against the window anchored at `(x, y)`
/// of a virtually padded image slice.
///
/// `image` is one group slice laid out `[channels][h_i][w_i]`; `kernel`
/// is the matching cube `[channels][h_k][w_k]`. Probe coordinates that
/// fall outside `[pad, pad + dim)` contribute zero. Bias is added by the
/// caller.
pub fn conv_accumulate(
    image: &[f32],
    channels: usize,
    h_i: usize,
    w_i: usize,
    kernel: &[f32],
    h_k: usize,
    w_k: usize,
    x: usize,
    y: usize,
    pad_h: usize,
    pad_w: usize,
) -> f32 {
    let mut sum = 0.0f32;
    for c in 0..channels {
        let img_plane = &image[c * h_i * w_i..(c + 1) * h_i * w_i];
        let ker_plane = &kernel[c * h_k * w_k..(c + 1) * h_k * w_k];
        for kh in 0..h_k {
            let cur_x = x + kh;
            if cur_x < pad_h || cur_x >= pad_h + h_i {
                continue;
            }
            for kw in 0..w_k {
                let cur_y = y + kw;
                if cur_y < pad_w || cur_y >= pad_w + w_i {
                    continue;
                }
                sum += img_plane[(cur_x - pad_h) * w_i + (cur_y - pad_w)]
                    * ker_plane[kh * w_k + kw];
            }
        }
    }
    sum
}

/// Max over the window `[x_l, x_h) x [y_l, y_h)` of one virtually padded
/// `(h_i, w_i)` plane.
///
/// High bounds are clamped to `dim + 2*pad`. Pad cells compare as
/// literal `0.0`, so a window of all-negative real values reports `0.0`
/// whenever a pad cell is in range.
#[allow(clippy::too_many_arguments)]
pub fn pool_max(
    plane: &[f32],
    h_i: usize,
    w_i: usize,
    pad_h: usize,
    pad_w: usize,
    x_l: usize,
    x_h: usize,
    y_l: usize,
    y_h: usize,
) -> f32 {
    let x_h = x_h.min(h_i + 2 * pad_h);
    let y_h = y_h.min(w_i + 2 * pad_w);
    let in_frame = |x: usize, y: usize| {
        x >= pad_h && x < h_i + pad_h && y >= pad_w && y < w_i + pad_w
    };
    let mut max = if in_frame(x_l, y_l) {
        plane[(x_l - pad_h) * w_i + (y_l - pad_w)]
    } else {
        0.0
    };
    for x in x_l..x_h {
        for y in y_l..y_h {
            let v = if in_frame(x, y) {
                plane[(x - pad_h) * w_i + (y - pad_w)]
            } else {
                0.0
            };
            if v > max {
                max = v;
            }
        }
    }
    max
}

/// Padded-average over the window `[x_l, x_h) x [y_l, y_h)`.
///
/// Sums only real cells, but divides by the FULL clamped window area, so
/// pad cells dilute the average. Mirrors [`pool_max`]'s clamping; a
/// window that starts past the clamped edge is empty and reports 0.0.
#[allow(clippy::too_many_arguments)]
pub fn pool_mean(
    plane: &[f32],
    h_i: usize,
    w_i: usize,
    pad_h: usize,
    pad_w: usize,
    x_l: usize,
    x_h: usize,
    y_l: usize,
    y_h: usize,
) -> f32 {
    let x_h = x_h.min(h_i + 2 * pad_h);
    let y_h = y_h.min(w_i + 2 * pad_w);
    // a large stride can push the window start past the clamped edge;
    // such a window is empty and reports 0.0, like pool_max
    let area = x_h.saturating_sub(x_l) * y_h.saturating_sub(y_l);
    if area == 0 {
        return 0.0;
    }
    let mut sum = 0.0f32;
    for x in x_l..x_h {
        if x < pad_h || x >= h_i + pad_h {
            continue;
        }
        for y in y_l..y_h {
            if y < pad_w || y >= w_i + pad_w {
                continue;
            }
            sum += plane[(x - pad_h) * w_i + (y - pad_w)];
        }
    }
    sum / area as f32
}

/// Flat dot product of an input row against one weight row.
pub fn inner_product(row: &[f32], weights: &[f32]) -> f32 {
    debug_assert_eq!(row.len(), weights.len());
    row.iter().zip(weights).map(|(a, b)| a * b).sum()
}

/// Exponentiation base used by [`averaged_exp`]. The truncated literal
/// is load-bearing: downstream consumers were calibrated against it.
pub const EXP_BASE: f64 = 2.71828;

/// Per-row exp-normalize: `base^x / sum(base^x)` with [`EXP_BASE`].
/// No max-subtraction is performed.
pub fn averaged_exp(row: &[f32]) -> Vec<f32> {
    let mut out: Vec<f32> = row
        .iter()
        .map(|&v| EXP_BASE.powf(v as f64) as f32)
        .collect();
    let total: f32 = out.iter().sum();
    for v in &mut out {
        *v /= total;
    }
    out
}

/// Per-pixel sum of `value^p` across channels `[c_lo, c_hi)` of one
/// `(channels, h, w)` image slice. Returns an `(h, w)` plane.
pub fn channel_power_sum(
    image: &[f32],
    h: usize,
    w: usize,
    c_lo: usize,
    c_hi: usize,
    p: f64,
) -> Vec<f32> {
    let plane = h * w;
    let mut out = vec![0.0f32; plane];
    for c in c_lo..c_hi {
        let src = &image[c * plane..(c + 1) * plane];
        for (acc, &v) in out.iter_mut().zip(src) {
            *acc += (v as f64).powf(p) as f32;
        }
    }
    out
}

/// Like [`channel_power_sum`] but divided by the channel count.
pub fn channel_power_mean(
    image: &[f32],
    h: usize,
    w: usize,
    c_lo: usize,
    c_hi: usize,
    p: f64,
) -> Vec<f32> {
    let count = (c_hi - c_lo) as f32;
    let mut out = channel_power_sum(image, h, w, c_lo, c_hi, p);
    for v in &mut out {
        *v /= count;
    }
    out
}

/// Indices of `row` sorted by value, highest first. Stable: equal values
/// keep their original order, so the earliest-occurring maximum ranks
/// first.
pub fn argsort_descending(row: &[f32]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..row.len()).collect();
    idx.sort_by(|&a, &b| {
        row[b]
            .partial_cmp(&row[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    idx
}

/// Whether `label` ranks among the first `k` entries of a descending
/// ranking produced by [`argsort_descending`].
pub fn top_k_match(ranking: &[usize], label: usize, k: usize) -> bool {
    ranking[..k.min(ranking.len())].contains(&label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_output_dim_exact_quotient() {
        // 8 wide, 3x3 kernel, pad 1, stride 1 -> 8
        assert_eq!(conv_output_dim(8, 1, 3, 1), 8);
        // 8 wide, 2x2 kernel, no pad, stride 2 -> ceil(6/2) + 1 = 4
        assert_eq!(conv_output_dim(8, 0, 2, 2), 4);
    }

    #[test]
    fn test_output_dim_rounds_up_on_fractional_quotient() {
        // ceil(4/2) + 1 = 3
        assert_eq!(conv_output_dim(7, 0, 3, 2), 3);
        // ceil(5/3) + 1 = 2 + 1 = 3, where floor would give 2
        assert_eq!(conv_output_dim(8, 0, 3, 3), 3);
    }

    #[test]
    fn test_conv_accumulate_interior() {
        // 1 channel, 3x3 image of ones, 3x3 kernel of ones, pad 1.
        let image = vec![1.0f32; 9];
        let kernel = vec![1.0f32; 9];
        // window anchored at (1, 1) covers the whole real image
        let v = conv_accumulate(&image, 1, 3, 3, &kernel, 3, 3, 1, 1, 1, 1);
        assert!(approx_eq(v, 9.0, 1e-6));
        // corner anchor (0, 0): only 4 taps land inside
        let v = conv_accumulate(&image, 1, 3, 3, &kernel, 3, 3, 0, 0, 1, 1);
        assert!(approx_eq(v, 4.0, 1e-6));
    }

    #[test]
    fn test_conv_accumulate_multi_channel() {
        // 2 channels; kernel weights differ per channel
        let image = vec![
            1.0, 2.0, //
            3.0, 4.0, // channel 0 (2x2)
            5.0, 6.0, //
            7.0, 8.0, // channel 1
        ];
        let kernel = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0];
        // no padding, 2x2 kernel over the whole frame
        let v = conv_accumulate(&image, 2, 2, 2, &kernel, 2, 2, 0, 0, 0, 0);
        // 1*1 + 2*8 = 17
        assert!(approx_eq(v, 17.0, 1e-6));
    }

    #[test]
    fn test_pool_max_all_negative_with_pad_reports_zero() {
        let plane = vec![-1.0f32, -2.0, -3.0, -4.0];
        // 2x2 plane, pad 1: window [0,2)x[0,2) includes pad cells
        let v = pool_max(&plane, 2, 2, 1, 1, 0, 2, 0, 2);
        assert_eq!(v, 0.0);
        // no pad: true max of the real cells
        let v = pool_max(&plane, 2, 2, 0, 0, 0, 2, 0, 2);
        assert_eq!(v, -1.0);
    }

    #[test]
    fn test_pool_max_clamps_high_bounds() {
        let plane = vec![1.0f32, 5.0, 2.0, 3.0];
        // window nominally [1,4)x[1,4) clamps to [1,2)x[1,2)
        let v = pool_max(&plane, 2, 2, 0, 0, 1, 4, 1, 4);
        assert_eq!(v, 3.0);
    }

    #[test]
    fn test_pool_mean_divides_by_full_window_area() {
        let plane = vec![2.0f32, 2.0, 2.0, 2.0];
        // 2x2 plane, pad 1; window [0,3)x[0,3) holds 4 real cells of 2.0
        // over a 9-cell area
        let v = pool_mean(&plane, 2, 2, 1, 1, 0, 3, 0, 3);
        assert!(approx_eq(v, 8.0 / 9.0, 1e-6));
    }

    #[test]
    fn test_pool_mean_divisor_uses_clamped_bounds() {
        let plane = vec![4.0f32, 4.0, 4.0, 4.0];
        // nominal window [1,4)x[1,4) straddles the edge; clamps to
        // [1,2)x[1,2): one real cell over a 1-cell area
        let v = pool_mean(&plane, 2, 2, 0, 0, 1, 4, 1, 4);
        assert!(approx_eq(v, 4.0, 1e-6));
    }

    #[test]
    fn test_pool_mean_window_past_clamped_edge_is_zero() {
        let plane = vec![4.0f32, 4.0, 4.0, 4.0];
        // a stride larger than the plane can start a window at 4 while
        // the high bound clamps to 2; the empty window must not divide
        // by a wrapped area
        let v = pool_mean(&plane, 2, 2, 0, 0, 4, 5, 0, 1);
        assert_eq!(v, 0.0);
        let v = pool_mean(&plane, 2, 2, 0, 0, 0, 1, 4, 5);
        assert_eq!(v, 0.0);
    }

    #[test]
    fn test_inner_product() {
        let v = inner_product(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert!(approx_eq(v, 32.0, 1e-6));
    }

    #[test]
    fn test_averaged_exp_sums_to_one() {
        let out = averaged_exp(&[0.1, 0.5, 0.9]);
        let sum: f32 = out.iter().sum();
        assert!(approx_eq(sum, 1.0, 1e-6));
        assert!(out[2] > out[1] && out[1] > out[0]);
    }

    #[test]
    fn test_averaged_exp_uses_truncated_base() {
        let out = averaged_exp(&[1.0, 0.0]);
        // 2.71828 / (2.71828 + 1)
        let expected = (EXP_BASE / (EXP_BASE + 1.0)) as f32;
        assert!(approx_eq(out[0], expected, 1e-6));
    }

    #[test]
    fn test_channel_power_sum_and_mean() {
        // 3 channels of a 1x2 plane
        let image = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        let sum = channel_power_sum(&image, 1, 2, 0, 3, 2.0);
        assert!(approx_eq(sum[0], 1.0 + 9.0 + 25.0, 1e-5));
        assert!(approx_eq(sum[1], 4.0 + 16.0 + 36.0, 1e-5));
        let mean = channel_power_mean(&image, 1, 2, 0, 3, 2.0);
        assert!(approx_eq(mean[0], 35.0 / 3.0, 1e-5));
    }

    #[test]
    fn test_argsort_descending_basic() {
        assert_eq!(argsort_descending(&[0.1, 0.9, 0.5]), vec![1, 2, 0]);
    }

    #[test]
    fn test_argsort_descending_ties_keep_earliest_first() {
        assert_eq!(argsort_descending(&[0.5, 0.5, 0.1]), vec![0, 1, 2]);
        assert_eq!(argsort_descending(&[0.1, 0.5, 0.5]), vec![1, 2, 0]);
    }

    #[test]
    fn test_top_k_match() {
        let ranking = argsort_descending(&[0.1, 0.9, 0.5, 0.2]);
        assert!(top_k_match(&ranking, 1, 1));
        assert!(!top_k_match(&ranking, 2, 1));
        assert!(top_k_match(&ranking, 2, 2));
        // k larger than the row is clamped
        assert!(top_k_match(&ranking, 0, 10));
    }
}
