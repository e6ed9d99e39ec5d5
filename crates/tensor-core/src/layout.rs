// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Channel-innermost vector packing for the SIMD compute backend.
//!
//! The backend consumes tensors whose channel dimension is padded to a
//! multiple of the vector width so every dot product reads whole
//! vectors. With grouped convolutions the padding is applied per group
//! slice: channel counts round up to `vector_width * group` and the zero
//! tail sits at the end of each group's slice, never spanning a group
//! boundary. Packed images are laid out `[h][w][c_pad]` (channel
//! innermost); packed filters `[n_pad][h_k][w_k][c_k_pad]`.

use crate::Tensor4;

/// Rounds `real` up to the next multiple of `vector_width * group`.
///
/// The result divided by `group` is each group slice's padded width, so
/// the per-slice zero tail is `(padded - real) / group` wide.
pub fn padded_channels(real: usize, vector_width: usize, group: usize) -> usize {
    let step = vector_width * group;
    match real % step {
        0 => real,
        rem => real + step - rem,
    }
}

/// Packs one `(c, h, w)` image slice into `[h][w][c_pad]`.
///
/// `image` is the contiguous `(c, h, w)` region of one batch item.
/// Positions belonging to a group's zero tail stay `0.0`.
pub fn pack_image(
    image: &[f32],
    c: usize,
    h: usize,
    w: usize,
    c_pad: usize,
    group: usize,
) -> Vec<f32> {
    debug_assert_eq!(c % group, 0);
    debug_assert_eq!(c_pad % group, 0);
    let per = c_pad / group;
    let real_per = c / group;
    let plane = h * w;
    let mut packed = vec![0.0f32; plane * c_pad];
    for i in 0..c_pad {
        let g = i / per;
        let pos = i - g * per;
        if pos >= real_per {
            continue;
        }
        let src = (g * real_per + pos) * plane;
        for j in 0..h {
            for k in 0..w {
                packed[j * w * c_pad + k * c_pad + i] = image[src + j * w + k];
            }
        }
    }
    packed
}

/// Packs `(n_k, c_k, h_k, w_k)` filter weights into
/// `[n_pad][h_k][w_k][c_k_pad]` with zeroed pad channels and filters.
///
/// `n_pad` must come from [`padded_channels`] over the output vector
/// width and group; `c_k_pad` from the input vector width with group 1
/// (the weight tensor's channel extent is already one group slice).
pub fn pack_filters(weights: &Tensor4, n_pad: usize, c_k_pad: usize, group: usize) -> Vec<f32> {
    let (n_k, c_k, h_k, w_k) = weights.dims();
    debug_assert_eq!(n_k % group, 0);
    debug_assert_eq!(n_pad % group, 0);
    let per = n_pad / group;
    let real_per = n_k / group;
    let filter_len = h_k * w_k * c_k_pad;
    let mut packed = vec![0.0f32; n_pad * filter_len];
    for i in 0..n_pad {
        let g = i / per;
        let pos = i - g * per;
        if pos >= real_per {
            continue;
        }
        let src_f = g * real_per + pos;
        for kh in 0..h_k {
            for kw in 0..w_k {
                for ch in 0..c_k {
                    packed[i * filter_len + kh * w_k * c_k_pad + kw * c_k_pad + ch] =
                        weights.at(src_f, ch, kh, kw);
                }
            }
        }
    }
    packed
}

/// Pads a bias vector to `n_pad` entries, group-aware, zeros in the tail
/// of each group slice.
pub fn pack_bias(bias: &[f32], n_pad: usize, group: usize) -> Vec<f32> {
    debug_assert_eq!(bias.len() % group, 0);
    let per = n_pad / group;
    let real_per = bias.len() / group;
    let mut packed = vec![0.0f32; n_pad];
    for i in 0..n_pad {
        let g = i / per;
        let pos = i - g * per;
        if pos < real_per {
            packed[i] = bias[g * real_per + pos];
        }
    }
    packed
}

/// Pads one flat row to `c_pad` entries (fully-connected input packing).
pub fn pad_row(row: &[f32], c_pad: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; c_pad];
    out[..row.len()].copy_from_slice(row);
    out
}

/// Unpacks a backend output `[h_o][w_o][n_pad]` back into the planar
/// `(c_real, h_o, w_o)` layout, skipping pad channels.
///
/// When `relu` is set, negative values clamp to zero on the way out (the
/// fused nonlinearity applied during unpacking).
pub fn unpack_image(
    packed: &[f32],
    h_o: usize,
    w_o: usize,
    n_pad: usize,
    c_real: usize,
    group: usize,
    relu: bool,
) -> Vec<f32> {
    debug_assert_eq!(c_real % group, 0);
    let per = n_pad / group;
    let real_per = c_real / group;
    let plane = h_o * w_o;
    let mut out = vec![0.0f32; c_real * plane];
    for i in 0..n_pad {
        let g = i / per;
        let pos = i - g * per;
        if pos >= real_per {
            continue;
        }
        let dst = (g * real_per + pos) * plane;
        for j in 0..h_o {
            for k in 0..w_o {
                let mut v = packed[j * w_o * n_pad + k * n_pad + i];
                if relu && v < 0.0 {
                    v = 0.0;
                }
                out[dst + j * w_o + k] = v;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tensor4;

    #[test]
    fn test_padded_channels_rounding() {
        assert_eq!(padded_channels(3, 4, 1), 4);
        assert_eq!(padded_channels(8, 4, 1), 8);
        assert_eq!(padded_channels(8, 8, 1), 8);
        assert_eq!(padded_channels(96, 4, 2), 96);
        // 10 channels, width 4, 2 groups: step 8 -> 16 (3 zeros per slice)
        assert_eq!(padded_channels(10, 4, 2), 16);
    }

    #[test]
    fn test_pack_unpack_identity_on_real_channels() {
        let c = 3;
        let (h, w) = (2, 2);
        let image: Vec<f32> = (0..c * h * w).map(|v| v as f32 + 1.0).collect();
        let c_pad = padded_channels(c, 4, 1);
        let packed = pack_image(&image, c, h, w, c_pad, 1);
        let back = unpack_image(&packed, h, w, c_pad, c, 1, false);
        assert_eq!(back, image);
    }

    #[test]
    fn test_pack_image_pad_positions_are_zero() {
        let image = vec![1.0f32; 3 * 4];
        let c_pad = padded_channels(3, 4, 1);
        let packed = pack_image(&image, 3, 2, 2, c_pad, 1);
        // channel innermost: index 3 of every pixel is the pad channel
        for px in 0..4 {
            assert_eq!(packed[px * c_pad + 3], 0.0);
        }
    }

    #[test]
    fn test_pack_image_grouped_padding_stays_inside_each_slice() {
        // 6 real channels, 2 groups, width 4 -> c_pad 8, slices of 4
        // holding 3 real channels each
        let c = 6;
        let (h, w) = (1, 1);
        let image: Vec<f32> = (1..=6).map(|v| v as f32).collect();
        let c_pad = padded_channels(c, 4, 2);
        assert_eq!(c_pad, 8);
        let packed = pack_image(&image, c, h, w, c_pad, 2);
        // group 0 slice: channels 1..3 then a zero; group 1: 4..6 then a zero
        assert_eq!(packed, vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0]);
        let back = unpack_image(&packed, h, w, c_pad, c, 2, false);
        assert_eq!(back, image);
    }

    #[test]
    fn test_pack_filters_zero_tails() {
        // 2 filters of (1, 1, 1), padded to 4 output slots
        let weights = Tensor4::from_vec(2, 1, 1, 1, vec![5.0, 7.0]).unwrap();
        let packed = pack_filters(&weights, 4, 4, 1);
        assert_eq!(packed.len(), 16);
        assert_eq!(packed[0], 5.0);
        assert_eq!(packed[4], 7.0);
        // filters 2 and 3 are zero padding
        assert!(packed[8..].iter().all(|&v| v == 0.0));
        // pad channels of real filters are zero too
        assert!(packed[1..4].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_pack_bias_grouped() {
        let packed = pack_bias(&[1.0, 2.0, 3.0, 4.0], 8, 2);
        assert_eq!(packed, vec![1.0, 2.0, 0.0, 0.0, 3.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unpack_applies_relu_clamp() {
        let packed = vec![-1.0f32, 2.0, -3.0, 4.0];
        let out = unpack_image(&packed, 1, 1, 4, 4, 1, true);
        assert_eq!(out, vec![0.0, 2.0, 0.0, 4.0]);
    }

    #[test]
    fn test_pad_row() {
        assert_eq!(pad_row(&[1.0, 2.0], 4), vec![1.0, 2.0, 0.0, 0.0]);
    }
}
