// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The vectorized compute backend boundary.
//!
//! Convolution and fully-connected layers hand the backend tensors
//! already packed into the channel-innermost vector layout (see
//! `tensor_core::layout`); the backend runs the dense arithmetic and
//! returns results in the same packed layout. Kernels are synchronous:
//! any overlap with host-side packing comes from the caller's
//! double-buffering, not from the backend.
//!
//! All padded counts travel in the geometry structs so a backend needs
//! no layout knowledge beyond the contract. [`CpuVectorBackend`] is the
//! reference implementation; a GPU-compute implementation would slot in
//! behind the same trait.

/// Geometry for one convolution dispatch. Every count is in elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvGeometry {
    /// Packed input channels: multiple of `in_vw * group`.
    pub c_pad: usize,
    pub h_i: usize,
    pub w_i: usize,
    /// Packed filter count: multiple of `out_vw * group`.
    pub n_pad: usize,
    /// Packed kernel channels (one group slice): multiple of `in_vw`.
    pub c_k_pad: usize,
    pub h_k: usize,
    pub w_k: usize,
    pub h_o: usize,
    pub w_o: usize,
    pub pad: (usize, usize),
    pub stride: (usize, usize),
    pub group: usize,
    pub in_vw: usize,
    pub out_vw: usize,
}

/// Geometry for one fully-connected dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FcGeometry {
    /// Packed row width: multiple of `in_vw`.
    pub c_pad: usize,
    /// Output neurons (bias length).
    pub n_out: usize,
    pub in_vw: usize,
}

/// Synchronous vectorized kernels over packed buffers.
pub trait ComputeBackend: Send + Sync {
    /// Convolves one packed `[h_i][w_i][c_pad]` image against packed
    /// `[n_pad][h_k][w_k][c_k_pad]` filters, producing a packed
    /// `[h_o][w_o][n_pad]` output with bias added. Probe coordinates
    /// outside the virtual pad frame contribute zero.
    fn conv_forward(
        &self,
        image: &[f32],
        filters: &[f32],
        bias: &[f32],
        geom: &ConvGeometry,
    ) -> Vec<f32>;

    /// Multiplies `n` packed input rows `[n][c_pad]` against packed
    /// weight rows `[n_out][c_pad]`, adding bias: output `[n][n_out]`.
    fn inner_product_forward(
        &self,
        rows: &[f32],
        n: usize,
        weights: &[f32],
        bias: &[f32],
        geom: &FcGeometry,
    ) -> Vec<f32>;
}

/// Reference CPU backend. Accumulates in vector-width chunks exactly as
/// a SIMD device kernel would, so pad lanes (always zero on both sides)
/// never perturb results.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuVectorBackend;

impl CpuVectorBackend {
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl ComputeBackend for CpuVectorBackend {
    fn conv_forward(
        &self,
        image: &[f32],
        filters: &[f32],
        bias: &[f32],
        geom: &ConvGeometry,
    ) -> Vec<f32> {
        let g = geom;
        debug_assert_eq!(g.c_pad, g.c_k_pad * g.group);
        debug_assert_eq!(image.len(), g.h_i * g.w_i * g.c_pad);
        let filter_len = g.h_k * g.w_k * g.c_k_pad;
        let chunks = g.c_k_pad / g.in_vw;
        let filters_per_group = g.n_pad / g.group;

        let mut out = vec![0.0f32; g.h_o * g.w_o * g.n_pad];
        for h_num in 0..g.h_o {
            for w_num in 0..g.w_o {
                let out_base = h_num * g.w_o * g.n_pad + w_num * g.n_pad;
                for f in 0..g.n_pad {
                    let channel_offset = (f / filters_per_group) * g.c_k_pad;
                    let mut sum = 0.0f32;
                    for kh in 0..g.h_k {
                        let cur_x = h_num * g.stride.0 + kh;
                        if cur_x < g.pad.0 || cur_x >= g.pad.0 + g.h_i {
                            continue;
                        }
                        for kw in 0..g.w_k {
                            let cur_y = w_num * g.stride.1 + kw;
                            if cur_y < g.pad.1 || cur_y >= g.pad.1 + g.w_i {
                                continue;
                            }
                            let in_base = (cur_x - g.pad.0) * g.w_i * g.c_pad
                                + (cur_y - g.pad.1) * g.c_pad
                                + channel_offset;
                            let k_base = f * filter_len
                                + kh * g.w_k * g.c_k_pad
                                + kw * g.c_k_pad;
                            for i in 0..chunks {
                                let lane = i * g.in_vw;
                                sum += dot(
                                    &image[in_base + lane..in_base + lane + g.in_vw],
                                    &filters[k_base + lane..k_base + lane + g.in_vw],
                                );
                            }
                        }
                    }
                    out[out_base + f] = sum + bias[f];
                }
            }
        }
        out
    }

    fn inner_product_forward(
        &self,
        rows: &[f32],
        n: usize,
        weights: &[f32],
        bias: &[f32],
        geom: &FcGeometry,
    ) -> Vec<f32> {
        let g = geom;
        debug_assert_eq!(rows.len(), n * g.c_pad);
        debug_assert_eq!(weights.len(), g.n_out * g.c_pad);
        let chunks = g.c_pad / g.in_vw;

        let mut out = vec![0.0f32; n * g.n_out];
        for row in 0..n {
            let row_base = row * g.c_pad;
            for j in 0..g.n_out {
                let w_base = j * g.c_pad;
                let mut sum = 0.0f32;
                for i in 0..chunks {
                    let lane = i * g.in_vw;
                    sum += dot(
                        &rows[row_base + lane..row_base + lane + g.in_vw],
                        &weights[w_base + lane..w_base + lane + g.in_vw],
                    );
                }
                out[row * g.n_out + j] = sum + bias[j];
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::{layout, Tensor4};

    fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_conv_forward_matches_scalar_kernel() {
        // 3-channel 4x4 image, 2 filters of 3x3, pad 1, stride 1
        let (c, h, w) = (3, 4, 4);
        let image_planar: Vec<f32> = (0..c * h * w).map(|v| (v as f32) * 0.1).collect();
        let weights = Tensor4::from_vec(
            2,
            c,
            3,
            3,
            (0..2 * c * 9).map(|v| ((v % 7) as f32) * 0.05).collect(),
        )
        .unwrap();
        let bias = vec![0.5, -0.25];

        let in_vw = 4;
        let out_vw = 2;
        let c_pad = layout::padded_channels(c, in_vw, 1);
        let n_pad = layout::padded_channels(2, out_vw, 1);
        let geom = ConvGeometry {
            c_pad,
            h_i: h,
            w_i: w,
            n_pad,
            c_k_pad: c_pad,
            h_k: 3,
            w_k: 3,
            h_o: 4,
            w_o: 4,
            pad: (1, 1),
            stride: (1, 1),
            group: 1,
            in_vw,
            out_vw,
        };

        let packed_image = layout::pack_image(&image_planar, c, h, w, c_pad, 1);
        let packed_filters = layout::pack_filters(&weights, n_pad, c_pad, 1);
        let packed_bias = layout::pack_bias(&bias, n_pad, 1);

        let backend = CpuVectorBackend::new();
        let packed_out = backend.conv_forward(&packed_image, &packed_filters, &packed_bias, &geom);
        let out = layout::unpack_image(&packed_out, 4, 4, n_pad, 2, 1, false);

        // compare against the scalar reference kernel
        for f in 0..2 {
            let cube = &weights.data()[f * c * 9..(f + 1) * c * 9];
            for x in 0..4 {
                for y in 0..4 {
                    let expected = tensor_core::kernels::conv_accumulate(
                        &image_planar,
                        c,
                        h,
                        w,
                        cube,
                        3,
                        3,
                        x,
                        y,
                        1,
                        1,
                    ) + bias[f];
                    let got = out[f * 16 + x * 4 + y];
                    assert!(
                        approx_eq(got, expected, 1e-5),
                        "filter {f} at ({x},{y}): {got} vs {expected}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_conv_forward_grouped_channel_offsets() {
        // 2 groups, 2 channels each; filters see only their group's slice
        let (c, h, w) = (4, 1, 1);
        let image_planar = vec![1.0, 2.0, 10.0, 20.0];
        // 2 filters (one per group), 1x1 kernels over 2 channels
        let weights = Tensor4::from_vec(2, 2, 1, 1, vec![1.0, 1.0, 1.0, 1.0]).unwrap();
        let bias = vec![0.0, 0.0];

        let in_vw = 4;
        let out_vw = 1;
        let group = 2;
        let c_pad = layout::padded_channels(c, in_vw, group); // 8
        let c_k_pad = layout::padded_channels(2, in_vw, 1); // 4
        let n_pad = layout::padded_channels(2, out_vw, group); // 2
        let geom = ConvGeometry {
            c_pad,
            h_i: h,
            w_i: w,
            n_pad,
            c_k_pad,
            h_k: 1,
            w_k: 1,
            h_o: 1,
            w_o: 1,
            pad: (0, 0),
            stride: (1, 1),
            group,
            in_vw,
            out_vw,
        };

        let packed_image = layout::pack_image(&image_planar, c, h, w, c_pad, group);
        let packed_filters = layout::pack_filters(&weights, n_pad, c_k_pad, group);
        let packed_bias = layout::pack_bias(&bias, n_pad, group);

        let out = CpuVectorBackend::new().conv_forward(
            &packed_image,
            &packed_filters,
            &packed_bias,
            &geom,
        );
        // group 0 sums channels {1, 2}; group 1 sums {10, 20}
        assert!(approx_eq(out[0], 3.0, 1e-6));
        assert!(approx_eq(out[1], 30.0, 1e-6));
    }

    #[test]
    fn test_inner_product_forward() {
        let rows = layout::pad_row(&[1.0, 2.0, 3.0], 4);
        let mut weights = layout::pad_row(&[1.0, 0.0, 0.0], 4);
        weights.extend(layout::pad_row(&[0.0, 1.0, 1.0], 4));
        let bias = vec![10.0, 20.0];
        let geom = FcGeometry {
            c_pad: 4,
            n_out: 2,
            in_vw: 4,
        };
        let out =
            CpuVectorBackend::new().inner_product_forward(&rows, 1, &weights, &bias, &geom);
        assert!(approx_eq(out[0], 11.0, 1e-6));
        assert!(approx_eq(out[1], 25.0, 1e-6));
    }
}
