// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dense f32 tensors in the two shapes the network exchanges.
//!
//! [`Tensor4`] carries batched feature maps `(n, c, h, w)`; [`Tensor2`]
//! carries per-image score rows `(n, c)`. Both are row-major over a flat
//! `Vec<f32>` so that per-image and per-channel regions are contiguous
//! slices, which the packing and pooling code relies on.

use crate::TensorError;

/// Dense rank-4 tensor, `(n, c, h, w)` row-major.
///
/// # Examples
/// ```
/// use tensor_core::Tensor4;
///
/// let mut t = Tensor4::zeros(1, 2, 3, 3);
/// *t.at_mut(0, 1, 2, 2) = 7.0;
/// assert_eq!(t.at(0, 1, 2, 2), 7.0);
/// assert_eq!(t.channel_plane(0, 0).len(), 9);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor4 {
    n: usize,
    c: usize,
    h: usize,
    w: usize,
    data: Vec<f32>,
}

impl Tensor4 {
    /// Creates a zero-filled tensor of the given shape.
    pub fn zeros(n: usize, c: usize, h: usize, w: usize) -> Self {
        Self {
            n,
            c,
            h,
            w,
            data: vec![0.0; n * c * h * w],
        }
    }

    /// Wraps an existing buffer.
    ///
    /// # Errors
    /// Returns [`TensorError::BufferLengthMismatch`] when `data.len()`
    /// differs from `n * c * h * w`.
    pub fn from_vec(
        n: usize,
        c: usize,
        h: usize,
        w: usize,
        data: Vec<f32>,
    ) -> Result<Self, TensorError> {
        let expected = n * c * h * w;
        if data.len() != expected {
            return Err(TensorError::BufferLengthMismatch {
                shape: vec![n, c, h, w],
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { n, c, h, w, data })
    }

    /// Promotes a single `(c, h, w)` image to a batch-1 tensor.
    pub fn from_single_image(
        c: usize,
        h: usize,
        w: usize,
        data: Vec<f32>,
    ) -> Result<Self, TensorError> {
        Self::from_vec(1, c, h, w, data)
    }

    /// Shape as `(n, c, h, w)`.
    pub fn dims(&self) -> (usize, usize, usize, usize) {
        (self.n, self.c, self.h, self.w)
    }

    pub fn batch(&self) -> usize {
        self.n
    }

    pub fn channels(&self) -> usize {
        self.c
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    #[inline]
    fn offset(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        ((n * self.c + c) * self.h + h) * self.w + w
    }

    #[inline]
    pub fn at(&self, n: usize, c: usize, h: usize, w: usize) -> f32 {
        self.data[self.offset(n, c, h, w)]
    }

    #[inline]
    pub fn at_mut(&mut self, n: usize, c: usize, h: usize, w: usize) -> &mut f32 {
        let i = self.offset(n, c, h, w);
        &mut self.data[i]
    }

    /// The `(c, h, w)` region of image `n` as one contiguous slice.
    pub fn image(&self, n: usize) -> &[f32] {
        let len = self.c * self.h * self.w;
        &self.data[n * len..(n + 1) * len]
    }

    /// Mutable `(c, h, w)` region of image `n`.
    pub fn image_mut(&mut self, n: usize) -> &mut [f32] {
        let len = self.c * self.h * self.w;
        &mut self.data[n * len..(n + 1) * len]
    }

    /// The `(h, w)` plane of channel `c` in image `n`.
    pub fn channel_plane(&self, n: usize, c: usize) -> &[f32] {
        let plane = self.h * self.w;
        let start = (n * self.c + c) * plane;
        &self.data[start..start + plane]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor, returning the flat buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

/// Dense rank-2 tensor, `(n, c)` row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor2 {
    n: usize,
    c: usize,
    data: Vec<f32>,
}

impl Tensor2 {
    pub fn zeros(n: usize, c: usize) -> Self {
        Self {
            n,
            c,
            data: vec![0.0; n * c],
        }
    }

    /// Wraps an existing buffer.
    ///
    /// # Errors
    /// Returns [`TensorError::BufferLengthMismatch`] when `data.len()`
    /// differs from `n * c`.
    pub fn from_vec(n: usize, c: usize, data: Vec<f32>) -> Result<Self, TensorError> {
        if data.len() != n * c {
            return Err(TensorError::BufferLengthMismatch {
                shape: vec![n, c],
                expected: n * c,
                actual: data.len(),
            });
        }
        Ok(Self { n, c, data })
    }

    /// Shape as `(n, c)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.n, self.c)
    }

    pub fn batch(&self) -> usize {
        self.n
    }

    pub fn channels(&self) -> usize {
        self.c
    }

    pub fn row(&self, n: usize) -> &[f32] {
        &self.data[n * self.c..(n + 1) * self.c]
    }

    pub fn row_mut(&mut self, n: usize) -> &mut [f32] {
        &mut self.data[n * self.c..(n + 1) * self.c]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}
