//! FFT-based 2D convolution.
//!
//! Circular convolution via rustfft is exactly the Periodic edge policy, so
//! the engine routes large periodic-edge passes here for O(N log N) instead
//! of O(N * K^2). Plans are created once per grid size and reused.

use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// FFT convolution engine with cached plans for one grid size.
pub struct FftConvolver {
    width: usize,
    height: usize,
    fwd_row: Arc<dyn Fft<f32>>,
    fwd_col: Arc<dyn Fft<f32>>,
    inv_row: Arc<dyn Fft<f32>>,
    inv_col: Arc<dyn Fft<f32>>,
}

impl FftConvolver {
    /// Plan FFTs for the given grid dimensions.
    pub fn new(width: usize, height: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            width,
            height,
            fwd_row: planner.plan_fft_forward(width),
            fwd_col: planner.plan_fft_forward(height),
            inv_row: planner.plan_fft_inverse(width),
            inv_col: planner.plan_fft_inverse(height),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// In-place 2D transform: rows, then columns through a line buffer.
    fn fft2d(&self, data: &mut [Complex<f32>], forward: bool) {
        debug_assert_eq!(data.len(), self.width * self.height);

        let (row_fft, col_fft) = if forward {
            (&self.fwd_row, &self.fwd_col)
        } else {
            (&self.inv_row, &self.inv_col)
        };

        for row in data.chunks_exact_mut(self.width) {
            row_fft.process(row);
        }

        let mut line = vec![Complex::new(0.0f32, 0.0); self.height];
        for x in 0..self.width {
            for y in 0..self.height {
                line[y] = data[y * self.width + x];
            }
            col_fft.process(&mut line);
            for y in 0..self.height {
                data[y * self.width + x] = line[y];
            }
        }
    }

    /// Frequency-domain image of a grid-sized real plane (e.g. a padded
    /// kernel from [`super::Kernel::pad_to_grid`]).
    pub fn spectrum(&self, plane: &[f32]) -> Vec<Complex<f32>> {
        let mut freq: Vec<Complex<f32>> =
            plane.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.fft2d(&mut freq, true);
        freq
    }

    /// Circular convolution of `input` with a precomputed kernel spectrum.
    pub fn convolve_into(
        &self,
        input: &[f32],
        kernel_spectrum: &[Complex<f32>],
        output: &mut [f32],
    ) {
        debug_assert_eq!(input.len(), self.width * self.height);
        debug_assert_eq!(kernel_spectrum.len(), input.len());

        let mut freq: Vec<Complex<f32>> =
            input.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.fft2d(&mut freq, true);

        for (f, k) in freq.iter_mut().zip(kernel_spectrum.iter()) {
            *f *= *k;
        }

        self.fft2d(&mut freq, false);

        // rustfft leaves the inverse unscaled.
        let scale = 1.0 / (self.width * self.height) as f32;
        for (out, f) in output.iter_mut().zip(freq.iter()) {
            *out = f.re * scale;
        }
    }
}
