//! Kernel generation.
//!
//! A kernel is a dense row-major weight matrix evaluated from a
//! [`KernelConfig`] shape function over normalized radius, optionally biased
//! by anisotropy and scaled by a time-varying pulse, then normalized to sum
//! 1.0. The Game-of-Life shape bypasses all of that and is always the exact
//! unweighted 3x3 Moore mask.

use crate::schema::{KernelConfig, KernelShape};

/// Width of the Gaussian/Ricker shells in normalized radius units.
const SHELL_WIDTH: f32 = 0.15;

/// Number of sinc lobes across the kernel radius.
const SINC_LOBES: f32 = 3.0;

/// Normalization is skipped when the raw weight sum is this close to zero.
const NORM_EPSILON: f64 = 1e-9;

/// Precomputed kernel matrix ready for convolution.
#[derive(Debug, Clone)]
pub struct Kernel {
    /// Weight matrix, row-major `size * size`.
    pub data: Vec<f32>,
    /// Diameter in cells.
    pub size: usize,
    config: KernelConfig,
}

impl Kernel {
    /// Evaluate a kernel from configuration.
    pub fn from_config(config: &KernelConfig) -> Self {
        if config.shape == KernelShape::GameOfLife {
            // Exact binary Moore neighborhood, regardless of other parameters.
            #[rustfmt::skip]
            let data = vec![
                1.0, 1.0, 1.0,
                1.0, 0.0, 1.0,
                1.0, 1.0, 1.0,
            ];
            return Self {
                data,
                size: 3,
                config: config.clone(),
            };
        }

        let size = config.diameter();
        let radius = config.radius as f32;
        let center = (size as f32 - 1.0) * 0.5;

        let mut data = vec![0.0f32; size * size];
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - center;
                let dy = y as f32 - center;
                let mut r = (dx * dx + dy * dy).sqrt() / radius;

                if config.anisotropy_strength > 0.0 {
                    // Bias the radius by the angular deviation from the
                    // anisotropy axis; stretches the kernel along it.
                    let theta = dy.atan2(dx);
                    let bias =
                        1.0 + config.anisotropy_strength * (theta - config.anisotropy_angle).cos();
                    r *= bias.max(0.0);
                }

                if r > 1.0 {
                    continue;
                }

                data[y * size + x] = shell_value(config, r);
            }
        }

        if config.is_pulsing() {
            let scale =
                (std::f32::consts::TAU * config.pulse_frequency * config.time_phase).sin();
            for v in &mut data {
                *v *= scale;
            }
        }

        let sum: f64 = data.iter().map(|&v| v as f64).sum();
        if sum.abs() > NORM_EPSILON {
            let inv_sum = (1.0 / sum) as f32;
            for v in &mut data {
                *v *= inv_sum;
            }
        } else {
            log::warn!(
                "kernel weight sum {:.3e} near zero, skipping normalization",
                sum
            );
        }

        Self {
            data,
            size,
            config: config.clone(),
        }
    }

    /// Configuration this kernel was generated from.
    #[inline]
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Weight at matrix position (x, y).
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.size + x]
    }

    /// Offset of the first matrix column/row relative to the target cell.
    #[inline]
    pub fn half(&self) -> i32 {
        (self.size / 2) as i32
    }

    /// Re-evaluate the pulse scaling for a new phase.
    ///
    /// No-op for kernels without a pulse frequency; other parameters are
    /// untouched.
    pub fn update_time_phase(&mut self, phase: f32) {
        if !self.config.is_pulsing() {
            return;
        }
        let mut config = self.config.clone();
        config.time_phase = phase;
        *self = Self::from_config(&config);
    }

    /// Spread the kernel onto a grid-sized plane for circular convolution.
    ///
    /// Weight at offset `o` lands at index `-o mod extent`, so that the
    /// frequency-domain product reproduces the direct correlation exactly,
    /// including for asymmetric (anisotropic) kernels.
    pub fn pad_to_grid(&self, width: usize, height: usize) -> Vec<f32> {
        let mut padded = vec![0.0f32; width * height];
        let half = self.half();

        for ky in 0..self.size {
            for kx in 0..self.size {
                let ox = kx as i32 - half;
                let oy = ky as i32 - half;
                let tx = (-ox).rem_euclid(width as i32) as usize;
                let ty = (-oy).rem_euclid(height as i32) as usize;
                // Accumulate: a kernel wider than the grid wraps onto itself.
                padded[ty * width + tx] += self.data[ky * self.size + kx];
            }
        }

        padded
    }
}

/// Evaluate the configured shape at normalized radius `r` in [0, 1].
fn shell_value(config: &KernelConfig, r: f32) -> f32 {
    match config.shape {
        KernelShape::GaussianShell => gaussian_shell(r),
        KernelShape::Bump4 => bump4(r),
        KernelShape::MultiringGauss => multiring(config, r, gaussian_shell),
        KernelShape::MultiringBump4 => multiring(config, r, bump4),
        KernelShape::StepUnimodal => {
            if (0.25..=0.75).contains(&r) {
                1.0
            } else {
                0.0
            }
        }
        KernelShape::CosineShell => {
            0.5 * (1.0 + (std::f32::consts::TAU * (r - 0.5)).cos())
        }
        KernelShape::MexicanHat => {
            let s = (r - 0.5) / SHELL_WIDTH;
            (1.0 - s * s) * (-0.5 * s * s).exp()
        }
        KernelShape::Sinc => {
            let t = std::f32::consts::PI * SINC_LOBES * r;
            if t.abs() < 1e-6 { 1.0 } else { t.sin() / t }
        }
        KernelShape::Quad4 => quad4(r),
        KernelShape::MultiringQuad4 => multiring(config, r, |local| {
            let s = 2.0 * local - 1.0;
            quad4(s.abs())
        }),
        // Handled before shape evaluation.
        KernelShape::GameOfLife => 0.0,
    }
}

#[inline]
fn gaussian_shell(r: f32) -> f32 {
    let d = (r - 0.5) / SHELL_WIDTH;
    (-0.5 * d * d).exp()
}

#[inline]
fn bump4(r: f32) -> f32 {
    if r > 0.0 && r < 1.0 {
        (4.0 * r * (1.0 - r)).powi(4)
    } else {
        0.0
    }
}

#[inline]
fn quad4(r: f32) -> f32 {
    let v = 1.0 - r * r;
    if v > 0.0 { v.powi(4) } else { 0.0 }
}

/// Blend `num_rings` shells, ring `i` owning the radial band
/// `[i/n, (i+1)/n)` with its own weight.
fn multiring(config: &KernelConfig, r: f32, band: impl Fn(f32) -> f32) -> f32 {
    if r >= 1.0 {
        return 0.0;
    }
    let n = config.num_rings;
    let scaled = r * n as f32;
    let ring = (scaled as usize).min(n - 1);
    let local = scaled - ring as f32;
    config.ring_weight(ring) * band(local)
}
