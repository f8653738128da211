//! Seed patterns for initializing the simulation field.
//!
//! Every pattern is deterministic for a given seed value, so runs are
//! reproducible from configuration alone.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::compute::Field;

/// Complete seed specification for field initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seed {
    /// Pattern to apply.
    pub pattern: Pattern,
}

impl Default for Seed {
    fn default() -> Self {
        Self {
            pattern: Pattern::GaussianSpot {
                center: (0.5, 0.5),
                radius: 0.15,
                amplitude: 1.0,
                channel: 0,
            },
        }
    }
}

/// Predefined initialization patterns.
///
/// Positions and radii are fractions of the grid extents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Pattern {
    /// Uniform random noise in `[0, amplitude]`.
    Noise {
        amplitude: f32,
        /// Target channel; `None` fills every channel.
        channel: Option<usize>,
        seed: u64,
    },
    /// Normally distributed noise, clamped to [0, 1].
    GaussianNoise {
        mean: f32,
        std_dev: f32,
        channel: Option<usize>,
        seed: u64,
    },
    /// Random cells set to 1 with the given density.
    RandomBinary {
        density: f32,
        channel: Option<usize>,
        seed: u64,
    },
    /// Single Gaussian blob.
    GaussianSpot {
        center: (f32, f32),
        radius: f32,
        amplitude: f32,
        channel: usize,
    },
    /// Gaussian ring.
    GaussianRing {
        center: (f32, f32),
        radius: f32,
        width: f32,
        amplitude: f32,
        channel: usize,
    },
    /// Filled square in the grid center.
    CenterSquare {
        /// Side length as a fraction of the smaller grid extent.
        size: f32,
        value: f32,
        channel: usize,
    },
    /// Several filled squares at random positions.
    RandomSquares {
        count: usize,
        /// Side length as a fraction of the smaller grid extent.
        size: f32,
        value: f32,
        channel: usize,
        seed: u64,
    },
    /// Horizontal linear ramp from 0 to `amplitude`.
    Gradient { amplitude: f32, channel: usize },
    /// Explicit sparse cells: (x, y, channel, value).
    Custom { values: Vec<(usize, usize, usize, f32)> },
}

impl Seed {
    /// Apply the pattern to the field. Writes through to both buffers.
    pub fn apply(&self, field: &mut Field) {
        let width = field.width();
        let height = field.height();
        let channels = field.channels();

        match &self.pattern {
            Pattern::Noise {
                amplitude,
                channel,
                seed,
            } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                for_target_channels(channels, *channel, |c| {
                    for y in 0..height {
                        for x in 0..width {
                            field.deposit(x, y, c, rng.r#gen::<f32>() * amplitude);
                        }
                    }
                });
            }
            Pattern::GaussianNoise {
                mean,
                std_dev,
                channel,
                seed,
            } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                // The guard keeps the std-dev strictly positive, so
                // construction cannot fail.
                let normal =
                    Normal::new(*mean, std_dev.max(1e-6)).expect("positive std-dev");
                for_target_channels(channels, *channel, |c| {
                    for y in 0..height {
                        for x in 0..width {
                            field.deposit(x, y, c, normal.sample(&mut rng));
                        }
                    }
                });
            }
            Pattern::RandomBinary {
                density,
                channel,
                seed,
            } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                for_target_channels(channels, *channel, |c| {
                    for y in 0..height {
                        for x in 0..width {
                            let v = if rng.r#gen::<f32>() < *density { 1.0 } else { 0.0 };
                            field.deposit(x, y, c, v);
                        }
                    }
                });
            }
            Pattern::GaussianSpot {
                center,
                radius,
                amplitude,
                channel,
            } => {
                let cx = center.0 * width as f32;
                let cy = center.1 * height as f32;
                let r = (radius * width.min(height) as f32).max(1e-3);
                for y in 0..height {
                    for x in 0..width {
                        let dx = x as f32 - cx;
                        let dy = y as f32 - cy;
                        let d2 = dx * dx + dy * dy;
                        let v = amplitude * (-d2 / (2.0 * r * r)).exp();
                        if v > 1e-4 {
                            field.deposit(x, y, *channel, v);
                        }
                    }
                }
            }
            Pattern::GaussianRing {
                center,
                radius,
                width: ring_width,
                amplitude,
                channel,
            } => {
                let cx = center.0 * width as f32;
                let cy = center.1 * height as f32;
                let min_dim = width.min(height) as f32;
                let r = radius * min_dim;
                let w = (ring_width * min_dim).max(1e-3);
                for y in 0..height {
                    for x in 0..width {
                        let dx = x as f32 - cx;
                        let dy = y as f32 - cy;
                        let dist = (dx * dx + dy * dy).sqrt();
                        let d = (dist - r) / w;
                        let v = amplitude * (-0.5 * d * d).exp();
                        if v > 1e-4 {
                            field.deposit(x, y, *channel, v);
                        }
                    }
                }
            }
            Pattern::CenterSquare {
                size,
                value,
                channel,
            } => {
                let side = ((size * width.min(height) as f32) as usize).max(1);
                let x0 = (width - side.min(width)) / 2;
                let y0 = (height - side.min(height)) / 2;
                fill_square(field, x0, y0, side, *value, *channel);
            }
            Pattern::RandomSquares {
                count,
                size,
                value,
                channel,
                seed,
            } => {
                let mut rng = StdRng::seed_from_u64(*seed);
                let side = ((size * width.min(height) as f32) as usize).max(1);
                for _ in 0..*count {
                    let x0 = rng.gen_range(0..width);
                    let y0 = rng.gen_range(0..height);
                    fill_square(field, x0, y0, side, *value, *channel);
                }
            }
            Pattern::Gradient { amplitude, channel } => {
                let denom = (width.saturating_sub(1)).max(1) as f32;
                for y in 0..height {
                    for x in 0..width {
                        let v = amplitude * x as f32 / denom;
                        field.deposit(x, y, *channel, v);
                    }
                }
            }
            Pattern::Custom { values } => {
                for &(x, y, c, v) in values {
                    field.deposit(x, y, c, v);
                }
            }
        }
    }
}

/// Run `body` for the selected channel, or every channel when `None`.
fn for_target_channels(channels: usize, target: Option<usize>, mut body: impl FnMut(usize)) {
    match target {
        Some(c) if c < channels => body(c),
        Some(_) => {}
        None => {
            for c in 0..channels {
                body(c);
            }
        }
    }
}

/// Fill a square clipped against the grid extents.
fn fill_square(field: &mut Field, x0: usize, y0: usize, side: usize, value: f32, channel: usize) {
    let x1 = (x0 + side).min(field.width());
    let y1 = (y0 + side).min(field.height());
    for y in y0..y1 {
        for x in x0..x1 {
            field.deposit(x, y, channel, value);
        }
    }
}
