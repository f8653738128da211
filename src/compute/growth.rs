//! Growth functions.
//!
//! A growth function maps the convolution potential to a rate in roughly
//! [-1, 1]. Integration is uniform across shapes: the discrete shapes get
//! their sharpness from the shape of G and the time step, not a separate
//! code path.

use crate::schema::GrowthType;

/// Threshold on a cell's own prior value for the alive flag used by the
/// discrete shapes (Game of Life, Larger-than-Life).
const ALIVE_THRESHOLD: f32 = 0.5;

/// Guard against division by a vanishing sigma.
#[inline]
fn guarded(sigma: f32) -> f32 {
    sigma.max(1e-3)
}

/// Compute the growth rate for potential `u`.
///
/// `old` is the cell's prior value; the discrete shapes derive their alive
/// flag from it, and the relaxation shapes (Asymptotic, SoftClip) measure
/// their step against it. `dt` only participates in SoftClip's inner
/// integration.
#[inline]
pub fn growth(shape: GrowthType, u: f32, old: f32, mu: f32, sigma: f32, dt: f32) -> f32 {
    match shape {
        GrowthType::Lenia => {
            let d = (u - mu) / guarded(sigma);
            2.0 * (-0.5 * d * d).exp() - 1.0
        }
        GrowthType::Step => {
            if u >= mu - sigma && u <= mu + sigma {
                1.0
            } else {
                -1.0
            }
        }
        GrowthType::GameOfLife => {
            // u is the raw 0-8 neighbor sum from the unweighted Moore mask.
            let alive = old > ALIVE_THRESHOLD;
            if !alive {
                if (2.5..=3.5).contains(&u) { 1.0 } else { -1.0 }
            } else if (1.5..=3.5).contains(&u) {
                0.5
            } else {
                -1.0
            }
        }
        GrowthType::SmoothLife => {
            if u >= mu - 3.0 * sigma && u <= mu - sigma {
                0.8
            } else if u >= mu + sigma && u <= mu + 3.0 * sigma {
                -0.8
            } else {
                0.0
            }
        }
        GrowthType::Polynomial => {
            let d = (u - mu) / guarded(sigma);
            let v = 1.0 - d * d;
            if v > 0.0 { v * v - 0.5 } else { -0.5 }
        }
        GrowthType::Exponential => {
            let d = (u - mu).abs() / guarded(sigma);
            2.0 * (-d).exp() - 1.0
        }
        GrowthType::DoublePeak => {
            let sig = guarded(sigma);
            let d1 = (u - mu * 0.7) / sig;
            let d2 = (u - mu * 1.3) / sig;
            let g1 = (-0.5 * d1 * d1).exp();
            let g2 = (-0.5 * d2 * d2).exp();
            2.0 * g1.max(g2) - 1.0
        }
        GrowthType::Asymptotic => {
            let d = (u - mu) / guarded(sigma);
            (-0.5 * d * d).exp() - old
        }
        GrowthType::SoftClip => {
            let d = (u - mu) / guarded(sigma);
            let g = 2.0 * (-0.5 * d * d).exp() - 1.0;
            let raw = old + dt * g;
            1.0 / (1.0 + (-4.0 * (raw - 0.5)).exp()) - old
        }
        GrowthType::LargerThanLife => {
            let alive = old > ALIVE_THRESHOLD;
            if !alive {
                if u >= mu - 3.0 * sigma && u <= mu + 3.0 * sigma {
                    1.0
                } else {
                    -1.0
                }
            } else if u >= mu - sigma && u <= mu + sigma {
                0.5
            } else {
                -1.0
            }
        }
        GrowthType::Quad4 => {
            let d = (u - mu) / guarded(sigma);
            let v = 1.0 - d * d;
            let g = if v > 0.0 { 2.0 * v.powi(4) - 1.0 } else { -1.0 };
            g.clamp(-1.0, 1.0)
        }
    }
}

/// Integrate one step: `clip(old + dt * g, 0, 1)`.
#[inline]
pub fn integrate(old: f32, g: f32, dt: f32) -> f32 {
    (old + dt * g).clamp(0.0, 1.0)
}
