//! Configuration types for the simulation engine.

use serde::{Deserialize, Serialize};

/// Maximum number of rings a multiring kernel can blend.
pub const MAX_RINGS: usize = 16;

/// Maximum number of rules in a multi-channel rule list.
pub const MAX_RULES: usize = 16;

/// Kernel shape functions.
///
/// Multiring variants blend `num_rings` independently weighted shells,
/// each occupying its own radial band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelShape {
    /// Gaussian shell peaked at half radius.
    GaussianShell,
    /// Quartic bump `(4r(1-r))^4` with compact support.
    Bump4,
    /// Concentric Gaussian shells.
    MultiringGauss,
    /// Concentric quartic bumps.
    MultiringBump4,
    /// Exact unweighted 3x3 Moore mask. Never normalized.
    GameOfLife,
    /// Flat band between quarter and three-quarter radius.
    StepUnimodal,
    /// Raised-cosine shell peaked at half radius.
    CosineShell,
    /// Ricker wavelet (difference-of-Gaussians family, signed lobes).
    MexicanHat,
    /// Radial sinc with side lobes.
    Sinc,
    /// Solid quartic bump `(1-r^2)^4`.
    Quad4,
    /// Concentric solid quartic bumps.
    MultiringQuad4,
}

/// Growth function shapes mapping potential to a rate in roughly [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrowthType {
    /// Classic Lenia Gaussian bell: `2*exp(-0.5*((u-mu)/sigma)^2) - 1`.
    Lenia,
    /// Hard band: +1 inside `[mu-sigma, mu+sigma]`, -1 outside.
    Step,
    /// Discrete Conway rules over an unweighted 0-8 neighbor count.
    GameOfLife,
    /// Separate birth and death bands at `mu -/+ [sigma, 3*sigma]`.
    SmoothLife,
    /// Quadratic-squared bump minus 0.5.
    Polynomial,
    /// Two-sided exponential decay from `mu`.
    Exponential,
    /// Two Gaussians centered at `0.7*mu` and `1.3*mu`.
    DoublePeak,
    /// Relaxation toward a Gaussian target of the potential.
    Asymptotic,
    /// Logistic squashing of the integrated Gaussian step.
    SoftClip,
    /// Larger-than-Life: wide birth band, narrow survival band.
    LargerThanLife,
    /// Quartic bump variant clipped to [-1, 1].
    Quad4,
}

/// Boundary sampling policy, chosen independently per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeMode {
    /// Wrap around (torus).
    Periodic,
    /// Clamp to the edge cell.
    Clamp,
    /// Mirror across the boundary.
    Mirror,
}

/// Configuration for a single convolution kernel.
///
/// Value-comparable: equal configs must not trigger regeneration. The
/// comparison deliberately ignores `time_phase` — phase updates go through
/// [`crate::compute::Kernel::update_time_phase`] and are not configuration
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Kernel radius in cells (>= 1).
    pub radius: u32,
    /// Shape function.
    pub shape: KernelShape,
    /// Number of rings blended by multiring shapes (1..=16).
    pub num_rings: usize,
    /// Per-ring weights; entries beyond the list count as zero.
    pub ring_weights: Vec<f32>,
    /// Anisotropy strength; 0 disables the angular radius bias.
    pub anisotropy_strength: f32,
    /// Anisotropy axis angle in radians.
    pub anisotropy_angle: f32,
    /// Current phase for time-varying kernels.
    pub time_phase: f32,
    /// Pulse frequency; 0 disables time variation.
    pub pulse_frequency: f32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            radius: 13,
            shape: KernelShape::GaussianShell,
            num_rings: 1,
            ring_weights: vec![1.0],
            anisotropy_strength: 0.0,
            anisotropy_angle: 0.0,
            time_phase: 0.0,
            pulse_frequency: 0.0,
        }
    }
}

impl PartialEq for KernelConfig {
    fn eq(&self, other: &Self) -> bool {
        if self.radius != other.radius
            || self.shape != other.shape
            || self.num_rings != other.num_rings
            || self.anisotropy_strength != other.anisotropy_strength
            || self.anisotropy_angle != other.anisotropy_angle
            || self.pulse_frequency != other.pulse_frequency
        {
            return false;
        }
        // Only the first num_rings weights are ever evaluated.
        (0..self.num_rings).all(|i| self.ring_weight(i) == other.ring_weight(i))
    }
}

impl KernelConfig {
    /// Weight of ring `i`; missing entries are zero.
    #[inline]
    pub fn ring_weight(&self, i: usize) -> f32 {
        self.ring_weights.get(i).copied().unwrap_or(0.0)
    }

    /// Kernel diameter in cells: `2 * radius`, or exactly 3 for Game of Life.
    #[inline]
    pub fn diameter(&self) -> usize {
        if self.shape == KernelShape::GameOfLife {
            3
        } else {
            2 * self.radius as usize
        }
    }

    /// Whether the kernel must be re-evaluated when the phase advances.
    #[inline]
    pub fn is_pulsing(&self) -> bool {
        self.pulse_frequency > 1e-3
    }
}

/// One source -> destination channel coupling in multi-channel mode.
///
/// The ordinal position in [`EngineConfig::rules`] is semantically
/// significant: rules sharing a destination channel see each other's
/// partial updates, so reordering is an observable behavior change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Channel the rule's kernel samples.
    pub source_channel: usize,
    /// Channel the rule writes into.
    pub dest_channel: usize,
    /// Scales the base kernel radius; resulting radius is at least 1.
    pub radius_fraction: f32,
    /// Kernel shape for this rule.
    pub shape: KernelShape,
    /// Ring count for multiring shapes.
    pub num_rings: usize,
    /// Per-ring weights.
    pub ring_weights: Vec<f32>,
    /// Growth function shape.
    pub growth: GrowthType,
    /// Growth center.
    pub mu: f32,
    /// Growth width.
    pub sigma: f32,
    /// Multiplier applied to the growth rate.
    pub growth_strength: f32,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            source_channel: 0,
            dest_channel: 0,
            radius_fraction: 1.0,
            shape: KernelShape::GaussianShell,
            num_rings: 1,
            ring_weights: vec![1.0],
            growth: GrowthType::Lenia,
            mu: 0.15,
            sigma: 0.015,
            growth_strength: 1.0,
        }
    }
}

impl RuleConfig {
    /// Resolve this rule's kernel configuration against the base radius.
    pub fn kernel_config(&self, base_radius: u32) -> KernelConfig {
        let radius = ((base_radius as f32 * self.radius_fraction) as u32).max(1);
        KernelConfig {
            radius,
            shape: self.shape,
            num_rings: self.num_rings,
            ring_weights: self.ring_weights.clone(),
            ..KernelConfig::default()
        }
    }
}

/// Obstacle enforcement settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallConfig {
    /// Value forced into masked cells.
    pub value: f32,
    /// Which channels are forced. Single-channel mode uses index 0.
    pub channels: [bool; 3],
}

impl Default for WallConfig {
    fn default() -> Self {
        Self {
            value: 1.0,
            channels: [true; 3],
        }
    }
}

/// Top-level engine configuration.
///
/// Deliberately free of presentation state: grid extents, channel count,
/// integration step, growth parameters, kernel, edge policy, walls, and
/// the ordered multi-channel rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Grid width in cells.
    pub width: usize,
    /// Grid height in cells.
    pub height: usize,
    /// Channel count: 1 (scalar) or 3 (RGB).
    pub channels: usize,
    /// Time step size.
    pub dt: f32,
    /// Growth function center (single-channel pass).
    pub mu: f32,
    /// Growth function width (single-channel pass).
    pub sigma: f32,
    /// Growth function shape (single-channel pass).
    pub growth: GrowthType,
    /// Primary kernel configuration.
    pub kernel: KernelConfig,
    /// Edge policy along X.
    pub edge_x: EdgeMode,
    /// Edge policy along Y.
    pub edge_y: EdgeMode,
    /// Obstacle settings.
    pub wall: WallConfig,
    /// Ordered rule list for the multi-channel pass (<= 16 entries).
    pub rules: Vec<RuleConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            channels: 1,
            dt: 0.1,
            mu: 0.15,
            sigma: 0.015,
            growth: GrowthType::Lenia,
            kernel: KernelConfig::default(),
            edge_x: EdgeMode::Periodic,
            edge_y: EdgeMode::Periodic,
            wall: WallConfig::default(),
            rules: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.channels != 1 && self.channels != 3 {
            return Err(ConfigError::InvalidChannels(self.channels));
        }
        if self.dt <= 0.0 || !self.dt.is_finite() {
            return Err(ConfigError::InvalidTimeStep);
        }
        if self.kernel.radius == 0 {
            return Err(ConfigError::InvalidKernelRadius);
        }
        if self.kernel.num_rings == 0 || self.kernel.num_rings > MAX_RINGS {
            return Err(ConfigError::InvalidRingCount(self.kernel.num_rings));
        }
        if self.rules.len() > MAX_RULES {
            return Err(ConfigError::TooManyRules(self.rules.len()));
        }
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.source_channel >= self.channels {
                return Err(ConfigError::InvalidChannelIndex {
                    rule: i,
                    channel: rule.source_channel,
                });
            }
            if rule.dest_channel >= self.channels {
                return Err(ConfigError::InvalidChannelIndex {
                    rule: i,
                    channel: rule.dest_channel,
                });
            }
            if rule.radius_fraction <= 0.0 {
                return Err(ConfigError::InvalidRadiusFraction(i));
            }
            if rule.num_rings == 0 || rule.num_rings > MAX_RINGS {
                return Err(ConfigError::InvalidRingCount(rule.num_rings));
            }
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Grid dimensions must be non-zero")]
    InvalidDimensions,
    #[error("Channel count must be 1 or 3, got {0}")]
    InvalidChannels(usize),
    #[error("Time step must be positive and finite")]
    InvalidTimeStep,
    #[error("Kernel radius must be at least 1")]
    InvalidKernelRadius,
    #[error("Ring count must be in 1..=16, got {0}")]
    InvalidRingCount(usize),
    #[error("Rule list holds at most 16 entries, got {0}")]
    TooManyRules(usize),
    #[error("Rule {rule} references invalid channel {channel}")]
    InvalidChannelIndex { rule: usize, channel: usize },
    #[error("Rule {0} has non-positive radius fraction")]
    InvalidRadiusFraction(usize),
}
