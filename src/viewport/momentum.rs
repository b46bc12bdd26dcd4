//! Momentum slide after release
//!
//! Velocity decays every frame. While no contact is down and the velocity is
//! above the settle threshold, it keeps pushing the offsets.

use log::trace;

use super::state::ViewportState;

pub const DEFAULT_DECAY: f64 = 0.5;
pub const DEFAULT_APPLY_FACTOR: f64 = 1.0;
/// Velocity, in pixels, at or below which momentum stops moving the page
pub const DEFAULT_SETTLE_THRESHOLD: f64 = 1.0;

/// Invalid tuning values
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("momentum decay must be in (0, 1], got {0}")]
    Decay(f64),

    #[error("momentum apply factor must be finite and positive, got {0}")]
    ApplyFactor(f64),

    #[error("momentum threshold must be finite and non-negative, got {0}")]
    Threshold(f64),

    #[error("pinch sensitivity must be finite and positive, got {0}")]
    PinchSensitivity(f64),

    #[error("pinch dead zone must be finite and non-negative, got {0}")]
    DeadZone(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MomentumConfig {
    /// Lerp factor towards zero applied each frame
    decay: f64,
    /// Fraction of the velocity added to the offsets each frame
    apply_factor: f64,
    settle_threshold: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            decay: DEFAULT_DECAY,
            apply_factor: DEFAULT_APPLY_FACTOR,
            settle_threshold: DEFAULT_SETTLE_THRESHOLD,
        }
    }
}

impl MomentumConfig {
    pub fn new(decay: f64, apply_factor: f64, settle_threshold: f64) -> Result<Self, ConfigError> {
        if !(decay > 0.0 && decay <= 1.0) {
            return Err(ConfigError::Decay(decay));
        }
        if !(apply_factor.is_finite() && apply_factor > 0.0) {
            return Err(ConfigError::ApplyFactor(apply_factor));
        }
        if !(settle_threshold.is_finite() && settle_threshold >= 0.0) {
            return Err(ConfigError::Threshold(settle_threshold));
        }
        Ok(Self {
            decay,
            apply_factor,
            settle_threshold,
        })
    }

    #[must_use]
    pub fn decay(&self) -> f64 {
        self.decay
    }

    #[must_use]
    pub fn apply_factor(&self) -> f64 {
        self.apply_factor
    }

    #[must_use]
    pub fn settle_threshold(&self) -> f64 {
        self.settle_threshold
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MomentumIntegrator {
    config: MomentumConfig,
}

impl MomentumIntegrator {
    #[must_use]
    pub fn new(config: MomentumConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> MomentumConfig {
        self.config
    }

    /// Advance one frame. Returns true when the offsets moved.
    pub fn step(&self, viewport: &mut ViewportState, active_contacts: usize) -> bool {
        let decay = self.config.decay;
        viewport.velocity_x = lerp(viewport.velocity_x, 0.0, decay);
        viewport.velocity_y = lerp(viewport.velocity_y, 0.0, decay);

        let speed = viewport.velocity_x.abs().max(viewport.velocity_y.abs());
        if speed <= self.config.settle_threshold || active_contacts != 0 {
            return false;
        }

        viewport.offset_x += viewport.velocity_x * self.config.apply_factor;
        viewport.offset_y += viewport.velocity_y * self.config.apply_factor;
        trace!(
            "momentum slide by ({}, {})",
            viewport.velocity_x * self.config.apply_factor,
            viewport.velocity_y * self.config.apply_factor
        );
        true
    }

    /// Upper bound on frames before `speed` settles at or below the threshold.
    #[must_use]
    pub fn frames_to_settle(&self, speed: f64) -> u32 {
        let speed = speed.abs();
        if speed <= self.config.settle_threshold {
            return 0;
        }
        if self.config.decay >= 1.0 {
            return 1;
        }
        if self.config.settle_threshold == 0.0 {
            return u32::MAX;
        }
        let ratio = self.config.settle_threshold / speed;
        (ratio.ln() / (1.0 - self.config.decay).ln()).ceil() as u32
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
