//! Pan/zoom transform state
//!
//! Holds the user scale, the page offset and the residual pan velocity
//! that feeds the momentum slide after all contacts are released.

/// Smallest scale the viewport will accept.
pub const MIN_SCALE: f64 = 0.01;

/// Read-only snapshot of the visual part of the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Transform {
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Pan/zoom state for the viewer
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportState {
    /// User scale factor (1.0 = page fitted to the surface width)
    pub(crate) scale: f64,
    /// Page origin on screen, in pixels
    pub(crate) offset_x: f64,
    pub(crate) offset_y: f64,
    /// Accumulated recent motion, in pixels
    pub(crate) velocity_x: f64,
    pub(crate) velocity_y: f64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            velocity_x: 0.0,
            velocity_y: 0.0,
        }
    }
}

impl ViewportState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub fn offset(&self) -> (f64, f64) {
        (self.offset_x, self.offset_y)
    }

    #[must_use]
    pub fn velocity(&self) -> (f64, f64) {
        (self.velocity_x, self.velocity_y)
    }

    #[must_use]
    pub fn transform(&self) -> Transform {
        Transform {
            scale: self.scale,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
        }
    }

    /// Translate the page and feed the motion into the velocity.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
        self.velocity_x += dx;
        self.velocity_y += dy;
    }

    /// Multiply the scale by `multiplier`, keeping the screen point
    /// `(cx, cy)` fixed.
    ///
    /// The multiplier is clamped so the scale never drops below
    /// [`MIN_SCALE`]; the offsets follow the clamped ratio.
    pub fn zoom_about(&mut self, multiplier: f64, cx: f64, cy: f64) {
        let new_scale = Self::clamp_scale(self.scale * multiplier);
        let s = new_scale / self.scale;

        self.offset_x += (self.offset_x - cx) * s - (self.offset_x - cx);
        self.offset_y += (self.offset_y - cy) * s - (self.offset_y - cy);
        self.scale = new_scale;
    }

    /// Reset scale and offsets. Velocity is left alone.
    pub fn recenter(&mut self) {
        self.scale = 1.0;
        self.offset_x = 0.0;
        self.offset_y = 0.0;
    }

    /// Reset everything, including residual velocity.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_velocity(&mut self, vx: f64, vy: f64) {
        self.velocity_x = vx;
        self.velocity_y = vy;
    }

    /// True when `scale > 0` and all components are finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.scale > 0.0
            && self.scale.is_finite()
            && self.offset_x.is_finite()
            && self.offset_y.is_finite()
            && self.velocity_x.is_finite()
            && self.velocity_y.is_finite()
    }

    /// Clamp a scale to the valid range, handling NaN/Inf
    #[must_use]
    pub fn clamp_scale(scale: f64) -> f64 {
        if scale.is_nan() {
            MIN_SCALE
        } else if scale.is_infinite() {
            if scale > 0.0 { f64::MAX } else { MIN_SCALE }
        } else {
            scale.max(MIN_SCALE)
        }
    }
}

/// Marks that the visual transform differs from what was last rendered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyFlag(bool);

impl DirtyFlag {
    pub fn mark(&mut self) {
        self.0 = true;
    }

    #[must_use]
    pub fn is_set(self) -> bool {
        self.0
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn default_is_identity() {
        let state = ViewportState::new();
        assert_eq!(state.transform(), Transform::identity());
        assert_eq!(state.velocity(), (0.0, 0.0));
        assert!(state.is_valid());
    }

    #[test]
    fn pan_moves_offset_and_velocity() {
        let mut state = ViewportState::new();
        state.pan_by(50.0, 30.0);
        state.pan_by(-10.0, 5.0);
        assert_eq!(state.offset(), (40.0, 35.0));
        assert_eq!(state.velocity(), (40.0, 35.0));
    }

    #[test]
    fn zoom_about_keeps_center_fixed() {
        let mut state = ViewportState::new();
        state.offset_x = 20.0;
        state.offset_y = -40.0;

        // Page point under (100, 100) before the zoom
        let (cx, cy) = (100.0, 100.0);
        let page_x = (cx - state.offset_x) / state.scale;
        let page_y = (cy - state.offset_y) / state.scale;

        state.zoom_about(1.5, cx, cy);

        assert!((state.scale - 1.5).abs() < EPSILON);
        assert!(((cx - state.offset_x) / state.scale - page_x).abs() < EPSILON);
        assert!(((cy - state.offset_y) / state.scale - page_y).abs() < EPSILON);
    }

    #[test]
    fn zoom_about_never_goes_non_positive() {
        let mut state = ViewportState::new();
        state.zoom_about(-3.0, 10.0, 10.0);
        assert!((state.scale - MIN_SCALE).abs() < EPSILON);

        state.zoom_about(f64::NAN, 10.0, 10.0);
        assert!(state.is_valid());
    }

    #[test]
    fn clamp_scale_handles_non_finite() {
        assert_eq!(ViewportState::clamp_scale(f64::NAN), MIN_SCALE);
        assert_eq!(ViewportState::clamp_scale(f64::NEG_INFINITY), MIN_SCALE);
        assert_eq!(ViewportState::clamp_scale(0.0), MIN_SCALE);
        assert_eq!(ViewportState::clamp_scale(2.0), 2.0);
    }

    #[test]
    fn recenter_keeps_velocity() {
        let mut state = ViewportState::new();
        state.pan_by(5.0, 5.0);
        state.zoom_about(2.0, 0.0, 0.0);
        state.recenter();
        assert_eq!(state.transform(), Transform::identity());
        assert_eq!(state.velocity(), (5.0, 5.0));
    }

    #[test]
    fn dirty_flag_take_clears() {
        let mut dirty = DirtyFlag::default();
        assert!(!dirty.take());
        dirty.mark();
        assert!(dirty.is_set());
        assert!(dirty.take());
        assert!(!dirty.is_set());
    }
}
