//! Viewport transform engine: state, gestures and momentum

mod gesture;
mod momentum;
mod state;

pub use gesture::{
    ContactMap, DEFAULT_PINCH_DEAD_ZONE, DEFAULT_PINCH_SENSITIVITY, GestureConfig, GestureTracker,
    PinchState, PointerContact,
};
pub use momentum::{
    ConfigError, DEFAULT_APPLY_FACTOR, DEFAULT_DECAY, DEFAULT_SETTLE_THRESHOLD, MomentumConfig,
    MomentumIntegrator,
};
pub use state::{DirtyFlag, MIN_SCALE, Transform, ViewportState};
