//! Pinch-to-zoom bookkeeping
//!
//! A pinch gesture reports a cumulative scale factor relative to where the
//! fingers started. The controller turns each sample into a device zoom
//! factor clamped to the hardware bounds, and only commits that factor as
//! the new baseline once the gesture is released.

mod lens;

pub use lens::{display_name, order, LensKind, ZoomLevel};

use thiserror::Error;
use tracing::debug;

/// Pinch scale reported when the fingers have not moved
pub const GESTURE_NEUTRAL_SCALE: f64 = 1.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZoomError {
    #[error("invalid zoom bounds: min {min} > max {max}")]
    InvalidBounds { min: f64, max: f64 },

    #[error("invalid gesture scale: {0}")]
    InvalidGesture(f64),

    #[error("no active capture device")]
    DeviceUnavailable,

    #[error("device configuration lock failed: {0}")]
    HardwareLock(String),
}

/// Zoom range reported by the hardware for the active lens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceBounds {
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl DeviceBounds {
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        Self { min_zoom, max_zoom }
    }

    /// Rejects a malformed hardware report
    pub fn validate(&self) -> Result<(), ZoomError> {
        if self.min_zoom.is_nan() || self.max_zoom.is_nan() || self.min_zoom > self.max_zoom {
            return Err(ZoomError::InvalidBounds {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        Ok(())
    }

    /// Clamps a zoom factor into `[min_zoom, max_zoom]`
    pub fn clamp(&self, scale: f64) -> Result<f64, ZoomError> {
        self.validate()?;
        Ok(scale.clamp(self.min_zoom, self.max_zoom))
    }

    pub fn contains(&self, scale: f64) -> bool {
        scale >= self.min_zoom && scale <= self.max_zoom
    }
}

/// One reading of a pinch gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureSample {
    /// Live pinch ratio since the gesture began (1.0 = unchanged)
    pub continuous_scale: f64,

    /// Set on the final sample, when the fingers lift
    pub released: bool,
}

impl GestureSample {
    pub fn new(continuous_scale: f64, released: bool) -> Self {
        Self {
            continuous_scale,
            released,
        }
    }

    /// Intermediate sample of an ongoing pinch
    pub fn moving(continuous_scale: f64) -> Self {
        Self::new(continuous_scale, false)
    }

    /// Final sample of a pinch
    pub fn released(continuous_scale: f64) -> Self {
        Self::new(continuous_scale, true)
    }

    fn validate(&self) -> Result<(), ZoomError> {
        if !self.continuous_scale.is_finite() || self.continuous_scale < 0.0 {
            return Err(ZoomError::InvalidGesture(self.continuous_scale));
        }
        Ok(())
    }
}

/// Zoom state that survives between gestures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomSessionState {
    committed_scale: f64,
    current_lens: LensKind,
}

impl ZoomSessionState {
    /// Fresh state for a lens, starting at the lens default
    pub fn new(lens: LensKind) -> Self {
        Self {
            committed_scale: lens.default_zoom(),
            current_lens: lens,
        }
    }

    /// Fresh state for a lens whose default may sit outside the device bounds
    pub fn for_bounds(lens: LensKind, bounds: &DeviceBounds) -> Result<Self, ZoomError> {
        Ok(Self {
            committed_scale: bounds.clamp(lens.default_zoom())?,
            current_lens: lens,
        })
    }

    pub fn committed_scale(&self) -> f64 {
        self.committed_scale
    }

    pub fn current_lens(&self) -> LensKind {
        self.current_lens
    }

    pub fn zoom_level(&self) -> ZoomLevel {
        ZoomLevel::new(self.current_lens, self.committed_scale)
    }
}

/// Decides when a zoom factor should hand over to another physical lens
pub trait LensSwitchPolicy {
    fn lens_should_change(&self, candidate: f64, bounds: &DeviceBounds) -> bool;
}

/// Keeps the active lens no matter how far the pinch goes
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSwitch;

impl LensSwitchPolicy for NeverSwitch {
    fn lens_should_change(&self, _candidate: f64, _bounds: &DeviceBounds) -> bool {
        false
    }
}

/// Result of feeding one gesture sample to the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomStep {
    /// Write `scale` to the device. `committed` is set on release.
    Apply { scale: f64, committed: bool },

    /// The policy asked for another lens; the device goes back to the
    /// committed scale and the state is left untouched.
    LensChangeRequested { revert_to: f64 },
}

impl ZoomStep {
    /// Zoom factor to write to the live device
    pub fn scale(&self) -> f64 {
        match *self {
            ZoomStep::Apply { scale, .. } => scale,
            ZoomStep::LensChangeRequested { revert_to } => revert_to,
        }
    }
}

/// Owns the zoom state of one active lens
#[derive(Debug, Clone)]
pub struct ZoomController<P = NeverSwitch> {
    state: ZoomSessionState,
    policy: P,
}

impl ZoomController<NeverSwitch> {
    pub fn new(lens: LensKind) -> Self {
        Self::with_policy(ZoomSessionState::new(lens), NeverSwitch)
    }

    /// Controller for a freshly activated device
    pub fn for_device(lens: LensKind, bounds: &DeviceBounds) -> Result<Self, ZoomError> {
        Ok(Self::with_policy(
            ZoomSessionState::for_bounds(lens, bounds)?,
            NeverSwitch,
        ))
    }
}

impl<P: LensSwitchPolicy> ZoomController<P> {
    pub fn with_policy(state: ZoomSessionState, policy: P) -> Self {
        Self { state, policy }
    }

    pub fn state(&self) -> &ZoomSessionState {
        &self.state
    }

    /// Discards the current state for a newly activated lens
    pub fn reset(&mut self, lens: LensKind, bounds: &DeviceBounds) -> Result<(), ZoomError> {
        self.state = ZoomSessionState::for_bounds(lens, bounds)?;
        debug!(lens = %lens, scale = %self.state.committed_scale, "Zoom state reset");
        Ok(())
    }

    /// Computes the zoom factor for one gesture sample.
    ///
    /// The returned step always carries a factor inside `bounds`. The
    /// committed scale only moves when `sample.released` is set, so a pinch
    /// abandoned halfway leaves the previous baseline intact.
    pub fn apply_gesture(
        &mut self,
        sample: GestureSample,
        bounds: &DeviceBounds,
    ) -> Result<ZoomStep, ZoomError> {
        bounds.validate()?;
        sample.validate()?;

        let committed = self.state.committed_scale;
        let candidate = if sample.continuous_scale > GESTURE_NEUTRAL_SCALE {
            committed + (sample.continuous_scale - GESTURE_NEUTRAL_SCALE)
        } else {
            committed - (GESTURE_NEUTRAL_SCALE - sample.continuous_scale) * committed
        };
        let candidate = bounds.clamp(candidate)?;

        if self.policy.lens_should_change(candidate, bounds) {
            debug!(
                lens = %self.state.current_lens,
                candidate = %candidate,
                "Lens change requested, reverting zoom"
            );
            return Ok(ZoomStep::LensChangeRequested {
                revert_to: committed,
            });
        }

        if sample.released {
            self.state.committed_scale = candidate;
            debug!(lens = %self.state.current_lens, scale = %candidate, "Zoom committed");
        }

        Ok(ZoomStep::Apply {
            scale: candidate,
            committed: sample.released,
        })
    }
}

/// Applies one sample to `state` with no lens switching and returns the
/// zoom factor to write to the device.
pub fn apply_gesture(
    sample: GestureSample,
    bounds: &DeviceBounds,
    state: &mut ZoomSessionState,
) -> Result<f64, ZoomError> {
    let mut controller = ZoomController::with_policy(*state, NeverSwitch);
    let step = controller.apply_gesture(sample, bounds)?;
    *state = *controller.state();
    Ok(step.scale())
}
