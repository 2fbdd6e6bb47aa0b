//! In-memory camera hardware
//!
//! Stands in for the platform capture framework on hosts without one. The
//! rig hands out devices per lens class and can be flipped into a busy
//! state so that configuration locks are refused.

use super::{CameraPosition, CaptureDevice, DeviceDiscovery, DeviceError, ExposureMode, FocusMode, FocusPoint};
use crate::zoom::{DeviceBounds, LensKind};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Hardware description of one simulated lens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedLens {
    pub kind: LensKind,

    #[serde(default)]
    pub position: CameraPosition,

    pub min_zoom: f64,

    pub max_zoom: f64,

    /// Autofocus at a point of interest
    #[serde(default = "default_supports_focus")]
    pub supports_focus: bool,
}

fn default_supports_focus() -> bool {
    true
}

/// Set of simulated cameras on one phone
#[derive(Debug, Clone)]
pub struct SimulatedRig {
    lenses: Vec<SimulatedLens>,
    fps: f64,
    busy: Arc<AtomicBool>,
}

impl SimulatedRig {
    pub fn new(lenses: Vec<SimulatedLens>, fps: f64) -> Self {
        Self {
            lenses,
            fps,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_lenses(lenses: Vec<SimulatedLens>) -> Self {
        Self::new(lenses, 30.0)
    }

    /// Back-facing lens with autofocus
    pub fn lens(kind: LensKind, min_zoom: f64, max_zoom: f64) -> SimulatedLens {
        SimulatedLens {
            kind,
            position: CameraPosition::Back,
            min_zoom,
            max_zoom,
            supports_focus: true,
        }
    }

    /// Triple-camera layout of a recent phone
    pub fn default_lenses() -> Vec<SimulatedLens> {
        vec![
            Self::lens(LensKind::Ultrawide, 0.5, 5.0),
            Self::lens(LensKind::Wide, 1.0, 10.0),
            Self::lens(LensKind::Telephoto, 3.0, 15.0),
        ]
    }

    /// Makes every device handed out by this rig refuse configuration locks
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Relaxed);
    }

    pub fn lenses(&self) -> &[SimulatedLens] {
        &self.lenses
    }
}

impl Default for SimulatedRig {
    fn default() -> Self {
        Self::with_lenses(Self::default_lenses())
    }
}

impl DeviceDiscovery for SimulatedRig {
    type Device = SimulatedDevice;

    fn find(&self, lens: LensKind, position: CameraPosition) -> Option<SimulatedDevice> {
        self.lenses
            .iter()
            .find(|l| l.kind == lens && l.position == position)
            .map(|l| SimulatedDevice::new(l.clone(), self.fps, Arc::clone(&self.busy)))
    }
}

/// One simulated camera
#[derive(Debug)]
pub struct SimulatedDevice {
    profile: SimulatedLens,
    fps: f64,
    zoom_factor: f64,
    locked: bool,
    busy: Arc<AtomicBool>,
    focus: Option<(FocusPoint, FocusMode)>,
    exposure: Option<(FocusPoint, ExposureMode)>,
    configuration_count: u64,
}

impl SimulatedDevice {
    fn new(profile: SimulatedLens, fps: f64, busy: Arc<AtomicBool>) -> Self {
        let bounds = DeviceBounds::new(profile.min_zoom, profile.max_zoom);
        let zoom_factor = bounds
            .clamp(profile.kind.default_zoom())
            .unwrap_or(profile.kind.default_zoom());

        Self {
            profile,
            fps,
            zoom_factor,
            locked: false,
            busy,
            focus: None,
            exposure: None,
            configuration_count: 0,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn focus(&self) -> Option<(FocusPoint, FocusMode)> {
        self.focus
    }

    pub fn exposure(&self) -> Option<(FocusPoint, ExposureMode)> {
        self.exposure
    }

    /// Number of successful lock/unlock cycles
    pub fn configuration_count(&self) -> u64 {
        self.configuration_count
    }

    fn check_locked(&self, setting: &str) -> bool {
        if !self.locked {
            warn!(lens = %self.profile.kind, setting, "Device setting changed without configuration lock");
        }
        self.locked
    }
}

impl CaptureDevice for SimulatedDevice {
    fn lens(&self) -> LensKind {
        self.profile.kind
    }

    fn position(&self) -> CameraPosition {
        self.profile.position
    }

    fn zoom_bounds(&self) -> DeviceBounds {
        DeviceBounds::new(self.profile.min_zoom, self.profile.max_zoom)
    }

    fn zoom_factor(&self) -> f64 {
        self.zoom_factor
    }

    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn supports_focus_point_of_interest(&self) -> bool {
        self.profile.supports_focus
    }

    fn lock_for_configuration(&mut self) -> Result<(), DeviceError> {
        if self.busy.load(Ordering::Relaxed) {
            return Err(DeviceError::LockFailed("device busy".to_string()));
        }
        if self.locked {
            return Err(DeviceError::LockFailed("already locked".to_string()));
        }
        self.locked = true;
        Ok(())
    }

    fn unlock_for_configuration(&mut self) {
        if self.locked {
            self.locked = false;
            self.configuration_count += 1;
        }
    }

    fn set_zoom_factor(&mut self, factor: f64) {
        if self.check_locked("zoom") {
            self.zoom_factor = factor;
        }
    }

    fn set_focus(&mut self, point: FocusPoint, mode: FocusMode) {
        if self.check_locked("focus") {
            self.focus = Some((point, mode));
        }
    }

    fn set_exposure(&mut self, point: FocusPoint, mode: ExposureMode) {
        if self.check_locked("exposure") {
            self.exposure = Some((point, mode));
        }
    }
}
