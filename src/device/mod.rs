//! Capture device handle and configuration locking

mod simulated;

pub use simulated::{SimulatedDevice, SimulatedLens, SimulatedRig};

use crate::zoom::{DeviceBounds, LensKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("configuration lock failed: {0}")]
    LockFailed(String),

    #[error("focus point out of range: ({x}, {y})")]
    InvalidFocusPoint { x: f64, y: f64 },

    #[error("no active capture device")]
    Unavailable,
}

/// Side of the phone the camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    #[default]
    Back,
    Front,
}

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraPosition::Back => f.write_str("back"),
            CameraPosition::Front => f.write_str("front"),
        }
    }
}

/// Point of interest in normalized device coordinates
///
/// (0, 0) is the top-left of the sensor in its native orientation and
/// (1, 1) the bottom-right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusPoint {
    pub x: f64,
    pub y: f64,
}

impl FocusPoint {
    pub fn new(x: f64, y: f64) -> Result<Self, DeviceError> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(x) || !in_range(y) {
            return Err(DeviceError::InvalidFocusPoint { x, y });
        }
        Ok(Self { x, y })
    }

    pub fn center() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusMode {
    Locked,
    Auto,
    #[default]
    ContinuousAuto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExposureMode {
    Locked,
    Auto,
    #[default]
    ContinuousAuto,
}

/// Hardware handle for one physical camera
///
/// Mutating setters may only be called between a successful
/// `lock_for_configuration` and the matching `unlock_for_configuration`.
/// Use [`ConfigurationGuard`] rather than calling the pair by hand.
pub trait CaptureDevice: Send {
    fn lens(&self) -> LensKind;

    fn position(&self) -> CameraPosition;

    fn zoom_bounds(&self) -> DeviceBounds;

    fn zoom_factor(&self) -> f64;

    fn frame_rate(&self) -> f64;

    fn supports_focus_point_of_interest(&self) -> bool;

    fn lock_for_configuration(&mut self) -> Result<(), DeviceError>;

    fn unlock_for_configuration(&mut self);

    fn set_zoom_factor(&mut self, factor: f64);

    fn set_focus(&mut self, point: FocusPoint, mode: FocusMode);

    fn set_exposure(&mut self, point: FocusPoint, mode: ExposureMode);
}

/// Finds capture devices by lens class
pub trait DeviceDiscovery {
    type Device: CaptureDevice;

    fn find(&self, lens: LensKind, position: CameraPosition) -> Option<Self::Device>;

    /// First available device in priority order
    fn find_first(
        &self,
        preferred: &[LensKind],
        position: CameraPosition,
    ) -> Option<Self::Device> {
        preferred.iter().find_map(|lens| self.find(*lens, position))
    }
}

/// Snapshot of the active device reported to the view
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceInfo {
    pub lens: LensKind,
    pub position: CameraPosition,
    pub bounds: DeviceBounds,
    pub fps: f64,
}

impl DeviceInfo {
    pub fn from_device<D: CaptureDevice + ?Sized>(device: &D) -> Self {
        Self {
            lens: device.lens(),
            position: device.position(),
            bounds: device.zoom_bounds(),
            fps: device.frame_rate(),
        }
    }
}

/// RAII guard for a device configuration lock
///
/// The lock is released when the guard is dropped, whether the work done
/// under it succeeded or not.
pub struct ConfigurationGuard<'a, D: CaptureDevice + ?Sized> {
    device: &'a mut D,
}

impl<'a, D: CaptureDevice + ?Sized> ConfigurationGuard<'a, D> {
    pub fn acquire(device: &'a mut D) -> Result<Self, DeviceError> {
        if let Err(e) = device.lock_for_configuration() {
            warn!(lens = %device.lens(), error = %e, "Device configuration lock refused");
            return Err(e);
        }
        debug!(lens = %device.lens(), "Device locked for configuration");
        Ok(Self { device })
    }
}

impl<D: CaptureDevice + ?Sized> Deref for ConfigurationGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        self.device
    }
}

impl<D: CaptureDevice + ?Sized> DerefMut for ConfigurationGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
    }
}

impl<D: CaptureDevice + ?Sized> Drop for ConfigurationGuard<'_, D> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
        debug!(lens = %self.device.lens(), "Device configuration unlocked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_point_range() {
        assert!(FocusPoint::new(0.0, 1.0).is_ok());
        assert_eq!(
            FocusPoint::new(1.2, 0.5),
            Err(DeviceError::InvalidFocusPoint { x: 1.2, y: 0.5 })
        );
        assert!(FocusPoint::new(0.5, f64::NAN).is_err());
    }

    #[test]
    fn test_guard_unlocks_on_drop() {
        let rig = SimulatedRig::default();
        let mut device = rig.find(LensKind::Wide, CameraPosition::Back).unwrap();

        {
            let mut guard = ConfigurationGuard::acquire(&mut device).unwrap();
            guard.set_zoom_factor(2.0);
            assert!(guard.is_locked());
        }

        assert!(!device.is_locked());
        assert_eq!(device.zoom_factor(), 2.0);
    }

    #[test]
    fn test_guard_is_not_reentrant() {
        let rig = SimulatedRig::default();
        let mut device = rig.find(LensKind::Wide, CameraPosition::Back).unwrap();

        device.lock_for_configuration().unwrap();
        assert!(ConfigurationGuard::acquire(&mut device).is_err());
        // a refused acquire must not release the lock held elsewhere
        assert!(device.is_locked());
    }

    #[test]
    fn test_find_first_uses_priority() {
        let rig = SimulatedRig::with_lenses(vec![SimulatedRig::lens(
            LensKind::Telephoto,
            3.0,
            15.0,
        )]);

        let device = rig
            .find_first(&[LensKind::Wide, LensKind::Telephoto], CameraPosition::Back)
            .unwrap();
        assert_eq!(device.lens(), LensKind::Telephoto);
        assert!(rig
            .find_first(&[LensKind::Ultrawide], CameraPosition::Back)
            .is_none());
    }

    #[test]
    fn test_device_info_snapshot() {
        let rig = SimulatedRig::default();
        let device = rig.find(LensKind::Ultrawide, CameraPosition::Back).unwrap();
        let info = DeviceInfo::from_device(&device);
        assert_eq!(info.lens, LensKind::Ultrawide);
        assert_eq!(info.bounds, DeviceBounds::new(0.5, 5.0));
        assert_eq!(info.fps, 30.0);
    }
}
