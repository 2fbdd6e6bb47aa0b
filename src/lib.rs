//! Camera recording screen core
//!
//! This library provides the logic behind a phone camera recording screen:
//! - Pinch-to-zoom bookkeeping clamped to the hardware zoom range
//! - Lens ordering and neighbour lookups across ultrawide, wide and telephoto
//! - Tap-to-focus and zoom changes under a scoped device configuration lock
//! - A start/stop recorder that saves finished clips to a media library
//!
//! # Example
//!
//! ```
//! use camera_record::zoom::{apply_gesture, DeviceBounds, GestureSample, LensKind, ZoomSessionState};
//!
//! let bounds = DeviceBounds::new(0.5, 10.0);
//! let mut state = ZoomSessionState::new(LensKind::Wide);
//!
//! let scale = apply_gesture(GestureSample::released(1.5), &bounds, &mut state).unwrap();
//! assert_eq!(scale, 1.5);
//! assert_eq!(state.committed_scale(), 1.5);
//! ```

pub mod config;
pub mod device;
pub mod presenter;
pub mod recording;
pub mod session;
pub mod zoom;

// Re-exports for convenience
pub use device::{CaptureDevice, DeviceDiscovery, DeviceInfo, FocusPoint, SimulatedRig};
pub use presenter::{Presenter, PresenterInput, PresenterOutput};
pub use recording::{DirectoryLibrary, FileOutputSink, RecordState, Recorder};
pub use session::{ModelInput, RecordSession, SessionError, SessionEvent};
pub use zoom::{DeviceBounds, GestureSample, LensKind, ZoomController, ZoomLevel};
