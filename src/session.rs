//! Recording session: the active camera, its zoom state and the recorder
//!
//! The session is driven through [`ModelInput`] and reports back over the
//! [`SessionEvent`] channel handed out by [`RecordSession::new`]. All calls
//! take `&mut self`, so one session is only ever mutated from one place.

use crate::config::{CameraConfig, Config};
use crate::device::{
    CameraPosition, CaptureDevice, ConfigurationGuard, DeviceDiscovery, DeviceError, DeviceInfo,
    ExposureMode, FocusMode, FocusPoint,
};
use crate::recording::{MediaLibrary, RecordState, Recorder, RecordingError, RecordingSink};
use crate::zoom::{GestureSample, LensKind, ZoomController, ZoomError, ZoomSessionState, ZoomStep};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no capture device available on the {0} side")]
    NoDevice(CameraPosition),

    #[error("cannot switch lens while recording")]
    Busy,

    #[error("unsupported record state request: {0:?}")]
    UnsupportedRecordState(RecordState),

    #[error(transparent)]
    Zoom(#[from] ZoomError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Recording(#[from] RecordingError),
}

/// Notifications from the session to its presenter
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Initialized(DeviceInfo),
    LensChanged(DeviceInfo),
    ZoomChanged {
        lens: LensKind,
        scale: f64,
        committed: bool,
    },
    LensChangeRequested {
        lens: LensKind,
        scale: f64,
    },
    RecordStateChanged(RecordState),
    RecordingSaved(PathBuf),
}

/// Direction to step through the physical lenses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Commands the presenter issues to the session
#[async_trait]
pub trait ModelInput {
    /// Discovers a camera and prepares it for preview
    async fn initialize(&mut self) -> Result<DeviceInfo, SessionError>;

    /// `Recording` starts a clip, `Stopped` finishes and saves it
    async fn change_record_state(&mut self, state: RecordState) -> Result<RecordState, SessionError>;

    fn change_camera_focus(&mut self, point: FocusPoint) -> Result<(), SessionError>;

    /// Returns the zoom factor written to the device
    fn change_camera_zoom(&mut self, sample: GestureSample) -> Result<f64, SessionError>;

    /// Returns false when the phone has no such lens
    fn switch_lens(&mut self, lens: LensKind) -> Result<bool, SessionError>;

    fn recording_elapsed(&self) -> Duration;
}

pub struct RecordSession<R: DeviceDiscovery, S, L> {
    camera: CameraConfig,
    discovery: R,
    device: Option<R::Device>,
    zoom: Option<ZoomController>,
    recorder: Recorder<S, L>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<R, S, L> RecordSession<R, S, L>
where
    R: DeviceDiscovery,
    S: RecordingSink,
    L: MediaLibrary,
{
    /// Creates an idle session and the receiving end of its event channel
    pub fn new(
        config: &Config,
        discovery: R,
        sink: S,
        library: L,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            camera: config.camera.clone(),
            discovery,
            device: None,
            zoom: None,
            recorder: Recorder::new(config.recording.clone(), sink, library),
            events,
        };
        (session, events_rx)
    }

    pub fn device(&self) -> Option<&R::Device> {
        self.device.as_ref()
    }

    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.device.as_ref().map(DeviceInfo::from_device)
    }

    pub fn zoom_state(&self) -> Option<&ZoomSessionState> {
        self.zoom.as_ref().map(ZoomController::state)
    }

    pub fn record_state(&self) -> RecordState {
        self.recorder.state()
    }

    pub fn recorder(&self) -> &Recorder<S, L> {
        &self.recorder
    }

    /// Switches to the next narrower or wider lens
    pub fn step_lens(&mut self, direction: ZoomDirection) -> Result<bool, SessionError> {
        let current = self
            .device
            .as_ref()
            .map(|d| d.lens())
            .ok_or(DeviceError::Unavailable)?;

        let target = match direction {
            ZoomDirection::In => current.zoomed_in(),
            ZoomDirection::Out => current.zoomed_out(),
        };

        if target == current {
            debug!(lens = %current, "No further lens in that direction");
            return Ok(false);
        }

        self.replace_device(target)
    }

    pub async fn start_recording(&mut self) -> Result<PathBuf, SessionError> {
        let lens = self.device.as_ref().map(|d| d.lens());
        let before = self.recorder.state();
        let result = self.recorder.start(lens).await;
        self.emit_state_change(before);
        Ok(result?)
    }

    pub async fn stop_recording(&mut self) -> Result<PathBuf, SessionError> {
        let before = self.recorder.state();
        let result = self.recorder.stop().await;
        self.emit_state_change(before);
        let saved = result?;
        self.emit(SessionEvent::RecordingSaved(saved.clone()));
        Ok(saved)
    }

    /// Makes `device` the active camera with a fresh zoom state.
    ///
    /// Nothing is replaced unless the new device reports usable bounds.
    fn activate(&mut self, mut device: R::Device) -> Result<DeviceInfo, SessionError> {
        let lens = device.lens();
        let bounds = device.zoom_bounds();
        let zoom = ZoomController::for_device(lens, &bounds)?;

        match ConfigurationGuard::acquire(&mut device) {
            Ok(mut guard) => guard.set_zoom_factor(zoom.state().committed_scale()),
            Err(e) => warn!(lens = %lens, error = %e, "Could not apply initial zoom"),
        }

        let info = DeviceInfo::from_device(&device);
        info!(
            lens = %lens,
            position = %info.position,
            min_zoom = %bounds.min_zoom,
            max_zoom = %bounds.max_zoom,
            fps = %info.fps,
            "Camera activated"
        );

        self.device = Some(device);
        self.zoom = Some(zoom);
        Ok(info)
    }

    fn replace_device(&mut self, lens: LensKind) -> Result<bool, SessionError> {
        if self.recorder.state() == RecordState::Recording {
            return Err(SessionError::Busy);
        }

        if self.device.as_ref().map(|d| d.lens()) == Some(lens) {
            return Ok(true);
        }

        let Some(device) = self.discovery.find(lens, self.camera.position) else {
            info!(lens = %lens, "Lens not available, keeping current camera");
            return Ok(false);
        };

        // the current camera stays active if the new one cannot be set up
        let info = self.activate(device)?;
        self.emit(SessionEvent::LensChanged(info));
        Ok(true)
    }

    fn emit_state_change(&self, before: RecordState) {
        let state = self.recorder.state();
        if state != before {
            self.emit(SessionEvent::RecordStateChanged(state));
        }
    }

    fn emit(&self, event: SessionEvent) {
        // the presenter may already be gone during shutdown
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl<R, S, L> ModelInput for RecordSession<R, S, L>
where
    R: DeviceDiscovery + Send,
    S: RecordingSink,
    L: MediaLibrary,
{
    async fn initialize(&mut self) -> Result<DeviceInfo, SessionError> {
        let position = self.camera.position;
        let device = self
            .discovery
            .find_first(&self.camera.preferred_lenses, position)
            .ok_or(SessionError::NoDevice(position))?;

        let info = self.activate(device)?;
        self.emit(SessionEvent::Initialized(info));
        Ok(info)
    }

    async fn change_record_state(&mut self, state: RecordState) -> Result<RecordState, SessionError> {
        match state {
            RecordState::Recording => {
                self.start_recording().await?;
            }
            RecordState::Stopped => {
                self.stop_recording().await?;
            }
            RecordState::Error => return Err(SessionError::UnsupportedRecordState(state)),
        }
        Ok(self.recorder.state())
    }

    fn change_camera_focus(&mut self, point: FocusPoint) -> Result<(), SessionError> {
        let Some(device) = self.device.as_mut() else {
            warn!("Focus requested without an active camera");
            return Err(DeviceError::Unavailable.into());
        };

        let mut guard = ConfigurationGuard::acquire(device)?;
        if guard.supports_focus_point_of_interest() {
            guard.set_focus(point, FocusMode::Auto);
        } else {
            debug!(lens = %guard.lens(), "Focus point of interest not supported");
        }
        guard.set_exposure(point, ExposureMode::Auto);

        debug!(x = %point.x, y = %point.y, "Focus point set");
        Ok(())
    }

    fn change_camera_zoom(&mut self, sample: GestureSample) -> Result<f64, SessionError> {
        let (Some(device), Some(zoom)) = (self.device.as_mut(), self.zoom.as_mut()) else {
            warn!("Zoom requested without an active camera");
            return Err(ZoomError::DeviceUnavailable.into());
        };

        let lens = zoom.state().current_lens();
        let bounds = device.zoom_bounds();
        let mut guard = ConfigurationGuard::acquire(device)
            .map_err(|e| ZoomError::HardwareLock(e.to_string()))?;

        let step = zoom.apply_gesture(sample, &bounds)?;
        guard.set_zoom_factor(step.scale());
        drop(guard);

        let event = match step {
            ZoomStep::Apply { scale, committed } => SessionEvent::ZoomChanged {
                lens,
                scale,
                committed,
            },
            ZoomStep::LensChangeRequested { revert_to } => SessionEvent::LensChangeRequested {
                lens,
                scale: revert_to,
            },
        };
        self.emit(event);

        Ok(step.scale())
    }

    fn switch_lens(&mut self, lens: LensKind) -> Result<bool, SessionError> {
        self.replace_device(lens)
    }

    fn recording_elapsed(&self) -> Duration {
        self.recorder.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SimulatedRig;
    use crate::recording::{DirectoryLibrary, FileOutputSink};

    type TestSession = RecordSession<SimulatedRig, FileOutputSink, DirectoryLibrary>;

    fn session(rig: SimulatedRig) -> (TestSession, mpsc::UnboundedReceiver<SessionEvent>) {
        let config = Config::default();
        RecordSession::new(&config, rig, FileOutputSink::new(), DirectoryLibrary::new("library"))
    }

    #[tokio::test]
    async fn test_initialize_picks_preferred_lens() {
        let (mut session, mut events) = session(SimulatedRig::default());

        let info = session.initialize().await.unwrap();

        assert_eq!(info.lens, LensKind::Wide);
        assert_eq!(session.zoom_state().unwrap().committed_scale(), 1.0);
        assert_eq!(events.try_recv().unwrap(), SessionEvent::Initialized(info));
    }

    #[tokio::test]
    async fn test_initialize_without_devices() {
        let (mut session, _events) = session(SimulatedRig::with_lenses(vec![]));

        assert!(matches!(
            session.initialize().await,
            Err(SessionError::NoDevice(CameraPosition::Back))
        ));
        assert!(session.device().is_none());
    }

    #[test]
    fn test_zoom_before_initialize() {
        let (mut session, _events) = session(SimulatedRig::default());

        let result = session.change_camera_zoom(GestureSample::released(1.5));

        assert!(matches!(
            result,
            Err(SessionError::Zoom(ZoomError::DeviceUnavailable))
        ));
    }

    #[tokio::test]
    async fn test_refused_stop_emits_nothing() {
        let (mut session, mut events) = session(SimulatedRig::default());

        let result = session.stop_recording().await;

        assert!(matches!(
            result,
            Err(SessionError::Recording(RecordingError::NotRecording))
        ));
        assert_eq!(session.record_state(), RecordState::Stopped);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_step_lens_saturates() {
        let (mut session, _events) = session(SimulatedRig::default());
        session.initialize().await.unwrap();

        assert!(session.step_lens(ZoomDirection::In).unwrap());
        assert_eq!(session.device().unwrap().lens(), LensKind::Telephoto);
        assert!(!session.step_lens(ZoomDirection::In).unwrap());
        assert_eq!(session.zoom_state().unwrap().committed_scale(), 3.0);
    }
}
