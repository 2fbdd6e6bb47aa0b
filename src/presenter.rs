//! Presenter between the recording view and the session

use crate::device::{DeviceInfo, FocusPoint};
use crate::recording::RecordState;
use crate::session::{ModelInput, SessionError, SessionEvent};
use crate::zoom::{GestureSample, LensKind};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Callbacks into the view
pub trait PresenterOutput {
    /// Preview can start
    fn camera_setup_complete(&mut self, info: &DeviceInfo);

    fn on_stop_watch_time(&mut self, elapsed: Duration);

    fn on_lens_changed(&mut self, _info: &DeviceInfo) {}

    fn on_zoom_changed(&mut self, _scale: f64) {}

    fn on_record_state_changed(&mut self, _state: RecordState) {}

    fn on_recording_saved(&mut self, _path: &Path) {}
}

/// User actions coming from the view
#[async_trait]
pub trait PresenterInput {
    async fn on_record_state(&mut self, state: RecordState);

    fn on_change_camera_focus(&mut self, point: FocusPoint);

    /// `released` is set when the fingers lift off the screen
    fn on_changed_pinch_gesture(&mut self, released: bool, pinch_zoom_scale: f64);

    fn on_select_lens(&mut self, lens: LensKind);
}

pub struct Presenter<M, V> {
    model: M,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    view: V,
}

impl<M: ModelInput, V: PresenterOutput> Presenter<M, V> {
    pub fn new(model: M, events: mpsc::UnboundedReceiver<SessionEvent>, view: V) -> Self {
        Self {
            model,
            events,
            view,
        }
    }

    /// Brings the camera up; resolves once the view has been told
    pub async fn start(&mut self) -> Result<DeviceInfo, SessionError> {
        let result = self.model.initialize().await;
        self.forward_events();
        result
    }

    /// Pushes the current recording time to the view
    pub fn refresh_stop_watch(&mut self) {
        let elapsed = self.model.recording_elapsed();
        self.view.on_stop_watch_time(elapsed);
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Delivers every pending session event to the view
    fn forward_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                SessionEvent::Initialized(info) => self.view.camera_setup_complete(&info),
                SessionEvent::LensChanged(info) => self.view.on_lens_changed(&info),
                SessionEvent::ZoomChanged { scale, .. } => self.view.on_zoom_changed(scale),
                SessionEvent::LensChangeRequested { lens, scale } => {
                    info!(lens = %lens, scale = %scale, "Lens change requested");
                    self.view.on_zoom_changed(scale);
                }
                SessionEvent::RecordStateChanged(state) => {
                    self.view.on_record_state_changed(state);
                    self.view.on_stop_watch_time(self.model.recording_elapsed());
                }
                SessionEvent::RecordingSaved(path) => self.view.on_recording_saved(&path),
            }
        }
    }
}

#[async_trait]
impl<M, V> PresenterInput for Presenter<M, V>
where
    M: ModelInput + Send,
    V: PresenterOutput + Send,
{
    async fn on_record_state(&mut self, state: RecordState) {
        if let Err(e) = self.model.change_record_state(state).await {
            warn!(requested = ?state, error = %e, "Record state change failed");
        }
        self.forward_events();
    }

    fn on_change_camera_focus(&mut self, point: FocusPoint) {
        if let Err(e) = self.model.change_camera_focus(point) {
            warn!(error = %e, "Focus change failed");
        }
        self.forward_events();
    }

    fn on_changed_pinch_gesture(&mut self, released: bool, pinch_zoom_scale: f64) {
        let sample = GestureSample::new(pinch_zoom_scale, released);
        if let Err(e) = self.model.change_camera_zoom(sample) {
            warn!(scale = %pinch_zoom_scale, error = %e, "Zoom sample skipped");
        }
        self.forward_events();
    }

    fn on_select_lens(&mut self, lens: LensKind) {
        match self.model.switch_lens(lens) {
            Ok(true) => {}
            Ok(false) => info!(lens = %lens, "Lens not available"),
            Err(e) => warn!(lens = %lens, error = %e, "Lens switch failed"),
        }
        self.forward_events();
    }
}
