//! Clip recording
//!
//! The recorder drives a [`RecordingSink`] that writes the movie file and
//! hands the finished file to a [`MediaLibrary`]. Encoding and container
//! layout belong to the sink; nothing here touches frames.

mod file_output;

pub use file_output::{DirectoryLibrary, FileOutputSink};

use crate::config::RecordingConfig;
use crate::zoom::LensKind;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no active capture device")]
    DeviceUnavailable,

    #[error("already recording")]
    AlreadyRecording,

    #[error("not recording")]
    NotRecording,

    #[error("invalid file name format: {0}")]
    FileName(String),

    #[error("recording sink error: {0}")]
    Sink(String),

    #[error("failed to save clip to library: {0}")]
    Library(String),
}

/// Recording state shown by the record button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordState {
    #[default]
    Stopped,
    Recording,
    Error,
}

/// Writes a movie file while recording
#[async_trait]
pub trait RecordingSink: Send {
    /// Begins writing a new file at `path`, or next to it when that name is
    /// taken, and returns the file actually opened. Existing files are never
    /// overwritten.
    async fn start(&mut self, path: &Path) -> Result<PathBuf, RecordingError>;

    /// Finalizes the file and returns where it was written
    async fn finish(&mut self) -> Result<PathBuf, RecordingError>;
}

/// Persists finished clips where the user can find them
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    async fn save_video(&self, path: &Path) -> Result<PathBuf, RecordingError>;
}

/// Start/stop state machine around a sink and a library
pub struct Recorder<S, L> {
    config: RecordingConfig,
    sink: S,
    library: L,
    state: RecordState,
    current_path: Option<PathBuf>,
    started_at: Option<Instant>,
}

impl<S: RecordingSink, L: MediaLibrary> Recorder<S, L> {
    pub fn new(config: RecordingConfig, sink: S, library: L) -> Self {
        Self {
            config,
            sink,
            library,
            state: RecordState::Stopped,
            current_path: None,
            started_at: None,
        }
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    /// File currently being written
    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    /// Time spent in the current recording
    pub fn elapsed(&self) -> Duration {
        match (self.state, self.started_at) {
            (RecordState::Recording, Some(started)) => started.elapsed(),
            _ => Duration::ZERO,
        }
    }

    pub fn library(&self) -> &L {
        &self.library
    }

    /// Output file for a recording started at `now`
    pub fn output_path_for(&self, now: DateTime<Local>) -> Result<PathBuf, RecordingError> {
        let mut name = String::new();
        write!(name, "{}", now.format(&self.config.file_name_format))
            .map_err(|_| RecordingError::FileName(self.config.file_name_format.clone()))?;

        Ok(self
            .config
            .output_dir
            .join(format!("{}.{}", name, self.config.file_extension)))
    }

    /// Starts a recording on the active lens.
    ///
    /// Without a lens the recorder moves to [`RecordState::Error`]. Starting
    /// while already recording is refused and leaves the state alone.
    pub async fn start(&mut self, lens: Option<LensKind>) -> Result<PathBuf, RecordingError> {
        if self.state == RecordState::Recording {
            warn!("Start requested while already recording");
            return Err(RecordingError::AlreadyRecording);
        }

        let Some(lens) = lens else {
            error!("Cannot start recording without an active camera");
            self.state = RecordState::Error;
            return Err(RecordingError::DeviceUnavailable);
        };

        let requested = match self.output_path_for(Local::now()) {
            Ok(path) => path,
            Err(e) => return Err(self.fail_start(e)),
        };

        let path = match self.sink.start(&requested).await {
            Ok(path) => path,
            Err(e) => return Err(self.fail_start(e)),
        };

        info!(lens = %lens, path = %path.display(), "Recording started");
        self.state = RecordState::Recording;
        self.current_path = Some(path.clone());
        self.started_at = Some(Instant::now());
        Ok(path)
    }

    fn fail_start(&mut self, e: RecordingError) -> RecordingError {
        error!(error = %e, "Failed to start recording");
        self.state = RecordState::Error;
        e
    }

    /// Stops the recording and saves the clip to the library.
    ///
    /// A failure while finalizing or saving is logged and leaves the
    /// recorder in [`RecordState::Error`]; nothing is retried.
    pub async fn stop(&mut self) -> Result<PathBuf, RecordingError> {
        if self.state != RecordState::Recording {
            return Err(RecordingError::NotRecording);
        }

        let elapsed = self.elapsed();
        self.started_at = None;
        self.current_path = None;

        let result = match self.sink.finish().await {
            Ok(file) => self.library.save_video(&file).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(saved) => {
                info!(
                    path = %saved.display(),
                    seconds = %format!("{:.1}", elapsed.as_secs_f64()),
                    "Clip saved"
                );
                self.state = RecordState::Stopped;
                Ok(saved)
            }
            Err(e) => {
                error!(error = %e, "Failed to save recording");
                self.state = RecordState::Error;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct NullSink;

    #[async_trait]
    impl RecordingSink for NullSink {
        async fn start(&mut self, path: &Path) -> Result<PathBuf, RecordingError> {
            Ok(path.to_path_buf())
        }

        async fn finish(&mut self) -> Result<PathBuf, RecordingError> {
            Ok(PathBuf::from("clip.mov"))
        }
    }

    struct NullLibrary;

    #[async_trait]
    impl MediaLibrary for NullLibrary {
        async fn save_video(&self, path: &Path) -> Result<PathBuf, RecordingError> {
            Ok(path.to_path_buf())
        }
    }

    fn recorder() -> Recorder<NullSink, NullLibrary> {
        let config = RecordingConfig {
            output_dir: PathBuf::from("out"),
            ..RecordingConfig::default()
        };
        Recorder::new(config, NullSink, NullLibrary)
    }

    #[test]
    fn test_output_path_uses_timestamp() {
        let recorder = recorder();
        let now = Local.with_ymd_and_hms(2023, 3, 28, 14, 5, 9).unwrap();

        let path = recorder.output_path_for(now).unwrap();

        assert_eq!(path, PathBuf::from("out/2023-03-28_14-05-09.mov"));
    }

    #[tokio::test]
    async fn test_start_stop_cycle() {
        let mut recorder = recorder();
        assert_eq!(recorder.state(), RecordState::Stopped);

        recorder.start(Some(LensKind::Wide)).await.unwrap();
        assert_eq!(recorder.state(), RecordState::Recording);
        assert!(recorder.current_path().is_some());

        let saved = recorder.stop().await.unwrap();
        assert_eq!(saved, PathBuf::from("clip.mov"));
        assert_eq!(recorder.state(), RecordState::Stopped);
        assert_eq!(recorder.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_start_without_device_errors() {
        let mut recorder = recorder();

        let result = recorder.start(None).await;

        assert!(matches!(result, Err(RecordingError::DeviceUnavailable)));
        assert_eq!(recorder.state(), RecordState::Error);
    }

    #[tokio::test]
    async fn test_double_start_keeps_recording() {
        let mut recorder = recorder();
        recorder.start(Some(LensKind::Wide)).await.unwrap();

        let result = recorder.start(Some(LensKind::Wide)).await;

        assert!(matches!(result, Err(RecordingError::AlreadyRecording)));
        assert_eq!(recorder.state(), RecordState::Recording);
    }

    #[tokio::test]
    async fn test_stop_when_stopped() {
        let mut recorder = recorder();
        assert!(matches!(
            recorder.stop().await,
            Err(RecordingError::NotRecording)
        ));
        assert_eq!(recorder.state(), RecordState::Stopped);
    }
}
