//! Camera recording CLI
//!
//! Drives a recording session on the simulated camera rig: replays pinch
//! gestures, taps to focus and records a clip into the library.

use anyhow::{bail, Context, Result};
use camera_record::config::Config;
use camera_record::{
    DeviceInfo, DirectoryLibrary, FileOutputSink, FocusPoint, LensKind, Presenter,
    PresenterInput, PresenterOutput, RecordSession, RecordState,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "camera-record")]
#[command(about = "Record a clip with pinch-to-zoom on a simulated camera")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Pinch gesture as comma separated scales; the last one is the release
    #[arg(short, long, value_parser = parse_gesture)]
    gesture: Vec<Gesture>,

    /// Tap-to-focus point in normalized coordinates, e.g. 0.5,0.5
    #[arg(short, long, value_parser = parse_focus)]
    focus: Option<FocusPoint>,

    /// Lens to switch to after setup
    #[arg(short, long)]
    lens: Option<LensKind>,

    /// Length of the recorded clip (0 skips recording)
    #[arg(short, long, default_value_t = 2)]
    record_seconds: u64,
}

/// Scales of one pinch, in the order the recognizer reported them
#[derive(Debug, Clone)]
struct Gesture(Vec<f64>);

fn parse_gesture(s: &str) -> Result<Gesture, String> {
    if s.trim().is_empty() {
        return Err("gesture needs at least one scale".to_string());
    }
    let scales = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("{}: {}", v, e)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Gesture(scales))
}

fn parse_focus(s: &str) -> Result<FocusPoint, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y got {}", s))?;
    let x = x.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let y = y.trim().parse::<f64>().map_err(|e| e.to_string())?;
    FocusPoint::new(x, y).map_err(|e| e.to_string())
}

/// View that reports everything to the log
struct LogView;

impl PresenterOutput for LogView {
    fn camera_setup_complete(&mut self, info: &DeviceInfo) {
        info!(
            camera = info.lens.display_name(),
            min_zoom = %info.bounds.min_zoom,
            max_zoom = %info.bounds.max_zoom,
            fps = %info.fps,
            "Preview ready"
        );
    }

    fn on_stop_watch_time(&mut self, elapsed: Duration) {
        info!(elapsed = %format!("{:.1}s", elapsed.as_secs_f64()), "Stopwatch");
    }

    fn on_lens_changed(&mut self, info: &DeviceInfo) {
        info!(camera = info.lens.display_name(), "Lens changed");
    }

    fn on_zoom_changed(&mut self, scale: f64) {
        info!(zoom = %format!("{:.2}x", scale), "Zoom");
    }

    fn on_record_state_changed(&mut self, state: RecordState) {
        info!(state = ?state, "Record state");
    }

    fn on_recording_saved(&mut self, path: &Path) {
        info!(path = %path.display(), "Clip saved");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt().with_env_filter(filter).with_target(false).init();

    info!("Camera recorder starting");

    // Load configuration
    let config = if cli.config.exists() {
        info!(config_path = %cli.config.display(), "Loading configuration");
        Config::load(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        info!(config_path = %cli.config.display(), "No configuration file, using defaults");
        Config::default()
    };

    let (session, events) = RecordSession::new(
        &config,
        config.simulated_rig(),
        FileOutputSink::new(),
        DirectoryLibrary::new(&config.recording.library_dir),
    );
    let mut presenter = Presenter::new(session, events, LogView);

    // Session setup runs as its own task; wait for it before taking input
    let setup = tokio::spawn(async move {
        let result = presenter.start().await;
        (presenter, result)
    });
    let (mut presenter, result) = setup.await.context("session setup task failed")?;
    result.context("no camera available")?;

    if let Some(lens) = cli.lens {
        presenter.on_select_lens(lens);
    }

    if let Some(point) = cli.focus {
        presenter.on_change_camera_focus(point);
    }

    let recording = cli.record_seconds > 0;
    if recording {
        presenter.on_record_state(RecordState::Recording).await;
        if presenter.model().record_state() != RecordState::Recording {
            bail!("recording did not start");
        }
    }

    for Gesture(scales) in &cli.gesture {
        let last = scales.len() - 1;
        for (i, scale) in scales.iter().enumerate() {
            presenter.on_changed_pinch_gesture(i == last, *scale);
        }
        if let Some(state) = presenter.model().zoom_state() {
            info!(
                lens = %state.current_lens(),
                committed = %state.committed_scale(),
                "Gesture finished"
            );
        }
    }

    if recording {
        let deadline = Duration::from_secs(cli.record_seconds);
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        let started = tokio::time::Instant::now();
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    presenter.refresh_stop_watch();
                    if started.elapsed() >= deadline {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted, finishing clip");
                    break;
                }
            }
        }

        presenter.on_record_state(RecordState::Stopped).await;
        if presenter.model().record_state() == RecordState::Error {
            bail!("recording could not be saved");
        }
    }

    info!("Shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gesture() {
        let Gesture(scales) = parse_gesture("1.2, 1.5,2").unwrap();
        assert_eq!(scales, vec![1.2, 1.5, 2.0]);

        assert_eq!(
            parse_gesture("  ").unwrap_err(),
            "gesture needs at least one scale"
        );
        assert!(parse_gesture("1.2,,1.5").is_err());
    }

    #[test]
    fn test_parse_focus() {
        assert_eq!(parse_focus("0.25,0.75").unwrap(), FocusPoint::new(0.25, 0.75).unwrap());
        assert!(parse_focus("0.5").is_err());
        assert!(parse_focus("1.5,0.5").is_err());
    }
}
