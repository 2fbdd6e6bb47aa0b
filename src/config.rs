//! Configuration management for the recording screen

use crate::device::{CameraPosition, SimulatedLens, SimulatedRig};
use crate::zoom::LensKind;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub recording: RecordingConfig,

    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Capture device selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Which side of the phone to record from
    #[serde(default)]
    pub position: CameraPosition,

    /// Discovery priority; the first lens present is activated
    #[serde(default = "default_preferred_lenses")]
    pub preferred_lenses: Vec<LensKind>,

    /// Frames per second
    #[serde(default = "default_fps")]
    pub fps: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: CameraPosition::Back,
            preferred_lenses: default_preferred_lenses(),
            fps: default_fps(),
        }
    }
}

/// Where clips are written and saved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Directory the sink writes in-progress clips to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Directory acting as the media library
    #[serde(default = "default_library_dir")]
    pub library_dir: PathBuf,

    /// Container file extension
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// strftime pattern for clip file names
    #[serde(default = "default_file_name_format")]
    pub file_name_format: String,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            library_dir: default_library_dir(),
            file_extension: default_file_extension(),
            file_name_format: default_file_name_format(),
        }
    }
}

/// Simulated camera hardware
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "SimulatedRig::default_lenses")]
    pub lenses: Vec<SimulatedLens>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            lenses: SimulatedRig::default_lenses(),
        }
    }
}

// Default value functions
fn default_preferred_lenses() -> Vec<LensKind> {
    vec![LensKind::Wide, LensKind::Ultrawide, LensKind::Telephoto]
}
fn default_fps() -> f64 {
    30.0
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("recordings")
}
fn default_library_dir() -> PathBuf {
    PathBuf::from("library")
}
fn default_file_extension() -> String {
    "mov".to_string()
}
fn default_file_name_format() -> String {
    "%Y-%m-%d_%H-%M-%S".to_string()
}

impl Config {
    /// Loads configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Loads configuration from TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Simulated camera rig described by this configuration
    pub fn simulated_rig(&self) -> SimulatedRig {
        SimulatedRig::new(self.simulator.lenses.clone(), self.camera.fps)
    }

    /// Validates configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cam = &self.camera;

        if cam.preferred_lenses.is_empty() {
            return Err(ConfigError::Invalid(
                "camera.preferred_lenses must not be empty".to_string(),
            ));
        }

        if !(cam.fps > 0.0 && cam.fps <= 240.0) {
            return Err(ConfigError::Invalid(format!(
                "camera.fps must be in (0, 240], got {}",
                cam.fps
            )));
        }

        self.validate_recording()?;

        let mut seen = HashSet::new();
        for lens in &self.simulator.lenses {
            self.validate_lens(lens)?;
            if !seen.insert((lens.kind, lens.position)) {
                return Err(ConfigError::Invalid(format!(
                    "simulator: duplicate {} lens on the {} side",
                    lens.kind, lens.position
                )));
            }
        }

        Ok(())
    }

    fn validate_recording(&self) -> Result<(), ConfigError> {
        let rec = &self.recording;

        if rec.file_extension.is_empty()
            || rec.file_extension.contains(['.', '/', '\\'])
        {
            return Err(ConfigError::Invalid(format!(
                "recording.file_extension must be a bare extension, got {:?}",
                rec.file_extension
            )));
        }

        if rec.file_name_format.is_empty() || rec.file_name_format.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "recording.file_name_format must be a plain file name, got {:?}",
                rec.file_name_format
            )));
        }

        if StrftimeItems::new(&rec.file_name_format).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::Invalid(format!(
                "recording.file_name_format is not a valid strftime pattern: {:?}",
                rec.file_name_format
            )));
        }

        Ok(())
    }

    fn validate_lens(&self, lens: &SimulatedLens) -> Result<(), ConfigError> {
        if !(lens.min_zoom.is_finite() && lens.max_zoom.is_finite()) || lens.min_zoom <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "simulator.{}: zoom bounds must be positive, got {}..{}",
                lens.kind, lens.min_zoom, lens.max_zoom
            )));
        }

        if lens.min_zoom > lens.max_zoom {
            return Err(ConfigError::Invalid(format!(
                "simulator.{}: min_zoom {} exceeds max_zoom {}",
                lens.kind, lens.min_zoom, lens.max_zoom
            )));
        }

        Ok(())
    }

    /// Saves configuration to TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.camera.position, CameraPosition::Back);
        assert_eq!(config.camera.preferred_lenses[0], LensKind::Wide);
        assert_eq!(config.camera.fps, 30.0);
        assert_eq!(config.recording.file_extension, "mov");
        assert_eq!(config.simulator.lenses.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
[camera]
position = "back"
preferred_lenses = ["telephoto", "wide"]
fps = 60.0

[recording]
output_dir = "/tmp/clips"
library_dir = "/tmp/library"
file_extension = "mp4"
file_name_format = "clip_%H%M%S"

[[simulator.lenses]]
kind = "wide"
min_zoom = 1.0
max_zoom = 8.0

[[simulator.lenses]]
kind = "telephoto"
min_zoom = 2.0
max_zoom = 12.0
supports_focus = false
        "#;

        let config = Config::from_str(toml).unwrap();

        assert_eq!(
            config.camera.preferred_lenses,
            vec![LensKind::Telephoto, LensKind::Wide]
        );
        assert_eq!(config.camera.fps, 60.0);
        assert_eq!(config.recording.output_dir, PathBuf::from("/tmp/clips"));
        assert_eq!(config.recording.file_extension, "mp4");
        assert_eq!(config.simulator.lenses.len(), 2);
        assert!(config.simulator.lenses[0].supports_focus);
        assert!(!config.simulator.lenses[1].supports_focus);
        assert_eq!(config.simulator.lenses[1].position, CameraPosition::Back);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.recording.file_name_format, "%Y-%m-%d_%H-%M-%S");
        assert_eq!(config.simulator.lenses.len(), 3);
    }

    #[test]
    fn test_invalid_fps() {
        let toml = r#"
[camera]
fps = 0.0
        "#;

        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_invalid_lens_bounds() {
        let toml = r#"
[[simulator.lenses]]
kind = "wide"
min_zoom = 5.0
max_zoom = 1.0
        "#;

        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_duplicate_lens() {
        let toml = r#"
[[simulator.lenses]]
kind = "wide"
min_zoom = 1.0
max_zoom = 5.0

[[simulator.lenses]]
kind = "wide"
min_zoom = 1.0
max_zoom = 8.0
        "#;

        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_invalid_file_name_format() {
        let toml = r#"
[recording]
file_name_format = "clip_%"
        "#;

        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_unknown_lens_kind() {
        let toml = r#"
[camera]
preferred_lenses = ["fisheye"]
        "#;

        assert!(matches!(Config::from_str(toml), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config::default();

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.camera.preferred_lenses, config.camera.preferred_lenses);
        assert_eq!(loaded.simulator.lenses, config.simulator.lenses);
    }
}
