use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub gaze: GazeConfig,
    #[serde(default)]
    pub dwell: DwellConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub keyboard: KeyboardConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

// ============================================================================
// Gaze Config
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GazeConfig {
    /// EWMA weight of the newest raw sample, in (0, 1]
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,

    /// Below this confidence the gaze point is shown dimmed and never drives dwell
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    /// Pause between capture ticks
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            smoothing: default_smoothing(),
            confidence_threshold: default_confidence_threshold(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

fn default_smoothing() -> f64 {
    0.25
}

fn default_confidence_threshold() -> f64 {
    0.35
}

fn default_frame_interval_ms() -> u64 {
    10
}

// ============================================================================
// Dwell Config
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DwellConfig {
    /// Time the gaze must rest on one key to press it
    #[serde(default = "default_dwell_ms")]
    pub duration_ms: u64,

    /// Dwell state machine cadence
    #[serde(default = "default_dwell_tick_ms")]
    pub tick_ms: u64,
}

impl Default for DwellConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_dwell_ms(),
            tick_ms: default_dwell_tick_ms(),
        }
    }
}

impl DwellConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

fn default_dwell_ms() -> u64 {
    900
}

fn default_dwell_tick_ms() -> u64 {
    50
}

// ============================================================================
// Calibration Config
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalibrationConfig {
    /// Smoothed snapshots averaged per target
    #[serde(default = "default_samples_per_point")]
    pub samples_per_point: usize,

    /// Number of targets, laid out as a square grid
    #[serde(default = "default_targets")]
    pub targets: usize,

    /// Delay between two snapshot polls
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// Distance of the outer targets from the screen edge, as a fraction of the screen
    #[serde(default = "default_margin")]
    pub margin: f64,

    /// Abort a target when the capture loop produces no new frame for this long
    #[serde(default = "default_stall_timeout_ms")]
    pub stall_timeout_ms: u64,

    /// Upper bound on collecting one target
    #[serde(default = "default_point_timeout_ms")]
    pub point_timeout_ms: u64,

    /// Time given to the user to move their eyes to a freshly shown target
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Where the fitted mapping is stored
    #[serde(default = "default_calibration_path")]
    pub path: PathBuf,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            samples_per_point: default_samples_per_point(),
            targets: default_targets(),
            sample_interval_ms: default_sample_interval_ms(),
            margin: default_margin(),
            stall_timeout_ms: default_stall_timeout_ms(),
            point_timeout_ms: default_point_timeout_ms(),
            settle_ms: default_settle_ms(),
            path: default_calibration_path(),
        }
    }
}

fn default_samples_per_point() -> usize {
    25
}

fn default_targets() -> usize {
    9
}

fn default_sample_interval_ms() -> u64 {
    20
}

fn default_margin() -> f64 {
    0.1
}

fn default_stall_timeout_ms() -> u64 {
    2000
}

fn default_point_timeout_ms() -> u64 {
    10_000
}

fn default_settle_ms() -> u64 {
    600
}

fn default_calibration_path() -> PathBuf {
    PathBuf::from("calibration.toml")
}

// ============================================================================
// Screen / Keyboard Config
// ============================================================================

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ScreenConfig {
    #[serde(default = "default_screen_width")]
    pub width: f64,
    #[serde(default = "default_screen_height")]
    pub height: f64,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: default_screen_width(),
            height: default_screen_height(),
        }
    }
}

fn default_screen_width() -> f64 {
    1920.0
}

fn default_screen_height() -> f64 {
    1080.0
}

/// Geometry of the on-screen keyboard, in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct KeyboardConfig {
    #[serde(default = "default_keyboard_origin_x")]
    pub origin_x: f64,
    #[serde(default = "default_keyboard_origin_y")]
    pub origin_y: f64,
    #[serde(default = "default_key_width")]
    pub key_width: f64,
    #[serde(default = "default_key_height")]
    pub key_height: f64,
    #[serde(default = "default_key_gap")]
    pub gap: f64,
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            origin_x: default_keyboard_origin_x(),
            origin_y: default_keyboard_origin_y(),
            key_width: default_key_width(),
            key_height: default_key_height(),
            gap: default_key_gap(),
        }
    }
}

fn default_keyboard_origin_x() -> f64 {
    160.0
}

fn default_keyboard_origin_y() -> f64 {
    540.0
}

fn default_key_width() -> f64 {
    80.0
}

fn default_key_height() -> f64 {
    56.0
}

fn default_key_gap() -> f64 {
    8.0
}

// ============================================================================
// UI / Voice / Output Config
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UiConfig {
    /// Consumer loop cadence (status rendering)
    #[serde(default = "default_ui_tick_ms")]
    pub tick_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_ui_tick_ms(),
        }
    }
}

fn default_ui_tick_ms() -> u64 {
    40
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VoiceConfig {
    /// Start with voice commands enabled (can be toggled at runtime)
    #[serde(default = "default_voice_enabled")]
    pub enabled: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: default_voice_enabled(),
        }
    }
}

fn default_voice_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Apply actions to the in-memory text buffer (default)
    #[default]
    Buffer,
    /// Replay actions as OS keystrokes (requires the `keystrokes` feature)
    Keystrokes,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub mode: OutputMode,
}

// ============================================================================
// Camera Config (feature `camera`)
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    /// Capture device index
    #[serde(default)]
    pub index: i32,
    /// Requested frame size; the driver may pick another
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    /// Haar cascade for the face-box detector
    #[serde(default = "default_face_cascade")]
    pub face_cascade: PathBuf,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
            face_cascade: default_face_cascade(),
        }
    }
}

fn default_camera_width() -> u32 {
    640
}

fn default_camera_height() -> u32 {
    480
}

fn default_face_cascade() -> PathBuf {
    PathBuf::from("/usr/share/opencv4/haarcascades/haarcascade_frontalface_default.xml")
}

impl Config {
    /// Load `path`, falling back to defaults when the file is missing or unreadable
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }

        match fs::read_to_string(path) {
            Ok(s) => Self::from_toml(&s).unwrap_or_else(|e| {
                warn!("Ignoring invalid config {}: {}", path.display(), e);
                Config::default()
            }),
            Err(e) => {
                warn!("Could not read config {}: {}", path.display(), e);
                Config::default()
            }
        }
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let alpha = self.gaze.smoothing;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::Smoothing(alpha));
        }
        let threshold = self.gaze.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Fraction("gaze.confidence_threshold", threshold));
        }
        if !(0.0..0.5).contains(&self.calibration.margin) {
            return Err(ConfigError::Fraction("calibration.margin", self.calibration.margin));
        }
        if self.dwell.duration_ms == 0 {
            return Err(ConfigError::Zero("dwell.duration_ms"));
        }
        if self.dwell.tick_ms == 0 {
            return Err(ConfigError::Zero("dwell.tick_ms"));
        }
        if self.ui.tick_ms == 0 {
            return Err(ConfigError::Zero("ui.tick_ms"));
        }
        if self.calibration.samples_per_point == 0 {
            return Err(ConfigError::Zero("calibration.samples_per_point"));
        }

        let n = self.calibration.targets;
        let side = (n as f64).sqrt().round() as usize;
        if n < 4 || side * side != n {
            return Err(ConfigError::Targets(n));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.gaze.smoothing, 0.25);
        assert_eq!(config.dwell.duration_ms, 900);
        assert_eq!(config.dwell.tick_ms, 50);
        assert_eq!(config.calibration.samples_per_point, 25);
        assert_eq!(config.calibration.targets, 9);
        assert_eq!(config.calibration.sample_interval_ms, 20);
        assert_eq!(config.ui.tick_ms, 40);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [gaze]
            smoothing = 0.5

            [dwell]
            duration_ms = 1200
            "#,
        )
        .unwrap();
        assert_eq!(config.gaze.smoothing, 0.5);
        assert_eq!(config.gaze.confidence_threshold, 0.35);
        assert_eq!(config.dwell.duration_ms, 1200);
        assert_eq!(config.dwell.tick_ms, 50);
        assert_eq!(config.output.mode, OutputMode::Buffer);
    }

    #[test]
    fn test_camera_section() {
        let config = Config::from_toml("[camera]\nindex = 2").unwrap();
        assert_eq!(config.camera.index, 2);
        assert_eq!(config.camera.width, 640);
        assert!(config.camera.face_cascade.ends_with("haarcascade_frontalface_default.xml"));
    }

    #[test]
    fn test_output_mode_lowercase() {
        let config = Config::from_toml("[output]\nmode = \"keystrokes\"").unwrap();
        assert_eq!(config.output.mode, OutputMode::Keystrokes);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.gaze.smoothing = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::Smoothing(0.0)));

        let mut config = Config::default();
        config.gaze.smoothing = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calibration.targets = 8;
        assert_eq!(config.validate(), Err(ConfigError::Targets(8)));

        let mut config = Config::default();
        config.dwell.duration_ms = 0;
        assert_eq!(config.validate(), Err(ConfigError::Zero("dwell.duration_ms")));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load(Path::new("/nonexistent/gazetype.toml"));
        assert_eq!(config.calibration.targets, 9);
    }
}
