//! Error types for the gaze typing pipeline.
//!
//! Per-tick sensor problems (`DetectionError`, `RecognitionMiss`) are absorbed by the loops that
//! see them and turned into data. Only calibration failures travel back to a caller as `Err`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Calibration procedure failures. The stored mapping is never touched when one of these is returned.
#[derive(Error, Debug)]
pub enum CalibrationError {
    /// Fewer targets than the three an affine fit needs
    #[error("calibration needs at least 3 targets, got {0}")]
    TooFewTargets(usize),

    /// Rank-deficient design matrix: the tracker gave no usable signal
    #[error("degenerate calibration fit: gaze samples do not span the plane")]
    DegenerateFit,

    /// No new frame arrived from the capture loop within the stall timeout
    #[error("gaze feed stalled for {0:?} while collecting target {1}")]
    Stalled(Duration, usize),

    /// Collecting one target took longer than the per-point timeout
    #[error("timed out after {0:?} collecting target {1}")]
    TimedOut(Duration, usize),

    /// Cancelled by the user
    #[error("calibration aborted")]
    Aborted,

    /// Fit succeeded but the artifact could not be written
    #[error("failed to persist calibration: {0}")]
    Persist(#[from] StoreError),
}

/// The mapper was asked for a screen point before any calibration succeeded
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    #[error("gaze mapping is uncalibrated")]
    Uncalibrated,
}

/// Camera / landmark source could not be opened. Fatal to the capture loop only.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("landmark source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("landmark source unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transient failure of the landmark detector for a single frame
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("malformed landmark frame: {0}")]
    Malformed(String),

    #[error("detector read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("camera error: {0}")]
    Camera(String),
}

/// A voice utterance could not be turned into text
#[derive(Error, Debug)]
#[error("utterance not understood: {0}")]
pub struct RecognitionMiss(pub String);

/// Calibration artifact read/write failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid calibration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to encode calibration: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Configuration values outside their allowed range
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("gaze.smoothing must be in (0, 1], got {0}")]
    Smoothing(f64),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("calibration.targets must be a perfect square >= 4, got {0}")]
    Targets(usize),

    #[error("{0} must be in [0, 1], got {1}")]
    Fraction(&'static str, f64),
}

/// The editor collaborator could not apply an action
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("keystroke backend error: {0}")]
    Keystroke(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),
}
