//! Durable calibration artifact (`calibration.toml`)
//!
//! ```toml
//! px = [1920.0, 0.0, 0.0]
//! py = [0.0, 1080.0, 0.0]
//! calibrated_at = "2026-10-18T09:30:00+02:00"
//! points = 9
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::StoreError;
use crate::mapper::CalibrationMapping;

#[derive(Debug, Serialize, Deserialize)]
struct StoredCalibration {
    px: [f64; 3],
    py: [f64; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calibrated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    points: Option<usize>,
}

/// Reads and atomically replaces the calibration file
#[derive(Debug, Clone)]
pub struct CalibrationStore {
    path: PathBuf,
}

impl CalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no calibration has been saved yet
    pub fn load(&self) -> Result<Option<CalibrationMapping>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let stored: StoredCalibration =
            toml::from_str(&text).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;

        Ok(Some(CalibrationMapping {
            px: stored.px,
            py: stored.py,
        }))
    }

    /// Write to a temp file next to the target, then rename over it
    pub fn save(&self, mapping: &CalibrationMapping, points: usize) -> Result<(), StoreError> {
        let stored = StoredCalibration {
            px: mapping.px,
            py: mapping.py,
            calibrated_at: Some(chrono::Local::now().to_rfc3339()),
            points: Some(points),
        };
        let text = toml::to_string_pretty(&stored)?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(text.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        info!("Calibration saved to {}", self.path.display());
        Ok(())
    }
}
