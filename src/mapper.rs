//! Calibrated gaze -> screen transform

use serde::{Deserialize, Serialize};

use crate::error::MappingError;

/// A point in screen pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Affine gaze -> screen mapping:
/// `x = px[0]*gx + px[1]*gy + px[2]`, `y = py[0]*gx + py[1]*gy + py[2]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMapping {
    pub px: [f64; 3],
    pub py: [f64; 3],
}

impl CalibrationMapping {
    pub fn apply(&self, gx: f64, gy: f64) -> ScreenPoint {
        let [a, b, c] = self.px;
        let [d, e, f] = self.py;
        ScreenPoint::new(a * gx + b * gy + c, d * gx + e * gy + f)
    }
}

/// Pure affine evaluation that refuses to run without a mapping
pub fn to_screen(
    gx: f64,
    gy: f64,
    mapping: Option<&CalibrationMapping>,
) -> Result<ScreenPoint, MappingError> {
    mapping
        .map(|m| m.apply(gx, gy))
        .ok_or(MappingError::Uncalibrated)
}

/// Holds the current mapping, if any calibration has ever succeeded
#[derive(Debug, Clone, Default)]
pub struct GazeMapper {
    mapping: Option<CalibrationMapping>,
}

impl GazeMapper {
    pub fn uncalibrated() -> Self {
        Self::default()
    }

    pub fn with_mapping(mapping: CalibrationMapping) -> Self {
        Self {
            mapping: Some(mapping),
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.mapping.is_some()
    }

    pub fn mapping(&self) -> Option<&CalibrationMapping> {
        self.mapping.as_ref()
    }

    /// Replace the mapping after a successful recalibration
    pub fn set_mapping(&mut self, mapping: CalibrationMapping) {
        self.mapping = Some(mapping);
    }

    pub fn to_screen(&self, gx: f64, gy: f64) -> Result<ScreenPoint, MappingError> {
        to_screen(gx, gy, self.mapping.as_ref())
    }
}
