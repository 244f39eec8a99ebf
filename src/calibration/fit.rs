//! Least-squares affine fit via Householder QR.
//!
//! The system is tiny (N x 3, N usually 9), so a direct factorization is used. The result is
//! deterministic for the same input.

use nalgebra::{DMatrix, DVector};

use crate::error::CalibrationError;
use crate::mapper::{CalibrationMapping, ScreenPoint};

/// Relative size of the smallest R diagonal below which the design matrix is rank deficient
const RANK_TOLERANCE: f64 = 1e-9;

/// Averaged gaze recorded while one target was displayed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSample {
    pub screen: ScreenPoint,
    pub gaze: (f64, f64),
}

/// Fitted mapping plus how well it reproduces the calibration targets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub mapping: CalibrationMapping,
    pub mean_error_px: f64,
    pub max_error_px: f64,
}

/// Fit `screen = [gx, gy, 1] . p` independently for x and y
#[hotpath::measure]
pub fn fit_affine(samples: &[CalibrationSample]) -> Result<FitReport, CalibrationError> {
    let n = samples.len();
    if n < 3 {
        return Err(CalibrationError::TooFewTargets(n));
    }

    let design = DMatrix::from_fn(n, 3, |row, col| match col {
        0 => samples[row].gaze.0,
        1 => samples[row].gaze.1,
        _ => 1.0,
    });
    let bx = DVector::from_iterator(n, samples.iter().map(|s| s.screen.x));
    let by = DVector::from_iterator(n, samples.iter().map(|s| s.screen.y));

    let qr = design.qr();
    let q = qr.q();
    let r = qr.r();

    let diag: Vec<f64> = (0..3).map(|i| r[(i, i)].abs()).collect();
    let largest = diag.iter().copied().fold(0.0, f64::max);
    let smallest = diag.iter().copied().fold(f64::INFINITY, f64::min);
    if largest == 0.0 || smallest <= largest * RANK_TOLERANCE {
        return Err(CalibrationError::DegenerateFit);
    }

    let qt = q.transpose();
    let px = r
        .solve_upper_triangular(&(&qt * &bx))
        .ok_or(CalibrationError::DegenerateFit)?;
    let py = r
        .solve_upper_triangular(&(&qt * &by))
        .ok_or(CalibrationError::DegenerateFit)?;

    let mapping = CalibrationMapping {
        px: [px[0], px[1], px[2]],
        py: [py[0], py[1], py[2]],
    };
    if mapping.px.iter().chain(&mapping.py).any(|v| !v.is_finite()) {
        return Err(CalibrationError::DegenerateFit);
    }

    let errors: Vec<f64> = samples
        .iter()
        .map(|s| mapping.apply(s.gaze.0, s.gaze.1).distance(s.screen))
        .collect();
    let mean_error_px = errors.iter().sum::<f64>() / n as f64;
    let max_error_px = errors.iter().copied().fold(0.0, f64::max);

    Ok(FitReport {
        mapping,
        mean_error_px,
        max_error_px,
    })
}
