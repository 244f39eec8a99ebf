//! Guided N-point calibration: show a target, average the smoothed gaze, repeat, then fit.
//!
//! Runs synchronously on the caller's thread. Between polls it checks the cancel token, a
//! stall timeout (the capture loop stopped producing frames) and a per-target timeout, so a
//! frozen camera ends the procedure with an error instead of hanging it.

pub mod fit;
pub mod store;

use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{CalibrationConfig, ScreenConfig};
use crate::error::CalibrationError;
use crate::gaze::GazeFeed;
use crate::mapper::{CalibrationMapping, ScreenPoint};
use crate::state::CancelToken;

pub use fit::{CalibrationSample, FitReport, fit_affine};
pub use store::CalibrationStore;

/// UI side of calibration. `show_target_at` must return only once the target is visible.
pub trait TargetDisplay {
    fn show_target_at(&mut self, target: ScreenPoint);

    /// Called once after the last target, whatever the outcome
    fn finish(&mut self) {}
}

/// Row-major k x k grid of targets, inset from the screen edges by `margin` (fraction of size)
pub fn grid_targets(count: usize, screen: &ScreenConfig, margin: f64) -> Vec<ScreenPoint> {
    let side = (count as f64).sqrt().round() as usize;
    if side < 2 {
        return vec![ScreenPoint::new(screen.width / 2.0, screen.height / 2.0)];
    }

    let span = |extent: f64, i: usize| {
        let lo = extent * margin;
        let hi = extent * (1.0 - margin);
        lo + (hi - lo) * i as f64 / (side - 1) as f64
    };

    let mut targets = Vec::with_capacity(side * side);
    for row in 0..side {
        for col in 0..side {
            targets.push(ScreenPoint::new(span(screen.width, col), span(screen.height, row)));
        }
    }
    targets
}

/// Sampling parameters for one calibration run
#[derive(Debug, Clone)]
pub struct CalibrationSettings {
    pub samples_per_point: usize,
    pub sample_interval: Duration,
    pub stall_timeout: Duration,
    pub point_timeout: Duration,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        (&CalibrationConfig::default()).into()
    }
}

impl From<&CalibrationConfig> for CalibrationSettings {
    fn from(config: &CalibrationConfig) -> Self {
        Self {
            samples_per_point: config.samples_per_point.max(1),
            sample_interval: Duration::from_millis(config.sample_interval_ms),
            stall_timeout: Duration::from_millis(config.stall_timeout_ms),
            point_timeout: Duration::from_millis(config.point_timeout_ms),
        }
    }
}

pub struct Calibrator<F: GazeFeed> {
    feed: F,
    settings: CalibrationSettings,
    cancel: CancelToken,
    store: Option<CalibrationStore>,
}

impl<F: GazeFeed> Calibrator<F> {
    pub fn new(feed: F, settings: CalibrationSettings) -> Self {
        Self {
            feed,
            settings,
            cancel: CancelToken::new(),
            store: None,
        }
    }

    /// Abort from another thread by cancelling this token
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Persist the mapping here on success
    pub fn with_store(mut self, store: CalibrationStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Run the whole procedure and return the fitted mapping.
    ///
    /// On any error nothing is persisted.
    pub fn run_procedure(
        &self,
        targets: &[ScreenPoint],
        display: &mut dyn TargetDisplay,
    ) -> Result<CalibrationMapping, CalibrationError> {
        let result = self.collect_and_fit(targets, display);
        display.finish();

        let report = result?;
        info!(
            "Calibration fit over {} targets: mean error {:.1}px, max {:.1}px",
            targets.len(),
            report.mean_error_px,
            report.max_error_px
        );

        if let Some(store) = &self.store {
            store.save(&report.mapping, targets.len())?;
        }
        Ok(report.mapping)
    }

    fn collect_and_fit(
        &self,
        targets: &[ScreenPoint],
        display: &mut dyn TargetDisplay,
    ) -> Result<FitReport, CalibrationError> {
        if targets.len() < 3 {
            return Err(CalibrationError::TooFewTargets(targets.len()));
        }

        let mut samples = Vec::with_capacity(targets.len());
        for (index, &target) in targets.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(CalibrationError::Aborted);
            }
            display.show_target_at(target);
            let gaze = self.collect_target(index)?;
            debug!(
                "Target {} at ({:.0}, {:.0}) -> gaze ({:.4}, {:.4})",
                index, target.x, target.y, gaze.0, gaze.1
            );
            samples.push(CalibrationSample {
                screen: target,
                gaze,
            });
        }

        fit_affine(&samples).inspect_err(|e| warn!("Calibration fit failed: {}", e))
    }

    /// Average `samples_per_point` consecutive snapshots for one target
    fn collect_target(&self, index: usize) -> Result<(f64, f64), CalibrationError> {
        let s = &self.settings;
        let started = Instant::now();
        let mut last_frame = self.feed.snapshot().frame;
        let mut last_progress = started;
        let (mut sum_x, mut sum_y) = (0.0, 0.0);

        for n in 0..s.samples_per_point {
            if self.cancel.is_cancelled() {
                return Err(CalibrationError::Aborted);
            }

            let snap = self.feed.snapshot();
            let now = Instant::now();
            if snap.frame != last_frame {
                last_frame = snap.frame;
                last_progress = now;
            } else if now.duration_since(last_progress) >= s.stall_timeout {
                warn!("Gaze feed stalled during calibration target {}", index);
                return Err(CalibrationError::Stalled(s.stall_timeout, index));
            }
            if now.duration_since(started) >= s.point_timeout {
                return Err(CalibrationError::TimedOut(s.point_timeout, index));
            }

            sum_x += snap.gx;
            sum_y += snap.gy;

            if n + 1 < s.samples_per_point && !s.sample_interval.is_zero() {
                thread::sleep(s.sample_interval);
            }
        }

        let k = s.samples_per_point as f64;
        Ok((sum_x / k, sum_y / k))
    }
}
