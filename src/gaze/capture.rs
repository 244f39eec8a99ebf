//! Capture loop: landmark source -> estimator -> shared gaze cell

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::estimator::GazeEstimator;
use super::landmarks::LandmarkSource;
use crate::error::CaptureError;
use crate::state::SharedState;

/// Only every Nth detector error is logged
const ERROR_REPORT_EVERY: u64 = 100;

/// Run the capture loop on the current thread until shutdown.
///
/// Never returns early on per-frame failures; they are folded into the gaze state as
/// zero-confidence samples.
pub fn run_capture_loop(
    source: &mut dyn LandmarkSource,
    estimator: &mut GazeEstimator,
    state: &SharedState,
    frame_interval: Duration,
) {
    info!("Capture loop started ({})", source.name());
    let mut errors: u64 = 0;

    while state.is_running() {
        let detection = source.next_frame();
        if let Err(e) = &detection {
            errors += 1;
            if errors % ERROR_REPORT_EVERY == 1 {
                warn!("Landmark detector error ({} so far): {}", errors, e);
            }
        }
        estimator.observe(detection, Instant::now());

        if !frame_interval.is_zero() {
            thread::sleep(frame_interval);
        }
    }

    info!(
        "Capture loop stopped after {} frames ({} detector errors)",
        estimator.frames(),
        errors
    );
}

/// Spawn the capture thread.
///
/// `open` runs on the new thread. When it fails the thread exits and the gaze cell stays at its
/// zero-confidence default; the rest of the application keeps running.
pub fn spawn_capture<F>(
    open: F,
    mut estimator: GazeEstimator,
    state: SharedState,
    frame_interval: Duration,
) -> JoinHandle<()>
where
    F: FnOnce() -> Result<Box<dyn LandmarkSource>, CaptureError> + Send + 'static,
{
    thread::spawn(move || match open() {
        Ok(mut source) => {
            run_capture_loop(source.as_mut(), &mut estimator, &state, frame_interval);
        }
        Err(e) => {
            error!("Capture device unavailable, gaze input disabled: {}", e);
        }
    })
}
