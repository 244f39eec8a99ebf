//! Raw gaze estimation and exponential smoothing

use std::time::{Duration, Instant};
use tracing::trace;

use super::cell::{GazeReader, GazeWriter};
use super::landmarks::LandmarkFrame;
use crate::error::DetectionError;

/// Raw per-tick gaze estimate, both axes in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSample {
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
    pub timestamp: Instant,
}

impl GazeSample {
    /// Defined fallback when no face is visible: screen centre, zero confidence
    pub fn no_face(timestamp: Instant) -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            confidence: 0.0,
            timestamp,
        }
    }
}

/// Turn one landmark frame into a raw gaze sample.
///
/// The camera faces the user, so its x axis is flipped relative to the screen; the result is
/// mirrored (`x' = 1 - x`) for both detector paths.
#[hotpath::measure]
pub fn estimate(frame: &LandmarkFrame, timestamp: Instant) -> GazeSample {
    match frame.eye_center() {
        Some(eye) => GazeSample {
            x: (1.0 - eye.x).clamp(0.0, 1.0),
            y: eye.y.clamp(0.0, 1.0),
            confidence: frame.quality.confidence(),
            timestamp,
        },
        None => GazeSample::no_face(timestamp),
    }
}

/// Owns the smoothed gaze state and is its only writer
pub struct GazeEstimator {
    alpha: f64,
    writer: GazeWriter,
    started: Instant,
    frames: u64,
}

impl GazeEstimator {
    /// `alpha` is the EWMA weight of the newest sample, in (0, 1]
    pub fn new(alpha: f64, writer: GazeWriter) -> Self {
        Self::started_at(alpha, writer, Instant::now())
    }

    pub fn started_at(alpha: f64, writer: GazeWriter, started: Instant) -> Self {
        debug_assert!(alpha > 0.0 && alpha <= 1.0, "alpha must be in (0, 1]");
        Self {
            alpha,
            writer,
            started,
            frames: 0,
        }
    }

    pub fn reader(&self) -> GazeReader {
        self.writer.reader()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Estimate and apply one capture tick. Detector errors count as "no face".
    pub fn observe(
        &mut self,
        detection: Result<Option<LandmarkFrame>, DetectionError>,
        timestamp: Instant,
    ) -> GazeSample {
        let sample = match detection {
            Ok(Some(frame)) => estimate(&frame, timestamp),
            Ok(None) => GazeSample::no_face(timestamp),
            Err(e) => {
                trace!("Detection miss: {}", e);
                GazeSample::no_face(timestamp)
            }
        };
        self.update(sample);
        sample
    }

    /// Fold a sample into the smoothed state.
    ///
    /// Position is smoothed; confidence is overwritten so it always reflects the current frame.
    /// `fps` is frames since start over wall time since start.
    pub fn update(&mut self, sample: GazeSample) {
        self.frames += 1;
        let elapsed = sample
            .timestamp
            .saturating_duration_since(self.started)
            .max(Duration::from_millis(1));
        let fps = self.frames as f64 / elapsed.as_secs_f64();
        let alpha = self.alpha;
        let frames = self.frames;

        self.writer.write(|s| {
            s.gx = alpha * sample.x + (1.0 - alpha) * s.gx;
            s.gy = alpha * sample.y + (1.0 - alpha) * s.gy;
            s.confidence = sample.confidence;
            s.fps = fps;
            s.frame = frames;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaze::cell::{GazeFeed, gaze_cell};
    use crate::gaze::landmarks::{LandmarkFrame, Point, mesh_with_irises};

    fn sample(x: f64, y: f64, confidence: f64, timestamp: Instant) -> GazeSample {
        GazeSample {
            x,
            y,
            confidence,
            timestamp,
        }
    }

    #[test]
    fn test_mirrors_horizontal_axis() {
        let frame = mesh_with_irises(Point::new(0.2, 0.4), Point::new(0.2, 0.4));
        let s = estimate(&frame, Instant::now());
        assert!((s.x - 0.8).abs() < 1e-12);
        assert!((s.y - 0.4).abs() < 1e-12);
        assert_eq!(s.confidence, 0.9);
    }

    #[test]
    fn test_face_box_path_mirrors_too() {
        let frame = LandmarkFrame::face_box(vec![Point::new(0.1, 0.5), Point::new(0.3, 0.5)]);
        let s = estimate(&frame, Instant::now());
        assert!((s.x - 0.8).abs() < 1e-12);
        assert_eq!(s.confidence, 0.4);
    }

    #[test]
    fn test_unusable_mesh_falls_back_to_centre() {
        let frame = LandmarkFrame::mesh(vec![Point::new(0.1, 0.1); 10]);
        let s = estimate(&frame, Instant::now());
        assert_eq!((s.x, s.y, s.confidence), (0.5, 0.5, 0.0));
    }

    #[test]
    fn test_ewma_step() {
        let writer = gaze_cell();
        let start = Instant::now();
        let mut est = GazeEstimator::started_at(0.25, writer, start);
        let reader = est.reader();

        est.update(sample(1.0, 0.0, 0.9, start + Duration::from_millis(100)));
        let snap = reader.snapshot();
        assert!((snap.gx - 0.625).abs() < 1e-12); // 0.25 * 1 + 0.75 * 0.5
        assert!((snap.gy - 0.375).abs() < 1e-12);
        assert_eq!(snap.confidence, 0.9);
        assert_eq!(snap.frame, 1);
    }

    #[test]
    fn test_confidence_is_not_smoothed() {
        let writer = gaze_cell();
        let start = Instant::now();
        let mut est = GazeEstimator::started_at(0.25, writer, start);
        let reader = est.reader();

        est.update(sample(0.3, 0.3, 0.9, start));
        est.update(GazeSample::no_face(start));
        assert_eq!(reader.snapshot().confidence, 0.0);
    }

    #[test]
    fn test_fps_counts_since_start() {
        let writer = gaze_cell();
        let start = Instant::now();
        let mut est = GazeEstimator::started_at(0.5, writer, start);
        let reader = est.reader();

        for i in 1..=30 {
            est.update(sample(0.5, 0.5, 0.9, start + Duration::from_millis(i * 100)));
        }
        // 30 frames over 3 s
        assert!((reader.snapshot().fps - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_detection_error_is_no_face() {
        let writer = gaze_cell();
        let mut est = GazeEstimator::new(0.25, writer);
        let s = est.observe(
            Err(DetectionError::Malformed("bad".into())),
            Instant::now(),
        );
        assert_eq!(s.confidence, 0.0);
        assert_eq!(est.frames(), 1);
    }
}
