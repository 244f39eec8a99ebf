//! Gaze estimation: landmarks in, smoothed normalized gaze point out
//!
//! Data flow per capture tick:
//!
//! `LandmarkSource::next_frame` -> `estimate` (iris or face-box centroid, mirrored) ->
//! `GazeEstimator::update` (EWMA under the cell lock) -> readers take `GazeSnapshot`s.

pub mod camera;
pub mod capture;
pub mod cell;
pub mod estimator;
pub mod landmarks;
pub mod source;

#[cfg(feature = "camera")]
pub use camera::CameraSource;
pub use camera::face_box_frame;
pub use capture::{run_capture_loop, spawn_capture};
pub use cell::{GazeFeed, GazeReader, GazeSnapshot, GazeWriter, gaze_cell};
pub use estimator::{GazeEstimator, GazeSample, estimate};
pub use landmarks::{DetectorQuality, LandmarkFrame, LandmarkSource, Point};
pub use source::{FrameRecord, ReplaySource, ScriptedSource};
