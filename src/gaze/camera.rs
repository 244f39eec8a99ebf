//! Live webcam landmark source (feature `camera`).
//!
//! A Haar cascade finds the face and the box corners become a face-box `LandmarkFrame`. The box
//! geometry is kept free of OpenCV so it builds and tests without the feature.

use super::landmarks::{LandmarkFrame, Point};

/// Face box in pixels: x, y, width, height
pub type PixelRect = (i32, i32, i32, i32);

/// Normalized face-box frame for the largest detected face, or `None` if there is none
pub fn face_box_frame(faces: &[PixelRect], width: i32, height: i32) -> Option<LandmarkFrame> {
    if width <= 0 || height <= 0 {
        return None;
    }
    let &(x, y, w, h) = faces
        .iter()
        .filter(|(_, _, w, h)| *w > 0 && *h > 0)
        .max_by_key(|(_, _, w, h)| i64::from(*w) * i64::from(*h))?;

    let (fw, fh) = (f64::from(width), f64::from(height));
    let top_left = Point::new(f64::from(x) / fw, f64::from(y) / fh);
    let bottom_right = Point::new(f64::from(x + w) / fw, f64::from(y + h) / fh);
    Some(LandmarkFrame::face_box(vec![top_left, bottom_right]))
}

#[cfg(feature = "camera")]
pub use live::CameraSource;

#[cfg(feature = "camera")]
mod live {
    use opencv::{
        core::{Mat, Rect, Size, Vector},
        imgproc,
        objdetect::CascadeClassifier,
        prelude::*,
        videoio::{self, CAP_ANY, CAP_PROP_BUFFERSIZE, VideoCapture},
    };
    use tracing::{debug, info};

    use super::{PixelRect, face_box_frame};
    use crate::config::CameraConfig;
    use crate::error::{CaptureError, DetectionError};
    use crate::gaze::landmarks::{LandmarkFrame, LandmarkSource};

    const SCALE_FACTOR: f64 = 1.1;
    const MIN_NEIGHBORS: i32 = 4;
    const MIN_FACE_PX: i32 = 30;

    pub struct CameraSource {
        capture: VideoCapture,
        cascade: CascadeClassifier,
        frame: Mat,
        gray: Mat,
        name: String,
    }

    impl CameraSource {
        pub fn open(config: &CameraConfig) -> Result<Self, CaptureError> {
            let unavailable = |e: opencv::Error| CaptureError::Unavailable(e.to_string());

            if !config.face_cascade.exists() {
                return Err(CaptureError::NotFound(config.face_cascade.clone()));
            }
            let cascade_path = config.face_cascade.to_string_lossy();
            let cascade = CascadeClassifier::new(&cascade_path).map_err(unavailable)?;
            if cascade.empty().map_err(unavailable)? {
                return Err(CaptureError::Unavailable(format!(
                    "could not load face cascade {}",
                    cascade_path
                )));
            }

            let mut capture = VideoCapture::new(config.index, CAP_ANY).map_err(unavailable)?;
            if !capture.is_opened().map_err(unavailable)? {
                return Err(CaptureError::Unavailable(format!(
                    "camera {} could not be opened",
                    config.index
                )));
            }
            // Latest frame only; stale buffered frames lag the gaze
            capture.set(CAP_PROP_BUFFERSIZE, 1.0).map_err(unavailable)?;
            capture
                .set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(config.width))
                .map_err(unavailable)?;
            capture
                .set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(config.height))
                .map_err(unavailable)?;

            info!("Opened camera {} ({}x{} requested)", config.index, config.width, config.height);
            Ok(Self {
                capture,
                cascade,
                frame: Mat::default(),
                gray: Mat::default(),
                name: format!("camera {}", config.index),
            })
        }

        fn detect(&mut self) -> opencv::Result<Option<Vec<PixelRect>>> {
            if !self.capture.read(&mut self.frame)? || self.frame.empty() {
                return Ok(None);
            }
            imgproc::cvt_color(&self.frame, &mut self.gray, imgproc::COLOR_BGR2GRAY, 0)?;

            let mut faces = Vector::<Rect>::new();
            self.cascade.detect_multi_scale(
                &self.gray,
                &mut faces,
                SCALE_FACTOR,
                MIN_NEIGHBORS,
                0,
                Size::new(MIN_FACE_PX, MIN_FACE_PX),
                Size::new(0, 0),
            )?;
            Ok(Some(faces.iter().map(|r| (r.x, r.y, r.width, r.height)).collect()))
        }
    }

    impl LandmarkSource for CameraSource {
        fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, DetectionError> {
            let faces = self
                .detect()
                .map_err(|e| DetectionError::Camera(e.to_string()))?
                .ok_or_else(|| DetectionError::Camera("empty frame".into()))?;
            debug!("{} face(s) detected", faces.len());
            Ok(face_box_frame(&faces, self.frame.cols(), self.frame.rows()))
        }

        fn name(&self) -> &str {
            &self.name
        }
    }
}
