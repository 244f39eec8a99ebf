//! Landmark frames and the sources that produce them

use crate::error::DetectionError;

/// Left iris ring in a refined 478-point face mesh
pub const LEFT_IRIS: [usize; 4] = [468, 469, 470, 471];
/// Right iris ring in a refined 478-point face mesh
pub const RIGHT_IRIS: [usize; 4] = [473, 474, 475, 476];

/// A point in image-normalized space, both axes in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Which detector produced a frame, and so how much its eye position can be trusted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorQuality {
    /// Refined face mesh with iris landmarks
    IrisMesh,
    /// Face bounding box only; the eye position is approximated by the box centre
    FaceBox,
}

impl DetectorQuality {
    /// Fixed confidence tier for a successful detection
    pub fn confidence(self) -> f64 {
        match self {
            DetectorQuality::IrisMesh => 0.9,
            DetectorQuality::FaceBox => 0.4,
        }
    }
}

/// One camera tick's worth of landmarks. Not retained past the tick.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    pub points: Vec<Point>,
    pub quality: DetectorQuality,
}

impl LandmarkFrame {
    pub fn mesh(points: Vec<Point>) -> Self {
        Self {
            points,
            quality: DetectorQuality::IrisMesh,
        }
    }

    pub fn face_box(points: Vec<Point>) -> Self {
        Self {
            points,
            quality: DetectorQuality::FaceBox,
        }
    }

    /// Eye position in camera space (not yet mirrored), or `None` when the frame lacks the points
    pub fn eye_center(&self) -> Option<Point> {
        match self.quality {
            DetectorQuality::IrisMesh => {
                let left = centroid_of(&self.points, &LEFT_IRIS)?;
                let right = centroid_of(&self.points, &RIGHT_IRIS)?;
                Some(left.midpoint(right))
            }
            DetectorQuality::FaceBox => centroid(&self.points),
        }
    }
}

fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Some(Point::new(sx / n, sy / n))
}

fn centroid_of(points: &[Point], indices: &[usize]) -> Option<Point> {
    let picked: Option<Vec<Point>> = indices.iter().map(|&i| points.get(i).copied()).collect();
    centroid(&picked?)
}

/// Camera plus landmark detector, polled once per capture tick.
///
/// `Ok(None)` means no face this tick. Errors are transient and are treated as no face by the
/// capture loop.
pub trait LandmarkSource: Send {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, DetectionError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
pub(crate) fn mesh_with_irises(left: Point, right: Point) -> LandmarkFrame {
    let mut points = vec![Point::new(0.5, 0.5); 478];
    for &i in &LEFT_IRIS {
        points[i] = left;
    }
    for &i in &RIGHT_IRIS {
        points[i] = right;
    }
    LandmarkFrame::mesh(points)
}
