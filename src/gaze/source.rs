//! Landmark sources: recorded replays and in-memory scripts

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use super::landmarks::{LandmarkFrame, LandmarkSource, Point};
use crate::error::{CaptureError, DetectionError};

/// One line of a landmark recording
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FrameRecord {
    /// Refined face mesh (478 points with irises)
    Mesh { points: Vec<[f64; 2]> },
    /// Face bounding box corners
    #[serde(rename = "box")]
    FaceBox { points: Vec<[f64; 2]> },
    /// Detector saw no face
    None,
}

impl FrameRecord {
    pub fn into_frame(self) -> Option<LandmarkFrame> {
        let to_points = |pts: Vec<[f64; 2]>| pts.into_iter().map(Point::from).collect();
        match self {
            FrameRecord::Mesh { points } => Some(LandmarkFrame::mesh(to_points(points))),
            FrameRecord::FaceBox { points } => Some(LandmarkFrame::face_box(to_points(points))),
            FrameRecord::None => None,
        }
    }
}

/// Replays a JSON-lines landmark recording, one frame per capture tick
pub struct ReplaySource {
    name: String,
    lines: Vec<String>,
    cursor: usize,
    looping: bool,
}

impl ReplaySource {
    pub fn open(path: &Path, looping: bool) -> Result<Self, CaptureError> {
        if !path.exists() {
            return Err(CaptureError::NotFound(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let lines: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        if lines.is_empty() {
            return Err(CaptureError::Unavailable(format!(
                "{} contains no frames",
                path.display()
            )));
        }

        Ok(Self {
            name: format!("replay:{}", path.display()),
            lines,
            cursor: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false for an opened source; `open` rejects recordings without frames
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl LandmarkSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, DetectionError> {
        if self.cursor >= self.lines.len() {
            if !self.looping {
                // Recording ended: the camera is still "on" but sees nobody
                return Ok(None);
            }
            self.cursor = 0;
        }
        let line = &self.lines[self.cursor];
        self.cursor += 1;

        let record: FrameRecord = serde_json::from_str(line)
            .map_err(|e| DetectionError::Malformed(format!("line {}: {}", self.cursor, e)))?;
        Ok(record.into_frame())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Yields a fixed sequence of detections, then no face forever
#[derive(Default)]
pub struct ScriptedSource {
    frames: VecDeque<Result<Option<LandmarkFrame>, DetectionError>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, detection: Result<Option<LandmarkFrame>, DetectionError>) -> Self {
        self.frames.push_back(detection);
        self
    }

    pub fn repeat(mut self, frame: LandmarkFrame, times: usize) -> Self {
        for _ in 0..times {
            self.frames.push_back(Ok(Some(frame.clone())));
        }
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl LandmarkSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, DetectionError> {
        self.frames.pop_front().unwrap_or(Ok(None))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
