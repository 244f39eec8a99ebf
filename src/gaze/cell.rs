//! Single-writer shared cell for the smoothed gaze state.
//!
//! The capture loop owns the only `GazeWriter`; the consumer loop and the calibrator hold
//! `GazeReader`s. All fields are read and written together under one lock, so a reader can never
//! observe a half-applied update.

use std::sync::{Arc, Mutex, PoisonError};

/// A consistent copy of the smoothed gaze state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GazeSnapshot {
    pub gx: f64,
    pub gy: f64,
    pub confidence: f64,
    pub fps: f64,
    /// Frames applied since the estimator started; lets readers detect a stalled feed
    pub frame: u64,
}

impl Default for GazeSnapshot {
    fn default() -> Self {
        Self {
            gx: 0.5,
            gy: 0.5,
            confidence: 0.0,
            fps: 0.0,
            frame: 0,
        }
    }
}

/// Anything that can hand out gaze snapshots
pub trait GazeFeed {
    fn snapshot(&self) -> GazeSnapshot;
}

#[derive(Debug, Default)]
struct GazeCell {
    state: Mutex<GazeSnapshot>,
}

/// Create a cell and its single writer; readers are derived from the writer
pub fn gaze_cell() -> GazeWriter {
    GazeWriter {
        cell: Arc::new(GazeCell::default()),
    }
}

/// Exclusive write handle. Deliberately not `Clone`.
#[derive(Debug)]
pub struct GazeWriter {
    cell: Arc<GazeCell>,
}

impl GazeWriter {
    /// Mutate the state under the lock
    pub fn write<R>(&self, f: impl FnOnce(&mut GazeSnapshot) -> R) -> R {
        // Writers never panic mid-update, so a poisoned lock still holds a whole value.
        let mut guard = self.cell.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn reader(&self) -> GazeReader {
        GazeReader {
            cell: Arc::clone(&self.cell),
        }
    }
}

/// Shared read handle
#[derive(Debug, Clone)]
pub struct GazeReader {
    cell: Arc<GazeCell>,
}

impl GazeFeed for GazeReader {
    fn snapshot(&self) -> GazeSnapshot {
        *self.cell.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
