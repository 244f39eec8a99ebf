//! Dwell selection: hit-test a screen point against key regions and turn a sustained hover into
//! one key activation.
//!
//! Progress is kept in whole milliseconds so that `duration / tick` ticks always reach exactly
//! 100%, without floating-point drift.

pub mod keyboard;

use std::time::Duration;
use tracing::{debug, trace};

use crate::mapper::ScreenPoint;

pub use keyboard::{KEY_LAYOUT, Keyboard, KeyRegion};

/// Stable identifier of a key region (its index in the layout)
pub type KeyId = usize;

/// Emitted once per completed dwell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyActivated(pub KeyId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DwellState {
    #[default]
    Idle,
    Hovering { key: KeyId, elapsed_ms: u64 },
}

/// Fixed-cadence dwell state machine. Call `tick` once per dwell interval.
#[derive(Debug)]
pub struct DwellSelector {
    duration_ms: u64,
    tick_ms: u64,
    state: DwellState,
}

impl DwellSelector {
    pub fn new(duration: Duration, tick: Duration) -> Self {
        Self {
            duration_ms: (duration.as_millis() as u64).max(1),
            tick_ms: tick.as_millis() as u64,
            state: DwellState::Idle,
        }
    }

    pub fn state(&self) -> DwellState {
        self.state
    }

    pub fn hovered(&self) -> Option<KeyId> {
        match self.state {
            DwellState::Idle => None,
            DwellState::Hovering { key, .. } => Some(key),
        }
    }

    /// Dwell progress of the hovered key in [0, 1]
    pub fn progress(&self) -> f64 {
        match self.state {
            DwellState::Idle => 0.0,
            DwellState::Hovering { elapsed_ms, .. } => {
                (elapsed_ms as f64 / self.duration_ms as f64).min(1.0)
            }
        }
    }

    /// Drop any hover, e.g. when gaze becomes unusable
    pub fn reset(&mut self) {
        self.state = DwellState::Idle;
    }

    /// Advance one tick with the current coordinate (`None` when there is no usable gaze).
    ///
    /// A change of hovered key restarts from zero. Reaching the full duration emits one
    /// activation and restarts the dwell on the same key.
    pub fn tick(&mut self, point: Option<ScreenPoint>, regions: &[KeyRegion]) -> Option<KeyActivated> {
        let hit = point.and_then(|p| hit_test(p, regions));

        match (self.state, hit) {
            (_, None) => {
                self.state = DwellState::Idle;
                None
            }
            (DwellState::Hovering { key, elapsed_ms }, Some(id)) if key == id => {
                let elapsed_ms = elapsed_ms + self.tick_ms;
                if elapsed_ms >= self.duration_ms {
                    debug!("Dwell complete on key {}", id);
                    self.state = DwellState::Hovering {
                        key: id,
                        elapsed_ms: 0,
                    };
                    Some(KeyActivated(id))
                } else {
                    self.state = DwellState::Hovering {
                        key: id,
                        elapsed_ms,
                    };
                    None
                }
            }
            (_, Some(id)) => {
                trace!("Hover moved to key {}", id);
                self.state = DwellState::Hovering {
                    key: id,
                    elapsed_ms: 0,
                };
                None
            }
        }
    }
}

/// First region containing the point
pub fn hit_test(point: ScreenPoint, regions: &[KeyRegion]) -> Option<KeyId> {
    regions.iter().find(|r| r.contains(point)).map(|r| r.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> Vec<KeyRegion> {
        vec![
            KeyRegion::new(0, 0.0, 0.0, 100.0, 50.0),
            KeyRegion::new(1, 110.0, 0.0, 100.0, 50.0),
        ]
    }

    fn selector() -> DwellSelector {
        DwellSelector::new(Duration::from_millis(900), Duration::from_millis(50))
    }

    const ON_A: Option<ScreenPoint> = Some(ScreenPoint::new(50.0, 25.0));
    const ON_B: Option<ScreenPoint> = Some(ScreenPoint::new(150.0, 25.0));

    #[test]
    fn test_full_dwell_activates_once() {
        let mut dwell = selector();
        let keys = regions();

        // Entering tick, then 18 ticks of 50ms
        assert_eq!(dwell.tick(ON_A, &keys), None);
        let mut events = Vec::new();
        for _ in 0..18 {
            events.extend(dwell.tick(ON_A, &keys));
        }
        assert_eq!(events, vec![KeyActivated(0)]);
        assert_eq!(dwell.progress(), 0.0);
        assert_eq!(dwell.hovered(), Some(0));
    }

    #[test]
    fn test_continued_dwell_needs_full_duration_again() {
        let mut dwell = selector();
        let keys = regions();
        let activations = (0..1 + 18 * 3)
            .filter_map(|_| dwell.tick(ON_A, &keys))
            .count();
        assert_eq!(activations, 3);
    }

    #[test]
    fn test_switching_key_resets_progress() {
        let mut dwell = selector();
        let keys = regions();
        dwell.tick(ON_A, &keys);
        for _ in 0..9 {
            dwell.tick(ON_A, &keys);
        }
        assert!((dwell.progress() - 0.5).abs() < 1e-9);

        dwell.tick(ON_B, &keys);
        assert_eq!(dwell.progress(), 0.0);
        dwell.tick(ON_A, &keys);
        assert_eq!(dwell.progress(), 0.0);

        // Nine more ticks only get back to half way
        for _ in 0..9 {
            assert_eq!(dwell.tick(ON_A, &keys), None);
        }
        assert!((dwell.progress() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_outside_all_keys_is_idle() {
        let mut dwell = selector();
        let keys = regions();
        dwell.tick(ON_A, &keys);
        dwell.tick(ON_A, &keys);
        assert_eq!(dwell.tick(Some(ScreenPoint::new(105.0, 25.0)), &keys), None);
        assert_eq!(dwell.state(), DwellState::Idle);
        assert_eq!(dwell.tick(None, &keys), None);
        assert_eq!(dwell.tick(None, &[]), None);
        assert_eq!(dwell.state(), DwellState::Idle);
    }

    #[test]
    fn test_first_match_on_overlap() {
        let keys = vec![
            KeyRegion::new(7, 0.0, 0.0, 100.0, 100.0),
            KeyRegion::new(8, 50.0, 50.0, 100.0, 100.0),
        ];
        assert_eq!(hit_test(ScreenPoint::new(75.0, 75.0), &keys), Some(7));
    }
}
