//! Consumer loop: gaze snapshot -> mapper -> dwell -> editor, plus voice actions from the channel
//!
//! Runs as one cooperative task with two fixed cadences: the UI tick redraws the status line,
//! the dwell tick advances selection. Nothing here can fail the loop; every per-tick problem
//! becomes "no coordinate" or a logged warning.

use flume::Receiver;
use std::io::Write;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::action::{Action, ActionEvent};
use crate::config::Config;
use crate::dwell::{DwellSelector, KeyActivated, Keyboard};
use crate::editor::Editor;
use crate::gaze::GazeFeed;
use crate::mapper::{GazeMapper, ScreenPoint};
use crate::state::SharedState;
use crate::status_bar::{StatusBarState, StatusLine};

/// Tick cadences of the consumer loop
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    pub ui: Duration,
    pub dwell: Duration,
}

impl From<&Config> for Cadence {
    fn from(config: &Config) -> Self {
        Self {
            ui: Duration::from_millis(config.ui.tick_ms),
            dwell: config.dwell.tick(),
        }
    }
}

pub struct ConsumerLoop<F: GazeFeed> {
    feed: F,
    mapper: GazeMapper,
    dwell: DwellSelector,
    keyboard: Keyboard,
    editor: Box<dyn Editor>,
    state: SharedState,
    confidence_threshold: f64,
    status: StatusBarState,
}

impl<F: GazeFeed> ConsumerLoop<F> {
    pub fn new(
        config: &Config,
        feed: F,
        mapper: GazeMapper,
        editor: Box<dyn Editor>,
        state: SharedState,
    ) -> Self {
        if !mapper.is_calibrated() {
            warn!("No calibration loaded; dwell selection is disabled until `gazetype calibrate`");
        }
        Self {
            feed,
            mapper,
            dwell: DwellSelector::new(config.dwell.duration(), config.dwell.tick()),
            keyboard: Keyboard::new(config.keyboard),
            editor,
            state,
            confidence_threshold: config.gaze.confidence_threshold,
            status: StatusBarState {
                confidence_threshold: config.gaze.confidence_threshold,
                ..Default::default()
            },
        }
    }

    pub fn keyboard(&self) -> &Keyboard {
        &self.keyboard
    }

    pub fn dwell(&self) -> &DwellSelector {
        &self.dwell
    }

    pub fn editor(&self) -> &dyn Editor {
        self.editor.as_ref()
    }

    /// Screen coordinate for the current gaze, if it is usable.
    ///
    /// Low confidence and a missing calibration both yield `None`, so the centre fallback of
    /// a lost face can never dwell on a key.
    pub fn gaze_point(&self) -> Option<ScreenPoint> {
        let snap = self.feed.snapshot();
        if snap.confidence < self.confidence_threshold {
            return None;
        }
        self.mapper.to_screen(snap.gx, snap.gy).ok()
    }

    /// One dwell step. Returns the event that was applied, if a key completed.
    pub fn dwell_tick(&mut self) -> Option<ActionEvent> {
        let point = self.gaze_point();
        let KeyActivated(id) = self.dwell.tick(point, self.keyboard.regions())?;

        let label = self.keyboard.label(id).unwrap_or("?");
        let action = if self.state.typing.is_open() || self.keyboard.passes_gate(id) {
            // CAPSLOCK yields no action
            self.keyboard.press(id)?
        } else {
            Action::Blocked
        };
        debug!("Key {} activated -> {}", label, action);

        let event = ActionEvent::dwell(action);
        self.apply(&event);
        Some(event)
    }

    /// Apply an action from either source
    pub fn apply(&mut self, event: &ActionEvent) {
        let blocked = Action::Blocked;
        // The gate may have closed after a voice action was queued
        let action = if event.action.edits_text() && !self.state.typing.is_open() {
            &blocked
        } else {
            &event.action
        };
        if matches!(action, Action::ToggleVoice) {
            let enabled = self.state.toggle_voice();
            info!("Voice input {}", if enabled { "on" } else { "off" });
        }
        if let Err(e) = self.editor.apply(action) {
            warn!("Editor ({}) failed to apply {}: {}", self.editor.name(), action, e);
        }
        self.status.last_action = Some(action.to_string());
    }

    /// Refresh the status model from shared state
    pub fn status(&mut self) -> &StatusBarState {
        let snap = self.feed.snapshot();
        let s = &mut self.status;
        s.confidence = snap.confidence;
        s.fps = snap.fps;
        s.hovered = self.dwell.hovered().and_then(|id| self.keyboard.label(id));
        s.dwell_progress = self.dwell.progress();
        s.typing_open = self.state.typing.is_open();
        s.voice_enabled = self.state.voice_enabled();
        s.calibrated = self.mapper.is_calibrated();
        s.caps_lock = self.keyboard.caps_lock();
        s.update_spinner();
        &self.status
    }

    /// Run until shutdown. Voice actions arrive on `rx`; a closed channel just stops that input.
    pub async fn run<W: Write>(
        mut self,
        cadence: Cadence,
        rx: Receiver<ActionEvent>,
        mut line: Option<StatusLine<W>>,
    ) -> Self {
        let mut ui = time::interval(cadence.ui);
        let mut dwell = time::interval(cadence.dwell);
        ui.set_missed_tick_behavior(MissedTickBehavior::Delay);
        dwell.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut voice_open = true;

        info!(
            "Consumer loop started (editor: {}, ui {:?}, dwell {:?})",
            self.editor.name(),
            cadence.ui,
            cadence.dwell
        );

        while self.state.is_running() {
            tokio::select! {
                _ = ui.tick() => {
                    let status = self.status().clone();
                    if let Some(out) = line.as_mut() {
                        if let Err(e) = out.draw(&status) {
                            warn!("Status line draw failed, disabling it: {}", e);
                            line = None;
                        }
                    }
                }
                _ = dwell.tick() => {
                    self.dwell_tick();
                }
                event = rx.recv_async(), if voice_open => match event {
                    Ok(event) => self.apply(&event),
                    Err(_) => {
                        debug!("Action channel closed");
                        voice_open = false;
                    }
                },
            }
        }

        if let Some(line) = line.as_mut() {
            let _ = line.finish();
        }
        info!("Consumer loop stopped");
        self
    }
}
