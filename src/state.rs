//! Shared runtime state - the flags every loop can see
//!
//! The smoothed gaze lives in its own lock-guarded cell (`gaze::cell`); everything here is a
//! single boolean that flips atomically and is visible to the next tick of every loop.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;

/// Global switch for every action except pause/resume.
///
/// Cloning shares the same underlying flag.
#[derive(Clone)]
pub struct TypingGate(Arc<AtomicBool>);

impl TypingGate {
    pub fn new(open: bool) -> Self {
        Self(Arc::new(AtomicBool::new(open)))
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn open(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn close(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for TypingGate {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for TypingGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypingGate").field(&self.is_open()).finish()
    }
}

/// Cooperative cancellation flag shared between a long-running procedure and whoever may stop it
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CancelToken").field(&self.is_cancelled()).finish()
    }
}

/// Shared runtime state - accessible from all loops
pub struct RuntimeState {
    /// Typing gate shared by voice and dwell actions
    pub typing: TypingGate,
    /// Voice loop listens only while set
    pub voice_enabled: AtomicBool,
    /// Cleared on shutdown; every loop exits at its next tick
    running: AtomicBool,
    /// Cancels an in-progress calibration
    pub cancel: CancelToken,
}

impl RuntimeState {
    pub fn new(config: &Config) -> Arc<Self> {
        Arc::new(Self {
            typing: TypingGate::new(true),
            voice_enabled: AtomicBool::new(config.voice.enabled),
            running: AtomicBool::new(true),
            cancel: CancelToken::new(),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop every loop and any calibration in progress
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.cancel.cancel();
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled.load(Ordering::SeqCst)
    }

    pub fn set_voice_enabled(&self, enabled: bool) {
        self.voice_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Toggle voice listening, returns new state
    pub fn toggle_voice(&self) -> bool {
        !self.voice_enabled.fetch_xor(true, Ordering::SeqCst)
    }
}

impl fmt::Debug for RuntimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeState")
            .field("typing", &self.typing.is_open())
            .field("voice_enabled", &self.voice_enabled())
            .field("running", &self.is_running())
            .field("cancel", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Type alias for shared state
pub type SharedState = Arc<RuntimeState>;
