//! Voice loop: utterances in, actions out over the bounded action channel
//!
//! The speech engine is a black box behind `UtteranceSource`. The loop may block for an
//! arbitrarily long time inside `next_utterance`; it never touches gaze state.

use flume::Sender;
use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Read};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::action::ActionEvent;
use crate::command::CommandInterpreter;
use crate::error::RecognitionMiss;
use crate::state::SharedState;

/// How often a disabled voice loop re-checks the enabled flag
const IDLE_POLL: Duration = Duration::from_millis(100);

/// A speech recognizer producing one transcribed utterance per call
pub trait UtteranceSource: Send {
    /// `Ok(None)` when the source is exhausted and listening should stop
    fn next_utterance(&mut self) -> Result<Option<String>, RecognitionMiss>;
}

/// One utterance per input line; a line that is blank after trimming counts as a miss.
///
/// Stands in for a recognizer on terminals and in pipelines (`echo "new line" | gazetype run`).
pub struct LineUtterances<R> {
    reader: BufReader<R>,
}

impl<R: Read + Send> LineUtterances<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }
}

impl LineUtterances<std::io::Stdin> {
    pub fn stdin() -> Self {
        Self::new(std::io::stdin())
    }
}

impl<R: Read + Send> UtteranceSource for LineUtterances<R> {
    fn next_utterance(&mut self) -> Result<Option<String>, RecognitionMiss> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) if line.trim().is_empty() => Err(RecognitionMiss("silence".into())),
            Ok(_) => Ok(Some(line.trim().to_string())),
            Err(e) => Err(RecognitionMiss(e.to_string())),
        }
    }
}

/// Fixed list of utterances, for tests and demos
#[derive(Default)]
pub struct ScriptedUtterances {
    items: VecDeque<Result<String, RecognitionMiss>>,
}

impl ScriptedUtterances {
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: texts.into_iter().map(|t| Ok(t.into())).collect(),
        }
    }

    pub fn miss(mut self, reason: &str) -> Self {
        self.items.push_back(Err(RecognitionMiss(reason.to_string())));
        self
    }

    pub fn then(mut self, text: &str) -> Self {
        self.items.push_back(Ok(text.to_string()));
        self
    }
}

impl UtteranceSource for ScriptedUtterances {
    fn next_utterance(&mut self) -> Result<Option<String>, RecognitionMiss> {
        self.items.pop_front().transpose()
    }
}

/// Run the voice loop on the current thread until shutdown, source exhaustion, or the consumer
/// hanging up.
pub fn run_voice_loop(
    source: &mut dyn UtteranceSource,
    interpreter: &CommandInterpreter,
    state: &SharedState,
    tx: &Sender<ActionEvent>,
) {
    info!("Voice loop started");
    let mut misses = 0usize;

    while state.is_running() {
        if !state.voice_enabled() {
            thread::sleep(IDLE_POLL);
            continue;
        }

        let text = match source.next_utterance() {
            Ok(Some(text)) => text,
            Ok(None) => {
                info!("Voice input ended");
                break;
            }
            Err(miss) => {
                misses += 1;
                debug!("{}", miss);
                continue;
            }
        };

        // Listening may have been switched off while we were blocked
        if !state.voice_enabled() || !state.is_running() {
            continue;
        }

        let action = interpreter.interpret(&text);
        debug!("Heard {:?} -> {}", text, action);
        if tx.send(ActionEvent::voice(action)).is_err() {
            warn!("Action channel closed, stopping voice loop");
            break;
        }
    }

    info!("Voice loop stopped ({} misses)", misses);
}

/// Spawn the voice loop on its own thread
pub fn spawn_voice(
    mut source: Box<dyn UtteranceSource>,
    interpreter: CommandInterpreter,
    state: SharedState,
    tx: Sender<ActionEvent>,
) -> JoinHandle<()> {
    thread::spawn(move || run_voice_loop(source.as_mut(), &interpreter, &state, &tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::config::Config;
    use crate::state::RuntimeState;
    use std::io::Cursor;

    #[test]
    fn test_line_utterances() {
        let mut src = LineUtterances::new(Cursor::new("new line\n\n  dot \n"));
        assert_eq!(src.next_utterance().unwrap(), Some("new line".into()));
        assert!(src.next_utterance().is_err());
        assert_eq!(src.next_utterance().unwrap(), Some("dot".into()));
        assert_eq!(src.next_utterance().unwrap(), None);
    }

    #[test]
    fn test_loop_forwards_actions_and_skips_misses() {
        let state = RuntimeState::new(&Config::default());
        let interpreter = CommandInterpreter::new(state.typing.clone());
        let (tx, rx) = flume::bounded(16);
        let mut source = ScriptedUtterances::new(["pause typing", "new line"])
            .miss("mumble")
            .then("resume typing")
            .then("comma");

        run_voice_loop(&mut source, &interpreter, &state, &tx);

        let actions: Vec<Action> = rx.drain().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                Action::Pause,
                Action::Blocked,
                Action::Resume,
                Action::insert(","),
            ]
        );
        assert!(state.typing.is_open());
    }

    #[test]
    fn test_loop_stops_when_consumer_hangs_up() {
        let state = RuntimeState::new(&Config::default());
        let interpreter = CommandInterpreter::new(state.typing.clone());
        let (tx, rx) = flume::bounded(1);
        drop(rx);
        let mut source = ScriptedUtterances::new(["dot", "dot", "dot"]);

        run_voice_loop(&mut source, &interpreter, &state, &tx);
        // Only the first utterance was consumed before the send failed
        assert_eq!(source.items.len(), 2);
    }

    #[test]
    fn test_spawned_loop_exits_on_end_of_input() {
        let state = RuntimeState::new(&Config::default());
        let interpreter = CommandInterpreter::new(state.typing.clone());
        let (tx, rx) = flume::bounded(4);
        let handle = spawn_voice(
            Box::new(ScriptedUtterances::new(["indent"])),
            interpreter,
            state,
            tx,
        );
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap().action, Action::insert("    "));
    }
}
