//! Editor actions: the closed set of things the pipeline asks the editor to do

use std::fmt;

/// One edit request for the editor collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Insert text verbatim at the cursor
    Insert(String),
    Backspace,
    DeleteLine,
    ClearLine,
    /// Remove one indentation level from the current line
    Dedent,
    Pause,
    Resume,
    /// Start or stop listening for voice commands
    ToggleVoice,
    /// Suppressed because the typing gate is closed
    Blocked,
    /// Free speech that matched no command, inserted as spoken
    Dictation(String),
}

impl Action {
    pub fn insert(text: impl Into<String>) -> Self {
        Action::Insert(text.into())
    }

    /// Whether applying this action changes the editor's text
    pub fn edits_text(&self) -> bool {
        !matches!(
            self,
            Action::Pause | Action::Resume | Action::ToggleVoice | Action::Blocked
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Insert(text) => write!(f, "insert {:?}", text),
            Action::Backspace => write!(f, "backspace"),
            Action::DeleteLine => write!(f, "delete line"),
            Action::ClearLine => write!(f, "clear line"),
            Action::Dedent => write!(f, "dedent"),
            Action::Pause => write!(f, "pause"),
            Action::Resume => write!(f, "resume"),
            Action::ToggleVoice => write!(f, "toggle voice"),
            Action::Blocked => write!(f, "blocked"),
            Action::Dictation(text) => write!(f, "dictation {:?}", text),
        }
    }
}

/// Where an action came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionSource {
    Dwell,
    Voice,
}

/// An action on its way to the consumer loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionEvent {
    pub source: ActionSource,
    pub action: Action,
}

impl ActionEvent {
    pub fn voice(action: Action) -> Self {
        Self {
            source: ActionSource::Voice,
            action,
        }
    }

    pub fn dwell(action: Action) -> Self {
        Self {
            source: ActionSource::Dwell,
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edits_text() {
        assert!(!Action::Pause.edits_text());
        assert!(!Action::ToggleVoice.edits_text());
        assert!(!Action::Blocked.edits_text());
        assert!(Action::insert("x").edits_text());
        assert!(Action::Dedent.edits_text());
    }

    #[test]
    fn test_display() {
        assert_eq!(Action::insert("\n").to_string(), "insert \"\\n\"");
        assert_eq!(Action::Dedent.to_string(), "dedent");
    }
}
