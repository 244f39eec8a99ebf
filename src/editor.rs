//! Editor collaborators that apply actions
//!
//! - **TextBuffer**: in-memory line buffer, cursor always at the end (default)
//! - **KeystrokeEditor**: replays actions as OS keystrokes into the focused window (feature
//!   `keystrokes`)

use crate::action::Action;
use crate::error::EditorError;

/// Indent unit removed by `Dedent`
const INDENT: &str = "    ";

/// Something that can apply editor actions
pub trait Editor {
    fn apply(&mut self, action: &Action) -> Result<(), EditorError>;

    /// Short name for logs and the status line
    fn name(&self) -> &str;

    /// Current contents, when the editor keeps them
    fn contents(&self) -> Option<String> {
        None
    }
}

/// Plain text buffer. Lines never contain `\n`; there is always at least one line.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    lines: Vec<String>,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
        }
    }
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn current_line(&self) -> &str {
        self.lines.last().map(String::as_str).unwrap_or_default()
    }

    fn current_line_mut(&mut self) -> &mut String {
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }

    fn insert(&mut self, text: &str) {
        let mut parts = text.split('\n');
        if let Some(first) = parts.next() {
            self.current_line_mut().push_str(first);
        }
        for part in parts {
            self.lines.push(part.to_string());
        }
    }

    fn backspace(&mut self) {
        if self.current_line_mut().pop().is_none() && self.lines.len() > 1 {
            // Empty line: delete the newline before it
            self.lines.pop();
        }
    }

    fn delete_line(&mut self) {
        if self.lines.len() > 1 {
            self.lines.pop();
        } else {
            self.current_line_mut().clear();
        }
    }

    fn dedent(&mut self) {
        let line = self.current_line_mut();
        let strip = line
            .chars()
            .take(INDENT.len())
            .take_while(|c| *c == ' ')
            .count();
        line.replace_range(..strip, "");
    }
}

impl Editor for TextBuffer {
    fn apply(&mut self, action: &Action) -> Result<(), EditorError> {
        match action {
            Action::Insert(text) => self.insert(text),
            Action::Dictation(text) => {
                self.insert(text);
                self.insert(" ");
            }
            Action::Backspace => self.backspace(),
            Action::DeleteLine => self.delete_line(),
            Action::ClearLine => self.current_line_mut().clear(),
            Action::Dedent => self.dedent(),
            Action::Pause | Action::Resume | Action::ToggleVoice | Action::Blocked => {}
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "buffer"
    }

    fn contents(&self) -> Option<String> {
        Some(self.text())
    }
}

#[cfg(feature = "keystrokes")]
pub use keystrokes::KeystrokeEditor;

#[cfg(feature = "keystrokes")]
mod keystrokes {
    //! Keystroke output using enigo, with a clipboard paste path for multi-line text

    use arboard::Clipboard;
    use enigo::{Direction, Enigo, Key, Keyboard, Settings};
    use std::thread;
    use std::time::Duration;
    use tracing::warn;

    use super::{Editor, INDENT};
    use crate::action::Action;
    use crate::error::EditorError;

    pub struct KeystrokeEditor {
        enigo: Enigo,
        clipboard: Option<Clipboard>,
    }

    impl KeystrokeEditor {
        pub fn new() -> Result<Self, EditorError> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| EditorError::Keystroke(format!("failed to initialize: {}", e)))?;
            let clipboard = Clipboard::new()
                .map_err(|e| warn!("Clipboard unavailable, typing directly: {}", e))
                .ok();
            Ok(Self { enigo, clipboard })
        }

        fn modifier_key() -> Key {
            #[cfg(target_os = "macos")]
            {
                Key::Meta
            }
            #[cfg(not(target_os = "macos"))]
            {
                Key::Control
            }
        }

        fn click(&mut self, key: Key) -> Result<(), EditorError> {
            self.enigo
                .key(key, Direction::Click)
                .map_err(|e| EditorError::Keystroke(format!("failed to send key: {}", e)))
        }

        fn combo(&mut self, modifiers: &[Key], key: Key) -> Result<(), EditorError> {
            let err = |e: enigo::InputError| EditorError::Keystroke(e.to_string());
            for m in modifiers {
                self.enigo.key(*m, Direction::Press).map_err(err)?;
            }
            thread::sleep(Duration::from_millis(10));
            self.enigo.key(key, Direction::Click).map_err(err)?;
            thread::sleep(Duration::from_millis(50));
            for m in modifiers.iter().rev() {
                self.enigo.key(*m, Direction::Release).map_err(err)?;
            }
            Ok(())
        }

        fn type_text(&mut self, text: &str) -> Result<(), EditorError> {
            if text.is_empty() {
                return Ok(());
            }
            // Editors auto-indent typed newlines, so multi-line snippets are pasted
            if text.contains('\n') && text.len() > 1 {
                match self.paste(text) {
                    Ok(()) => return Ok(()),
                    Err(e) => warn!("Paste failed, typing directly: {}", e),
                }
            }
            self.enigo
                .text(text)
                .map_err(|e| EditorError::Keystroke(format!("failed to type text: {}", e)))
        }

        fn paste(&mut self, text: &str) -> Result<(), EditorError> {
            let clipboard = self
                .clipboard
                .as_mut()
                .ok_or_else(|| EditorError::Clipboard("not available".into()))?;
            let previous = clipboard.get_text().ok();
            clipboard
                .set_text(text)
                .map_err(|e| EditorError::Clipboard(e.to_string()))?;
            thread::sleep(Duration::from_millis(50));

            let pasted = self.combo(&[Self::modifier_key()], Key::Unicode('v'));
            thread::sleep(Duration::from_millis(100));

            if let (Some(old), Some(clipboard)) = (previous, self.clipboard.as_mut()) {
                let _ = clipboard.set_text(old);
            }
            pasted
        }
    }

    impl Editor for KeystrokeEditor {
        fn apply(&mut self, action: &Action) -> Result<(), EditorError> {
            match action {
                Action::Insert(text) => self.type_text(text),
                Action::Dictation(text) => self.type_text(&format!("{} ", text)),
                Action::Backspace => self.click(Key::Backspace),
                Action::ClearLine => {
                    self.combo(&[Key::Shift], Key::Home)?;
                    self.click(Key::Backspace)
                }
                Action::DeleteLine => {
                    self.click(Key::End)?;
                    self.combo(&[Key::Shift], Key::Home)?;
                    self.click(Key::Backspace)?;
                    self.click(Key::Backspace)
                }
                Action::Dedent => {
                    self.click(Key::Home)?;
                    for _ in 0..INDENT.len() {
                        self.click(Key::Delete)?;
                    }
                    self.click(Key::End)
                }
                Action::Pause | Action::Resume | Action::ToggleVoice | Action::Blocked => Ok(()),
            }
        }

        fn name(&self) -> &str {
            "keystrokes"
        }
    }
}
