//! Spoken-command interpreter
//!
//! Maps one transcribed utterance to one editor action. Matching is a fixed, ordered walk over
//! data tables:
//! 1. Control phrases (`<verb> typing`) - the verb may be one edit off, and the gate never
//!    blocks them
//! 2. Gate check - everything below returns `Blocked` while typing is paused
//! 3. Editing, symbol and snippet tables - exact match on the normalized text
//! 4. Dictation of the original utterance

use tracing::debug;

use crate::action::Action;
use crate::fuzzy::{clean_for_matching, closest_word};
use crate::state::TypingGate;

/// Whole-word replacements for common misrecognitions of command words
const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("inert", "insert"),
    ("inside", "insert"),
    ("intend", "indent"),
    ("paws", "pause"),
    ("pours", "pause"),
    ("resumed", "resume"),
];

/// Control verbs, in match priority order. Each is followed by `CONTROL_OBJECT`.
const CONTROLS: &[(&str, Control)] = &[
    ("pause", Control::Pause),
    ("stop", Control::Pause),
    ("resume", Control::Resume),
    ("start", Control::Resume),
];

/// Second word of every control phrase; must be heard exactly
const CONTROL_OBJECT: &str = "typing";

/// Edits tolerated in the control verb
const CONTROL_VERB_EDITS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Pause,
    Resume,
}

/// Action constructor stored in the vocabulary tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Template {
    Insert(&'static str),
    Backspace,
    DeleteLine,
    ClearLine,
    Dedent,
}

impl Template {
    fn build(self) -> Action {
        match self {
            Template::Insert(text) => Action::insert(text),
            Template::Backspace => Action::Backspace,
            Template::DeleteLine => Action::DeleteLine,
            Template::ClearLine => Action::ClearLine,
            Template::Dedent => Action::Dedent,
        }
    }
}

/// A named group of exact phrases, checked in table order
struct Section {
    title: &'static str,
    entries: &'static [(&'static str, Template)],
}

const EDITING: &[(&str, Template)] = &[
    ("new line", Template::Insert("\n")),
    ("next line", Template::Insert("\n")),
    ("indent", Template::Insert("    ")),
    ("dedent", Template::Dedent),
    ("backspace", Template::Backspace),
    ("delete line", Template::DeleteLine),
    ("clear line", Template::ClearLine),
];

const SYMBOLS: &[(&str, Template)] = &[
    ("open bracket", Template::Insert("{")),
    ("close bracket", Template::Insert("}")),
    ("open parenthesis", Template::Insert("(")),
    ("close parenthesis", Template::Insert(")")),
    ("open square bracket", Template::Insert("[")),
    ("close square bracket", Template::Insert("]")),
    ("colon", Template::Insert(":")),
    ("comma", Template::Insert(",")),
    ("dot", Template::Insert(".")),
    ("equals", Template::Insert("=")),
    ("plus", Template::Insert("+")),
    ("minus", Template::Insert("-")),
    ("multiply", Template::Insert("*")),
    ("divide", Template::Insert("/")),
];

const SNIPPETS: &[(&str, Template)] = &[
    ("insert for loop", Template::Insert("for i in range():\n    ")),
    ("insert while loop", Template::Insert("while condition:\n    ")),
    ("insert if condition", Template::Insert("if condition:\n    ")),
    ("insert else", Template::Insert("else:\n    ")),
    ("insert function", Template::Insert("def function_name():\n    ")),
    (
        "insert class",
        Template::Insert("class ClassName:\n    def __init__(self):\n        "),
    ),
    ("insert print", Template::Insert("print()")),
    ("insert main", Template::Insert("if __name__ == '__main__':\n    ")),
];

const SECTIONS: &[Section] = &[
    Section {
        title: "EDITING",
        entries: EDITING,
    },
    Section {
        title: "SYMBOLS",
        entries: SYMBOLS,
    },
    Section {
        title: "SNIPPETS",
        entries: SNIPPETS,
    },
];

/// Lowercase, trim, strip trailing punctuation, collapse whitespace and fix misheard command words
pub fn normalize(text: &str) -> String {
    let lower = text.trim().to_lowercase();
    let stripped = lower.trim_end_matches(|c: char| c.is_ascii_punctuation());
    stripped
        .split_whitespace()
        .map(|word| {
            SUBSTITUTIONS
                .iter()
                .find(|(heard, _)| *heard == word)
                .map_or(word, |(_, meant)| *meant)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turns utterances into actions and owns the pause/resume side of the typing gate
pub struct CommandInterpreter {
    gate: TypingGate,
}

impl CommandInterpreter {
    pub fn new(gate: TypingGate) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &TypingGate {
        &self.gate
    }

    /// Interpret one utterance. The same normalized text always gives the same action for the
    /// same gate state.
    pub fn interpret(&self, text: &str) -> Action {
        let normalized = normalize(text);

        if let Some(control) = match_control(&normalized) {
            return match control {
                Control::Pause => {
                    self.gate.close();
                    debug!("Typing paused by voice");
                    Action::Pause
                }
                Control::Resume => {
                    self.gate.open();
                    debug!("Typing resumed by voice");
                    Action::Resume
                }
            };
        }

        if !self.gate.is_open() {
            return Action::Blocked;
        }

        lookup(&normalized).unwrap_or_else(|| Action::Dictation(text.trim().to_string()))
    }

    /// Voice vocabulary as a boxed table
    pub fn help_text() -> String {
        const WIDTH: usize = 61;
        let rule = |l: char, r: char| format!("{}{}{}\n", l, "─".repeat(WIDTH), r);
        let row = |s: String| format!("│ {:<w$}│\n", s, w = WIDTH - 1);

        let mut out = rule('╭', '╮');
        out += &row("                 VOICE COMMANDS".to_string());
        out += &rule('├', '┤');
        out += &row("CONTROL (always available)".to_string());
        for (verb, control) in CONTROLS {
            let what = match control {
                Control::Pause => "Pause typing",
                Control::Resume => "Resume typing",
            };
            let phrase = format!("{} {}", verb, CONTROL_OBJECT);
            out += &row(format!("  {:<32} {}", phrase, what));
        }
        for section in SECTIONS {
            out += &rule('├', '┤');
            out += &row(section.title.to_string());
            for (phrase, template) in section.entries {
                let what = match template {
                    Template::Insert(text) => {
                        let first = text.lines().next().unwrap_or_default();
                        match *text {
                            "\n" => "⏎".to_string(),
                            "    " => "4 spaces".to_string(),
                            _ => first.to_string(),
                        }
                    }
                    Template::Backspace => "⌫".to_string(),
                    Template::DeleteLine => "Delete current line".to_string(),
                    Template::ClearLine => "Empty current line".to_string(),
                    Template::Dedent => "Remove one indent level".to_string(),
                };
                out += &row(format!("  {:<32} {}", phrase, what));
            }
        }
        out += &rule('├', '┤');
        out += &row("Anything else is typed as dictated.".to_string());
        out += &rule('╰', '╯');
        out
    }

    pub fn print_help() {
        println!("{}", Self::help_text());
    }
}

fn match_control(normalized: &str) -> Option<Control> {
    let cleaned = clean_for_matching(normalized);
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    let [verb, object] = words[..] else {
        return None;
    };
    if object != CONTROL_OBJECT {
        return None;
    }
    let verbs: Vec<&str> = CONTROLS.iter().map(|(v, _)| *v).collect();
    closest_word(&verbs, verb, CONTROL_VERB_EDITS).map(|i| CONTROLS[i].1)
}

fn lookup(normalized: &str) -> Option<Action> {
    SECTIONS
        .iter()
        .flat_map(|s| s.entries.iter())
        .find(|(phrase, _)| *phrase == normalized)
        .map(|(_, template)| template.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> CommandInterpreter {
        CommandInterpreter::new(TypingGate::new(true))
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  New Line. "), "new line");
        assert_eq!(normalize("Inert   for loop!"), "insert for loop");
        assert_eq!(normalize("intend"), "indent");
        assert_eq!(normalize("Paws typing."), "pause typing");
        // Whole words only
        assert_eq!(normalize("inertia"), "inertia");
    }

    #[test]
    fn test_editing_commands() {
        let i = interpreter();
        assert_eq!(i.interpret("new line"), Action::insert("\n"));
        assert_eq!(i.interpret("Next line."), Action::insert("\n"));
        assert_eq!(i.interpret("indent"), Action::insert("    "));
        assert_eq!(i.interpret("intend"), Action::insert("    "));
        assert_eq!(i.interpret("dedent"), Action::Dedent);
        assert_eq!(i.interpret("backspace"), Action::Backspace);
        assert_eq!(i.interpret("delete line"), Action::DeleteLine);
        assert_eq!(i.interpret("clear line"), Action::ClearLine);
    }

    #[test]
    fn test_symbols() {
        let i = interpreter();
        let cases = [
            ("open bracket", "{"),
            ("close bracket", "}"),
            ("open parenthesis", "("),
            ("close square bracket", "]"),
            ("colon", ":"),
            ("equals", "="),
            ("divide", "/"),
        ];
        for (phrase, symbol) in cases {
            assert_eq!(i.interpret(phrase), Action::insert(symbol), "{}", phrase);
        }
    }

    #[test]
    fn test_snippets() {
        let i = interpreter();
        assert_eq!(
            i.interpret("insert for loop"),
            Action::insert("for i in range():\n    ")
        );
        assert_eq!(
            i.interpret("inside function"),
            Action::insert("def function_name():\n    ")
        );
        assert_eq!(i.interpret("insert print"), Action::insert("print()"));
    }

    #[test]
    fn test_dictation_keeps_original_text() {
        let i = interpreter();
        assert_eq!(
            i.interpret("  Hello World. "),
            Action::Dictation("Hello World.".to_string())
        );
    }

    #[test]
    fn test_gate_suppression() {
        let i = interpreter();
        assert_eq!(i.interpret("pause typing"), Action::Pause);
        assert!(!i.gate().is_open());

        assert_eq!(i.interpret("new line"), Action::Blocked);
        assert_eq!(i.interpret("hello world"), Action::Blocked);
        assert_eq!(i.interpret("insert class"), Action::Blocked);

        // Control phrases still work while paused
        assert_eq!(i.interpret("stop typing"), Action::Pause);
        assert_eq!(i.interpret("Resume typing."), Action::Resume);
        assert!(i.gate().is_open());
        assert_eq!(i.interpret("new line"), Action::insert("\n"));
    }

    #[test]
    fn test_misheard_control_phrases() {
        let i = interpreter();
        assert_eq!(i.interpret("paws typing"), Action::Pause);
        assert_eq!(i.interpret("Start typing!"), Action::Resume);
        assert_eq!(i.interpret("stap typing"), Action::Pause);
        assert_eq!(i.interpret("resum typing"), Action::Resume);
    }

    #[test]
    fn test_near_miss_phrases_are_dictated() {
        let i = interpreter();
        for text in [
            "stop timing",
            "pause string",
            "start timing",
            "post typing",
            "stop tying",
            "set typing",
            "faster typing",
            "please stop typing now",
        ] {
            assert_eq!(i.interpret(text), Action::Dictation(text.to_string()), "{}", text);
            assert!(i.gate().is_open(), "{} closed the gate", text);
        }
    }

    #[test]
    fn test_deterministic() {
        let a = interpreter();
        let b = interpreter();
        for text in ["dot", "insert main", "print the result", "clear line"] {
            assert_eq!(a.interpret(text), b.interpret(text));
            assert_eq!(a.interpret(text), a.interpret(text));
        }
    }

    #[test]
    fn test_help_lists_every_phrase() {
        let help = CommandInterpreter::help_text();
        for (verb, _) in CONTROLS.iter() {
            assert!(help.contains(&format!("{} typing", verb)));
        }
        for section in SECTIONS {
            for (phrase, _) in section.entries {
                assert!(help.contains(phrase), "missing {}", phrase);
            }
        }
    }
}
