//! One-line terminal status: gaze quality, dwell progress and gate state

use crossterm::style::Print;
use crossterm::terminal::{self, ClearType};
use crossterm::{cursor, queue};
use std::io::{self, Write};
use unicode_width::UnicodeWidthStr;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const BLOCKS: &[char] = &[' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Everything the status line shows, refreshed every UI tick
#[derive(Clone, Debug, Default)]
pub struct StatusBarState {
    pub confidence: f64,
    pub fps: f64,
    pub confidence_threshold: f64,
    pub hovered: Option<&'static str>,
    pub dwell_progress: f64,
    pub typing_open: bool,
    pub voice_enabled: bool,
    pub calibrated: bool,
    pub caps_lock: bool,
    pub last_action: Option<String>,
    pub spin_frame: usize,
}

impl StatusBarState {
    pub fn update_spinner(&mut self) {
        self.spin_frame = self.spin_frame.wrapping_add(1);
    }

    /// Confidence and fps; dimmed when gaze is below the usable threshold
    pub fn gaze_string(&self) -> String {
        let text = format!("Conf: {:.2} | FPS: {:.1}", self.confidence, self.fps);
        if self.confidence < self.confidence_threshold {
            format!("\x1b[2m{}\x1b[0m", text)
        } else {
            format!("\x1b[92m{}\x1b[0m", text)
        }
    }

    /// Four-cell dwell bar with eighth-block resolution
    pub fn dwell_bar(&self) -> String {
        let Some(key) = self.hovered else {
            return "\x1b[90m·\x1b[0m".to_string();
        };
        let total_steps = 4 * 8;
        let step = (self.dwell_progress.clamp(0.0, 1.0) * total_steps as f64) as usize;
        let full = step / 8;
        let partial = step % 8;
        let mut bar = "█".repeat(full);
        if full < 4 {
            bar.push(BLOCKS[partial]);
            bar.push_str(&" ".repeat(3 - full));
        }
        format!("\x1b[33m[{}] {}\x1b[0m", key, bar)
    }

    pub fn toggles_string(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.typing_open {
                "\x1b[32m[TYPING]\x1b[0m"
            } else {
                "\x1b[33m[PAUSED]\x1b[0m"
            },
            if self.voice_enabled {
                "\x1b[32m[VOICE]\x1b[0m"
            } else {
                "\x1b[31m[VOICE OFF]\x1b[0m"
            },
            if self.calibrated {
                "\x1b[32m[CAL]\x1b[0m"
            } else {
                "\x1b[31m[UNCALIBRATED]\x1b[0m"
            },
            if self.caps_lock { "\x1b[36m[CAPS]\x1b[0m" } else { "" },
        )
    }

    pub fn render_status(&self, term_width: Option<usize>) -> String {
        let spinner = SPINNER[self.spin_frame % SPINNER.len()];
        let mut line = format!(
            "\x1b[93m{}\x1b[0m {} │ {} │ {}",
            spinner,
            self.gaze_string(),
            self.dwell_bar(),
            self.toggles_string()
        );
        if let Some(action) = &self.last_action {
            line.push_str(&format!(" │ {}", action));
        }

        // Drop the trailing action text rather than wrapping
        if let Some(width) = term_width {
            if visible_width(&line) > width {
                if let Some(cut) = line.rfind(" │ ") {
                    if self.last_action.is_some() {
                        line.truncate(cut);
                    }
                }
            }
        }
        line
    }
}

/// Display width ignoring ANSI colour sequences
fn visible_width(s: &str) -> usize {
    let mut plain = String::with_capacity(s.len());
    let mut in_escape = false;
    for c in s.chars() {
        match (in_escape, c) {
            (false, '\x1b') => in_escape = true,
            (true, 'm') => in_escape = false,
            (true, _) => {}
            (false, c) => plain.push(c),
        }
    }
    plain.width()
}

/// Redraws the status in place on one terminal line
pub struct StatusLine<W: Write> {
    out: W,
    drawn: bool,
}

impl StatusLine<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> StatusLine<W> {
    pub fn new(out: W) -> Self {
        Self { out, drawn: false }
    }

    pub fn draw(&mut self, state: &StatusBarState) -> io::Result<()> {
        let width = terminal::size().map(|(w, _)| w as usize).ok();
        queue!(
            self.out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print(state.render_status(width))
        )?;
        self.drawn = true;
        self.out.flush()
    }

    /// Leave the cursor on a fresh line
    pub fn finish(&mut self) -> io::Result<()> {
        if self.drawn {
            queue!(self.out, Print("\r\n"))?;
            self.drawn = false;
        }
        self.out.flush()
    }
}
