//! On-screen coding keyboard: layout, hit regions and key-to-action mapping

use crate::action::Action;
use crate::config::KeyboardConfig;
use crate::mapper::ScreenPoint;

use super::KeyId;

/// Seven rows: digits, QWERTY, home row, bottom row, operators, then two symbol rows.
/// `VOICE` switches voice listening on and off.
pub const KEY_LAYOUT: &[&[&str]] = &[
    &[
        "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", "%", "^", "&", "*", "(", ")", "`",
    ],
    &[
        "q", "w", "e", "r", "t", "y", "u", "i", "o", "p", "[", "]", "\\", "+", "BACKSPACE",
    ],
    &[
        "CAPSLOCK", "a", "s", "d", "f", "g", "h", "j", "k", "l", ";", "'", ":", "\"", "ENTER",
    ],
    &[
        "z", "x", "c", "v", "b", "n", "m", ",", ".", "<", ">", "/", "?", "$", "#",
    ],
    &["(", ")", "{", "}", "_", "|", "~", "TAB", "SPACE", "DEL", "VOICE"],
    &[
        "!", "@", "#", "$", "%", "^", "&", "*", "-", "+", "=", "[", "]", "{", "}", "|", "\\",
    ],
    &["`", "~", ";", ":", "'", "\"", ",", ".", "<", ">", "/", "?"],
];

/// Width of a key relative to a normal key
fn width_factor(label: &str) -> f64 {
    match label {
        "SPACE" => 1.5,
        "ENTER" | "BACKSPACE" | "TAB" | "VOICE" => 1.25,
        _ => 1.0,
    }
}

/// Hit-testable key rectangle in screen pixels; edges are inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyRegion {
    pub id: KeyId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl KeyRegion {
    pub fn new(id: KeyId, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, p: ScreenPoint) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// The laid-out keyboard plus its CAPSLOCK state
#[derive(Debug, Clone)]
pub struct Keyboard {
    labels: Vec<&'static str>,
    regions: Vec<KeyRegion>,
    geometry: KeyboardConfig,
    caps_lock: bool,
}

impl Keyboard {
    pub fn new(geometry: KeyboardConfig) -> Self {
        let labels = KEY_LAYOUT.iter().flat_map(|row| row.iter().copied()).collect();
        let mut keyboard = Self {
            labels,
            regions: Vec::new(),
            geometry,
            caps_lock: false,
        };
        keyboard.layout();
        keyboard
    }

    /// Rebuild every region after the keyboard moved or was resized. Key ids are unchanged.
    pub fn relayout(&mut self, geometry: KeyboardConfig) {
        if geometry != self.geometry {
            self.geometry = geometry;
            self.layout();
        }
    }

    fn layout(&mut self) {
        let g = self.geometry;
        let row_width = |row: &[&str]| {
            let keys: f64 = row.iter().map(|l| width_factor(l) * g.key_width).sum();
            keys + g.gap * row.len().saturating_sub(1) as f64
        };
        let widest = KEY_LAYOUT.iter().map(|r| row_width(*r)).fold(0.0, f64::max);

        self.regions.clear();
        let mut id = 0;
        for (r, row) in KEY_LAYOUT.iter().enumerate() {
            // Rows are centred under the widest one
            let mut x = g.origin_x + (widest - row_width(*row)) / 2.0;
            let y = g.origin_y + r as f64 * (g.key_height + g.gap);
            for label in row.iter() {
                let w = width_factor(label) * g.key_width;
                self.regions.push(KeyRegion::new(id, x, y, w, g.key_height));
                x += w + g.gap;
                id += 1;
            }
        }
    }

    pub fn regions(&self) -> &[KeyRegion] {
        &self.regions
    }

    pub fn label(&self, id: KeyId) -> Option<&'static str> {
        self.labels.get(id).copied()
    }

    /// First key with this label
    pub fn find(&self, label: &str) -> Option<&KeyRegion> {
        let id = self.labels.iter().position(|l| *l == label)?;
        self.regions.get(id)
    }

    pub fn caps_lock(&self) -> bool {
        self.caps_lock
    }

    /// Keys that work while typing is paused
    pub fn passes_gate(&self, id: KeyId) -> bool {
        self.label(id) == Some("VOICE")
    }

    /// Translate an activated key into an edit action.
    ///
    /// CAPSLOCK only flips the letter case and yields no action.
    pub fn press(&mut self, id: KeyId) -> Option<Action> {
        let label = self.label(id)?;
        match label {
            "CAPSLOCK" => {
                self.caps_lock = !self.caps_lock;
                None
            }
            "SPACE" => Some(Action::insert(" ")),
            "ENTER" => Some(Action::insert("\n")),
            "TAB" => Some(Action::insert("    ")),
            "BACKSPACE" | "DEL" => Some(Action::Backspace),
            "VOICE" => Some(Action::ToggleVoice),
            key if self.caps_lock => Some(Action::insert(key.to_uppercase())),
            key => Some(Action::insert(key)),
        }
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new(KeyboardConfig::default())
    }
}
