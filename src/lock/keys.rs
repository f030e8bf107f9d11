use serde::{Deserialize, Serialize};

/// Longest tail of typed characters kept for keyword matching
const BUFFER_CAPACITY: usize = 64;

/// A key event as reported by the client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCombo {
    /// `KeyboardEvent.key`: a single character or a name like `Shift`
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub meta: bool,
}

impl KeyCombo {
    pub fn plain(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Shortcuts that leave or replace the game window
    pub fn is_forbidden(&self) -> bool {
        let key = self.key.to_lowercase();
        match key.as_str() {
            "f11" => true,
            "tab" => self.alt,
            "t" | "w" | "n" => self.ctrl,
            _ => false,
        }
    }

    /// The typed character, if this is a plain single-character key
    pub fn printable(&self) -> Option<char> {
        if self.ctrl || self.alt || self.meta {
            return None;
        }
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Some(c),
            _ => None,
        }
    }
}

/// Rolling buffer of recently typed characters
#[derive(Debug, Clone, Default)]
pub struct KeyBuffer {
    typed: String,
}

impl KeyBuffer {
    /// Append the key if it is printable; named keys are ignored
    pub fn push(&mut self, combo: &KeyCombo) {
        let Some(c) = combo.printable() else {
            return;
        };
        self.typed.extend(c.to_lowercase());
        let excess = self.typed.chars().count().saturating_sub(BUFFER_CAPACITY);
        if excess > 0 {
            self.typed = self.typed.chars().skip(excess).collect();
        }
    }

    pub fn contains(&self, keyword: &str) -> bool {
        !keyword.is_empty() && self.typed.contains(&keyword.to_lowercase())
    }

    pub fn clear(&mut self) {
        self.typed.clear();
    }
}
