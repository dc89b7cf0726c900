//! Key tokens shared by the key hook, the hotkey matcher and the key sender.
//!
//! A [`Key`] is either a physical key reported by the global hook (modifiers
//! keep their left/right side) or a fireable token parsed from text such as
//! `"A"`, `"F8"` or `"space"`.

use std::fmt;
use std::str::FromStr;

use crate::error::{ClickerError, Result};

/// Highest function key number accepted in key tokens and hotkeys.
pub const MAX_FUNCTION_KEY: u8 = 24;

/// Non-alphanumeric keys that can be fired by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Space,
    Enter,
    Tab,
    Escape,
    Backspace,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
}

impl NamedKey {
    fn from_name(name: &str) -> Option<Self> {
        let key = match name {
            "space" => Self::Space,
            "enter" | "return" => Self::Enter,
            "tab" => Self::Tab,
            "escape" | "esc" => Self::Escape,
            "backspace" => Self::Backspace,
            "delete" => Self::Delete,
            "home" => Self::Home,
            "end" => Self::End,
            "pageup" => Self::PageUp,
            "pagedown" => Self::PageDown,
            "up" | "arrowup" => Self::Up,
            "down" | "arrowdown" => Self::Down,
            "left" | "arrowleft" => Self::Left,
            "right" | "arrowright" => Self::Right,
            _ => return None,
        };
        Some(key)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Space => "SPACE",
            Self::Enter => "ENTER",
            Self::Tab => "TAB",
            Self::Escape => "ESCAPE",
            Self::Backspace => "BACKSPACE",
            Self::Delete => "DELETE",
            Self::Home => "HOME",
            Self::End => "END",
            Self::PageUp => "PAGEUP",
            Self::PageDown => "PAGEDOWN",
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        }
    }
}

/// A keyboard key.
///
/// Character keys are stored uppercased so that `Char('a')` never appears;
/// use [`Key::character`] to build one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ControlLeft,
    ControlRight,
    AltLeft,
    AltRight,
    ShiftLeft,
    ShiftRight,
    /// An ASCII letter or digit, uppercased.
    Char(char),
    /// `F1`..=`F24`.
    Function(u8),
    Named(NamedKey),
}

impl Key {
    /// Build a character key, normalizing to uppercase.
    pub fn character(c: char) -> Self {
        Self::Char(c.to_ascii_uppercase())
    }

    pub fn is_ctrl(&self) -> bool {
        matches!(self, Self::ControlLeft | Self::ControlRight)
    }

    pub fn is_alt(&self) -> bool {
        matches!(self, Self::AltLeft | Self::AltRight)
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, Self::ShiftLeft | Self::ShiftRight)
    }

    /// Uppercased textual form of a character key.
    pub fn char_text(&self) -> Option<String> {
        match self {
            Self::Char(c) => Some(c.to_uppercase().collect()),
            _ => None,
        }
    }
}

/// Parse `F<n>` (case-insensitive) into a function key number in 1..=24.
pub fn parse_function_key(token: &str) -> Option<u8> {
    let rest = token
        .strip_prefix('F')
        .or_else(|| token.strip_prefix('f'))?;
    if rest.is_empty() || rest.len() > 2 || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let n: u8 = rest.parse().ok()?;
    (1..=MAX_FUNCTION_KEY).contains(&n).then_some(n)
}

/// Parse a single alphanumeric character or function key, the subset of
/// tokens allowed as a hotkey's main key.
pub fn parse_hotkey_key(token: &str) -> Option<Key> {
    let mut chars = token.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c.is_ascii_alphanumeric().then(|| Key::character(c));
    }
    parse_function_key(token).map(Key::Function)
}

/// Parse a fireable key token.
pub fn parse_key_token(token: &str) -> Result<Key> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(ClickerError::invalid_key(token, "empty key"));
    }
    if let Some(key) = parse_hotkey_key(trimmed) {
        return Ok(key);
    }
    NamedKey::from_name(&trimmed.to_lowercase())
        .map(Key::Named)
        .ok_or_else(|| ClickerError::invalid_key(token, "unsupported key"))
}

impl FromStr for Key {
    type Err = ClickerError;

    fn from_str(s: &str) -> Result<Self> {
        parse_key_token(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ControlLeft => write!(f, "CTRL_L"),
            Self::ControlRight => write!(f, "CTRL_R"),
            Self::AltLeft => write!(f, "ALT_L"),
            Self::AltRight => write!(f, "ALT_R"),
            Self::ShiftLeft => write!(f, "SHIFT_L"),
            Self::ShiftRight => write!(f, "SHIFT_R"),
            Self::Char(c) => write!(f, "{}", c.to_ascii_uppercase()),
            Self::Function(n) => write!(f, "F{n}"),
            Self::Named(named) => write!(f, "{}", named.name()),
        }
    }
}
