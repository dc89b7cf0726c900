//! Toggle hotkey specification and matching.
//!
//! A hotkey is written `Mod+Mod+Key`, modifiers unordered and
//! case-insensitive, the main key optional (`Ctrl+Alt` is a valid
//! modifiers-only hotkey). Matching is a pure function of the set of keys
//! currently held.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::{ClickerError, Result};
use crate::keys::{parse_function_key, parse_hotkey_key, Key};

/// Immutable hotkey value.
///
/// `key`, when present, is uppercase and either a single ASCII alphanumeric
/// character or `F1`..`F24`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HotkeySpec {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    key: Option<String>,
}

impl Default for HotkeySpec {
    /// `Ctrl+Alt`.
    fn default() -> Self {
        Self {
            ctrl: true,
            alt: true,
            shift: false,
            key: None,
        }
    }
}

impl HotkeySpec {
    /// Parse a display string, yielding `None` when it is not a valid hotkey.
    ///
    /// Callers keep their previous hotkey on `None`; no default is
    /// substituted.
    pub fn parse(spec: &str) -> Option<Self> {
        spec.parse().ok()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Whether the combination is satisfied by the currently held keys.
    pub fn matches(&self, pressed: &HashSet<Key>) -> bool {
        if self.ctrl && !pressed.iter().any(Key::is_ctrl) {
            return false;
        }
        if self.alt && !pressed.iter().any(Key::is_alt) {
            return false;
        }
        if self.shift && !pressed.iter().any(Key::is_shift) {
            return false;
        }

        let Some(wanted) = self.key.as_deref() else {
            return true;
        };

        if pressed
            .iter()
            .filter_map(Key::char_text)
            .any(|text| text == wanted)
        {
            return true;
        }

        parse_function_key(wanted).is_some_and(|n| pressed.contains(&Key::Function(n)))
    }
}

impl FromStr for HotkeySpec {
    type Err = ClickerError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.replace('＋', "+");
        let parts: Vec<&str> = normalized
            .split('+')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            return Err(ClickerError::invalid_hotkey(s, "empty hotkey"));
        }

        let mut spec = Self {
            ctrl: false,
            alt: false,
            shift: false,
            key: None,
        };

        for part in parts {
            match part.to_lowercase().as_str() {
                "ctrl" | "control" => spec.ctrl = true,
                "alt" => spec.alt = true,
                "shift" => spec.shift = true,
                _ => {
                    if spec.key.is_some() {
                        return Err(ClickerError::invalid_hotkey(s, "multiple keys specified"));
                    }
                    let key = parse_hotkey_key(part).ok_or_else(|| {
                        ClickerError::invalid_hotkey(s, format!("unsupported key '{part}'"))
                    })?;
                    spec.key = Some(key.to_string());
                }
            }
        }

        Ok(spec)
    }
}

impl fmt::Display for HotkeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(4);
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        if let Some(key) = &self.key {
            parts.push(key);
        }
        write!(f, "{}", parts.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(keys: &[Key]) -> HashSet<Key> {
        keys.iter().copied().collect()
    }

    #[test]
    fn test_parse_modifiers_only() {
        let spec = HotkeySpec::parse("Ctrl+Alt").unwrap();
        assert!(spec.ctrl);
        assert!(spec.alt);
        assert!(!spec.shift);
        assert_eq!(spec.key(), None);
    }

    #[test]
    fn test_parse_with_function_key() {
        let spec = HotkeySpec::parse("Ctrl+Alt+F8").unwrap();
        assert_eq!(spec.key(), Some("F8"));

        let spec = HotkeySpec::parse("alt + ctrl + f8").unwrap();
        assert_eq!(spec, HotkeySpec::parse("Ctrl+Alt+F8").unwrap());
    }

    #[test]
    fn test_parse_character_key_uppercased() {
        let spec = HotkeySpec::parse("shift+q").unwrap();
        assert!(spec.shift);
        assert!(!spec.ctrl);
        assert_eq!(spec.key(), Some("Q"));
    }

    #[test]
    fn test_parse_fullwidth_plus() {
        let spec = HotkeySpec::parse("Ctrl＋Alt＋A").unwrap();
        assert_eq!(spec.to_string(), "Ctrl+Alt+A");
    }

    #[test]
    fn test_parse_failures() {
        assert!(HotkeySpec::parse("Alt+!@").is_none());
        assert!(HotkeySpec::parse("").is_none());
        assert!(HotkeySpec::parse("+").is_none());
        assert!(HotkeySpec::parse("Ctrl+F25").is_none());
        assert!(HotkeySpec::parse("Ctrl+A+B").is_none());
        assert!(HotkeySpec::parse("Ctrl+space").is_none());

        let err = "Alt+!@".parse::<HotkeySpec>().unwrap_err();
        assert!(err.to_string().contains("!@"));
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["Ctrl+Alt", "Ctrl+Alt+F8", "Shift+7", "Alt+Shift+Z"] {
            let spec = HotkeySpec::parse(text).unwrap();
            assert_eq!(HotkeySpec::parse(&spec.to_string()).unwrap(), spec);
        }
    }

    #[test]
    fn test_modifiers_only_match_either_side() {
        let spec = HotkeySpec::default();
        assert!(spec.matches(&held(&[Key::ControlLeft, Key::AltRight])));
        assert!(spec.matches(&held(&[Key::ControlRight, Key::AltLeft, Key::Char('X')])));
        assert!(!spec.matches(&held(&[Key::ControlLeft])));
        assert!(!spec.matches(&held(&[])));
    }

    #[test]
    fn test_modifiers_only_property() {
        let specs = [
            HotkeySpec::parse("Ctrl").unwrap(),
            HotkeySpec::parse("Alt+Shift").unwrap(),
            HotkeySpec::parse("Ctrl+Alt+Shift").unwrap(),
        ];
        let sets = [
            held(&[]),
            held(&[Key::ControlLeft]),
            held(&[Key::AltRight, Key::ShiftLeft]),
            held(&[Key::ControlRight, Key::AltLeft, Key::ShiftRight]),
            held(&[Key::Char('A'), Key::Function(3)]),
        ];
        for spec in &specs {
            for pressed in &sets {
                let expected = (!spec.ctrl || pressed.iter().any(Key::is_ctrl))
                    && (!spec.alt || pressed.iter().any(Key::is_alt))
                    && (!spec.shift || pressed.iter().any(Key::is_shift));
                assert_eq!(spec.matches(pressed), expected, "{spec} vs {pressed:?}");
            }
        }
    }

    #[test]
    fn test_character_key_match() {
        let spec = HotkeySpec::parse("Ctrl+A").unwrap();
        assert!(spec.matches(&held(&[Key::ControlLeft, Key::Char('A')])));
        assert!(!spec.matches(&held(&[Key::ControlLeft, Key::Char('B')])));
        assert!(!spec.matches(&held(&[Key::Char('A')])));
    }

    #[test]
    fn test_function_key_match() {
        let spec = HotkeySpec::parse("Ctrl+Alt+F8").unwrap();
        assert!(spec.matches(&held(&[Key::ControlLeft, Key::AltLeft, Key::Function(8)])));
        assert!(!spec.matches(&held(&[Key::ControlLeft, Key::AltLeft, Key::Function(9)])));
        assert!(!spec.matches(&held(&[Key::ControlLeft, Key::AltLeft])));
    }

    #[test]
    fn test_letter_f_is_not_function_key() {
        let spec = HotkeySpec::parse("Alt+F").unwrap();
        assert!(spec.matches(&held(&[Key::AltLeft, Key::Char('F')])));
        assert!(!spec.matches(&held(&[Key::AltLeft, Key::Function(1)])));
    }
}
