//! Synthesized pointer and keyboard input.
//!
//! The engine only talks to the [`InputSender`] trait so it can run against a
//! recording fake in tests. [`EnigoSender`] is the real backend.

use enigo::{Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::{ClickerError, Result};
use crate::keys::{Key, NamedKey};
use crate::params::{MouseButton, Point};

/// Capability to synthesize input and query the pointer.
///
/// Implementations must be callable from the engine loop and from the key
/// hook thread at the same time.
pub trait InputSender: Send + Sync {
    /// Move the pointer to an absolute screen position.
    fn move_to(&self, point: Point) -> Result<()>;

    /// Press and release a mouse button where the pointer is.
    fn click(&self, button: MouseButton) -> Result<()>;

    /// Press and release a key.
    fn tap_key(&self, key: Key) -> Result<()>;

    /// Current pointer position.
    fn cursor_position(&self) -> Result<Point>;
}

/// [`InputSender`] backed by `enigo`.
pub struct EnigoSender {
    enigo: Mutex<Enigo>,
}

impl EnigoSender {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| ClickerError::backend_unavailable(e.to_string()))?;
        info!("enigo input backend ready");
        Ok(Self {
            enigo: Mutex::new(enigo),
        })
    }
}

impl InputSender for EnigoSender {
    fn move_to(&self, point: Point) -> Result<()> {
        self.enigo
            .lock()
            .move_mouse(point.x, point.y, Coordinate::Abs)
            .map_err(|e| ClickerError::input_failed("move pointer", e))
    }

    fn click(&self, button: MouseButton) -> Result<()> {
        let btn = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
        };
        self.enigo
            .lock()
            .button(btn, Direction::Click)
            .map_err(|e| ClickerError::input_failed(format!("click {button:?} button"), e))
    }

    fn tap_key(&self, key: Key) -> Result<()> {
        let code = to_enigo_key(key)?;
        debug!(%key, "tapping key");
        self.enigo
            .lock()
            .key(code, Direction::Click)
            .map_err(|e| ClickerError::input_failed(format!("press key {key}"), e))
    }

    fn cursor_position(&self) -> Result<Point> {
        let (x, y) = self
            .enigo
            .lock()
            .location()
            .map_err(|e| ClickerError::input_failed("read pointer position", e))?;
        Ok(Point::new(x, y))
    }
}

fn to_enigo_key(key: Key) -> Result<enigo::Key> {
    use enigo::Key as K;

    let code = match key {
        Key::ControlLeft | Key::ControlRight => K::Control,
        Key::AltLeft | Key::AltRight => K::Alt,
        Key::ShiftLeft | Key::ShiftRight => K::Shift,
        // Lowercase so letters are pressed without an implied Shift.
        Key::Char(c) => K::Unicode(c.to_ascii_lowercase()),
        Key::Named(named) => match named {
            NamedKey::Space => K::Space,
            NamedKey::Enter => K::Return,
            NamedKey::Tab => K::Tab,
            NamedKey::Escape => K::Escape,
            NamedKey::Backspace => K::Backspace,
            NamedKey::Delete => K::Delete,
            NamedKey::Home => K::Home,
            NamedKey::End => K::End,
            NamedKey::PageUp => K::PageUp,
            NamedKey::PageDown => K::PageDown,
            NamedKey::Up => K::UpArrow,
            NamedKey::Down => K::DownArrow,
            NamedKey::Left => K::LeftArrow,
            NamedKey::Right => K::RightArrow,
        },
        Key::Function(n) => match n {
            1 => K::F1,
            2 => K::F2,
            3 => K::F3,
            4 => K::F4,
            5 => K::F5,
            6 => K::F6,
            7 => K::F7,
            8 => K::F8,
            9 => K::F9,
            10 => K::F10,
            11 => K::F11,
            12 => K::F12,
            13 => K::F13,
            14 => K::F14,
            15 => K::F15,
            16 => K::F16,
            17 => K::F17,
            18 => K::F18,
            19 => K::F19,
            20 => K::F20,
            _ => {
                return Err(ClickerError::invalid_key(
                    key.to_string(),
                    "function key cannot be synthesized on this platform",
                ))
            }
        },
    };

    Ok(code)
}
