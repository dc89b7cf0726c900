//! Global key hook.
//!
//! A [`KeySource`] delivers raw press/release events to a [`KeySink`]. The
//! engine installs a sink that maintains the held-key set, runs hotkey edge
//! detection and handles the record trigger. [`RdevKeySource`] is the real
//! OS hook; tests script their own source.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{ClickerError, Result};
use crate::keys::{Key, NamedKey};

/// Key that records the pointer position. Always live, even while muted.
pub const RECORD_TRIGGER: Key = Key::Function(12);

/// A key delta from the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Pressed(Key),
    Released(Key),
}

/// Receiver of key deltas. Called on the hook's own thread.
pub type KeySink = Arc<dyn Fn(KeyEvent) + Send + Sync>;

/// Capability that feeds key deltas into the engine.
pub trait KeySource: Send {
    /// Begin delivering events to `sink`, replacing any previous sink.
    fn start(&mut self, sink: KeySink) -> Result<()>;

    /// Stop delivering events. Idempotent.
    fn stop(&mut self);
}

/// Deliver one event, swallowing any panic so the OS callback never unwinds.
pub fn deliver(sink: &KeySink, event: KeyEvent) {
    if panic::catch_unwind(AssertUnwindSafe(|| sink(event))).is_err() {
        warn!(?event, "key event handler panicked; event dropped");
    }
}

/// [`KeySource`] backed by `rdev::listen`.
///
/// `rdev` cannot unhook once listening, so the listener thread lives for the
/// rest of the process; `stop` detaches the sink and later events are
/// discarded.
#[derive(Default)]
pub struct RdevKeySource {
    sink: Arc<Mutex<Option<KeySink>>>,
    listening: bool,
}

impl RdevKeySource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeySource for RdevKeySource {
    fn start(&mut self, sink: KeySink) -> Result<()> {
        *self.sink.lock() = Some(sink);
        if self.listening {
            debug!("key hook already listening; sink replaced");
            return Ok(());
        }

        let slot = Arc::clone(&self.sink);
        thread::Builder::new()
            .name("key-hook".to_string())
            .spawn(move || {
                info!("key hook thread started");
                let callback = move |event: rdev::Event| {
                    let Some(event) = convert_event(&event.event_type) else {
                        return;
                    };
                    let sink = slot.lock().clone();
                    if let Some(sink) = sink {
                        deliver(&sink, event);
                    }
                };
                if let Err(e) = rdev::listen(callback) {
                    error!(?e, "key hook stopped - check input monitoring permissions");
                }
            })
            .map_err(|e| ClickerError::key_hook(format!("failed to spawn hook thread: {e}")))?;

        self.listening = true;
        Ok(())
    }

    fn stop(&mut self) {
        if self.sink.lock().take().is_some() {
            info!("key hook detached");
        }
    }
}

fn convert_event(event_type: &rdev::EventType) -> Option<KeyEvent> {
    match event_type {
        rdev::EventType::KeyPress(key) => from_rdev(key).map(KeyEvent::Pressed),
        rdev::EventType::KeyRelease(key) => from_rdev(key).map(KeyEvent::Released),
        _ => None,
    }
}

/// Map an `rdev` key to a [`Key`]. Keys the engine has no use for map to
/// `None` and are ignored.
fn from_rdev(key: &rdev::Key) -> Option<Key> {
    use rdev::Key as R;

    let mapped = match key {
        R::ControlLeft => Key::ControlLeft,
        R::ControlRight => Key::ControlRight,
        R::Alt => Key::AltLeft,
        R::AltGr => Key::AltRight,
        R::ShiftLeft => Key::ShiftLeft,
        R::ShiftRight => Key::ShiftRight,

        R::KeyA => Key::Char('A'),
        R::KeyB => Key::Char('B'),
        R::KeyC => Key::Char('C'),
        R::KeyD => Key::Char('D'),
        R::KeyE => Key::Char('E'),
        R::KeyF => Key::Char('F'),
        R::KeyG => Key::Char('G'),
        R::KeyH => Key::Char('H'),
        R::KeyI => Key::Char('I'),
        R::KeyJ => Key::Char('J'),
        R::KeyK => Key::Char('K'),
        R::KeyL => Key::Char('L'),
        R::KeyM => Key::Char('M'),
        R::KeyN => Key::Char('N'),
        R::KeyO => Key::Char('O'),
        R::KeyP => Key::Char('P'),
        R::KeyQ => Key::Char('Q'),
        R::KeyR => Key::Char('R'),
        R::KeyS => Key::Char('S'),
        R::KeyT => Key::Char('T'),
        R::KeyU => Key::Char('U'),
        R::KeyV => Key::Char('V'),
        R::KeyW => Key::Char('W'),
        R::KeyX => Key::Char('X'),
        R::KeyY => Key::Char('Y'),
        R::KeyZ => Key::Char('Z'),

        R::Num0 | R::Kp0 => Key::Char('0'),
        R::Num1 | R::Kp1 => Key::Char('1'),
        R::Num2 | R::Kp2 => Key::Char('2'),
        R::Num3 | R::Kp3 => Key::Char('3'),
        R::Num4 | R::Kp4 => Key::Char('4'),
        R::Num5 | R::Kp5 => Key::Char('5'),
        R::Num6 | R::Kp6 => Key::Char('6'),
        R::Num7 | R::Kp7 => Key::Char('7'),
        R::Num8 | R::Kp8 => Key::Char('8'),
        R::Num9 | R::Kp9 => Key::Char('9'),

        R::F1 => Key::Function(1),
        R::F2 => Key::Function(2),
        R::F3 => Key::Function(3),
        R::F4 => Key::Function(4),
        R::F5 => Key::Function(5),
        R::F6 => Key::Function(6),
        R::F7 => Key::Function(7),
        R::F8 => Key::Function(8),
        R::F9 => Key::Function(9),
        R::F10 => Key::Function(10),
        R::F11 => Key::Function(11),
        R::F12 => Key::Function(12),

        R::Space => Key::Named(NamedKey::Space),
        R::Return | R::KpReturn => Key::Named(NamedKey::Enter),
        R::Tab => Key::Named(NamedKey::Tab),
        R::Escape => Key::Named(NamedKey::Escape),
        R::Backspace => Key::Named(NamedKey::Backspace),
        R::Delete => Key::Named(NamedKey::Delete),
        R::Home => Key::Named(NamedKey::Home),
        R::End => Key::Named(NamedKey::End),
        R::PageUp => Key::Named(NamedKey::PageUp),
        R::PageDown => Key::Named(NamedKey::PageDown),
        R::UpArrow => Key::Named(NamedKey::Up),
        R::DownArrow => Key::Named(NamedKey::Down),
        R::LeftArrow => Key::Named(NamedKey::Left),
        R::RightArrow => Key::Named(NamedKey::Right),

        _ => return None,
    };

    Some(mapped)
}
