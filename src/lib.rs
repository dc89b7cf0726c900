//! # Autoclicker
//!
//! A background engine that repeatedly clicks or presses keys at a
//! configurable cadence, toggled on and off by a global hotkey.
//!
//! ## Features
//!
//! - Left click, right click or keystroke actions, with round-robin key sequences
//! - Two optional burst phases with faster intervals before the steady delay
//! - Follow, fixed, random-rectangle and recorded-point target positions
//! - Global hotkey (`Ctrl+Alt`, `Ctrl+Alt+F8`, ...) with rising-edge toggling
//! - `F12` records the pointer position at any time, even while muted
//! - Atomic parameter updates while running
//! - JSON profile configuration
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use autoclicker::{ClickEngine, EngineParams, EnigoSender, HotkeySpec, RdevKeySource};
//!
//! let sender = Arc::new(EnigoSender::new().unwrap());
//! let engine = ClickEngine::new(sender, Box::new(RdevKeySource::new())).unwrap();
//!
//! engine.set_params(EngineParams {
//!     delay_ms: 50,
//!     ..EngineParams::default()
//! });
//! if let Some(hotkey) = HotkeySpec::parse("Ctrl+Alt+F8") {
//!     engine.update_hotkey(hotkey);
//! }
//! ```
//!
//! ## Configuration
//!
//! Profiles can be stored in a JSON settings file:
//!
//! ```json
//! {
//!   "hotkey": "Ctrl+Alt",
//!   "profiles": {
//!     "farm": { "button": "key", "key_sequence": ["1", "2", "space"], "delay_ms": 250 }
//!   },
//!   "last_profile": "farm"
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod hotkey;
pub mod input_hook;
pub mod input_sender;
pub mod keys;
pub mod params;
pub mod position;
pub mod timing;

pub use config::{Config, Profile};
pub use engine::{ClickEngine, EngineEvent};
pub use error::{ClickerError, Result};
pub use hotkey::HotkeySpec;
pub use input_hook::{KeyEvent, KeySink, KeySource, RdevKeySource, RECORD_TRIGGER};
pub use input_sender::{EnigoSender, InputSender};
pub use keys::Key;
pub use params::{Action, Burst, ClickMode, EngineParams, MouseButton, Point};
