//! Engine parameter snapshot.
//!
//! [`EngineParams`] is replaced wholesale on every update; there is no
//! per-field setter. Numeric fields are clamped by [`EngineParams::sanitized`]
//! on the way in so the engine never sees a zero interval.

use serde::{Deserialize, Serialize};

use crate::keys::Key;

/// Smallest interval the engine will ever sleep for.
pub const MIN_INTERVAL_MS: u32 = 1;
/// Largest interval accepted; bounds how long a stop request can take.
pub const MAX_INTERVAL_MS: u32 = 10_000;

/// Clamp a caller-supplied interval into `[MIN_INTERVAL_MS, MAX_INTERVAL_MS]`.
pub fn clamp_interval(ms: i64) -> u32 {
    ms.clamp(i64::from(MIN_INTERVAL_MS), i64::from(MAX_INTERVAL_MS)) as u32
}

/// Clamp a caller-supplied duration in seconds to be non-negative.
pub fn clamp_seconds(sec: i64) -> u32 {
    sec.clamp(0, i64::from(u32::MAX)) as u32
}

/// Screen coordinate. Serialized as an `[x, y]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (i32, i32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// What fires on each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Left,
    Right,
    /// A key press: the key sequence if set, else `key_to_repeat`.
    Key,
}

/// Mouse button synthesized for [`Action::Left`] / [`Action::Right`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// A time-boxed fast window after run start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Burst {
    pub enabled: bool,
    pub duration_sec: u32,
    pub interval_ms: u32,
}

impl Burst {
    pub const fn disabled(interval_ms: u32) -> Self {
        Self {
            enabled: false,
            duration_sec: 0,
            interval_ms,
        }
    }

    fn sanitized(self) -> Self {
        Self {
            interval_ms: clamp_interval(i64::from(self.interval_ms)),
            ..self
        }
    }
}

/// Where the pointer goes before each action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickMode {
    /// Fire wherever the pointer already is.
    #[default]
    Follow,
    Fixed(Point),
    /// Uniform random point inside the rectangle, bounds inclusive. The
    /// bounds may be given in either order.
    RandomRect { x1: i32, x2: i32, y1: i32, y2: i32 },
    /// Cycle through `EngineParams::recorded_points`.
    Recorded,
}

/// Full parameter snapshot owned by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineParams {
    pub action: Action,
    /// Steady-state delay between ticks.
    pub delay_ms: u32,
    pub burst1: Burst,
    pub burst2: Burst,
    /// Informational only; the steady phase is unbounded.
    pub normal_duration_sec: u32,
    pub click_mode: ClickMode,
    pub key_to_repeat: Option<Key>,
    pub key_sequence: Vec<Key>,
    pub recorded_points: Vec<Point>,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            action: Action::Left,
            delay_ms: 100,
            burst1: Burst::disabled(50),
            burst2: Burst::disabled(20),
            normal_duration_sec: 0,
            click_mode: ClickMode::Follow,
            key_to_repeat: None,
            key_sequence: Vec::new(),
            recorded_points: Vec::new(),
        }
    }
}

impl EngineParams {
    /// Clamp every numeric field to its allowed range.
    pub fn sanitized(self) -> Self {
        Self {
            delay_ms: clamp_interval(i64::from(self.delay_ms)),
            burst1: self.burst1.sanitized(),
            burst2: self.burst2.sanitized(),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_interval() {
        assert_eq!(clamp_interval(0), 1);
        assert_eq!(clamp_interval(-50), 1);
        assert_eq!(clamp_interval(250), 250);
        assert_eq!(clamp_interval(60_000), MAX_INTERVAL_MS);
    }

    #[test]
    fn test_clamp_seconds() {
        assert_eq!(clamp_seconds(-3), 0);
        assert_eq!(clamp_seconds(12), 12);
    }

    #[test]
    fn test_sanitized_clamps_all_intervals() {
        let params = EngineParams {
            delay_ms: 0,
            burst1: Burst {
                enabled: true,
                duration_sec: 3,
                interval_ms: 0,
            },
            burst2: Burst {
                enabled: true,
                duration_sec: 2,
                interval_ms: 99_999,
            },
            ..EngineParams::default()
        }
        .sanitized();

        assert_eq!(params.delay_ms, 1);
        assert_eq!(params.burst1.interval_ms, 1);
        assert_eq!(params.burst1.duration_sec, 3);
        assert_eq!(params.burst2.interval_ms, MAX_INTERVAL_MS);
    }

    #[test]
    fn test_point_serializes_as_pair() {
        let json = serde_json::to_string(&vec![Point::new(3, -4)]).unwrap();
        assert_eq!(json, "[[3,-4]]");
        let back: Vec<Point> = serde_json::from_str("[[10, 20]]").unwrap();
        assert_eq!(back, vec![Point::new(10, 20)]);
    }
}
