//! Click target resolution.

use rand::Rng;

use crate::params::{ClickMode, Point};

/// Resolve where the pointer should move before the next action.
///
/// Returns `None` when the pointer should stay put: follow mode, or recorded
/// mode with nothing recorded. In recorded mode `cursor` is read modulo the
/// current length and advanced past the returned point.
pub fn resolve<R: Rng + ?Sized>(
    mode: &ClickMode,
    recorded: &[Point],
    cursor: &mut usize,
    rng: &mut R,
) -> Option<Point> {
    match *mode {
        ClickMode::Follow => None,
        ClickMode::Fixed(point) => Some(point),
        ClickMode::RandomRect { x1, x2, y1, y2 } => {
            let (lo_x, hi_x) = (x1.min(x2), x1.max(x2));
            let (lo_y, hi_y) = (y1.min(y2), y1.max(y2));
            Some(Point::new(
                rng.gen_range(lo_x..=hi_x),
                rng.gen_range(lo_y..=hi_y),
            ))
        }
        ClickMode::Recorded => {
            if recorded.is_empty() {
                *cursor = 0;
                return None;
            }
            let idx = *cursor % recorded.len();
            *cursor = (idx + 1) % recorded.len();
            Some(recorded[idx])
        }
    }
}
