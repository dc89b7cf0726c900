//! Burst / steady interval selection.

use std::time::Duration;

use crate::params::EngineParams;

/// Pick the interval that applies `elapsed` after run start.
///
/// Burst 1 runs first, burst 2 follows it. When burst 1 is disabled burst 2
/// starts at zero instead. Disabled bursts contribute no window, and once
/// every enabled window has passed the steady delay applies indefinitely.
pub fn select_interval(elapsed: Duration, params: &EngineParams) -> Duration {
    let e = elapsed.as_secs_f64();
    let b1 = &params.burst1;
    let b2 = &params.burst2;
    let b1_end = f64::from(b1.duration_sec);
    let b2_len = f64::from(b2.duration_sec);

    let ms = if b1.enabled && e < b1_end {
        b1.interval_ms
    } else if b1.enabled && b2.enabled && e < b1_end + b2_len {
        b2.interval_ms
    } else if !b1.enabled && b2.enabled && e < b2_len {
        b2.interval_ms
    } else {
        params.delay_ms
    };

    Duration::from_millis(u64::from(ms.max(1)))
}
