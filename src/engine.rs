//! The click engine.
//!
//! All mutable state lives in one [`EngineState`] behind a single mutex. The
//! worker loop, the key hook thread and the owning thread each take the lock
//! only long enough to copy or replace state; input synthesis always happens
//! with the lock released.
//!
//! Stopping only flips `running`. The worker notices at the top of its next
//! iteration, so a stop takes at most one in-flight interval.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::error::{ClickerError, Result};
use crate::hotkey::HotkeySpec;
use crate::input_hook::{KeyEvent, KeySink, KeySource, RECORD_TRIGGER};
use crate::input_sender::InputSender;
use crate::keys::Key;
use crate::params::{Action, ClickMode, EngineParams, MouseButton, Point};
use crate::{position, timing};

/// Pause after a failed tick before trying again.
pub const TICK_BACKOFF: Duration = Duration::from_millis(100);

const EVENT_CAPACITY: usize = 64;

/// Notifications published by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Emitted on every toggle with the new state.
    StateChanged { running: bool },
    /// The record trigger was pressed with the pointer at this position.
    PointRecorded(Point),
}

#[derive(Debug)]
struct EngineState {
    params: Arc<EngineParams>,
    hotkey: HotkeySpec,
    running: bool,
    /// Bumped on every stop→run transition so stale cursor writes from a
    /// previous run are discarded.
    generation: u64,
    started_at: Instant,
    sequence_cursor: usize,
    recorded_cursor: usize,
    combo_active: bool,
    pressed: HashSet<Key>,
    muted: bool,
    /// A worker thread is executing `run_loop`. Cleared by the worker itself
    /// under the lock as it exits.
    loop_alive: bool,
    /// Set by `shutdown`; no later transition may start the loop again.
    shutting_down: bool,
}

impl EngineState {
    fn new() -> Self {
        Self {
            params: Arc::new(EngineParams::default()),
            hotkey: HotkeySpec::default(),
            running: false,
            generation: 0,
            started_at: Instant::now(),
            sequence_cursor: 0,
            recorded_cursor: 0,
            combo_active: false,
            pressed: HashSet::new(),
            muted: false,
            loop_alive: false,
            shutting_down: false,
        }
    }
}

fn wrap(cursor: usize, len: usize) -> usize {
    if len == 0 {
        0
    } else {
        cursor % len
    }
}

/// Parameters and cursors copied out under the lock for one tick.
struct Snapshot {
    params: Arc<EngineParams>,
    generation: u64,
    elapsed: Duration,
    sequence_cursor: usize,
    recorded_cursor: usize,
}

struct Shared {
    state: Mutex<EngineState>,
    sender: Arc<dyn InputSender>,
    events: broadcast::Sender<EngineEvent>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn emit(&self, event: EngineEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Move to `target`, or flip when `None`. Returns the resulting state.
    ///
    /// The worker is spawned and its handle stored while the state lock is
    /// held, so the stored handle always belongs to the newest loop.
    fn transition(self: &Arc<Self>, target: Option<bool>) -> bool {
        let (running, spawn_failed) = {
            let mut st = self.state.lock();
            let next = target.unwrap_or(!st.running);
            if next == st.running {
                return next;
            }
            if next && st.shutting_down {
                debug!("engine shutting down; start ignored");
                return false;
            }
            st.running = next;
            if next {
                st.generation += 1;
                st.started_at = Instant::now();
                st.sequence_cursor = 0;
                st.recorded_cursor = 0;
            }

            let mut spawn_failed = false;
            if next && !st.loop_alive {
                match self.spawn_loop() {
                    Ok(handle) => {
                        st.loop_alive = true;
                        *self.worker.lock() = Some(handle);
                    }
                    Err(e) => {
                        error!(error = %e, "failed to spawn click loop");
                        st.running = false;
                        spawn_failed = true;
                    }
                }
            }
            (next, spawn_failed)
        };

        info!(running, "engine toggled");
        self.emit(EngineEvent::StateChanged { running });
        if spawn_failed {
            self.emit(EngineEvent::StateChanged { running: false });
        }
        running
    }

    fn spawn_loop(self: &Arc<Self>) -> std::io::Result<JoinHandle<()>> {
        let shared = Arc::clone(self);
        thread::Builder::new()
            .name("click-engine".to_string())
            .spawn(move || shared.run_loop())
    }

    fn run_loop(&self) {
        info!("click loop started");
        while let Some(snapshot) = self.next_tick() {
            match self.tick(&snapshot) {
                Ok(delay) => thread::sleep(delay),
                Err(e) => {
                    warn!(error = %e, "tick failed; backing off");
                    thread::sleep(TICK_BACKOFF);
                }
            }
        }
        info!("click loop exited");
    }

    /// Snapshot state for the next tick, or mark the loop dead and return
    /// `None` once stopped.
    fn next_tick(&self) -> Option<Snapshot> {
        let mut st = self.state.lock();
        if !st.running {
            st.loop_alive = false;
            return None;
        }
        Some(Snapshot {
            params: Arc::clone(&st.params),
            generation: st.generation,
            elapsed: st.started_at.elapsed(),
            sequence_cursor: st.sequence_cursor,
            recorded_cursor: st.recorded_cursor,
        })
    }

    /// Perform one tick and return how long to sleep afterwards.
    fn tick(&self, snap: &Snapshot) -> Result<Duration> {
        let params = &snap.params;
        let delay = timing::select_interval(snap.elapsed, params);

        let mut recorded_cursor = snap.recorded_cursor;
        let target = position::resolve(
            &params.click_mode,
            &params.recorded_points,
            &mut recorded_cursor,
            &mut rand::thread_rng(),
        );
        if let Some(point) = target {
            self.sender.move_to(point)?;
        }

        // Only a successful move consumes a recorded point.
        if params.click_mode == ClickMode::Recorded {
            let mut st = self.state.lock();
            if st.generation == snap.generation {
                st.recorded_cursor = wrap(recorded_cursor, st.params.recorded_points.len());
            }
        }

        match params.action {
            Action::Left => self.sender.click(MouseButton::Left)?,
            Action::Right => self.sender.click(MouseButton::Right)?,
            Action::Key if !params.key_sequence.is_empty() => {
                let key = params.key_sequence[snap.sequence_cursor % params.key_sequence.len()];
                self.sender.tap_key(key)?;
                let mut st = self.state.lock();
                if st.generation == snap.generation {
                    st.sequence_cursor =
                        wrap(st.sequence_cursor + 1, st.params.key_sequence.len());
                }
            }
            Action::Key => {
                if let Some(key) = params.key_to_repeat {
                    self.sender.tap_key(key)?;
                }
            }
        }

        debug!(?target, action = ?params.action, delay_ms = delay.as_millis() as u64, "tick");
        Ok(delay)
    }

    fn on_key_event(self: &Arc<Self>, event: KeyEvent) {
        match event {
            KeyEvent::Pressed(key) if key == RECORD_TRIGGER => self.record_point(),
            KeyEvent::Pressed(key) => {
                let fire = {
                    let mut st = self.state.lock();
                    if st.muted {
                        return;
                    }
                    st.pressed.insert(key);
                    let now_active = st.hotkey.matches(&st.pressed);
                    let fire = now_active && !st.combo_active;
                    st.combo_active = now_active;
                    fire
                };
                debug!(%key, fire, "key pressed");
                if fire {
                    self.transition(None);
                }
            }
            KeyEvent::Released(key) => {
                let mut st = self.state.lock();
                if st.muted {
                    return;
                }
                st.pressed.remove(&key);
                st.combo_active = st.hotkey.matches(&st.pressed);
            }
        }
    }

    fn record_point(&self) {
        match self.sender.cursor_position() {
            Ok(point) => {
                info!(x = point.x, y = point.y, "point recorded");
                self.emit(EngineEvent::PointRecorded(point));
            }
            Err(e) => warn!(error = %e, "could not read pointer for record trigger"),
        }
    }
}

/// Hotkey-toggled click / keystroke automation engine.
///
/// Dropping the engine shuts it down.
pub struct ClickEngine {
    shared: Arc<Shared>,
    key_source: Mutex<Box<dyn KeySource>>,
}

impl ClickEngine {
    /// Create an engine and start listening on `key_source`.
    pub fn new(sender: Arc<dyn InputSender>, mut key_source: Box<dyn KeySource>) -> Result<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            state: Mutex::new(EngineState::new()),
            sender,
            events,
            worker: Mutex::new(None),
        });

        let weak: Weak<Shared> = Arc::downgrade(&shared);
        let sink: KeySink = Arc::new(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.on_key_event(event);
            }
        });
        key_source
            .start(sink)
            .map_err(|e| ClickerError::key_hook(format!("failed to start key source: {e}")))?;

        info!("click engine ready");
        Ok(Self {
            shared,
            key_source: Mutex::new(key_source),
        })
    }

    /// Replace all parameters at once. Values are clamped; cursors are
    /// re-taken modulo the new sequence lengths.
    pub fn set_params(&self, params: EngineParams) {
        let params = params.sanitized();
        let mut st = self.shared.state.lock();
        st.recorded_cursor = wrap(st.recorded_cursor, params.recorded_points.len());
        st.sequence_cursor = wrap(st.sequence_cursor, params.key_sequence.len());
        debug!(?params, "parameters replaced");
        st.params = Arc::new(params);
    }

    /// Current (clamped) parameters.
    pub fn params(&self) -> EngineParams {
        EngineParams::clone(&self.shared.state.lock().params)
    }

    pub fn update_hotkey(&self, spec: HotkeySpec) {
        info!(hotkey = %spec, "hotkey updated");
        let mut st = self.shared.state.lock();
        st.hotkey = spec;
        st.combo_active = false;
    }

    pub fn hotkey(&self) -> HotkeySpec {
        self.shared.state.lock().hotkey.clone()
    }

    /// Suspend (or resume) hotkey tracking. The record trigger stays live.
    pub fn set_hotkey_muted(&self, muted: bool) {
        let mut st = self.shared.state.lock();
        st.muted = muted;
        st.combo_active = false;
        st.pressed.clear();
        info!(muted, "hotkey mute changed");
    }

    pub fn is_muted(&self) -> bool {
        self.shared.state.lock().muted
    }

    /// Flip between running and stopped. Returns the new state.
    pub fn toggle(&self) -> bool {
        self.shared.transition(None)
    }

    /// Start if stopped. Does nothing when already running.
    pub fn start(&self) {
        self.shared.transition(Some(true));
    }

    /// Stop if running. Does nothing when already stopped.
    pub fn stop(&self) {
        self.shared.transition(Some(false));
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Receive state changes and recorded points.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.shared.events.subscribe()
    }

    /// Feed a key delta as if it came from the key source.
    pub fn handle_key_event(&self, event: KeyEvent) {
        self.shared.on_key_event(event);
    }

    /// Stop the loop, release the key source and wait for the worker to
    /// finish its current interval. Idempotent. Key events still in flight
    /// from the source cannot restart the loop afterwards.
    pub fn shutdown(&self) {
        {
            let mut st = self.shared.state.lock();
            st.shutting_down = true;
            st.running = false;
        }
        self.key_source.lock().stop();

        let handle = self.shared.worker.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("click loop panicked");
            }
            info!("click engine shut down");
        }
    }
}

impl Drop for ClickEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Burst;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Move(Point),
        Click(MouseButton),
        Key(Key),
    }

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<Sent>>,
        fail_moves: AtomicBool,
    }

    impl Recorder {
        fn take(&self) -> Vec<Sent> {
            std::mem::take(&mut *self.sent.lock())
        }
    }

    impl InputSender for Recorder {
        fn move_to(&self, point: Point) -> Result<()> {
            if self.fail_moves.load(Ordering::SeqCst) {
                return Err(ClickerError::input_failed("move pointer", "denied"));
            }
            self.sent.lock().push(Sent::Move(point));
            Ok(())
        }

        fn click(&self, button: MouseButton) -> Result<()> {
            self.sent.lock().push(Sent::Click(button));
            Ok(())
        }

        fn tap_key(&self, key: Key) -> Result<()> {
            self.sent.lock().push(Sent::Key(key));
            Ok(())
        }

        fn cursor_position(&self) -> Result<Point> {
            Ok(Point::new(42, 24))
        }
    }

    struct NoKeys;

    impl KeySource for NoKeys {
        fn start(&mut self, _sink: KeySink) -> Result<()> {
            Ok(())
        }

        fn stop(&mut self) {}
    }

    fn engine() -> (ClickEngine, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let engine = ClickEngine::new(recorder.clone(), Box::new(NoKeys)).unwrap();
        (engine, recorder)
    }

    /// Mark the engine running without spawning the worker so ticks can be
    /// driven by hand.
    fn arm(engine: &ClickEngine) {
        let mut st = engine.shared.state.lock();
        st.running = true;
        st.generation += 1;
        st.started_at = Instant::now();
        st.sequence_cursor = 0;
        st.recorded_cursor = 0;
    }

    fn step(engine: &ClickEngine) -> Duration {
        let snap = engine.shared.next_tick().unwrap();
        engine.shared.tick(&snap).unwrap()
    }

    fn press(engine: &ClickEngine, key: Key) {
        engine.handle_key_event(KeyEvent::Pressed(key));
    }

    fn release(engine: &ClickEngine, key: Key) {
        engine.handle_key_event(KeyEvent::Released(key));
    }

    fn toggles(rx: &mut broadcast::Receiver<EngineEvent>) -> Vec<bool> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let EngineEvent::StateChanged { running } = event {
                out.push(running);
            }
        }
        out
    }

    #[test]
    fn test_zero_delay_clamped_to_one_millisecond() {
        let (engine, _) = engine();
        engine.set_params(EngineParams {
            delay_ms: 0,
            ..EngineParams::default()
        });
        assert_eq!(engine.params().delay_ms, 1);

        arm(&engine);
        assert_eq!(step(&engine), Duration::from_millis(1));
    }

    #[test]
    fn test_key_to_repeat_fires_every_tick() {
        let (engine, recorder) = engine();
        engine.set_params(EngineParams {
            action: Action::Key,
            key_to_repeat: Some(Key::Char('A')),
            ..EngineParams::default()
        });
        arm(&engine);
        for _ in 0..3 {
            step(&engine);
        }
        assert_eq!(recorder.take(), vec![Sent::Key(Key::Char('A')); 3]);
    }

    #[test]
    fn test_key_sequence_overrides_key_to_repeat() {
        let (engine, recorder) = engine();
        engine.set_params(EngineParams {
            action: Action::Key,
            key_to_repeat: Some(Key::Char('A')),
            key_sequence: vec![Key::Char('A'), Key::Char('B')],
            ..EngineParams::default()
        });
        arm(&engine);
        for _ in 0..5 {
            step(&engine);
        }
        let keys: Vec<_> = recorder.take();
        assert_eq!(
            keys,
            vec![
                Sent::Key(Key::Char('A')),
                Sent::Key(Key::Char('B')),
                Sent::Key(Key::Char('A')),
                Sent::Key(Key::Char('B')),
                Sent::Key(Key::Char('A')),
            ]
        );
    }

    #[test]
    fn test_key_action_without_keys_fires_nothing() {
        let (engine, recorder) = engine();
        engine.set_params(EngineParams {
            action: Action::Key,
            ..EngineParams::default()
        });
        arm(&engine);
        step(&engine);
        assert!(recorder.take().is_empty());
    }

    #[test]
    fn test_recorded_points_cycle_then_click() {
        let (engine, recorder) = engine();
        engine.set_params(EngineParams {
            action: Action::Right,
            click_mode: ClickMode::Recorded,
            recorded_points: vec![Point::new(1, 1), Point::new(2, 2), Point::new(3, 3)],
            ..EngineParams::default()
        });
        arm(&engine);
        for _ in 0..4 {
            step(&engine);
        }
        let moves: Vec<_> = recorder
            .take()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Move(p) => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(
            moves,
            vec![
                Point::new(1, 1),
                Point::new(2, 2),
                Point::new(3, 3),
                Point::new(1, 1),
            ]
        );
    }

    #[test]
    fn test_failed_move_keeps_recorded_point() {
        let (engine, recorder) = engine();
        engine.set_params(EngineParams {
            click_mode: ClickMode::Recorded,
            recorded_points: vec![Point::new(1, 1), Point::new(2, 2)],
            ..EngineParams::default()
        });
        arm(&engine);

        recorder.fail_moves.store(true, Ordering::SeqCst);
        let snap = engine.shared.next_tick().unwrap();
        assert!(engine.shared.tick(&snap).is_err());
        assert_eq!(engine.shared.state.lock().recorded_cursor, 0);

        recorder.fail_moves.store(false, Ordering::SeqCst);
        step(&engine);
        assert_eq!(
            recorder.take(),
            vec![Sent::Move(Point::new(1, 1)), Sent::Click(MouseButton::Left)]
        );
        assert_eq!(engine.shared.state.lock().recorded_cursor, 1);
    }

    #[test]
    fn test_start_refused_after_shutdown() {
        let (engine, _) = engine();
        let mut rx = engine.subscribe();
        engine.start();
        engine.shutdown();
        assert_eq!(toggles(&mut rx), vec![true]);

        press(&engine, Key::ControlLeft);
        press(&engine, Key::AltLeft);
        assert!(!engine.toggle());
        engine.start();
        assert!(!engine.is_running());
        assert!(toggles(&mut rx).is_empty());
        assert!(engine.shared.worker.lock().is_none());
    }

    #[test]
    fn test_worker_handle_tracks_latest_loop() {
        let (engine, _) = engine();
        for _ in 0..20 {
            engine.start();
            engine.stop();
        }
        engine.start();
        assert!(engine.shared.worker.lock().is_some());
        assert!(engine.shared.state.lock().loop_alive);
        engine.shutdown();
        assert!(engine.shared.worker.lock().is_none());
    }

    #[test]
    fn test_fixed_mode_moves_before_click() {
        let (engine, recorder) = engine();
        engine.set_params(EngineParams {
            click_mode: ClickMode::Fixed(Point::new(10, 20)),
            ..EngineParams::default()
        });
        arm(&engine);
        step(&engine);
        assert_eq!(
            recorder.take(),
            vec![
                Sent::Move(Point::new(10, 20)),
                Sent::Click(MouseButton::Left)
            ]
        );
    }

    #[test]
    fn test_shrinking_sequence_keeps_cursor_in_bounds() {
        let (engine, recorder) = engine();
        engine.set_params(EngineParams {
            action: Action::Key,
            key_sequence: vec![Key::Char('A'), Key::Char('B'), Key::Char('C')],
            ..EngineParams::default()
        });
        arm(&engine);
        step(&engine);
        step(&engine);
        assert_eq!(engine.shared.state.lock().sequence_cursor, 2);

        engine.set_params(EngineParams {
            action: Action::Key,
            key_sequence: vec![Key::Char('X'), Key::Char('Y')],
            ..EngineParams::default()
        });
        assert_eq!(engine.shared.state.lock().sequence_cursor, 0);
        recorder.take();
        step(&engine);
        assert_eq!(recorder.take(), vec![Sent::Key(Key::Char('X'))]);

        engine.set_params(EngineParams {
            action: Action::Key,
            ..EngineParams::default()
        });
        assert_eq!(engine.shared.state.lock().sequence_cursor, 0);
    }

    #[test]
    fn test_burst_interval_applies_at_start() {
        let (engine, _) = engine();
        engine.set_params(EngineParams {
            delay_ms: 100,
            burst1: Burst {
                enabled: true,
                duration_sec: 10,
                interval_ms: 50,
            },
            ..EngineParams::default()
        });
        arm(&engine);
        assert_eq!(step(&engine), Duration::from_millis(50));
    }

    #[test]
    fn test_stopped_engine_yields_no_tick() {
        let (engine, _) = engine();
        assert!(engine.shared.next_tick().is_none());
        assert!(!engine.shared.state.lock().loop_alive);
    }

    #[test]
    fn test_toggle_resets_cursors_and_emits() {
        let (engine, _) = engine();
        let mut rx = engine.subscribe();
        engine.shared.state.lock().sequence_cursor = 3;

        assert!(engine.toggle());
        assert!(engine.is_running());
        assert_eq!(engine.shared.state.lock().sequence_cursor, 0);
        assert!(!engine.toggle());
        assert!(!engine.is_running());
        assert_eq!(toggles(&mut rx), vec![true, false]);
        engine.shutdown();
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let (engine, _) = engine();
        let mut rx = engine.subscribe();
        engine.start();
        engine.start();
        engine.stop();
        engine.stop();
        assert_eq!(toggles(&mut rx), vec![true, false]);
        engine.shutdown();
    }

    #[test]
    fn test_hotkey_rising_edge_fires_once() {
        let (engine, _) = engine();
        let mut rx = engine.subscribe();

        press(&engine, Key::ControlLeft); // not matching
        press(&engine, Key::AltLeft); // matching
        press(&engine, Key::Char('X')); // still matching
        release(&engine, Key::AltLeft); // not matching

        assert_eq!(toggles(&mut rx), vec![true]);
        engine.shutdown();
    }

    #[test]
    fn test_hotkey_retrigger_after_release() {
        let (engine, _) = engine();
        let mut rx = engine.subscribe();

        press(&engine, Key::ControlLeft);
        press(&engine, Key::AltLeft);
        release(&engine, Key::AltLeft);
        press(&engine, Key::AltRight);

        assert_eq!(toggles(&mut rx), vec![true, false]);
        engine.shutdown();
    }

    #[test]
    fn test_unmute_with_combo_held_does_not_toggle() {
        let (engine, _) = engine();
        let mut rx = engine.subscribe();

        press(&engine, Key::ControlLeft);
        press(&engine, Key::AltLeft);
        assert_eq!(toggles(&mut rx), vec![true]);

        engine.set_hotkey_muted(true);
        assert!(engine.shared.state.lock().pressed.is_empty());
        press(&engine, Key::AltLeft);
        assert!(engine.shared.state.lock().pressed.is_empty());
        engine.set_hotkey_muted(false);

        release(&engine, Key::AltLeft);
        assert!(toggles(&mut rx).is_empty());
        assert!(engine.is_running());
        engine.shutdown();
    }

    #[test]
    fn test_update_hotkey_resets_edge_state() {
        let (engine, _) = engine();
        let mut rx = engine.subscribe();
        engine.update_hotkey(HotkeySpec::parse("Ctrl+F8").unwrap());

        press(&engine, Key::ControlLeft);
        press(&engine, Key::AltLeft);
        assert!(toggles(&mut rx).is_empty());

        press(&engine, Key::Function(8));
        assert_eq!(toggles(&mut rx), vec![true]);
        engine.shutdown();
    }

    #[test]
    fn test_record_trigger_bypasses_mute() {
        let (engine, _) = engine();
        let mut rx = engine.subscribe();
        engine.set_hotkey_muted(true);

        press(&engine, RECORD_TRIGGER);
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::PointRecorded(Point::new(42, 24))
        );
        assert!(!engine.shared.state.lock().pressed.contains(&RECORD_TRIGGER));
    }
}
