//! Real-time tick driver.
//!
//! [`TickClock`] decides when the next tick is due; [`SimulationHandle`]
//! owns the engine behind a mutex, runs ticks on that cadence and publishes
//! a snapshot after each one.

use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use tokio::sync::broadcast;

use crate::{
    engine::{Engine, TickSummary},
    error::panic_message,
    snapshot::{GardenSnapshot, SnapshotCell},
};

pub const BASE_TICK_INTERVAL: Duration = Duration::from_millis(500);
pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 10.0;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct TickClock {
    speed: f64,
    paused: bool,
    last_tick: Option<Instant>,
}

impl TickClock {
    pub fn new(speed: f64) -> Self {
        let mut clock = Self {
            speed: 1.0,
            paused: false,
            last_tick: None,
        };
        clock.set_speed(speed);
        clock
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Clamps into `[MIN_SPEED, MAX_SPEED]`; non-finite input is ignored.
    /// Returns the speed now in effect.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        if speed.is_finite() {
            self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        }
        self.speed
    }

    pub fn interval(&self) -> Duration {
        BASE_TICK_INTERVAL.div_f64(self.speed)
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn due(&self, now: Instant) -> bool {
        if self.paused {
            return false;
        }
        match self.last_tick {
            Some(last) => now.saturating_duration_since(last) >= self.interval(),
            None => true,
        }
    }

    pub fn mark_ticked(&mut self, now: Instant) {
        self.last_tick = Some(now);
    }

    /// Fraction of the current interval that has elapsed, in `[0, 1]`.
    pub fn progress(&self, now: Instant) -> f64 {
        match self.last_tick {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last).as_secs_f64();
                (elapsed / self.interval().as_secs_f64()).min(1.0)
            }
            None => 0.0,
        }
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared control surface over a running simulation. Cheap to clone.
#[derive(Clone)]
pub struct SimulationHandle {
    engine: Arc<Mutex<Engine>>,
    clock: Arc<Mutex<TickClock>>,
    snapshots: Arc<SnapshotCell>,
    updates: broadcast::Sender<Arc<GardenSnapshot>>,
}

impl SimulationHandle {
    pub fn new(engine: Engine, speed: f64) -> Self {
        let (updates, _) = broadcast::channel(64);
        let snapshots = Arc::new(SnapshotCell::new());
        snapshots.publish(engine.snapshot());
        Self {
            engine: Arc::new(Mutex::new(engine)),
            clock: Arc::new(Mutex::new(TickClock::new(speed))),
            snapshots,
            updates,
        }
    }

    /// Runs one tick regardless of the clock, then publishes.
    pub fn step(&self) -> Option<TickSummary> {
        let mut engine = lock(&self.engine);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| engine.tick()));
        let summary = match outcome {
            Ok(summary) => Some(summary),
            Err(payload) => {
                tracing::error!(reason = %panic_message(payload), "tick aborted");
                None
            }
        };
        self.publish_locked(&engine);
        summary
    }

    /// Runs `f` against the engine and publishes the resulting state.
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut Engine) -> T) -> T {
        let mut engine = lock(&self.engine);
        let value = f(&mut engine);
        self.publish_locked(&engine);
        value
    }

    fn publish_locked(&self, engine: &Engine) {
        let snapshot = self.snapshots.publish(engine.snapshot());
        // No subscribers is fine.
        let _ = self.updates.send(snapshot);
    }

    pub fn latest(&self) -> Option<Arc<GardenSnapshot>> {
        self.snapshots.latest()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<GardenSnapshot>> {
        self.updates.subscribe()
    }

    pub fn pause(&self) {
        lock(&self.clock).pause();
    }

    pub fn resume(&self) {
        lock(&self.clock).resume();
    }

    pub fn toggle_pause(&self) -> bool {
        lock(&self.clock).toggle_pause()
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.clock).is_paused()
    }

    pub fn set_speed(&self, speed: f64) -> f64 {
        lock(&self.clock).set_speed(speed)
    }

    pub fn speed(&self) -> f64 {
        lock(&self.clock).speed()
    }

    pub fn tick_progress(&self) -> f64 {
        lock(&self.clock).progress(Instant::now())
    }

    /// Drives ticks on the clock's cadence until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = poll.tick() => {
                    let now = Instant::now();
                    let due = {
                        let mut clock = lock(&self.clock);
                        let due = clock.due(now);
                        if due {
                            clock.mark_ticked(now);
                        }
                        due
                    };
                    if due {
                        self.step();
                    }
                }
            }
        }
        tracing::info!("simulation driver stopped");
    }
}
