//! Time source and one-shot timers
//!
//! The controller never sleeps or spawns threads. It reads the time from a
//! [`ClockSource`] and arms deadlines on a [`TimerQueue`]; whoever owns the
//! event loop calls back into the controller once deadlines pass.

use crate::model::Timestamp;
use crate::schedule::ScheduleTimerPhase;
use chrono::Local;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Source of the current local wall-clock time
pub trait ClockSource {
    fn now(&self) -> Timestamp;
}

/// Real clock backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle while the
/// controller owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, now: Timestamp) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock();
        *now += delta;
    }

    pub fn advance_millis(&self, millis: i64) {
        self.advance(chrono::Duration::milliseconds(millis));
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(chrono::Duration::seconds(secs));
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}

/// What a timer means when it fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerToken {
    LongPress,
    GestureTimeout,
    PatternTimeout,
    AutoDeactivate,
    LockoutRelease,
    Schedule {
        id: String,
        phase: ScheduleTimerPhase,
    },
}

/// Cancelable reference to an armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// One-shot timers ordered by deadline
///
/// Timers with the same deadline fire in the order they were armed.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    by_deadline: BTreeMap<(Timestamp, TimerHandle), TimerToken>,
    deadlines: HashMap<TimerHandle, Timestamp>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot timer firing at `at`
    pub fn arm_at(&mut self, at: Timestamp, token: TimerToken) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        log::trace!("Arming {:?} for {} as {:?}", token, at, handle);
        self.by_deadline.insert((at, handle), token);
        self.deadlines.insert(handle, at);
        handle
    }

    /// Cancel a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle) {
            Some(at) => {
                self.by_deadline.remove(&(at, handle));
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.deadlines.contains_key(&handle)
    }

    pub fn deadline(&self, handle: TimerHandle) -> Option<Timestamp> {
        self.deadlines.get(&handle).copied()
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.by_deadline.keys().next().map(|(at, _)| *at)
    }

    /// Remove and return the earliest timer whose deadline is at or before `now`
    pub fn pop_due(&mut self, now: Timestamp) -> Option<(TimerHandle, TimerToken)> {
        let (&(at, handle), _) = self.by_deadline.iter().next()?;
        if at > now {
            return None;
        }
        let token = self.by_deadline.remove(&(at, handle))?;
        self.deadlines.remove(&handle);
        Some((handle, token))
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_deadline.clear();
        self.deadlines.clear();
    }
}
