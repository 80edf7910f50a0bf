#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use std::sync::Arc;
use stealthscreen::{
    ActivationController, ConfigStore, ManualClock, MemoryStore, Platform, ScreenSize,
    StealthConfig,
};

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCall {
    Hide { brightness: f32, hide_status_bar: bool },
    Restore,
    Vibrate(Vec<u64>),
}

/// Platform fake that records every call
#[derive(Debug, Clone, Default)]
pub struct RecordingPlatform {
    calls: Arc<Mutex<Vec<DisplayCall>>>,
}

impl RecordingPlatform {
    pub fn calls(&self) -> Vec<DisplayCall> {
        self.calls.lock().clone()
    }

    pub fn restores(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| **c == DisplayCall::Restore)
            .count()
    }

    pub fn hides(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, DisplayCall::Hide { .. }))
            .count()
    }
}

impl Platform for RecordingPlatform {
    fn hide_display(&mut self, brightness: f32, hide_status_bar: bool) {
        self.calls.lock().push(DisplayCall::Hide {
            brightness,
            hide_status_bar,
        });
    }

    fn restore_display(&mut self) {
        self.calls.lock().push(DisplayCall::Restore);
    }

    fn vibrate(&mut self, pattern_ms: &[u64]) {
        self.calls.lock().push(DisplayCall::Vibrate(pattern_ms.to_vec()));
    }

    fn screen_size(&self) -> ScreenSize {
        ScreenSize::new(1000.0, 2000.0)
    }
}

pub type TestController = ActivationController<ManualClock, MemoryStore, RecordingPlatform>;

pub struct Harness {
    pub controller: TestController,
    pub clock: ManualClock,
    pub store: MemoryStore,
    pub platform: RecordingPlatform,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(MemoryStore::new())
    }

    pub fn with_config(config: StealthConfig) -> Self {
        let mut store = MemoryStore::new();
        store.save(&config).expect("Failed to seed store");
        Self::with_store(store)
    }

    pub fn with_store(store: MemoryStore) -> Self {
        let clock = ManualClock::new(start());
        let platform = RecordingPlatform::default();
        let controller =
            ActivationController::new(clock.clone(), store.clone(), platform.clone());
        Self {
            controller,
            clock,
            store,
            platform,
        }
    }

    /// Simulate a process restart on the same store and clock
    pub fn restart(&mut self) {
        self.platform = RecordingPlatform::default();
        self.controller = ActivationController::new(
            self.clock.clone(),
            self.store.clone(),
            self.platform.clone(),
        );
    }

    pub fn advance_ms(&mut self, ms: i64) {
        self.clock.advance_millis(ms);
        self.controller.run_due_timers();
    }

    pub fn advance_secs(&mut self, secs: i64) {
        self.advance_ms(secs * 1000);
    }

    /// Record as persisted in the store
    pub fn stored(&self) -> StealthConfig {
        self.store
            .load()
            .expect("Failed to load")
            .expect("Nothing stored")
    }
}

/// Wednesday 2026-10-14 12:00:00
pub fn start() -> NaiveDateTime {
    at(2026, 10, 14, 12, 0)
}

pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}
