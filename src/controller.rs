//! The covert-display activation controller
//!
//! [`ActivationController`] owns the configuration record, every timer, the
//! gesture recognizer, the schedule engine and the lockout guard. It is the
//! only place that flips `is_active` or touches the display. All methods run
//! on the caller's thread; timers fire when the owner calls
//! [`ActivationController::run_due_timers`].

use crate::clock::{ClockSource, TimerHandle, TimerQueue, TimerToken};
use crate::config_file::{load_or_default, ConfigStore};
use crate::constants::{
    ACTIVATION_VIBRATION_PATTERN_MS, PATTERN_TIMEOUT_MS, TAP_WINDOW_MS, TRIPLE_TAP_COUNT,
};
use crate::error::{ActivationError, ConfigError, Transition};
use crate::gesture::{is_swipe_up, GestureOutcome, GestureRecognizer};
use crate::lockout::{attempts_since, LockoutGuard, LockoutPolicy};
use crate::model::{
    add_duration, add_millis, clamp_brightness, clamp_long_press, AccessAttempt,
    ActivationMethod, AttemptKind, GestureSequence, PatternPoint, Repeat, ScheduledActivation,
    StealthConfig, Timestamp,
};
use crate::platform::Platform;
use crate::schedule::{validate_schedule, ScheduleEngine, ScheduleTimerPhase};
use chrono::NaiveDateTime;
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::time::Duration;

/// Observable state of the controller
///
/// `LockedOut` overlays the underlying state, which is kept for when the
/// lockout clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Inactive,
    Active,
    LockedOut { underlying_active: bool },
}

pub struct ActivationController<C: ClockSource, S: ConfigStore, P: Platform> {
    clock: C,
    store: S,
    platform: P,
    config: StealthConfig,
    timers: TimerQueue,
    guard: LockoutGuard,
    recognizer: GestureRecognizer,
    schedules: ScheduleEngine,
    long_press: Option<TimerHandle>,
    gesture_timeout: Option<TimerHandle>,
    pattern_timeout: Option<TimerHandle>,
    auto_deactivate: Option<TimerHandle>,
    lockout_release: Option<TimerHandle>,
    owns_display: bool,
}

impl<C: ClockSource, S: ConfigStore, P: Platform> ActivationController<C, S, P> {
    /// Load the stored configuration and arm schedule and lockout timers
    ///
    /// A session left active by a previous process is cleared: that process
    /// lost the foreground, and a covert session must not survive that.
    pub fn new(clock: C, store: S, platform: P) -> Self {
        Self::open(clock, store, platform, true)
    }

    /// Open the stored configuration for editing only
    ///
    /// The stored active flag is kept as loaded and the display is never
    /// touched. Edits are written with the flag read at open time, so a host
    /// process running against the same store overwrites them on its next
    /// save; stop the host before editing.
    pub fn attach(clock: C, store: S, platform: P) -> Self {
        Self::open(clock, store, platform, false)
    }

    fn open(clock: C, store: S, platform: P, owns_display: bool) -> Self {
        let mut config = load_or_default(&store);
        let now = clock.now();
        let mut dirty = false;

        if owns_display && config.is_active {
            warn!("Previous session was still marked active - clearing it");
            config.is_active = false;
            dirty = true;
        }

        let guard = LockoutGuard::restore(config.locked_out_until, now);
        if config.locked_out_until.is_some() && !guard.is_inhibited(now) {
            config.locked_out_until = None;
            dirty = true;
        }

        let mut controller = Self {
            clock,
            store,
            platform,
            config,
            timers: TimerQueue::new(),
            guard,
            recognizer: GestureRecognizer::new(),
            schedules: ScheduleEngine::new(),
            long_press: None,
            gesture_timeout: None,
            pattern_timeout: None,
            auto_deactivate: None,
            lockout_release: None,
            owns_display,
        };

        if let Some(until) = controller.guard.inhibited_until(now) {
            controller.lockout_release = Some(controller.timers.arm_at(until, TimerToken::LockoutRelease));
        }

        let schedules = controller.config.schedules.clone();
        for schedule in &schedules {
            controller.schedules.arm(&mut controller.timers, schedule, now);
        }

        if dirty {
            controller.persist();
        }

        info!(
            "Stealth controller ready ({:?}, {} schedule(s) armed)",
            controller.config.activation_method,
            controller.schedules.armed_count()
        );
        controller
    }

    // ------------------------------------------------------------------
    // Activation state machine
    // ------------------------------------------------------------------

    /// Enter the covert state
    ///
    /// `schedule_id` names the schedule that triggered the activation, if any.
    pub fn activate(&mut self, schedule_id: Option<&str>) -> Result<Transition, ActivationError> {
        let now = self.clock.now();
        self.guard.check(now)?;

        if !self.config.enabled {
            return Err(ActivationError::Disabled);
        }
        if self.config.is_active {
            debug!("Activate requested while already active");
            return Ok(Transition::Unchanged);
        }

        self.config.is_active = true;
        self.config.last_activation_time = Some(now);
        self.recognizer.clear();
        self.persist();

        self.platform
            .hide_display(self.config.brightness_level, !self.config.show_status_bar);
        if self.config.vibrate_on_activation {
            self.platform.vibrate(&ACTIVATION_VIBRATION_PATTERN_MS);
        }

        if let Some(after) = self.config.auto_deactivate_after {
            let at = add_duration(now, after);
            self.auto_deactivate = Some(self.timers.arm_at(at, TimerToken::AutoDeactivate));
            debug!("Auto-deactivate armed for {}", at);
        }

        match schedule_id {
            Some(id) => info!("Blank screen ACTIVATED by schedule {}", id),
            None => info!("Blank screen ACTIVATED"),
        }
        Ok(Transition::Changed)
    }

    /// Leave the covert state
    pub fn deactivate(&mut self) -> Result<Transition, ActivationError> {
        let now = self.clock.now();
        self.guard.check(now)?;
        Ok(self.deactivate_unchecked())
    }

    /// Deactivate through the emergency path, ignoring the configured method
    ///
    /// Still refused by an active lockout. A no-op when emergency deactivation
    /// is switched off.
    pub fn emergency_deactivate(&mut self) -> Result<Transition, ActivationError> {
        if !self.config.emergency_deactivation_enabled {
            info!("Emergency deactivation is disabled - ignoring");
            return Ok(Transition::Unchanged);
        }
        warn!("EMERGENCY deactivation requested");
        self.deactivate()
    }

    /// Host back button / hardware interrupt
    pub fn on_back_pressed(&mut self) -> Result<Transition, ActivationError> {
        self.emergency_deactivate()
    }

    /// The app lost the foreground
    ///
    /// Forces deactivation even during a lockout: the display is restored
    /// whenever the app stops being visible.
    pub fn on_app_backgrounded(&mut self) -> Transition {
        if self.config.is_active {
            warn!("App moved to background while active - forcing deactivation");
        }
        self.deactivate_unchecked()
    }

    fn deactivate_unchecked(&mut self) -> Transition {
        if !self.config.is_active {
            debug!("Deactivate requested while already inactive");
            return Transition::Unchanged;
        }

        // Timers go first so nothing stale can fire into the next session
        self.cancel_session_timers();
        self.recognizer.clear();

        self.config.is_active = false;
        self.persist();

        self.platform.restore_display();
        info!("Blank screen DEACTIVATED");
        Transition::Changed
    }

    fn cancel_session_timers(&mut self) {
        for handle in [
            self.long_press.take(),
            self.gesture_timeout.take(),
            self.pattern_timeout.take(),
            self.auto_deactivate.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.timers.cancel(handle);
        }
        self.schedules.cancel_end_timers(&mut self.timers);
    }

    fn try_deactivate(&mut self, trigger: &str) -> Result<Transition, ActivationError> {
        let result = self.deactivate();
        match &result {
            Ok(Transition::Changed) => info!("Deactivated by {}", trigger),
            Ok(Transition::Unchanged) => {}
            Err(e) => warn!("Deactivation by {} refused: {}", trigger, e),
        }
        result
    }

    // ------------------------------------------------------------------
    // Deactivation triggers
    // ------------------------------------------------------------------

    /// Finger down. Returns true if a long-press timer was armed.
    pub fn on_long_press_start(&mut self) -> bool {
        if !self.config.is_active || !self.config.activation_method.allows_long_press() {
            return false;
        }

        if let Some(old) = self.long_press.take() {
            self.timers.cancel(old);
        }
        let at = add_duration(self.clock.now(), self.config.long_press_duration);
        self.long_press = Some(self.timers.arm_at(at, TimerToken::LongPress));
        debug!("Long press started, fires at {}", at);
        true
    }

    /// Finger up before the hold completed
    pub fn on_long_press_end(&mut self) {
        if let Some(handle) = self.long_press.take() {
            self.timers.cancel(handle);
            debug!("Long press released early");
        }
    }

    /// One tap on the blank screen
    pub fn register_gesture_tap(&mut self) -> GestureOutcome {
        if !self.config.is_active {
            return GestureOutcome::Ignored;
        }

        let now = self.clock.now();
        let counts = self.gesture_enabled(GestureSequence::TripleTap);
        let outcome =
            self.recognizer
                .register_tap(now, counts, self.config.repeated_touch_threshold);

        if counts {
            self.rearm_gesture_timeout(now);
        }

        match &outcome {
            GestureOutcome::Matched => {
                let _ = self.try_deactivate("triple tap");
            }
            GestureOutcome::Tamper { details, matched } => {
                let details = details.clone();
                if *matched {
                    let _ = self.try_deactivate("triple tap");
                }
                self.record_attempt(AttemptKind::RepeatedTouches, details);
            }
            _ => {}
        }
        outcome
    }

    /// A pan gesture ended with displacement (`dx`, `dy`) in pixels
    pub fn on_swipe(&mut self, dx: f64, dy: f64) -> GestureOutcome {
        if is_swipe_up(dx, dy) {
            self.on_swipe_up()
        } else {
            GestureOutcome::Ignored
        }
    }

    pub fn on_swipe_up(&mut self) -> GestureOutcome {
        self.single_gesture(GestureSequence::SwipeUp, "swipe up")
    }

    pub fn on_shake(&mut self) -> GestureOutcome {
        self.single_gesture(GestureSequence::Shake, "shake")
    }

    fn single_gesture(&mut self, sequence: GestureSequence, name: &str) -> GestureOutcome {
        if !self.config.is_active || !self.gesture_enabled(sequence) {
            return GestureOutcome::Ignored;
        }
        let _ = self.try_deactivate(name);
        GestureOutcome::Matched
    }

    /// One sample of a custom unlock pattern, in screen pixels
    pub fn register_pattern_point(&mut self, x: f64, y: f64) -> GestureOutcome {
        if !self.config.is_active || !self.gesture_enabled(GestureSequence::CustomPattern) {
            return GestureOutcome::Ignored;
        }

        let now = self.clock.now();
        let screen = self.platform.screen_size();
        let outcome = match self.config.custom_pattern.as_deref() {
            Some(expected) if !expected.is_empty() => {
                self.recognizer
                    .register_pattern_point(PatternPoint::new(x, y), expected, screen)
            }
            _ => {
                debug!("Pattern point ignored - no custom pattern configured");
                return GestureOutcome::Ignored;
            }
        };

        match &outcome {
            GestureOutcome::Pending => {
                if let Some(old) = self.pattern_timeout.take() {
                    self.timers.cancel(old);
                }
                self.pattern_timeout = Some(
                    self.timers
                        .arm_at(add_millis(now, PATTERN_TIMEOUT_MS), TimerToken::PatternTimeout),
                );
            }
            GestureOutcome::Matched => {
                self.cancel_pattern_timeout();
                let _ = self.try_deactivate("custom pattern");
            }
            GestureOutcome::Rejected { kind, details } => {
                self.cancel_pattern_timeout();
                self.record_attempt(*kind, details.clone());
            }
            GestureOutcome::Tamper { .. } | GestureOutcome::Ignored => {}
        }
        outcome
    }

    fn gesture_enabled(&self, sequence: GestureSequence) -> bool {
        self.config.activation_method.allows_gestures() && self.config.gesture_sequence == sequence
    }

    fn rearm_gesture_timeout(&mut self, now: Timestamp) {
        if let Some(old) = self.gesture_timeout.take() {
            self.timers.cancel(old);
        }
        // Fire once the newest tap has left the window, not while it is on the edge
        self.gesture_timeout = Some(
            self.timers
                .arm_at(add_millis(now, TAP_WINDOW_MS + 1), TimerToken::GestureTimeout),
        );
    }

    fn cancel_pattern_timeout(&mut self) {
        if let Some(handle) = self.pattern_timeout.take() {
            self.timers.cancel(handle);
        }
    }

    // ------------------------------------------------------------------
    // Lockout
    // ------------------------------------------------------------------

    /// Log an access attempt and evaluate the lockout window
    ///
    /// Returns the lockout deadline if this attempt started a lockout.
    pub fn record_attempt(
        &mut self,
        kind: AttemptKind,
        details: impl Into<String>,
    ) -> Option<Timestamp> {
        let now = self.clock.now();
        let policy = LockoutPolicy::from_config(&self.config);
        let locked_until =
            self.guard
                .log_attempt(&mut self.config.access_attempts, kind, details, now, policy);

        if let Some(until) = locked_until {
            self.config.locked_out_until = Some(until);
            // Nothing may complete a deactivation while inhibited
            self.on_long_press_end();
            self.recognizer.clear();
            if let Some(old) = self.lockout_release.take() {
                self.timers.cancel(old);
            }
            self.lockout_release = Some(self.timers.arm_at(until, TimerToken::LockoutRelease));
        }

        self.persist();
        locked_until
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    /// Fire every timer whose deadline has passed. Returns how many fired.
    pub fn run_due_timers(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        while let Some((handle, token)) = self.timers.pop_due(now) {
            fired += 1;
            self.dispatch(handle, token, now);
        }
        fired
    }

    /// Earliest pending timer deadline
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }

    fn dispatch(&mut self, handle: TimerHandle, token: TimerToken, now: Timestamp) {
        debug!("Timer {:?} fired: {:?}", handle, token);
        match token {
            TimerToken::LongPress => {
                self.long_press = None;
                let _ = self.try_deactivate("long press");
            }
            TimerToken::GestureTimeout => {
                self.gesture_timeout = None;
                self.recognizer.clear_taps();
            }
            TimerToken::PatternTimeout => {
                self.pattern_timeout = None;
                if self.recognizer.pending_pattern_points() > 0 {
                    debug!("Pattern input timed out - buffer cleared");
                }
                self.recognizer.clear_pattern();
            }
            TimerToken::AutoDeactivate => {
                self.auto_deactivate = None;
                let _ = self.try_deactivate("auto-deactivate timer");
            }
            TimerToken::LockoutRelease => {
                self.lockout_release = None;
                if self.guard.release_if_elapsed(now) {
                    self.config.locked_out_until = None;
                    self.persist();
                }
            }
            TimerToken::Schedule { id, phase } => {
                self.schedules.fired(&id, phase);
                match phase {
                    ScheduleTimerPhase::Start => self.fire_schedule(&id, now),
                    ScheduleTimerPhase::End => {
                        let _ = self.try_deactivate(&format!("end of schedule {}", id));
                    }
                }
            }
        }
    }

    fn fire_schedule(&mut self, id: &str, now: Timestamp) {
        let Some(schedule) = self.config.schedule(id).cloned() else {
            warn!("Timer fired for unknown schedule {}", id);
            return;
        };

        // Start the session, and its end timer if this fire started it
        match self.activate(Some(id)) {
            Ok(Transition::Changed) => {
                if let Some(length) = schedule.session_length() {
                    let end = now
                        .checked_add_signed(length)
                        .unwrap_or(NaiveDateTime::MAX);
                    self.schedules.arm_end(&mut self.timers, id, end);
                }
            }
            Ok(Transition::Unchanged) => debug!("Schedule {} fired while already active", id),
            Err(e) => warn!("Scheduled activation {} refused: {}", id, e),
        }

        // Re-arm only after the activation above has completed
        if schedule.repeat == Repeat::Once {
            // A one-time schedule is spent, so store it as inactive
            if let Some(spent) = self.config.schedules.iter_mut().find(|s| s.id == id) {
                spent.active = false;
            }
            self.persist();
            info!("One-time schedule {} fired and is now inactive", id);
        } else if let Some(next) = self.schedules.arm(&mut self.timers, &schedule, now) {
            debug!("Schedule {} next fires at {}", id, next);
        }
    }

    /// Tear down every timer
    pub fn shutdown(&mut self) {
        self.timers.clear();
        self.schedules.clear();
        self.long_press = None;
        self.gesture_timeout = None;
        self.pattern_timeout = None;
        self.auto_deactivate = None;
        self.lockout_release = None;
        info!("Stealth controller timers torn down");
    }

    // ------------------------------------------------------------------
    // Schedules
    // ------------------------------------------------------------------

    /// Add a schedule and arm it. Returns its id.
    pub fn add_schedule(&mut self, schedule: ScheduledActivation) -> Result<String, ConfigError> {
        validate_schedule(&schedule)?;
        if self.config.schedule(&schedule.id).is_some() {
            return Err(ConfigError::DuplicateSchedule(schedule.id));
        }

        let id = schedule.id.clone();
        let now = self.clock.now();
        self.schedules.arm(&mut self.timers, &schedule, now);
        self.config.schedules.push(schedule);
        self.persist();
        info!("Schedule {} added", id);
        Ok(id)
    }

    /// Replace an existing schedule (matched by id) and re-arm its start
    ///
    /// A session the schedule already started keeps its end timer.
    pub fn update_schedule(&mut self, schedule: ScheduledActivation) -> Result<(), ConfigError> {
        validate_schedule(&schedule)?;
        let index = self.schedule_index(&schedule.id)?;

        let now = self.clock.now();
        self.schedules.arm(&mut self.timers, &schedule, now);
        info!("Schedule {} updated", schedule.id);
        self.config.schedules[index] = schedule;
        self.persist();
        Ok(())
    }

    /// Remove a schedule and cancel its timers immediately
    pub fn remove_schedule(&mut self, id: &str) -> Result<ScheduledActivation, ConfigError> {
        let index = self.schedule_index(id)?;
        self.schedules.disarm(&mut self.timers, id);
        let removed = self.config.schedules.remove(index);
        self.persist();
        info!("Schedule {} removed", id);
        Ok(removed)
    }

    /// Enable or disable a schedule without deleting it
    pub fn set_schedule_active(&mut self, id: &str, active: bool) -> Result<(), ConfigError> {
        let index = self.schedule_index(id)?;
        self.config.schedules[index].active = active;

        if active {
            let now = self.clock.now();
            let schedule = self.config.schedules[index].clone();
            self.schedules.arm(&mut self.timers, &schedule, now);
        } else {
            self.schedules.disarm(&mut self.timers, id);
        }
        self.persist();
        Ok(())
    }

    pub fn list_schedules(&self) -> &[ScheduledActivation] {
        &self.config.schedules
    }

    /// When the schedule's start timer is due, if armed
    pub fn next_schedule_fire(&self, id: &str) -> Option<Timestamp> {
        self.schedules.next_fire(&self.timers, id)
    }

    fn schedule_index(&self, id: &str) -> Result<usize, ConfigError> {
        self.config
            .schedules
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| ConfigError::ScheduleNotFound(id.to_string()))
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        self.persist();
    }

    /// Change the activation method, disarming recognizers it no longer uses
    pub fn set_activation_method(&mut self, method: ActivationMethod) {
        self.config.activation_method = method;
        if !method.allows_long_press() {
            self.on_long_press_end();
        }
        if !method.allows_gestures() {
            self.disarm_gesture_recognizers();
        }
        self.persist();
    }

    /// Set the long-press hold, clamped to 1s-10s. Returns the stored value.
    pub fn set_long_press_duration(&mut self, duration: Duration) -> Duration {
        let clamped = clamp_long_press(duration);
        if clamped != duration {
            warn!(
                "Long-press duration {:?} out of range, clamped to {:?}",
                duration, clamped
            );
        }
        self.config.long_press_duration = clamped;
        self.persist();
        clamped
    }

    pub fn set_gesture_sequence(&mut self, sequence: GestureSequence) {
        self.config.gesture_sequence = sequence;
        self.disarm_gesture_recognizers();
        self.persist();
    }

    /// Set or clear the custom unlock pattern
    pub fn set_custom_pattern(
        &mut self,
        pattern: Option<Vec<PatternPoint>>,
    ) -> Result<(), ConfigError> {
        if let Some(points) = &pattern {
            if points.is_empty() {
                return Err(ConfigError::InvalidPattern(
                    "pattern needs at least one point".to_string(),
                ));
            }
            if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
                return Err(ConfigError::InvalidPattern(
                    "pattern coordinates must be finite".to_string(),
                ));
            }
        }
        self.config.custom_pattern = pattern;
        self.recognizer.clear_pattern();
        self.cancel_pattern_timeout();
        self.persist();
        Ok(())
    }

    /// Set the covert brightness, clamped to [0, 1]. Applied immediately if active.
    pub fn set_brightness_level(&mut self, level: f32) -> f32 {
        let clamped = clamp_brightness(level);
        self.config.brightness_level = clamped;
        self.persist();
        self.reapply_display();
        clamped
    }

    pub fn set_show_status_bar(&mut self, show: bool) {
        self.config.show_status_bar = show;
        self.persist();
        self.reapply_display();
    }

    pub fn set_emergency_deactivation_enabled(&mut self, enabled: bool) {
        self.config.emergency_deactivation_enabled = enabled;
        self.persist();
    }

    /// Takes effect from the next activation
    pub fn set_auto_deactivate_after(&mut self, after: Option<Duration>) -> Result<(), ConfigError> {
        if after.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::InvalidSetting(
                "auto-deactivate delay must be positive".to_string(),
            ));
        }
        self.config.auto_deactivate_after = after;
        self.persist();
        Ok(())
    }

    pub fn set_vibrate_on_activation(&mut self, vibrate: bool) {
        self.config.vibrate_on_activation = vibrate;
        self.persist();
    }

    pub fn set_lockout_thresholds(
        &mut self,
        max_attempts: u32,
        lockout_duration: Duration,
    ) -> Result<(), ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::InvalidSetting(
                "max access attempts must be at least 1".to_string(),
            ));
        }
        if lockout_duration.is_zero() {
            return Err(ConfigError::InvalidSetting(
                "lockout duration must be positive".to_string(),
            ));
        }
        self.config.max_access_attempts = max_attempts;
        self.config.lockout_duration = lockout_duration;
        self.persist();
        Ok(())
    }

    /// Taps within the window that count as tampering; must exceed the triple tap
    pub fn set_repeated_touch_threshold(&mut self, threshold: u32) -> Result<(), ConfigError> {
        if (threshold as usize) <= TRIPLE_TAP_COUNT {
            return Err(ConfigError::InvalidSetting(format!(
                "repeated touch threshold must be greater than {}",
                TRIPLE_TAP_COUNT
            )));
        }
        self.config.repeated_touch_threshold = threshold;
        self.persist();
        Ok(())
    }

    fn disarm_gesture_recognizers(&mut self) {
        self.recognizer.clear();
        for handle in [self.gesture_timeout.take(), self.pattern_timeout.take()]
            .into_iter()
            .flatten()
        {
            self.timers.cancel(handle);
        }
    }

    fn reapply_display(&mut self) {
        if self.owns_display && self.config.is_active {
            self.platform
                .hide_display(self.config.brightness_level, !self.config.show_status_bar);
        }
    }

    // ------------------------------------------------------------------
    // Read-only views
    // ------------------------------------------------------------------

    pub fn is_active(&self) -> bool {
        self.config.is_active
    }

    pub fn is_locked_out(&self) -> bool {
        self.guard.is_inhibited(self.clock.now())
    }

    pub fn locked_out_until(&self) -> Option<Timestamp> {
        self.guard.inhibited_until(self.clock.now())
    }

    pub fn state(&self) -> ControllerState {
        if self.is_locked_out() {
            ControllerState::LockedOut {
                underlying_active: self.config.is_active,
            }
        } else if self.config.is_active {
            ControllerState::Active
        } else {
            ControllerState::Inactive
        }
    }

    /// Full configuration snapshot
    pub fn config(&self) -> &StealthConfig {
        &self.config
    }

    pub fn access_attempts(&self) -> &VecDeque<AccessAttempt> {
        &self.config.access_attempts
    }

    pub fn recent_attempts_since(&self, since: Timestamp) -> Vec<AccessAttempt> {
        attempts_since(&self.config.access_attempts, since)
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Write-through: every mutation is persisted in full
    ///
    /// A failed write is logged and the in-memory state is kept, so the
    /// session stays correct even when it is not durable.
    fn persist(&mut self) {
        // Save the full record, including the active flag
        if let Err(e) = self.store.save(&self.config) {
            log::error!("Failed to persist stealth configuration: {:#}", e);
        }
    }
}
