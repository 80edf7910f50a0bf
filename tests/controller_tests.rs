mod common;

use common::{at, start, DisplayCall, Harness, RecordingPlatform};
use std::time::Duration;
use stealthscreen::constants::ACTIVATION_VIBRATION_PATTERN_MS;
use stealthscreen::{
    ActivationController, ActivationError, ActivationMethod, AttemptKind, ConfigError, ControllerState,
    GestureOutcome, GestureSequence, PatternPoint, StealthConfig, Transition,
};

fn gesture_config(sequence: GestureSequence) -> StealthConfig {
    StealthConfig {
        activation_method: ActivationMethod::Gesture,
        gesture_sequence: sequence,
        ..StealthConfig::default()
    }
}

fn pattern() -> Vec<PatternPoint> {
    vec![
        PatternPoint::new(100.0, 100.0),
        PatternPoint::new(500.0, 1000.0),
        PatternPoint::new(900.0, 1900.0),
    ]
}

fn pattern_harness() -> Harness {
    Harness::with_config(StealthConfig {
        custom_pattern: Some(pattern()),
        ..gesture_config(GestureSequence::CustomPattern)
    })
}

#[test]
fn test_initial_state() {
    let h = Harness::new();
    assert!(!h.controller.is_active());
    assert!(!h.controller.is_locked_out());
    assert_eq!(h.controller.state(), ControllerState::Inactive);
    assert_eq!(h.controller.next_deadline(), None);
    assert!(h.platform.calls().is_empty());
}

#[test]
fn test_activate_hides_display_and_persists() {
    let mut h = Harness::new();
    assert_eq!(h.controller.activate(None), Ok(Transition::Changed));

    assert!(h.controller.is_active());
    assert_eq!(
        h.platform.calls(),
        vec![
            DisplayCall::Hide {
                brightness: 0.0,
                hide_status_bar: true
            },
            DisplayCall::Vibrate(ACTIVATION_VIBRATION_PATTERN_MS.to_vec()),
        ]
    );

    let stored = h.stored();
    assert!(stored.is_active);
    assert_eq!(stored.last_activation_time, Some(start()));
}

#[test]
fn test_activate_twice_is_unchanged() {
    let mut h = Harness::new();
    h.controller.activate(None).unwrap();
    assert_eq!(h.controller.activate(None), Ok(Transition::Unchanged));
    assert_eq!(h.platform.hides(), 1);
}

#[test]
fn test_activate_when_disabled() {
    let mut h = Harness::new();
    h.controller.set_enabled(false);
    assert_eq!(h.controller.activate(None), Err(ActivationError::Disabled));
    assert!(!h.controller.is_active());
}

#[test]
fn test_display_settings_are_applied() {
    let mut h = Harness::new();
    assert_eq!(h.controller.set_brightness_level(2.0), 1.0);
    h.controller.set_show_status_bar(true);
    h.controller.set_vibrate_on_activation(false);
    h.controller.activate(None).unwrap();

    assert_eq!(
        h.platform.calls(),
        vec![DisplayCall::Hide {
            brightness: 1.0,
            hide_status_bar: false
        }]
    );

    // Changing brightness during a session re-applies it
    h.controller.set_brightness_level(0.2);
    assert_eq!(h.platform.hides(), 2);
}

#[test]
fn test_long_press_deactivates_after_hold() {
    for secs in [1, 3, 10] {
        let mut h = Harness::new();
        h.controller.set_long_press_duration(Duration::from_secs(secs));
        h.controller.activate(None).unwrap();

        assert!(h.controller.on_long_press_start());
        h.advance_ms(secs as i64 * 1000 - 1);
        assert!(h.controller.is_active(), "Still active just before {}s", secs);

        h.advance_ms(1);
        assert!(!h.controller.is_active(), "Deactivated after {}s hold", secs);
        assert_eq!(h.platform.restores(), 1);
    }
}

#[test]
fn test_long_press_released_early_does_nothing() {
    let mut h = Harness::new();
    h.controller.activate(None).unwrap();

    h.controller.on_long_press_start();
    h.advance_ms(2999);
    h.controller.on_long_press_end();
    h.advance_secs(10);

    assert!(h.controller.is_active());
    assert_eq!(h.controller.next_deadline(), None);
}

#[test]
fn test_long_press_duration_is_clamped() {
    let mut h = Harness::new();
    assert_eq!(
        h.controller.set_long_press_duration(Duration::from_millis(200)),
        Duration::from_secs(1)
    );
    assert_eq!(
        h.controller.set_long_press_duration(Duration::from_secs(60)),
        Duration::from_secs(10)
    );
}

#[test]
fn test_long_press_follows_activation_method() {
    let mut h = Harness::with_config(gesture_config(GestureSequence::TripleTap));
    h.controller.activate(None).unwrap();
    assert!(!h.controller.on_long_press_start(), "Gesture method has no long press");

    h.controller.set_activation_method(ActivationMethod::Scheduled);
    assert!(h.controller.on_long_press_start(), "Scheduled keeps long press");

    let mut inactive = Harness::new();
    assert!(!inactive.controller.on_long_press_start(), "Ignored while inactive");
}

#[test]
fn test_triple_tap_within_window_deactivates() {
    for method in [ActivationMethod::Gesture, ActivationMethod::Both] {
        let mut h = Harness::with_config(StealthConfig {
            activation_method: method,
            ..StealthConfig::default()
        });
        h.controller.activate(None).unwrap();

        assert_eq!(h.controller.register_gesture_tap(), GestureOutcome::Pending);
        h.advance_ms(900);
        assert_eq!(h.controller.register_gesture_tap(), GestureOutcome::Pending);
        h.advance_ms(900);
        assert_eq!(h.controller.register_gesture_tap(), GestureOutcome::Matched);

        assert!(!h.controller.is_active(), "{:?} allows triple tap", method);
    }
}

#[test]
fn test_triple_tap_spanning_more_than_window() {
    let mut h = Harness::with_config(gesture_config(GestureSequence::TripleTap));
    h.controller.activate(None).unwrap();

    h.controller.register_gesture_tap();
    h.advance_ms(1500);
    h.controller.register_gesture_tap();
    h.advance_ms(1600);
    assert_eq!(h.controller.register_gesture_tap(), GestureOutcome::Pending);
    assert!(h.controller.is_active());
}

#[test]
fn test_triple_tap_spanning_exactly_the_window() {
    let mut h = Harness::with_config(gesture_config(GestureSequence::TripleTap));
    h.controller.activate(None).unwrap();

    assert_eq!(h.controller.register_gesture_tap(), GestureOutcome::Pending);
    h.advance_ms(1000);
    assert_eq!(h.controller.register_gesture_tap(), GestureOutcome::Pending);
    h.advance_ms(1000);
    assert_eq!(h.controller.register_gesture_tap(), GestureOutcome::Matched);
    assert!(!h.controller.is_active());
}

#[test]
fn test_tap_on_window_edge_survives_timeout() {
    let mut h = Harness::with_config(gesture_config(GestureSequence::TripleTap));
    h.controller.activate(None).unwrap();

    h.controller.register_gesture_tap();
    h.controller.register_gesture_tap();
    h.advance_ms(2000);
    assert_eq!(h.controller.register_gesture_tap(), GestureOutcome::Matched);
    assert!(!h.controller.is_active());
}

#[test]
fn test_tap_buffer_resets_after_timeout() {
    let mut h = Harness::with_config(gesture_config(GestureSequence::TripleTap));
    h.controller.activate(None).unwrap();

    h.controller.register_gesture_tap();
    h.controller.register_gesture_tap();
    h.advance_ms(2001);
    assert_eq!(h.controller.register_gesture_tap(), GestureOutcome::Pending);
    assert!(h.controller.is_active());
}

#[test]
fn test_taps_ignored_without_gesture_method() {
    let mut h = Harness::new();
    h.controller.activate(None).unwrap();
    for _ in 0..3 {
        assert_eq!(h.controller.register_gesture_tap(), GestureOutcome::Ignored);
    }
    assert!(h.controller.is_active());
}

#[test]
fn test_rapid_tapping_is_logged_as_tampering() {
    let mut h = Harness::new();
    h.controller.activate(None).unwrap();

    for _ in 0..5 {
        h.controller.register_gesture_tap();
        h.advance_ms(100);
    }
    assert!(h.controller.access_attempts().is_empty());

    let outcome = h.controller.register_gesture_tap();
    assert!(matches!(outcome, GestureOutcome::Tamper { matched: false, .. }));

    let attempts = h.controller.access_attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].kind, AttemptKind::RepeatedTouches);
    assert!(h.controller.is_active());
}

#[test]
fn test_swipe_up_deactivates() {
    let mut h = Harness::with_config(StealthConfig {
        activation_method: ActivationMethod::Both,
        gesture_sequence: GestureSequence::SwipeUp,
        ..StealthConfig::default()
    });
    h.controller.activate(None).unwrap();

    assert_eq!(h.controller.on_swipe(0.0, -30.0), GestureOutcome::Ignored);
    assert_eq!(h.controller.on_swipe(80.0, -200.0), GestureOutcome::Ignored);
    assert!(h.controller.is_active());

    assert_eq!(h.controller.on_swipe(5.0, -80.0), GestureOutcome::Matched);
    assert!(!h.controller.is_active());
}

#[test]
fn test_shake_only_when_configured() {
    let mut h = Harness::with_config(gesture_config(GestureSequence::TripleTap));
    h.controller.activate(None).unwrap();
    assert_eq!(h.controller.on_shake(), GestureOutcome::Ignored);
    assert!(h.controller.is_active());

    h.controller.set_gesture_sequence(GestureSequence::Shake);
    assert_eq!(h.controller.on_shake(), GestureOutcome::Matched);
    assert!(!h.controller.is_active());
}

#[test]
fn test_custom_pattern_within_tolerance_deactivates() {
    let mut h = pattern_harness();
    h.controller.activate(None).unwrap();

    // Tolerance is 10% of 1000x2000: 100px across, 200px down
    assert_eq!(
        h.controller.register_pattern_point(150.0, 150.0),
        GestureOutcome::Pending
    );
    h.controller.register_pattern_point(520.0, 1100.0);
    assert_eq!(
        h.controller.register_pattern_point(880.0, 1850.0),
        GestureOutcome::Matched
    );
    assert!(!h.controller.is_active());
    assert!(h.controller.access_attempts().is_empty());
}

#[test]
fn test_custom_pattern_point_outside_tolerance_fails() {
    let mut h = pattern_harness();
    h.controller.activate(None).unwrap();

    h.controller.register_pattern_point(100.0, 100.0);
    h.controller.register_pattern_point(650.0, 1000.0);
    let outcome = h.controller.register_pattern_point(900.0, 1900.0);
    assert!(matches!(
        outcome,
        GestureOutcome::Rejected {
            kind: AttemptKind::FailedUnlock,
            ..
        }
    ));

    assert!(h.controller.is_active());
    let attempts = h.controller.access_attempts();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].kind, AttemptKind::FailedUnlock);
    assert_eq!(h.stored().access_attempts.len(), 1);
}

#[test]
fn test_pattern_buffer_resets_after_timeout() {
    let mut h = pattern_harness();
    h.controller.activate(None).unwrap();

    h.controller.register_pattern_point(0.0, 0.0);
    h.controller.register_pattern_point(0.0, 0.0);
    h.advance_ms(3001);

    h.controller.register_pattern_point(100.0, 100.0);
    h.controller.register_pattern_point(500.0, 1000.0);
    assert_eq!(
        h.controller.register_pattern_point(900.0, 1900.0),
        GestureOutcome::Matched
    );
    assert!(h.controller.access_attempts().is_empty());
}

#[test]
fn test_pattern_ignored_without_configured_points() {
    let mut h = Harness::with_config(gesture_config(GestureSequence::CustomPattern));
    h.controller.activate(None).unwrap();
    assert_eq!(
        h.controller.register_pattern_point(1.0, 1.0),
        GestureOutcome::Ignored
    );
}

#[test]
fn test_emergency_deactivate_ignores_method() {
    for method in [
        ActivationMethod::LongPress,
        ActivationMethod::Gesture,
        ActivationMethod::Both,
        ActivationMethod::Scheduled,
    ] {
        let mut h = Harness::with_config(StealthConfig {
            activation_method: method,
            ..StealthConfig::default()
        });
        h.controller.activate(None).unwrap();
        assert_eq!(h.controller.emergency_deactivate(), Ok(Transition::Changed));
        assert!(!h.controller.is_active(), "{:?}", method);
    }
}

#[test]
fn test_emergency_deactivate_when_disabled() {
    let mut h = Harness::new();
    h.controller.set_emergency_deactivation_enabled(false);
    h.controller.activate(None).unwrap();

    assert_eq!(h.controller.on_back_pressed(), Ok(Transition::Unchanged));
    assert!(h.controller.is_active());
}

#[test]
fn test_back_button_deactivates() {
    let mut h = Harness::new();
    h.controller.activate(None).unwrap();
    assert_eq!(h.controller.on_back_pressed(), Ok(Transition::Changed));
    assert!(!h.controller.is_active());
}

#[test]
fn test_auto_deactivate_timer() {
    let mut h = Harness::new();
    h.controller
        .set_auto_deactivate_after(Some(Duration::from_secs(60)))
        .unwrap();
    h.controller.activate(None).unwrap();

    h.advance_ms(59_999);
    assert!(h.controller.is_active());
    h.advance_ms(1);
    assert!(!h.controller.is_active());
}

#[test]
fn test_deactivate_cancels_pending_timers() {
    let mut h = Harness::new();
    h.controller
        .set_auto_deactivate_after(Some(Duration::from_secs(60)))
        .unwrap();
    h.controller.activate(None).unwrap();
    h.controller.on_long_press_start();
    h.controller.deactivate().unwrap();
    assert_eq!(h.controller.next_deadline(), None);

    // A new session gets its own timer; the old one must not end it early
    h.advance_secs(30);
    h.controller.activate(None).unwrap();
    h.advance_secs(31);
    assert!(h.controller.is_active());
    h.advance_secs(29);
    assert!(!h.controller.is_active());
}

#[test]
fn test_lockout_blocks_then_expires() {
    let mut h = Harness::new();
    h.controller.activate(None).unwrap();

    for i in 0..4 {
        assert!(h
            .controller
            .record_attempt(AttemptKind::FailedUnlock, format!("try {}", i))
            .is_none());
        h.advance_secs(10);
    }
    let until = h
        .controller
        .record_attempt(AttemptKind::FailedUnlock, "try 4")
        .expect("Fifth attempt locks out");
    assert_eq!(until, at(2026, 10, 14, 12, 5) + chrono::Duration::seconds(40));

    let refused = Err(ActivationError::LockedOut { until });
    assert_eq!(h.controller.deactivate(), refused);
    assert_eq!(h.controller.emergency_deactivate(), refused);
    assert_eq!(h.controller.activate(None), refused);
    assert_eq!(
        h.controller.state(),
        ControllerState::LockedOut {
            underlying_active: true
        }
    );
    assert_eq!(h.stored().locked_out_until, Some(until));

    h.advance_secs(299);
    assert!(h.controller.is_locked_out());
    h.advance_secs(1);
    assert!(!h.controller.is_locked_out());
    assert_eq!(h.stored().locked_out_until, None);
    assert_eq!(h.controller.deactivate(), Ok(Transition::Changed));
}

#[test]
fn test_long_press_cannot_complete_during_lockout() {
    let mut h = Harness::new();
    h.controller.activate(None).unwrap();
    h.controller.on_long_press_start();
    for _ in 0..5 {
        h.controller.record_attempt(AttemptKind::SuspiciousPattern, "scribble");
    }
    h.advance_secs(5);
    assert!(h.controller.is_active());
}

#[test]
fn test_attempts_outside_window_do_not_lock_out() {
    let mut h = Harness::new();
    for _ in 0..4 {
        h.controller.record_attempt(AttemptKind::FailedUnlock, "slow");
        h.advance_secs(20);
    }
    // The first attempt is 80s old by now
    assert!(h
        .controller
        .record_attempt(AttemptKind::FailedUnlock, "slow")
        .is_none());
    assert!(!h.controller.is_locked_out());
}

#[test]
fn test_failed_patterns_trigger_lockout() {
    let mut h = pattern_harness();
    h.controller.set_lockout_thresholds(2, Duration::from_secs(30)).unwrap();
    h.controller.activate(None).unwrap();

    for _ in 0..2 {
        h.controller.register_pattern_point(100.0, 100.0);
        h.controller.register_pattern_point(650.0, 1000.0);
        h.controller.register_pattern_point(900.0, 1900.0);
    }
    assert!(h.controller.is_locked_out());

    // Even a correct pattern cannot deactivate now
    h.controller.register_pattern_point(100.0, 100.0);
    h.controller.register_pattern_point(500.0, 1000.0);
    h.controller.register_pattern_point(900.0, 1900.0);
    assert!(h.controller.is_active());
}

#[test]
fn test_backgrounding_forces_deactivation_under_lockout() {
    let mut h = Harness::new();
    h.controller.set_emergency_deactivation_enabled(false);
    h.controller.activate(None).unwrap();
    for _ in 0..5 {
        h.controller.record_attempt(AttemptKind::RepeatedTouches, "mashing");
    }
    assert!(h.controller.is_locked_out());

    assert_eq!(h.controller.on_app_backgrounded(), Transition::Changed);
    assert!(!h.controller.is_active());
    assert_eq!(h.platform.restores(), 1);
    assert!(!h.stored().is_active);
}

#[test]
fn test_backgrounding_while_inactive_is_noop() {
    let mut h = Harness::new();
    assert_eq!(h.controller.on_app_backgrounded(), Transition::Unchanged);
    assert_eq!(h.platform.restores(), 0);
}

#[test]
fn test_restart_clears_active_session() {
    let mut h = Harness::new();
    h.controller.activate(None).unwrap();
    assert!(h.stored().is_active);

    h.restart();
    assert!(!h.controller.is_active());
    assert!(!h.stored().is_active);
    assert_eq!(
        h.controller.config().last_activation_time,
        Some(start()),
        "History survives the restart"
    );
}

#[test]
fn test_attached_editor_leaves_running_session_alone() {
    let mut h = Harness::new();
    h.controller.activate(None).unwrap();

    let platform = RecordingPlatform::default();
    let mut editor =
        ActivationController::attach(h.clock.clone(), h.store.clone(), platform.clone());
    assert!(editor.is_active(), "Stored session is reported as is");
    assert!(h.stored().is_active, "Opening does not clear the session");

    editor.set_brightness_level(0.05);
    editor.set_show_status_bar(true);
    let stored = h.stored();
    assert!(stored.is_active);
    assert_eq!(stored.brightness_level, 0.05);
    assert!(platform.calls().is_empty(), "Editor never touches the display");
}

#[test]
fn test_restart_keeps_lockout() {
    let mut h = Harness::new();
    for _ in 0..5 {
        h.controller.record_attempt(AttemptKind::FailedUnlock, "x");
    }
    let until = h.controller.locked_out_until().unwrap();

    h.advance_secs(60);
    h.restart();
    assert!(h.controller.is_locked_out());
    assert_eq!(h.controller.locked_out_until(), Some(until));
    assert_eq!(
        h.controller.activate(None),
        Err(ActivationError::LockedOut { until })
    );

    h.advance_secs(240);
    assert!(!h.controller.is_locked_out());
    assert_eq!(h.stored().locked_out_until, None);
}

#[test]
fn test_restart_drops_expired_lockout() {
    let mut h = Harness::new();
    for _ in 0..5 {
        h.controller.record_attempt(AttemptKind::FailedUnlock, "x");
    }
    h.clock.advance_secs(600);
    h.restart();
    assert!(!h.controller.is_locked_out());
    assert_eq!(h.stored().locked_out_until, None);
}

#[test]
fn test_write_failure_keeps_memory_state() {
    let mut h = Harness::new();
    h.store.set_fail_writes(true);

    assert_eq!(h.controller.activate(None), Ok(Transition::Changed));
    assert!(h.controller.is_active());
    assert!(h.store.raw().is_none(), "Nothing reached the store");

    h.store.set_fail_writes(false);
    h.controller.deactivate().unwrap();
    assert!(!h.stored().is_active);
}

#[test]
fn test_recent_attempts_since() {
    let mut h = Harness::new();
    h.controller.record_attempt(AttemptKind::FailedUnlock, "old");
    h.advance_secs(120);
    h.controller.record_attempt(AttemptKind::SuspiciousPattern, "new");

    let recent = h
        .controller
        .recent_attempts_since(start() + chrono::Duration::seconds(60));
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].details, "new");
    assert_eq!(h.controller.access_attempts().len(), 2);
}

#[test]
fn test_setting_validation() {
    let mut h = Harness::new();
    assert!(matches!(
        h.controller.set_repeated_touch_threshold(3),
        Err(ConfigError::InvalidSetting(_))
    ));
    assert!(h.controller.set_repeated_touch_threshold(4).is_ok());
    assert!(matches!(
        h.controller.set_lockout_thresholds(0, Duration::from_secs(60)),
        Err(ConfigError::InvalidSetting(_))
    ));
    assert!(matches!(
        h.controller.set_lockout_thresholds(3, Duration::ZERO),
        Err(ConfigError::InvalidSetting(_))
    ));
    assert!(matches!(
        h.controller.set_custom_pattern(Some(Vec::new())),
        Err(ConfigError::InvalidPattern(_))
    ));
    assert!(matches!(
        h.controller
            .set_custom_pattern(Some(vec![PatternPoint::new(f64::NAN, 1.0)])),
        Err(ConfigError::InvalidPattern(_))
    ));
    assert!(matches!(
        h.controller.set_auto_deactivate_after(Some(Duration::ZERO)),
        Err(ConfigError::InvalidSetting(_))
    ));

    let stored = h.stored();
    assert_eq!(stored.repeated_touch_threshold, 4);
    assert_eq!(stored.max_access_attempts, 5);
}
