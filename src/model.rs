//! Persisted data model for the stealth controller
//!
//! Everything the controller remembers between runs lives in one
//! [`StealthConfig`] record: settings, schedules and the bounded attempt log.
//! The record is serialized as camelCase JSON. Every field has a default so
//! records written by older builds keep loading after fields are added.

use crate::constants::{
    LOCKOUT_DEFAULT_SECONDS, LONG_PRESS_DEFAULT_SECONDS, LONG_PRESS_MAX_SECONDS,
    LONG_PRESS_MIN_SECONDS, MAX_ACCESS_ATTEMPTS_DEFAULT, REPEATED_TOUCH_DEFAULT_THRESHOLD,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;

/// Local wall-clock time. Schedules are calendar rules, so all arithmetic
/// happens on the device's local time of day.
pub type Timestamp = NaiveDateTime;

/// How the covert state is entered and which recognizers may end it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivationMethod {
    #[default]
    LongPress,
    Gesture,
    Both,
    Scheduled,
}

impl ActivationMethod {
    /// Whether a long press may deactivate under this method.
    ///
    /// Scheduled activation keeps long-press as its way out.
    pub fn allows_long_press(self) -> bool {
        match self {
            ActivationMethod::LongPress | ActivationMethod::Both | ActivationMethod::Scheduled => {
                true
            }
            ActivationMethod::Gesture => false,
        }
    }

    /// Whether the configured gesture sequence may deactivate under this method.
    pub fn allows_gestures(self) -> bool {
        match self {
            ActivationMethod::Gesture | ActivationMethod::Both => true,
            ActivationMethod::LongPress | ActivationMethod::Scheduled => false,
        }
    }
}

/// The gesture that deactivates when gestures are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GestureSequence {
    #[default]
    TripleTap,
    SwipeUp,
    Shake,
    CustomPattern,
}

/// One sample of a custom unlock pattern, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternPoint {
    pub x: f64,
    pub y: f64,
}

impl PatternPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Recurrence of a scheduled activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Repeat {
    Once,
    Daily,
    Weekly,
    Monthly,
    Never,
}

/// A calendar rule that activates the covert state without user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledActivation {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    pub start_time: Timestamp,
    #[serde(default)]
    pub end_time: Option<Timestamp>,
    pub repeat: Repeat,
    #[serde(default = "default_true")]
    pub active: bool,
    /// 0 = Sunday .. 6 = Saturday. Weekly schedules only.
    #[serde(default)]
    pub days_of_week: BTreeSet<u8>,
    /// 1..=31, clamped to the month length. Monthly schedules only.
    #[serde(default)]
    pub date_of_month: Option<u32>,
}

impl ScheduledActivation {
    /// Create an active schedule with a freshly generated id
    pub fn new(start_time: Timestamp, repeat: Repeat) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: None,
            start_time,
            end_time: None,
            repeat,
            active: true,
            days_of_week: BTreeSet::new(),
            date_of_month: None,
        }
    }

    pub fn with_end_time(mut self, end_time: Timestamp) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_days_of_week(mut self, days: impl IntoIterator<Item = u8>) -> Self {
        self.days_of_week = days.into_iter().collect();
        self
    }

    pub fn with_date_of_month(mut self, day: u32) -> Self {
        self.date_of_month = Some(day);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Length of each covert session started by this schedule, if it ends on its own
    pub fn session_length(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Category of a logged access attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttemptKind {
    FailedUnlock,
    RepeatedTouches,
    SuspiciousPattern,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessAttempt {
    pub timestamp: Timestamp,
    #[serde(rename = "type")]
    pub kind: AttemptKind,
    pub details: String,
}

/// The single persisted configuration record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StealthConfig {
    pub enabled: bool,
    pub activation_method: ActivationMethod,
    #[serde(with = "duration_ms")]
    pub long_press_duration: Duration,
    pub gesture_sequence: GestureSequence,
    pub custom_pattern: Option<Vec<PatternPoint>>,
    pub is_active: bool,
    pub last_activation_time: Option<Timestamp>,
    pub brightness_level: f32,
    pub show_status_bar: bool,
    pub emergency_deactivation_enabled: bool,
    #[serde(with = "option_duration_ms")]
    pub auto_deactivate_after: Option<Duration>,
    pub vibrate_on_activation: bool,
    pub max_access_attempts: u32,
    #[serde(with = "duration_ms")]
    pub lockout_duration: Duration,
    pub repeated_touch_threshold: u32,
    pub locked_out_until: Option<Timestamp>,
    pub schedules: Vec<ScheduledActivation>,
    pub access_attempts: VecDeque<AccessAttempt>,
}

impl Default for StealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            activation_method: ActivationMethod::LongPress,
            long_press_duration: Duration::from_secs(LONG_PRESS_DEFAULT_SECONDS),
            gesture_sequence: GestureSequence::TripleTap,
            custom_pattern: None,
            is_active: false,
            last_activation_time: None,
            brightness_level: 0.0,
            show_status_bar: false,
            emergency_deactivation_enabled: true,
            auto_deactivate_after: None,
            vibrate_on_activation: true,
            max_access_attempts: MAX_ACCESS_ATTEMPTS_DEFAULT,
            lockout_duration: Duration::from_secs(LOCKOUT_DEFAULT_SECONDS),
            repeated_touch_threshold: REPEATED_TOUCH_DEFAULT_THRESHOLD,
            locked_out_until: None,
            schedules: Vec::new(),
            access_attempts: VecDeque::new(),
        }
    }
}

impl StealthConfig {
    pub fn schedule(&self, id: &str) -> Option<&ScheduledActivation> {
        self.schedules.iter().find(|s| s.id == id)
    }

    /// Bring loaded values back inside their documented ranges
    pub fn sanitize(&mut self) {
        self.long_press_duration = clamp_long_press(self.long_press_duration);
        self.brightness_level = clamp_brightness(self.brightness_level);
        self.max_access_attempts = self.max_access_attempts.max(1);
    }
}

fn default_true() -> bool {
    true
}

/// Clamp a long-press duration to 1s-10s
pub fn clamp_long_press(duration: Duration) -> Duration {
    duration.clamp(
        Duration::from_secs(LONG_PRESS_MIN_SECONDS),
        Duration::from_secs(LONG_PRESS_MAX_SECONDS),
    )
}

/// Clamp a brightness level to [0, 1]; NaN becomes fully covert
pub fn clamp_brightness(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

/// Add a std duration to a timestamp, saturating instead of overflowing
pub fn add_duration(ts: Timestamp, duration: Duration) -> Timestamp {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|delta| ts.checked_add_signed(delta))
        .unwrap_or(NaiveDateTime::MAX)
}

/// Add a millisecond offset to a timestamp, saturating instead of overflowing
pub fn add_millis(ts: Timestamp, millis: i64) -> Timestamp {
    ts.checked_add_signed(chrono::Duration::milliseconds(millis))
        .unwrap_or(NaiveDateTime::MAX)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

mod option_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&(d.as_millis().min(u64::MAX as u128) as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
