use crate::model::Timestamp;
use thiserror::Error;

/// Outcome of a successful state-changing call
///
/// Kept separate from [`ActivationError`] so callers can tell "refused"
/// apart from "nothing to do".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The covert state changed
    Changed,
    /// Already in the requested state, or the call was switched off
    Unchanged,
}

impl Transition {
    pub fn changed(self) -> bool {
        self == Transition::Changed
    }
}

/// Refusals of activate/deactivate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    /// Too many access attempts; every transition is blocked until `until`
    #[error("controller is locked out until {until}")]
    LockedOut { until: Timestamp },

    /// The stealth feature is switched off in the configuration
    #[error("blank screen stealth is disabled")]
    Disabled,
}

/// Rejected configuration changes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid schedule configuration: {0}")]
    InvalidSchedule(String),

    #[error("schedule not found: {0}")]
    ScheduleNotFound(String),

    #[error("a schedule with id '{0}' already exists")]
    DuplicateSchedule(String),

    #[error("invalid custom pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}
