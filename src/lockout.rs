//! Intrusion lockout
//!
//! Every suspicious interaction is appended to the bounded attempt log. When
//! the number of attempts inside the trailing window reaches the configured
//! maximum, the guard inhibits the controller for a fixed duration. The
//! inhibition is a deadline compared against the clock, never a flag that a
//! timer has to remember to clear.

use crate::constants::{ATTEMPT_LOG_CAPACITY, ATTEMPT_WINDOW_SECONDS};
use crate::error::ActivationError;
use crate::model::{add_duration, AccessAttempt, AttemptKind, StealthConfig, Timestamp};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inhibition {
    #[default]
    Clear,
    Inhibited {
        until: Timestamp,
    },
}

/// Thresholds the guard evaluates against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lockout_duration: Duration,
}

impl LockoutPolicy {
    pub fn from_config(config: &StealthConfig) -> Self {
        Self {
            max_attempts: config.max_access_attempts.max(1),
            lockout_duration: config.lockout_duration,
        }
    }
}

#[derive(Debug, Default)]
pub struct LockoutGuard {
    state: Inhibition,
}

impl LockoutGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the guard from a persisted deadline
    pub fn restore(until: Option<Timestamp>, now: Timestamp) -> Self {
        let state = match until {
            Some(until) if until > now => {
                log::warn!("Restoring lockout that lasts until {}", until);
                Inhibition::Inhibited { until }
            }
            _ => Inhibition::Clear,
        };
        Self { state }
    }

    /// Current inhibition as seen at `now`
    pub fn inhibition(&self, now: Timestamp) -> Inhibition {
        match self.state {
            Inhibition::Inhibited { until } if until > now => self.state,
            _ => Inhibition::Clear,
        }
    }

    pub fn is_inhibited(&self, now: Timestamp) -> bool {
        matches!(self.inhibition(now), Inhibition::Inhibited { .. })
    }

    pub fn inhibited_until(&self, now: Timestamp) -> Option<Timestamp> {
        match self.inhibition(now) {
            Inhibition::Inhibited { until } => Some(until),
            Inhibition::Clear => None,
        }
    }

    /// Gate for every state-changing operation
    pub fn check(&self, now: Timestamp) -> Result<(), ActivationError> {
        match self.inhibition(now) {
            Inhibition::Inhibited { until } => Err(ActivationError::LockedOut { until }),
            Inhibition::Clear => Ok(()),
        }
    }

    /// Append an attempt and evaluate the trailing window
    ///
    /// Returns the lockout deadline if this attempt triggered a new lockout.
    /// Attempts logged while already inhibited are recorded but do not extend it.
    pub fn log_attempt(
        &mut self,
        attempts: &mut VecDeque<AccessAttempt>,
        kind: AttemptKind,
        details: impl Into<String>,
        now: Timestamp,
        policy: LockoutPolicy,
    ) -> Option<Timestamp> {
        let details = details.into();
        log::warn!("Access attempt recorded: {:?} ({})", kind, details);

        attempts.push_back(AccessAttempt {
            timestamp: now,
            kind,
            details,
        });
        while attempts.len() > ATTEMPT_LOG_CAPACITY {
            attempts.pop_front();
        }

        if self.is_inhibited(now) {
            return None;
        }

        let recent = count_in_window(attempts, now);
        if recent >= policy.max_attempts as usize {
            let until = add_duration(now, policy.lockout_duration);
            self.state = Inhibition::Inhibited { until };
            log::warn!(
                "LOCKOUT TRIGGERED after {} attempts in {}s - blocked until {}",
                recent,
                ATTEMPT_WINDOW_SECONDS,
                until
            );
            Some(until)
        } else {
            None
        }
    }

    /// Drop an elapsed inhibition. Returns true if one was released.
    pub fn release_if_elapsed(&mut self, now: Timestamp) -> bool {
        match self.state {
            Inhibition::Inhibited { until } if until <= now => {
                self.state = Inhibition::Clear;
                log::info!("Lockout expired at {}", until);
                true
            }
            _ => false,
        }
    }
}

/// Attempts of any kind in the trailing window ending at `now`
pub fn count_in_window(attempts: &VecDeque<AccessAttempt>, now: Timestamp) -> usize {
    let window_start = now - chrono::Duration::seconds(ATTEMPT_WINDOW_SECONDS);
    attempts
        .iter()
        .filter(|a| a.timestamp >= window_start && a.timestamp <= now)
        .count()
}

/// Attempts logged at or after `since`, oldest first
pub fn attempts_since(attempts: &VecDeque<AccessAttempt>, since: Timestamp) -> Vec<AccessAttempt> {
    attempts
        .iter()
        .filter(|a| a.timestamp >= since)
        .cloned()
        .collect()
}
