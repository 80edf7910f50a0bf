//! Deactivation gesture recognition
//!
//! The recognizer only keeps buffers and classifies input. It does not know
//! whether the controller is active or which method is configured; the
//! controller decides which entry points to call and what an outcome means.

use crate::constants::{
    PATTERN_TOLERANCE_RATIO, SUSPICIOUS_PATTERN_FACTOR, SWIPE_THRESHOLD_PX, TAP_WINDOW_MS,
    TRIPLE_TAP_COUNT,
};
use crate::model::{add_millis, AttemptKind, PatternPoint, Timestamp};
use crate::platform::ScreenSize;

/// Result of feeding one input into the recognizer
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// The configured gesture is complete
    Matched,
    /// More input is needed
    Pending,
    /// A complete attempt that did not match
    Rejected { kind: AttemptKind, details: String },
    /// Input that looks like tampering; `matched` tells whether the same input
    /// also completed the gesture
    Tamper { details: String, matched: bool },
    /// Input that means nothing for the current configuration
    Ignored,
}

#[derive(Debug, Default)]
pub struct GestureRecognizer {
    taps: Vec<Timestamp>,
    tap_history: Vec<Timestamp>,
    pattern: Vec<PatternPoint>,
}

impl GestureRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tap
    ///
    /// `count_for_unlock` is false when taps are not the configured gesture;
    /// the tap still counts toward tamper detection.
    pub fn register_tap(
        &mut self,
        now: Timestamp,
        count_for_unlock: bool,
        tamper_threshold: u32,
    ) -> GestureOutcome {
        // Taps exactly TAP_WINDOW_MS old are still inside the window
        let window_start = add_millis(now, -TAP_WINDOW_MS);

        self.tap_history.retain(|&t| t >= window_start);
        self.tap_history.push(now);
        let tamper = if self.tap_history.len() >= tamper_threshold as usize {
            let details = format!(
                "{} taps within {}ms",
                self.tap_history.len(),
                TAP_WINDOW_MS
            );
            self.tap_history.clear();
            Some(details)
        } else {
            None
        };

        let matched = if count_for_unlock {
            self.taps.retain(|&t| t >= window_start);
            self.taps.push(now);
            if self.taps.len() >= TRIPLE_TAP_COUNT {
                self.taps.clear();
                true
            } else {
                false
            }
        } else {
            false
        };

        match (tamper, matched) {
            (Some(details), matched) => GestureOutcome::Tamper { details, matched },
            (None, true) => GestureOutcome::Matched,
            (None, false) if count_for_unlock => GestureOutcome::Pending,
            (None, false) => GestureOutcome::Ignored,
        }
    }

    /// Taps currently counting toward the triple tap
    pub fn pending_taps(&self) -> usize {
        self.taps.len()
    }

    pub fn clear_taps(&mut self) {
        self.taps.clear();
    }

    /// Register one pattern sample and compare once the sample count matches
    pub fn register_pattern_point(
        &mut self,
        point: PatternPoint,
        expected: &[PatternPoint],
        screen: ScreenSize,
    ) -> GestureOutcome {
        if expected.is_empty() {
            return GestureOutcome::Ignored;
        }

        self.pattern.push(point);
        if self.pattern.len() < expected.len() {
            return GestureOutcome::Pending;
        }

        let samples = std::mem::take(&mut self.pattern);
        compare_pattern(&samples, expected, screen)
    }

    pub fn pending_pattern_points(&self) -> usize {
        self.pattern.len()
    }

    pub fn clear_pattern(&mut self) {
        self.pattern.clear();
    }

    pub fn clear(&mut self) {
        self.taps.clear();
        self.tap_history.clear();
        self.pattern.clear();
    }
}

/// Swipe up: mostly vertical, upward, longer than the threshold
pub fn is_swipe_up(dx: f64, dy: f64) -> bool {
    dy < -SWIPE_THRESHOLD_PX && dx.abs() < SWIPE_THRESHOLD_PX
}

fn compare_pattern(
    samples: &[PatternPoint],
    expected: &[PatternPoint],
    screen: ScreenSize,
) -> GestureOutcome {
    let tol_x = screen.width * PATTERN_TOLERANCE_RATIO;
    let tol_y = screen.height * PATTERN_TOLERANCE_RATIO;

    let misses: Vec<usize> = samples
        .iter()
        .zip(expected)
        .enumerate()
        .filter(|(_, (s, e))| (s.x - e.x).abs() > tol_x || (s.y - e.y).abs() > tol_y)
        .map(|(i, _)| i)
        .collect();

    if misses.is_empty() {
        return GestureOutcome::Matched;
    }

    let wild = samples.iter().zip(expected).all(|(s, e)| {
        (s.x - e.x).abs() > tol_x * SUSPICIOUS_PATTERN_FACTOR
            || (s.y - e.y).abs() > tol_y * SUSPICIOUS_PATTERN_FACTOR
    });

    if wild {
        GestureOutcome::Rejected {
            kind: AttemptKind::SuspiciousPattern,
            details: format!(
                "all {} pattern points far outside tolerance",
                samples.len()
            ),
        }
    } else {
        GestureOutcome::Rejected {
            kind: AttemptKind::FailedUnlock,
            details: format!(
                "pattern mismatch at point(s) {:?} of {}",
                misses,
                samples.len()
            ),
        }
    }
}
