//! Centralized constants for the stealth controller
//!
//! This module contains all configurable numerical values used throughout
//! the crate. Each constant includes documentation on its purpose,
//! unit, and recommended value range.

// ============================================================================
// LONG-PRESS CONFIGURATION
// ============================================================================

/// Minimum long-press hold required to deactivate.
/// Unit: seconds
/// Range: Fixed minimum, shorter holds fire on accidental contact
pub const LONG_PRESS_MIN_SECONDS: u64 = 1;

/// Maximum long-press hold allowed.
/// Unit: seconds
/// Range: Fixed maximum, do not change without updating CLI validation
pub const LONG_PRESS_MAX_SECONDS: u64 = 10;

/// Default long-press hold when no config exists.
/// Unit: seconds
pub const LONG_PRESS_DEFAULT_SECONDS: u64 = 3;

// ============================================================================
// GESTURE RECOGNITION
// ============================================================================

/// Rolling window for tap sequences.
/// Unit: milliseconds
pub const TAP_WINDOW_MS: i64 = 2000;

/// Number of taps inside the window that deactivates (triple tap).
pub const TRIPLE_TAP_COUNT: usize = 3;

/// Default number of taps inside the window treated as tampering.
/// Range: must stay above TRIPLE_TAP_COUNT
pub const REPEATED_TOUCH_DEFAULT_THRESHOLD: u32 = 6;

/// Swipe displacement threshold.
/// Unit: pixels
pub const SWIPE_THRESHOLD_PX: f64 = 50.0;

/// Per-axis tolerance for custom pattern points, relative to screen size.
/// Unit: fraction of the screen dimension on that axis
pub const PATTERN_TOLERANCE_RATIO: f64 = 0.10;

/// Samples missing by more than this multiple of the tolerance on every point
/// are logged as a suspicious pattern instead of a failed unlock.
pub const SUSPICIOUS_PATTERN_FACTOR: f64 = 3.0;

/// Pattern buffer reset after inactivity.
/// Unit: milliseconds
pub const PATTERN_TIMEOUT_MS: i64 = 3000;

// ============================================================================
// LOCKOUT GUARD
// ============================================================================

/// Trailing window in which attempts are counted.
/// Unit: seconds
pub const ATTEMPT_WINDOW_SECONDS: i64 = 60;

/// Maximum number of attempts retained in the persisted log.
pub const ATTEMPT_LOG_CAPACITY: usize = 100;

/// Default attempts within the window before lockout.
pub const MAX_ACCESS_ATTEMPTS_DEFAULT: u32 = 5;

/// Default lockout duration.
/// Unit: seconds
/// Recommended range: 60-1800
pub const LOCKOUT_DEFAULT_SECONDS: u64 = 300;

// ============================================================================
// ACTIVATION FEEDBACK
// ============================================================================

/// Vibration pattern played on activation (alternating wait/vibrate).
/// Unit: milliseconds
pub const ACTIVATION_VIBRATION_PATTERN_MS: [u64; 4] = [0, 100, 50, 100];

// ============================================================================
// RUNTIME
// ============================================================================

/// Upper bound on how long the event loop sleeps between timer checks.
/// Unit: milliseconds
/// Recommended range: 100-1000 (lower = more responsive, higher = less CPU)
pub const EVENT_LOOP_MAX_SLEEP_MS: u64 = 500;

// ============================================================================
// PERSISTENCE
// ============================================================================

/// Fixed key the configuration record is stored under.
pub const STORAGE_KEY: &str = "blank_screen_stealth_config";

/// Config file permissions (user read/write only for security).
/// Unit: Unix permission bits (octal)
pub const CONFIG_FILE_PERMISSIONS: u32 = 0o600;

/// Permission mask to check for group/other access (security check).
/// Unit: Unix permission bits (octal)
pub const CONFIG_PERMISSION_MASK_GROUP_OTHER: u32 = 0o077;
