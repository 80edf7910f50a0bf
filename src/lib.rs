// Library interface for stealthscreen
// The controller is host-agnostic: the binary and the tests supply the clock,
// the configuration store and the platform display capability.

pub mod clock;
pub mod config;
pub mod config_file;
pub mod constants;
pub mod controller;
pub mod error;
pub mod gesture;
pub mod lockout;
pub mod model;
pub mod platform;
pub mod runtime;
pub mod schedule;

pub use clock::{ClockSource, ManualClock, SystemClock, TimerHandle, TimerQueue, TimerToken};
pub use config_file::{ConfigStore, JsonFileStore, MemoryStore};
pub use controller::{ActivationController, ControllerState};
pub use error::{ActivationError, ConfigError, Transition};
pub use gesture::GestureOutcome;
pub use model::{
    AccessAttempt, ActivationMethod, AttemptKind, GestureSequence, PatternPoint, Repeat,
    ScheduledActivation, StealthConfig, Timestamp,
};
pub use platform::{LogPlatform, Platform, ScreenSize};
