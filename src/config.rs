//! Environment overrides for stealthscreen
//!
//! The persisted record (see config_file module) is the primary configuration
//! source. These environment variables can optionally override parts of it at
//! startup:
//! - STEALTHSCREEN_CONFIG: Path of the configuration record
//! - STEALTHSCREEN_LONG_PRESS: Long-press hold in seconds (1-10)

use crate::constants::{LONG_PRESS_MAX_SECONDS, LONG_PRESS_MIN_SECONDS};
use log::{debug, info, warn};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_PATH_VAR: &str = "STEALTHSCREEN_CONFIG";
pub const LONG_PRESS_VAR: &str = "STEALTHSCREEN_LONG_PRESS";

/// Parse the STEALTHSCREEN_LONG_PRESS environment variable
///
/// Returns Some(duration) if a valid hold (1-10 seconds) is configured.
/// Returns None if not set or invalid.
pub fn parse_long_press_override() -> Option<Duration> {
    match env::var(LONG_PRESS_VAR) {
        Ok(val) => parse_long_press_value(&val),
        Err(_) => {
            debug!("{} not set.", LONG_PRESS_VAR);
            None
        }
    }
}

/// Validate a long-press hold given in whole seconds
pub fn parse_long_press_value(val: &str) -> Option<Duration> {
    match val.trim().parse::<u64>() {
        Ok(seconds) if (LONG_PRESS_MIN_SECONDS..=LONG_PRESS_MAX_SECONDS).contains(&seconds) => {
            info!(
                "Long-press duration set via environment variable: {} seconds",
                seconds
            );
            Some(Duration::from_secs(seconds))
        }
        Ok(seconds) => {
            warn!(
                "Invalid long-press duration: {} (must be {}-{} seconds). Using stored value.",
                seconds, LONG_PRESS_MIN_SECONDS, LONG_PRESS_MAX_SECONDS
            );
            None
        }
        Err(e) => {
            warn!(
                "Failed to parse {}: {}. Using stored value.",
                LONG_PRESS_VAR, e
            );
            None
        }
    }
}

/// Parse the STEALTHSCREEN_CONFIG environment variable
///
/// Returns the record path if set to a non-empty value.
pub fn parse_config_path_override() -> Option<PathBuf> {
    match env::var_os(CONFIG_PATH_VAR) {
        Some(val) if !val.is_empty() => {
            let path = PathBuf::from(val);
            info!("Config path set via environment variable: {}", path.display());
            Some(path)
        }
        Some(_) => {
            warn!("{} is empty. Using default location.", CONFIG_PATH_VAR);
            None
        }
        None => {
            debug!("{} not set.", CONFIG_PATH_VAR);
            None
        }
    }
}
