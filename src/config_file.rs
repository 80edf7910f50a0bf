//! Persistence of the configuration record
//!
//! The whole [`StealthConfig`] (settings, schedules and attempt log) is
//! written as one JSON document under a fixed key on every change. Loading
//! never fails startup: a missing or unreadable record falls back to defaults.

use crate::constants::{CONFIG_FILE_PERMISSIONS, CONFIG_PERMISSION_MASK_GROUP_OTHER, STORAGE_KEY};
use crate::model::StealthConfig;
use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Storage for the single configuration record
pub trait ConfigStore {
    /// Load the stored record, `Ok(None)` if nothing was stored yet
    fn load(&self) -> Result<Option<StealthConfig>>;

    /// Replace the stored record
    fn save(&mut self, config: &StealthConfig) -> Result<()>;
}

impl<T: ConfigStore + ?Sized> ConfigStore for Box<T> {
    fn load(&self) -> Result<Option<StealthConfig>> {
        (**self).load()
    }

    fn save(&mut self, config: &StealthConfig) -> Result<()> {
        (**self).save(config)
    }
}

/// Load the record or fall back to defaults
///
/// Missing records are normal on first run. Corrupt or unreadable records are
/// logged and replaced by defaults on the next save.
pub fn load_or_default(store: &dyn ConfigStore) -> StealthConfig {
    match store.load() {
        Ok(Some(mut config)) => {
            config.sanitize();
            config
        }
        Ok(None) => {
            log::info!("No stored configuration - using defaults");
            StealthConfig::default()
        }
        Err(e) => {
            log::warn!("Failed to load configuration ({:#}) - using defaults", e);
            StealthConfig::default()
        }
    }
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store the record as `<key>.json` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(format!("{}.json", STORAGE_KEY)))
    }

    /// Get the standard record path
    ///
    /// - macOS: `~/Library/Application Support/stealthscreen/blank_screen_stealth_config.json`
    /// - Linux: `~/.config/stealthscreen/blank_screen_stealth_config.json`
    /// - Windows: `%APPDATA%\stealthscreen\blank_screen_stealth_config.json`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Failed to determine config directory"))?
            .join("stealthscreen");
        Ok(config_dir.join(format!("{}.json", STORAGE_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> Result<Option<StealthConfig>> {
        if !self.path.exists() {
            return Ok(None);
        }

        // Check file permissions (warning if too permissive)
        #[cfg(unix)]
        {
            let metadata =
                fs::metadata(&self.path).context("Failed to read config file metadata")?;
            let mode = metadata.permissions().mode();
            if mode & CONFIG_PERMISSION_MASK_GROUP_OTHER != 0 {
                log::warn!(
                    "Config file has permissive permissions: {:o}. Should be {:o} (user read/write only).",
                    mode & 0o777,
                    CONFIG_FILE_PERMISSIONS
                );
            }
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read config file: {}", self.path.display()))?;
        let config: StealthConfig =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(Some(config))
    }

    fn save(&mut self, config: &StealthConfig) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

        // Replace the whole record
        fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write config file: {}", self.path.display()))?;

        // Owner read/write only
        #[cfg(unix)]
        {
            let mut permissions = fs::metadata(&self.path)?.permissions();
            permissions.set_mode(CONFIG_FILE_PERMISSIONS);
            fs::set_permissions(&self.path, permissions)
                .context("Failed to set config file permissions")?;
        }

        log::debug!("Configuration saved to: {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    records: HashMap<String, String>,
    fail_writes: bool,
    writes: usize,
}

/// In-process key/value store holding serialized records
///
/// Clones share the same storage, so a test can inspect what the controller
/// wrote or make the next writes fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent saves fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Number of successful saves
    pub fn writes(&self) -> usize {
        self.inner.lock().writes
    }

    /// Raw serialized record, if any
    pub fn raw(&self) -> Option<String> {
        self.inner.lock().records.get(STORAGE_KEY).cloned()
    }

    /// Overwrite the raw serialized record
    pub fn put_raw(&self, contents: impl Into<String>) {
        self.inner
            .lock()
            .records
            .insert(STORAGE_KEY.to_string(), contents.into());
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<Option<StealthConfig>> {
        let inner = self.inner.lock();
        match inner.records.get(STORAGE_KEY) {
            Some(contents) => Ok(Some(
                serde_json::from_str(contents).context("Failed to parse stored record")?,
            )),
            None => Ok(None),
        }
    }

    fn save(&mut self, config: &StealthConfig) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.fail_writes {
            anyhow::bail!("storage unavailable");
        }
        let contents = serde_json::to_string(config).context("Failed to serialize config")?;
        inner.records.insert(STORAGE_KEY.to_string(), contents);
        inner.writes += 1;
        Ok(())
    }
}
