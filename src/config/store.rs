//! Settings persistence.
//!
//! The runtime only sees the [`SettingsStore`] trait. [`FileSettingsStore`]
//! keeps `config.toml` and `lighting_overrides.json` in one directory;
//! [`MemorySettingsStore`] backs tests and throwaway runs.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::overrides::LightingOverrides;
use super::path::{CONFIG_FILE, OVERRIDES_FILE};
use super::settings::AppConfig;
use crate::error::{Result, ResultExt};

/// Key-value source for overrides and application settings.
pub trait SettingsStore: Send + Sync {
    /// Stored overrides, `Ok(None)` if none were ever saved.
    fn load_overrides(&self) -> Result<Option<LightingOverrides>>;

    fn save_overrides(&self, overrides: &LightingOverrides) -> Result<()>;

    /// Stored settings, defaults if none were ever saved.
    fn load_config(&self) -> Result<AppConfig>;

    fn save_config(&self, config: &AppConfig) -> Result<()>;
}

/// Load overrides, falling back to built-in defaults when absent or malformed.
pub fn load_overrides_or_defaults(store: &dyn SettingsStore) -> LightingOverrides {
    match store.load_overrides() {
        Ok(Some(overrides)) => overrides,
        Ok(None) => {
            info!("No lighting overrides saved, using defaults");
            LightingOverrides::default()
        }
        Err(e) => {
            warn!(error = %e, "Lighting overrides unusable, using defaults");
            LightingOverrides::default()
        }
    }
}

/// Load settings, falling back to defaults when malformed.
pub fn load_config_or_defaults(store: &dyn SettingsStore) -> AppConfig {
    store.load_config().unwrap_or_else(|e| {
        warn!(error = %e, "Settings unusable, using defaults");
        AppConfig::default()
    })
}

/// Settings stored as files in a config directory.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    dir: PathBuf,
}

impl FileSettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn overrides_path(&self) -> PathBuf {
        self.dir.join(OVERRIDES_FILE)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(path = %path.display(), "Wrote settings file");
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn load_overrides(&self) -> Result<Option<LightingOverrides>> {
        let path = self.overrides_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let overrides = LightingOverrides::from_json(&text)?;
        info!(path = %path.display(), "Loaded lighting overrides");
        Ok(Some(overrides))
    }

    fn save_overrides(&self, overrides: &LightingOverrides) -> Result<()> {
        self.write(&self.overrides_path(), &overrides.to_json_pretty()?)
    }

    fn load_config(&self) -> Result<AppConfig> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        AppConfig::from_toml(&text)
    }

    fn save_config(&self, config: &AppConfig) -> Result<()> {
        self.write(&self.config_path(), &config.to_toml()?)
    }
}

/// In-memory settings.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    overrides: Mutex<Option<LightingOverrides>>,
    config: Mutex<AppConfig>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: LightingOverrides) -> Self {
        Self {
            overrides: Mutex::new(Some(overrides)),
            config: Mutex::default(),
        }
    }

    pub fn with_config(self, config: AppConfig) -> Self {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = config;
        self
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_overrides(&self) -> Result<Option<LightingOverrides>> {
        Ok(self
            .overrides
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_overrides(&self, overrides: &LightingOverrides) -> Result<()> {
        *self.overrides.lock().unwrap_or_else(PoisonError::into_inner) = Some(overrides.clone());
        Ok(())
    }

    fn load_config(&self) -> Result<AppConfig> {
        Ok(self.config.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save_config(&self, config: &AppConfig) -> Result<()> {
        *self.config.lock().unwrap_or_else(PoisonError::into_inner) = config.clone();
        Ok(())
    }
}
