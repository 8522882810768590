//! Application settings (`config.toml`).
//!
//! Holds everything that is not a lighting override: the HUD capture area
//! and recognizer settings, the poll period, and how to reach the Chroma
//! service.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GlowError, Result};

/// Screen rectangle containing the HUD readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureArea {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureArea {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            width: 400,
            height: 120,
        }
    }
}

/// Everything a sensing source needs to start reading the HUD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub area: CaptureArea,
    /// Recognizer language code.
    pub language: String,
    /// Recognizer model directory, if not the recognizer's own default.
    pub data_path: Option<PathBuf>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            area: CaptureArea::default(),
            language: "eng".to_string(),
            data_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    pub period_ms: u64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self { period_ms: 100 }
    }
}

impl PollerSettings {
    pub const fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// How to reach and identify ourselves to the Chroma REST service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub register_url: String,
    pub timeout_ms: u64,
    pub heartbeat_ms: u64,
    pub title: String,
    pub description: String,
    pub author: String,
    pub contact: String,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            register_url: "http://localhost:54235/razer/chromasdk".to_string(),
            timeout_ms: 2000,
            heartbeat_ms: 2000,
            title: "Glow".to_string(),
            description: "HUD-driven keyboard lighting".to_string(),
            author: "Glow".to_string(),
            contact: "n/a".to_string(),
        }
    }
}

/// Shortest request timeout the HTTP client is given.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_millis(100);

/// Shortest interval between heartbeats.
pub const MIN_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(250);

impl ServiceSettings {
    /// Request timeout, never below [`MIN_REQUEST_TIMEOUT`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms).max(MIN_REQUEST_TIMEOUT)
    }

    /// Heartbeat period, never below [`MIN_HEARTBEAT_INTERVAL`].
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms).max(MIN_HEARTBEAT_INTERVAL)
    }

    fn warn_if_clamped(&self) {
        if Duration::from_millis(self.timeout_ms) < MIN_REQUEST_TIMEOUT {
            warn!(
                timeout_ms = self.timeout_ms,
                used_ms = MIN_REQUEST_TIMEOUT.as_millis() as u64,
                "service.timeout_ms too small, raised"
            );
        }
        if Duration::from_millis(self.heartbeat_ms) < MIN_HEARTBEAT_INTERVAL {
            warn!(
                heartbeat_ms = self.heartbeat_ms,
                used_ms = MIN_HEARTBEAT_INTERVAL.as_millis() as u64,
                "service.heartbeat_ms too small, raised"
            );
        }
    }
}

/// Root of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureSettings,
    pub poller: PollerSettings,
    pub service: ServiceSettings,
}

impl AppConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| GlowError::ConfigParse(format!("Invalid config.toml: {e}")))?;
        config.service.warn_if_clamped();
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| GlowError::Other(format!("Failed to serialize config: {e}")))
    }
}
