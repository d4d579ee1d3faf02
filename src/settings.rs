// src/settings.rs
//
// Monitor configuration: TOML on disk, serde defaults for every field so a
// partial (or absent) file still yields a working setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::{BaudRate, IoError};

/// Which adapter driver to run the monitor against.
pub const DRIVER_SOCKETCAN: &str = "socketcan";
pub const DRIVER_SIM: &str = "sim";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Driver kind: "socketcan" or "sim"
    #[serde(default = "default_driver")]
    pub driver: String,
    /// SocketCAN interface name (ignored by the simulated driver)
    #[serde(default = "default_interface")]
    pub interface: String,
    /// Baud-rate table index (0-13); out-of-range values clamp
    #[serde(default = "default_baud_index")]
    pub baud_index: u8,
    /// Monitor tick interval in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Directory for log files; None disables file logging
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_driver() -> String {
    DRIVER_SOCKETCAN.to_string()
}
fn default_interface() -> String {
    "can0".to_string()
}
fn default_baud_index() -> u8 {
    3 // 250 kBit/s
}
fn default_tick_interval_ms() -> u64 {
    10
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            interface: default_interface(),
            baud_index: default_baud_index(),
            tick_interval_ms: default_tick_interval_ms(),
            log_dir: None,
        }
    }
}

impl MonitorSettings {
    /// Configured bit rate (clamped table lookup).
    pub fn baud_rate(&self) -> BaudRate {
        BaudRate::from_index(self.baud_index)
    }

    /// Monitor tick interval.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<MonitorSettings, IoError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        IoError::configuration(format!("read {}: {}", path.display(), e))
    })?;
    toml::from_str(&raw)
        .map_err(|e| IoError::configuration(format!("parse {}: {}", path.display(), e)))
}

// ============================================================================
// Tests
// ============================================================================
