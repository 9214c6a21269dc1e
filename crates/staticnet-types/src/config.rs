//! Runtime configuration with sensible defaults.
//!
//! All operational parameters of the naming and event layers are
//! centralized here. Every value has a documented default and can be
//! overridden from a JSON file via [`StaticNetConfig::load`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifetime::parse_lifetime;
use crate::{Result, StaticNetError};

/// Default validity window of a freshly bound pointer.
pub const DEFAULT_LIFETIME: &str = "1h";

/// Default deadline for boot-node listing, in milliseconds.
pub const DEFAULT_BOOT_LIST_TIMEOUT_MS: u64 = 1000;

/// Default maximum size of an encoded event frame (64 KiB).
pub const DEFAULT_MAX_EVENT_SIZE: usize = 65_536;

/// Default storage-scheme prefix of content locators.
pub const DEFAULT_STORAGE_SCHEME: &str = "/ipfs/";

/// Global staticnet configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticNetConfig {
    /// Validity window applied by `bind` when the caller passes none.
    ///
    /// Written as a lifetime string (`"1h"`, `"30 days"`).
    pub default_lifetime: String,

    /// Deadline for the boot-node listing call, in milliseconds.
    pub boot_list_timeout_ms: u64,

    /// Maximum size of an encoded event frame, in bytes.
    pub max_event_size: usize,

    /// Prefix prepended to content ids when they are bound and stripped
    /// again on resolution.
    pub storage_scheme: String,
}

impl Default for StaticNetConfig {
    fn default() -> Self {
        Self {
            default_lifetime: DEFAULT_LIFETIME.into(),
            boot_list_timeout_ms: DEFAULT_BOOT_LIST_TIMEOUT_MS,
            max_event_size: DEFAULT_MAX_EVENT_SIZE,
            storage_scheme: DEFAULT_STORAGE_SCHEME.into(),
        }
    }
}

impl StaticNetConfig {
    /// Loads a configuration from a JSON file and validates it.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// - [`StaticNetError::StorageError`] if the file cannot be read.
    /// - [`StaticNetError::ConfigError`] if the JSON is malformed or a
    ///   value fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| StaticNetError::StorageError {
            reason: format!("failed to read config '{}': {e}", path.display()),
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|e| StaticNetError::ConfigError {
            reason: format!("failed to parse config '{}': {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.default_lifetime()?.is_zero() {
            return Err(StaticNetError::ConfigError {
                reason: "default_lifetime must be greater than 0".into(),
            });
        }

        if self.boot_list_timeout_ms == 0 {
            return Err(StaticNetError::ConfigError {
                reason: "boot_list_timeout_ms must be greater than 0".into(),
            });
        }

        if self.max_event_size == 0 {
            return Err(StaticNetError::ConfigError {
                reason: "max_event_size must be greater than 0".into(),
            });
        }

        if !self.storage_scheme.starts_with('/') || !self.storage_scheme.ends_with('/') {
            return Err(StaticNetError::ConfigError {
                reason: format!(
                    "storage_scheme must look like '/name/', got '{}'",
                    self.storage_scheme
                ),
            });
        }

        Ok(())
    }

    /// Returns the parsed default pointer lifetime.
    pub fn default_lifetime(&self) -> Result<Duration> {
        parse_lifetime(&self.default_lifetime)
    }

    /// Returns the boot-node listing deadline.
    pub fn boot_list_timeout(&self) -> Duration {
        Duration::from_millis(self.boot_list_timeout_ms)
    }
}
