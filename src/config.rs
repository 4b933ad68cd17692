//! Configuration management for Livemath
//!
//! Handles loading and validating the math pipeline configuration.
//! Configuration is stored as JSON in the user's config directory.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier following reverse-DNS convention
pub const APP_ID: &str = "com.livemath.Editor";

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Milliseconds to wait after a document change before rebuilding
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Extra characters scanned beyond the visible viewport edges
pub const DEFAULT_VIEWPORT_BUFFER: usize = 500;

/// Maximum number of rendered graphics kept in the cache
pub const DEFAULT_MAX_CACHE_SIZE: usize = 500;

/// Maximum number of remembered typesetting failures
pub const DEFAULT_MAX_ERROR_ENTRIES: usize = 4096;

/// Readiness probe attempts before the engine is declared dead
pub const DEFAULT_READY_ATTEMPTS: u32 = 20;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Math rendering pipeline configuration
    pub math: MathConfig,

    /// Typesetting engine configuration
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from the user config directory or return defaults
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_file()?;
        if !path.exists() {
            log::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from an explicit JSON file
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;
        let config: Config =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.math.max_cache_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "math.max_cache_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.math.max_error_entries == 0 {
            return Err(ConfigError::InvalidValue {
                key: "math.max_error_entries".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.engine.ready_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "engine.ready_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.engine.ready_backoff_max_ms < self.engine.ready_backoff_ms {
            return Err(ConfigError::InvalidValue {
                key: "engine.ready_backoff_max_ms".to_string(),
                reason: "must not be smaller than engine.ready_backoff_ms".to_string(),
            });
        }
        Ok(())
    }

    /// Get the configuration directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Get the configuration file path
    pub fn config_file() -> ConfigResult<PathBuf> {
        Self::config_dir().map(|p| p.join(CONFIG_FILE_NAME))
    }
}

/// Math rendering pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MathConfig {
    /// Quiet period after a document change before rebuilding
    pub debounce_ms: u64,

    /// Characters scanned on each side of every visible range
    pub viewport_buffer: usize,

    /// Upper bound on cached graphics
    pub max_cache_size: usize,

    /// Upper bound on remembered render failures
    pub max_error_entries: usize,
}

impl Default for MathConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            viewport_buffer: DEFAULT_VIEWPORT_BUFFER,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            max_error_entries: DEFAULT_MAX_ERROR_ENTRIES,
        }
    }
}

impl MathConfig {
    /// Debounce delay as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Typesetting engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Readiness probe attempts before giving up
    pub ready_attempts: u32,

    /// Delay before the second probe; doubles after every failure
    pub ready_backoff_ms: u64,

    /// Upper bound for the probe delay
    pub ready_backoff_max_ms: u64,

    /// Longest a single formula may take to typeset
    pub render_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ready_attempts: DEFAULT_READY_ATTEMPTS,
            ready_backoff_ms: 50,
            ready_backoff_max_ms: 1000,
            render_timeout_ms: 10_000,
        }
    }
}

impl EngineConfig {
    /// Per-formula time limit
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Delay to wait after the given failed attempt (0-indexed)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let ms = self
            .ready_backoff_ms
            .saturating_mul(factor)
            .min(self.ready_backoff_max_ms);
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.math.debounce_ms, 200);
        assert_eq!(config.math.viewport_buffer, 500);
        assert_eq!(config.math.max_cache_size, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"math": {"debounce_ms": 50}}"#).unwrap();
        assert_eq!(config.math.debounce_ms, 50);
        assert_eq!(config.math.max_cache_size, DEFAULT_MAX_CACHE_SIZE);
        assert_eq!(config.engine.ready_attempts, DEFAULT_READY_ATTEMPTS);
    }

    #[test]
    fn test_zero_cache_is_rejected() {
        let mut config = Config::default();
        config.math.max_cache_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let engine = EngineConfig::default();
        assert_eq!(engine.backoff(0), Duration::from_millis(50));
        assert_eq!(engine.backoff(1), Duration::from_millis(100));
        assert_eq!(engine.backoff(10), Duration::from_millis(1000));
        assert_eq!(engine.backoff(200), Duration::from_millis(1000));
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = Config::load_from("/nonexistent/livemath/config.json");
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
