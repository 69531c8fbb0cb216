use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::sync::RetryPolicy;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trip identifier; the remote document lives at `trips/<trip_id>`
    pub trip_id: String,
    /// Reconnection policy knobs
    pub retry: RetryConfig,
}

/// Reconnection policy configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Consecutive transient errors tolerated before falling back
    pub max_attempts: u32,
    /// Delay before the first reconnection attempt, in milliseconds
    pub base_delay_ms: u64,
    /// Growth factor between consecutive attempts
    pub multiplier: f64,
    /// Ceiling on any single delay, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trip_id: "family-trip".to_string(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            multiplier: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut config = Self::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            config = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;
        }

        // Apply environment variable overrides
        if let Ok(trip_id) = std::env::var("TRIPSYNC_TRIP_ID") {
            config.trip_id = trip_id;
        }
        if let Ok(raw) = std::env::var("TRIPSYNC_MAX_ATTEMPTS") {
            config.retry.max_attempts = raw
                .parse()
                .map_err(|_| ConfigError::EnvError("TRIPSYNC_MAX_ATTEMPTS".to_string(), raw))?;
        }
        if let Ok(raw) = std::env::var("TRIPSYNC_BASE_DELAY_MS") {
            config.retry.base_delay_ms = raw
                .parse()
                .map_err(|_| ConfigError::EnvError("TRIPSYNC_BASE_DELAY_MS".to_string(), raw))?;
        }

        Ok(config)
    }

    /// Default config file path: ~/.config/tripsync/config.yaml
    pub fn default_config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".config")
            .join("tripsync")
            .join("config.yaml")
    }

    /// Path of the remote trip document.
    pub fn document_path(&self) -> String {
        format!("trips/{}", self.trip_id)
    }
}

impl RetryConfig {
    /// Converts to a policy, clamping values that would disable reconnection.
    pub fn to_policy(&self) -> RetryPolicy {
        let base_delay_ms = self.base_delay_ms.max(1);
        RetryPolicy {
            base_delay: Duration::from_millis(base_delay_ms),
            multiplier: if self.multiplier < 1.0 {
                1.0
            } else {
                self.multiplier
            },
            max_delay: Duration::from_millis(self.max_delay_ms.max(base_delay_ms)),
            max_attempts: self.max_attempts.max(1),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    EnvError(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::EnvError(var, value) => {
                write!(f, "Invalid value '{}' for {}", value, var)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
