//! focus-arbiter runtime configuration
//!
//! Built from the shared TOML bootstrap config. Settings sources priority:
//! 1. Command-line arguments
//! 2. Environment variables (RUST_LOG, FOCUS_CONFIG)
//! 3. TOML configuration file
//! 4. Built-in defaults

use crate::error::Result;
use focus_common::config::TomlConfig;
use std::path::Path;
use std::time::Duration;

/// Arbiter configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ArbiterConfig {
    /// How long `flush` waits for a context to drain
    pub flush_timeout: Duration,

    /// Event bus capacity
    pub event_capacity: usize,

    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

impl ArbiterConfig {
    pub fn from_toml(toml: &TomlConfig) -> Self {
        Self {
            flush_timeout: Duration::from_millis(toml.dispatcher.flush_timeout_ms),
            event_capacity: toml.events.capacity,
            log_level: toml.logging.level.clone(),
        }
    }

    /// Resolve, load and apply overrides
    pub fn load(config_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml = TomlConfig::load_or_default(config_path)?;
        let mut config = Self::from_toml(&toml);

        if let Some(level) = overrides.log_level {
            config.log_level = level;
        }
        if let Some(ms) = overrides.flush_timeout_ms {
            config.flush_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub flush_timeout_ms: Option<u64>,
}
