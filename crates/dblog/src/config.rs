// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DbLog configuration.
//!
//! Supports both programmatic (builder) and TOML file configuration.

use crate::format::SUPPORTED_STYLES;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("format style {style} not supported (only {supported})", supported = SUPPORTED_STYLES.join(", "))]
    UnsupportedStyle { style: String },

    #[error("unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// DbLog configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbLogConfig {
    /// Backend driver name (e.g. "sqlite").
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Connection parameters as `key:value` pairs.
    ///
    /// A single string is accepted in place of a list.
    #[serde(default, deserialize_with = "one_or_many")]
    pub connect: Vec<String>,

    /// Flush interval in seconds.
    #[serde(default = "default_cycle")]
    pub cycle_secs: u64,
}

fn default_backend() -> String {
    "sqlite".to_string()
}

fn default_cycle() -> u64 {
    10
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(arg) => vec![arg],
        OneOrMany::Many(args) => args,
    })
}

impl Default for DbLogConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            connect: Vec::new(),
            cycle_secs: default_cycle(),
        }
    }
}

impl DbLogConfig {
    /// Create a new config builder
    pub fn builder() -> DbLogConfigBuilder {
        DbLogConfigBuilder::default()
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: DbLogConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_secs == 0 {
            return Err(ConfigError::Invalid(
                "cycle_secs must be a positive number of seconds".to_string(),
            ));
        }
        if self.backend.trim().is_empty() {
            return Err(ConfigError::Invalid("backend must not be empty".to_string()));
        }
        Ok(())
    }

    /// Flush interval.
    pub fn cycle(&self) -> Duration {
        Duration::from_secs(self.cycle_secs)
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct DbLogConfigBuilder {
    backend: Option<String>,
    connect: Vec<String>,
    cycle_secs: Option<u64>,
}

impl DbLogConfigBuilder {
    /// Set the backend driver name
    pub fn backend(mut self, name: impl Into<String>) -> Self {
        self.backend = Some(name.into());
        self
    }

    /// Add one `key:value` connection parameter
    pub fn connect(mut self, arg: impl Into<String>) -> Self {
        self.connect.push(arg.into());
        self
    }

    /// Set the flush interval in seconds
    pub fn cycle_secs(mut self, secs: u64) -> Self {
        self.cycle_secs = Some(secs);
        self
    }

    /// Build the configuration
    pub fn build(self) -> DbLogConfig {
        let defaults = DbLogConfig::default();

        DbLogConfig {
            backend: self.backend.unwrap_or(defaults.backend),
            connect: self.connect,
            cycle_secs: self.cycle_secs.unwrap_or(defaults.cycle_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DbLogConfig::default();

        assert_eq!(config.backend, "sqlite");
        assert!(config.connect.is_empty());
        assert_eq!(config.cycle_secs, 10);
        assert_eq!(config.cycle(), Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder() {
        let config = DbLogConfig::builder()
            .backend("sqlite3")
            .connect("database:/var/lib/smarthome/log.db")
            .connect("timeout:5")
            .cycle_secs(30)
            .build();

        assert_eq!(config.backend, "sqlite3");
        assert_eq!(
            config.connect,
            vec!["database:/var/lib/smarthome/log.db", "timeout:5"]
        );
        assert_eq!(config.cycle_secs, 30);
    }

    #[test]
    fn test_config_from_toml() {
        let config = DbLogConfig::from_toml(
            r#"
backend = "sqlite"
connect = ["database:log.db", "timeout:2.5"]
cycle_secs = 5
"#,
        )
        .unwrap();

        assert_eq!(config.connect.len(), 2);
        assert_eq!(config.cycle_secs, 5);
    }

    #[test]
    fn test_config_single_connect_string() {
        let config = DbLogConfig::from_toml(r#"connect = "database:log.db""#).unwrap();

        assert_eq!(config.backend, "sqlite");
        assert_eq!(config.connect, vec!["database:log.db"]);
        assert_eq!(config.cycle_secs, 10);
    }

    #[test]
    fn test_config_rejects_zero_cycle() {
        let err = DbLogConfig::from_toml("cycle_secs = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_config_rejects_malformed_toml() {
        let err = DbLogConfig::from_toml("cycle_secs = [").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }
}
