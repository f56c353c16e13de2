//! Configuration via `keyrecord.toml`
//!
//! A small file controls how keys are laid out and how long blocking
//! queue reads wait. Every field has a default, so an empty file is valid.

use crate::error::{Error, Result};
use crate::key::{validate_segment, Keyspace};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "keyrecord.toml";

/// Configuration loaded from `keyrecord.toml`.
///
/// # Example
///
/// ```toml
/// # Prefix applied to every key, e.g. "prod" -> "prod:check::ids"
/// namespace = "prod"
///
/// # How long a blocking queue read waits for an item
/// pop_timeout_ms = 1000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyrecordConfig {
    /// Optional key namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Default wait for blocking queue reads, in milliseconds.
    #[serde(default = "default_pop_timeout_ms")]
    pub pop_timeout_ms: u64,
}

fn default_pop_timeout_ms() -> u64 {
    1000
}

impl Default for KeyrecordConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            pop_timeout_ms: default_pop_timeout_ms(),
        }
    }
}

impl KeyrecordConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# keyrecord configuration
#
# Prefix applied to every key (optional). Must not contain ':'.
# namespace = "prod"

# How long a blocking queue read waits for an item, in milliseconds.
pop_timeout_ms = 1000
"#
    }

    /// Parse and validate config text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: KeyrecordConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Reject namespaces that would break the key layout.
    pub fn validate(&self) -> Result<()> {
        if let Some(ns) = &self.namespace {
            if ns.trim().is_empty() {
                return Err(Error::Config("namespace cannot be blank".to_string()));
            }
            validate_segment(ns)
                .map_err(|e| Error::Config(format!("invalid namespace {:?}: {}", ns, e)))?;
        }
        Ok(())
    }

    /// Key builder for this configuration.
    pub fn keyspace(&self) -> Keyspace {
        match &self.namespace {
            Some(ns) => Keyspace::with_namespace(ns.clone()),
            None => Keyspace::new(),
        }
    }

    /// Default blocking read timeout.
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }
}
