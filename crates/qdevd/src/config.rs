//! Daemon configuration.
//!
//! Everything the upstream behavior hard-codes is configuration here: the
//! auto-attach target, the designated source domain, the tracked device
//! classes, the disk-device naming pattern, and the event subscription
//! command. The config object is constructed once and passed in explicitly;
//! there is no ambient global state.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use qdev_core::DeviceClass;

/// Daemon configuration, loaded from TOML.
///
/// Every field has a default, so an absent config file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    /// Destination VM for auto-attached devices.
    pub target_domain: String,

    /// Backend domain whose new devices are eligible for auto-attach.
    pub source_domain: String,

    /// Device classes the daemon tracks.
    pub device_classes: Vec<DeviceClass>,

    /// Pattern a device key must match to count as a whole-disk device.
    pub disk_pattern: String,

    /// Command spawned to subscribe to the platform event bus.
    pub events_command: Vec<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            target_domain: "work".to_string(),
            source_domain: "sys-usb".to_string(),
            device_classes: vec![DeviceClass::Block, DeviceClass::Usb],
            disk_pattern: ".*sd[a-z]$".to_string(),
            events_command: vec!["qubes-events".to_string()],
        }
    }
}

impl DaemonConfig {
    /// Loads configuration from `path`, or from the default location when
    /// `path` is `None`. A missing file yields the defaults; a present but
    /// malformed file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };

        let config = match resolved {
            Some(ref p) if p.exists() => {
                let raw = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.clone(),
                    source,
                })?;
                let config: DaemonConfig = toml::from_str(&raw)?;
                debug!(path = %p.display(), "loaded configuration");
                config
            }
            _ => {
                debug!("no configuration file, using defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/qdevd/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("qdevd").join("config.toml"))
    }

    /// Compiles the disk pattern, anchoring nothing: the pattern author
    /// decides where to anchor (the default is suffix-anchored).
    pub fn compile_disk_pattern(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.disk_pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: self.disk_pattern.clone(),
            source,
        })
    }

    /// Rejects configurations the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_domain.is_empty() {
            return Err(ConfigError::EmptyField("target_domain"));
        }
        if self.source_domain.is_empty() {
            return Err(ConfigError::EmptyField("source_domain"));
        }
        if self.device_classes.is_empty() {
            return Err(ConfigError::EmptyField("device_classes"));
        }
        if self.events_command.is_empty() {
            return Err(ConfigError::EmptyField("events_command"));
        }
        self.compile_disk_pattern()?;
        Ok(())
    }
}

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid disk_pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("config field {0} must not be empty")]
    EmptyField(&'static str),
}
