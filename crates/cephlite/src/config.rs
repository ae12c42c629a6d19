//! Configuration file handling.
//!
//! A configuration file describes the logging setup, placement defaults and
//! the cluster topology itself (devices, buckets, rules) in TOML.

use std::path::{Path, PathBuf};

use cephlite_crush::{DeviceId, PgId, Rule, Topology, TopologyError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Topology used when no configuration file is given.
const REFERENCE_CONFIG: &str = include_str!("../reference.toml");

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The described topology is inconsistent.
    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the root bucket.
    pub root: Option<String>,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Placement defaults.
    pub placement: PlacementConfig,
    /// Storage devices.
    pub devices: Vec<DeviceConfig>,
    /// Buckets, registered in file order.
    pub buckets: Vec<BucketConfig>,
    /// Placement rules.
    pub rules: Vec<Rule>,
}

impl Config {
    /// Load configuration from `path`, or the built-in reference topology
    /// when no path is given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::reference(),
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// The built-in four-device reference topology.
    ///
    /// # Errors
    ///
    /// Only fails if the embedded file is malformed.
    pub fn reference() -> Result<Self, ConfigError> {
        Self::parse(REFERENCE_CONFIG)
    }

    /// Build and validate the topology this configuration describes.
    ///
    /// Devices are registered first, then buckets in file order (so the
    /// first bucket gets ID `-1`), then the root and the rules.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate names, invalid weights, an unknown
    /// root, dangling or repeated bucket items, or a cycle in the hierarchy.
    pub fn build_topology(&self) -> Result<Topology, ConfigError> {
        let mut builder = Topology::builder();

        for device in &self.devices {
            builder.add_device(device.id, device.weight)?;
        }
        for bucket in &self.buckets {
            builder.add_bucket(
                bucket.name.as_str(),
                bucket.kind.as_str(),
                bucket.algorithm.as_str(),
                bucket.items.iter().map(String::as_str),
            )?;
        }
        if let Some(root) = &self.root {
            builder.set_root(root)?;
        }
        for rule in &self.rules {
            builder.add_rule_value(rule.clone())?;
        }

        let topology = builder.build();
        topology.validate()?;
        Ok(topology)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format.
    #[default]
    Pretty,
    /// JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,
    /// Log output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Pretty }
    }
}

/// Placement defaults used when the command line does not override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Rule applied by default.
    pub rule: String,
    /// Number of placement groups objects are hashed into.
    pub pg_count: PgId,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self { rule: "replicated_rule".to_string(), pg_count: 128 }
    }
}

/// A storage device entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device ID; the device is named `osd.<id>`.
    pub id: DeviceId,
    /// Device weight.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// A bucket entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Unique bucket name.
    pub name: String,
    /// Type label such as `host` or `rack`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Algorithm label.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Child device or bucket names.
    #[serde(default)]
    pub items: Vec<String>,
}

fn default_algorithm() -> String {
    "straw".to_string()
}
