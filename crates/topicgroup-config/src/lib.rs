// topicgroup-config - Runtime configuration for the grouping pipeline
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from TOPICGROUP_CONFIG env var (or --config)
// 3. Config file contents from TOPICGROUP_CONFIG_CONTENT env var
// 4. Default config file locations (./topicgroup.toml, ./.topicgroup.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use topicgroup_core::{Template, TimestampSource, TimestampSourceType, DEFAULT_FILE_NAME_TEMPLATE};

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, normalize_prefix, EnvSource, ENV_PREFIX};

/// Main runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub grouper: GrouperConfig,

    #[serde(default)]
    pub flush: FlushConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Grouping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrouperConfig {
    #[serde(default = "default_file_name_template")]
    pub file_name_template: String,
    /// 0 means unlimited
    #[serde(default)]
    pub max_records_per_file: usize,
    #[serde(default = "default_timestamp_timezone")]
    pub timestamp_timezone: String,
    #[serde(default = "default_timestamp_source")]
    pub timestamp_source: String,
}

fn default_file_name_template() -> String {
    DEFAULT_FILE_NAME_TEMPLATE.to_string()
}

fn default_timestamp_timezone() -> String {
    "UTC".to_string()
}

fn default_timestamp_source() -> String {
    TimestampSourceType::Wallclock.to_string()
}

impl Default for GrouperConfig {
    fn default() -> Self {
        Self {
            file_name_template: default_file_name_template(),
            max_records_per_file: 0,
            timestamp_timezone: default_timestamp_timezone(),
            timestamp_source: default_timestamp_source(),
        }
    }
}

impl GrouperConfig {
    pub fn template(&self) -> Result<Template> {
        Template::parse(&self.file_name_template)
            .with_context(|| format!("Invalid file name template: {}", self.file_name_template))
    }

    pub fn max_records(&self) -> Option<usize> {
        match self.max_records_per_file {
            0 => None,
            n => Some(n),
        }
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timestamp_timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown time zone '{}': {}", self.timestamp_timezone, e))
    }

    pub fn timestamp_source_type(&self) -> Result<TimestampSourceType> {
        self.timestamp_source
            .parse::<TimestampSourceType>()
            .map_err(anyhow::Error::msg)
    }

    pub fn build_timestamp_source(&self) -> Result<Box<dyn TimestampSource>> {
        Ok(self.timestamp_source_type()?.build(self.timezone()?))
    }
}

/// Flush cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlushConfig {
    /// Flush after this many buffered records; 0 flushes only at end of input
    #[serde(default = "default_flush_every_records")]
    pub every_records: usize,
}

fn default_flush_every_records() -> usize {
    10_000
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            every_records: default_flush_every_records(),
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub backend: StorageBackend,

    #[serde(default = "default_fs_config", skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsConfig>,

    /// Prepended to every batch key, normalised to end with '/'
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

fn default_storage_backend() -> StorageBackend {
    StorageBackend::Fs
}

fn default_fs_config() -> Option<FsConfig> {
    Some(FsConfig::default())
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            fs: default_fs_config(),
            prefix: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Fs,
    Memory,
}

impl std::fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackend::Fs => write!(f, "fs"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fs" | "filesystem" => Ok(StorageBackend::Fs),
            "memory" | "mem" => Ok(StorageBackend::Memory),
            _ => anyhow::bail!("Unsupported storage backend: {}. Supported: fs, memory", s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsConfig {
    #[serde(default = "default_fs_path")]
    pub path: String,
}

fn default_fs_path() -> String {
    "./data".to_string()
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            path: default_fs_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority.
    ///
    /// Not validated: callers apply their own overrides first, then call
    /// [`RuntimeConfig::validate`].
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from an explicit file, then apply env overrides.
    /// Not validated, like [`RuntimeConfig::load`].
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Parse TOML content without consulting the environment
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: RuntimeConfig = toml::from_str(content).context("Failed to parse config")?;
        config.storage.prefix = config.storage.prefix.take().and_then(normalize_prefix);
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}
