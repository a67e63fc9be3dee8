// Configuration source loading
//
// Priority order:
// 1. Environment variables (TOPICGROUP_* prefix)
// 2. Config file path from TOPICGROUP_CONFIG
// 3. Inline config content from TOPICGROUP_CONFIG_CONTENT
// 4. Default config files (./topicgroup.toml, ./.topicgroup.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::*;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

/// Load configuration using native environment/file access.
pub fn load_config() -> Result<RuntimeConfig> {
    let mut config = load_from_file()?.unwrap_or_default();
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

fn load_from_file() -> Result<Option<RuntimeConfig>> {
    if let Ok(path) = env::var("TOPICGROUP_CONFIG") {
        return read_config_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var("TOPICGROUP_CONFIG_CONTENT") {
        let config = RuntimeConfig::from_toml(&content)
            .context("Failed to parse inline config from TOPICGROUP_CONFIG_CONTENT")?;
        return Ok(Some(config));
    }

    for path in &["./topicgroup.toml", "./.topicgroup.toml"] {
        let path = Path::new(path);
        if path.exists() {
            return read_config_file(path).map(Some);
        }
    }

    Ok(None)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let mut config = read_config_file(path.as_ref())?;
    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    RuntimeConfig::from_toml(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}
