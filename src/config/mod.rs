//! Configuration management for hawkcache

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::cache::{CachePolicy, PartialPolicy};
use crate::error::{ConfigError, Result};

/// Environment variable naming an alternative config file
pub const CONFIG_ENV: &str = "HAWKCACHE_CONFIG";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL that relative call URLs are resolved against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Session the cache is bound to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Value for the Accept-Language header
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    /// Prefix stripped from JSON response bodies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_prefix: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Global cache options, e.g. `{useCache: always, timeToLive: 5000}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<Value>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: None,
            session_id: None,
            lang: None,
            json_prefix: None,
            timeout_secs: default_timeout_secs(),
            cache: None,
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".hawkcache").join("config.yaml"))
    }

    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file is an error only when the path was given explicitly.
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(Path::new(path)),
            None => {
                let path = Self::default_path()?;
                if path.exists() {
                    Self::load_from(&path)
                } else {
                    log::debug!("No config at {}, using defaults", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from YAML text
    pub fn parse(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(contents).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Unvalidated global cache options from the `cache` section
    pub fn cache_options(&self) -> Result<PartialPolicy> {
        match &self.cache {
            Some(bag) => Ok(PartialPolicy::from_value(bag)?),
            None => Ok(PartialPolicy::default()),
        }
    }

    /// Validated global cache policy
    pub fn global_policy(&self) -> Result<CachePolicy> {
        Ok(CachePolicy::global(&self.cache_options()?)?)
    }
}
