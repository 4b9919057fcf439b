//! Client configuration stored in `.chirp/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::ChirpError;

/// Directory holding the configuration file, relative to the working directory.
pub const CONFIG_DIR: &str = ".chirp";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChirpConfig {
    #[serde(default)]
    pub chirp: ChirpSettings,
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChirpSettings {
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,
    #[serde(default = "default_max_tweet_chars")]
    pub max_tweet_chars: usize,
    #[serde(default = "default_max_photo_bytes")]
    pub max_photo_bytes: u64,
    #[serde(default = "default_max_display_name_chars")]
    pub max_display_name_chars: usize,
    #[serde(default = "default_anonymous_name")]
    pub anonymous_name: String,
}

impl Default for ChirpSettings {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            feed_limit: default_feed_limit(),
            max_tweet_chars: default_max_tweet_chars(),
            max_photo_bytes: default_max_photo_bytes(),
            max_display_name_chars: default_max_display_name_chars(),
            anonymous_name: default_anonymous_name(),
        }
    }
}

fn default_collection() -> String {
    "tweets".to_string()
}

fn default_feed_limit() -> usize {
    25
}

fn default_max_tweet_chars() -> usize {
    180
}

fn default_max_photo_bytes() -> u64 {
    1024 * 1024
}

fn default_max_display_name_chars() -> usize {
    10
}

fn default_anonymous_name() -> String {
    "Anonymous".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_service")]
    pub service: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            prefix: default_prefix(),
            service: default_service(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_prefix() -> String {
    "chirp".to_string()
}

fn default_service() -> String {
    "app".to_string()
}

impl RedisSettings {
    /// Get the Redis URL, expanding a `${VAR}` reference.
    pub fn resolved_url(&self) -> Result<String, ChirpError> {
        expand_env(&self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    #[serde(default = "default_download_base_url")]
    pub download_base_url: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            download_base_url: default_download_base_url(),
        }
    }
}

fn default_download_base_url() -> String {
    "https://storage.chirp.local".to_string()
}

/// Input limits enforced client-side by the form view models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub feed_limit: usize,
    pub max_tweet_chars: usize,
    pub max_photo_bytes: u64,
    pub max_display_name_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        ChirpSettings::default().limits()
    }
}

impl ChirpSettings {
    pub fn limits(&self) -> Limits {
        Limits {
            feed_limit: self.feed_limit,
            max_tweet_chars: self.max_tweet_chars,
            max_photo_bytes: self.max_photo_bytes,
            max_display_name_chars: self.max_display_name_chars,
        }
    }
}

impl ChirpConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ChirpError> {
        toml::from_str(content).map_err(|err| ChirpError::Config {
            message: format!("failed to parse config: {err}"),
        })
    }

    pub fn to_toml_string(&self) -> Result<String, ChirpError> {
        toml::to_string_pretty(self).map_err(|err| ChirpError::Config {
            message: format!("failed to render config: {err}"),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ChirpError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Loads `<dir>/.chirp/config.toml` when present, defaults otherwise.
    pub fn find_or_default(dir: &Path) -> Result<Self, ChirpError> {
        let path = Self::default_path(dir);
        if path.exists() {
            log::debug!("loading config from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn default_path(dir: &Path) -> PathBuf {
        dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    pub fn limits(&self) -> Limits {
        self.chirp.limits()
    }
}

fn expand_env(value: &str) -> Result<String, ChirpError> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).map_err(|_| ChirpError::Config {
            message: format!("environment variable {var_name} not set"),
        })
    } else {
        Ok(value.to_string())
    }
}
