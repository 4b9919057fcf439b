pub mod config;
pub mod tour;
pub mod watch;

use std::path::Path;

use anyhow::{Context, Result};
use chirp::ChirpConfig;

/// Loads the file given with `--config`, or `.chirp/config.toml` under the
/// working directory, or the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ChirpConfig> {
    match path {
        Some(path) => {
            ChirpConfig::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
        }
        None => {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(ChirpConfig::find_or_default(&current_dir)?)
        }
    }
}
