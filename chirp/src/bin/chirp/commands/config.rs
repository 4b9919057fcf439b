use std::path::Path;

use anyhow::Result;
use chirp::ChirpConfig;

use super::load_config;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Inspect Configuration",
    commands: &[
        "chirp config                          # Print the effective configuration",
        "chirp --config ./chirp.toml config    # Print a specific configuration file",
    ],
}];

pub fn handle_config(path: Option<&Path>, output: &OutputManager) -> Result<()> {
    let config = load_config(path)?;
    let source = match path {
        Some(path) => path.display().to_string(),
        None => {
            let default_path = ChirpConfig::default_path(&std::env::current_dir()?);
            if default_path.exists() {
                default_path.display().to_string()
            } else {
                "built-in defaults".to_string()
            }
        }
    };

    output.heading("Configuration");
    output.key_value("Source", &source);
    match config.redis.resolved_url() {
        Ok(url) => output.key_value("Redis", &url),
        Err(err) => output.warning(&err.to_string()),
    }
    if !output.options.quiet {
        println!("\n{}", config.to_toml_string()?);
    }
    Ok(())
}
