//! Config command handlers

use anyhow::{Context, Result};

use willdraft_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "autosave_delay_ms": config.autosave_delay_ms,
                    "subscription": config.subscription,
                    "log_file": config.log_path()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir:          {}", config.data_dir.display());
            println!("  autosave_delay_ms: {}", config.autosave_delay_ms);
            println!("  subscription:      {}", config.subscription);
            println!(
                "  log_file:          {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| format!("(default: {})", config.log_path().display()))
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;

    let value = if value == "none" { String::new() } else { value };
    config.set(&key, &value)?;
    config.save().context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}
