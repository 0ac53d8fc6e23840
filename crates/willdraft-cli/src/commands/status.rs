//! Status command handler

use anyhow::Result;

use willdraft_core::permissions::{can_create_will, can_use_ai_tools, can_use_customizations};
use willdraft_core::{Config, LocalWillStore};

use crate::output::{Output, OutputFormat};

/// Show plan, storage and usage information
pub fn show(store: &LocalWillStore, config: &Config, output: &Output) -> Result<()> {
    let count = store.count()?;
    let level = store.level();
    let limit = level
        .max_wills()
        .map(|max| max.to_string())
        .unwrap_or_else(|| "unlimited".to_string());

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "subscription": level,
                    "wills": {
                        "count": count,
                        "limit": level.max_wills(),
                        "can_create": can_create_will(level, count)
                    },
                    "features": {
                        "customizations": can_use_customizations(level),
                        "ai_tools": can_use_ai_tools(level)
                    },
                    "data_dir": config.data_dir,
                    "autosave_delay_ms": config.autosave_delay_ms,
                    "log_file": config.log_path()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", count);
        }
        OutputFormat::Human => {
            println!("willdraft Status");
            println!("================");
            println!();
            println!("Plan:     {}", level);
            println!("Wills:    {} of {}", count, limit);
            if !can_create_will(level, count) {
                println!("          (limit reached, upgrade to create more)");
            }
            println!();
            println!("Features:");
            println!(
                "  Customizations: {}",
                if can_use_customizations(level) { "yes" } else { "no" }
            );
            println!(
                "  AI tools:       {}",
                if can_use_ai_tools(level) { "yes" } else { "no" }
            );
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  Log file: {}", config.log_path().display());
            println!("  Autosave: {} ms after the last edit", config.autosave_delay_ms);
        }
    }

    Ok(())
}
