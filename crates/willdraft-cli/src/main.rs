//! willdraft CLI
//!
//! Command-line interface for willdraft - drafting a will with autosave.

use std::fs::OpenOptions;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use willdraft_core::{Config, LocalWillStore};

mod commands;
mod output;
mod prompt;
mod session;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "willdraft")]
#[command(about = "willdraft - Draft your will, saved as you type")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit a will interactively (starts a new will without ID)
    Edit {
        /// Will ID (full ID or prefix)
        id: Option<String>,
    },
    /// List all wills
    #[command(alias = "ls")]
    List,
    /// Show will details
    Show {
        /// Will ID (full ID or prefix)
        id: String,
    },
    /// Delete a will
    #[command(alias = "rm")]
    Delete {
        /// Will ID (full ID or prefix)
        id: String,
    },
    /// Show plan, usage and storage status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, autosave_delay_ms, subscription, log_file)
        key: String,
        /// Configuration value ("none" clears log_file)
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config);

    let store = LocalWillStore::open(&config).context("Failed to open will store")?;

    match cli.command {
        Commands::Edit { id } => commands::edit::run(&store, &config, id, &output).await,
        Commands::List => commands::will::list(&store, &output),
        Commands::Show { id } => commands::will::show(&store, id, &output),
        Commands::Delete { id } => commands::will::delete(&store, id, &output),
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Initialize file-based logging
///
/// Logs go to the configured log file so they never interleave with the
/// edit session. The level comes from WILLDRAFT_LOG (default: info).
fn init_logging(config: &Config) {
    let log_level = std::env::var("WILLDRAFT_LOG").unwrap_or_else(|_| "info".to_string());
    let log_path = config.log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!(
        "willdraft_core={},willdraft_cli={}",
        log_level, log_level
    ));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
