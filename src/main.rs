//! Tripplanner - conversational travel planning CLI
//!
#![doc = "Tripplanner - conversational travel planning CLI"]
#![doc = "Main entry point for the tripplanner application."]

use anyhow::Result;

use tripplanner::cli::{Cli, Commands};
use tripplanner::commands;
use tripplanner::config::Config;
use tripplanner::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_logging(cli.verbose, cli.json_logs)?;

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Chat { query, new } => {
            if new {
                tracing::debug!("Starting a fresh conversation");
            }
            commands::chat::run_chat(config, query, new).await?;
            Ok(())
        }
        Commands::Send { message } => {
            tracing::info!("Sending one-shot message");
            commands::conversation::run_send(&config, &message).await?;
            Ok(())
        }
        Commands::State => {
            commands::conversation::run_state(&config).await?;
            Ok(())
        }
        Commands::History => {
            commands::conversation::run_history(&config).await?;
            Ok(())
        }
        Commands::Reset => {
            commands::conversation::run_reset(&config)?;
            Ok(())
        }
        Commands::Map => {
            commands::conversation::run_map(&config).await?;
            Ok(())
        }
        Commands::Plan { text } => {
            tracing::info!("Running agent planner");
            commands::plan::run_plan(&config, &text).await?;
            Ok(())
        }
        Commands::Search { command } => {
            commands::search::handle_search(&config, command).await?;
            Ok(())
        }
    }
}
