use anyhow::Result;
use colored::Colorize;
use std::io::Write;

use crate::{
    app::{init_config, Config},
    client::{AdviceService, HttpAdviceClient},
};

use super::Commands;

/// Handle CLI subcommands. Returns `false` when the chat should start.
pub async fn handle_command(command: &Commands, config: &Config) -> Result<bool> {
    match command {
        Commands::Init => {
            println!("Initializing Lox Genie configuration...");
            init_config()?;
            println!("Configuration initialized successfully!");
            Ok(true)
        }
        Commands::Status => {
            show_status(config).await?;
            Ok(true)
        }
        Commands::Suggest => {
            suggest(config).await?;
            Ok(true)
        }
        Commands::Version => {
            show_version();
            Ok(true)
        }
        Commands::Chat => Ok(false),
    }
}

/// Show version information
pub fn show_version() {
    println!("Lox Genie v{}", env!("CARGO_PKG_VERSION"));
    println!("   Fantasy football advice, one wish at a time");
}

/// Report whether the API answers its health check
async fn show_status(config: &Config) -> Result<()> {
    let client = HttpAdviceClient::new(&config.backend)?;

    println!("Lox Genie Status:");
    println!();
    print!("  API ({}): ", client.base_url());
    std::io::stdout().flush()?;
    if client.check_health().await {
        println!("{}", "healthy".green());
    } else {
        println!("{}", "unreachable".red());
        println!("    Make sure the API service is running.");
    }
    Ok(())
}

/// Print a generated question
async fn suggest(config: &Config) -> Result<()> {
    let client = HttpAdviceClient::new(&config.backend)?;
    match client.generate_suggestion().await {
        Ok(question) => {
            println!("{}", question);
            Ok(())
        }
        Err(e) => anyhow::bail!("{}", e.user_message()),
    }
}
