use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use lox_genie::{
    app::{load_config, load_config_from, Config},
    cli::{handle_command, Cli},
    client::HttpAdviceClient,
    runtime::{InteractiveRunner, NonInteractiveRunner},
    session::SessionOrchestrator,
    utils::{init_logger, log_warn},
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    init_logger(cli.verbose);

    let mut config = if let Some(config_path) = &cli.config {
        load_config_from(config_path)?
    } else {
        load_config().unwrap_or_else(|e| {
            log_warn("⚠️", format!("Failed to load config: {}. Using defaults.", e));
            Config::default()
        })
    };
    if let Some(api_url) = &cli.api_url {
        config.backend.api_url = api_url.clone();
    }
    if !config.ui.color {
        colored::control::set_override(false);
    }

    if let Some(command) = &cli.command {
        if handle_command(command, &config).await? {
            return Ok(());
        }
    }

    let client = HttpAdviceClient::new(&config.backend)?;
    let session = Arc::new(SessionOrchestrator::new(Arc::new(client), &config));

    // Check if running in non-interactive mode
    if let Some(prompt) = &cli.prompt {
        let handle = cli.handle.as_deref().unwrap_or_default();
        let runner = NonInteractiveRunner::new(session, config.backend.api_url.clone());
        let result = runner.execute(handle, prompt).await?;

        println!("{}", runner.format_result(&result, cli.output_format));

        // Exit with appropriate code
        if !result.errors.is_empty() {
            std::process::exit(1);
        }
        return Ok(());
    }

    InteractiveRunner::new(session, config.ui.clone())
        .run(cli.handle.clone())
        .await
}
