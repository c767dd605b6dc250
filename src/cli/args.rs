use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "genie")]
#[command(version)]
#[command(about = "Ask the Lox Genie for fantasy football advice", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Base URL of the Lox Genie API (overrides config)
    #[arg(long, env = "GENIE_API_URL")]
    pub api_url: Option<String>,

    /// Sleeper username to verify before asking
    #[arg(short = 'u', long)]
    pub handle: Option<String>,

    /// Non-interactive question to ask
    #[arg(short, long, requires = "handle")]
    pub prompt: Option<String>,

    /// Output format for non-interactive mode
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, requires = "prompt")]
    pub output_format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize configuration
    Init,
    /// Start a chat session (default)
    Chat,
    /// Check whether the Lox Genie API is up
    Status,
    /// Print a question suggested by the Genie
    Suggest,
    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    Text,
    /// JSON structured output
    Json,
    /// Markdown formatted output
    Markdown,
}
