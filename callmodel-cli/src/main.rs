//! Callmodel CLI: terminal front end for the model dispatch shim.
//!
//! Provides single-request, interactive REPL, and gateway modes.

mod client;
mod commands;
mod prompts;
mod repl;
mod session;
mod slash;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Callmodel: send a prompt to any foundation model through one action.
#[derive(Parser, Debug)]
#[command(name = "callmodel", version, about, long_about = None)]
struct Cli {
    /// Model used by the REPL until changed with /model
    #[arg(short, long)]
    model: Option<String>,

    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Post actions to a running gateway instead of dispatching in-process
    #[arg(short, long, global = true)]
    gateway: Option<String>,

    /// Answer from a mock runtime instead of the inference endpoint
    #[arg(long, global = true)]
    offline: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send one prompt to a model and print the reply
    Invoke {
        /// Model identifier, e.g. anthropic.claude-3-haiku-20240307-v1:0
        #[arg(short, long)]
        model: String,
        /// Prompt text
        prompt: String,
        /// Print the full action reply envelope
        #[arg(long)]
        json: bool,
    },
    /// Run the HTTP gateway
    Serve {
        /// Address to bind (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default workspace configuration file
    Init,
    /// Show the effective configuration
    Show,
}

/// Options shared by every mode.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunOptions {
    pub gateway: Option<String>,
    pub offline: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "callmodel", "callmodel")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "callmodel.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let options = RunOptions {
        gateway: cli.gateway,
        offline: cli.offline,
    };

    if let Some(command) = cli.command {
        return commands::handle_command(command, &workspace, &options).await;
    }

    let config = callmodel_core::config::load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    config.validate()?;

    repl::run_interactive(config, &options, cli.model).await
}
