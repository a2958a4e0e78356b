//! Roomlet - room-rental marketplace client
//!
#![doc = "Roomlet - room-rental marketplace client"]
#![doc = "Main entry point for the Roomlet command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use roomlet::cli::{Cli, Commands};
use roomlet::commands;
use roomlet::config::Config;
use roomlet::error::classify;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing before config so load warnings are visible
    init_tracing(cli.verbose, cli.json_logs);

    if let Err(e) = run(cli).await {
        let classified = classify(&e);
        tracing::debug!(kind = ?classified.kind, error = ?e, "Command failed");
        eprintln!("{}", classified.message);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Login { token } => {
            tracing::info!("Storing session credential");
            commands::session::login(config, token).await
        }
        Commands::Logout => commands::session::logout(config).await,
        Commands::Status => commands::session::status(config).await,
        Commands::Unread => commands::notifications::unread(config).await,
        Commands::Watch { seconds } => {
            tracing::info!("Starting notification badge watch");
            if let Some(secs) = seconds {
                tracing::debug!("Watching for {} seconds", secs);
            }
            commands::notifications::watch(config, seconds).await
        }
        Commands::Request { method, path, body } => {
            tracing::debug!("Sending {} {}", method, path);
            commands::request::run_request(config, method, path, body).await
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "roomlet=debug" } else { "roomlet=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
