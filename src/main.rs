//! Conduit API server.
//!
//! ```text
//! conduit-api [--config <path>]
//!
//! optional TOML file ─┐
//! environment ────────┴─▶ AppConfig ─▶ ServerBuilder ─▶ ServerHandle
//!                                                          │
//!                          SIGINT / SIGTERM ──────────▶ shutdown()
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use conduit_api::config::{load_config, AppConfig, ConfigError};
use conduit_api::lifecycle::{shutdown_signal, ServerBuilder};
use conduit_api::observability::logging;
use conduit_api::routes::api_router;

#[derive(Parser)]
#[command(name = "conduit-api")]
#[command(about = "Conduit blogging API server", long_about = None)]
struct Cli {
    /// TOML configuration file; environment variables override its values.
    #[arg(short, long, env = "CONDUIT_CONFIG")]
    config: Option<PathBuf>,
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    config.apply_env(|name| std::env::var(name).ok())?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&AppConfig::default());
            tracing::error!(error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.environment,
        log_level = %config.logging.level,
        "conduit-api starting"
    );

    let handle = match ServerBuilder::new(config).routes(api_router()).start().await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    shutdown_signal().await;

    match handle.shutdown().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Shutdown failed");
            ExitCode::FAILURE
        }
    }
}
