//! Bootcamp directory API server.
//!
//! Loads configuration, initializes logging, connects to the database and
//! serves until a signal or an unhandled failure. Exits with status 1 when an
//! unhandled failure stopped the server.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use bootcamp_api::config::{load_config, DEFAULT_ENV_FILE};
use bootcamp_api::lifecycle::startup;
use bootcamp_api::observability::init_logging;

/// Bootcamp directory REST API
#[derive(Parser, Debug)]
#[command(name = "bootcamp-api", version, about)]
struct Args {
    /// Path to the env file loaded before the process environment
    #[arg(short, long, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Log filter (e.g., "bootcamp_api=debug,tower_http=info")
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(&args.env_file)?;
    init_logging(&config.observability, args.log_level.as_deref())?;

    tracing::info!(
        env_file = %args.env_file.display(),
        bind_address = %config.server.bind_address(),
        "Configuration loaded"
    );
    match serde_json::to_string(&config) {
        Ok(effective) => tracing::debug!(config = %effective, "Effective configuration"),
        Err(e) => tracing::debug!(error = %e, "Effective configuration not serializable"),
    }
    if config.environment.is_miscased_development() {
        tracing::warn!(
            mode = %config.environment.name(),
            "NODE_ENV differs from \"Development\" only in casing; request logging stays off"
        );
    }

    let outcome = match startup::run(config).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return Err(e.into());
        }
    };
    let code = outcome.exit_code();
    tracing::info!(exit_code = code, "Shutdown complete");
    Ok(ExitCode::from(code as u8))
}
