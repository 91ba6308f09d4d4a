//! FloraFind API - garden management and plant identification backend

use anyhow::Context;
use clap::Parser;
use florafind_server::config::ConfigError;
use florafind_server::{Server, Settings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// FloraFind API CLI
#[derive(Parser)]
#[command(name = "florafind")]
#[command(about = "FloraFind API - gardens, plants and plant identification", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FLORAFIND_CONFIG")]
    config: Option<String>,

    /// Listen host (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (overrides LOG_LEVEL)
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json: bool,

    /// Validate configuration and exit
    #[arg(long)]
    check: bool,
}

fn init_tracing(level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Override with CLI args
    if let Some(host) = cli.host {
        settings.host = host;
    }
    if let Some(port) = cli.port {
        settings.port = port;
    }
    if let Some(level) = cli.log_level {
        settings.log_level = level;
    }

    init_tracing(&settings.log_level, cli.json || settings.log_json);

    if let Err(e) = settings.validate() {
        if let ConfigError::Invalid(problems) = &e {
            for problem in problems {
                tracing::error!(%problem, "Configuration problem");
            }
        }
        return Err(e).context("Refusing to start with invalid configuration");
    }

    if cli.check {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        backend = ?settings.storage_backend,
        "Starting FloraFind API"
    );

    // Create and run server
    let server = Server::new(settings).await?;
    server.run().await?;
    Ok(())
}
