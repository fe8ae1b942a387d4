//! keyward - a key-hiding proxy backend for AI and media APIs
//!
//! Forwards chat, video search and image requests to third-party providers
//! so that browser clients never see the provider API keys.

use std::path::Path;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyward::config::{Config, KeySource, Provider};

/// Config file looked up when `--config` is not given.
const DEFAULT_CONFIG_PATH: &str = "keyward.toml";

#[derive(Parser)]
#[command(name = "keyward")]
#[command(about = "Key-hiding proxy backend for AI and media APIs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Serve {
        /// Path to configuration file (defaults to ./keyward.toml when present)
        #[arg(short, long)]
        config: Option<String>,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration and key resolution
    Check {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Show upstream providers and where their keys come from
    Providers {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
}

/// Load the config from an explicit path, the default path, or built-in defaults.
///
/// An explicit path must exist; the default path is optional.
fn load_config(path: Option<&str>) -> anyhow::Result<(Config, Vec<(Provider, KeySource)>)> {
    let loaded = match path {
        Some(path) => Config::from_file_with_env(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            Config::from_file_with_env(DEFAULT_CONFIG_PATH)?
        }
        None => Config::from_env()?,
    };
    Ok(loaded)
}

fn init_tracing(level: &str) {
    let default_filter = format!("keyward={level},tower_http={level}");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            let (mut config, key_sources) = load_config(config.as_deref())?;
            init_tracing(&config.logging.level);

            for (provider, source) in &key_sources {
                tracing::info!(provider = %provider, key_source = %source, "Resolved API key");
            }

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            keyward::proxy::run_server(config).await
        }

        Commands::Check { config } => {
            let (config, key_sources) = load_config(config.as_deref())?;
            println!("Configuration OK (listen on {})", config.server.listen);
            let missing: Vec<_> = key_sources
                .iter()
                .filter(|(_, source)| *source == KeySource::None)
                .map(|(provider, _)| provider.env_var())
                .collect();
            if missing.is_empty() {
                println!("All provider keys resolved");
            } else {
                println!("Routes disabled until set: {}", missing.join(", "));
            }
            Ok(())
        }

        Commands::Providers { config } => {
            let (config, key_sources) = load_config(config.as_deref())?;
            println!("{:<12} {:<45} KEY SOURCE", "PROVIDER", "BASE URL");
            for (provider, source) in &key_sources {
                println!(
                    "{:<12} {:<45} {}",
                    provider.name(),
                    config.base_url(*provider).unwrap_or("-"),
                    source
                );
            }
            Ok(())
        }
    }
}
