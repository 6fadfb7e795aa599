//! GraphGate CLI Binary
//!
//! Command-line front-end over [`graphgate::Connection`].

use anyhow::Context;
use clap::Parser;
use graphgate::cli::{map_error, Cli, RunContext};
use graphgate::config::ConfigLoader;
use graphgate::logging::{init_logging, LoggingConfig};
use std::path::Path;
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    init_logging(Some(&logging_config)).context("Failed to initialize logging")?;

    info!("GraphGate CLI starting");

    let context = match RunContext::new(cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command).await {
        Ok(output) => {
            let stats = context.connection().stats();
            info!(
                completed = stats.completed,
                retried = stats.retried,
                cache_hits = stats.cache_hits,
                "Command completed successfully"
            );
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args and the config file
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    if !cli.verbose {
        let mut config = LoggingConfig::default();
        config.level = "off".to_string();
        return config;
    }

    let loaded = match cli.config.as_deref() {
        Some(path) if path.is_file() => ConfigLoader::from_file(path),
        Some(dir) => ConfigLoader::load(Some(dir)),
        None => ConfigLoader::load(None::<&Path>),
    };
    let mut config = loaded.map(|c| c.logging).unwrap_or_default();

    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }

    config
}
