// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Device Registry CLI
//!
//! The `devreg` binary runs the device registry HTTP server and talks to a
//! running one.
//!
//! ## Commands
//!
//! - `devreg serve [--migrate]` - Run the HTTP API
//! - `devreg migrate [--dry-run]` - Apply database migrations
//! - `devreg config show|validate|generate` - Configuration management
//! - `devreg device list|get|create|update|delete` - Device operations over HTTP

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::debug;

use device_registry::client::RegistryClient;
use device_registry::commands::{self, ConfigCommand, DeviceCommand, MigrateCommand, ServeCommand};
use device_registry::logging::init_logging;
use device_registry_core::domain::service_config::{LogFormat, ServiceConfig};

/// Device Registry - track devices and who may change them
#[derive(Parser)]
#[command(name = "devreg")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "DEVICES_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// HTTP bind host (overrides server.host)
    #[arg(long, global = true)]
    host: Option<String>,

    /// HTTP port (overrides server.port and WEBSERVER_PORT)
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    #[command(name = "serve")]
    Serve {
        #[command(flatten)]
        command: ServeCommand,
    },

    /// Apply database migrations
    #[command(name = "migrate")]
    Migrate {
        #[command(flatten)]
        command: MigrateCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Device operations against a running server
    #[command(name = "device")]
    Device {
        /// Server base URL (default: derived from server.host/server.port)
        #[arg(long, env = "DEVICES_API_URL")]
        url: Option<String>,

        #[command(subcommand)]
        command: DeviceCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Config { command }) => {
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Compact)?;
            commands::config::handle_command(command, cli.config).await
        }
        Some(Commands::Serve { command }) => {
            let config = load_config(&cli.config, &cli.host, cli.port, &cli.log_level)?;
            init_logging(&config.logging.level, config.logging.format)?;
            commands::serve::execute(command, config).await
        }
        Some(Commands::Migrate { command }) => {
            let config = load_config(&cli.config, &cli.host, cli.port, &cli.log_level)?;
            init_logging(&config.logging.level, config.logging.format)?;
            commands::migrate::execute(command, &config).await
        }
        Some(Commands::Device { url, command }) => {
            let config = load_config(&cli.config, &cli.host, cli.port, &cli.log_level)?;
            init_logging(cli.log_level.as_deref().unwrap_or("warn"), LogFormat::Compact)?;
            let client = match url {
                Some(url) => RegistryClient::new(url)?,
                None => RegistryClient::for_address(&config.server.host, config.server.port)?,
            };
            debug!(base_url = %client.base_url(), "Using device registry");
            commands::device::handle_command(command, client).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Load configuration, then apply command-line overrides on top of file and
/// environment values.
fn load_config(
    path: &Option<PathBuf>,
    host: &Option<String>,
    port: Option<u16>,
    log_level: &Option<String>,
) -> Result<ServiceConfig> {
    let mut config =
        ServiceConfig::load_or_default(path.clone()).context("Failed to load configuration")?;

    if let Some(host) = host {
        config.server.host = host.clone();
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(level) = log_level {
        config.logging.level = level.clone();
    }

    Ok(config)
}
