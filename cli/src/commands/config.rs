// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use device_registry_core::domain::service_config::{
    ServiceConfig, StorageKind, CONFIG_FILE_NAME, CONFIG_PATH_ENV,
};

pub const CONFIG_TEMPLATE: &str = include_str!("../../templates/devices-config.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./devices-config.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml),
        ConfigCommand::Validate { file } => validate(file.or(config_override)).map(|_| ()),
        ConfigCommand::Generate { output, force } => generate(&output, force),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = ServiceConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./{}", CONFIG_FILE_NAME);
        println!("  4. ~/.devices/config.yaml");
        println!("  5. /etc/devices/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", redacted(&config).to_yaml_string()?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Server:".bold());
    println!("  Listen: {}", config.bind_address());
    println!("  Request timeout: {}s", config.server.request_timeout_secs);
    println!();

    println!("{}", "Storage:".bold());
    match config.storage.backend {
        StorageKind::Memory => println!("  Backend: memory"),
        StorageKind::Postgres => {
            let pg = &config.storage.postgres;
            println!("  Backend: postgres");
            if pg.url.is_some() {
                println!("  URL: {}", "(set, hidden)".dimmed());
            } else {
                println!("  Host: {}:{}", pg.host, pg.port);
                println!("  Database: {}", pg.database);
                println!("  User: {}", pg.user);
            }
            println!("  Max connections: {}", pg.max_connections);
        }
    }
    println!();

    println!("{}", "Logging:".bold());
    println!("  Level: {}", config.logging.level);
    println!("  Format: {:?}", config.logging.format);
    println!();

    Ok(())
}

/// Copy of `config` with credentials masked
fn redacted(config: &ServiceConfig) -> ServiceConfig {
    let mut copy = config.clone();
    copy.storage.postgres.password = "********".to_string();
    if copy.storage.postgres.url.is_some() {
        copy.storage.postgres.url = Some("********".to_string());
    }
    copy
}

pub fn validate(config_path: Option<PathBuf>) -> Result<ServiceConfig> {
    println!("Validating configuration...");

    let config = ServiceConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(config)
}

pub fn generate(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }

    std::fs::write(output, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses_and_validates() {
        let config = ServiceConfig::from_yaml_str(CONFIG_TEMPLATE).unwrap();
        config.validate().unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices-config.yaml");

        generate(&path, false).unwrap();
        assert!(generate(&path, false).is_err());
        generate(&path, true).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, CONFIG_TEMPLATE);
    }

    #[test]
    fn test_validate_rejects_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "server:\n  port: 0\n").unwrap();

        assert!(validate(Some(path)).is_err());
    }

    #[test]
    fn test_redacted_masks_credentials() {
        let mut config = ServiceConfig::default();
        config.storage.postgres.url = Some("postgres://u:secret@db/devices".to_string());

        let masked = redacted(&config);
        assert_eq!(masked.storage.postgres.password, "********");
        assert_eq!(masked.storage.postgres.url.as_deref(), Some("********"));
    }
}
