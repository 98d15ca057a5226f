// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Service Configuration Types
//
// Defines the configuration schema for a device registry node:
// - HTTP server binding and per-request deadline
// - Storage backend selection and PostgreSQL connection settings
// - Logging level and output format
//
// Values come from a YAML file (if one is found), then environment overrides.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};
use std::path::{Path, PathBuf};

use crate::domain::repository::{PostgresConfig, StorageBackend};

pub const CONFIG_PATH_ENV: &str = "DEVICES_CONFIG_PATH";
pub const CONFIG_FILE_NAME: &str = "devices-config.yaml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deadline applied to every request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageKind,

    #[serde(default)]
    pub postgres: PostgresSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresSettings {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default = "default_db_password")]
    pub password: String,

    #[serde(default = "default_db_name")]
    pub database: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Full connection URL. Takes precedence over the individual fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Default for PostgresSettings {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: default_db_password(),
            database: default_db_name(),
            max_connections: default_max_connections(),
            url: None,
        }
    }
}

impl PostgresSettings {
    /// Connection options for the pool. An explicit `url` is parsed as-is;
    /// otherwise each field is passed through unescaped, with TLS disabled.
    pub fn connect_options(&self) -> anyhow::Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return url
                .parse::<PgConnectOptions>()
                .context("storage.postgres.url is not a valid PostgreSQL URL");
        }
        Ok(PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(PgSslMode::Disable))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error or an EnvFilter string)
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    10
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_user() -> String {
    "myuser".to_string()
}

fn default_db_password() -> String {
    "mypassword".to_string()
}

fn default_db_name() -> String {
    "devices-api".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ServiceConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Discover configuration file using precedence order
    /// 1. DEVICES_CONFIG_PATH environment variable
    /// 2. ./devices-config.yaml (working directory)
    /// 3. ~/.devices/config.yaml (user home)
    /// 4. /etc/devices/config.yaml (Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from(format!("./{}", CONFIG_FILE_NAME));
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".devices").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system = PathBuf::from("/etc/devices/config.yaml");
            if system.exists() {
                return Some(system);
            }
        }

        None
    }

    /// Load configuration from an explicit path, discovery, or defaults,
    /// then apply environment overrides.
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path: fail if missing/invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            return Ok(config);
        }

        tracing::info!("No configuration file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` to read variables.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_override::<u16, _>(&lookup, "WEBSERVER_PORT") {
            self.server.port = port;
        }
        if let Some(host) = lookup("DB_HOST") {
            self.storage.postgres.host = host;
        }
        if let Some(port) = parse_override::<u16, _>(&lookup, "DB_PORT") {
            self.storage.postgres.port = port;
        }
        if let Some(user) = lookup("DB_USER") {
            self.storage.postgres.user = user;
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            self.storage.postgres.password = password;
        }
        if let Some(name) = lookup("DB_NAME") {
            self.storage.postgres.database = name;
        }
        if let Some(url) = lookup("DEVICES_DATABASE_URL") {
            self.storage.postgres.url = Some(url);
        }
        if let Some(backend) = lookup("DEVICES_STORAGE_BACKEND") {
            match backend.to_lowercase().as_str() {
                "postgres" | "postgresql" => self.storage.backend = StorageKind::Postgres,
                "memory" | "in-memory" => self.storage.backend = StorageKind::Memory,
                _ => tracing::warn!(
                    "Invalid value for DEVICES_STORAGE_BACKEND: '{}'. Expected postgres/memory. Ignoring.",
                    backend
                ),
            }
        }
        if let Some(level) = lookup("DEVICES_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("server.host must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("server.port must be greater than 0");
        }
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("server.request_timeout_secs must be greater than 0");
        }

        if self.storage.backend == StorageKind::Postgres {
            let pg = &self.storage.postgres;
            if pg.max_connections == 0 {
                anyhow::bail!("storage.postgres.max_connections must be greater than 0");
            }
            if pg.url.is_none() {
                for (field, value) in [
                    ("host", &pg.host),
                    ("user", &pg.user),
                    ("database", &pg.database),
                ] {
                    if value.is_empty() {
                        anyhow::bail!("storage.postgres.{} must not be empty", field);
                    }
                }
                if pg.port == 0 {
                    anyhow::bail!("storage.postgres.port must be greater than 0");
                }
            }
            pg.connect_options()?;
        }

        if self.logging.level.is_empty() {
            anyhow::bail!("logging.level must not be empty");
        }

        Ok(())
    }

    /// Resolve the configured storage into a repository backend selector
    pub fn storage_backend(&self) -> anyhow::Result<StorageBackend> {
        Ok(match self.storage.backend {
            StorageKind::Memory => StorageBackend::InMemory,
            StorageKind::Postgres => StorageBackend::PostgreSQL(PostgresConfig {
                connect_options: self.storage.postgres.connect_options()?,
                max_connections: self.storage.postgres.max_connections,
            }),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn parse_override<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid value for {}: '{}'. Ignoring.", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_match_reference_environment() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_secs, 10);
        assert_eq!(config.storage.backend, StorageKind::Postgres);

        let options = config.storage.postgres.connect_options().unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "myuser");
        assert_eq!(options.get_database(), Some("devices-api"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
server:
  port: 9090
storage:
  backend: memory
logging:
  format: json
"#;
        let config = ServiceConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.storage.backend, StorageKind::Memory);
        assert!(matches!(config.storage_backend().unwrap(), StorageBackend::InMemory));
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  host: 127.0.0.1\n  port: 8181").unwrap();

        let config = ServiceConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:8181");
    }

    #[test]
    fn test_load_explicit_missing_path_fails() {
        let result = ServiceConfig::load_or_default(Some(PathBuf::from("/nonexistent/devices.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WEBSERVER_PORT", "9000"),
            ("DB_HOST", "db"),
            ("DB_PORT", "6543"),
            ("DB_USER", "svc"),
            ("DB_PASSWORD", "secret"),
            ("DB_NAME", "inventory"),
            ("DEVICES_STORAGE_BACKEND", "postgres"),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        config.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9000);
        let StorageBackend::PostgreSQL(pg) = config.storage_backend().unwrap() else {
            panic!("expected postgres backend");
        };
        assert_eq!(pg.max_connections, 5);
        assert_eq!(pg.connect_options.get_host(), "db");
        assert_eq!(pg.connect_options.get_port(), 6543);
        assert_eq!(pg.connect_options.get_username(), "svc");
        assert_eq!(pg.connect_options.get_database(), Some("inventory"));
    }

    #[test]
    fn test_reserved_characters_in_credentials_stay_in_credentials() {
        let mut config = ServiceConfig::default();
        config.storage.postgres.user = "ops@site".to_string();
        config.storage.postgres.password = "p@ss/w:rd#1?".to_string();

        let options = config.storage.postgres.connect_options().unwrap();
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_port(), 5432);
        assert_eq!(options.get_username(), "ops@site");
        assert_eq!(options.get_database(), Some("devices-api"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_numeric_override_is_ignored() {
        let mut config = ServiceConfig::default();
        config.apply_overrides_from(|key| (key == "WEBSERVER_PORT").then(|| "eighty".to_string()));
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_url_overrides_fields() {
        let mut config = ServiceConfig::default();
        config.apply_overrides_from(|key| {
            (key == "DEVICES_DATABASE_URL").then(|| "postgres://u@h/db".to_string())
        });
        let options = config.storage.postgres.connect_options().unwrap();
        assert_eq!(options.get_host(), "h");
        assert_eq!(options.get_username(), "u");
        assert_eq!(options.get_database(), Some("db"));
    }

    #[test]
    fn test_unparseable_url_fails_validation() {
        let mut config = ServiceConfig::default();
        config.storage.postgres.url = Some("not a url".to_string());
        assert!(config.validate().is_err());
        assert!(config.storage_backend().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.server.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.storage.postgres.database = String::new();
        assert!(config.validate().is_err());

        // Postgres settings are irrelevant for the memory backend
        config.storage.backend = StorageKind::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_round_trip_of_defaults() {
        let yaml = ServiceConfig::default().to_yaml_string().unwrap();
        assert_eq!(ServiceConfig::from_yaml_str(&yaml).unwrap(), ServiceConfig::default());
    }
}
