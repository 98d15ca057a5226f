// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interface
//!
//! Persistence contract for the `Device` aggregate. The trait lives in the
//! domain layer; implementations live in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `DeviceRepository` | `Device` | `InMemoryDeviceRepository`, `PostgresDeviceRepository` |
//!
//! ## Storage Backend Abstraction
//!
//! The concrete implementation is selected at startup from configuration
//! (`devices-config.yaml`). The in-memory implementation backs development
//! and tests; PostgreSQL backs production.
//!
//! Implementations own connection pooling and must be safe to share across
//! concurrent requests. No locking spans a load followed by a save, so two
//! concurrent updates of the same device resolve as last-writer-wins.

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;

use crate::domain::device::{Device, DeviceId, DeviceState};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

/// Resolved PostgreSQL connection. Credentials are held as discrete options,
/// never spliced into a URL.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connect_options: PgConnectOptions,
    pub max_connections: u32,
}

/// Repository interface for Device aggregates
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Insert a new device. A duplicate id is a storage failure.
    async fn create(&self, device: &Device) -> Result<(), RepositoryError>;

    /// Overwrite name, brand and state of an existing device
    async fn update(&self, device: &Device) -> Result<(), RepositoryError>;

    /// Delete device by ID
    async fn delete(&self, id: DeviceId) -> Result<(), RepositoryError>;

    /// Find device by ID; `None` when no row matches
    async fn find_by_id(&self, id: DeviceId) -> Result<Option<Device>, RepositoryError>;

    /// List all devices
    async fn list_all(&self) -> Result<Vec<Device>, RepositoryError>;

    /// List devices whose brand matches exactly
    async fn find_by_brand(&self, brand: &str) -> Result<Vec<Device>, RepositoryError>;

    /// List devices in the given state
    async fn find_by_state(&self, state: DeviceState) -> Result<Vec<Device>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: RepositoryError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn test_other_sqlx_errors_map_to_database() {
        let err: RepositoryError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, RepositoryError::Database(_)));
    }
}
