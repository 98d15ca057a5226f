// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Factory - Application Layer
//!
//! Creates the concrete `DeviceRepository` for the configured storage
//! backend. The domain only sees the trait; this is the one place that
//! names the infrastructure types.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Storage backend selection

use std::sync::Arc;

use crate::domain::repository::{DeviceRepository, StorageBackend};
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::postgres_device::PostgresDeviceRepository;
use crate::infrastructure::repositories::InMemoryDeviceRepository;

/// Creates a DeviceRepository implementation based on the configured backend.
///
/// The PostgreSQL backend needs an open `Database`.
pub fn create_device_repository(
    backend: &StorageBackend,
    database: Option<&Database>,
) -> anyhow::Result<Arc<dyn DeviceRepository>> {
    match (backend, database) {
        (StorageBackend::InMemory, _) => Ok(Arc::new(InMemoryDeviceRepository::new())),
        (StorageBackend::PostgreSQL(_), Some(db)) => {
            Ok(Arc::new(PostgresDeviceRepository::new(db.get_pool().clone())))
        }
        (StorageBackend::PostgreSQL(_), None) => {
            anyhow::bail!("PostgreSQL storage selected but no database connection was opened")
        }
    }
}

/// Open whatever the backend needs and build the repository.
///
/// Returns the `Database` alongside so callers can run migrations or close
/// the pool on shutdown.
pub async fn open_device_repository(
    backend: &StorageBackend,
) -> anyhow::Result<(Arc<dyn DeviceRepository>, Option<Database>)> {
    match backend {
        StorageBackend::InMemory => Ok((create_device_repository(backend, None)?, None)),
        StorageBackend::PostgreSQL(cfg) => {
            let db = Database::new(cfg.connect_options.clone(), cfg.max_connections).await?;
            let repo = create_device_repository(backend, Some(&db))?;
            Ok((repo, Some(db)))
        }
    }
}
