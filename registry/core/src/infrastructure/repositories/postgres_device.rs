// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Device Repository
//!
//! Production `DeviceRepository` backed by the `devices` table via `sqlx`.
//! State is stored as its textual form (`available`, `in-use`, `inactive`).
//! `created_at` is written once on insert and never touched by updates.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};

use crate::domain::device::{Device, DeviceId, DeviceState};
use crate::domain::repository::{DeviceRepository, RepositoryError};

const SELECT_DEVICES: &str = "SELECT id, name, brand, state, created_at FROM devices";

pub struct PostgresDeviceRepository {
    pool: PgPool,
}

impl PostgresDeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_devices(
        &self,
        query: Query<'_, Postgres, PgArguments>,
    ) -> Result<Vec<Device>, RepositoryError> {
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to list devices: {}", e)))?;

        rows.iter().map(parse_device_row).collect()
    }
}

fn parse_device_row(row: &PgRow) -> Result<Device, RepositoryError> {
    let id: uuid::Uuid = row.try_get("id")?;
    let name: String = row.try_get("name")?;
    let brand: String = row.try_get("brand")?;
    let state_str: String = row.try_get("state")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    let state = DeviceState::parse(&state_str)
        .map_err(|e| RepositoryError::Serialization(format!("device {}: {}", id, e)))?;

    Device::restore(DeviceId(id), name, brand, state, created_at)
        .map_err(|e| RepositoryError::Serialization(format!("device {}: {}", id, e)))
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    async fn create(&self, device: &Device) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO devices (id, name, brand, state, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(device.id().0)
        .bind(device.name())
        .bind(device.brand())
        .bind(device.state().as_str())
        .bind(device.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to create device: {}", e)))?;

        Ok(())
    }

    async fn update(&self, device: &Device) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE devices
            SET name = $2, brand = $3, state = $4
            WHERE id = $1
            "#,
        )
        .bind(device.id().0)
        .bind(device.name())
        .bind(device.brand())
        .bind(device.state().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Database(format!("Failed to update device: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("device {}", device.id())));
        }

        Ok(())
    }

    async fn delete(&self, id: DeviceId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to delete device: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("device {}", id)));
        }

        Ok(())
    }

    async fn find_by_id(&self, id: DeviceId) -> Result<Option<Device>, RepositoryError> {
        let sql = format!("{SELECT_DEVICES} WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Database(e.to_string()))?;

        row.as_ref().map(parse_device_row).transpose()
    }

    async fn list_all(&self) -> Result<Vec<Device>, RepositoryError> {
        let sql = format!("{SELECT_DEVICES} ORDER BY created_at, id");
        self.fetch_devices(sqlx::query(&sql)).await
    }

    async fn find_by_brand(&self, brand: &str) -> Result<Vec<Device>, RepositoryError> {
        let sql = format!("{SELECT_DEVICES} WHERE brand = $1 ORDER BY created_at, id");
        self.fetch_devices(sqlx::query(&sql).bind(brand.to_string())).await
    }

    async fn find_by_state(&self, state: DeviceState) -> Result<Vec<Device>, RepositoryError> {
        let sql = format!("{SELECT_DEVICES} WHERE state = $1 ORDER BY created_at, id");
        self.fetch_devices(sqlx::query(&sql).bind(state.as_str())).await
    }
}
