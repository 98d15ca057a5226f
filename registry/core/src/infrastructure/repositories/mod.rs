// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the `DeviceRepository` port defined in
//! the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve `Device` aggregates
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **PostgresDeviceRepository** - `devices` table via `sqlx`
//! - **InMemoryDeviceRepository** - Thread-safe HashMap-backed storage for
//!   development and tests
//!
//! Both return listings ordered by `created_at`, then id.

pub mod postgres_device;

pub use postgres_device::PostgresDeviceRepository;

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::device::{Device, DeviceId, DeviceState};
use crate::domain::repository::{DeviceRepository, RepositoryError};

#[derive(Clone, Default)]
pub struct InMemoryDeviceRepository {
    devices: Arc<RwLock<HashMap<DeviceId, Device>>>,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<P>(&self, predicate: P) -> Vec<Device>
    where
        P: Fn(&Device) -> bool,
    {
        let devices = self.devices.read();
        let mut matched: Vec<Device> = devices.values().filter(|&d| predicate(d)).cloned().collect();
        matched.sort_by(|a, b| a.created_at().cmp(&b.created_at()).then(a.id().cmp(&b.id())));
        matched
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn create(&self, device: &Device) -> Result<(), RepositoryError> {
        let mut devices = self.devices.write();
        if devices.contains_key(&device.id()) {
            return Err(RepositoryError::Database(format!(
                "duplicate device id {}",
                device.id()
            )));
        }
        devices.insert(device.id(), device.clone());
        Ok(())
    }

    async fn update(&self, device: &Device) -> Result<(), RepositoryError> {
        let mut devices = self.devices.write();
        let stored = devices
            .get_mut(&device.id())
            .ok_or_else(|| RepositoryError::NotFound(format!("device {}", device.id())))?;

        // created_at is owned by the stored row
        let created_at = stored.created_at();
        *stored = Device::restore(
            device.id(),
            device.name().to_string(),
            device.brand().to_string(),
            device.state(),
            created_at,
        )
        .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, id: DeviceId) -> Result<(), RepositoryError> {
        let mut devices = self.devices.write();
        devices
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("device {}", id)))
    }

    async fn find_by_id(&self, id: DeviceId) -> Result<Option<Device>, RepositoryError> {
        let devices = self.devices.read();
        Ok(devices.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Device>, RepositoryError> {
        Ok(self.collect(|_| true))
    }

    async fn find_by_brand(&self, brand: &str) -> Result<Vec<Device>, RepositoryError> {
        Ok(self.collect(|d| d.brand() == brand))
    }

    async fn find_by_state(&self, state: DeviceState) -> Result<Vec<Device>, RepositoryError> {
        Ok(self.collect(|d| d.state() == state))
    }
}
