// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Device Service
//!
//! Application service sequencing the device use cases around the
//! persistence port.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Load, decide, persist
//! - **Collaborators:**
//!   - Domain: `Device` aggregate, `device_policy`
//!   - Infrastructure: any `DeviceRepository`
//!
//! # Flow (update)
//!
//! 1. Parse the identifier
//! 2. Load the stored device (absent → `NotFound`)
//! 3. Run the update policy against the requested triple
//! 4. Re-validate the mutated device
//! 5. Persist and return the device with its updated/ignored field lists
//!
//! # Error Handling
//!
//! Every failure is returned to the caller as a `DeviceServiceError`; none
//! are logged here. Repository failures other than not-found pass through
//! untouched in `DeviceServiceError::Repository`.
//!
//! # Concurrency
//!
//! Nothing locks the device between load and persist. Two concurrent updates
//! of the same id both succeed and the later write wins.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::application::context::{Interruption, RequestContext};
use crate::domain::device::{Device, DeviceError, DeviceId, DeviceState};
use crate::domain::device_policy::{self, DeviceField, UpdateRequest};
use crate::domain::repository::{DeviceRepository, RepositoryError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceInput {
    pub name: String,
    pub brand: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDeviceInput {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub state: String,
}

/// Result of an update: the persisted device plus what happened per field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedDevice {
    pub device: Device,
    pub updated_fields: Vec<DeviceField>,
    pub ignored_fields: Vec<DeviceField>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceServiceError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("device id {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Interrupted(#[from] Interruption),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl DeviceServiceError {
    fn from_storage(id: DeviceId, err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => Self::NotFound(id.to_string()),
            other => Self::Repository(other),
        }
    }
}

#[async_trait]
pub trait DeviceService: Send + Sync {
    /// Create a device and return its generated identifier
    async fn create_device(
        &self,
        ctx: &RequestContext,
        input: CreateDeviceInput,
    ) -> Result<DeviceId, DeviceServiceError>;

    /// Apply an update request under the in-use rules
    async fn update_device(
        &self,
        ctx: &RequestContext,
        input: UpdateDeviceInput,
    ) -> Result<UpdatedDevice, DeviceServiceError>;

    /// Delete a device that is not in use
    async fn delete_device(&self, ctx: &RequestContext, id: &str) -> Result<(), DeviceServiceError>;

    async fn get_device_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Device, DeviceServiceError>;

    async fn get_devices(&self, ctx: &RequestContext) -> Result<Vec<Device>, DeviceServiceError>;

    async fn get_devices_by_brand(
        &self,
        ctx: &RequestContext,
        brand: &str,
    ) -> Result<Vec<Device>, DeviceServiceError>;

    /// `state` must be one of the known textual forms
    async fn get_devices_by_state(
        &self,
        ctx: &RequestContext,
        state: &str,
    ) -> Result<Vec<Device>, DeviceServiceError>;
}

/// Standard implementation of DeviceService
pub struct StandardDeviceService {
    repository: Arc<dyn DeviceRepository>,
}

impl StandardDeviceService {
    pub fn new(repository: Arc<dyn DeviceRepository>) -> Self {
        Self { repository }
    }

    async fn load(&self, ctx: &RequestContext, id: DeviceId) -> Result<Device, DeviceServiceError> {
        match ctx.run(self.repository.find_by_id(id)).await? {
            Ok(Some(device)) => Ok(device),
            Ok(None) => Err(DeviceServiceError::NotFound(id.to_string())),
            Err(e) => Err(DeviceServiceError::from_storage(id, e)),
        }
    }
}

#[async_trait]
impl DeviceService for StandardDeviceService {
    async fn create_device(
        &self,
        ctx: &RequestContext,
        input: CreateDeviceInput,
    ) -> Result<DeviceId, DeviceServiceError> {
        let device = Device::new("", input.name, input.brand, &input.state, None)?;
        let id = device.id();

        debug!(device_id = %id, brand = %device.brand(), state = %device.state(), "Creating device");

        ctx.run(self.repository.create(&device))
            .await?
            .map_err(DeviceServiceError::Repository)?;

        info!(device_id = %id, "Device created");
        Ok(id)
    }

    async fn update_device(
        &self,
        ctx: &RequestContext,
        input: UpdateDeviceInput,
    ) -> Result<UpdatedDevice, DeviceServiceError> {
        let id = DeviceId::from_string(&input.id)?;
        let mut device = self.load(ctx, id).await?;

        let request = UpdateRequest {
            name: input.name,
            brand: input.brand,
            state: input.state,
        };
        let outcome = device_policy::plan_update(&mut device, &request)?;
        device.validate()?;

        ctx.run(self.repository.update(&device))
            .await?
            .map_err(|e| DeviceServiceError::from_storage(id, e))?;

        info!(
            device_id = %id,
            updated = ?outcome.updated,
            ignored = ?outcome.ignored,
            "Device updated"
        );

        Ok(UpdatedDevice {
            device,
            updated_fields: outcome.updated,
            ignored_fields: outcome.ignored,
        })
    }

    async fn delete_device(&self, ctx: &RequestContext, id: &str) -> Result<(), DeviceServiceError> {
        let id = DeviceId::from_string(id)?;
        let device = self.load(ctx, id).await?;

        device_policy::ensure_deletable(&device)?;

        ctx.run(self.repository.delete(id))
            .await?
            .map_err(|e| DeviceServiceError::from_storage(id, e))?;

        info!(device_id = %id, "Device deleted");
        Ok(())
    }

    async fn get_device_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Device, DeviceServiceError> {
        let id = DeviceId::from_string(id)?;
        self.load(ctx, id).await
    }

    async fn get_devices(&self, ctx: &RequestContext) -> Result<Vec<Device>, DeviceServiceError> {
        let devices = ctx
            .run(self.repository.list_all())
            .await?
            .map_err(DeviceServiceError::Repository)?;

        debug!(count = devices.len(), "Listed devices");
        Ok(devices)
    }

    async fn get_devices_by_brand(
        &self,
        ctx: &RequestContext,
        brand: &str,
    ) -> Result<Vec<Device>, DeviceServiceError> {
        let devices = ctx
            .run(self.repository.find_by_brand(brand))
            .await?
            .map_err(DeviceServiceError::Repository)?;

        debug!(brand = %brand, count = devices.len(), "Listed devices by brand");
        Ok(devices)
    }

    async fn get_devices_by_state(
        &self,
        ctx: &RequestContext,
        state: &str,
    ) -> Result<Vec<Device>, DeviceServiceError> {
        let state = DeviceState::parse(state)?;
        let devices = ctx
            .run(self.repository.find_by_state(state))
            .await?
            .map_err(DeviceServiceError::Repository)?;

        debug!(state = %state, count = devices.len(), "Listed devices by state");
        Ok(devices)
    }
}
