// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end lifecycle tests for the device service over the in-memory
//! repository: create, update under the in-use rules, delete protection,
//! listing filters, and deadline/cancellation of persistence calls.

use async_trait::async_trait;
use device_registry_core::application::{
    CreateDeviceInput, DeviceService, DeviceServiceError, Interruption, RequestContext,
    StandardDeviceService, UpdateDeviceInput,
};
use device_registry_core::domain::device::{Device, DeviceError, DeviceId, DeviceState};
use device_registry_core::domain::device_policy::DeviceField;
use device_registry_core::domain::repository::{DeviceRepository, RepositoryError};
use device_registry_core::infrastructure::repositories::InMemoryDeviceRepository;
use std::sync::Arc;
use std::time::Duration;

fn new_service() -> StandardDeviceService {
    StandardDeviceService::new(Arc::new(InMemoryDeviceRepository::new()))
}

fn create_input(name: &str, brand: &str, state: &str) -> CreateDeviceInput {
    CreateDeviceInput {
        name: name.to_string(),
        brand: brand.to_string(),
        state: state.to_string(),
    }
}

fn update_input(id: DeviceId, name: &str, brand: &str, state: &str) -> UpdateDeviceInput {
    UpdateDeviceInput {
        id: id.to_string(),
        name: name.to_string(),
        brand: brand.to_string(),
        state: state.to_string(),
    }
}

#[tokio::test]
async fn test_full_lifecycle() {
    let service = new_service();
    let ctx = RequestContext::background();

    let id = service
        .create_device(&ctx, create_input("A", "X", "available"))
        .await
        .unwrap();
    let created = service.get_device_by_id(&ctx, &id.to_string()).await.unwrap();
    assert_eq!(created.state(), DeviceState::Available);

    // Put it in use
    let out = service
        .update_device(&ctx, update_input(id, "A", "X", "in-use"))
        .await
        .unwrap();
    assert_eq!(out.updated_fields, vec![DeviceField::State]);

    // While in use only the name moves
    let out = service
        .update_device(&ctx, update_input(id, "B", "Y", "inactive"))
        .await
        .unwrap();
    assert_eq!(out.updated_fields, vec![DeviceField::Name]);
    assert_eq!(out.ignored_fields, vec![DeviceField::Brand, DeviceField::State]);

    let stored = service.get_device_by_id(&ctx, &id.to_string()).await.unwrap();
    assert_eq!(stored.name(), "B");
    assert_eq!(stored.brand(), "X");
    assert_eq!(stored.state(), DeviceState::InUse);
    assert_eq!(stored.created_at(), created.created_at());

    // Deleting in use fails and leaves the device in place
    let err = service.delete_device(&ctx, &id.to_string()).await.unwrap_err();
    assert!(matches!(err, DeviceServiceError::Device(DeviceError::DeleteInUse)));
    assert!(service.get_device_by_id(&ctx, &id.to_string()).await.is_ok());

    // An in-use device cannot be moved out of use, so it stays protected
    let out = service
        .update_device(&ctx, update_input(id, "B", "X", "available"))
        .await
        .unwrap();
    assert!(out.updated_fields.is_empty());
    assert_eq!(out.ignored_fields, vec![DeviceField::State]);
    assert_eq!(out.device.state(), DeviceState::InUse);

    let err = service.delete_device(&ctx, &id.to_string()).await.unwrap_err();
    assert!(matches!(err, DeviceServiceError::Device(DeviceError::DeleteInUse)));

    // Devices that were never in use delete normally
    let spare = service
        .create_device(&ctx, create_input("C", "Z", "inactive"))
        .await
        .unwrap();
    service.delete_device(&ctx, &spare.to_string()).await.unwrap();

    let err = service.get_device_by_id(&ctx, &spare.to_string()).await.unwrap_err();
    assert!(matches!(err, DeviceServiceError::NotFound(_)));
}

#[tokio::test]
async fn test_noop_update_reports_nothing() {
    let service = new_service();
    let ctx = RequestContext::background();

    let id = service
        .create_device(&ctx, create_input("A", "X", "in-use"))
        .await
        .unwrap();

    let out = service
        .update_device(&ctx, update_input(id, "A", "X", "in-use"))
        .await
        .unwrap();
    assert!(out.updated_fields.is_empty());
    assert!(out.ignored_fields.is_empty());
}

#[tokio::test]
async fn test_listing_filters() {
    let service = new_service();
    let ctx = RequestContext::background();

    service.create_device(&ctx, create_input("iPhone", "Apple", "available")).await.unwrap();
    service.create_device(&ctx, create_input("iPad", "Apple", "in-use")).await.unwrap();
    service.create_device(&ctx, create_input("Pixel", "Google", "inactive")).await.unwrap();

    assert_eq!(service.get_devices(&ctx).await.unwrap().len(), 3);

    let apple = service.get_devices_by_brand(&ctx, "Apple").await.unwrap();
    assert_eq!(apple.len(), 2);
    assert!(apple.iter().all(|d| d.brand() == "Apple"));

    let inactive = service.get_devices_by_state(&ctx, "inactive").await.unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].name(), "Pixel");

    assert!(service.get_devices_by_brand(&ctx, "Samsung").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_updates_last_writer_wins() {
    let service = Arc::new(new_service());
    let ctx = RequestContext::background();

    let id = service
        .create_device(&ctx, create_input("A", "X", "available"))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for name in ["first", "second"] {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .update_device(
                    &RequestContext::background(),
                    update_input(id, name, "X", "available"),
                )
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = service.get_device_by_id(&ctx, &id.to_string()).await.unwrap();
    assert!(stored.name() == "first" || stored.name() == "second");
}

/// Repository whose calls never finish before the test clock moves on
struct SlowRepository {
    inner: InMemoryDeviceRepository,
    delay: Duration,
}

#[async_trait]
impl DeviceRepository for SlowRepository {
    async fn create(&self, device: &Device) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.create(device).await
    }

    async fn update(&self, device: &Device) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.update(device).await
    }

    async fn delete(&self, id: DeviceId) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(id).await
    }

    async fn find_by_id(&self, id: DeviceId) -> Result<Option<Device>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_id(id).await
    }

    async fn list_all(&self) -> Result<Vec<Device>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_all().await
    }

    async fn find_by_brand(&self, brand: &str) -> Result<Vec<Device>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_brand(brand).await
    }

    async fn find_by_state(&self, state: DeviceState) -> Result<Vec<Device>, RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_by_state(state).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_deadline_abandons_slow_create() {
    let inner = InMemoryDeviceRepository::new();
    let service = StandardDeviceService::new(Arc::new(SlowRepository {
        inner: inner.clone(),
        delay: Duration::from_secs(30),
    }));

    let ctx = RequestContext::with_timeout(Duration::from_secs(1));
    let err = service
        .create_device(&ctx, create_input("A", "X", "available"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DeviceServiceError::Interrupted(Interruption::DeadlineExceeded)
    ));
    assert!(inner.list_all().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_abandons_slow_listing() {
    let service = StandardDeviceService::new(Arc::new(SlowRepository {
        inner: InMemoryDeviceRepository::new(),
        delay: Duration::from_secs(30),
    }));

    let ctx = RequestContext::background();
    let token = ctx.cancellation().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        token.cancel();
    });

    let err = service.get_devices(&ctx).await.unwrap_err();
    assert!(matches!(err, DeviceServiceError::Interrupted(Interruption::Cancelled)));
}
