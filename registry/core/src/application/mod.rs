// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod context;
pub mod device_service;
pub mod repository_factory;

// Re-export use cases for convenience
pub use context::{Interruption, RequestContext};
pub use device_service::{
    CreateDeviceInput, DeviceService, DeviceServiceError, StandardDeviceService, UpdateDeviceInput,
    UpdatedDevice,
};
