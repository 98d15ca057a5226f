// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Pure types and decision logic. Only the configuration loader touches the
//! filesystem.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Device aggregate, update policy, persistence contract

pub mod device;
pub mod device_policy;
pub mod repository;
pub mod service_config;
