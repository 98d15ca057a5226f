// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Device Registry Core
//!
//! Tracks physical devices through a create/read/update/delete lifecycle and
//! enforces the rules that restrict what may change while a device is in use.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain entity, update policy, orchestration and adapters
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`domain`] | `Device` entity, update policy, persistence port, configuration |
//! | [`application`] | Use-case sequencing (load, decide, persist) |
//! | [`infrastructure`] | In-memory and PostgreSQL repository adapters |
//! | [`presentation`] | Axum HTTP surface |

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
