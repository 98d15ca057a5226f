// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Device registry CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Process wiring for `devreg` (server, migrations, HTTP client)

pub mod client;
pub mod commands;
pub mod logging;
pub mod server;
