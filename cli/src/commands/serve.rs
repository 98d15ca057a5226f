// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Args;

use device_registry_core::domain::service_config::ServiceConfig;

use crate::server::start_server;

#[derive(Args)]
pub struct ServeCommand {
    /// Apply pending database migrations before accepting requests
    #[arg(long)]
    migrate: bool,
}

pub async fn execute(cmd: ServeCommand, config: ServiceConfig) -> Result<()> {
    config
        .validate()
        .context("Configuration validation failed")?;

    start_server(config, cmd.migrate).await
}
