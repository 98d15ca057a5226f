// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Device commands, executed against a running server over HTTP

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use device_registry_core::presentation::api::{DeviceRequest, DeviceResponse};

use crate::client::RegistryClient;

#[derive(Subcommand)]
pub enum DeviceCommand {
    /// List devices, optionally filtered by brand or state
    List {
        /// Exact brand to match (wins over --state)
        #[arg(long)]
        brand: Option<String>,

        /// available, in-use or inactive
        #[arg(long)]
        state: Option<String>,
    },

    /// Show one device
    Get {
        #[arg(value_name = "DEVICE_ID")]
        id: String,
    },

    /// Register a new device
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        brand: String,

        #[arg(long, default_value = "available")]
        state: String,
    },

    /// Update a device; brand and state are ignored while it is in use
    Update {
        #[arg(value_name = "DEVICE_ID")]
        id: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        brand: String,

        #[arg(long)]
        state: String,
    },

    /// Delete a device that is not in use
    Delete {
        #[arg(value_name = "DEVICE_ID")]
        id: String,
    },
}

pub async fn handle_command(command: DeviceCommand, client: RegistryClient) -> Result<()> {
    match command {
        DeviceCommand::List { brand, state } => {
            let devices = client
                .list_devices(brand.as_deref(), state.as_deref())
                .await?;
            print_devices(&devices);
        }
        DeviceCommand::Get { id } => {
            let device = client.get_device(&id).await?;
            print_device(&device);
        }
        DeviceCommand::Create { name, brand, state } => {
            let id = client
                .create_device(&DeviceRequest { name, brand, state })
                .await?;
            println!("{}", format!("✓ Device created: {}", id).green());
        }
        DeviceCommand::Update {
            id,
            name,
            brand,
            state,
        } => {
            let out = client
                .update_device(&id, &DeviceRequest { name, brand, state })
                .await?;
            println!("{}", format!("✓ Device {} updated", id).green());
            println!("  Updated: {}", join_or_none(&out.updated_fields));
            if !out.ignored_fields.is_empty() {
                println!(
                    "  {} {} (device is in use)",
                    "Ignored:".yellow(),
                    out.ignored_fields.join(", ")
                );
            }
            print_device(&out.device);
        }
        DeviceCommand::Delete { id } => {
            client.delete_device(&id).await?;
            println!("{}", format!("✓ Device {} deleted", id).green());
        }
    }

    Ok(())
}

fn join_or_none(fields: &[String]) -> String {
    if fields.is_empty() {
        "(none)".to_string()
    } else {
        fields.join(", ")
    }
}

fn print_devices(devices: &[DeviceResponse]) {
    if devices.is_empty() {
        println!("{}", "No devices found".yellow());
        return;
    }

    println!("{} devices found:", devices.len());
    println!(
        "{:<38} {:<20} {:<16} {:<10} {}",
        "ID", "NAME", "BRAND", "STATE", "CREATED"
    );

    for device in devices {
        println!(
            "{:<38} {:<20} {:<16} {:<10} {}",
            device.id,
            device.name.bold(),
            device.brand,
            device.state,
            device.created_at.to_rfc3339()
        );
    }
}

fn print_device(device: &DeviceResponse) {
    println!("{}", device.name.bold());
    println!("  ID:      {}", device.id);
    println!("  Brand:   {}", device.brand);
    println!("  State:   {}", device.state);
    println!("  Created: {}", device.created_at.to_rfc3339());
}
