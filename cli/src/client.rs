// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP client for a running device registry server

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use device_registry_core::presentation::api::{
    CreateDeviceResponse, DeviceRequest, DeviceResponse, ErrorResponse, UpdateDeviceResponse,
};

#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Client for a server bound to `host:port`. A wildcard bind address is
    /// reached through loopback.
    pub fn for_address(host: &str, port: u16) -> Result<Self> {
        let host = match host {
            "0.0.0.0" | "::" | "" => "127.0.0.1",
            other => other,
        };
        Self::new(format!("http://{}:{}", host, port))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("Failed to reach device registry")?;

        parse_json(response, "check health").await
    }

    pub async fn create_device(&self, request: &DeviceRequest) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/devices", self.base_url))
            .json(request)
            .send()
            .await
            .context("Failed to create device")?;

        let created: CreateDeviceResponse = parse_json(response, "create device").await?;
        Ok(created.id)
    }

    pub async fn get_device(&self, id: &str) -> Result<DeviceResponse> {
        let response = self
            .client
            .get(format!("{}/devices/{}", self.base_url, id))
            .send()
            .await
            .context("Failed to get device")?;

        parse_json(response, "get device").await
    }

    /// List devices. `brand` takes precedence over `state` on the server.
    pub async fn list_devices(
        &self,
        brand: Option<&str>,
        state: Option<&str>,
    ) -> Result<Vec<DeviceResponse>> {
        let mut query: Vec<(&str, &str)> = Vec::new();
        if let Some(brand) = brand {
            query.push(("brand", brand));
        }
        if let Some(state) = state {
            query.push(("state", state));
        }

        let response = self
            .client
            .get(format!("{}/devices", self.base_url))
            .query(&query)
            .send()
            .await
            .context("Failed to list devices")?;

        parse_json(response, "list devices").await
    }

    pub async fn update_device(
        &self,
        id: &str,
        request: &DeviceRequest,
    ) -> Result<UpdateDeviceResponse> {
        let response = self
            .client
            .put(format!("{}/devices/{}", self.base_url, id))
            .json(request)
            .send()
            .await
            .context("Failed to update device")?;

        parse_json(response, "update device").await
    }

    pub async fn delete_device(&self, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/devices/{}", self.base_url, id))
            .send()
            .await
            .context("Failed to delete device")?;

        if response.status() != StatusCode::NO_CONTENT && !response.status().is_success() {
            return Err(error_from(response, "delete device").await);
        }
        Ok(())
    }
}

async fn parse_json<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
    if !response.status().is_success() {
        return Err(error_from(response, action).await);
    }

    response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", action))
}

/// Turn a non-success response into an error carrying the server's message
async fn error_from(response: Response, action: &str) -> anyhow::Error {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|e| e.error)
        .unwrap_or(text);

    anyhow::anyhow!("Failed to {}: {} ({})", action, message, status)
}
