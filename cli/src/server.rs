// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! HTTP server wiring for `devreg serve`

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use device_registry_core::application::repository_factory::open_device_repository;
use device_registry_core::application::StandardDeviceService;
use device_registry_core::domain::service_config::ServiceConfig;
use device_registry_core::presentation::api;

pub async fn start_server(config: ServiceConfig, run_migrations: bool) -> Result<()> {
    let backend = config
        .storage_backend()
        .context("Invalid storage configuration")?;
    let (repository, database) = open_device_repository(&backend)
        .await
        .context("Failed to initialize storage")?;

    match (&database, run_migrations) {
        (Some(db), true) => {
            db.migrate().await.context("Failed to apply migrations")?;
            info!("Database migrations applied");
        }
        (None, true) => warn!("--migrate has no effect with in-memory storage"),
        _ => {}
    }

    let service = Arc::new(StandardDeviceService::new(repository));
    let shutdown = CancellationToken::new();
    let request_timeout = config.request_timeout();
    let app = api::app(service, request_timeout, shutdown.clone());

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        address = %addr,
        storage = ?config.storage.backend,
        request_timeout_secs = config.server.request_timeout_secs,
        "Device registry listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(drain_on_signal(shutdown.clone(), request_timeout))
        .await
        .context("HTTP server failed")?;

    shutdown.cancel();
    if let Some(db) = database {
        db.close().await;
    }

    info!("Device registry stopped");
    Ok(())
}

/// Resolves on the first shutdown signal. In-flight requests get `grace` to
/// finish before their storage calls are cancelled.
async fn drain_on_signal(token: CancellationToken, grace: Duration) {
    shutdown_signal().await;
    info!(grace_secs = grace.as_secs(), "Draining in-flight requests");

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        token.cancel();
    });
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
