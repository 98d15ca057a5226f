// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Device HTTP API
//!
//! | Method | Path | Success |
//! |--------|------|---------|
//! | `POST` | `/devices` | 201 `{id}` |
//! | `GET` | `/devices` (optional `brand` or `state` query) | 200 list |
//! | `GET` | `/devices/{id}` | 200 device |
//! | `PUT` | `/devices/{id}` | 200 `{updated_fields, ignored_fields, device}` |
//! | `DELETE` | `/devices/{id}` | 204 |
//! | `GET` | `/health` | 200 |
//! | `GET` | `/api-docs/openapi.json` | 200 OpenAPI 3.1 document |
//!
//! Every error body is `{"error": "..."}`. Each request gets a deadline of
//! the configured request timeout and is cancelled with the server's
//! shutdown token.

use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::application::context::RequestContext;
use crate::application::device_service::{
    CreateDeviceInput, DeviceService, DeviceServiceError, UpdateDeviceInput, UpdatedDevice,
};
use crate::domain::device::{Device, DeviceError};
use crate::domain::device_policy::DeviceField;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct AppState {
    pub device_service: Arc<dyn DeviceService>,
    pub request_timeout: Duration,
    pub shutdown: CancellationToken,
    pub started_at: Instant,
}

impl AppState {
    fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(self.request_timeout)
            .with_cancellation(self.shutdown.child_token())
    }
}

pub fn app(
    service: Arc<dyn DeviceService>,
    request_timeout: Duration,
    shutdown: CancellationToken,
) -> Router {
    let state = Arc::new(AppState {
        device_service: service,
        request_timeout,
        shutdown,
        started_at: Instant::now(),
    });

    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/devices", get(list_devices).post(create_device))
        .route(
            "/devices/{id}",
            get(get_device).put(update_device).delete(delete_device),
        )
        .with_state(state)
        // Layers run bottom-up: the request id is set before the trace span
        // opens, and panics are caught inside the span.
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// OpenAPI description of the device routes
#[derive(OpenApi)]
#[openapi(
    info(title = "Device Registry API", description = "Manage devices and their usage state"),
    paths(create_device, list_devices, get_device, update_device, delete_device),
    components(schemas(
        DeviceRequest,
        CreateDeviceResponse,
        DeviceResponse,
        UpdateDeviceResponse,
        ErrorResponse
    )),
    tags((name = "devices", description = "Device CRUD under the in-use rules"))
)]
pub struct ApiDoc;

// ============================================================================
// DTOs
// ============================================================================

/// Body of `POST /devices` and `PUT /devices/{id}`. Missing fields decode as
/// empty strings and are rejected by [`DeviceRequest::require_all`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DeviceRequest {
    #[serde(default)]
    #[schema(example = "iPhone")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "Apple")]
    pub brand: String,
    /// available, in-use or inactive
    #[serde(default)]
    #[schema(example = "available")]
    pub state: String,
}

impl DeviceRequest {
    fn require_all(&self) -> Result<(), ApiError> {
        if self.name.is_empty() || self.brand.is_empty() || self.state.is_empty() {
            return Err(ApiError::BadRequest(
                "name, brand and state are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateDeviceResponse {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeviceResponse {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Device> for DeviceResponse {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id().to_string(),
            name: device.name().to_string(),
            brand: device.brand().to_string(),
            state: device.state().to_string(),
            created_at: device.created_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateDeviceResponse {
    pub updated_fields: Vec<String>,
    pub ignored_fields: Vec<String>,
    pub device: DeviceResponse,
}

impl From<UpdatedDevice> for UpdateDeviceResponse {
    fn from(out: UpdatedDevice) -> Self {
        let names = |fields: Vec<DeviceField>| -> Vec<String> {
            fields.iter().map(|f| f.to_string()).collect()
        };
        Self {
            updated_fields: names(out.updated_fields),
            ignored_fields: names(out.ignored_fields),
            device: DeviceResponse::from(&out.device),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListDevicesQuery {
    /// Exact brand match; wins over `state`
    pub brand: Option<String>,
    /// available, in-use or inactive
    pub state: Option<String>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Service(DeviceServiceError),
}

impl From<DeviceServiceError> for ApiError {
    fn from(err: DeviceServiceError) -> Self {
        ApiError::Service(err)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Service(err) => match err {
                DeviceServiceError::Device(DeviceError::DeleteInUse) => (
                    StatusCode::CONFLICT,
                    "device is in use and cannot be deleted".to_string(),
                ),
                DeviceServiceError::Device(e) => (StatusCode::BAD_REQUEST, e.to_string()),
                DeviceServiceError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
                DeviceServiceError::Interrupted(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "timeout".to_string())
                }
                DeviceServiceError::Repository(e) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_message();
        (status, Json(ErrorResponse { error })).into_response()
    }
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(panic = %detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal server error".to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[utoipa::path(
    post,
    path = "/devices",
    tag = "devices",
    request_body = DeviceRequest,
    responses(
        (status = 201, description = "Device created", body = CreateDeviceResponse),
        (status = 400, description = "Missing or invalid field", body = ErrorResponse),
        (status = 503, description = "Request deadline exceeded", body = ErrorResponse)
    )
)]
async fn create_device(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeviceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateDeviceResponse>), ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::BadRequest("invalid JSON body".to_string()))?;
    body.require_all()?;

    let ctx = state.request_context();
    let id = state
        .device_service
        .create_device(
            &ctx,
            CreateDeviceInput {
                name: body.name,
                brand: body.brand,
                state: body.state,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateDeviceResponse { id: id.to_string() }),
    ))
}

#[utoipa::path(
    get,
    path = "/devices",
    tag = "devices",
    params(ListDevicesQuery),
    responses(
        (status = 200, description = "Matching devices", body = Vec<DeviceResponse>),
        (status = 400, description = "Unknown state filter", body = ErrorResponse)
    )
)]
async fn list_devices(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ListDevicesQuery>, QueryRejection>,
) -> Result<Json<Vec<DeviceResponse>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let ctx = state.request_context();
    let service = &state.device_service;

    let brand = query.brand.filter(|b| !b.is_empty());
    let filter_state = query.state.filter(|s| !s.is_empty());

    // brand wins when both filters are given
    let devices = match (brand, filter_state) {
        (Some(brand), _) => service.get_devices_by_brand(&ctx, &brand).await?,
        (None, Some(s)) => service.get_devices_by_state(&ctx, &s).await?,
        (None, None) => service.get_devices(&ctx).await?,
    };

    Ok(Json(devices.iter().map(DeviceResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/devices/{id}",
    tag = "devices",
    params(("id" = String, Path, description = "Device UUID")),
    responses(
        (status = 200, description = "Device found", body = DeviceResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "No such device", body = ErrorResponse)
    )
)]
async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeviceResponse>, ApiError> {
    let ctx = state.request_context();
    let device = state.device_service.get_device_by_id(&ctx, &id).await?;
    Ok(Json(DeviceResponse::from(&device)))
}

#[utoipa::path(
    put,
    path = "/devices/{id}",
    tag = "devices",
    params(("id" = String, Path, description = "Device UUID")),
    request_body = DeviceRequest,
    responses(
        (status = 200, description = "Applied and ignored fields", body = UpdateDeviceResponse),
        (status = 400, description = "Missing or invalid field", body = ErrorResponse),
        (status = 404, description = "No such device", body = ErrorResponse)
    )
)]
async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<DeviceRequest>, JsonRejection>,
) -> Result<Json<UpdateDeviceResponse>, ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::BadRequest("invalid JSON body".to_string()))?;
    body.require_all()?;

    let ctx = state.request_context();
    let updated = state
        .device_service
        .update_device(
            &ctx,
            UpdateDeviceInput {
                id,
                name: body.name,
                brand: body.brand,
                state: body.state,
            },
        )
        .await?;

    Ok(Json(UpdateDeviceResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/devices/{id}",
    tag = "devices",
    params(("id" = String, Path, description = "Device UUID")),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 404, description = "No such device", body = ErrorResponse),
        (status = 409, description = "Device is in use", body = ErrorResponse)
    )
)]
async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let ctx = state.request_context();
    state.device_service.delete_device(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
