// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator API handlers (`/api/*`) and the public health and metrics
//! endpoints.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use attend_core::{
    AttendError, CommandId, CommandLog, CommandLogEntry, CommandRecord, CommandStatus,
    DeviceRecord, DeviceRegistry, HealthStatus, LogFilter, StorageAdapter, UserDirectory,
    UserRecord,
};
use attend_dispatch::format;

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `AttendError` rendered as a JSON error with a matching status code.
/// Server-side failures never expose their detail.
pub struct ApiError(AttendError);

impl From<AttendError> for ApiError {
    fn from(err: AttendError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AttendError::MalformedInput(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            AttendError::NotFound { .. } => (StatusCode::NOT_FOUND, self.0.to_string()),
            _ => {
                tracing::error!(error = %self.0, "operator request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Request body for POST /api/commands.
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    pub payloads: Vec<String>,
}

/// Request body for POST /api/users.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub pin: String,
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserRecord,
    pub commands: Vec<CommandRecord>,
}

/// Command log filter, shared by `GET /api/commands` and `attend log`.
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub device: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

impl LogQuery {
    pub fn into_filter(self) -> Result<LogFilter, AttendError> {
        let status = self
            .status
            .map(|s| {
                CommandStatus::from_str(&s)
                    .map_err(|_| AttendError::MalformedInput(format!("unknown status `{s}`")))
            })
            .transpose()?;
        if let Some(limit) = self.limit
            && limit <= 0
        {
            return Err(AttendError::MalformedInput("limit must be positive".into()));
        }
        Ok(LogFilter {
            device_id: self.device,
            status,
            limit: self.limit,
        })
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /api/queue
pub async fn get_queue(State(state): State<GatewayState>) -> ApiResult<Vec<CommandRecord>> {
    Ok(Json(state.dispatcher.manager().snapshot().await?))
}

/// POST /api/commands
pub async fn post_commands(
    State(state): State<GatewayState>,
    Json(body): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<Vec<CommandRecord>>), ApiError> {
    format::validate_payloads(&body.payloads)?;
    let records = state.dispatcher.enqueue(body.payloads).await?;
    Ok((StatusCode::CREATED, Json(records)))
}

/// GET /api/commands?device=&status=&limit=
pub async fn list_commands(
    State(state): State<GatewayState>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Vec<CommandLogEntry>> {
    let filter = query.into_filter()?;
    Ok(Json(state.dispatcher.log().list_entries(&filter).await?))
}

/// GET /api/commands/{id}
pub async fn get_command(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<CommandLogEntry>> {
    let entries = state.dispatcher.log().get_entries(&CommandId(id.clone())).await?;
    if entries.is_empty() {
        return Err(AttendError::NotFound {
            kind: "command".into(),
            id,
        }
        .into());
    }
    Ok(Json(entries))
}

/// GET /api/users
pub async fn list_users(State(state): State<GatewayState>) -> ApiResult<Vec<UserRecord>> {
    Ok(Json(state.dispatcher.users().list_all_users().await?))
}

/// POST /api/users
///
/// Stores the user and enqueues its enrollment commands.
pub async fn post_user(
    State(state): State<GatewayState>,
    Json(body): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let (user, commands) = state
        .dispatcher
        .save_user(&body.pin, &body.name, body.photo)
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse { user, commands })))
}

/// DELETE /api/users/{pin}
///
/// Removes the user and enqueues its deletion.
pub async fn delete_user(
    State(state): State<GatewayState>,
    Path(pin): Path<String>,
) -> ApiResult<CommandRecord> {
    Ok(Json(state.dispatcher.remove_user(&pin).await?))
}

/// GET /api/devices
pub async fn list_devices(State(state): State<GatewayState>) -> ApiResult<Vec<DeviceRecord>> {
    Ok(Json(state.dispatcher.devices().list_devices().await?))
}

/// GET /health
pub async fn get_public_health(State(state): State<GatewayState>) -> Response {
    let (code, status) = match state.health.storage.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "healthy".to_string()),
        Ok(HealthStatus::Degraded(reason)) => (StatusCode::OK, format!("degraded: {reason}")),
        Ok(HealthStatus::Unhealthy(reason)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("unhealthy: {reason}"),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy".to_string())
        }
    };
    let body = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
    };
    (code, Json(body)).into_response()
}

/// GET /metrics
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (StatusCode::OK, render()).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
