// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use attend_core::{AttendError, StorageAdapter};
use attend_dispatch::Dispatcher;

use crate::auth::{AuthConfig, auth_middleware};
use crate::{handlers, iclock};

/// State for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    pub start_time: std::time::Instant,
    /// Renders Prometheus text; `None` when metrics are disabled.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    pub storage: Arc<dyn StorageAdapter>,
}

/// Shared state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: Arc<Dispatcher>,
    pub health: HealthState,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Operator API token (`None` rejects every operator request).
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Build the full router.
///
/// - `/iclock/*`: device push protocol, unauthenticated
/// - `/api/*`: operator API, bearer auth
/// - `/health`, `/metrics`: public
pub fn build_router(state: GatewayState, auth: AuthConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let device_routes = Router::new()
        .route(
            "/iclock/cdata",
            get(iclock::get_handshake).post(iclock::post_upload),
        )
        .route("/iclock/getrequest", get(iclock::get_request))
        .route("/iclock/devicecmd", post(iclock::post_device_cmd))
        .route("/iclock/ping", get(iclock::get_ping))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/queue", get(handlers::get_queue))
        .route(
            "/api/commands",
            get(handlers::list_commands).post(handlers::post_commands),
        )
        .route("/api/commands/{id}", get(handlers::get_command))
        .route(
            "/api/users",
            get(handlers::list_users).post(handlers::post_user),
        )
        .route("/api/users/{pin}", delete(handlers::delete_user))
        .route("/api/devices", get(handlers::list_devices))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(device_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until `cancel` fires, then drain in-flight requests.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), AttendError> {
    let app = build_router(
        state,
        AuthConfig {
            bearer_token: config.bearer_token.clone(),
        },
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AttendError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(cancel.cancelled_owned())
    .await
    .map_err(|e| AttendError::Transport {
        message: format!("gateway server error: {e}"),
        source: Some(Box::new(e)),
    })?;

    tracing::info!("gateway server stopped");
    Ok(())
}
