// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for attend.
//!
//! One axum router serves three surfaces: the terminal push protocol under
//! `/iclock`, the bearer-authenticated operator API under `/api`, and the
//! public `/health` and `/metrics` endpoints.

pub mod auth;
pub mod handlers;
pub mod iclock;
pub mod server;

pub use auth::AuthConfig;
pub use handlers::LogQuery;
pub use server::{GatewayState, HealthState, ServerConfig, build_router, start_server};
