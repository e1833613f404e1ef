// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device push protocol endpoints (`/iclock/*`).
//!
//! Terminals identify themselves with the `SN` query parameter and speak
//! plain text. Every successful exchange answers `OK` unless it carries
//! data; failures answer `ERROR` without internal detail.

use std::net::SocketAddr;

use axum::{
    body::to_bytes,
    extract::{ConnectInfo, Query, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, error, warn};

use attend_core::{AttendError, DeviceId, DeviceRegistry};

use crate::server::GatewayState;

/// Sentinel body for "accepted" and "no work".
pub const OK_BODY: &str = "OK";
const ERROR_BODY: &str = "ERROR";
/// Result uploads are a few lines per command.
const MAX_RESULT_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct DeviceQuery {
    #[serde(rename = "SN")]
    pub sn: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
}

impl DeviceQuery {
    fn device(&self) -> Result<DeviceId, AttendError> {
        DeviceId::new(self.sn.clone().unwrap_or_default())
    }
}

/// Plain-text error response; client errors are 400, everything else 500.
fn device_error(err: AttendError) -> Response {
    if err.is_client_error() {
        warn!(error = %err, "rejected device request");
        (StatusCode::BAD_REQUEST, ERROR_BODY).into_response()
    } else {
        error!(error = %err, "device request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, ERROR_BODY).into_response()
    }
}

fn peer_ip(request: &Request) -> Option<String> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Option block returned on check-in.
pub fn handshake_options(sn: &str) -> String {
    [
        format!("GET OPTION FROM: {sn}"),
        "Stamp=9999".into(),
        "OpStamp=9999".into(),
        "PhotoStamp=9999".into(),
        "ErrorDelay=60".into(),
        "Delay=30".into(),
        "TransTimes=00:00;14:05".into(),
        "TransInterval=1".into(),
        "TransFlag=1111000000".into(),
        "Realtime=1".into(),
        "Encrypt=0".into(),
    ]
    .join("\n")
}

/// GET /iclock/cdata
///
/// Check-in. Registers the device and, on first contact, seeds enrollment
/// commands.
pub async fn get_handshake(
    State(state): State<GatewayState>,
    Query(query): Query<DeviceQuery>,
    request: Request,
) -> Response {
    let device = match query.device() {
        Ok(device) => device,
        Err(e) => return device_error(e),
    };
    let ip = peer_ip(&request);
    match state.dispatcher.check_in(&device, ip.as_deref()).await {
        Ok(_) => (StatusCode::OK, handshake_options(device.as_str())).into_response(),
        Err(e) => device_error(e),
    }
}

/// POST /iclock/cdata
///
/// Attendance and operation log uploads. Acknowledged and counted; the
/// content is not stored.
pub async fn post_upload(
    State(state): State<GatewayState>,
    Query(query): Query<DeviceQuery>,
    request: Request,
) -> Response {
    let device = match query.device() {
        Ok(device) => device,
        Err(e) => return device_error(e),
    };
    let ip = peer_ip(&request);
    if let Err(e) = state.dispatcher.devices().touch_device(&device, ip.as_deref()).await {
        return device_error(e);
    }
    attend_prometheus::record_device_upload();
    debug!(
        device = %device,
        table = query.table.as_deref().unwrap_or("-"),
        "device upload acknowledged"
    );
    (StatusCode::OK, OK_BODY).into_response()
}

/// GET /iclock/getrequest
///
/// Poll. Answers the next command payload, or `OK` when there is no work.
pub async fn get_request(
    State(state): State<GatewayState>,
    Query(query): Query<DeviceQuery>,
    request: Request,
) -> Response {
    let device = match query.device() {
        Ok(device) => device,
        Err(e) => return device_error(e),
    };
    let ip = peer_ip(&request);
    match state.dispatcher.poll(&device, ip.as_deref()).await {
        Ok(Some(delivery)) => (StatusCode::OK, delivery.payload).into_response(),
        Ok(None) => (StatusCode::OK, OK_BODY).into_response(),
        Err(e) => device_error(e),
    }
}

/// POST /iclock/devicecmd
///
/// Result upload, one `ID=..&Return=..&CMD=..` line per command. Unmatched
/// or malformed lines are logged and still answered `OK`; a storage failure
/// answers `ERROR` so the device resends.
pub async fn post_device_cmd(
    State(state): State<GatewayState>,
    Query(query): Query<DeviceQuery>,
    request: Request,
) -> Response {
    let device = match query.device() {
        Ok(device) => device,
        Err(e) => return device_error(e),
    };
    let body = match to_bytes(request.into_body(), MAX_RESULT_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return device_error(AttendError::MalformedInput(format!(
                "unreadable result body: {e}"
            )));
        }
    };
    let body = String::from_utf8_lossy(&body);
    match state.dispatcher.report_body(&device, &body).await {
        Ok(outcomes) => {
            debug!(device = %device, reports = outcomes.len(), "result upload processed");
            (StatusCode::OK, OK_BODY).into_response()
        }
        Err(e) => device_error(e),
    }
}

/// GET /iclock/ping
pub async fn get_ping(Query(query): Query<DeviceQuery>) -> Response {
    match query.device() {
        Ok(_) => (StatusCode::OK, OK_BODY).into_response(),
        Err(e) => device_error(e),
    }
}
