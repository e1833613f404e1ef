// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router-level tests for the device transport and the operator API.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use tower::ServiceExt;

use attend_core::QueueStore;
use attend_gateway::{AuthConfig, GatewayState, HealthState, build_router};
use attend_test_utils::TestHarness;

const TOKEN: &str = "test-token";

fn router(h: &TestHarness, token: Option<&str>) -> Router {
    let state = GatewayState {
        dispatcher: Arc::clone(&h.dispatcher),
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render: Some(Arc::new(|| "attend_queue_depth 0\n".to_string())),
            storage: h.storage.clone(),
        },
    };
    build_router(
        state,
        AuthConfig {
            bearer_token: token.map(str::to_string),
        },
    )
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_text(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn authed(method: &str, uri: &str, json: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));
    match json {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn device_poll_cycle_over_http() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));
    h.dispatcher
        .enqueue(vec!["C:X01:DATA USER PIN=7 Name=Ann"])
        .await
        .unwrap();

    let (status, body) = send(&app, get("/iclock/getrequest?SN=D1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "C:X01:DATA USER PIN=7 Name=Ann");

    let (status, body) = send(
        &app,
        post_text("/iclock/devicecmd?SN=D1", "ID=X01&Return=0&CMD=DATA\n"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    let (status, body) = send(&app, get("/iclock/getrequest?SN=D1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    let (_, body) = send(&app, authed("GET", "/api/commands?device=D1&status=executed", None)).await;
    let entries: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn handshake_registers_device_and_returns_options() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));

    let (status, body) = send(&app, get("/iclock/cdata?SN=CKJ1&options=all")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.starts_with("GET OPTION FROM: CKJ1"));

    let (_, body) = send(&app, authed("GET", "/api/devices", None)).await;
    let devices: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(devices[0]["serial"], "CKJ1");
}

#[tokio::test]
async fn handshake_seeds_new_device_from_directory() {
    let h = TestHarness::builder()
        .with_seeding()
        .with_user("7", "Ann", None)
        .build()
        .await
        .unwrap();
    let app = router(&h, Some(TOKEN));

    send(&app, get("/iclock/cdata?SN=NEW")).await;
    let (_, body) = send(&app, get("/iclock/getrequest?SN=NEW")).await;
    assert!(body.contains("DATA UPDATE USERINFO PIN=7\tName=Ann"));
}

#[tokio::test]
async fn missing_serial_is_rejected() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));

    for uri in ["/iclock/getrequest", "/iclock/getrequest?SN=", "/iclock/cdata", "/iclock/ping"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, "ERROR");
    }
    let (status, _) = send(&app, post_text("/iclock/devicecmd", "ID=X&Return=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unmatched_result_still_answers_ok() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));

    let (status, body) = send(
        &app,
        post_text("/iclock/devicecmd?SN=D1", "ID=NOPE&Return=0&CMD=DATA\ngarbage"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn storage_failure_during_result_upload_is_500() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));
    h.dispatcher
        .enqueue(vec!["C:X01:DATA USER PIN=7 Name=Ann"])
        .await
        .unwrap();
    send(&app, get("/iclock/getrequest?SN=D1")).await;

    h.storage.fail_result_lookup(true);
    let (status, body) = send(
        &app,
        post_text("/iclock/devicecmd?SN=D1", "ID=X01&Return=0&CMD=DATA"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "ERROR");

    // The entry is still `sent`, so the device's resend finalizes it.
    h.storage.fail_result_lookup(false);
    let (status, body) = send(
        &app,
        post_text("/iclock/devicecmd?SN=D1", "ID=X01&Return=0&CMD=DATA"),
    )
    .await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));
    let (_, body) = send(&app, authed("GET", "/api/commands?device=D1", None)).await;
    let entries: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(entries[0]["status"], "executed");
}

#[tokio::test]
async fn uploads_and_ping_are_acknowledged() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));

    let (status, body) = send(
        &app,
        post_text("/iclock/cdata?SN=D1&table=ATTLOG", "7\t2026-01-01 08:00:00\t0\t1"),
    )
    .await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));

    let (status, body) = send(&app, get("/iclock/ping?SN=D1")).await;
    assert_eq!((status, body.as_str()), (StatusCode::OK, "OK"));
}

#[tokio::test]
async fn storage_failure_during_poll_is_500() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));
    h.storage.fail_log_insert(true);
    h.dispatcher
        .enqueue(vec!["C:X01:DATA USER PIN=7 Name=Ann"])
        .await
        .unwrap();

    // Delivery must recreate the missing log entry and cannot.
    let (status, body) = send(&app, get("/iclock/getrequest?SN=D1")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "ERROR");
}

#[tokio::test]
async fn operator_api_requires_bearer_token() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));

    let (status, _) = send(&app, get("/api/queue")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::get("/api/queue")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, authed("GET", "/api/queue", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn operator_api_fails_closed_without_token() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, None);

    let (status, _) = send(&app, authed("GET", "/api/queue", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Devices and health stay reachable.
    let (status, _) = send(&app, get("/iclock/ping?SN=D1")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn enqueue_and_inspect_through_api() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));

    let (status, body) = send(
        &app,
        authed(
            "POST",
            "/api/commands",
            Some(serde_json::json!({ "payloads": ["C:X01:DATA USER PIN=7 Name=Ann"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let records: serde_json::Value = serde_json::from_str(&body).unwrap();
    let id = records[0]["id"].as_str().unwrap().to_string();
    assert_eq!(records[0]["category"], "USER_UPSERT");
    assert_eq!(records[0]["target_user"], "7");

    let (_, body) = send(&app, authed("GET", "/api/queue", None)).await;
    let queue: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let (status, body) = send(&app, authed("GET", &format!("/api/commands/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    let entries: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(entries[0]["status"], "pending");

    let (status, _) = send(&app, authed("GET", "/api/commands/unknown", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payload_without_code_header_is_400() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));

    let (status, body) = send(
        &app,
        authed(
            "POST",
            "/api/commands",
            Some(serde_json::json!({ "payloads": ["C:1:REBOOT", "DATA USER PIN=7 Name=Ann"] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("C:<code>:"));
    assert!(h.storage.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn bad_log_filter_is_400() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));
    let (status, body) = send(&app, authed("GET", "/api/commands?status=done", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("unknown status"));
}

#[tokio::test]
async fn user_lifecycle_through_api() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));

    let (status, body) = send(
        &app,
        authed(
            "POST",
            "/api/users",
            Some(serde_json::json!({ "pin": "7", "name": "Ann", "photo": "aGVsbG8=" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let created: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(created["commands"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, authed("GET", "/api/users", None)).await;
    let users: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(users[0]["pin"], "7");

    let (status, body) = send(&app, authed("DELETE", "/api/users/7", None)).await;
    assert_eq!(status, StatusCode::OK);
    let deleted: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(deleted["category"], "USER_DELETE");

    let (status, _) = send(&app, authed("DELETE", "/api/users/7", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        authed(
            "POST",
            "/api/users",
            Some(serde_json::json!({ "pin": "8", "name": "Bo", "photo": "%%%" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_and_metrics_are_public() {
    let h = TestHarness::builder().build().await.unwrap();
    let app = router(&h, Some(TOKEN));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");

    let (status, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("attend_queue_depth"));
}
