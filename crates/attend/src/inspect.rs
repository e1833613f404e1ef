// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline queue and log commands: `attend queue`, `attend log`,
//! `attend enqueue`.
//!
//! These open the configured database directly, so they work whether or not
//! a server is running against it.

use std::sync::Arc;

use attend_config::AttendConfig;
use attend_core::{AttendError, CommandLog, StorageAdapter};
use attend_dispatch::{Dispatcher, format};
use attend_gateway::LogQuery;
use attend_storage::SqliteStorage;
use serde::Serialize;

async fn open(config: &AttendConfig) -> Result<Arc<SqliteStorage>, AttendError> {
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    Ok(storage)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, AttendError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| AttendError::Internal(format!("failed to render JSON: {e}")))
}

/// Global queue as pretty JSON.
pub async fn queue_json(config: &AttendConfig) -> Result<String, AttendError> {
    let storage = open(config).await?;
    let dispatcher = Dispatcher::new(storage.clone(), &config.dispatch);
    let queue = dispatcher.manager().snapshot().await?;
    storage.close().await?;
    to_json(&queue)
}

/// Filtered command log as pretty JSON, newest first.
pub async fn log_json(config: &AttendConfig, query: LogQuery) -> Result<String, AttendError> {
    let filter = query.into_filter()?;
    let storage = open(config).await?;
    let entries = storage.list_entries(&filter).await?;
    storage.close().await?;
    to_json(&entries)
}

/// Enqueue payloads and return the new records as pretty JSON.
pub async fn enqueue_json(
    config: &AttendConfig,
    payloads: Vec<String>,
) -> Result<String, AttendError> {
    format::validate_payloads(&payloads)?;
    let storage = open(config).await?;
    let dispatcher = Dispatcher::new(storage.clone(), &config.dispatch);
    let records = dispatcher.enqueue(payloads).await?;
    storage.close().await?;
    to_json(&records)
}

pub async fn run_queue(config: &AttendConfig) -> Result<(), AttendError> {
    println!("{}", queue_json(config).await?);
    Ok(())
}

pub async fn run_log(
    config: &AttendConfig,
    device: Option<String>,
    status: Option<String>,
    limit: Option<i64>,
) -> Result<(), AttendError> {
    let query = LogQuery {
        device,
        status,
        limit,
    };
    println!("{}", log_json(config, query).await?);
    Ok(())
}

pub async fn run_enqueue(config: &AttendConfig, payloads: Vec<String>) -> Result<(), AttendError> {
    println!("{}", enqueue_json(config, payloads).await?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (AttendConfig, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AttendConfig::default();
        config.storage.database_path = dir.path().join("attend.db").to_string_lossy().into_owned();
        (config, dir)
    }

    #[tokio::test]
    async fn enqueue_then_queue_and_log_see_the_command() {
        let (config, _dir) = temp_config();

        let created = enqueue_json(&config, vec!["C:101:DATA DELETE USERINFO PIN=7".into()])
            .await
            .unwrap();
        let created: serde_json::Value = serde_json::from_str(&created).unwrap();
        assert_eq!(created[0]["category"], "USER_DELETE");

        let queue: serde_json::Value =
            serde_json::from_str(&queue_json(&config).await.unwrap()).unwrap();
        assert_eq!(queue.as_array().unwrap().len(), 1);
        assert_eq!(queue[0]["id"], created[0]["id"]);

        let log = log_json(
            &config,
            LogQuery {
                status: Some("pending".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let log: serde_json::Value = serde_json::from_str(&log).unwrap();
        assert_eq!(log[0]["id"], created[0]["id"]);
    }

    #[tokio::test]
    async fn blank_payload_is_rejected_before_touching_storage() {
        let (config, dir) = temp_config();
        let err = enqueue_json(&config, vec!["  ".into()]).await.unwrap_err();
        assert!(matches!(err, AttendError::MalformedInput(_)));
        assert!(!dir.path().join("attend.db").exists());
    }

    #[tokio::test]
    async fn payload_without_code_header_is_rejected() {
        let (config, dir) = temp_config();
        let err = enqueue_json(&config, vec!["C:1:REBOOT".into(), "REBOOT".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, AttendError::MalformedInput(_)));
        assert!(!dir.path().join("attend.db").exists());
    }

    #[tokio::test]
    async fn unknown_status_filter_is_rejected() {
        let (config, _dir) = temp_config();
        let query = LogQuery {
            status: Some("done".into()),
            ..Default::default()
        };
        assert!(log_json(&config, query).await.is_err());
    }
}
