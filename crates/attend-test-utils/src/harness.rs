// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end dispatch tests.
//!
//! `TestHarness` opens a temp SQLite database, wraps it in a
//! [`FlakyStorage`] and builds a [`Dispatcher`] on top, so tests can drive
//! the full enqueue, poll and report cycle and switch on storage failures.

use std::sync::Arc;

use attend_config::AttendConfig;
use attend_core::{AttendError, CommandLogEntry, DeviceId, StorageAdapter, UserRecord};
use attend_dispatch::Dispatcher;
use attend_storage::SqliteStorage;

use crate::flaky_storage::FlakyStorage;

/// Builder for test environments.
pub struct TestHarnessBuilder {
    config: AttendConfig,
    users: Vec<UserRecord>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = AttendConfig::default();
        // Seeding is opt-in so tests start from an empty queue.
        config.dispatch.seed_new_devices = false;
        Self {
            config,
            users: Vec::new(),
        }
    }

    /// Enable enrollment seeding for devices seen for the first time.
    pub fn with_seeding(mut self) -> Self {
        self.config.dispatch.seed_new_devices = true;
        self
    }

    pub fn with_success_code(mut self, code: &str) -> Self {
        self.config.dispatch.success_code = code.to_string();
        self
    }

    /// Pre-load a user into the directory without enqueuing anything.
    pub fn with_user(mut self, pin: &str, name: &str, photo: Option<&str>) -> Self {
        self.users.push(UserRecord {
            pin: pin.to_string(),
            name: name.to_string(),
            photo: photo.map(str::to_string),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        });
        self
    }

    pub async fn build(mut self) -> Result<TestHarness, AttendError> {
        let temp_dir = tempfile::TempDir::new().map_err(AttendError::storage)?;
        let db_path = temp_dir.path().join("test.db");
        self.config.storage.database_path = db_path.to_string_lossy().into_owned();

        let sqlite = SqliteStorage::new(self.config.storage.clone());
        sqlite.initialize().await?;
        let storage = Arc::new(FlakyStorage::new(Arc::new(sqlite)));

        for user in &self.users {
            attend_core::UserDirectory::upsert_user(storage.as_ref(), user).await?;
        }

        let dispatcher = Arc::new(Dispatcher::new(storage.clone(), &self.config.dispatch));

        Ok(TestHarness {
            storage,
            dispatcher,
            config: self.config,
            _temp_dir: temp_dir,
        })
    }
}

/// A dispatcher over temp storage, cleaned up on drop.
pub struct TestHarness {
    pub storage: Arc<FlakyStorage>,
    pub dispatcher: Arc<Dispatcher>,
    pub config: AttendConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn device(serial: &str) -> DeviceId {
        match DeviceId::new(serial) {
            Ok(device) => device,
            Err(e) => panic!("invalid test device serial {serial:?}: {e}"),
        }
    }

    /// Payload of the next command for `serial`, if any.
    pub async fn poll(&self, serial: &str) -> Result<Option<String>, AttendError> {
        Ok(self
            .dispatcher
            .next_command(&Self::device(serial))
            .await?
            .map(|delivery| delivery.payload))
    }

    /// Every log entry, newest first.
    pub async fn log_entries(&self) -> Result<Vec<CommandLogEntry>, AttendError> {
        attend_core::CommandLog::list_entries(self.storage.as_ref(), &Default::default()).await
    }
}
