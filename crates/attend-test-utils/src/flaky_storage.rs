// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage wrapper with switchable failures.
//!
//! `FlakyStorage` delegates every call to a real [`SqliteStorage`] unless the
//! matching failure switch is on, in which case the call returns a storage
//! error without touching the database.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use attend_core::{
    AttendError, CommandId, CommandLog, CommandLogEntry, CommandRecord, CommandStatus, DeviceId,
    DeviceRecord, DeviceRegistry, HealthStatus, LogFilter, QueueStore, StorageAdapter,
    UserDirectory, UserRecord,
};
use attend_storage::SqliteStorage;

pub struct FlakyStorage {
    inner: Arc<SqliteStorage>,
    fail_queue_replace: AtomicBool,
    fail_log_insert: AtomicBool,
    fail_user_reads: AtomicBool,
    fail_result_lookup: AtomicBool,
    replace_calls: AtomicUsize,
    log_insert_calls: AtomicUsize,
}

impl FlakyStorage {
    pub fn new(inner: Arc<SqliteStorage>) -> Self {
        Self {
            inner,
            fail_queue_replace: AtomicBool::new(false),
            fail_log_insert: AtomicBool::new(false),
            fail_user_reads: AtomicBool::new(false),
            fail_result_lookup: AtomicBool::new(false),
            replace_calls: AtomicUsize::new(0),
            log_insert_calls: AtomicUsize::new(0),
        }
    }

    /// Make `QueueStore::replace` fail.
    pub fn fail_queue_replace(&self, fail: bool) {
        self.fail_queue_replace.store(fail, Ordering::SeqCst);
    }

    /// Make `CommandLog::insert_if_absent` fail.
    pub fn fail_log_insert(&self, fail: bool) {
        self.fail_log_insert.store(fail, Ordering::SeqCst);
    }

    /// Make `UserDirectory::list_all_users` fail.
    pub fn fail_user_reads(&self, fail: bool) {
        self.fail_user_reads.store(fail, Ordering::SeqCst);
    }

    /// Make the calls that reconcile a result report fail:
    /// `find_sent_by_device_and_code` and `insert_fallback`.
    pub fn fail_result_lookup(&self, fail: bool) {
        self.fail_result_lookup.store(fail, Ordering::SeqCst);
    }

    /// Number of `replace` calls attempted, failed ones included.
    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    /// Number of `insert_if_absent` calls attempted, failed ones included.
    pub fn log_insert_calls(&self) -> usize {
        self.log_insert_calls.load(Ordering::SeqCst)
    }

    fn injected(what: &str) -> AttendError {
        AttendError::storage(format!("injected {what} failure"))
    }
}

#[async_trait]
impl StorageAdapter for FlakyStorage {
    fn name(&self) -> &str {
        "flaky-sqlite"
    }

    async fn initialize(&self) -> Result<(), AttendError> {
        self.inner.initialize().await
    }

    async fn close(&self) -> Result<(), AttendError> {
        self.inner.close().await
    }

    async fn health_check(&self) -> Result<HealthStatus, AttendError> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl QueueStore for FlakyStorage {
    async fn load(&self) -> Result<Vec<CommandRecord>, AttendError> {
        self.inner.load().await
    }

    async fn replace(&self, records: &[CommandRecord]) -> Result<(), AttendError> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_queue_replace.load(Ordering::SeqCst) {
            return Err(Self::injected("queue replace"));
        }
        self.inner.replace(records).await
    }
}

#[async_trait]
impl CommandLog for FlakyStorage {
    async fn insert_if_absent(&self, record: &CommandRecord) -> Result<bool, AttendError> {
        self.log_insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_log_insert.load(Ordering::SeqCst) {
            return Err(Self::injected("log insert"));
        }
        self.inner.insert_if_absent(record).await
    }

    async fn update_status(
        &self,
        id: &CommandId,
        status: CommandStatus,
        device: &DeviceId,
        at: &str,
    ) -> Result<bool, AttendError> {
        self.inner.update_status(id, status, device, at).await
    }

    async fn find_processed_ids(
        &self,
        device: &DeviceId,
    ) -> Result<HashSet<CommandId>, AttendError> {
        self.inner.find_processed_ids(device).await
    }

    async fn find_sent_by_device_and_code(
        &self,
        device: &DeviceId,
        code: &str,
    ) -> Result<Vec<CommandLogEntry>, AttendError> {
        if self.fail_result_lookup.load(Ordering::SeqCst) {
            return Err(Self::injected("sent lookup"));
        }
        self.inner.find_sent_by_device_and_code(device, code).await
    }

    async fn insert_fallback(
        &self,
        code: &str,
        device: &DeviceId,
        status: CommandStatus,
        at: &str,
    ) -> Result<CommandId, AttendError> {
        if self.fail_result_lookup.load(Ordering::SeqCst) {
            return Err(Self::injected("fallback insert"));
        }
        self.inner.insert_fallback(code, device, status, at).await
    }

    async fn list_entries(&self, filter: &LogFilter) -> Result<Vec<CommandLogEntry>, AttendError> {
        self.inner.list_entries(filter).await
    }

    async fn get_entries(&self, id: &CommandId) -> Result<Vec<CommandLogEntry>, AttendError> {
        self.inner.get_entries(id).await
    }
}

#[async_trait]
impl UserDirectory for FlakyStorage {
    async fn list_all_users(&self) -> Result<Vec<UserRecord>, AttendError> {
        if self.fail_user_reads.load(Ordering::SeqCst) {
            return Err(Self::injected("user directory"));
        }
        self.inner.list_all_users().await
    }

    async fn get_user(&self, pin: &str) -> Result<Option<UserRecord>, AttendError> {
        self.inner.get_user(pin).await
    }

    async fn upsert_user(&self, user: &UserRecord) -> Result<(), AttendError> {
        self.inner.upsert_user(user).await
    }

    async fn delete_user(&self, pin: &str) -> Result<bool, AttendError> {
        self.inner.delete_user(pin).await
    }
}

#[async_trait]
impl DeviceRegistry for FlakyStorage {
    async fn touch_device(&self, device: &DeviceId, ip: Option<&str>) -> Result<bool, AttendError> {
        self.inner.touch_device(device, ip).await
    }

    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, AttendError> {
        self.inner.list_devices().await
    }
}
