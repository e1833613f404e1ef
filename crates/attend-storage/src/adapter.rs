// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the storage traits.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use attend_config::model::StorageConfig;
use attend_core::{
    AttendError, CommandId, CommandLog, CommandLogEntry, CommandRecord, CommandStatus, DeviceId,
    DeviceRecord, DeviceRegistry, HealthStatus, LogFilter, QueueStore, StorageAdapter,
    UserDirectory, UserRecord,
};

use crate::database::{Database, checkpoint, map_tr_err};
use crate::queries;

/// SQLite-backed storage.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. The
/// database is opened by [`StorageAdapter::initialize`]; every other call
/// fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, AttendError> {
        self.db
            .get()
            .ok_or_else(|| AttendError::storage("storage not initialized -- call initialize() first"))
    }

    /// Version counter of the stored queue.
    pub async fn queue_version(&self) -> Result<i64, AttendError> {
        queries::queue::version(self.db()?).await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn initialize(&self) -> Result<(), AttendError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| AttendError::storage("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), AttendError> {
        checkpoint(self.db()?.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, AttendError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl QueueStore for SqliteStorage {
    async fn load(&self) -> Result<Vec<CommandRecord>, AttendError> {
        queries::queue::load(self.db()?).await
    }

    async fn replace(&self, records: &[CommandRecord]) -> Result<(), AttendError> {
        queries::queue::replace(self.db()?, records).await
    }
}

#[async_trait]
impl CommandLog for SqliteStorage {
    async fn insert_if_absent(&self, record: &CommandRecord) -> Result<bool, AttendError> {
        queries::command_log::insert_if_absent(self.db()?, record).await
    }

    async fn update_status(
        &self,
        id: &CommandId,
        status: CommandStatus,
        device: &DeviceId,
        at: &str,
    ) -> Result<bool, AttendError> {
        queries::command_log::update_status(self.db()?, id, status, device, at).await
    }

    async fn find_processed_ids(
        &self,
        device: &DeviceId,
    ) -> Result<HashSet<CommandId>, AttendError> {
        queries::command_log::find_processed_ids(self.db()?, device).await
    }

    async fn find_sent_by_device_and_code(
        &self,
        device: &DeviceId,
        code: &str,
    ) -> Result<Vec<CommandLogEntry>, AttendError> {
        queries::command_log::find_sent_by_device_and_code(self.db()?, device, code).await
    }

    async fn insert_fallback(
        &self,
        code: &str,
        device: &DeviceId,
        status: CommandStatus,
        at: &str,
    ) -> Result<CommandId, AttendError> {
        queries::command_log::insert_fallback(self.db()?, code, device, status, at).await
    }

    async fn list_entries(&self, filter: &LogFilter) -> Result<Vec<CommandLogEntry>, AttendError> {
        queries::command_log::list_entries(self.db()?, filter).await
    }

    async fn get_entries(&self, id: &CommandId) -> Result<Vec<CommandLogEntry>, AttendError> {
        queries::command_log::get_entries(self.db()?, id).await
    }
}

#[async_trait]
impl UserDirectory for SqliteStorage {
    async fn list_all_users(&self) -> Result<Vec<UserRecord>, AttendError> {
        queries::users::list_all_users(self.db()?).await
    }

    async fn get_user(&self, pin: &str) -> Result<Option<UserRecord>, AttendError> {
        queries::users::get_user(self.db()?, pin).await
    }

    async fn upsert_user(&self, user: &UserRecord) -> Result<(), AttendError> {
        queries::users::upsert_user(self.db()?, user).await
    }

    async fn delete_user(&self, pin: &str) -> Result<bool, AttendError> {
        queries::users::delete_user(self.db()?, pin).await
    }
}

#[async_trait]
impl DeviceRegistry for SqliteStorage {
    async fn touch_device(&self, device: &DeviceId, ip: Option<&str>) -> Result<bool, AttendError> {
        queries::devices::touch_device(self.db()?, device, ip).await
    }

    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, AttendError> {
        queries::devices::list_devices(self.db()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert_eq!(storage.name(), "sqlite");
        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_reflects_initialization() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn operations_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("uninit.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        let err = storage.load().await.unwrap_err();
        assert!(matches!(err, AttendError::Storage { .. }));
    }

    #[tokio::test]
    async fn queue_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap();
        let record = CommandRecord::from_payload("C:X01:DATA USER PIN=7 Name=Ann");

        {
            let storage = SqliteStorage::new(make_config(path));
            storage.initialize().await.unwrap();
            storage.replace(std::slice::from_ref(&record)).await.unwrap();
            storage.insert_if_absent(&record).await.unwrap();
            storage.close().await.unwrap();
        }

        let storage = SqliteStorage::new(make_config(path));
        storage.initialize().await.unwrap();
        assert_eq!(storage.load().await.unwrap(), vec![record.clone()]);
        assert_eq!(storage.get_entries(&record.id).await.unwrap().len(), 1);
        assert_eq!(storage.queue_version().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delivery_lifecycle_through_adapter() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();

        let device = DeviceId::new("D1").unwrap();
        let record = CommandRecord::from_payload("C:X01:DATA USER PIN=7 Name=Ann");
        assert!(storage.insert_if_absent(&record).await.unwrap());
        assert!(storage
            .update_status(&record.id, CommandStatus::Sent, &device, "t1")
            .await
            .unwrap());
        assert!(storage.find_processed_ids(&device).await.unwrap().contains(&record.id));

        let sent = storage.find_sent_by_device_and_code(&device, "X01").await.unwrap();
        assert_eq!(sent.len(), 1);
        assert!(storage
            .update_status(&record.id, CommandStatus::Executed, &device, "t2")
            .await
            .unwrap());
        assert!(storage
            .find_sent_by_device_and_code(&device, "X01")
            .await
            .unwrap()
            .is_empty());

        storage.close().await.unwrap();
    }
}
