// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entry point used by the transports.
//!
//! `Dispatcher` wires the queue manager, delivery coordinator and result
//! reconciler to one storage backend, and adds the operations that combine
//! them with the user directory and device registry: device check-in with
//! first-contact seeding, and user changes that enqueue enrollment commands.

use std::sync::Arc;

use tracing::{error, info};

use attend_config::model::DispatchConfig;
use attend_core::{
    AttendError, CommandLog, CommandRecord, DeviceId, DeviceRegistry, QueueStore, UserDirectory,
    UserRecord, now_timestamp,
};

use crate::delivery::{Delivery, DeliveryCoordinator};
use crate::format::{self, CodeGenerator};
use crate::manager::QueueManager;
use crate::reconcile::{ReconcileOutcome, ResultReconciler, ResultReport};

pub struct Dispatcher {
    manager: QueueManager,
    delivery: DeliveryCoordinator,
    reconciler: ResultReconciler,
    log: Arc<dyn CommandLog>,
    users: Arc<dyn UserDirectory>,
    devices: Arc<dyn DeviceRegistry>,
    codes: CodeGenerator,
    seed_new_devices: bool,
}

impl Dispatcher {
    /// Build every component on top of one backend.
    pub fn new<S>(storage: Arc<S>, config: &DispatchConfig) -> Self
    where
        S: QueueStore + CommandLog + UserDirectory + DeviceRegistry + 'static,
    {
        Self::from_parts(
            storage.clone(),
            storage.clone(),
            storage.clone(),
            storage,
            config,
        )
    }

    /// Build from separate stores. Tests use this to inject failures into
    /// one store only.
    pub fn from_parts(
        queue: Arc<dyn QueueStore>,
        log: Arc<dyn CommandLog>,
        users: Arc<dyn UserDirectory>,
        devices: Arc<dyn DeviceRegistry>,
        config: &DispatchConfig,
    ) -> Self {
        Self {
            manager: QueueManager::new(queue.clone(), log.clone()),
            delivery: DeliveryCoordinator::new(queue, log.clone()),
            reconciler: ResultReconciler::new(log.clone(), config.success_code.clone()),
            log,
            users,
            devices,
            codes: CodeGenerator::new(),
            seed_new_devices: config.seed_new_devices,
        }
    }

    pub fn manager(&self) -> &QueueManager {
        &self.manager
    }

    pub fn log(&self) -> &dyn CommandLog {
        self.log.as_ref()
    }

    pub fn users(&self) -> &dyn UserDirectory {
        self.users.as_ref()
    }

    pub fn devices(&self) -> &dyn DeviceRegistry {
        self.devices.as_ref()
    }

    pub async fn enqueue<P>(&self, payloads: Vec<P>) -> Result<Vec<CommandRecord>, AttendError>
    where
        P: Into<String>,
    {
        self.manager.enqueue(payloads).await
    }

    /// Record a contact from `device`. On first contact, and when enabled,
    /// enqueue enrollment commands for every known user.
    ///
    /// Returns whether this was the first contact. A seeding failure is
    /// logged and does not fail the check-in.
    pub async fn check_in(&self, device: &DeviceId, ip: Option<&str>) -> Result<bool, AttendError> {
        let first_seen = self.devices.touch_device(device, ip).await?;
        if first_seen {
            info!(device = %device, ip = ip.unwrap_or("-"), "new device registered");
            if self.seed_new_devices
                && let Err(e) = self.seed_device(device).await
            {
                error!(device = %device, error = %e, "failed to seed new device");
                attend_prometheus::record_consistency_warning("seed");
            }
        }
        Ok(first_seen)
    }

    /// Enqueue enrollment commands for every user in the directory.
    pub async fn seed_device(&self, device: &DeviceId) -> Result<Vec<CommandRecord>, AttendError> {
        let users = self.users.list_all_users().await?;
        let payloads: Vec<String> = users
            .iter()
            .flat_map(|user| format::enrollment_payloads(&self.codes, user))
            .collect();
        let records = self.manager.enqueue(payloads).await?;
        info!(
            device = %device,
            users = users.len(),
            commands = records.len(),
            "seeded enrollment commands"
        );
        Ok(records)
    }

    /// Touch the device and hand out its next command.
    pub async fn poll(
        &self,
        device: &DeviceId,
        ip: Option<&str>,
    ) -> Result<Option<Delivery>, AttendError> {
        self.check_in(device, ip).await?;
        self.delivery.next_command(device).await
    }

    pub async fn next_command(&self, device: &DeviceId) -> Result<Option<Delivery>, AttendError> {
        self.delivery.next_command(device).await
    }

    pub async fn report_result(
        &self,
        device: &DeviceId,
        code: &str,
        result_code: &str,
    ) -> Result<ReconcileOutcome, AttendError> {
        self.reconciler.report_result(device, code, result_code).await
    }

    /// Reconcile every line of a result upload body.
    pub async fn report_body(
        &self,
        device: &DeviceId,
        body: &str,
    ) -> Result<Vec<ReconcileOutcome>, AttendError> {
        let reports = ResultReport::parse_body(body);
        self.reconciler.report_batch(device, &reports).await
    }

    /// Store a user and enqueue its enrollment commands.
    pub async fn save_user(
        &self,
        pin: &str,
        name: &str,
        photo: Option<String>,
    ) -> Result<(UserRecord, Vec<CommandRecord>), AttendError> {
        format::validate_user(pin, name, photo.as_deref())?;
        let now = now_timestamp();
        let created_at = match self.users.get_user(pin).await? {
            Some(existing) => existing.created_at,
            None => now.clone(),
        };
        let user = UserRecord {
            pin: pin.to_string(),
            name: name.trim().to_string(),
            photo,
            created_at,
            updated_at: now,
        };
        // A failed enqueue must not leave a stored user that no device receives.
        let records = self
            .manager
            .enqueue(format::enrollment_payloads(&self.codes, &user))
            .await?;
        self.users.upsert_user(&user).await?;
        info!(pin, commands = records.len(), "user saved");
        Ok((user, records))
    }

    /// Remove a user and enqueue its deletion.
    pub async fn remove_user(&self, pin: &str) -> Result<CommandRecord, AttendError> {
        if !self.users.delete_user(pin).await? {
            return Err(AttendError::NotFound {
                kind: "user".into(),
                id: pin.to_string(),
            });
        }
        let payload = format::user_delete(&self.codes.next_code(), pin);
        let mut records = self.manager.enqueue(vec![payload]).await?;
        info!(pin, "user removed");
        records
            .pop()
            .ok_or_else(|| AttendError::Internal("enqueue returned no record".into()))
    }
}
