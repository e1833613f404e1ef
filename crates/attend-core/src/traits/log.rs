// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command lifecycle ledger.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::AttendError;
use crate::types::{CommandId, CommandLogEntry, CommandRecord, CommandStatus, DeviceId, LogFilter};

/// Durable per-device status ledger for queued commands.
///
/// Entries are keyed by `(command id, device)`. Every status change goes
/// through [`update_status`](CommandLog::update_status), which applies the
/// transition only when [`CommandStatus::can_transition_to`] allows it.
#[async_trait]
pub trait CommandLog: Send + Sync {
    /// Create the undelivered `pending` entry for `record` unless an entry
    /// with the same id already exists. Returns whether a row was inserted.
    async fn insert_if_absent(&self, record: &CommandRecord) -> Result<bool, AttendError>;

    /// Apply a guarded transition for `(id, device)`. Returns `false` when the
    /// guard rejects the transition or the id is unknown.
    async fn update_status(
        &self,
        id: &CommandId,
        status: CommandStatus,
        device: &DeviceId,
        at: &str,
    ) -> Result<bool, AttendError>;

    /// Ids already offered to `device` (sent or terminal).
    async fn find_processed_ids(&self, device: &DeviceId) -> Result<HashSet<CommandId>, AttendError>;

    /// `sent` entries of `device` whose device code matches `code`, most
    /// recently sent first.
    async fn find_sent_by_device_and_code(
        &self,
        device: &DeviceId,
        code: &str,
    ) -> Result<Vec<CommandLogEntry>, AttendError>;

    /// Record a synthetic terminal entry for a result nothing matched.
    async fn insert_fallback(
        &self,
        code: &str,
        device: &DeviceId,
        status: CommandStatus,
        at: &str,
    ) -> Result<CommandId, AttendError>;

    /// Operator listing, newest first.
    async fn list_entries(&self, filter: &LogFilter) -> Result<Vec<CommandLogEntry>, AttendError>;

    /// Every entry recorded for one command id.
    async fn get_entries(&self, id: &CommandId) -> Result<Vec<CommandLogEntry>, AttendError>;
}
