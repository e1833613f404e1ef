// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User directory.

use async_trait::async_trait;

use crate::error::AttendError;
use crate::types::UserRecord;

/// Users that terminals should know about.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_all_users(&self) -> Result<Vec<UserRecord>, AttendError>;

    async fn get_user(&self, pin: &str) -> Result<Option<UserRecord>, AttendError>;

    /// Insert or update by pin.
    async fn upsert_user(&self, user: &UserRecord) -> Result<(), AttendError>;

    /// Returns whether a user was removed.
    async fn delete_user(&self, pin: &str) -> Result<bool, AttendError>;
}
