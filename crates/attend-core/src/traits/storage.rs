// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle trait for persistence backends.

use async_trait::async_trait;

use crate::error::AttendError;
use crate::types::HealthStatus;

/// Lifecycle of a storage backend.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Opens the backend and applies migrations.
    async fn initialize(&self) -> Result<(), AttendError>;

    /// Flushes pending writes before shutdown.
    async fn close(&self) -> Result<(), AttendError>;

    /// Cheap liveness check.
    async fn health_check(&self) -> Result<HealthStatus, AttendError>;
}
