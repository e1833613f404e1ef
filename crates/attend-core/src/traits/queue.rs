// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Global queue persistence.

use async_trait::async_trait;

use crate::error::AttendError;
use crate::types::CommandRecord;

/// Durable storage for the global ordered command queue.
///
/// The queue is stored as a single document. Callers serialize their own
/// load-modify-replace cycles; the store only guarantees that one `replace`
/// is atomic.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// The stored queue in insertion order, empty if never written.
    async fn load(&self) -> Result<Vec<CommandRecord>, AttendError>;

    /// Atomically overwrite the whole queue.
    async fn replace(&self, records: &[CommandRecord]) -> Result<(), AttendError>;
}
