// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-device delivery of queued commands.

use std::sync::Arc;

use tracing::{debug, info};

use attend_core::{
    AttendError, CommandId, CommandLog, CommandStatus, DeviceId, QueueStore, now_timestamp,
};

/// A command handed to a polling device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: CommandId,
    pub payload: String,
}

/// Picks the next command a device has not been offered yet and marks it
/// `sent` for that device. Reads the queue, never writes it.
pub struct DeliveryCoordinator {
    queue: Arc<dyn QueueStore>,
    log: Arc<dyn CommandLog>,
}

impl DeliveryCoordinator {
    pub fn new(queue: Arc<dyn QueueStore>, log: Arc<dyn CommandLog>) -> Self {
        Self { queue, log }
    }

    /// Next undelivered command for `device` in queue order, or `None` when
    /// the device has seen everything.
    ///
    /// If a concurrent poll from the same device claims a record first, the
    /// scan moves on to the next unseen one.
    pub async fn next_command(&self, device: &DeviceId) -> Result<Option<Delivery>, AttendError> {
        let queue = self.queue.load().await?;
        let processed = self.log.find_processed_ids(device).await?;

        for record in queue.iter().filter(|r| !processed.contains(&r.id)) {
            // Heals a pending entry lost by a failed best-effort write.
            if self.log.insert_if_absent(record).await? {
                debug!(command_id = %record.id, "recreated missing pending log entry");
            }

            let now = now_timestamp();
            if self
                .log
                .update_status(&record.id, CommandStatus::Sent, device, &now)
                .await?
            {
                attend_prometheus::record_delivered();
                info!(
                    device = %device,
                    command_id = %record.id,
                    code = record.device_code.as_deref().unwrap_or("-"),
                    "command delivered"
                );
                return Ok(Some(Delivery {
                    id: record.id.clone(),
                    payload: record.payload.clone(),
                }));
            }
            debug!(device = %device, command_id = %record.id, "already claimed, skipping");
        }

        Ok(None)
    }
}
