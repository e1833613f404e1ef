// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue manager: the single writer of the global command queue.
//!
//! `enqueue` parses payloads into records, drops queued commands the new ones
//! supersede, and replaces the stored queue. The load-modify-replace cycle
//! runs under one async mutex so concurrent enqueues cannot lose updates.
//! Pending log entries are written afterwards on a best-effort basis; a
//! missing entry is recreated when the command is first delivered.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info};

use attend_core::{AttendError, CommandLog, CommandRecord, QueueStore};

pub struct QueueManager {
    queue: Arc<dyn QueueStore>,
    log: Arc<dyn CommandLog>,
    write_lock: Mutex<()>,
}

impl QueueManager {
    pub fn new(queue: Arc<dyn QueueStore>, log: Arc<dyn CommandLog>) -> Self {
        Self {
            queue,
            log,
            write_lock: Mutex::new(()),
        }
    }

    /// Append `payloads` to the global queue in order and return the new
    /// records.
    ///
    /// A new record with a target user replaces every queued record for the
    /// same `(target user, category)`, including earlier records of the same
    /// call. A storage failure while replacing the queue aborts before any
    /// log entry is written.
    pub async fn enqueue<P>(&self, payloads: Vec<P>) -> Result<Vec<CommandRecord>, AttendError>
    where
        P: Into<String>,
    {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }
        let new_records: Vec<CommandRecord> = payloads
            .into_iter()
            .map(CommandRecord::from_payload)
            .collect();

        let guard = self.write_lock.lock().await;

        let mut queue = self.queue.load().await?;
        let mut superseded = 0;
        for record in &new_records {
            if record.target_user.is_some() {
                let before = queue.len();
                queue.retain(|queued| !record.supersedes(queued));
                superseded += before - queue.len();
            }
            queue.push(record.clone());
        }

        self.queue.replace(&queue).await?;
        drop(guard);

        attend_prometheus::record_enqueued(new_records.len());
        attend_prometheus::record_superseded(superseded);
        attend_prometheus::set_queue_depth(queue.len());
        info!(
            count = new_records.len(),
            superseded,
            depth = queue.len(),
            "commands enqueued"
        );

        for record in &new_records {
            match self.log.insert_if_absent(record).await {
                Ok(true) => {}
                Ok(false) => debug!(command_id = %record.id, "log entry already present"),
                Err(e) => {
                    error!(
                        command_id = %record.id,
                        error = %e,
                        "failed to write pending log entry, delivery will recreate it"
                    );
                    attend_prometheus::record_consistency_warning("log_write");
                }
            }
        }

        Ok(new_records)
    }

    /// The global queue as currently stored.
    pub async fn snapshot(&self) -> Result<Vec<CommandRecord>, AttendError> {
        self.queue.load().await
    }
}
