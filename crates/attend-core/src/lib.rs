// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the attend device command server.
//!
//! Holds the command data model shared by every crate in the workspace, the
//! error taxonomy, payload metadata parsing, and the storage traits that the
//! queue manager, delivery coordinator and result reconciler are written
//! against.

pub mod command;
pub mod error;
pub mod traits;
pub mod types;

pub use command::{classify_payload, codes_match, parse_device_code, parse_target_user};
pub use error::AttendError;
pub use traits::{CommandLog, DeviceRegistry, QueueStore, StorageAdapter, UserDirectory};
pub use types::{
    CommandCategory, CommandId, CommandLogEntry, CommandRecord, CommandStatus, DeviceId,
    DeviceRecord, HealthStatus, LogFilter, UserRecord, now_timestamp,
};
