// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command data model shared across the workspace.

use std::fmt;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::command::{classify_payload, parse_device_code, parse_target_user};
use crate::error::AttendError;

/// Current UTC time as an RFC 3339 string with millisecond precision.
///
/// All stored timestamps use this format so they sort lexicographically.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Unique identifier of a queued command. Generated once, never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(pub String);

impl CommandId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Serial number of a polling terminal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap a device serial. Empty or whitespace-only serials are
    /// rejected as malformed input.
    pub fn new(serial: impl Into<String>) -> Result<Self, AttendError> {
        let serial = serial.into().trim().to_string();
        if serial.is_empty() {
            return Err(AttendError::MalformedInput(
                "missing device serial number".into(),
            ));
        }
        Ok(Self(serial))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Effect of a command on the device, derived from its payload.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandCategory {
    UserUpsert,
    UserPhoto,
    UserDelete,
    Other,
}

/// Lifecycle status of a command for one device.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CommandStatus {
    Pending,
    Sent,
    Executed,
    Failed,
}

impl CommandStatus {
    /// `executed` and `failed` never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, CommandStatus::Executed | CommandStatus::Failed)
    }

    /// Whether the device has already been offered the command. Processed
    /// commands are skipped by the delivery scan.
    pub fn is_processed(self) -> bool {
        self != CommandStatus::Pending
    }

    /// The per-device state machine: `pending -> sent -> {executed, failed}`.
    pub fn can_transition_to(self, next: CommandStatus) -> bool {
        matches!(
            (self, next),
            (CommandStatus::Pending, CommandStatus::Sent)
                | (CommandStatus::Sent, CommandStatus::Executed)
                | (CommandStatus::Sent, CommandStatus::Failed)
        )
    }
}

/// One unit of work in the global queue, with its routing metadata parsed
/// out of the payload exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: CommandId,
    pub payload: String,
    pub category: CommandCategory,
    /// Present iff `category != Other`.
    pub target_user: Option<String>,
    /// Device-local code embedded in the `C:<code>:` header, if any.
    pub device_code: Option<String>,
    pub created_at: String,
}

impl CommandRecord {
    /// Build a record from raw payload text with a fresh id and timestamp.
    pub fn from_payload(payload: impl Into<String>) -> Self {
        let payload = payload.into();
        let target_user = parse_target_user(&payload).map(str::to_string);
        let category = classify_payload(&payload);
        // Category and target user come as a pair; either one alone is OTHER.
        let (category, target_user) = match (category, target_user) {
            (CommandCategory::Other, _) | (_, None) => (CommandCategory::Other, None),
            (category, Some(user)) => (category, Some(user)),
        };
        Self {
            id: CommandId::generate(),
            device_code: parse_device_code(&payload).map(str::to_string),
            payload,
            category,
            target_user,
            created_at: now_timestamp(),
        }
    }

    /// True if `other` is an older command this record replaces.
    pub fn supersedes(&self, other: &CommandRecord) -> bool {
        self.target_user.is_some()
            && self.target_user == other.target_user
            && self.category == other.category
    }
}

/// Lifecycle record of one command for one device.
///
/// The entry whose `device_id` is `None` is the undelivered `pending` entry
/// created at enqueue time; the first delivery claims it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLogEntry {
    pub id: CommandId,
    pub device_id: Option<String>,
    pub payload: String,
    pub device_code: Option<String>,
    pub category: CommandCategory,
    pub target_user: Option<String>,
    pub status: CommandStatus,
    pub created_at: String,
    pub sent_at: Option<String>,
    pub executed_at: Option<String>,
    /// Synthetic entry recorded for a result report that matched nothing.
    pub fallback: bool,
}

/// Operator-facing filter for log listings.
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub device_id: Option<String>,
    pub status: Option<CommandStatus>,
    pub limit: Option<i64>,
}

/// A user known to the directory; the source of enrollment commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub pin: String,
    pub name: String,
    /// Base64-encoded JPEG, if the user has a photo.
    pub photo: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A terminal that has checked in at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub serial: String,
    pub first_seen: String,
    pub last_seen: String,
    pub last_ip: Option<String>,
}

/// Health status reported by storage health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}
