// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the attend workspace.

use thiserror::Error;

/// The error type returned by every fallible operation in the workspace.
///
/// Consistency problems found during reconciliation are not errors; they are
/// reported as warnings and never abort the device-facing exchange.
#[derive(Debug, Error)]
pub enum AttendError {
    /// Configuration errors (invalid TOML, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Durable store failure (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Request rejected before touching storage (missing device identity,
    /// unparsable body).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A requested record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// HTTP transport errors (bind failure, server crash).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AttendError {
    /// Wrap any displayable storage-layer failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        AttendError::Storage {
            source: source.into(),
        }
    }

    /// True for errors caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AttendError::MalformedInput(_) | AttendError::NotFound { .. }
        )
    }
}
