// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device registry.

use async_trait::async_trait;

use crate::error::AttendError;
use crate::types::{DeviceId, DeviceRecord};

/// Tracks which terminals have checked in.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Record a contact from `device`. Returns `true` the first time the
    /// device is ever seen.
    async fn touch_device(&self, device: &DeviceId, ip: Option<&str>) -> Result<bool, AttendError>;

    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, AttendError>;
}
