// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage trait definitions.
//!
//! The dispatch crate depends only on these traits; `attend-storage` provides
//! the SQLite implementation. All traits use `#[async_trait]` for dynamic
//! dispatch behind `Arc<dyn ...>`.

pub mod directory;
pub mod log;
pub mod queue;
pub mod registry;
pub mod storage;

pub use directory::UserDirectory;
pub use log::CommandLog;
pub use queue::QueueStore;
pub use registry::DeviceRegistry;
pub use storage::StorageAdapter;
