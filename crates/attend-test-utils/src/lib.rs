// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for attend integration tests.
//!
//! # Components
//!
//! - [`TestHarness`] - temp SQLite storage wired to a [`Dispatcher`](attend_dispatch::Dispatcher)
//! - [`FlakyStorage`] - storage wrapper that fails selected writes on demand

pub mod flaky_storage;
pub mod harness;

pub use flaky_storage::FlakyStorage;
pub use harness::{TestHarness, TestHarnessBuilder};
