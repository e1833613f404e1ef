// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command dispatch for attend.
//!
//! The queue manager owns writes to the global queue, the delivery
//! coordinator hands each device the commands it has not seen, and the
//! result reconciler matches asynchronous device reports back to sent
//! commands. All three are written against the storage traits in
//! `attend-core`.

pub mod delivery;
pub mod dispatcher;
pub mod format;
pub mod manager;
pub mod reconcile;

pub use delivery::{Delivery, DeliveryCoordinator};
pub use dispatcher::Dispatcher;
pub use format::CodeGenerator;
pub use manager::QueueManager;
pub use reconcile::{ReconcileOutcome, ResultReconciler, ResultReport};
