// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a
//! no-op, so library code records unconditionally.

use metrics::{describe_counter, describe_gauge};

/// Register all attend metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("attend_commands_enqueued_total", "Commands appended to the queue");
    describe_counter!(
        "attend_commands_superseded_total",
        "Queued commands dropped because a newer command replaced them"
    );
    describe_counter!(
        "attend_commands_delivered_total",
        "Commands handed to a polling device"
    );
    describe_counter!("attend_results_total", "Result reports finalized, by status");
    describe_counter!(
        "attend_consistency_warnings_total",
        "Non-fatal inconsistencies between the queue, the log and device reports"
    );
    describe_counter!("attend_device_uploads_total", "Data uploads received from devices");
    describe_gauge!("attend_queue_depth", "Commands currently in the global queue");
    describe_gauge!("attend_memory_heap_bytes", "Heap bytes allocated (jemalloc)");
    describe_gauge!("attend_memory_resident_bytes", "Resident bytes (jemalloc)");
    describe_gauge!("attend_memory_rss_bytes", "Process resident set size");
}

pub fn record_enqueued(count: usize) {
    metrics::counter!("attend_commands_enqueued_total").increment(count as u64);
}

pub fn record_superseded(count: usize) {
    metrics::counter!("attend_commands_superseded_total").increment(count as u64);
}

pub fn record_delivered() {
    metrics::counter!("attend_commands_delivered_total").increment(1);
}

/// Record a finalized result; `status` is `executed` or `failed`.
pub fn record_result(status: &str) {
    metrics::counter!("attend_results_total", "status" => status.to_string()).increment(1);
}

/// Record a consistency warning of the given kind (`log_write`, `unmatched_result`).
pub fn record_consistency_warning(kind: &'static str) {
    metrics::counter!("attend_consistency_warnings_total", "kind" => kind).increment(1);
}

pub fn record_device_upload() {
    metrics::counter!("attend_device_uploads_total").increment(1);
}

pub fn set_queue_depth(depth: usize) {
    metrics::gauge!("attend_queue_depth").set(depth as f64);
}

pub fn set_memory_heap(bytes: f64) {
    metrics::gauge!("attend_memory_heap_bytes").set(bytes);
}

pub fn set_memory_resident(bytes: f64) {
    metrics::gauge!("attend_memory_resident_bytes").set(bytes);
}

pub fn set_memory_rss(bytes: f64) {
    metrics::gauge!("attend_memory_rss_bytes").set(bytes);
}
