// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown on SIGTERM and SIGINT.
//!
//! The returned [`CancellationToken`] stops the gateway, which then drains
//! in-flight requests before storage is closed.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Cancel a fresh token when SIGTERM or SIGINT arrives.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to install SIGTERM handler, only Ctrl+C is handled");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Await `task`, giving up `timeout` after `cancel` fires.
///
/// Returns `None` when the drain deadline passed first.
pub async fn drain_with_timeout<F>(
    task: F,
    cancel: &CancellationToken,
    timeout: Duration,
) -> Option<F::Output>
where
    F: Future,
{
    tokio::pin!(task);
    tokio::select! {
        out = &mut task => return Some(out),
        _ = cancel.cancelled() => {}
    }
    match tokio::time::timeout(timeout, task).await {
        Ok(out) => Some(out),
        Err(_) => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "shutdown timeout reached, in-flight requests interrupted"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn finished_task_is_returned_without_cancel() {
        let cancel = CancellationToken::new();
        let out = drain_with_timeout(async { 7 }, &cancel, Duration::from_millis(10)).await;
        assert_eq!(out, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_task_is_abandoned_after_timeout() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = drain_with_timeout(
            std::future::pending::<()>(),
            &cancel,
            Duration::from_secs(5),
        )
        .await;
        assert!(out.is_none());
    }
}
