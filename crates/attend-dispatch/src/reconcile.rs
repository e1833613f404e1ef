// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result reconciliation.
//!
//! Devices report results asynchronously, identifying the command only by
//! the code embedded in its payload (sometimes with a sequence suffix). A
//! report is matched against the device's `sent` log entries; reports that
//! match nothing are recorded as fallback entries and surfaced as warnings.
//! Only storage failures are returned to the device-facing exchange.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use attend_core::{AttendError, CommandId, CommandLog, CommandStatus, DeviceId, now_timestamp};

/// One `ID=<code>&Return=<result>&CMD=<cmd>` line of a result upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultReport {
    pub code: String,
    pub result: String,
    pub command: Option<String>,
}

impl ResultReport {
    /// Parse one line. Lines without a non-empty `ID` and `Return` yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut code = None;
        let mut result = None;
        let mut command = None;
        for pair in line.trim().split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim();
            match key.trim() {
                "ID" => code = Some(value),
                "Return" => result = Some(value),
                "CMD" => command = Some(value),
                _ => {}
            }
        }
        Some(Self {
            code: code.filter(|c| !c.is_empty())?.to_string(),
            result: result.filter(|r| !r.is_empty())?.to_string(),
            command: command.filter(|c| !c.is_empty()).map(str::to_string),
        })
    }

    /// Parse every usable line of an upload body, warning on the rest.
    pub fn parse_body(body: &str) -> Vec<Self> {
        body.lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| {
                let report = Self::parse_line(line);
                if report.is_none() {
                    warn!(line, "ignoring unparsable result line");
                }
                report
            })
            .collect()
    }
}

/// What a result report did to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Entries finalized by this report. Empty when every match was already
    /// finalized by a concurrent report.
    Matched(Vec<CommandId>),
    /// Nothing matched; a synthetic terminal entry was recorded.
    Fallback(CommandId),
}

pub struct ResultReconciler {
    log: Arc<dyn CommandLog>,
    success_code: String,
}

impl ResultReconciler {
    /// `success_code` is the `Return=` value that means executed.
    pub fn new(log: Arc<dyn CommandLog>, success_code: impl Into<String>) -> Self {
        Self {
            log,
            success_code: success_code.into(),
        }
    }

    fn final_status(&self, result_code: &str) -> CommandStatus {
        if result_code.trim() == self.success_code {
            CommandStatus::Executed
        } else {
            CommandStatus::Failed
        }
    }

    /// Finalize every `sent` entry of `device` whose code matches `code`.
    pub async fn report_result(
        &self,
        device: &DeviceId,
        code: &str,
        result_code: &str,
    ) -> Result<ReconcileOutcome, AttendError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AttendError::MalformedInput("missing command code".into()));
        }
        let status = self.final_status(result_code);
        let now = now_timestamp();
        let candidates = self.log.find_sent_by_device_and_code(device, code).await?;

        if candidates.is_empty() {
            let id = self.log.insert_fallback(code, device, status, &now).await?;
            attend_prometheus::record_consistency_warning("unmatched_result");
            attend_prometheus::record_result(&status.to_string());
            warn!(
                device = %device,
                code,
                result = result_code,
                fallback_id = %id,
                "result matched no sent command, recorded fallback entry"
            );
            return Ok(ReconcileOutcome::Fallback(id));
        }

        let mut finalized = Vec::with_capacity(candidates.len());
        for entry in candidates {
            if self.log.update_status(&entry.id, status, device, &now).await? {
                attend_prometheus::record_result(&status.to_string());
                info!(
                    device = %device,
                    command_id = %entry.id,
                    code,
                    %status,
                    "command finalized"
                );
                finalized.push(entry.id);
            } else {
                debug!(device = %device, command_id = %entry.id, "already finalized");
            }
        }
        Ok(ReconcileOutcome::Matched(finalized))
    }

    /// Reconcile each report in order.
    ///
    /// Stops at the first server-side failure and returns it, so the device
    /// is told to resend. Unmatched codes are not failures; they become
    /// fallback entries.
    pub async fn report_batch(
        &self,
        device: &DeviceId,
        reports: &[ResultReport],
    ) -> Result<Vec<ReconcileOutcome>, AttendError> {
        let mut outcomes = Vec::with_capacity(reports.len());
        for report in reports {
            match self.report_result(device, &report.code, &report.result).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_client_error() => warn!(
                    device = %device,
                    code = %report.code,
                    error = %e,
                    "rejected result report"
                ),
                Err(e) => {
                    error!(
                        device = %device,
                        code = %report.code,
                        reconciled = outcomes.len(),
                        error = %e,
                        "failed to reconcile result"
                    );
                    return Err(e);
                }
            }
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_line() {
        let report = ResultReport::parse_line("ID=X01&Return=0&CMD=DATA").unwrap();
        assert_eq!(report.code, "X01");
        assert_eq!(report.result, "0");
        assert_eq!(report.command.as_deref(), Some("DATA"));
    }

    #[test]
    fn parse_line_with_negative_return_and_no_cmd() {
        let report = ResultReport::parse_line(" ID=AB1201&Return=-1002 ").unwrap();
        assert_eq!(report.code, "AB1201");
        assert_eq!(report.result, "-1002");
        assert!(report.command.is_none());
    }

    #[test]
    fn parse_line_requires_id_and_return() {
        assert!(ResultReport::parse_line("Return=0&CMD=DATA").is_none());
        assert!(ResultReport::parse_line("ID=&Return=0").is_none());
        assert!(ResultReport::parse_line("ID=X01").is_none());
        assert!(ResultReport::parse_line("garbage").is_none());
    }

    #[test]
    fn parse_body_skips_blank_and_bad_lines() {
        let body = "ID=A&Return=0&CMD=DATA\n\nnonsense\r\nID=B&Return=2&CMD=DATA\r\n";
        let reports = ResultReport::parse_body(body);
        let codes: Vec<_> = reports.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B"]);
    }
}
