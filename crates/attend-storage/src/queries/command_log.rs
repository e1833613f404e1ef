// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command log operations.
//!
//! One row per `(command id, device)`. The row with `device_id = ''` is the
//! undelivered `pending` entry written at enqueue time; the first device to
//! receive the command claims it, and every later device gets a copy. Status
//! changes are guarded so they only follow `pending -> sent -> {executed,
//! failed}`.

use std::collections::HashSet;
use std::str::FromStr;

use attend_core::{
    AttendError, CommandCategory, CommandId, CommandLogEntry, CommandRecord, CommandStatus,
    DeviceId, LogFilter, codes_match,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

const ENTRY_COLUMNS: &str = "id, device_id, payload, device_code, category, target_user, \
                             status, created_at, sent_at, executed_at, fallback";

/// Device id stored for the undelivered entry.
const UNDELIVERED: &str = "";

fn parse_column<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommandLogEntry> {
    let device_id: String = row.get(1)?;
    Ok(CommandLogEntry {
        id: CommandId(row.get(0)?),
        device_id: (!device_id.is_empty()).then_some(device_id),
        payload: row.get(2)?,
        device_code: row.get(3)?,
        category: parse_column::<CommandCategory>(4, row.get(4)?)?,
        target_user: row.get(5)?,
        status: parse_column::<CommandStatus>(6, row.get(6)?)?,
        created_at: row.get(7)?,
        sent_at: row.get(8)?,
        executed_at: row.get(9)?,
        fallback: row.get(10)?,
    })
}

/// Insert the `pending` entry for `record` unless any entry with its id exists.
pub async fn insert_if_absent(db: &Database, record: &CommandRecord) -> Result<bool, AttendError> {
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO command_log
                     (id, device_id, payload, device_code, category, target_user, status, created_at)
                 SELECT ?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7
                 WHERE NOT EXISTS (SELECT 1 FROM command_log WHERE id = ?1)",
                params![
                    record.id.0,
                    UNDELIVERED,
                    record.payload,
                    record.device_code,
                    record.category.to_string(),
                    record.target_user,
                    record.created_at,
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a guarded status transition for `(id, device)`.
///
/// Returns `false` when the transition is not allowed from the current state
/// or the id is unknown.
pub async fn update_status(
    db: &Database,
    id: &CommandId,
    status: CommandStatus,
    device: &DeviceId,
    at: &str,
) -> Result<bool, AttendError> {
    let id = id.0.clone();
    let device = device.as_str().to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            match status {
                CommandStatus::Sent => mark_sent(conn, &id, &device, &at),
                CommandStatus::Executed | CommandStatus::Failed => {
                    let changed = conn.execute(
                        "UPDATE command_log SET status = ?1, executed_at = ?2
                         WHERE id = ?3 AND device_id = ?4 AND status = 'sent'",
                        params![status.to_string(), at, id, device],
                    )?;
                    Ok(changed > 0)
                }
                CommandStatus::Pending => Ok(false),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// `-> sent` for one device, in a single transaction.
fn mark_sent(
    conn: &mut rusqlite::Connection,
    id: &str,
    device: &str,
    at: &str,
) -> Result<bool, rusqlite::Error> {
    let tx = conn.transaction()?;

    let current: Option<String> = tx
        .query_row(
            "SELECT status FROM command_log WHERE id = ?1 AND device_id = ?2",
            params![id, device],
            |row| row.get(0),
        )
        .optional()?;

    let changed = match current {
        Some(current) => {
            let current = parse_column::<CommandStatus>(0, current)?;
            if current.can_transition_to(CommandStatus::Sent) {
                tx.execute(
                    "UPDATE command_log SET status = 'sent', sent_at = ?1
                     WHERE id = ?2 AND device_id = ?3 AND status = 'pending'",
                    params![at, id, device],
                )? > 0
            } else {
                false
            }
        }
        None => {
            // First delivery claims the undelivered entry.
            let claimed = tx.execute(
                "UPDATE command_log SET device_id = ?1, status = 'sent', sent_at = ?2
                 WHERE id = ?3 AND device_id = ?4 AND status = 'pending'",
                params![device, at, id, UNDELIVERED],
            )?;
            if claimed > 0 {
                true
            } else {
                // Later deliveries copy the command snapshot into a new entry.
                tx.execute(
                    "INSERT INTO command_log
                         (id, device_id, payload, device_code, category, target_user,
                          status, created_at, sent_at)
                     SELECT id, ?1, payload, device_code, category, target_user,
                            'sent', created_at, ?2
                     FROM command_log WHERE id = ?3 AND fallback = 0
                     ORDER BY seq LIMIT 1",
                    params![device, at, id],
                )? > 0
            }
        }
    };

    tx.commit()?;
    Ok(changed)
}

/// Ids already offered to `device`: sent or terminal.
pub async fn find_processed_ids(
    db: &Database,
    device: &DeviceId,
) -> Result<HashSet<CommandId>, AttendError> {
    let device = device.as_str().to_string();
    db.connection()
        .call(move |conn| -> Result<HashSet<CommandId>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id FROM command_log
                 WHERE device_id = ?1 AND fallback = 0
                   AND status IN ('sent', 'executed', 'failed')",
            )?;
            let rows = stmt.query_map(params![device], |row| row.get::<_, String>(0))?;
            let mut ids = HashSet::new();
            for row in rows {
                ids.insert(CommandId(row?));
            }
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

/// `sent` entries of `device` whose device code matches `code`, most recently
/// sent first.
///
/// SQL keeps only codes that are a prefix of `code` or have it as a prefix;
/// `codes_match` then checks the suffix.
pub async fn find_sent_by_device_and_code(
    db: &Database,
    device: &DeviceId,
    code: &str,
) -> Result<Vec<CommandLogEntry>, AttendError> {
    let device = device.as_str().to_string();
    let reported = code.to_string();
    let sent = db
        .connection()
        .call(move |conn| -> Result<Vec<CommandLogEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM command_log
                 WHERE device_id = ?1 AND status = 'sent' AND device_code IS NOT NULL
                   AND (substr(device_code, 1, length(?2)) = ?2
                        OR substr(?2, 1, length(device_code)) = device_code)
                 ORDER BY sent_at DESC, seq DESC"
            ))?;
            let rows = stmt.query_map(params![device, reported], row_to_entry)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)?;

    Ok(sent
        .into_iter()
        .filter(|entry| {
            entry
                .device_code
                .as_deref()
                .is_some_and(|embedded| codes_match(embedded, code))
        })
        .collect())
}

/// Insert a synthetic terminal entry for a result report nothing matched.
pub async fn insert_fallback(
    db: &Database,
    code: &str,
    device: &DeviceId,
    status: CommandStatus,
    at: &str,
) -> Result<CommandId, AttendError> {
    if !status.is_terminal() {
        return Err(AttendError::Internal(format!(
            "fallback entries must be terminal, got {status}"
        )));
    }
    let id = CommandId::generate();
    let row_id = id.0.clone();
    let code = code.to_string();
    let device = device.as_str().to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO command_log
                     (id, device_id, payload, device_code, category, target_user,
                      status, fallback, created_at, executed_at)
                 VALUES (?1, ?2, '', ?3, ?4, NULL, ?5, 1, ?6, ?6)",
                params![
                    row_id,
                    device,
                    code,
                    CommandCategory::Other.to_string(),
                    status.to_string(),
                    at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(id)
}

/// Operator listing, newest first.
pub async fn list_entries(
    db: &Database,
    filter: &LogFilter,
) -> Result<Vec<CommandLogEntry>, AttendError> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    if let Some(device) = &filter.device_id {
        values.push(device.clone());
        conditions.push(format!("device_id = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(status.to_string());
        conditions.push(format!("status = ?{}", values.len()));
    }
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    let limit = filter.limit.unwrap_or(-1);
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM command_log {where_clause} ORDER BY seq DESC LIMIT {limit}"
    );

    db.connection()
        .call(move |conn| -> Result<Vec<CommandLogEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), row_to_entry)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Every entry recorded for one command, in creation order.
pub async fn get_entries(db: &Database, id: &CommandId) -> Result<Vec<CommandLogEntry>, AttendError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<CommandLogEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM command_log WHERE id = ?1 ORDER BY seq"
            ))?;
            let rows = stmt.query_map(params![id], row_to_entry)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
