// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User directory queries.

use attend_core::{AttendError, UserRecord};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        pin: row.get(0)?,
        name: row.get(1)?,
        photo: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// All users ordered by pin.
pub async fn list_all_users(db: &Database) -> Result<Vec<UserRecord>, AttendError> {
    db.connection()
        .call(|conn| -> Result<Vec<UserRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT pin, name, photo, created_at, updated_at FROM users ORDER BY pin",
            )?;
            let rows = stmt.query_map([], row_to_user)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_user(db: &Database, pin: &str) -> Result<Option<UserRecord>, AttendError> {
    let pin = pin.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<UserRecord>, rusqlite::Error> {
            conn.query_row(
                "SELECT pin, name, photo, created_at, updated_at FROM users WHERE pin = ?1",
                params![pin],
                row_to_user,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or update by pin. `created_at` is kept from the first insert.
pub async fn upsert_user(db: &Database, user: &UserRecord) -> Result<(), AttendError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO users (pin, name, photo, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(pin) DO UPDATE SET
                     name = excluded.name,
                     photo = excluded.photo,
                     updated_at = excluded.updated_at",
                params![
                    user.pin,
                    user.name,
                    user.photo,
                    user.created_at,
                    user.updated_at
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_user(db: &Database, pin: &str) -> Result<bool, AttendError> {
    let pin = pin.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            Ok(conn.execute("DELETE FROM users WHERE pin = ?1", params![pin])? > 0)
        })
        .await
        .map_err(map_tr_err)
}
