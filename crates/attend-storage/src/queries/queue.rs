// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Global command queue stored as a single JSON document.

use attend_core::{AttendError, CommandRecord};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Load the stored queue. Returns an empty list if it was never written.
pub async fn load(db: &Database) -> Result<Vec<CommandRecord>, AttendError> {
    let raw: Option<String> = db
        .connection()
        .call(|conn| -> Result<Option<String>, rusqlite::Error> {
            match conn.query_row("SELECT records FROM command_queue WHERE id = 1", [], |row| {
                row.get(0)
            }) {
                Ok(records) => Ok(Some(records)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)?;

    match raw {
        Some(json) => serde_json::from_str(&json).map_err(AttendError::storage),
        None => Ok(Vec::new()),
    }
}

/// Overwrite the whole queue in one statement and bump its version.
pub async fn replace(db: &Database, records: &[CommandRecord]) -> Result<(), AttendError> {
    let json = serde_json::to_string(records).map_err(AttendError::storage)?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO command_queue (id, records, version, updated_at)
                 VALUES (1, ?1, 1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT(id) DO UPDATE SET
                     records = excluded.records,
                     version = command_queue.version + 1,
                     updated_at = excluded.updated_at",
                params![json],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Number of replaces applied so far (0 if never written).
pub async fn version(db: &Database) -> Result<i64, AttendError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COALESCE((SELECT version FROM command_queue WHERE id = 1), 0)",
                [],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn load_empty_queue_returns_empty() {
        let (db, _dir) = setup_db().await;
        assert!(load(&db).await.unwrap().is_empty());
        assert_eq!(version(&db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn replace_then_load_preserves_order() {
        let (db, _dir) = setup_db().await;
        let records = vec![
            CommandRecord::from_payload("C:A1:DATA USER PIN=1 Name=A"),
            CommandRecord::from_payload("C:A2:DATA USER PIN=2 Name=B"),
            CommandRecord::from_payload("C:A3:REBOOT"),
        ];
        replace(&db, &records).await.unwrap();

        let loaded = load(&db).await.unwrap();
        assert_eq!(loaded, records);
        assert_eq!(version(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn replace_overwrites_whole_document() {
        let (db, _dir) = setup_db().await;
        let first = vec![
            CommandRecord::from_payload("C:B1:DATA USER PIN=1 Name=A"),
            CommandRecord::from_payload("C:B2:DATA USER PIN=2 Name=B"),
        ];
        replace(&db, &first).await.unwrap();

        let second = vec![CommandRecord::from_payload("C:B3:DATA USER PIN=3 Name=C")];
        replace(&db, &second).await.unwrap();

        assert_eq!(load(&db).await.unwrap(), second);
        assert_eq!(version(&db).await.unwrap(), 2);

        replace(&db, &[]).await.unwrap();
        assert!(load(&db).await.unwrap().is_empty());
    }
}
