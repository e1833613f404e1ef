// SPDX-FileCopyrightText: 2026 Attend Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device registry queries.

use attend_core::{AttendError, DeviceId, DeviceRecord, now_timestamp};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

/// Record a contact from `device`. Returns `true` on first sight.
pub async fn touch_device(
    db: &Database,
    device: &DeviceId,
    ip: Option<&str>,
) -> Result<bool, AttendError> {
    let serial = device.as_str().to_string();
    let ip = ip.map(str::to_string);
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let known: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM devices WHERE serial = ?1)",
                params![serial],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO devices (serial, first_seen, last_seen, last_ip)
                 VALUES (?1, ?2, ?2, ?3)
                 ON CONFLICT(serial) DO UPDATE SET
                     last_seen = excluded.last_seen,
                     last_ip = COALESCE(excluded.last_ip, devices.last_ip)",
                params![serial, now, ip],
            )?;
            tx.commit()?;
            Ok(!known)
        })
        .await
        .map_err(map_tr_err)
}

/// Known devices, most recently seen first.
pub async fn list_devices(db: &Database) -> Result<Vec<DeviceRecord>, AttendError> {
    db.connection()
        .call(|conn| -> Result<Vec<DeviceRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT serial, first_seen, last_seen, last_ip FROM devices
                 ORDER BY last_seen DESC, serial",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(DeviceRecord {
                    serial: row.get(0)?,
                    first_seen: row.get(1)?,
                    last_seen: row.get(2)?,
                    last_ip: row.get(3)?,
                })
            })?;
            rows.collect()
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
    async fn first_touch_reports_new_device() {
        let (db, _dir) = setup_db().await;
        let d1 = DeviceId::new("D1").unwrap();
        assert!(touch_device(&db, &d1, Some("10.0.0.5")).await.unwrap());
        assert!(!touch_device(&db, &d1, None).await.unwrap());

        let devices = list_devices(&db).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial, "D1");
        // A contact without an address keeps the last known one.
        assert_eq!(devices[0].last_ip.as_deref(), Some("10.0.0.5"));
    }

    #[tokio::test]
    async fn devices_are_tracked_independently() {
        let (db, _dir) = setup_db().await;
        for serial in ["A", "B"] {
            let device = DeviceId::new(serial).unwrap();
            assert!(touch_device(&db, &device, None).await.unwrap());
        }
        assert_eq!(list_devices(&db).await.unwrap().len(), 2);
    }
}
