//! Weapon registry rows.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::weapon::{Weapon, WeaponStatus, WeaponUpdate};

use super::{encode_timestamp, timestamp_column};

const WEAPON_COLUMNS: &str =
    "serial_number, weapon_type, status, remarks, registered_at, updated_at";

/// Insert a weapon with status AVAILABLE.
pub(crate) fn insert(
    conn: &Connection,
    serial: &str,
    weapon_type: &str,
    remarks: Option<&str>,
    now: DateTime<Utc>,
) -> Result<Weapon> {
    let stamp = encode_timestamp(now);
    conn.execute(
        "INSERT INTO weapons (serial_number, weapon_type, status, remarks, registered_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![serial, weapon_type, WeaponStatus::Available, remarks, stamp],
    )?;

    Ok(Weapon {
        serial_number: serial.to_string(),
        weapon_type: weapon_type.to_string(),
        status: WeaponStatus::Available,
        remarks: remarks.map(str::to_string),
        registered_at: now,
        updated_at: now,
    })
}

pub(crate) fn find(conn: &Connection, serial: &str) -> Result<Option<Weapon>> {
    let weapon = conn
        .query_row(
            &format!("SELECT {WEAPON_COLUMNS} FROM weapons WHERE serial_number = ?1"),
            [serial],
            row_to_weapon,
        )
        .optional()?;
    Ok(weapon)
}

/// List weapons ordered by serial, optionally filtered by status.
pub(crate) fn list(conn: &Connection, status: Option<WeaponStatus>) -> Result<Vec<Weapon>> {
    let weapons = match status {
        Some(status) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WEAPON_COLUMNS} FROM weapons WHERE status = ?1 ORDER BY serial_number"
            ))?;
            let weapons = stmt
                .query_map([status], row_to_weapon)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            weapons
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WEAPON_COLUMNS} FROM weapons ORDER BY serial_number"
            ))?;
            let weapons = stmt
                .query_map([], row_to_weapon)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            weapons
        }
    };
    Ok(weapons)
}

/// Apply a metadata update. Returns `false` if the serial is unknown.
///
/// Blank remarks clear the column.
pub(crate) fn update(
    conn: &Connection,
    serial: &str,
    update: &WeaponUpdate,
    now: DateTime<Utc>,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE weapons
         SET weapon_type = COALESCE(?2, weapon_type),
             remarks = CASE WHEN ?3 IS NULL THEN remarks ELSE NULLIF(TRIM(?3), '') END,
             status = COALESCE(?4, status),
             updated_at = ?5
         WHERE serial_number = ?1",
        params![
            serial,
            update.weapon_type.as_deref().map(str::trim),
            update.remarks.as_deref(),
            update.status,
            encode_timestamp(now),
        ],
    )?;
    Ok(rows > 0)
}

/// Move a weapon from `from` to `to`.
///
/// Returns `false` if the weapon was not in status `from`.
pub(crate) fn transition(
    conn: &Connection,
    serial: &str,
    from: WeaponStatus,
    to: WeaponStatus,
    now: DateTime<Utc>,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE weapons SET status = ?3, updated_at = ?4
         WHERE serial_number = ?1 AND status = ?2",
        params![serial, from, to, encode_timestamp(now)],
    )?;
    Ok(rows > 0)
}

/// Set a weapon's status unconditionally.
pub(crate) fn set_status(
    conn: &Connection,
    serial: &str,
    status: WeaponStatus,
    now: DateTime<Utc>,
) -> Result<()> {
    let rows = conn.execute(
        "UPDATE weapons SET status = ?2, updated_at = ?3 WHERE serial_number = ?1",
        params![serial, status, encode_timestamp(now)],
    )?;
    if rows == 0 {
        return Err(Error::not_found("weapon", serial));
    }
    Ok(())
}

/// Count weapons, total and issued.
pub(crate) fn counts(conn: &Connection) -> Result<(i64, i64)> {
    let counts = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(status = 'ISSUED'), 0) FROM weapons",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}

pub(crate) fn row_to_weapon(row: &Row<'_>) -> rusqlite::Result<Weapon> {
    Ok(Weapon {
        serial_number: row.get(0)?,
        weapon_type: row.get(1)?,
        status: row.get(2)?,
        remarks: row.get(3)?,
        registered_at: timestamp_column(row, 4)?,
        updated_at: timestamp_column(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::initialize_schema;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_insert_and_find() {
        let conn = create_test_db();
        let now = Utc::now();
        let inserted = insert(&conn, "W-1", "Pistol", Some("note"), now).unwrap();
        let found = find(&conn, "W-1").unwrap().unwrap();

        assert_eq!(found.serial_number, inserted.serial_number);
        assert_eq!(found.status, WeaponStatus::Available);
        assert_eq!(found.remarks.as_deref(), Some("note"));
        assert_eq!(found.registered_at.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_find_missing() {
        let conn = create_test_db();
        assert!(find(&conn, "W-404").unwrap().is_none());
    }

    #[test]
    fn test_transition_is_conditional() {
        let conn = create_test_db();
        insert(&conn, "W-1", "Pistol", None, Utc::now()).unwrap();

        assert!(transition(
            &conn,
            "W-1",
            WeaponStatus::Available,
            WeaponStatus::Issued,
            Utc::now()
        )
        .unwrap());
        assert!(!transition(
            &conn,
            "W-1",
            WeaponStatus::Available,
            WeaponStatus::Issued,
            Utc::now()
        )
        .unwrap());
        assert_eq!(
            find(&conn, "W-1").unwrap().unwrap().status,
            WeaponStatus::Issued
        );
    }

    #[test]
    fn test_set_status_unknown_serial() {
        let conn = create_test_db();
        assert!(set_status(&conn, "W-404", WeaponStatus::Available, Utc::now())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_counts() {
        let conn = create_test_db();
        assert_eq!(counts(&conn).unwrap(), (0, 0));
        insert(&conn, "W-1", "Pistol", None, Utc::now()).unwrap();
        insert(&conn, "W-2", "Rifle", None, Utc::now()).unwrap();
        set_status(&conn, "W-2", WeaponStatus::Issued, Utc::now()).unwrap();
        assert_eq!(counts(&conn).unwrap(), (2, 1));
    }

    #[test]
    fn test_status_check_constraint() {
        let conn = create_test_db();
        insert(&conn, "W-1", "Pistol", None, Utc::now()).unwrap();
        let result = conn.execute(
            "UPDATE weapons SET status = 'LOST' WHERE serial_number = 'W-1'",
            [],
        );
        assert!(result.is_err());
    }
}
