//! Custody record rows.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::custody::{AmmunitionAllotment, CustodyRecord};
use crate::error::{Error, Result};
use crate::officer::OfficerId;
use crate::weapon::WeaponStatus;

use super::{
    date_column, encode_date, encode_timestamp, is_unique_violation, optional_timestamp_column,
    timestamp_column,
};

const RECORD_COLUMNS: &str = "id, weapon_serial, issued_to, handed_over_by, issued_at, due_date, \
     issue_note, received_by, returned_at, return_note, ammunition_type, issued_magazines, \
     returned_magazines, used_bullets, ammunition_condition, ammunition_remarks, status";

/// Ammunition drawn when a record is opened.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IssuedAmmunition<'a> {
    pub ammunition_type: &'a str,
    pub magazines: i64,
    pub remarks: Option<&'a str>,
}

/// Fields of a record being opened.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpenRecord<'a> {
    pub weapon_serial: &'a str,
    pub issued_to: OfficerId,
    pub handed_over_by: OfficerId,
    pub issued_at: DateTime<Utc>,
    pub due_date: NaiveDate,
    pub issue_note: Option<&'a str>,
    pub ammunition: Option<IssuedAmmunition<'a>>,
}

/// Ammunition figures written when a record is closed.
#[derive(Debug, Clone)]
pub(crate) struct ReturnedAmmunition {
    pub returned_magazines: i64,
    pub used_bullets: i64,
    pub condition: String,
    pub remarks: Option<String>,
}

/// Fields of a record being closed.
#[derive(Debug, Clone)]
pub(crate) struct CloseRecord<'a> {
    pub received_by: OfficerId,
    pub returned_at: DateTime<Utc>,
    pub return_note: &'a str,
    pub ammunition: Option<ReturnedAmmunition>,
}

/// Insert an open record and return its id.
///
/// A second open record for the same weapon trips the partial unique index
/// and is reported as a conflict.
pub(crate) fn insert_open(conn: &Connection, record: &OpenRecord<'_>) -> Result<i64> {
    let (ammunition_type, magazines, ammunition_remarks) = match record.ammunition {
        Some(a) => (Some(a.ammunition_type), Some(a.magazines), a.remarks),
        None => (None, None, None),
    };

    let result = conn.execute(
        "INSERT INTO custody_records (
            weapon_serial, issued_to, handed_over_by, issued_at, due_date, issue_note,
            ammunition_type, issued_magazines, ammunition_remarks, status
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            record.weapon_serial,
            record.issued_to,
            record.handed_over_by,
            encode_timestamp(record.issued_at),
            encode_date(record.due_date),
            record.issue_note,
            ammunition_type,
            magazines,
            ammunition_remarks,
            WeaponStatus::Issued,
        ],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(Error::conflict(format!(
            "weapon {} already has an open custody record",
            record.weapon_serial
        ))),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn find_by_id(conn: &Connection, id: i64) -> Result<Option<CustodyRecord>> {
    let record = conn
        .query_row(
            &format!("SELECT {RECORD_COLUMNS} FROM custody_records WHERE id = ?1"),
            [id],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}

/// Find the open record for a weapon.
pub(crate) fn find_open(conn: &Connection, serial: &str) -> Result<Option<CustodyRecord>> {
    let record = conn
        .query_row(
            &format!(
                "SELECT {RECORD_COLUMNS} FROM custody_records
                 WHERE weapon_serial = ?1 AND returned_at IS NULL"
            ),
            [serial],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}

/// Close an open record.
pub(crate) fn close(conn: &Connection, id: i64, closing: &CloseRecord<'_>) -> Result<()> {
    let (returned, used, condition, remarks) = match &closing.ammunition {
        Some(a) => (
            Some(a.returned_magazines),
            Some(a.used_bullets),
            Some(a.condition.as_str()),
            a.remarks.as_deref(),
        ),
        None => (None, None, None, None),
    };

    let rows = conn.execute(
        "UPDATE custody_records
         SET received_by = ?2,
             returned_at = ?3,
             return_note = ?4,
             returned_magazines = COALESCE(?5, returned_magazines),
             used_bullets = COALESCE(?6, used_bullets),
             ammunition_condition = COALESCE(?7, ammunition_condition),
             ammunition_remarks = COALESCE(?8, ammunition_remarks)
         WHERE id = ?1 AND returned_at IS NULL",
        params![
            id,
            closing.received_by,
            encode_timestamp(closing.returned_at),
            closing.return_note,
            returned,
            used,
            condition,
            remarks,
        ],
    )?;

    if rows == 0 {
        return Err(Error::conflict(format!(
            "custody record {id} is already closed"
        )));
    }
    Ok(())
}

/// Every record for a weapon, most recent issue first.
pub(crate) fn history(conn: &Connection, serial: &str) -> Result<Vec<CustodyRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM custody_records
         WHERE weapon_serial = ?1
         ORDER BY issued_at DESC, id DESC"
    ))?;
    let records = stmt
        .query_map([serial], row_to_record)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Every open record, ordered by weapon serial.
pub(crate) fn open_records(conn: &Connection) -> Result<Vec<CustodyRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM custody_records
         WHERE returned_at IS NULL
         ORDER BY weapon_serial"
    ))?;
    let records = stmt
        .query_map([], row_to_record)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Open records due strictly before `as_of`, oldest due date first.
pub(crate) fn overdue(conn: &Connection, as_of: NaiveDate) -> Result<Vec<CustodyRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM custody_records
         WHERE returned_at IS NULL AND due_date < ?1
         ORDER BY due_date, weapon_serial"
    ))?;
    let records = stmt
        .query_map([encode_date(as_of)], row_to_record)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(records)
}

/// Count open and closed records.
pub(crate) fn counts(conn: &Connection) -> Result<(i64, i64)> {
    let counts = conn.query_row(
        "SELECT COALESCE(SUM(returned_at IS NULL), 0), COALESCE(SUM(returned_at IS NOT NULL), 0)
         FROM custody_records",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(counts)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<CustodyRecord> {
    let ammunition_type: Option<String> = row.get(10)?;
    let issued_magazines: Option<i64> = row.get(11)?;
    let ammunition = match (ammunition_type, issued_magazines) {
        (Some(ammunition_type), Some(issued_magazines)) => Some(AmmunitionAllotment {
            ammunition_type,
            issued_magazines,
            returned_magazines: row.get(12)?,
            used_bullets: row.get(13)?,
            condition: row.get(14)?,
            remarks: row.get(15)?,
        }),
        _ => None,
    };

    Ok(CustodyRecord {
        id: row.get(0)?,
        weapon_serial: row.get(1)?,
        issued_to: row.get(2)?,
        handed_over_by: row.get(3)?,
        issued_at: timestamp_column(row, 4)?,
        due_date: date_column(row, 5)?,
        issue_note: row.get(6)?,
        received_by: row.get(7)?,
        returned_at: optional_timestamp_column(row, 8)?,
        return_note: row.get(9)?,
        ammunition,
        status: row.get(16)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations::initialize_schema;
    use crate::storage::{ammunition, weapons};

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        initialize_schema(&conn).unwrap();
        weapons::insert(&conn, "W-1", "Pistol", None, Utc::now()).unwrap();
        ammunition::insert(&conn, "9mm", 10, None, Utc::now()).unwrap();
        conn
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open(serial: &str, due: NaiveDate) -> OpenRecord<'_> {
        OpenRecord {
            weapon_serial: serial,
            issued_to: 5,
            handed_over_by: 1,
            issued_at: Utc::now(),
            due_date: due,
            issue_note: Some("patrol"),
            ammunition: None,
        }
    }

    fn closing() -> CloseRecord<'static> {
        CloseRecord {
            received_by: 2,
            returned_at: Utc::now(),
            return_note: "Returned",
            ammunition: None,
        }
    }

    #[test]
    fn test_insert_and_find_open() {
        let conn = create_test_db();
        let id = insert_open(&conn, &open("W-1", date(2026, 1, 8))).unwrap();

        let record = find_open(&conn, "W-1").unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.due_date, date(2026, 1, 8));
        assert_eq!(record.issue_note.as_deref(), Some("patrol"));
        assert_eq!(record.status, WeaponStatus::Issued);
        assert!(record.is_open());
        assert!(record.ammunition.is_none());
    }

    #[test]
    fn test_second_open_record_conflicts() {
        let conn = create_test_db();
        insert_open(&conn, &open("W-1", date(2026, 1, 8))).unwrap();
        let err = insert_open(&conn, &open("W-1", date(2026, 1, 9))).unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_reopen_after_close() {
        let conn = create_test_db();
        let first = insert_open(&conn, &open("W-1", date(2026, 1, 8))).unwrap();
        close(&conn, first, &closing()).unwrap();
        let second = insert_open(&conn, &open("W-1", date(2026, 2, 8))).unwrap();
        assert_ne!(first, second);
        assert_eq!(history(&conn, "W-1").unwrap().len(), 2);
    }

    #[test]
    fn test_close_twice_conflicts() {
        let conn = create_test_db();
        let id = insert_open(&conn, &open("W-1", date(2026, 1, 8))).unwrap();
        close(&conn, id, &closing()).unwrap();
        assert!(close(&conn, id, &closing()).unwrap_err().is_conflict());
    }

    #[test]
    fn test_close_with_ammunition() {
        let conn = create_test_db();
        let mut record = open("W-1", date(2026, 1, 8));
        record.ammunition = Some(IssuedAmmunition {
            ammunition_type: "9mm",
            magazines: 2,
            remarks: Some("sealed"),
        });
        let id = insert_open(&conn, &record).unwrap();

        let mut closing = closing();
        closing.ammunition = Some(ReturnedAmmunition {
            returned_magazines: 1,
            used_bullets: 15,
            condition: "good".to_string(),
            remarks: Some("sealed\n[Return] one used".to_string()),
        });
        close(&conn, id, &closing).unwrap();

        let closed = find_by_id(&conn, id).unwrap().unwrap();
        assert!(!closed.is_open());
        assert_eq!(closed.received_by, Some(2));
        let ammo = closed.ammunition.unwrap();
        assert_eq!(ammo.issued_magazines, 2);
        assert_eq!(ammo.returned_magazines, Some(1));
        assert_eq!(ammo.used_bullets, Some(15));
        assert_eq!(ammo.condition.as_deref(), Some("good"));
        assert_eq!(ammo.remarks.as_deref(), Some("sealed\n[Return] one used"));
    }

    #[test]
    fn test_unknown_weapon_rejected_by_foreign_key() {
        let conn = create_test_db();
        assert!(insert_open(&conn, &open("W-404", date(2026, 1, 8))).is_err());
    }

    #[test]
    fn test_history_most_recent_first() {
        let conn = create_test_db();
        let mut first = open("W-1", date(2026, 1, 8));
        first.issued_at = Utc::now() - chrono::Duration::days(10);
        let first_id = insert_open(&conn, &first).unwrap();
        close(&conn, first_id, &closing()).unwrap();
        let second_id = insert_open(&conn, &open("W-1", date(2026, 2, 8))).unwrap();

        let ids: Vec<i64> = history(&conn, "W-1")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![second_id, first_id]);
    }

    #[test]
    fn test_overdue_is_strictly_before() {
        let conn = create_test_db();
        weapons::insert(&conn, "W-2", "Rifle", None, Utc::now()).unwrap();
        insert_open(&conn, &open("W-1", date(2026, 1, 8))).unwrap();
        insert_open(&conn, &open("W-2", date(2026, 1, 10))).unwrap();

        assert!(overdue(&conn, date(2026, 1, 8)).unwrap().is_empty());
        let due = overdue(&conn, date(2026, 1, 9)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].weapon_serial, "W-1");
        assert_eq!(overdue(&conn, date(2026, 2, 1)).unwrap().len(), 2);
    }

    #[test]
    fn test_counts() {
        let conn = create_test_db();
        let id = insert_open(&conn, &open("W-1", date(2026, 1, 8))).unwrap();
        assert_eq!(counts(&conn).unwrap(), (1, 0));
        close(&conn, id, &closing()).unwrap();
        assert_eq!(counts(&conn).unwrap(), (0, 1));
        assert!(open_records(&conn).unwrap().is_empty());
    }
}
