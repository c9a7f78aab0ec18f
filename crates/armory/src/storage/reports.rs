//! Read-only views across weapons, stock and custody records.

use std::collections::HashMap;

use rusqlite::Connection;
use serde::Serialize;

use crate::custody::CustodyRecord;
use crate::error::Result;
use crate::weapon::{Weapon, WeaponStatus};

use super::{ammunition, records, weapons};

/// A weapon together with its open custody record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeaponOverview {
    /// The weapon.
    pub weapon: Weapon,
    /// Open record, present while the weapon is checked out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_record: Option<CustodyRecord>,
}

/// How a weapon's status disagrees with its custody records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// Status ISSUED but no open record.
    IssuedWithoutOpenRecord,
    /// Status AVAILABLE but an open record exists.
    AvailableWithOpenRecord,
}

impl std::fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IssuedWithoutOpenRecord => f.write_str("issued without open record"),
            Self::AvailableWithOpenRecord => f.write_str("available with open record"),
        }
    }
}

/// One row of the reconciliation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustodyDiscrepancy {
    /// Weapon serial.
    pub serial_number: String,
    /// Status stored on the weapon.
    pub status: WeaponStatus,
    /// What is wrong.
    pub kind: DiscrepancyKind,
    /// The open record, if one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_record_id: Option<i64>,
}

/// Statistics about the armory database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    /// Registered weapons.
    pub weapons: i64,
    /// Weapons with status ISSUED.
    pub issued_weapons: i64,
    /// Registered ammunition types.
    pub ammunition_types: i64,
    /// Magazines on hand across all types.
    pub magazines_in_stock: i64,
    /// Custody records still open.
    pub open_records: i64,
    /// Custody records closed by a return.
    pub closed_records: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

pub(super) fn overview(conn: &Connection) -> Result<Vec<WeaponOverview>> {
    let mut open: HashMap<String, CustodyRecord> = records::open_records(conn)?
        .into_iter()
        .map(|r| (r.weapon_serial.clone(), r))
        .collect();

    Ok(weapons::list(conn, None)?
        .into_iter()
        .map(|weapon| {
            let open_record = open.remove(&weapon.serial_number);
            WeaponOverview {
                weapon,
                open_record,
            }
        })
        .collect())
}

pub(super) fn discrepancies(conn: &Connection) -> Result<Vec<CustodyDiscrepancy>> {
    let mut stmt = conn.prepare(
        "SELECT w.serial_number, w.status, r.id
         FROM weapons w
         LEFT JOIN custody_records r
             ON r.weapon_serial = w.serial_number AND r.returned_at IS NULL
         WHERE (w.status = 'ISSUED' AND r.id IS NULL)
            OR (w.status = 'AVAILABLE' AND r.id IS NOT NULL)
         ORDER BY w.serial_number",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let status: WeaponStatus = row.get(1)?;
            let open_record_id: Option<i64> = row.get(2)?;
            Ok(CustodyDiscrepancy {
                serial_number: row.get(0)?,
                status,
                kind: match status {
                    WeaponStatus::Issued => DiscrepancyKind::IssuedWithoutOpenRecord,
                    WeaponStatus::Available => DiscrepancyKind::AvailableWithOpenRecord,
                },
                open_record_id,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(super) fn stats(conn: &Connection) -> Result<StorageStats> {
    let (weapons, issued_weapons) = weapons::counts(conn)?;
    let (ammunition_types, magazines_in_stock) = ammunition::totals(conn)?;
    let (open_records, closed_records) = records::counts(conn)?;

    Ok(StorageStats {
        weapons,
        issued_weapons,
        ammunition_types,
        magazines_in_stock,
        open_records,
        closed_records,
        db_size_bytes: 0,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use super::*;
    use crate::storage::migrations::initialize_schema;
    use crate::storage::records::OpenRecord;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        weapons::insert(&conn, "W-1", "Pistol", None, Utc::now()).unwrap();
        weapons::insert(&conn, "W-2", "Rifle", None, Utc::now()).unwrap();
        conn
    }

    fn open_record(conn: &Connection, serial: &str) -> i64 {
        records::insert_open(
            conn,
            &OpenRecord {
                weapon_serial: serial,
                issued_to: 5,
                handed_over_by: 1,
                issued_at: Utc::now(),
                due_date: NaiveDate::from_ymd_opt(2026, 1, 8).unwrap(),
                issue_note: None,
                ammunition: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_overview_pairs_open_records() {
        let conn = create_test_db();
        let id = open_record(&conn, "W-2");
        weapons::set_status(&conn, "W-2", WeaponStatus::Issued, Utc::now()).unwrap();

        let rows = overview(&conn).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].open_record.is_none());
        assert_eq!(rows[1].open_record.as_ref().map(|r| r.id), Some(id));
        assert!(discrepancies(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_discrepancies_both_directions() {
        let conn = create_test_db();
        let id = open_record(&conn, "W-1");
        weapons::set_status(&conn, "W-2", WeaponStatus::Issued, Utc::now()).unwrap();

        let report = discrepancies(&conn).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].serial_number, "W-1");
        assert_eq!(report[0].kind, DiscrepancyKind::AvailableWithOpenRecord);
        assert_eq!(report[0].open_record_id, Some(id));
        assert_eq!(report[1].serial_number, "W-2");
        assert_eq!(report[1].kind, DiscrepancyKind::IssuedWithoutOpenRecord);
        assert_eq!(report[1].open_record_id, None);
    }

    #[test]
    fn test_stats_counts() {
        let conn = create_test_db();
        ammunition::insert(&conn, "9mm", 7, None, Utc::now()).unwrap();
        open_record(&conn, "W-1");
        weapons::set_status(&conn, "W-1", WeaponStatus::Issued, Utc::now()).unwrap();

        let stats = stats(&conn).unwrap();
        assert_eq!(stats.weapons, 2);
        assert_eq!(stats.issued_weapons, 1);
        assert_eq!(stats.ammunition_types, 1);
        assert_eq!(stats.magazines_in_stock, 7);
        assert_eq!(stats.open_records, 1);
        assert_eq!(stats.closed_records, 0);
    }
}
