//! Ammunition stock rows.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::ammunition::AmmunitionStock;
use crate::error::{Error, Result};

use super::{encode_timestamp, timestamp_column};

const STOCK_COLUMNS: &str = "ammunition_type, magazines, remarks, registered_at, updated_at";

pub(crate) fn insert(
    conn: &Connection,
    ammunition_type: &str,
    magazines: i64,
    remarks: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AmmunitionStock> {
    conn.execute(
        "INSERT INTO ammunition_stock (ammunition_type, magazines, remarks, registered_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![ammunition_type, magazines, remarks, encode_timestamp(now)],
    )?;

    Ok(AmmunitionStock {
        ammunition_type: ammunition_type.to_string(),
        magazines,
        remarks: remarks.map(str::to_string),
        registered_at: now,
        updated_at: now,
    })
}

pub(crate) fn find(conn: &Connection, ammunition_type: &str) -> Result<Option<AmmunitionStock>> {
    let stock = conn
        .query_row(
            &format!("SELECT {STOCK_COLUMNS} FROM ammunition_stock WHERE ammunition_type = ?1"),
            [ammunition_type],
            row_to_stock,
        )
        .optional()?;
    Ok(stock)
}

pub(crate) fn list(conn: &Connection) -> Result<Vec<AmmunitionStock>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STOCK_COLUMNS} FROM ammunition_stock ORDER BY ammunition_type"
    ))?;
    let stock = stmt
        .query_map([], row_to_stock)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(stock)
}

/// Add `delta` magazines (negative to draw) and return the updated row.
///
/// Must run inside the caller's transaction so the read and the write see
/// the same count.
pub(crate) fn adjust(
    conn: &Connection,
    ammunition_type: &str,
    delta: i64,
    now: DateTime<Utc>,
) -> Result<AmmunitionStock> {
    let mut stock = find(conn, ammunition_type)?
        .ok_or_else(|| Error::not_found("ammunition type", ammunition_type))?;
    let next = stock.apply(delta)?;

    conn.execute(
        "UPDATE ammunition_stock SET magazines = ?2, updated_at = ?3 WHERE ammunition_type = ?1",
        params![ammunition_type, next, encode_timestamp(now)],
    )?;

    stock.magazines = next;
    stock.updated_at = now;
    Ok(stock)
}

/// Replace remarks. Returns `false` if the type is unknown.
pub(crate) fn update_remarks(
    conn: &Connection,
    ammunition_type: &str,
    remarks: Option<&str>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE ammunition_stock SET remarks = ?2, updated_at = ?3 WHERE ammunition_type = ?1",
        params![ammunition_type, remarks, encode_timestamp(now)],
    )?;
    Ok(rows > 0)
}

/// Count ammunition types and total magazines on hand.
pub(crate) fn totals(conn: &Connection) -> Result<(i64, i64)> {
    let totals = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(magazines), 0) FROM ammunition_stock",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(totals)
}

fn row_to_stock(row: &Row<'_>) -> rusqlite::Result<AmmunitionStock> {
    Ok(AmmunitionStock {
        ammunition_type: row.get(0)?,
        magazines: row.get(1)?,
        remarks: row.get(2)?,
        registered_at: timestamp_column(row, 3)?,
        updated_at: timestamp_column(row, 4)?,
    })
}
