//! Rendering of command results as plain text, tables or JSON.

use std::fmt::Write as _;

use serde::Serialize;

use super::OutputFormat;
use crate::ammunition::AmmunitionStock;
use crate::custody::CustodyRecord;
use crate::error::Result;
use crate::officer::Officer;
use crate::storage::{CustodyDiscrepancy, StorageStats, WeaponOverview};
use crate::weapon::Weapon;

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Render one weapon.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn weapon(weapon: &Weapon, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(weapon),
        OutputFormat::Table => weapons(std::slice::from_ref(weapon), format),
        OutputFormat::Plain => {
            let mut out = String::new();
            field(&mut out, "Serial", &weapon.serial_number);
            field(&mut out, "Type", &weapon.weapon_type);
            field(&mut out, "Status", weapon.status.as_str());
            field(&mut out, "Remarks", weapon.remarks.as_deref().unwrap_or("-"));
            field(
                &mut out,
                "Registered",
                &weapon.registered_at.format(DATE_TIME_FORMAT).to_string(),
            );
            Ok(out)
        }
    }
}

/// Render a list of weapons.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn weapons(weapons: &[Weapon], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(weapons),
        OutputFormat::Plain => Ok(lines(weapons.iter().map(|w| {
            format!("{}\t{}\t{}", w.serial_number, w.weapon_type, w.status)
        }))),
        OutputFormat::Table => Ok(table(
            &["SERIAL", "TYPE", "STATUS", "REMARKS"],
            weapons
                .iter()
                .map(|w| {
                    vec![
                        w.serial_number.clone(),
                        w.weapon_type.clone(),
                        w.status.to_string(),
                        one_line(w.remarks.as_deref()),
                    ]
                })
                .collect(),
        )),
    }
}

/// Render the weapon overview.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn overview(rows: &[WeaponOverview], format: OutputFormat) -> Result<String> {
    let holder = |row: &WeaponOverview| -> [String; 2] {
        match &row.open_record {
            Some(r) => [r.issued_to.to_string(), r.due_date.to_string()],
            None => ["-".to_string(), "-".to_string()],
        }
    };
    match format {
        OutputFormat::Json => json(rows),
        OutputFormat::Plain => Ok(lines(rows.iter().map(|row| {
            let [to, due] = holder(row);
            format!(
                "{}\t{}\t{}\t{to}\t{due}",
                row.weapon.serial_number, row.weapon.weapon_type, row.weapon.status
            )
        }))),
        OutputFormat::Table => Ok(table(
            &["SERIAL", "TYPE", "STATUS", "ISSUED TO", "DUE"],
            rows.iter()
                .map(|row| {
                    let [to, due] = holder(row);
                    vec![
                        row.weapon.serial_number.clone(),
                        row.weapon.weapon_type.clone(),
                        row.weapon.status.to_string(),
                        to,
                        due,
                    ]
                })
                .collect(),
        )),
    }
}

/// Render one ammunition stock row.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn stock(stock: &AmmunitionStock, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(stock),
        OutputFormat::Table => stocks(std::slice::from_ref(stock), format),
        OutputFormat::Plain => {
            let mut out = String::new();
            field(&mut out, "Type", &stock.ammunition_type);
            field(&mut out, "Magazines", &stock.magazines.to_string());
            field(&mut out, "Remarks", stock.remarks.as_deref().unwrap_or("-"));
            field(
                &mut out,
                "Updated",
                &stock.updated_at.format(DATE_TIME_FORMAT).to_string(),
            );
            Ok(out)
        }
    }
}

/// Render the ammunition stock ledger.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn stocks(stocks: &[AmmunitionStock], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(stocks),
        OutputFormat::Plain => Ok(lines(
            stocks
                .iter()
                .map(|s| format!("{}\t{}", s.ammunition_type, s.magazines)),
        )),
        OutputFormat::Table => Ok(table(
            &["TYPE", "MAGAZINES", "REMARKS"],
            stocks
                .iter()
                .map(|s| {
                    vec![
                        s.ammunition_type.clone(),
                        s.magazines.to_string(),
                        one_line(s.remarks.as_deref()),
                    ]
                })
                .collect(),
        )),
    }
}

/// Render a list of officers.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn officers(officers: &[Officer], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(officers),
        OutputFormat::Plain => Ok(lines(
            officers.iter().map(|o| format!("{}\t{}", o.id, o.name)),
        )),
        OutputFormat::Table => Ok(table(
            &["ID", "NAME", "BADGE", "ROLE"],
            officers
                .iter()
                .map(|o| {
                    vec![
                        o.id.to_string(),
                        o.name.clone(),
                        o.badge_no.clone().unwrap_or_else(|| "-".to_string()),
                        o.role.clone().unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect(),
        )),
    }
}

/// Render one custody record.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn record(record: &CustodyRecord, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(record),
        OutputFormat::Table => records(std::slice::from_ref(record), format),
        OutputFormat::Plain => {
            let mut out = String::new();
            field(&mut out, "Record", &record.id.to_string());
            field(&mut out, "Weapon", &record.weapon_serial);
            field(&mut out, "Issued to", &record.issued_to.to_string());
            field(&mut out, "Handed over by", &record.handed_over_by.to_string());
            field(
                &mut out,
                "Issued at",
                &record.issued_at.format(DATE_TIME_FORMAT).to_string(),
            );
            field(&mut out, "Due", &record.due_date.to_string());
            if let Some(note) = &record.issue_note {
                field(&mut out, "Issue note", note);
            }
            if let Some(a) = &record.ammunition {
                field(
                    &mut out,
                    "Ammunition",
                    &format!("{} x{}", a.ammunition_type, a.issued_magazines),
                );
                if let Some(returned) = a.returned_magazines {
                    field(&mut out, "Returned mags", &returned.to_string());
                }
                if let Some(used) = a.used_bullets {
                    field(&mut out, "Bullets used", &used.to_string());
                }
                if let Some(condition) = &a.condition {
                    field(&mut out, "Condition", condition);
                }
                if let Some(remarks) = &a.remarks {
                    field(&mut out, "Ammo remarks", &one_line(Some(remarks)));
                }
            }
            match (record.returned_at, record.received_by) {
                (Some(at), Some(by)) => {
                    field(&mut out, "Returned at", &at.format(DATE_TIME_FORMAT).to_string());
                    field(&mut out, "Received by", &by.to_string());
                    field(
                        &mut out,
                        "Return note",
                        record.return_note.as_deref().unwrap_or("-"),
                    );
                }
                _ => field(&mut out, "State", "open"),
            }
            Ok(out)
        }
    }
}

/// Render a list of custody records.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn records(records: &[CustodyRecord], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(records),
        OutputFormat::Plain => Ok(lines(records.iter().map(|r| {
            format!(
                "{}\t{}\t{}\t{}\t{}",
                r.id,
                r.weapon_serial,
                r.issued_to,
                r.due_date,
                if r.is_open() { "open" } else { "returned" }
            )
        }))),
        OutputFormat::Table => Ok(table(
            &["ID", "WEAPON", "ISSUED TO", "ISSUED", "DUE", "AMMO", "RETURNED"],
            records
                .iter()
                .map(|r| {
                    vec![
                        r.id.to_string(),
                        r.weapon_serial.clone(),
                        r.issued_to.to_string(),
                        r.issued_at.format(DATE_TIME_FORMAT).to_string(),
                        r.due_date.to_string(),
                        r.ammunition.as_ref().map_or_else(
                            || "-".to_string(),
                            |a| format!("{} x{}", a.ammunition_type, a.issued_magazines),
                        ),
                        r.returned_at.map_or_else(
                            || "open".to_string(),
                            |at| at.format(DATE_TIME_FORMAT).to_string(),
                        ),
                    ]
                })
                .collect(),
        )),
    }
}

/// Render the reconciliation report.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn discrepancies(rows: &[CustodyDiscrepancy], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json(rows),
        _ if rows.is_empty() => Ok("No discrepancies.\n".to_string()),
        OutputFormat::Plain => Ok(lines(
            rows.iter()
                .map(|d| format!("{}\t{}\t{}", d.serial_number, d.status, d.kind)),
        )),
        OutputFormat::Table => Ok(table(
            &["SERIAL", "STATUS", "PROBLEM", "OPEN RECORD"],
            rows.iter()
                .map(|d| {
                    vec![
                        d.serial_number.clone(),
                        d.status.to_string(),
                        d.kind.to_string(),
                        d.open_record_id
                            .map_or_else(|| "-".to_string(), |id| id.to_string()),
                    ]
                })
                .collect(),
        )),
    }
}

/// Render database statistics.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn stats(stats: &StorageStats, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return json(stats);
    }
    let mut out = String::new();
    field(&mut out, "Weapons", &stats.weapons.to_string());
    field(&mut out, "Issued", &stats.issued_weapons.to_string());
    field(&mut out, "Ammo types", &stats.ammunition_types.to_string());
    field(&mut out, "Magazines", &stats.magazines_in_stock.to_string());
    field(&mut out, "Open records", &stats.open_records.to_string());
    field(&mut out, "Closed records", &stats.closed_records.to_string());
    field(&mut out, "Database size", &format_bytes(stats.db_size_bytes));
    Ok(out)
}

fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{:<16}{value}", format!("{label}:"));
}

fn lines(items: impl Iterator<Item = String>) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&item);
        out.push('\n');
    }
    out
}

/// Collapse multi-line remarks into one table cell.
fn one_line(text: Option<&str>) -> String {
    match text {
        Some(t) if !t.is_empty() => t.lines().collect::<Vec<_>>().join(" | "),
        _ => "-".to_string(),
    }
}

fn table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    for row in std::iter::once(&header).chain(rows.iter()) {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    match bytes {
        b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
        b => format!("{b} B"),
    }
}
