//! Local officer directory rows.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{Error, Result};
use crate::officer::{NewOfficer, Officer, OfficerId, ACTIVE_STATUS};

use super::is_unique_violation;

const OFFICER_COLUMNS: &str = "id, name, badge_no, role, status";

pub(crate) fn insert(conn: &Connection, new: &NewOfficer) -> Result<Officer> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(Error::validation("officer name is required"));
    }
    let badge_no = new
        .badge_no
        .as_deref()
        .map(str::trim)
        .filter(|b| !b.is_empty());

    let result = conn.execute(
        "INSERT INTO officers (id, name, badge_no, role, status) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![new.id, name, badge_no, new.role.as_deref(), ACTIVE_STATUS],
    );
    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(Error::conflict(match (new.id, badge_no) {
                (Some(id), Some(badge)) => {
                    format!("officer id {id} or badge number {badge} is already taken")
                }
                (Some(id), None) => format!("officer id {id} is already taken"),
                (None, Some(badge)) => format!("badge number {badge} is already taken"),
                (None, None) => "officer already exists".to_string(),
            }));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Officer {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        badge_no: badge_no.map(str::to_string),
        role: new.role.clone(),
        status: ACTIVE_STATUS.to_string(),
    })
}

pub(crate) fn find(conn: &Connection, id: OfficerId) -> Result<Option<Officer>> {
    let officer = conn
        .query_row(
            &format!("SELECT {OFFICER_COLUMNS} FROM officers WHERE id = ?1"),
            [id],
            row_to_officer,
        )
        .optional()?;
    Ok(officer)
}

/// Active officers ordered by name, for the issue/return pickers.
pub(crate) fn list_active(conn: &Connection) -> Result<Vec<Officer>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {OFFICER_COLUMNS} FROM officers
         WHERE status = ?1 COLLATE NOCASE
         ORDER BY name, id"
    ))?;
    let officers = stmt
        .query_map([ACTIVE_STATUS], row_to_officer)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(officers)
}

fn row_to_officer(row: &Row<'_>) -> rusqlite::Result<Officer> {
    Ok(Officer {
        id: row.get(0)?,
        name: row.get(1)?,
        badge_no: row.get(2)?,
        role: row.get(3)?,
        status: row.get(4)?,
    })
}
