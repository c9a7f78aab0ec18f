//! `SQLite` schema definitions for armory.
//!
//! This module contains the SQL statements for creating and managing
//! the database schema.

/// SQL statement to create the weapons table.
pub const CREATE_WEAPONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS weapons (
    serial_number TEXT PRIMARY KEY NOT NULL,
    weapon_type TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('AVAILABLE', 'ISSUED')),
    remarks TEXT,
    registered_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create an index on weapon status for availability views.
pub const CREATE_WEAPON_STATUS_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_weapons_status ON weapons(status)
";

/// SQL statement to create the ammunition stock table.
pub const CREATE_AMMUNITION_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS ammunition_stock (
    ammunition_type TEXT PRIMARY KEY NOT NULL,
    magazines INTEGER NOT NULL CHECK (magazines >= 0),
    remarks TEXT,
    registered_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the officers table.
pub const CREATE_OFFICERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS officers (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    badge_no TEXT UNIQUE,
    role TEXT,
    status TEXT NOT NULL DEFAULT 'Active',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the custody records table.
///
/// Officer columns carry no foreign key: officers may be resolved through an
/// external directory. Weapons and ammunition types are restricted so
/// history can never be cascaded away.
pub const CREATE_CUSTODY_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS custody_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    weapon_serial TEXT NOT NULL
        REFERENCES weapons(serial_number) ON DELETE RESTRICT ON UPDATE RESTRICT,
    issued_to INTEGER NOT NULL,
    handed_over_by INTEGER NOT NULL,
    issued_at TEXT NOT NULL,
    due_date TEXT NOT NULL,
    issue_note TEXT,
    received_by INTEGER,
    returned_at TEXT,
    return_note TEXT,
    ammunition_type TEXT
        REFERENCES ammunition_stock(ammunition_type) ON DELETE RESTRICT ON UPDATE RESTRICT,
    issued_magazines INTEGER CHECK (issued_magazines IS NULL OR issued_magazines > 0),
    returned_magazines INTEGER CHECK (returned_magazines IS NULL OR returned_magazines >= 0),
    used_bullets INTEGER CHECK (used_bullets IS NULL OR used_bullets >= 0),
    ammunition_condition TEXT,
    ammunition_remarks TEXT,
    status TEXT NOT NULL DEFAULT 'ISSUED',
    CHECK ((ammunition_type IS NULL) = (issued_magazines IS NULL)),
    CHECK ((returned_at IS NULL) = (received_by IS NULL))
)
";

/// SQL statement enforcing at most one open custody record per weapon.
pub const CREATE_OPEN_RECORD_INDEX: &str = r"
CREATE UNIQUE INDEX IF NOT EXISTS idx_custody_open_weapon
    ON custody_records(weapon_serial) WHERE returned_at IS NULL
";

/// SQL statement to create an index for per-weapon history queries.
pub const CREATE_HISTORY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_custody_weapon_issued
    ON custody_records(weapon_serial, issued_at DESC)
";

/// SQL statement to create an index on due dates of open records.
pub const CREATE_DUE_DATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_custody_open_due
    ON custody_records(due_date) WHERE returned_at IS NULL
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_WEAPONS_TABLE,
    CREATE_WEAPON_STATUS_INDEX,
    CREATE_AMMUNITION_TABLE,
    CREATE_OFFICERS_TABLE,
    CREATE_CUSTODY_TABLE,
    CREATE_OPEN_RECORD_INDEX,
    CREATE_HISTORY_INDEX,
    CREATE_DUE_DATE_INDEX,
    CREATE_METADATA_TABLE,
];
