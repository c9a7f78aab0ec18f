//! Storage layer for armory.
//!
//! One `SQLite` database holds the weapon registry, the ammunition stock
//! ledger, the custody records and the local officer directory. Every write
//! runs in a `BEGIN IMMEDIATE` transaction so concurrent workers, each with
//! their own [`Storage`], serialize on the database write lock instead of
//! interleaving read-validate-write sequences.

pub(crate) mod ammunition;
pub mod migrations;
pub(crate) mod officers;
pub(crate) mod records;
mod reports;
pub mod schema;
pub(crate) mod weapons;

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::ammunition::{normalize_type, AmmunitionStock, NewAmmunition};
use crate::custody::CustodyRecord;
use crate::error::{Error, Result};
use crate::officer::{NewOfficer, Officer, OfficerDirectory, OfficerId};
use crate::sanitize::for_log;
use crate::weapon::{NewWeapon, SerialFormat, Weapon, WeaponStatus, WeaponUpdate};

pub use reports::{CustodyDiscrepancy, DiscrepancyKind, StorageStats, WeaponOverview};

/// Default time a writer waits for the database lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection-level options for [`Storage`].
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// How long a transaction waits for a competing writer before failing.
    pub busy_timeout: Duration,
    /// Accepted weapon serial format.
    pub serial_format: SerialFormat,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            serial_format: SerialFormat::default(),
        }
    }
}

/// Storage engine for the armory.
///
/// Each `Storage` owns a single connection and is meant to be owned by one
/// worker. Open one per worker against the same database file for
/// concurrent request handling.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
    /// Accepted weapon serial format.
    serial_format: SerialFormat,
}

impl Storage {
    /// Open or create a storage database at the given path with default options.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, StorageOptions::default())
    }

    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open_with(path: impl AsRef<Path>, options: StorageOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.busy_timeout(options.busy_timeout)?;
        // WAL lets readers proceed while a custody transaction holds the write lock
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn,
            serial_format: options.serial_format,
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
            serial_format: SerialFormat::default(),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Begin a write transaction holding the database write lock.
    ///
    /// Dropping the transaction without committing rolls it back.
    pub(crate) fn begin(&self) -> Result<Transaction<'_>> {
        Ok(Transaction::new_unchecked(
            &self.conn,
            TransactionBehavior::Immediate,
        )?)
    }

    // === Weapon Registry ===

    /// Register a weapon with status AVAILABLE.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the serial is already registered and
    /// [`Error::Validation`] for a malformed serial or empty type.
    pub fn register_weapon(&self, new: &NewWeapon) -> Result<Weapon> {
        let serial = self.serial_format.normalize(&new.serial_number)?;
        let weapon_type = new.weapon_type.trim();
        if weapon_type.is_empty() {
            return Err(Error::validation("weapon type is required"));
        }

        let tx = self.begin()?;
        if weapons::find(&tx, serial)?.is_some() {
            return Err(Error::conflict(format!(
                "weapon already exists with serial number: {serial}"
            )));
        }
        let weapon = weapons::insert(
            &tx,
            serial,
            weapon_type,
            new.remarks.as_deref(),
            now(),
        )?;
        tx.commit()?;

        info!(serial = %for_log(serial), weapon_type = %for_log(weapon_type), "Registered weapon");
        Ok(weapon)
    }

    /// Get a weapon by serial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no weapon has this serial.
    pub fn weapon(&self, serial: &str) -> Result<Weapon> {
        let serial = serial.trim();
        weapons::find(&self.conn, serial)?.ok_or_else(|| Error::not_found("weapon", serial))
    }

    /// List all weapons ordered by serial.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn weapons(&self) -> Result<Vec<Weapon>> {
        weapons::list(&self.conn, None)
    }

    /// List weapons with the given status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn weapons_by_status(&self, status: WeaponStatus) -> Result<Vec<Weapon>> {
        weapons::list(&self.conn, Some(status))
    }

    /// Apply an administrative metadata update.
    ///
    /// A status override bypasses the custody coordinator. If it leaves the
    /// weapon inconsistent with its custody records a warning is logged and
    /// the weapon shows up in [`Storage::reconcile`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown serial and
    /// [`Error::Validation`] for an empty weapon type.
    pub fn update_weapon(&self, serial: &str, update: &WeaponUpdate) -> Result<Weapon> {
        let serial = serial.trim();
        if update
            .weapon_type
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            return Err(Error::validation("weapon type cannot be empty"));
        }

        let tx = self.begin()?;
        if !weapons::update(&tx, serial, update, now())? {
            return Err(Error::not_found("weapon", serial));
        }
        if let Some(status) = update.status {
            let has_open = records::find_open(&tx, serial)?.is_some();
            if has_open != (status == WeaponStatus::Issued) {
                warn!(
                    serial = %for_log(serial),
                    %status,
                    open_record = has_open,
                    "Status override contradicts custody records"
                );
            }
        }
        let weapon = weapons::find(&tx, serial)?
            .ok_or_else(|| Error::internal("updated weapon vanished"))?;
        tx.commit()?;

        debug!(serial = %for_log(serial), "Updated weapon metadata");
        Ok(weapon)
    }

    // === Ammunition Stock Ledger ===

    /// Register an ammunition type with an opening magazine count.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the type exists and [`Error::Validation`]
    /// for an empty type or negative count.
    pub fn register_ammunition(&self, new: &NewAmmunition) -> Result<AmmunitionStock> {
        let ammunition_type = new.validate()?;

        let tx = self.begin()?;
        if ammunition::find(&tx, ammunition_type)?.is_some() {
            return Err(Error::conflict(format!(
                "ammunition type already exists: {ammunition_type}"
            )));
        }
        let stock = ammunition::insert(
            &tx,
            ammunition_type,
            new.magazines,
            new.remarks.as_deref(),
            now(),
        )?;
        tx.commit()?;

        info!(
            ammunition_type = %for_log(ammunition_type),
            magazines = new.magazines,
            "Registered ammunition type"
        );
        Ok(stock)
    }

    /// Get the stock row for an ammunition type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the type is unknown.
    pub fn ammunition_stock(&self, ammunition_type: &str) -> Result<AmmunitionStock> {
        let ammunition_type = normalize_type(ammunition_type)?;
        ammunition::find(&self.conn, ammunition_type)?
            .ok_or_else(|| Error::not_found("ammunition type", ammunition_type))
    }

    /// Get the current magazine count for an ammunition type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the type is unknown.
    pub fn stock(&self, ammunition_type: &str) -> Result<i64> {
        self.ammunition_stock(ammunition_type).map(|s| s.magazines)
    }

    /// List all ammunition stock ordered by type.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn ammunition(&self) -> Result<Vec<AmmunitionStock>> {
        ammunition::list(&self.conn)
    }

    /// Apply an administrative stock adjustment (delivery, write-off, count
    /// correction) in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown type and
    /// [`Error::InsufficientStock`] if the count would go negative.
    pub fn restock_ammunition(&self, ammunition_type: &str, delta: i64) -> Result<AmmunitionStock> {
        let ammunition_type = normalize_type(ammunition_type)?;

        let tx = self.begin()?;
        let stock = ammunition::adjust(&tx, ammunition_type, delta, now())?;
        tx.commit()?;

        info!(
            ammunition_type = %for_log(ammunition_type),
            delta,
            magazines = stock.magazines,
            "Adjusted ammunition stock"
        );
        Ok(stock)
    }

    /// Replace the remarks of an ammunition type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the type is unknown.
    pub fn update_ammunition_remarks(
        &self,
        ammunition_type: &str,
        remarks: Option<&str>,
    ) -> Result<AmmunitionStock> {
        let ammunition_type = normalize_type(ammunition_type)?;

        let tx = self.begin()?;
        if !ammunition::update_remarks(&tx, ammunition_type, remarks, now())? {
            return Err(Error::not_found("ammunition type", ammunition_type));
        }
        let stock = ammunition::find(&tx, ammunition_type)?
            .ok_or_else(|| Error::internal("updated ammunition type vanished"))?;
        tx.commit()?;
        Ok(stock)
    }

    // === Officers ===

    /// Add an officer to the local directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] if the id or badge number is taken and
    /// [`Error::Validation`] for an empty name.
    pub fn register_officer(&self, new: &NewOfficer) -> Result<Officer> {
        let tx = self.begin()?;
        let officer = officers::insert(&tx, new)?;
        tx.commit()?;

        info!(officer_id = officer.id, "Registered officer");
        Ok(officer)
    }

    /// List active officers ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn active_officers(&self) -> Result<Vec<Officer>> {
        officers::list_active(&self.conn)
    }

    // === Custody queries ===

    /// Get the open custody record for a weapon, if it is checked out.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn open_record(&self, serial: &str) -> Result<Option<CustodyRecord>> {
        records::find_open(&self.conn, serial.trim())
    }

    /// Get the full custody history of a weapon, most recent issue first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn custody_history(&self, serial: &str) -> Result<Vec<CustodyRecord>> {
        records::history(&self.conn, serial.trim())
    }

    /// List open custody records that were due before `as_of`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn overdue_records(&self, as_of: NaiveDate) -> Result<Vec<CustodyRecord>> {
        records::overdue(&self.conn, as_of)
    }

    /// Every weapon together with its open custody record, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn weapon_overview(&self) -> Result<Vec<WeaponOverview>> {
        reports::overview(&self.conn)
    }

    /// Weapons whose status disagrees with their custody records.
    ///
    /// An empty result means every ISSUED weapon has exactly one open record
    /// and no AVAILABLE weapon has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn reconcile(&self) -> Result<Vec<CustodyDiscrepancy>> {
        reports::discrepancies(&self.conn)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let mut stats = reports::stats(&self.conn)?;

        stats.db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(stats)
    }
}

impl OfficerDirectory for Storage {
    fn find_officer(&self, id: OfficerId) -> Result<Option<Officer>> {
        officers::find(&self.conn, id)
    }
}

// === Column encoding ===

impl ToSql for WeaponStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for WeaponStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "AVAILABLE" => Ok(Self::Available),
            "ISSUED" => Ok(Self::Issued),
            other => Err(FromSqlError::Other(
                format!("unknown weapon status: {other}").into(),
            )),
        }
    }
}

/// Current time at the microsecond precision timestamps are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Encode a timestamp as fixed-width RFC 3339 so text order is time order.
pub(crate) fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Encode a calendar date as `YYYY-MM-DD`.
pub(crate) fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Read a timestamp column.
pub(crate) fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a nullable timestamp column.
pub(crate) fn optional_timestamp_column(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Read a `YYYY-MM-DD` date column.
pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Check whether a statement failed on a UNIQUE or PRIMARY KEY constraint.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
