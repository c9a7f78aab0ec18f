//! `armory` - Weapon custody and ammunition accounting
//!
//! This library keeps the weapon registry, the ammunition stock ledger and
//! the custody records of a police armory in one `SQLite` database, and
//! performs weapon issue and return as atomic, concurrency-safe events.
//!
//! ```no_run
//! use armory::{CustodyCoordinator, IssueRequest, Storage};
//! use chrono::NaiveDate;
//!
//! # fn main() -> armory::Result<()> {
//! let storage = Storage::open("armory.db")?;
//! let coordinator = CustodyCoordinator::new(&storage, &storage);
//! let due = NaiveDate::from_ymd_opt(2026, 1, 8).ok_or(armory::Error::validation("bad date"))?;
//! let request = IssueRequest::new("W-100", 5, 1, due).with_ammunition("9mm", 2);
//! let record = coordinator.issue(&request)?;
//! assert!(record.is_open());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod ammunition;
pub mod cli;
pub mod config;
pub mod custody;
pub mod error;
pub mod logging;
pub mod officer;
pub mod sanitize;
pub mod storage;
pub mod weapon;

pub use ammunition::{AmmunitionStock, NewAmmunition};
pub use config::Config;
pub use custody::{
    AmmunitionAllotment, CustodyCoordinator, CustodyPolicy, CustodyRecord, IssueRequest,
    ReturnRequest,
};
pub use error::{Error, ErrorKind, Result};
pub use logging::init_logging;
pub use officer::{NewOfficer, Officer, OfficerDirectory, OfficerId, OfficerRoster};
pub use storage::{CustodyDiscrepancy, Storage, StorageOptions, StorageStats, WeaponOverview};
pub use weapon::{NewWeapon, SerialFormat, Weapon, WeaponStatus, WeaponUpdate};
