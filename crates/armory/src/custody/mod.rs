//! Custody coordinator: issue and return as single atomic units.
//!
//! Each event runs inside one `BEGIN IMMEDIATE` transaction on the
//! coordinator's [`Storage`]. Preconditions are checked in a fixed order and
//! the first failure aborts the event with nothing written:
//!
//! 1. the weapon exists,
//! 2. the weapon is in the required state,
//! 3. the officers resolve through the [`OfficerDirectory`],
//! 4. the ammunition figures are valid and covered by stock.
//!
//! Two workers issuing the same weapon serialize on the write lock; the
//! loser sees the weapon ISSUED and gets a conflict. The partial unique index
//! on open records backs this up at the schema level.

mod record;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::officer::OfficerDirectory;
use crate::sanitize::for_log;
use crate::storage::records::{
    self, CloseRecord, IssuedAmmunition, OpenRecord, ReturnedAmmunition,
};
use crate::storage::{ammunition, now, weapons, Storage};
use crate::weapon::WeaponStatus;

pub use record::{
    append_return_remark, AmmunitionAllotment, CustodyRecord, IssueRequest, ReturnRequest,
    RETURN_REMARK_TAG,
};

/// Default return note when the caller gives none.
pub const DEFAULT_RETURN_NOTE: &str = "Returned";

/// Default condition recorded for returned ammunition.
pub const DEFAULT_AMMUNITION_CONDITION: &str = "good";

/// Defaults applied when a return leaves fields blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustodyPolicy {
    /// Return note used when none is given.
    pub default_return_note: String,
    /// Ammunition condition used when none is given.
    pub default_ammunition_condition: String,
}

impl Default for CustodyPolicy {
    fn default() -> Self {
        Self {
            default_return_note: DEFAULT_RETURN_NOTE.to_string(),
            default_ammunition_condition: DEFAULT_AMMUNITION_CONDITION.to_string(),
        }
    }
}

/// Performs issue and return events against one storage handle.
#[derive(Debug)]
pub struct CustodyCoordinator<'a, D> {
    storage: &'a Storage,
    officers: &'a D,
    policy: CustodyPolicy,
}

impl<'a, D: OfficerDirectory> CustodyCoordinator<'a, D> {
    /// Create a coordinator resolving officers through `officers`.
    ///
    /// Pass the storage itself to use its local officer table.
    #[must_use]
    pub fn new(storage: &'a Storage, officers: &'a D) -> Self {
        Self {
            storage,
            officers,
            policy: CustodyPolicy::default(),
        }
    }

    /// Replace the return defaults.
    #[must_use]
    pub fn with_policy(mut self, policy: CustodyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Issue a weapon, optionally with ammunition.
    ///
    /// On success the weapon is ISSUED, the stock is reduced and a new open
    /// record is returned. On failure nothing changes.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown weapon, officer or ammunition type
    /// - [`Error::Conflict`] if the weapon is not AVAILABLE
    /// - [`Error::Validation`] for malformed ammunition figures
    /// - [`Error::InsufficientStock`] if the stock cannot cover the request
    pub fn issue(&self, request: &IssueRequest) -> Result<CustodyRecord> {
        let serial = request.weapon_serial.trim();
        if serial.is_empty() {
            return Err(Error::validation("weapon serial number is required"));
        }

        let now = now();
        let tx = self.storage.begin()?;

        let weapon =
            weapons::find(&tx, serial)?.ok_or_else(|| Error::not_found("weapon", serial))?;
        if !weapon.is_available() {
            debug!(serial = %for_log(serial), status = %weapon.status, "Issue refused");
            return Err(Error::conflict(format!(
                "weapon {serial} is not available (status {})",
                weapon.status
            )));
        }

        self.officers.require_officer(request.issued_to)?;
        self.officers.require_officer(request.handed_over_by)?;

        let drawn = match request.requested_ammunition()? {
            Some((ammunition_type, magazines)) => {
                ammunition::adjust(&tx, ammunition_type, -magazines, now)?;
                Some(IssuedAmmunition {
                    ammunition_type,
                    magazines,
                    remarks: request
                        .ammunition_note
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty()),
                })
            }
            None => None,
        };

        let id = records::insert_open(
            &tx,
            &OpenRecord {
                weapon_serial: serial,
                issued_to: request.issued_to,
                handed_over_by: request.handed_over_by,
                issued_at: now,
                due_date: request.due_date,
                issue_note: request
                    .issue_note
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty()),
                ammunition: drawn,
            },
        )?;

        if !weapons::transition(&tx, serial, WeaponStatus::Available, WeaponStatus::Issued, now)? {
            return Err(Error::conflict(format!("weapon {serial} is not available")));
        }

        let record = records::find_by_id(&tx, id)?
            .ok_or_else(|| Error::internal(format!("custody record {id} vanished after insert")))?;
        tx.commit()?;

        info!(
            serial = %for_log(serial),
            record_id = id,
            issued_to = request.issued_to,
            handed_over_by = request.handed_over_by,
            due_date = %request.due_date,
            magazines = drawn.map_or(0, |a| a.magazines),
            "Issued weapon"
        );
        Ok(record)
    }

    /// Return a weapon and close its open record.
    ///
    /// Returned magazines go back to stock. The weapon is AVAILABLE afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown weapon or officer, or if the
    ///   weapon has no open record
    /// - [`Error::Validation`] for malformed ammunition figures, including
    ///   returning more magazines than were issued
    pub fn return_weapon(&self, request: &ReturnRequest) -> Result<CustodyRecord> {
        let serial = request.weapon_serial.trim();
        if serial.is_empty() {
            return Err(Error::validation("weapon serial number is required"));
        }

        let now = now();
        let tx = self.storage.begin()?;

        let weapon =
            weapons::find(&tx, serial)?.ok_or_else(|| Error::not_found("weapon", serial))?;
        let open = records::find_open(&tx, serial)?
            .ok_or_else(|| Error::not_found("active issue", serial))?;

        self.officers.require_officer(request.received_by)?;

        let checked = request.check_against(open.ammunition.as_ref())?;
        let returned = match (open.ammunition.as_ref(), checked) {
            (Some(allotment), Some(checked)) => {
                ammunition::adjust(
                    &tx,
                    &allotment.ammunition_type,
                    checked.returned_magazines,
                    now,
                )?;
                Some(ReturnedAmmunition {
                    returned_magazines: checked.returned_magazines,
                    used_bullets: checked.used_bullets,
                    condition: non_blank(request.ammunition_condition.as_deref())
                        .unwrap_or(self.policy.default_ammunition_condition.as_str())
                        .to_string(),
                    remarks: append_return_remark(
                        allotment.remarks.as_deref(),
                        request.ammunition_note.as_deref(),
                    ),
                })
            }
            _ => None,
        };
        let returned_magazines = returned.as_ref().map_or(0, |a| a.returned_magazines);

        records::close(
            &tx,
            open.id,
            &CloseRecord {
                received_by: request.received_by,
                returned_at: now,
                return_note: non_blank(request.return_note.as_deref())
                    .unwrap_or(self.policy.default_return_note.as_str()),
                ammunition: returned,
            },
        )?;

        if weapon.status != WeaponStatus::Issued {
            warn!(
                serial = %for_log(serial),
                status = %weapon.status,
                record_id = open.id,
                "Weapon with open custody record was not ISSUED"
            );
        }
        weapons::set_status(&tx, serial, WeaponStatus::Available, now)?;

        let record = records::find_by_id(&tx, open.id)?.ok_or_else(|| {
            Error::internal(format!("custody record {} vanished after close", open.id))
        })?;
        tx.commit()?;

        info!(
            serial = %for_log(serial),
            record_id = record.id,
            received_by = request.received_by,
            returned_magazines,
            "Returned weapon"
        );
        Ok(record)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::ammunition::NewAmmunition;
    use crate::officer::{NewOfficer, Officer, OfficerRoster};
    use crate::weapon::{NewWeapon, WeaponUpdate};

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 8).unwrap()
    }

    fn create_test_storage() -> Storage {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .register_weapon(&NewWeapon::new("W-100", "Pistol"))
            .unwrap();
        storage
            .register_ammunition(&NewAmmunition::new("9mm", 10))
            .unwrap();
        for (id, name) in [(1, "Armorer"), (2, "Desk"), (5, "Patrol")] {
            storage
                .register_officer(&NewOfficer::new(name).with_id(id))
                .unwrap();
        }
        storage
    }

    #[test]
    fn test_issue_without_ammunition() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);

        let record = coordinator
            .issue(&IssueRequest::new("W-100", 5, 1, due()).with_note("patrol"))
            .unwrap();

        assert!(record.is_open());
        assert_eq!(record.issue_note.as_deref(), Some("patrol"));
        assert!(record.ammunition.is_none());
        assert_eq!(storage.weapon("W-100").unwrap().status, WeaponStatus::Issued);
        assert_eq!(storage.stock("9mm").unwrap(), 10);
    }

    #[test]
    fn test_issue_with_ammunition_draws_stock() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);

        let record = coordinator
            .issue(
                &IssueRequest::new("W-100", 5, 1, due())
                    .with_ammunition("9mm", 2)
                    .with_ammunition_note("sealed"),
            )
            .unwrap();

        let ammo = record.ammunition.unwrap();
        assert_eq!(ammo.issued_magazines, 2);
        assert_eq!(ammo.remarks.as_deref(), Some("sealed"));
        assert_eq!(storage.stock("9mm").unwrap(), 8);
    }

    #[test]
    fn test_issue_unknown_weapon() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);
        let err = coordinator
            .issue(&IssueRequest::new("W-404", 5, 1, due()))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_issue_twice_conflicts() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);
        coordinator
            .issue(&IssueRequest::new("W-100", 5, 1, due()).with_ammunition("9mm", 2))
            .unwrap();

        let err = coordinator
            .issue(&IssueRequest::new("W-100", 2, 1, due()).with_ammunition("9mm", 2))
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(storage.stock("9mm").unwrap(), 8);
        assert_eq!(storage.custody_history("W-100").unwrap().len(), 1);
    }

    #[test]
    fn test_issue_over_open_record_rolls_back_stock() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);
        coordinator
            .issue(&IssueRequest::new("W-100", 5, 1, due()).with_ammunition("9mm", 2))
            .unwrap();

        // A manual correction leaves the weapon AVAILABLE with its record still open
        storage
            .update_weapon(
                "W-100",
                &WeaponUpdate {
                    status: Some(WeaponStatus::Available),
                    ..WeaponUpdate::default()
                },
            )
            .unwrap();

        let err = coordinator
            .issue(&IssueRequest::new("W-100", 2, 1, due()).with_ammunition("9mm", 3))
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(storage.stock("9mm").unwrap(), 8);
        let history = storage.custody_history("W-100").unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].issued_to, 5);
        assert!(history[0].is_open());
        assert_eq!(
            storage.weapon("W-100").unwrap().status,
            WeaponStatus::Available
        );
    }

    #[test]
    fn test_issue_unknown_officer_writes_nothing() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);
        let err = coordinator
            .issue(&IssueRequest::new("W-100", 99, 1, due()).with_ammunition("9mm", 2))
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(storage.weapon("W-100").unwrap().status, WeaponStatus::Available);
        assert_eq!(storage.stock("9mm").unwrap(), 10);
    }

    #[test]
    fn test_issue_precondition_order() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);

        // unknown officer reported before bad ammunition
        let err = coordinator
            .issue(&IssueRequest::new("W-100", 99, 1, due()).with_ammunition("9mm", 0))
            .unwrap_err();
        assert!(err.is_not_found());

        // unavailable weapon reported before unknown officer
        coordinator
            .issue(&IssueRequest::new("W-100", 5, 1, due()))
            .unwrap();
        let err = coordinator
            .issue(&IssueRequest::new("W-100", 99, 1, due()))
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_issue_over_request() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);
        let err = coordinator
            .issue(&IssueRequest::new("W-100", 5, 1, due()).with_ammunition("9mm", 11))
            .unwrap_err();

        assert!(err.is_insufficient_stock());
        assert_eq!(storage.stock("9mm").unwrap(), 10);
        assert_eq!(storage.weapon("W-100").unwrap().status, WeaponStatus::Available);
        assert!(storage.custody_history("W-100").unwrap().is_empty());
    }

    #[test]
    fn test_issue_unknown_ammunition_type() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);
        let err = coordinator
            .issue(&IssueRequest::new("W-100", 5, 1, due()).with_ammunition("12ga", 1))
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(storage.weapon("W-100").unwrap().status, WeaponStatus::Available);
    }

    #[test]
    fn test_return_restores_stock_and_status() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);
        coordinator
            .issue(
                &IssueRequest::new("W-100", 5, 1, due())
                    .with_ammunition("9mm", 2)
                    .with_ammunition_note("sealed"),
            )
            .unwrap();

        let record = coordinator
            .return_weapon(
                &ReturnRequest::new("W-100", 2)
                    .with_ammunition(1, 15)
                    .with_ammunition_note("one mag used"),
            )
            .unwrap();

        assert!(!record.is_open());
        assert_eq!(record.received_by, Some(2));
        assert_eq!(record.return_note.as_deref(), Some(DEFAULT_RETURN_NOTE));
        let ammo = record.ammunition.unwrap();
        assert_eq!(ammo.returned_magazines, Some(1));
        assert_eq!(ammo.used_bullets, Some(15));
        assert_eq!(ammo.condition.as_deref(), Some(DEFAULT_AMMUNITION_CONDITION));
        assert_eq!(
            ammo.remarks.as_deref(),
            Some("sealed\n[Return] one mag used")
        );
        assert_eq!(storage.stock("9mm").unwrap(), 9);
        assert_eq!(storage.weapon("W-100").unwrap().status, WeaponStatus::Available);
        assert!(storage.open_record("W-100").unwrap().is_none());
    }

    #[test]
    fn test_return_without_open_record() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);
        let err = coordinator
            .return_weapon(&ReturnRequest::new("W-100", 2))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("active issue"));
    }

    #[test]
    fn test_over_return_writes_nothing() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage);
        coordinator
            .issue(&IssueRequest::new("W-100", 5, 1, due()).with_ammunition("9mm", 2))
            .unwrap();

        let err = coordinator
            .return_weapon(&ReturnRequest::new("W-100", 2).with_ammunition(3, 0))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(storage.stock("9mm").unwrap(), 8);
        assert_eq!(storage.weapon("W-100").unwrap().status, WeaponStatus::Issued);
        assert!(storage.open_record("W-100").unwrap().is_some());
    }

    #[test]
    fn test_return_custom_policy() {
        let storage = create_test_storage();
        let coordinator = CustodyCoordinator::new(&storage, &storage).with_policy(CustodyPolicy {
            default_return_note: "Checked in".to_string(),
            default_ammunition_condition: "unchecked".to_string(),
        });
        coordinator
            .issue(&IssueRequest::new("W-100", 5, 1, due()).with_ammunition("9mm", 1))
            .unwrap();
        let record = coordinator
            .return_weapon(&ReturnRequest::new("W-100", 2).with_ammunition(1, 0))
            .unwrap();
        assert_eq!(record.return_note.as_deref(), Some("Checked in"));
        assert_eq!(
            record.ammunition.unwrap().condition.as_deref(),
            Some("unchecked")
        );
    }

    #[test]
    fn test_external_roster() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .register_weapon(&NewWeapon::new("W-1", "Rifle"))
            .unwrap();
        let roster: OfficerRoster = [1, 5]
            .into_iter()
            .map(|id| Officer {
                id,
                name: format!("Officer {id}"),
                badge_no: None,
                role: None,
                status: "Active".to_string(),
            })
            .collect();
        let coordinator = CustodyCoordinator::new(&storage, &roster);

        coordinator
            .issue(&IssueRequest::new("W-1", 5, 1, due()))
            .unwrap();
        assert!(coordinator
            .return_weapon(&ReturnRequest::new("W-1", 7))
            .unwrap_err()
            .is_not_found());
        coordinator
            .return_weapon(&ReturnRequest::new("W-1", 1))
            .unwrap();
    }
}
