//! Custody records and the requests that create and close them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::ammunition::normalize_type;
use crate::error::{Error, Result};
use crate::officer::OfficerId;
use crate::weapon::WeaponStatus;

/// Tag prefixed to ammunition remarks added at return time.
pub const RETURN_REMARK_TAG: &str = "[Return]";

/// Ammunition handed out with a weapon, and what came back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmunitionAllotment {
    /// Ammunition type drawn from the stock ledger.
    pub ammunition_type: String,
    /// Magazines issued.
    pub issued_magazines: i64,
    /// Magazines returned, set on return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_magazines: Option<i64>,
    /// Bullets fired, set on return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_bullets: Option<i64>,
    /// Condition of the returned ammunition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Issue-time note followed by any tagged return-time notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

/// One custody event: a weapon issued to an officer, closed when returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyRecord {
    /// Record id.
    pub id: i64,
    /// Serial of the weapon issued.
    pub weapon_serial: String,
    /// Officer who received the weapon.
    pub issued_to: OfficerId,
    /// Officer who handed it over.
    pub handed_over_by: OfficerId,
    /// When the weapon was issued.
    pub issued_at: DateTime<Utc>,
    /// When the weapon is due back.
    pub due_date: NaiveDate,
    /// Note written at issue time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_note: Option<String>,
    /// Officer who took the weapon back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_by: Option<OfficerId>,
    /// When the weapon came back. `None` while the record is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
    /// Note written at return time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_note: Option<String>,
    /// Ammunition issued with the weapon, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ammunition: Option<AmmunitionAllotment>,
    /// Status marker written when the record was created.
    ///
    /// Always [`WeaponStatus::Issued`]: the record describes the issue event.
    /// Whether the weapon is still out is [`CustodyRecord::is_open`].
    pub status: WeaponStatus,
}

impl CustodyRecord {
    /// Check whether the weapon is still checked out under this record.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }

    /// Check whether the record is open past its due date.
    #[must_use]
    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        self.is_open() && self.due_date < as_of
    }
}

/// Request to issue a weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Serial of the weapon to issue.
    pub weapon_serial: String,
    /// Officer receiving the weapon.
    pub issued_to: OfficerId,
    /// Officer handing it over.
    pub handed_over_by: OfficerId,
    /// Due date.
    pub due_date: NaiveDate,
    /// Issue note.
    pub issue_note: Option<String>,
    /// Ammunition type to draw, if any.
    pub ammunition_type: Option<String>,
    /// Magazines to draw, if any.
    pub magazines: Option<i64>,
    /// Note about the ammunition.
    pub ammunition_note: Option<String>,
}

impl IssueRequest {
    /// Create a request without ammunition.
    #[must_use]
    pub fn new(
        weapon_serial: impl Into<String>,
        issued_to: OfficerId,
        handed_over_by: OfficerId,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            weapon_serial: weapon_serial.into(),
            issued_to,
            handed_over_by,
            due_date,
            issue_note: None,
            ammunition_type: None,
            magazines: None,
            ammunition_note: None,
        }
    }

    /// Set the issue note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.issue_note = Some(note.into());
        self
    }

    /// Draw `magazines` of `ammunition_type` with the weapon.
    #[must_use]
    pub fn with_ammunition(mut self, ammunition_type: impl Into<String>, magazines: i64) -> Self {
        self.ammunition_type = Some(ammunition_type.into());
        self.magazines = Some(magazines);
        self
    }

    /// Set the ammunition note.
    #[must_use]
    pub fn with_ammunition_note(mut self, note: impl Into<String>) -> Self {
        self.ammunition_note = Some(note.into());
        self
    }

    /// The requested ammunition as `(type, magazines)`, trimmed and checked.
    ///
    /// A blank type with no count means no ammunition.
    ///
    /// # Errors
    ///
    /// Returns a validation error if only one of type and count is given, or
    /// the count is not positive.
    pub fn requested_ammunition(&self) -> Result<Option<(&str, i64)>> {
        let ammunition_type = self
            .ammunition_type
            .as_deref()
            .filter(|t| !t.trim().is_empty());
        match (ammunition_type, self.magazines) {
            (None, None) => Ok(None),
            (Some(t), Some(magazines)) => {
                if magazines <= 0 {
                    return Err(Error::validation(format!(
                        "magazines to issue must be greater than 0, got {magazines}"
                    )));
                }
                Ok(Some((normalize_type(t)?, magazines)))
            }
            (Some(_), None) => Err(Error::validation(
                "magazine count is required when an ammunition type is given",
            )),
            (None, Some(_)) => Err(Error::validation(
                "ammunition type is required when a magazine count is given",
            )),
        }
    }
}

/// Request to return a weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    /// Serial of the weapon being returned.
    pub weapon_serial: String,
    /// Officer taking the weapon back.
    pub received_by: OfficerId,
    /// Return note.
    pub return_note: Option<String>,
    /// Magazines handed back.
    pub returned_magazines: Option<i64>,
    /// Bullets fired while out.
    pub used_bullets: Option<i64>,
    /// Condition of the returned ammunition.
    pub ammunition_condition: Option<String>,
    /// Note about the returned ammunition.
    pub ammunition_note: Option<String>,
}

/// Ammunition figures of a return, checked against the allotment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CheckedReturn {
    pub returned_magazines: i64,
    pub used_bullets: i64,
}

impl ReturnRequest {
    /// Create a request with no ammunition figures.
    #[must_use]
    pub fn new(weapon_serial: impl Into<String>, received_by: OfficerId) -> Self {
        Self {
            weapon_serial: weapon_serial.into(),
            received_by,
            return_note: None,
            returned_magazines: None,
            used_bullets: None,
            ammunition_condition: None,
            ammunition_note: None,
        }
    }

    /// Set the return note.
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.return_note = Some(note.into());
        self
    }

    /// Report returned magazines and bullets used.
    #[must_use]
    pub fn with_ammunition(mut self, returned_magazines: i64, used_bullets: i64) -> Self {
        self.returned_magazines = Some(returned_magazines);
        self.used_bullets = Some(used_bullets);
        self
    }

    /// Set the ammunition condition.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.ammunition_condition = Some(condition.into());
        self
    }

    /// Set the ammunition note.
    #[must_use]
    pub fn with_ammunition_note(mut self, note: impl Into<String>) -> Self {
        self.ammunition_note = Some(note.into());
        self
    }

    /// Check the ammunition figures against what was issued.
    ///
    /// Returns `None` when the open record carries no allotment.
    pub(crate) fn check_against(
        &self,
        allotment: Option<&AmmunitionAllotment>,
    ) -> Result<Option<CheckedReturn>> {
        if let Some(used) = self.used_bullets {
            if used < 0 {
                return Err(Error::validation(format!(
                    "used bullets cannot be negative, got {used}"
                )));
            }
        }

        let Some(allotment) = allotment else {
            return match self.returned_magazines {
                None | Some(0) => Ok(None),
                Some(n) => Err(Error::validation(format!(
                    "{n} magazines returned but none were issued with this weapon"
                ))),
            };
        };

        let returned = self.returned_magazines.ok_or_else(|| {
            Error::validation("returned magazine count is required when ammunition was issued")
        })?;
        if returned < 0 {
            return Err(Error::validation(format!(
                "returned magazines cannot be negative, got {returned}"
            )));
        }
        if returned > allotment.issued_magazines {
            return Err(Error::validation(format!(
                "returned magazines ({returned}) cannot exceed issued magazines ({})",
                allotment.issued_magazines
            )));
        }

        Ok(Some(CheckedReturn {
            returned_magazines: returned,
            used_bullets: self.used_bullets.unwrap_or(0),
        }))
    }
}

/// Append a tagged return-time note to existing ammunition remarks.
///
/// Blank notes leave the remarks untouched.
#[must_use]
pub fn append_return_remark(existing: Option<&str>, note: Option<&str>) -> Option<String> {
    let note = note.map(str::trim).filter(|n| !n.is_empty());
    match (existing.filter(|e| !e.is_empty()), note) {
        (existing, None) => existing.map(str::to_string),
        (None, Some(note)) => Some(format!("{RETURN_REMARK_TAG} {note}")),
        (Some(existing), Some(note)) => Some(format!("{existing}\n{RETURN_REMARK_TAG} {note}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 8).unwrap()
    }

    fn allotment(issued: i64) -> AmmunitionAllotment {
        AmmunitionAllotment {
            ammunition_type: "9mm".to_string(),
            issued_magazines: issued,
            returned_magazines: None,
            used_bullets: None,
            condition: None,
            remarks: None,
        }
    }

    fn record(returned_at: Option<DateTime<Utc>>) -> CustodyRecord {
        CustodyRecord {
            id: 1,
            weapon_serial: "W-100".to_string(),
            issued_to: 5,
            handed_over_by: 1,
            issued_at: Utc::now(),
            due_date: due(),
            issue_note: None,
            received_by: None,
            returned_at,
            return_note: None,
            ammunition: None,
            status: WeaponStatus::Issued,
        }
    }

    #[test]
    fn test_record_open_is_derived_from_return_timestamp() {
        assert!(record(None).is_open());
        assert!(!record(Some(Utc::now())).is_open());
    }

    #[test]
    fn test_record_overdue() {
        let open = record(None);
        assert!(open.is_overdue(NaiveDate::from_ymd_opt(2026, 1, 9).unwrap()));
        assert!(!open.is_overdue(due()));
        assert!(!record(Some(Utc::now())).is_overdue(NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()));
    }

    #[test]
    fn test_requested_ammunition_none() {
        let req = IssueRequest::new("W-100", 5, 1, due());
        assert_eq!(req.requested_ammunition().unwrap(), None);
    }

    #[test]
    fn test_requested_ammunition_trims_type() {
        let req = IssueRequest::new("W-100", 5, 1, due()).with_ammunition(" 9mm ", 2);
        assert_eq!(req.requested_ammunition().unwrap(), Some(("9mm", 2)));
    }

    #[test]
    fn test_requested_ammunition_rejects_non_positive() {
        let req = IssueRequest::new("W-100", 5, 1, due()).with_ammunition("9mm", 0);
        assert!(req.requested_ammunition().unwrap_err().is_validation());
        let req = IssueRequest::new("W-100", 5, 1, due()).with_ammunition("9mm", -3);
        assert!(req.requested_ammunition().unwrap_err().is_validation());
    }

    #[test]
    fn test_requested_ammunition_requires_both_halves() {
        let mut req = IssueRequest::new("W-100", 5, 1, due());
        req.magazines = Some(2);
        assert!(req.requested_ammunition().unwrap_err().is_validation());

        let mut req = IssueRequest::new("W-100", 5, 1, due());
        req.ammunition_type = Some("9mm".to_string());
        assert!(req.requested_ammunition().unwrap_err().is_validation());
    }

    #[test]
    fn test_blank_ammunition_type_means_none() {
        let mut req = IssueRequest::new("W-100", 5, 1, due());
        req.ammunition_type = Some("   ".to_string());
        assert_eq!(req.requested_ammunition().unwrap(), None);
    }

    #[test]
    fn test_check_return_without_allotment() {
        let req = ReturnRequest::new("W-100", 2);
        assert_eq!(req.check_against(None).unwrap(), None);
        let req = ReturnRequest::new("W-100", 2).with_ammunition(0, 0);
        assert_eq!(req.check_against(None).unwrap(), None);
        let req = ReturnRequest::new("W-100", 2).with_ammunition(1, 0);
        assert!(req.check_against(None).unwrap_err().is_validation());
    }

    #[test]
    fn test_check_return_requires_count_when_allotted() {
        let req = ReturnRequest::new("W-100", 2);
        let err = req.check_against(Some(&allotment(2))).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_check_return_bounds() {
        let a = allotment(2);
        let ok = ReturnRequest::new("W-100", 2).with_ammunition(2, 0);
        assert_eq!(
            ok.check_against(Some(&a)).unwrap(),
            Some(CheckedReturn {
                returned_magazines: 2,
                used_bullets: 0
            })
        );
        let over = ReturnRequest::new("W-100", 2).with_ammunition(3, 0);
        assert!(over
            .check_against(Some(&a))
            .unwrap_err()
            .to_string()
            .contains("cannot exceed"));
        let negative = ReturnRequest::new("W-100", 2).with_ammunition(-1, 0);
        assert!(negative.check_against(Some(&a)).unwrap_err().is_validation());
    }

    #[test]
    fn test_check_return_rejects_negative_used_bullets() {
        let req = ReturnRequest::new("W-100", 2).with_ammunition(1, -5);
        assert!(req.check_against(Some(&allotment(2))).unwrap_err().is_validation());
    }

    #[test]
    fn test_used_bullets_default_to_zero() {
        let mut req = ReturnRequest::new("W-100", 2);
        req.returned_magazines = Some(1);
        let checked = req.check_against(Some(&allotment(2))).unwrap().unwrap();
        assert_eq!(checked.used_bullets, 0);
    }

    #[test]
    fn test_append_return_remark() {
        assert_eq!(append_return_remark(None, None), None);
        assert_eq!(
            append_return_remark(Some("sealed box"), None).as_deref(),
            Some("sealed box")
        );
        assert_eq!(
            append_return_remark(None, Some(" one mag damp ")).as_deref(),
            Some("[Return] one mag damp")
        );
        assert_eq!(
            append_return_remark(Some("sealed box"), Some("opened")).as_deref(),
            Some("sealed box\n[Return] opened")
        );
        assert_eq!(
            append_return_remark(Some("sealed box"), Some("  ")).as_deref(),
            Some("sealed box")
        );
    }
}
