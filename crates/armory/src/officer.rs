//! Officers and the directory used to resolve officer references.
//!
//! Custody events name officers by id only. The coordinator resolves each
//! id through an [`OfficerDirectory`] before it writes anything, so a typo in
//! an id fails the event instead of recording a dangling reference.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Officer identifier, shared with the wider user directory.
pub type OfficerId = i64;

/// Status value for officers who can take part in custody events.
pub const ACTIVE_STATUS: &str = "Active";

/// An officer known to the armory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
    /// User id.
    pub id: OfficerId,
    /// Display name.
    pub name: String,
    /// Badge number, unique when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge_no: Option<String>,
    /// Role, e.g. "OIC" or "FieldOfficer".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Account status, `Active` for serving officers.
    pub status: String,
}

impl Officer {
    /// Check whether the officer is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(ACTIVE_STATUS)
    }
}

/// Input for adding an officer to the local directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOfficer {
    /// Explicit id, or `None` to let storage assign one.
    pub id: Option<OfficerId>,
    /// Display name.
    pub name: String,
    /// Badge number.
    pub badge_no: Option<String>,
    /// Role.
    pub role: Option<String>,
}

impl NewOfficer {
    /// Create an officer record with a storage-assigned id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            badge_no: None,
            role: None,
        }
    }

    /// Use an explicit id (ids usually come from the user directory).
    #[must_use]
    pub fn with_id(mut self, id: OfficerId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the badge number.
    #[must_use]
    pub fn with_badge(mut self, badge_no: impl Into<String>) -> Self {
        self.badge_no = Some(badge_no.into());
        self
    }

    /// Set the role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Lookup of officers by id.
///
/// Implemented by [`crate::Storage`] (the local `officers` table) and by
/// [`OfficerRoster`] for callers whose users live elsewhere.
pub trait OfficerDirectory {
    /// Find an officer by id, returning `None` if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup itself fails.
    fn find_officer(&self, id: OfficerId) -> Result<Option<Officer>>;

    /// Find an officer by id, failing if the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown id, or the lookup error.
    fn require_officer(&self, id: OfficerId) -> Result<Officer> {
        self.find_officer(id)?
            .ok_or_else(|| Error::not_found("officer", id.to_string()))
    }
}

/// In-memory officer directory.
#[derive(Debug, Clone, Default)]
pub struct OfficerRoster {
    officers: HashMap<OfficerId, Officer>,
}

impl OfficerRoster {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an officer.
    pub fn insert(&mut self, officer: Officer) {
        self.officers.insert(officer.id, officer);
    }

    /// Number of officers in the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.officers.len()
    }

    /// Check if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.officers.is_empty()
    }
}

impl FromIterator<Officer> for OfficerRoster {
    fn from_iter<I: IntoIterator<Item = Officer>>(iter: I) -> Self {
        Self {
            officers: iter.into_iter().map(|o| (o.id, o)).collect(),
        }
    }
}

impl OfficerDirectory for OfficerRoster {
    fn find_officer(&self, id: OfficerId) -> Result<Option<Officer>> {
        Ok(self.officers.get(&id).cloned())
    }
}
