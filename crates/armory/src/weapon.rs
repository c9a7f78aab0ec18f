//! Weapon registry types.
//!
//! A weapon is identified by its serial number for its whole life. Serials
//! are never reused and weapons are never deleted; retirement or maintenance
//! is expressed through remarks and the administrative status override.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Custody status of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeaponStatus {
    /// In the armory and eligible for issue.
    Available,
    /// Checked out to an officer.
    Issued,
}

impl WeaponStatus {
    /// The string stored in the database.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Issued => "ISSUED",
        }
    }
}

impl std::fmt::Display for WeaponStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeaponStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AVAILABLE" => Ok(Self::Available),
            "ISSUED" => Ok(Self::Issued),
            other => Err(Error::validation(format!("unknown weapon status: {other}"))),
        }
    }
}

/// A registered weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    /// Unique serial number.
    pub serial_number: String,
    /// Weapon type, e.g. "Pistol".
    pub weapon_type: String,
    /// Current custody status.
    pub status: WeaponStatus,
    /// Free-text remarks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// When the weapon was registered.
    pub registered_at: DateTime<Utc>,
    /// When the row was last changed.
    pub updated_at: DateTime<Utc>,
}

impl Weapon {
    /// Check whether the weapon can be issued.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.status == WeaponStatus::Available
    }
}

/// Input for registering a weapon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWeapon {
    /// Serial number; trimmed before storage.
    pub serial_number: String,
    /// Weapon type.
    pub weapon_type: String,
    /// Optional remarks.
    pub remarks: Option<String>,
}

impl NewWeapon {
    /// Create a registration request.
    #[must_use]
    pub fn new(serial_number: impl Into<String>, weapon_type: impl Into<String>) -> Self {
        Self {
            serial_number: serial_number.into(),
            weapon_type: weapon_type.into(),
            remarks: None,
        }
    }

    /// Attach remarks.
    #[must_use]
    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

/// Administrative metadata update. `None` fields are left unchanged.
///
/// Setting `status` here bypasses the custody coordinator and is meant for
/// corrections, not for custody events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponUpdate {
    /// New weapon type.
    pub weapon_type: Option<String>,
    /// New remarks. A blank string clears them.
    pub remarks: Option<String>,
    /// Status override.
    pub status: Option<WeaponStatus>,
}

impl WeaponUpdate {
    /// Check whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weapon_type.is_none() && self.remarks.is_none() && self.status.is_none()
    }
}

/// Accepted shape of weapon serial numbers.
#[derive(Debug, Clone)]
pub struct SerialFormat {
    pattern: Regex,
}

/// Letters, digits and `-`, `_`, `.`, `/` separators, starting alphanumeric.
pub const DEFAULT_SERIAL_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9._/-]{0,63}$";

impl SerialFormat {
    /// Compile a serial format from a regex.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|e| Error::ConfigValidation {
            message: format!("invalid serial pattern {pattern}: {e}"),
        })?;
        Ok(Self { pattern })
    }

    /// Trim a serial and check it against the format.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty or non-matching serial.
    pub fn normalize<'a>(&self, serial: &'a str) -> Result<&'a str> {
        let serial = serial.trim();
        if serial.is_empty() {
            return Err(Error::validation("weapon serial number is required"));
        }
        if !self.pattern.is_match(serial) {
            return Err(Error::validation(format!(
                "weapon serial number '{serial}' does not match {}",
                self.pattern.as_str()
            )));
        }
        Ok(serial)
    }
}

impl Default for SerialFormat {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_SERIAL_PATTERN).expect("default serial pattern is valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [WeaponStatus::Available, WeaponStatus::Issued] {
            assert_eq!(status.as_str().parse::<WeaponStatus>().unwrap(), status);
        }
        assert_eq!(
            "issued".parse::<WeaponStatus>().unwrap(),
            WeaponStatus::Issued
        );
    }

    #[test]
    fn test_status_rejects_unknown() {
        let err = "RETURNED".parse::<WeaponStatus>().unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&WeaponStatus::Available).unwrap();
        assert_eq!(json, "\"AVAILABLE\"");
    }

    #[test]
    fn test_new_weapon_builder() {
        let weapon = NewWeapon::new("W-100", "Pistol").with_remarks("new");
        assert_eq!(weapon.serial_number, "W-100");
        assert_eq!(weapon.remarks.as_deref(), Some("new"));
    }

    #[test]
    fn test_weapon_update_is_empty() {
        assert!(WeaponUpdate::default().is_empty());
        let update = WeaponUpdate {
            remarks: Some("cleaned".to_string()),
            ..WeaponUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_serial_format_trims_and_accepts() {
        let format = SerialFormat::default();
        assert_eq!(format.normalize("  W-100 ").unwrap(), "W-100");
        assert_eq!(format.normalize("AK/47.001").unwrap(), "AK/47.001");
    }

    #[test]
    fn test_serial_format_rejects_empty_and_garbage() {
        let format = SerialFormat::default();
        assert!(format.normalize("   ").unwrap_err().is_validation());
        assert!(format.normalize("W 100").unwrap_err().is_validation());
        assert!(format.normalize("-W100").unwrap_err().is_validation());
    }

    #[test]
    fn test_serial_format_custom_pattern() {
        let format = SerialFormat::new(r"^W-\d{3}$").unwrap();
        assert!(format.normalize("W-100").is_ok());
        assert!(format.normalize("W-1000").is_err());
    }

    #[test]
    fn test_serial_format_invalid_regex() {
        let err = SerialFormat::new("[invalid").unwrap_err();
        assert!(err.to_string().contains("invalid serial pattern"));
    }
}
