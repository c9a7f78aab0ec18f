//! Ammunition stock ledger types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Magazine stock for one ammunition type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmunitionStock {
    /// Ammunition type, e.g. "9mm". Unique.
    pub ammunition_type: String,
    /// Magazines in stock. Never negative.
    pub magazines: i64,
    /// Free-text remarks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// When the type was registered.
    pub registered_at: DateTime<Utc>,
    /// When the count or remarks last changed.
    pub updated_at: DateTime<Utc>,
}

impl AmmunitionStock {
    /// Compute the count after applying `delta`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientStock`] if the result would be negative.
    pub fn apply(&self, delta: i64) -> Result<i64> {
        match self.magazines.checked_add(delta) {
            Some(next) if next >= 0 => Ok(next),
            Some(_) => Err(Error::insufficient_stock(
                &self.ammunition_type,
                self.magazines,
                delta.saturating_neg(),
            )),
            None => Err(Error::validation(format!(
                "magazine adjustment {delta} overflows stock for '{}'",
                self.ammunition_type
            ))),
        }
    }
}

/// Input for registering an ammunition type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAmmunition {
    /// Ammunition type; trimmed before storage.
    pub ammunition_type: String,
    /// Opening magazine count.
    pub magazines: i64,
    /// Optional remarks.
    pub remarks: Option<String>,
}

impl NewAmmunition {
    /// Create a registration request.
    #[must_use]
    pub fn new(ammunition_type: impl Into<String>, magazines: i64) -> Self {
        Self {
            ammunition_type: ammunition_type.into(),
            magazines,
            remarks: None,
        }
    }

    /// Attach remarks.
    #[must_use]
    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    /// Check the request and return the trimmed type.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty type or a negative count.
    pub fn validate(&self) -> Result<&str> {
        let ammunition_type = normalize_type(&self.ammunition_type)?;
        if self.magazines < 0 {
            return Err(Error::validation(format!(
                "opening magazine count cannot be negative: {}",
                self.magazines
            )));
        }
        Ok(ammunition_type)
    }
}

/// Trim an ammunition type and reject empty values.
///
/// # Errors
///
/// Returns a validation error if nothing is left after trimming.
pub fn normalize_type(ammunition_type: &str) -> Result<&str> {
    let trimmed = ammunition_type.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("ammunition type is required"));
    }
    Ok(trimmed)
}
