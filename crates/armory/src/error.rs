//! Error types for armory.
//!
//! Domain failures (missing weapons, double issues, short stock, malformed
//! counts) and infrastructure failures (database, configuration, I/O) share
//! one enum so the request layer can map everything through [`Error::kind`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for armory operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Domain Errors ===
    /// A referenced weapon, officer, ammunition type or open custody record
    /// does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// What kind of thing was looked up.
        entity: &'static str,
        /// The key it was looked up by.
        key: String,
    },

    /// The operation conflicts with current state (e.g. weapon already issued).
    #[error("conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// Requested ammunition exceeds what the stock ledger holds.
    #[error(
        "insufficient stock for '{ammunition_type}': available {available}, requested {requested}"
    )]
    InsufficientStock {
        /// Ammunition type that ran short.
        ammunition_type: String,
        /// Magazines currently in stock.
        available: i64,
        /// Magazines requested.
        requested: i64,
    },

    /// Malformed input (negative counts, returned exceeds issued, ...).
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the validation failure.
        message: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for armory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], used by request layers to pick a
/// response status or exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 404-equivalent.
    NotFound,
    /// 409-equivalent. Callers must re-read state instead of retrying blindly.
    Conflict,
    /// 400-equivalent, message carries the available count.
    InsufficientStock,
    /// 400-equivalent.
    Validation,
    /// Configuration could not be loaded or is invalid.
    Config,
    /// Database, I/O, serialization or internal failure.
    Internal,
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an insufficient stock error.
    #[must_use]
    pub fn insufficient_stock(
        ammunition_type: impl Into<String>,
        available: i64,
        requested: i64,
    ) -> Self {
        Self::InsufficientStock {
            ammunition_type: ammunition_type.into(),
            available,
            requested,
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::ConfigLoad(_) | Self::ConfigValidation { .. } => ErrorKind::Config,
            Self::DatabaseOpen { .. }
            | Self::DatabaseQuery(_)
            | Self::DatabaseMigration { .. }
            | Self::Io(_)
            | Self::DirectoryCreate { .. }
            | Self::Json(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Check if this error means a referenced entity does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a state conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if this error is a stock shortfall.
    #[must_use]
    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, Self::InsufficientStock { .. })
    }

    /// Check if this error is an input validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
