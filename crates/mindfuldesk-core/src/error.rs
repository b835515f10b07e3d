//! Core error types for mindfuldesk-core.
//!
//! Every operation exposed to the presentation layer returns [`CoreError`]
//! on failure. Persistence backends report [`StoreError`], which the
//! settings store turns into a non-blocking `StoreUnavailable` warning.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for mindfuldesk-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Illegal state-machine operation. State is left unchanged.
    #[error("Invalid transition: cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: String,
    },

    /// Policy violation, e.g. an override requested while overrides are off.
    #[error("Not permitted: {0}")]
    NotPermitted(String),

    /// Authoritative persistence failed; the local cache still holds the value.
    #[error("Settings store unavailable for '{key}': {message}")]
    StoreUnavailable { key: String, message: String },

    /// Notification delivery failed or permission was never granted.
    #[error("Notifier unavailable: {0}")]
    NotifierUnavailable(String),

    /// The runtime driver has shut down and no longer accepts commands.
    #[error("Runtime stopped")]
    RuntimeStopped,

    /// Referenced item does not exist
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Shorthand for an [`CoreError::InvalidTransition`].
    pub fn invalid_transition(operation: &'static str, state: impl ToString) -> Self {
        CoreError::InvalidTransition {
            operation,
            state: state.to_string(),
        }
    }
}

/// Failure of a single authoritative or cache read/write.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not be reached or refused the operation
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Stored payload could not be decoded into the aggregate
    #[error("corrupt payload for '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Cannot prepare data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value below its allowed minimum
    #[error("'{field}' must be at least {min}, got {value}")]
    BelowMinimum {
        field: &'static str,
        min: u32,
        value: u32,
    },

    /// Required text was empty
    #[error("'{0}' must not be empty")]
    Empty(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    /// Reject `value` when it is below `min`.
    pub fn check_min(field: &'static str, value: u32, min: u32) -> Result<(), ValidationError> {
        if value < min {
            return Err(ValidationError::BelowMinimum { field, min, value });
        }
        Ok(())
    }

    /// Reject blank text.
    pub fn check_not_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::Empty(field));
        }
        Ok(())
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_transition_message_names_state() {
        let err = CoreError::invalid_transition("start", "running");
        assert_eq!(
            err.to_string(),
            "Invalid transition: cannot start while running"
        );
    }

    #[test]
    fn check_min_rejects_zero_interval() {
        let err = ValidationError::check_min("intervalMinutes", 0, 1).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::BelowMinimum { min: 1, value: 0, .. }
        ));
        assert!(ValidationError::check_min("intervalMinutes", 1, 1).is_ok());
    }

    #[test]
    fn check_not_empty_rejects_whitespace() {
        assert!(ValidationError::check_not_empty("name", "   ").is_err());
        assert!(ValidationError::check_not_empty("name", "YouTube").is_ok());
    }
}
