//! Error types for hbnb-store operations.
//!
//! This module provides the error hierarchy using `thiserror` for storage,
//! configuration, I/O, and console commands. "Not found" is deliberately
//! absent: lookups report it as `None` or an empty map.

use thiserror::Error;

/// Result type alias for hbnb-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage-related errors (either backend).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration errors (backend selection, connection parameters).
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Console/CLI command errors.
    #[error("command error: {0}")]
    Command(#[from] CommandError),
}

/// Storage-specific errors shared by both backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Database connection or query error.
    #[error("database error: {0}")]
    Database(String),

    /// A save failed and its unit of work was rolled back.
    #[error("persistence failed, changes rolled back: {0}")]
    Persistence(String),

    /// The snapshot file exists but cannot be turned into records.
    #[error("corrupt snapshot {path}: {reason}")]
    CorruptSnapshot {
        /// Path of the snapshot file.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A class tag outside the fixed registry.
    #[error("unknown class: {tag}")]
    UnknownClass {
        /// The tag that was not recognized.
        tag: String,
    },

    /// A record whose fields cannot be mapped.
    #[error("invalid record {key}: {reason}")]
    InvalidRecord {
        /// Identity key (or best effort) of the record.
        key: String,
        /// Reason the record is invalid.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Configuration errors raised while selecting or opening a backend.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required parameter is absent.
    #[error("missing required setting: {name}")]
    Missing {
        /// Environment-style name of the setting.
        name: &'static str,
    },

    /// A parameter is present but unusable.
    #[error("invalid value for {name}: {value}")]
    Invalid {
        /// Environment-style name of the setting.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// I/O-specific errors for file operations.
#[derive(Error, Debug)]
pub enum IoError {
    /// Failed to read file.
    #[error("failed to read file: {path}: {reason}")]
    ReadFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to write file.
    #[error("failed to write file: {path}: {reason}")]
    WriteFailed {
        /// Path to the file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Directory creation error.
    #[error("failed to create directory: {path}: {reason}")]
    DirectoryFailed {
        /// Path to the directory.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Generic I/O error wrapper.
    #[error("I/O error: {0}")]
    Generic(String),
}

/// Console command errors.
#[derive(Error, Debug)]
pub enum CommandError {
    /// Invalid argument provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Command execution failed.
    #[error("command execution failed: {0}")]
    ExecutionFailed(String),
}

// Implement From traits for standard library and driver errors

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(IoError::Generic(err.to_string()))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(StorageError::Database(err.to_string()))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Storage(StorageError::from(err))
    }
}
