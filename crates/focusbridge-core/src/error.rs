//! Core error types for focusbridge-core.
//!
//! Three families live here: remote ledger failures (non-fatal, reported
//! upward), rejections of contract violations (returned as values, never
//! panics) and configuration errors.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusbridge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Remote ledger call failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// An operation was refused by the state machine or the sync guard
    #[error("Rejected: {0}")]
    Rejected(#[from] Rejection),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The runtime loop is no longer accepting commands
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reported by a [`SessionLedger`](crate::sync::SessionLedger).
///
/// None of these ever unwind the focus state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum LedgerError {
    /// Network or transport failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// The ledger has no session with this id
    #[error("session not found: {0}")]
    NotFound(String),

    /// The ledger refused the request (auth, validation)
    #[error("request rejected by ledger: {0}")]
    Rejected(String),

    /// Local persistence failure (file-backed ledgers)
    #[error("ledger storage failure: {0}")]
    Storage(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

/// Contract violations. Returned synchronously; the state is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("a work interval is already running")]
    AlreadyWorking,

    #[error("cannot start a break during a work interval")]
    BreakDuringWork,

    #[error("a break is already running")]
    AlreadyOnBreak,

    #[error("nothing to resume")]
    NothingToResume,

    #[error("nothing to skip")]
    NothingToSkip,

    #[error("nothing to cancel")]
    NothingToCancel,

    #[error("no task is bound to the current interval")]
    NoActiveTask,

    #[error("no remote session is pending completion")]
    NoPendingSession,

    #[error("invalid settings: {field} {message}")]
    InvalidSettings { field: String, message: String },
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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Could not resolve the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Errors from talking to a running [`FocusRuntime`](crate::runtime::FocusRuntime).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("focus runtime has stopped")]
    Stopped,

    #[error("focus runtime task failed: {0}")]
    Join(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
