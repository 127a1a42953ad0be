//! Core error types for stillpoint-core.
//!
//! Construction errors (`InvalidTimeline`, `InvalidStepList`) are returned
//! synchronously from `start`/`begin`. Runtime transitions never fail; the
//! only runtime failure is the remote submission of a finished check-in.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for stillpoint-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Timeline or step list rejected at construction time
    #[error(transparent)]
    Timeline(#[from] TimelineError),

    /// Session coordination errors
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Credential storage errors
    #[error("Credential store error: {0}")]
    Credentials(#[from] keyring::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejected phase timelines and step lists.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    #[error("Invalid step list: {0}")]
    InvalidStepList(String),
}

/// Session coordinator errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The authentication gate refused; no timers were started.
    #[error("Authentication required before starting a check-in")]
    AuthenticationRequired,

    /// The operation needs a running session.
    #[error("No check-in session is running")]
    NotRunning,

    /// A value could not be stored for the given step.
    #[error("Invalid value for step {step_index}: {message}")]
    InvalidField { step_index: usize, message: String },

    /// The submission collaborator rejected the record. The session is kept
    /// so `complete()` can be retried.
    #[error("Failed to submit check-in: {0}")]
    SubmissionFailed(String),
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
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
