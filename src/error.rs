//! Error types for the mock simulation engine.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, MockError>;

/// Errors that can occur in the mock engine
#[derive(Debug, Error)]
pub enum MockError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A route-definition file failed to parse or compile
    #[error("Failed to load mock file {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// Invalid route pattern (bad regex or malformed parameter segment)
    #[error("Invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Scenario name not known to the manager
    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    /// Scenario already exists under that name
    #[error("Scenario already exists: {0}")]
    ScenarioExists(String),

    /// The built-in default scenario cannot be deleted
    #[error("Scenario {0:?} is protected and cannot be deleted")]
    ScenarioProtected(String),

    /// Persisted recording not found on disk
    #[error("Recording not found: {0}")]
    RecordingNotFound(String),

    /// Unknown data-template name
    #[error("Unknown data template: {0}")]
    TemplateNotFound(String),

    /// Name not usable as a file stem
    #[error("Invalid name {0:?}: only alphanumerics, '-' and '_' are allowed")]
    InvalidName(String),

    /// Persistence serialization failure
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
