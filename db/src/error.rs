//! Error types for definition loading and configuration.
//!
//! Provides a unified error type covering I/O, JSON and YAML parsing, and
//! invalid definitions.

use thiserror::Error;

/// Errors that can occur while loading definitions or configuration.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A definition or configuration value is unusable.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// All configured loader sources failed.
    #[error("no field group sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`DatabaseError`].
pub type Result<T> = std::result::Result<T, DatabaseError>;
