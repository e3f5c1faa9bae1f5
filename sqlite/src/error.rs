//! Error types for schema synchronization and value mapping.
//!
//! Provides a unified error type covering store access, identifier
//! validation, definition problems, and definition loading.

use acf_tables_core::IdentifierError;
use thiserror::Error;

/// Errors that can occur while synchronizing schemas or mapping values.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// Table prefix contains invalid characters.
    #[error("invalid prefix '{0}': must contain only ASCII alphanumerics, '_' and '-'")]
    InvalidPrefix(String),

    /// A table or column name failed the identifier allow-list.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] IdentifierError),

    /// A field group could not be resolved.
    #[error("unknown field group: {0}")]
    UnknownFieldGroup(String),

    /// A read targeted a column the table does not have.
    #[error("no column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// A field-group definition or column request is unusable.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// Error loading field-group definitions or configuration.
    #[error("loader error: {0}")]
    LoaderError(#[from] acf_tables_db::DatabaseError),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
