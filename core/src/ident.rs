//! SQL identifier allow-list.
//!
//! Table and column names are derived from admin-authored field names and
//! end up inside generated DDL/DML. Every identifier must pass
//! [`validate_identifier`] before a store quotes and interpolates it.

use thiserror::Error;

/// Longest identifier accepted (MySQL's limit, which SQLite tolerates).
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Reasons an identifier is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("identifier cannot be empty")]
    Empty,
    #[error("identifier '{0}' exceeds 64 characters")]
    TooLong(String),
    #[error("identifier '{0}' may only contain ASCII letters, digits, '_' and '-'")]
    InvalidCharacter(String),
}

/// Checks `ident` against the allow-list: 1 to 64 ASCII alphanumerics,
/// underscores or hyphens.
///
/// # Examples
///
/// ```
/// use acf_tables_core::{IdentifierError, validate_identifier};
///
/// assert!(validate_identifier("faq_0_question").is_ok());
/// assert!(validate_identifier("hero-banner").is_ok());
/// assert_eq!(
///     validate_identifier("title; DROP TABLE wp_posts"),
///     Err(IdentifierError::InvalidCharacter("title; DROP TABLE wp_posts".into())),
/// );
/// ```
pub fn validate_identifier(ident: &str) -> Result<(), IdentifierError> {
    if ident.is_empty() {
        return Err(IdentifierError::Empty);
    }
    if ident.len() > MAX_IDENTIFIER_LEN {
        return Err(IdentifierError::TooLong(ident.to_string()));
    }
    if !ident
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(IdentifierError::InvalidCharacter(ident.to_string()));
    }
    Ok(())
}
