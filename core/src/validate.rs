//! Field-group validation.
//!
//! Catches definition problems that would otherwise surface as store
//! errors halfway through a synchronization: names outside the identifier
//! allow-list, duplicate keys, and distinct fields that derive the same
//! column name.
//!
//! # Examples
//!
//! ```
//! use acf_tables_core::*;
//!
//! let group = FieldGroup::new("group_page", "Page")
//!     .with_field(Field::new("field_title", "title", FieldKind::Text));
//! assert!(validate_group(&group).is_empty());
//!
//! // `hero` + `title` collides with a top-level `hero_title`
//! let bad = FieldGroup::new("group_page", "Page")
//!     .with_field(Field::new("field_ht", "hero_title", FieldKind::Text))
//!     .with_field(
//!         Field::new("field_hero", "hero", FieldKind::Group)
//!             .with_sub_field(Field::new("field_t", "title", FieldKind::Text)),
//!     );
//! assert_eq!(
//!     validate_group(&bad),
//!     vec![ValidationError::DuplicateColumn("hero_title".into())],
//! );
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{Field, FieldGroup, FieldKind, validate_identifier};

/// Field-group validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Group key is empty or whitespace-only.
    #[error("field group key cannot be empty")]
    EmptyGroupKey,
    /// The destination table name fails the identifier allow-list.
    #[error("invalid table name: {0}")]
    InvalidTableName(String),
    /// A field has an empty key.
    #[error("field '{0}' has an empty key")]
    EmptyFieldKey(String),
    /// A field has an empty name.
    #[error("field {0} has an empty name")]
    EmptyFieldName(String),
    /// A derived column name fails the identifier allow-list.
    #[error("invalid column name: {0}")]
    InvalidColumnName(String),
    /// Two fields in the group share a key.
    #[error("duplicate field key: {0}")]
    DuplicateFieldKey(String),
    /// Two fields derive the same column name.
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
}

/// Validates a field group, returning every problem found.
pub fn validate_group(group: &FieldGroup) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if group.key.trim().is_empty() {
        errors.push(ValidationError::EmptyGroupKey);
        return errors;
    }

    if validate_identifier(group.table_name()).is_err() {
        errors.push(ValidationError::InvalidTableName(
            group.table_name().to_string(),
        ));
    }

    let mut keys = HashSet::new();
    let mut columns = HashSet::new();
    let mut prefix = Vec::new();
    validate_fields(
        &group.fields,
        None,
        &mut prefix,
        &mut keys,
        &mut columns,
        &mut errors,
    );

    errors
}

fn validate_fields(
    fields: &[Field],
    parent_kind: Option<&FieldKind>,
    prefix: &mut Vec<String>,
    keys: &mut HashSet<String>,
    columns: &mut HashSet<String>,
    errors: &mut Vec<ValidationError>,
) {
    for field in fields {
        if field.key.trim().is_empty() {
            errors.push(ValidationError::EmptyFieldKey(field.name.clone()));
        } else if !keys.insert(field.key.clone()) {
            errors.push(ValidationError::DuplicateFieldKey(field.key.clone()));
        }

        if field.name.trim().is_empty() {
            errors.push(ValidationError::EmptyFieldName(field.key.clone()));
            continue;
        }

        let column = crate::join_column(prefix, &field.name);
        if validate_identifier(&column).is_err() {
            errors.push(ValidationError::InvalidColumnName(column.clone()));
        }
        if !columns.insert(column.clone()) {
            errors.push(ValidationError::DuplicateColumn(column));
        }

        // Descendants of a repeater's items live inside the item's JSON
        // column and derive no columns of their own.
        if parent_kind == Some(&FieldKind::Repeater) {
            continue;
        }

        prefix.push(field.name.clone());
        validate_fields(
            &field.sub_fields,
            Some(&field.kind),
            prefix,
            keys,
            columns,
            errors,
        );
        prefix.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_injection_in_table_name() {
        let group = FieldGroup::new("group_x", "X").with_table("x; DROP TABLE wp_posts");
        assert_eq!(
            validate_group(&group),
            vec![ValidationError::InvalidTableName(
                "x; DROP TABLE wp_posts".to_string()
            )]
        );
    }

    #[test]
    fn test_rejects_duplicate_keys_across_depths() {
        let group = FieldGroup::new("group_x", "X")
            .with_field(Field::new("field_a", "a", FieldKind::Text))
            .with_field(
                Field::new("field_g", "g", FieldKind::Group)
                    .with_sub_field(Field::new("field_a", "b", FieldKind::Text)),
            );
        assert_eq!(
            validate_group(&group),
            vec![ValidationError::DuplicateFieldKey("field_a".to_string())]
        );
    }

    #[test]
    fn test_rejects_empty_name() {
        let group = FieldGroup::new("group_x", "X")
            .with_field(Field::new("field_a", " ", FieldKind::Text));
        assert_eq!(
            validate_group(&group),
            vec![ValidationError::EmptyFieldName("field_a".to_string())]
        );
    }

    #[test]
    fn test_repeater_grandchildren_are_not_columns() {
        // Same grandchild name under two repeater items must not collide.
        let group = FieldGroup::new("group_x", "X").with_field(
            Field::new("field_r", "rows", FieldKind::Repeater)
                .with_sub_field(
                    Field::new("field_i1", "left", FieldKind::Group)
                        .with_sub_field(Field::new("field_l", "label", FieldKind::Text)),
                )
                .with_sub_field(Field::new("field_i2", "left_label", FieldKind::Text)),
        );
        assert!(validate_group(&group).is_empty());
    }

    #[test]
    fn test_rejects_empty_group_key() {
        let group = FieldGroup::new("  ", "X");
        assert_eq!(validate_group(&group), vec![ValidationError::EmptyGroupKey]);
    }
}
