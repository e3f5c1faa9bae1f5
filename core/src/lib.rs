//! Core field-group model and schema derivation primitives.
//!
//! This crate defines the types shared by every part of the ACF custom
//! table engine:
//!
//! - [`FieldGroup`], [`Field`], [`FieldKind`]: the definition tree authored
//!   through ACF's field-group UI, deserializable from ACF's JSON export.
//! - [`join_column`], [`qualify`], [`split_repeater_item`]: hierarchical
//!   column naming.
//! - [`map_type`], [`SqlType`], [`encode_default`]: the field type mapper
//!   and column defaults.
//! - [`SqlValue`]: store-neutral cell values.
//! - [`FieldProvider`], [`FieldCatalog`]: field metadata lookup.
//! - [`validate_identifier`], [`validate_group`]: identifier allow-list
//!   and definition checks.
//!
//! # Example
//!
//! ```
//! use acf_tables_core::*;
//!
//! let group = FieldGroup::new("group_faq", "FAQ")
//!     .with_table("faq")
//!     .with_field(Field::new("field_title", "title", FieldKind::Text).with_max_length(80))
//!     .with_field(
//!         Field::new("field_faq", "faq", FieldKind::Group)
//!             .with_sub_field(Field::new("field_question", "question", FieldKind::Text)),
//!     );
//! assert!(validate_group(&group).is_empty());
//!
//! let catalog = FieldCatalog::from_groups([group]);
//! let question = catalog.field("field_question").unwrap();
//! assert_eq!(catalog.column_name(question), "faq_question");
//!
//! let title = catalog.field("field_title").unwrap();
//! assert_eq!(map_type(&title.kind, &TypeConstraints::from(title)), SqlType::Varchar(80));
//! ```

mod ident;
mod naming;
mod provider;
mod sql;
mod types;
mod validate;

pub use ident::{IdentifierError, MAX_IDENTIFIER_LEN, validate_identifier};
pub use naming::{SEPARATOR, join_column, parse_row_id, qualify, row_id, split_repeater_item};
pub use provider::{FieldCatalog, FieldProvider};
pub use sql::{
    ColumnInfo, ColumnSpec, SqlType, SqlValue, TypeConstraints, VARCHAR_CEILING, encode_default,
    map_type, quote_literal, varchar_length,
};
pub use types::*;
pub use validate::{ValidationError, validate_group};
