//! Schema synchronization: keeps a group's table in step with its fields.
//!
//! [`Synchronizer::synchronize`] creates the table if it is missing, adds
//! columns for new fields and rebuilds columns whose type or default has
//! drifted. Columns are never dropped. Running it again on an unchanged
//! definition issues no DDL.
//!
//! # Example
//!
//! ```
//! use acf_tables_core::{Field, FieldGroup, FieldKind};
//! use acf_tables_sqlite::{CodecRegistry, SqliteGateway, Synchronizer};
//! use rusqlite::Connection;
//!
//! let conn = Connection::open_in_memory().unwrap();
//! let gateway = SqliteGateway::new(&conn, "wp_").unwrap();
//! let codecs = CodecRegistry::builtin();
//! let sync = Synchronizer::new(&gateway, &codecs);
//!
//! let group = FieldGroup::new("group_faq", "FAQ")
//!     .with_table("faq")
//!     .with_field(Field::new("field_title", "title", FieldKind::Text));
//!
//! let first = sync.synchronize(&group).unwrap();
//! assert_eq!((first.tables_created, first.columns_added), (1, 1));
//!
//! let second = sync.synchronize(&group).unwrap();
//! assert_eq!(second.ddl_statements(), 0);
//! ```

use std::collections::{HashMap, HashSet};

use acf_tables_core::{
    ColumnSpec, Field, FieldGroup, FieldKind, TypeConstraints, encode_default, join_column,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::codec::CodecRegistry;
use crate::error::Result;
use crate::gateway::Gateway;

/// Outcome of synchronizing one field group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Logical table the group maps to.
    pub table: String,
    /// Number of tables created (0 or 1).
    pub tables_created: usize,
    /// Number of columns added.
    pub columns_added: usize,
    /// Number of columns whose type or default was corrected.
    pub columns_altered: usize,
    /// Number of columns already matching.
    pub columns_unchanged: usize,
}

impl SyncReport {
    /// Number of DDL statements the run issued.
    pub fn ddl_statements(&self) -> usize {
        self.tables_created + self.columns_added + self.columns_altered
    }
}

/// Derives the desired columns of a group and reconciles the store.
pub struct Synchronizer<'a> {
    gateway: &'a dyn Gateway,
    codecs: &'a CodecRegistry,
}

impl<'a> Synchronizer<'a> {
    pub fn new(gateway: &'a dyn Gateway, codecs: &'a CodecRegistry) -> Self {
        Self { gateway, codecs }
    }

    /// Derives one column per field, depth-first in declaration order.
    ///
    /// Direct children of a repeater take the repeater's column type, since
    /// they hold JSON arrays; their own descendants get no columns.
    pub fn derive_columns(&self, group: &FieldGroup) -> Vec<ColumnSpec> {
        let mut columns = Vec::new();
        let mut prefix = Vec::new();
        self.derive(&group.fields, None, &mut prefix, &mut columns);
        columns
    }

    fn derive(
        &self,
        fields: &[Field],
        parent: Option<&Field>,
        prefix: &mut Vec<String>,
        out: &mut Vec<ColumnSpec>,
    ) {
        for field in fields {
            let repeater = parent.filter(|p| p.kind == FieldKind::Repeater);
            let kind = repeater.map_or(&field.kind, |p| &p.kind);
            let sql_type = self.codecs.sql_type(kind, &TypeConstraints::from(field));
            let default = encode_default(field.default_value.as_ref(), sql_type);
            out.push(ColumnSpec::new(
                join_column(prefix, &field.name),
                sql_type,
                default,
            ));

            if repeater.is_some() {
                continue;
            }
            prefix.push(field.name.clone());
            self.derive(&field.sub_fields, Some(field), prefix, out);
            prefix.pop();
        }
    }

    /// Brings the group's table in line with its definition.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidIdentifier`](crate::SqliteError::InvalidIdentifier)
    /// if a table or column name is outside the allow-list, or
    /// [`SqliteError::DatabaseError`](crate::SqliteError::DatabaseError) on
    /// store failure. Steps already applied are kept; re-running converges.
    pub fn synchronize(&self, group: &FieldGroup) -> Result<SyncReport> {
        let table = group.table_name();
        let mut report = SyncReport {
            table: table.to_string(),
            ..SyncReport::default()
        };

        if !self.gateway.table_exists(table)? {
            self.gateway.create_table(table)?;
            report.tables_created += 1;
        }

        let existing: HashMap<String, _> = self
            .gateway
            .list_columns(table, None)?
            .into_iter()
            .map(|column| (column.name.clone(), column))
            .collect();

        let mut seen = HashSet::new();
        for spec in self.derive_columns(group) {
            if !seen.insert(spec.name.clone()) {
                warn!(table, column = %spec.name, "two fields map to the same column; keeping the first");
                continue;
            }
            match existing.get(&spec.name) {
                None => {
                    self.gateway.add_column(table, &spec)?;
                    report.columns_added += 1;
                }
                Some(current) if current.primary_key => {
                    warn!(table, column = %spec.name, "field collides with the key column; skipped");
                }
                Some(current) if current.matches(&spec) => {
                    report.columns_unchanged += 1;
                }
                Some(current) => {
                    info!(
                        table,
                        column = %spec.name,
                        from = %current.declared_type,
                        to = %spec.sql_type,
                        "correcting column drift"
                    );
                    self.gateway.alter_column(table, &spec)?;
                    report.columns_altered += 1;
                }
            }
        }

        info!(
            table,
            created = report.tables_created,
            added = report.columns_added,
            altered = report.columns_altered,
            "synchronized field group"
        );
        Ok(report)
    }
}
