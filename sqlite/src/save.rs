//! Save pipeline: routes submitted field values to table rows.
//!
//! The host submits a tree keyed by field keys. Each key is resolved to its
//! field, table and hierarchical column; the field's codec encodes the
//! value, and every destination table receives a single upsert holding all
//! of its columns.

use std::collections::BTreeMap;

use acf_tables_core::SqlValue;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::codec::{CodecContext, Saved};
use crate::error::Result;

/// Column values accumulated per destination table.
pub type TableRows = BTreeMap<String, BTreeMap<String, SqlValue>>;

/// A host "content saved" event carrying the submitted field tree.
///
/// Consuming the event takes the tree out, so the host sees nothing left
/// to persist into its own metadata store.
///
/// # Examples
///
/// ```
/// use acf_tables_sqlite::SaveEvent;
/// use serde_json::json;
///
/// let mut event = SaveEvent::new(42, json!({"field_title": "Hello"}).as_object().unwrap().clone());
/// assert!(!event.is_consumed());
///
/// let values = event.consume().unwrap();
/// assert_eq!(values["field_title"], "Hello");
/// assert!(event.is_consumed());
/// assert!(event.consume().is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SaveEvent {
    pub content_id: i64,
    submitted: Option<Map<String, Value>>,
}

impl SaveEvent {
    pub fn new(content_id: i64, submitted: Map<String, Value>) -> Self {
        Self {
            content_id,
            submitted: Some(submitted),
        }
    }

    /// The submitted tree, unless already consumed.
    pub fn values(&self) -> Option<&Map<String, Value>> {
        self.submitted.as_ref()
    }

    /// Takes the submitted tree, marking the event consumed.
    pub fn consume(&mut self) -> Option<Map<String, Value>> {
        self.submitted.take()
    }

    pub fn is_consumed(&self) -> bool {
        self.submitted.is_none()
    }
}

/// Outcome of one save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Number of tables upserted.
    pub tables_written: usize,
    /// Number of columns written across all tables.
    pub columns_written: usize,
    /// Submitted keys that resolved to no field or group.
    pub skipped_keys: Vec<String>,
}

/// Flattens a submitted tree into per-table column values.
///
/// Unresolvable keys are skipped and returned in the second element.
pub fn collect_rows(ctx: &CodecContext<'_>, submitted: &Map<String, Value>) -> Result<(TableRows, Vec<String>)> {
    let mut rows = TableRows::new();
    let mut skipped = Vec::new();
    collect(ctx, submitted, &mut rows, &mut skipped)?;
    Ok((rows, skipped))
}

fn collect(
    ctx: &CodecContext<'_>,
    values: &Map<String, Value>,
    rows: &mut TableRows,
    skipped: &mut Vec<String>,
) -> Result<()> {
    for (key, value) in values {
        let Some(field) = ctx.provider.field(key) else {
            debug!(key = %key, "skipping unknown field");
            skipped.push(key.clone());
            continue;
        };
        let Some(table) = ctx.provider.table_for(field) else {
            debug!(key = %key, group = %field.group, "skipping field without a known group");
            skipped.push(key.clone());
            continue;
        };
        let column = ctx.provider.column_name(field);

        let saved = match ctx.codecs.get(&field.kind) {
            Some(codec) => codec.format_for_save(field, &column, value, ctx)?,
            None => match value {
                Value::Object(children) => {
                    collect(ctx, children, rows, skipped)?;
                    continue;
                }
                _ => ctx
                    .codecs
                    .resolve(&field.kind)
                    .format_for_save(field, &column, value, ctx)?,
            },
        };

        let row = rows.entry(table.to_string()).or_default();
        match saved {
            Saved::Scalar(cell) => {
                row.insert(column, cell);
            }
            Saved::Columns(cells) => row.extend(cells),
        }
    }
    Ok(())
}

/// Saves a submitted tree for one content item: one upsert per table.
///
/// Columns not present in `submitted` keep their stored values.
pub fn save_content_values(
    ctx: &CodecContext<'_>,
    content_id: i64,
    submitted: &Map<String, Value>,
) -> Result<SaveReport> {
    let (rows, skipped_keys) = collect_rows(ctx, submitted)?;
    let mut report = SaveReport {
        skipped_keys,
        ..SaveReport::default()
    };

    for (table, columns) in rows {
        let values: Vec<(String, SqlValue)> = columns.into_iter().collect();
        ctx.gateway.upsert_row(&table, content_id, &values)?;
        report.tables_written += 1;
        report.columns_written += values.len();
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecRegistry;
    use crate::gateway::SqliteGateway;
    use acf_tables_core::{Field, FieldCatalog, FieldGroup, FieldKind};
    use rusqlite::Connection;
    use serde_json::json;

    fn catalog() -> FieldCatalog {
        FieldCatalog::from_groups([
            FieldGroup::new("group_page", "Page")
                .with_table("page")
                .with_field(Field::new("field_title", "title", FieldKind::Text))
                .with_field(
                    Field::new("field_hero", "hero", FieldKind::Group).with_sub_field(
                        Field::new("field_cta", "cta", FieldKind::Group).with_sub_field(
                            Field::new("field_label", "label", FieldKind::Text),
                        ),
                    ),
                )
                .with_field(Field::new("field_tags", "tags", FieldKind::Text)),
            FieldGroup::new("group_seo", "SEO")
                .with_table("seo")
                .with_field(Field::new("field_desc", "description", FieldKind::Textarea)),
        ])
    }

    fn submitted(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_collect_rows_routes_by_group_and_depth() {
        let conn = Connection::open_in_memory().unwrap();
        let gateway = SqliteGateway::new(&conn, "wp_").unwrap();
        let catalog = catalog();
        let codecs = CodecRegistry::builtin();
        let ctx = CodecContext {
            gateway: &gateway,
            provider: &catalog,
            codecs: &codecs,
        };

        let (rows, skipped) = collect_rows(
            &ctx,
            &submitted(json!({
                "field_title": "Home",
                "field_hero": {"field_cta": {"field_label": "Go"}},
                "field_tags": ["a", "b"],
                "field_desc": "About us",
                "field_gone": "x"
            })),
        )
        .unwrap();

        assert_eq!(skipped, vec!["field_gone".to_string()]);
        assert_eq!(rows.len(), 2);
        let page = &rows["page"];
        assert_eq!(page["title"], SqlValue::from("Home"));
        assert_eq!(page["hero_cta_label"], SqlValue::from("Go"));
        assert_eq!(page["tags"], SqlValue::from(r#"["a","b"]"#));
        assert!(!page.contains_key("hero"));
        assert_eq!(rows["seo"]["description"], SqlValue::from("About us"));
    }

    #[test]
    fn test_empty_submission_writes_nothing() {
        let conn = Connection::open_in_memory().unwrap();
        let gateway = SqliteGateway::new(&conn, "wp_").unwrap();
        let catalog = catalog();
        let codecs = CodecRegistry::builtin();
        let ctx = CodecContext {
            gateway: &gateway,
            provider: &catalog,
            codecs: &codecs,
        };

        let report = save_content_values(&ctx, 1, &Map::new()).unwrap();
        assert_eq!(report, SaveReport::default());
    }
}
