//! Value codecs: per-kind conversion between host values and stored cells.
//!
//! A [`FieldCodec`] decides how one field kind is written
//! ([`format_for_save`](FieldCodec::format_for_save)) and read back
//! ([`format_for_load`](FieldCodec::format_for_load)), and may override the
//! column type chosen by [`map_type`]. Kinds with no registered codec use
//! [`DefaultCodec`], which stores raw scalars and JSON-encoded arrays.
//!
//! [`CodecRegistry::builtin`] registers, in order:
//!
//! - `repeater` → [`RepeaterCodec`] (special: one JSON column per sub-field)
//! - `wysiwyg` → [`RichTextCodec`]
//! - `gallery`, `flexible_content` → [`JsonCodec`]
//! - `post_object`, `relationship`, `page_link`, `taxonomy`, `user`,
//!   `checkbox`, `select`, `link` → [`JsonOrScalarCodec`]
//! - `number`, `range` → [`NumberCodec`]

use std::collections::{BTreeMap, HashMap};

use acf_tables_core::{
    Field, FieldKind, FieldProvider, SEPARATOR, SqlType, SqlValue, TypeConstraints, map_type,
    parse_row_id, row_id, split_repeater_item,
};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::error::Result;
use crate::gateway::Gateway;

/// Row key ACF submits for the hidden template row of a repeater.
pub const CLONE_INDEX: &str = "acfcloneindex";

/// Result of encoding one field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Saved {
    /// One cell, stored under the field's own column.
    Scalar(SqlValue),
    /// Several cells under explicit column names.
    Columns(Vec<(String, SqlValue)>),
}

/// Collaborators available to codecs.
pub struct CodecContext<'a> {
    pub gateway: &'a dyn Gateway,
    pub provider: &'a dyn FieldProvider,
    pub codecs: &'a CodecRegistry,
}

/// The special parent of a field being loaded, with its column.
#[derive(Debug, Clone)]
pub struct ParentColumn<'a> {
    pub field: &'a Field,
    pub column: String,
}

/// Everything a codec needs to load one field's value.
#[derive(Debug, Clone)]
pub struct LoadRequest<'a> {
    pub field: &'a Field,
    /// Logical table of the owning group.
    pub table: &'a str,
    /// Resolved column, or the runtime name for a repeater item.
    pub column: String,
    pub content_id: i64,
    /// Set when the field is an item of a special parent.
    pub parent: Option<ParentColumn<'a>>,
}

impl LoadRequest<'_> {
    /// Reads this request's own cell.
    pub fn read(&self, ctx: &CodecContext<'_>) -> Result<Option<SqlValue>> {
        ctx.gateway
            .read_cell(self.table, &self.column, self.content_id)
    }
}

/// Per-kind save/load behavior.
pub trait FieldCodec: Send + Sync {
    /// Overrides the column type for this kind. `None` defers to
    /// [`map_type`].
    fn sql_type(&self, _constraints: &TypeConstraints) -> Option<SqlType> {
        None
    }

    /// Encodes a submitted value for `column`.
    fn format_for_save(
        &self,
        field: &Field,
        column: &str,
        value: &Value,
        ctx: &CodecContext<'_>,
    ) -> Result<Saved>;

    /// Decodes the stored value described by `request`.
    fn format_for_load(&self, request: &LoadRequest<'_>, ctx: &CodecContext<'_>) -> Result<Value>;

    /// Special codecs own their children: the load pipeline hands them
    /// whole subtrees and their items.
    fn is_special(&self) -> bool {
        false
    }
}

/// Codecs keyed by field kind, with [`DefaultCodec`] as fallback.
///
/// Built once and read-only afterwards.
///
/// # Examples
///
/// ```
/// use acf_tables_core::{FieldKind, SqlType, TypeConstraints};
/// use acf_tables_sqlite::CodecRegistry;
///
/// let codecs = CodecRegistry::builtin();
/// assert!(codecs.is_special(&FieldKind::Repeater));
/// assert!(!codecs.is_special(&FieldKind::Text));
/// assert_eq!(
///     codecs.sql_type(&FieldKind::Gallery, &TypeConstraints::default()),
///     SqlType::Text
/// );
/// ```
#[derive(Default)]
pub struct CodecRegistry {
    codecs: HashMap<FieldKind, Box<dyn FieldCodec>>,
    fallback: DefaultCodec,
}

impl CodecRegistry {
    /// Creates a registry with no codecs; every kind uses the default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in codecs.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(FieldKind::Repeater, Box::new(RepeaterCodec));
        registry.register(FieldKind::Wysiwyg, Box::new(RichTextCodec));
        registry.register(FieldKind::Gallery, Box::new(JsonCodec));
        registry.register(FieldKind::FlexibleContent, Box::new(JsonCodec));
        for kind in [
            FieldKind::PostObject,
            FieldKind::Relationship,
            FieldKind::PageLink,
            FieldKind::Taxonomy,
            FieldKind::User,
            FieldKind::Checkbox,
            FieldKind::Select,
            FieldKind::Link,
        ] {
            registry.register(kind, Box::new(JsonOrScalarCodec));
        }
        for kind in [FieldKind::Number, FieldKind::Range] {
            registry.register(kind, Box::new(NumberCodec));
        }
        registry
    }

    /// Registers `codec` for `kind`, returning the codec it replaces.
    pub fn register(
        &mut self,
        kind: FieldKind,
        codec: Box<dyn FieldCodec>,
    ) -> Option<Box<dyn FieldCodec>> {
        self.codecs.insert(kind, codec)
    }

    /// Returns the codec registered for `kind`.
    pub fn get(&self, kind: &FieldKind) -> Option<&dyn FieldCodec> {
        self.codecs.get(kind).map(|codec| codec.as_ref())
    }

    /// Returns the codec for `kind`, or the default codec.
    pub fn resolve(&self, kind: &FieldKind) -> &dyn FieldCodec {
        self.get(kind).unwrap_or(&self.fallback)
    }

    /// Whether `kind` has a special codec.
    pub fn is_special(&self, kind: &FieldKind) -> bool {
        self.get(kind).is_some_and(|codec| codec.is_special())
    }

    /// Column type for `kind`: the codec's override, else [`map_type`].
    pub fn sql_type(&self, kind: &FieldKind, constraints: &TypeConstraints) -> SqlType {
        self.get(kind)
            .and_then(|codec| codec.sql_type(constraints))
            .unwrap_or_else(|| map_type(kind, constraints))
    }

    /// Returns the number of registered codecs.
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Returns `true` if no codec is registered.
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

fn load_scalar(request: &LoadRequest<'_>, ctx: &CodecContext<'_>) -> Result<Value> {
    Ok(request
        .read(ctx)?
        .map(|cell| cell.to_json())
        .unwrap_or(Value::Null))
}

/// Fallback codec: scalars pass through, arrays are stored as JSON text.
///
/// On load, text holding a JSON array is decoded; any other cell is
/// returned as stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodec;

impl FieldCodec for DefaultCodec {
    fn format_for_save(
        &self,
        _field: &Field,
        _column: &str,
        value: &Value,
        _ctx: &CodecContext<'_>,
    ) -> Result<Saved> {
        Ok(Saved::Scalar(match value {
            Value::Array(_) => SqlValue::Text(value.to_string()),
            other => SqlValue::from_json(other),
        }))
    }

    fn format_for_load(&self, request: &LoadRequest<'_>, ctx: &CodecContext<'_>) -> Result<Value> {
        Ok(match request.read(ctx)? {
            Some(SqlValue::Text(text)) if text.trim_start().starts_with('[') => {
                match serde_json::from_str::<Vec<Value>>(&text) {
                    Ok(items) => Value::Array(items),
                    Err(_) => Value::String(text),
                }
            }
            Some(cell) => cell.to_json(),
            None => Value::Null,
        })
    }
}

/// Removes one level of backslash escaping, as added to submitted form
/// data by the host.
///
/// # Examples
///
/// ```
/// use acf_tables_sqlite::strip_slashes;
///
/// assert_eq!(strip_slashes(r#"<a href=\"/x\">it\'s</a>"#), r#"<a href="/x">it's</a>"#);
/// assert_eq!(strip_slashes(r"C:\\temp"), r"C:\temp");
/// ```
pub fn strip_slashes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Rich text: strips submission escaping before storing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RichTextCodec;

impl FieldCodec for RichTextCodec {
    fn format_for_save(
        &self,
        _field: &Field,
        _column: &str,
        value: &Value,
        _ctx: &CodecContext<'_>,
    ) -> Result<Saved> {
        Ok(Saved::Scalar(match value {
            Value::String(html) => SqlValue::Text(strip_slashes(html)),
            other => SqlValue::from_json(other),
        }))
    }

    fn format_for_load(&self, request: &LoadRequest<'_>, ctx: &CodecContext<'_>) -> Result<Value> {
        load_scalar(request, ctx)
    }
}

/// Always stores JSON text and always decodes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl FieldCodec for JsonCodec {
    fn format_for_save(
        &self,
        _field: &Field,
        _column: &str,
        value: &Value,
        _ctx: &CodecContext<'_>,
    ) -> Result<Saved> {
        Ok(Saved::Scalar(match value {
            Value::Null => SqlValue::Null,
            Value::String(s) if s.is_empty() => SqlValue::Null,
            other => SqlValue::Text(other.to_string()),
        }))
    }

    fn format_for_load(&self, request: &LoadRequest<'_>, ctx: &CodecContext<'_>) -> Result<Value> {
        Ok(match request.read(ctx)? {
            Some(SqlValue::Text(text)) if !text.is_empty() => {
                match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(e) => {
                        debug!(table = request.table, column = %request.column, error = %e, "malformed JSON cell");
                        Value::Null
                    }
                }
            }
            Some(SqlValue::Text(_)) | None => Value::Null,
            Some(other) => other.to_json(),
        })
    }
}

/// Lists become JSON text; single values stay raw.
///
/// On load, text that looks like a JSON array or object is decoded and
/// anything else is returned as stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonOrScalarCodec;

impl FieldCodec for JsonOrScalarCodec {
    fn format_for_save(
        &self,
        _field: &Field,
        _column: &str,
        value: &Value,
        _ctx: &CodecContext<'_>,
    ) -> Result<Saved> {
        Ok(Saved::Scalar(match value {
            Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
            other => SqlValue::from_json(other),
        }))
    }

    fn format_for_load(&self, request: &LoadRequest<'_>, ctx: &CodecContext<'_>) -> Result<Value> {
        Ok(match request.read(ctx)? {
            Some(SqlValue::Text(text)) => {
                let trimmed = text.trim_start();
                if trimmed.starts_with('[') || trimmed.starts_with('{') {
                    serde_json::from_str(&text).unwrap_or(Value::String(text))
                } else {
                    Value::String(text)
                }
            }
            Some(other) => other.to_json(),
            None => Value::Null,
        })
    }
}

/// Numbers: empty input is `NULL`, numeric strings become numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberCodec;

impl FieldCodec for NumberCodec {
    fn format_for_save(
        &self,
        field: &Field,
        _column: &str,
        value: &Value,
        _ctx: &CodecContext<'_>,
    ) -> Result<Saved> {
        let Value::String(raw) = value else {
            return Ok(Saved::Scalar(SqlValue::from_json(value)));
        };
        let raw = raw.trim();
        let cell = if raw.is_empty() {
            SqlValue::Null
        } else if let Ok(i) = raw.parse::<i64>() {
            SqlValue::Integer(i)
        } else if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
            SqlValue::Real(f)
        } else {
            debug!(field = %field.key, value = raw, "non-numeric value for number field");
            SqlValue::Text(raw.to_string())
        };
        Ok(Saved::Scalar(cell))
    }

    fn format_for_load(&self, request: &LoadRequest<'_>, ctx: &CodecContext<'_>) -> Result<Value> {
        load_scalar(request, ctx)
    }
}

/// Repeater: one JSON array column per direct sub-field.
///
/// A repeater `faq` with sub-fields `question` and `answer` stores its rows
/// in `faq_question` and `faq_answer`, each an array of
/// `{"id": "row-<n>", "key", "name", "value"}` entries. Sub-fields of a
/// row's sub-fields travel inside `value`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepeaterCodec;

impl RepeaterCodec {
    fn load_rows(&self, request: &LoadRequest<'_>, ctx: &CodecContext<'_>) -> Result<Value> {
        let mut rows: BTreeMap<usize, Map<String, Value>> = BTreeMap::new();
        for sub in &request.field.sub_fields {
            let column = format!("{}{SEPARATOR}{}", request.column, sub.name);
            let entries = read_entries(ctx, request.table, &column, request.content_id)?;
            for (position, entry) in entries.into_iter().enumerate() {
                let index = entry_index(&entry).unwrap_or(position);
                let value = entry.get("value").cloned().unwrap_or(Value::Null);
                rows.entry(index).or_default().insert(sub.key.clone(), value);
            }
        }
        Ok(Value::Array(rows.into_values().map(Value::Object).collect()))
    }

    fn load_item(
        &self,
        request: &LoadRequest<'_>,
        parent: &ParentColumn<'_>,
        ctx: &CodecContext<'_>,
    ) -> Result<Value> {
        let Some((iteration, item)) = split_repeater_item(&request.column, &parent.column) else {
            debug!(column = %request.column, repeater = %parent.column, "not a repeater item name");
            return Ok(Value::Null);
        };

        let column = format!("{}{SEPARATOR}{item}", parent.column);
        let entries = read_entries(ctx, request.table, &column, request.content_id)?;
        let entry = entries
            .iter()
            .find(|entry| entry_index(entry) == Some(iteration))
            .or_else(|| {
                entries
                    .get(iteration)
                    .filter(|entry| entry_index(entry).is_none())
            });

        Ok(entry
            .and_then(|entry| entry.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }
}

impl FieldCodec for RepeaterCodec {
    fn format_for_save(
        &self,
        field: &Field,
        column: &str,
        value: &Value,
        ctx: &CodecContext<'_>,
    ) -> Result<Saved> {
        let rows: Vec<&Map<String, Value>> = match value {
            Value::Array(rows) => rows.iter().filter_map(Value::as_object).collect(),
            Value::Object(rows) => rows
                .iter()
                .filter(|(id, _)| id.as_str() != CLONE_INDEX)
                .filter_map(|(_, row)| row.as_object())
                .collect(),
            _ => Vec::new(),
        };

        let mut entries: Vec<Vec<Value>> = vec![Vec::new(); field.sub_fields.len()];
        for (index, row) in rows.iter().enumerate() {
            for (key, item) in row.iter() {
                let position = field
                    .sub_fields
                    .iter()
                    .position(|sub| sub.key == *key)
                    .or_else(|| {
                        // Item submitted under a key the repeater copy lacks.
                        let known = ctx.provider.field(key)?;
                        field.sub_fields.iter().position(|sub| sub.name == known.name)
                    });
                let Some(position) = position else {
                    debug!(repeater = %field.key, key = %key, "skipping unknown repeater item");
                    continue;
                };
                let sub = &field.sub_fields[position];
                entries[position].push(json!({
                    "id": row_id(index),
                    "key": sub.key,
                    "name": sub.name,
                    "value": item,
                }));
            }
        }

        Ok(Saved::Columns(
            field
                .sub_fields
                .iter()
                .zip(entries)
                .map(|(sub, items)| {
                    (
                        format!("{column}{SEPARATOR}{}", sub.name),
                        SqlValue::Text(Value::Array(items).to_string()),
                    )
                })
                .collect(),
        ))
    }

    fn format_for_load(&self, request: &LoadRequest<'_>, ctx: &CodecContext<'_>) -> Result<Value> {
        match &request.parent {
            Some(parent) => self.load_item(request, parent, ctx),
            None => self.load_rows(request, ctx),
        }
    }

    fn is_special(&self) -> bool {
        true
    }
}

fn entry_index(entry: &Map<String, Value>) -> Option<usize> {
    entry.get("id").and_then(Value::as_str).and_then(parse_row_id)
}

/// Reads a repeater column; missing or malformed JSON reads as no entries.
fn read_entries(
    ctx: &CodecContext<'_>,
    table: &str,
    column: &str,
    content_id: i64,
) -> Result<Vec<Map<String, Value>>> {
    let Some(SqlValue::Text(text)) = ctx.gateway.read_cell(table, column, content_id)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Vec<Value>>(&text) {
        Ok(entries) => Ok(entries
            .into_iter()
            .filter_map(|entry| match entry {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect()),
        Err(e) => {
            debug!(table, column, error = %e, "malformed repeater column");
            Ok(Vec::new())
        }
    }
}
