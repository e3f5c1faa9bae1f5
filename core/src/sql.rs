//! Physical column types, cell values and the field type mapper.
//!
//! [`map_type`] is the single source of truth for which SQL type a field
//! kind is stored as. It is consulted both when a column is created and
//! when an existing column is reconciled, so the rendered form produced by
//! [`SqlType::to_sql`] and the parsed form accepted by [`SqlType::parse`]
//! must agree.

use serde_json::Value;

use crate::FieldKind;

/// Upper bound applied to every `VARCHAR` length.
pub const VARCHAR_CEILING: u32 = 255;

/// A physical column type.
///
/// # Examples
///
/// ```
/// use acf_tables_core::SqlType;
///
/// assert_eq!(SqlType::Varchar(120).to_sql(), "VARCHAR(120)");
/// assert_eq!(SqlType::parse("varchar( 120 )"), Some(SqlType::Varchar(120)));
/// assert_eq!(SqlType::parse("longtext"), Some(SqlType::LongText));
/// assert_eq!(SqlType::parse("BLOB"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Int,
    Text,
    LongText,
    Varchar(u32),
}

impl SqlType {
    /// Renders the type as it appears in DDL.
    pub fn to_sql(&self) -> String {
        match self {
            SqlType::Int => "INT".to_string(),
            SqlType::Text => "TEXT".to_string(),
            SqlType::LongText => "LONGTEXT".to_string(),
            SqlType::Varchar(len) => format!("VARCHAR({len})"),
        }
    }

    /// Parses a type as reported by the store. Case and whitespace are
    /// ignored; unknown spellings yield `None` and are treated as drift.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "INT" | "INTEGER" => Some(SqlType::Int),
            "TEXT" => Some(SqlType::Text),
            "LONGTEXT" => Some(SqlType::LongText),
            other => other
                .strip_prefix("VARCHAR(")
                .and_then(|rest| rest.strip_suffix(')'))
                .and_then(|len| len.parse().ok())
                .map(SqlType::Varchar),
        }
    }

    /// Whether a column of this type may carry a `DEFAULT` clause.
    pub fn accepts_default(&self) -> bool {
        matches!(self, SqlType::Int | SqlType::Varchar(_))
    }
}

impl std::fmt::Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// Declared constraints that influence the physical type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeConstraints {
    /// Requested maximum length for bounded string kinds.
    pub max_length: Option<u32>,
}

impl From<&crate::Field> for TypeConstraints {
    fn from(field: &crate::Field) -> Self {
        Self {
            max_length: field.max_length,
        }
    }
}

/// Maps a field kind and its constraints to a physical column type.
///
/// Total: unknown kinds map to `VARCHAR(255)`.
///
/// # Examples
///
/// ```
/// use acf_tables_core::{FieldKind, SqlType, TypeConstraints, map_type};
///
/// let none = TypeConstraints::default();
/// assert_eq!(map_type(&FieldKind::Number, &none), SqlType::Int);
/// assert_eq!(map_type(&FieldKind::Repeater, &none), SqlType::LongText);
/// assert_eq!(map_type(&FieldKind::Text, &none), SqlType::Varchar(255));
///
/// let long = TypeConstraints { max_length: Some(500) };
/// assert_eq!(map_type(&FieldKind::Text, &long), SqlType::Varchar(255));
/// ```
pub fn map_type(kind: &FieldKind, constraints: &TypeConstraints) -> SqlType {
    match kind {
        FieldKind::Number | FieldKind::Range => SqlType::Int,
        FieldKind::Textarea | FieldKind::Wysiwyg | FieldKind::Oembed => SqlType::Text,
        FieldKind::Repeater | FieldKind::FlexibleContent => SqlType::LongText,
        kind if kind.is_multi_valued() => SqlType::Text,
        _ => SqlType::Varchar(varchar_length(constraints.max_length)),
    }
}

/// Clamps a requested length to [`VARCHAR_CEILING`]; zero or absent means
/// the ceiling itself.
pub fn varchar_length(requested: Option<u32>) -> u32 {
    match requested {
        Some(len) if len > 0 => len.min(VARCHAR_CEILING),
        _ => VARCHAR_CEILING,
    }
}

/// Encodes a field's default value as a SQL literal for `sql_type`.
///
/// Returns `None` when the column should carry no default: empty or
/// structured defaults, non-numeric defaults on integer columns, and
/// text/long-text columns.
///
/// # Examples
///
/// ```
/// use acf_tables_core::{SqlType, encode_default};
/// use serde_json::json;
///
/// assert_eq!(encode_default(Some(&json!("it's")), SqlType::Varchar(255)), Some("'it''s'".into()));
/// assert_eq!(encode_default(Some(&json!("42")), SqlType::Int), Some("42".into()));
/// assert_eq!(encode_default(Some(&json!("abc")), SqlType::Int), None);
/// assert_eq!(encode_default(Some(&json!("x")), SqlType::LongText), None);
/// ```
pub fn encode_default(value: Option<&Value>, sql_type: SqlType) -> Option<String> {
    if !sql_type.accepts_default() {
        return None;
    }
    let text = match value? {
        Value::String(s) if s.is_empty() => return None,
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    match sql_type {
        SqlType::Int => text.trim().parse::<i64>().ok().map(|n| n.to_string()),
        _ => Some(quote_literal(&text)),
    }
}

/// Quotes a string as a SQL literal, doubling embedded single quotes.
pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Desired definition of one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
    /// Default as a SQL literal, already encoded.
    pub default: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: SqlType, default: Option<String>) -> Self {
        Self {
            name: name.into(),
            sql_type,
            default,
        }
    }
}

/// Metadata of an existing column as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type, verbatim.
    pub declared_type: String,
    /// Default literal, verbatim.
    pub default: Option<String>,
    pub primary_key: bool,
}

impl ColumnInfo {
    /// Returns `true` if this column already matches `spec`.
    pub fn matches(&self, spec: &ColumnSpec) -> bool {
        SqlType::parse(&self.declared_type) == Some(spec.sql_type) && self.default == spec.default
    }
}

/// A store-neutral cell value.
///
/// # Examples
///
/// ```
/// use acf_tables_core::SqlValue;
/// use serde_json::json;
///
/// assert_eq!(SqlValue::from_json(&json!("hi")), SqlValue::Text("hi".into()));
/// assert_eq!(SqlValue::from_json(&json!(7)), SqlValue::Integer(7));
/// assert_eq!(SqlValue::from_json(&json!([1, 2])), SqlValue::Text("[1,2]".into()));
/// assert_eq!(SqlValue::Integer(7).to_json(), json!(7));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Converts a host value into a cell value. Structured values are
    /// stored as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => SqlValue::Integer(i),
                None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
            },
            Value::String(s) => SqlValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
        }
    }

    /// Converts a stored cell back into a host value.
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Integer(i) => Value::from(*i),
            SqlValue::Real(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SqlValue::Text(s) => Value::String(s.clone()),
        }
    }

    /// Returns the text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<i64> for SqlValue {
    fn from(i: i64) -> Self {
        SqlValue::Integer(i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_varchar_clamp() {
        assert_eq!(varchar_length(Some(500)), 255);
        assert_eq!(varchar_length(None), 255);
        assert_eq!(varchar_length(Some(0)), 255);
        assert_eq!(varchar_length(Some(80)), 80);
    }

    #[test]
    fn test_map_type_unknown_kind_defaults_to_varchar() {
        let kind = FieldKind::Other("acf_icon_picker".to_string());
        assert_eq!(
            map_type(&kind, &TypeConstraints::default()),
            SqlType::Varchar(255)
        );
    }

    #[test]
    fn test_map_type_multi_valued_kinds_use_text() {
        for kind in [FieldKind::Gallery, FieldKind::Relationship, FieldKind::Checkbox] {
            assert_eq!(map_type(&kind, &TypeConstraints::default()), SqlType::Text);
        }
    }

    #[test]
    fn test_render_and_parse_agree() {
        for ty in [
            SqlType::Int,
            SqlType::Text,
            SqlType::LongText,
            SqlType::Varchar(1),
            SqlType::Varchar(255),
        ] {
            assert_eq!(SqlType::parse(&ty.to_sql()), Some(ty));
            assert_eq!(SqlType::parse(&ty.to_sql().to_lowercase()), Some(ty));
        }
    }

    #[test]
    fn test_column_info_matches_spec() {
        let info = ColumnInfo {
            name: "title".to_string(),
            declared_type: "varchar(255)".to_string(),
            default: Some("'x'".to_string()),
            primary_key: false,
        };
        let same = ColumnSpec::new("title", SqlType::Varchar(255), Some("'x'".to_string()));
        let other_default = ColumnSpec::new("title", SqlType::Varchar(255), None);
        let other_type = ColumnSpec::new("title", SqlType::Text, Some("'x'".to_string()));
        assert!(info.matches(&same));
        assert!(!info.matches(&other_default));
        assert!(!info.matches(&other_type));
    }

    #[test]
    fn test_encode_default_bool_and_structured() {
        assert_eq!(
            encode_default(Some(&json!(true)), SqlType::Int),
            Some("1".to_string())
        );
        assert_eq!(encode_default(Some(&json!(["a"])), SqlType::Varchar(10)), None);
        assert_eq!(encode_default(None, SqlType::Varchar(10)), None);
    }

    #[test]
    fn test_real_nan_maps_to_null() {
        assert_eq!(SqlValue::Real(f64::NAN).to_json(), Value::Null);
        assert_eq!(SqlValue::Real(1.5).to_json(), json!(1.5));
    }
}
