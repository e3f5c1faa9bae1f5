//! Field-group type definitions.
//!
//! This module defines the data model authored through ACF's field-group
//! UI: a [`FieldGroup`] owns an ordered forest of [`Field`] nodes, each with
//! a [`FieldKind`]. The types deserialize directly from ACF's local JSON
//! export format (`type`, `sub_fields`, `custom_table_name`, `maxlength`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// The kind of an ACF field.
///
/// Known kinds are enumerated; anything else is carried verbatim in
/// [`FieldKind::Other`] so that third-party field types still synchronize
/// (they fall back to the default column type and pass-through codec).
///
/// # Examples
///
/// ```
/// use acf_tables_core::FieldKind;
///
/// assert_eq!(FieldKind::from("repeater"), FieldKind::Repeater);
/// assert_eq!(FieldKind::Wysiwyg.as_str(), "wysiwyg");
/// assert_eq!(FieldKind::from("star_rating"), FieldKind::Other("star_rating".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Text,
    Textarea,
    Number,
    Range,
    Email,
    Url,
    Password,
    Wysiwyg,
    Oembed,
    Image,
    File,
    Gallery,
    Select,
    Checkbox,
    Radio,
    ButtonGroup,
    TrueFalse,
    Link,
    PostObject,
    PageLink,
    Relationship,
    Taxonomy,
    User,
    DatePicker,
    DateTimePicker,
    TimePicker,
    ColorPicker,
    Group,
    Repeater,
    FlexibleContent,
    /// A kind this crate has no built-in knowledge of.
    Other(String),
}

impl FieldKind {
    /// Returns ACF's lower-case identifier for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Textarea => "textarea",
            FieldKind::Number => "number",
            FieldKind::Range => "range",
            FieldKind::Email => "email",
            FieldKind::Url => "url",
            FieldKind::Password => "password",
            FieldKind::Wysiwyg => "wysiwyg",
            FieldKind::Oembed => "oembed",
            FieldKind::Image => "image",
            FieldKind::File => "file",
            FieldKind::Gallery => "gallery",
            FieldKind::Select => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Radio => "radio",
            FieldKind::ButtonGroup => "button_group",
            FieldKind::TrueFalse => "true_false",
            FieldKind::Link => "link",
            FieldKind::PostObject => "post_object",
            FieldKind::PageLink => "page_link",
            FieldKind::Relationship => "relationship",
            FieldKind::Taxonomy => "taxonomy",
            FieldKind::User => "user",
            FieldKind::DatePicker => "date_picker",
            FieldKind::DateTimePicker => "date_time_picker",
            FieldKind::TimePicker => "time_picker",
            FieldKind::ColorPicker => "color_picker",
            FieldKind::Group => "group",
            FieldKind::Repeater => "repeater",
            FieldKind::FlexibleContent => "flexible_content",
            FieldKind::Other(kind) => kind,
        }
    }

    /// Whether values of this kind may hold several items and are stored
    /// as one JSON-encoded column.
    pub fn is_multi_valued(&self) -> bool {
        matches!(
            self,
            FieldKind::Gallery
                | FieldKind::Checkbox
                | FieldKind::Select
                | FieldKind::Link
                | FieldKind::PostObject
                | FieldKind::PageLink
                | FieldKind::Relationship
                | FieldKind::Taxonomy
                | FieldKind::User
        )
    }
}

impl From<&str> for FieldKind {
    fn from(s: &str) -> Self {
        match s {
            "text" => FieldKind::Text,
            "textarea" => FieldKind::Textarea,
            "number" => FieldKind::Number,
            "range" => FieldKind::Range,
            "email" => FieldKind::Email,
            "url" => FieldKind::Url,
            "password" => FieldKind::Password,
            "wysiwyg" => FieldKind::Wysiwyg,
            "oembed" => FieldKind::Oembed,
            "image" => FieldKind::Image,
            "file" => FieldKind::File,
            "gallery" => FieldKind::Gallery,
            "select" => FieldKind::Select,
            "checkbox" => FieldKind::Checkbox,
            "radio" => FieldKind::Radio,
            "button_group" => FieldKind::ButtonGroup,
            "true_false" => FieldKind::TrueFalse,
            "link" => FieldKind::Link,
            "post_object" => FieldKind::PostObject,
            "page_link" => FieldKind::PageLink,
            "relationship" => FieldKind::Relationship,
            "taxonomy" => FieldKind::Taxonomy,
            "user" => FieldKind::User,
            "date_picker" => FieldKind::DatePicker,
            "date_time_picker" => FieldKind::DateTimePicker,
            "time_picker" => FieldKind::TimePicker,
            "color_picker" => FieldKind::ColorPicker,
            "group" => FieldKind::Group,
            "repeater" => FieldKind::Repeater,
            "flexible_content" => FieldKind::FlexibleContent,
            other => FieldKind::Other(other.to_string()),
        }
    }
}

impl From<String> for FieldKind {
    fn from(s: String) -> Self {
        FieldKind::from(s.as_str())
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field node in a field-group definition.
///
/// A field with `sub_fields` is a composite (group, repeater); a field
/// without is a leaf. `parent` and `group` are back-references that ACF's
/// JSON export does not carry; they are filled in by
/// [`FieldCatalog`](crate::FieldCatalog) when a group is indexed.
///
/// # Examples
///
/// ```
/// use acf_tables_core::{Field, FieldKind};
///
/// let faq = Field::new("field_faq", "faq", FieldKind::Repeater)
///     .with_sub_field(Field::new("field_question", "question", FieldKind::Text));
///
/// assert!(faq.is_composite());
/// assert_eq!(faq.sub_fields[0].name, "question");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Stable identifier (e.g. `field_5f1a2b3c`).
    pub key: String,
    /// Machine name used to derive column names.
    pub name: String,
    /// Human label shown in the editor.
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "is_empty_default")]
    pub default_value: Option<Value>,
    #[serde(
        default,
        rename = "maxlength",
        deserialize_with = "lenient_u32",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_length: Option<u32>,
    /// Key of the parent field, `None` for top-level fields.
    #[serde(
        default,
        deserialize_with = "lenient_parent",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent: Option<String>,
    /// Key of the owning field group.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_fields: Vec<Field>,
}

impl Field {
    /// Creates a leaf field with no default, constraints or children.
    pub fn new(key: &str, name: &str, kind: FieldKind) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            label: String::new(),
            kind,
            default_value: None,
            max_length: None,
            parent: None,
            group: String::new(),
            sub_fields: Vec::new(),
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Sets the requested maximum length.
    pub fn with_max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Appends a sub-field.
    pub fn with_sub_field(mut self, field: Field) -> Self {
        self.sub_fields.push(field);
        self
    }

    /// Returns `true` if this field declares sub-fields.
    pub fn is_composite(&self) -> bool {
        !self.sub_fields.is_empty()
    }

    /// Looks up a direct sub-field by key.
    pub fn find_sub_field(&self, key: &str) -> Option<&Field> {
        self.sub_fields.iter().find(|f| f.key == key)
    }
}

/// A named field-group definition; one group maps to one table.
///
/// # Examples
///
/// ```
/// use acf_tables_core::{Field, FieldGroup, FieldKind};
///
/// let group = FieldGroup::new("group_page", "Page fields")
///     .with_table("page_fields")
///     .with_field(Field::new("field_title", "title", FieldKind::Text));
///
/// assert_eq!(group.table_name(), "page_fields");
/// assert_eq!(group.fields.len(), 1);
///
/// // Without a declared table the key doubles as table name.
/// assert_eq!(FieldGroup::new("group_page", "Page").table_name(), "group_page");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGroup {
    pub key: String,
    #[serde(default)]
    pub title: String,
    /// Declared destination table name (without the store prefix).
    #[serde(
        default,
        rename = "custom_table_name",
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub table: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl FieldGroup {
    /// Creates an empty group.
    pub fn new(key: &str, title: &str) -> Self {
        Self {
            key: key.to_string(),
            title: title.to_string(),
            table: None,
            fields: Vec::new(),
        }
    }

    /// Sets the destination table name.
    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Appends a top-level field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the destination table name, falling back to the group key.
    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.key)
    }
}

fn is_empty_default(value: &Option<Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// ACF writes `maxlength` as a number, a numeric string, or `""`.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// ACF writes `parent` as a key, a numeric post ID, or `0`/`""` for none.
fn lenient_parent<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() && s != "0" => Some(s),
        Some(Value::Number(n)) if n.as_u64() != Some(0) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_string() {
        for kind in ["text", "repeater", "date_time_picker", "flexible_content"] {
            assert_eq!(FieldKind::from(kind).as_str(), kind);
        }
        let other = FieldKind::from("acf_icon_picker");
        assert_eq!(other, FieldKind::Other("acf_icon_picker".to_string()));
        assert_eq!(String::from(other), "acf_icon_picker");
    }

    #[test]
    fn test_field_deserializes_acf_export_shape() {
        let json = r#"{
            "key": "field_faq",
            "label": "FAQ",
            "name": "faq",
            "type": "repeater",
            "sub_fields": [
                {"key": "field_q", "label": "Question", "name": "question",
                 "type": "text", "maxlength": "", "default_value": ""},
                {"key": "field_a", "label": "Answer", "name": "answer",
                 "type": "wysiwyg", "maxlength": 120}
            ]
        }"#;
        let field: Field = serde_json::from_str(json).unwrap();
        assert_eq!(field.kind, FieldKind::Repeater);
        assert_eq!(field.sub_fields.len(), 2);
        assert_eq!(field.sub_fields[0].max_length, None);
        assert_eq!(field.sub_fields[1].max_length, Some(120));
        assert!(field.parent.is_none());
    }

    #[test]
    fn test_group_blank_table_name_falls_back_to_key() {
        let json = r#"{"key": "group_abc", "title": "ABC", "custom_table_name": " ", "fields": []}"#;
        let group: FieldGroup = serde_json::from_str(json).unwrap();
        assert_eq!(group.table, None);
        assert_eq!(group.table_name(), "group_abc");
    }

    #[test]
    fn test_empty_default_is_not_serialized() {
        let field = Field::new("field_t", "title", FieldKind::Text).with_default("");
        let json = serde_json::to_value(&field).unwrap();
        assert!(json.get("default_value").is_none());
        assert_eq!(json["type"], "text");
    }

    #[test]
    fn test_numeric_parent_ids_are_accepted() {
        let parse = |parent: &str| -> Field {
            let json = format!(r#"{{"key": "field_q", "name": "q", "type": "text", "parent": {parent}}}"#);
            serde_json::from_str(&json).unwrap()
        };
        assert_eq!(parse("1234").parent.as_deref(), Some("1234"));
        assert_eq!(parse(r#""field_faq""#).parent.as_deref(), Some("field_faq"));
        assert!(parse("0").parent.is_none());
        assert!(parse(r#""""#).parent.is_none());
        assert!(parse("null").parent.is_none());
    }
}
