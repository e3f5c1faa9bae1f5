use std::io::Write;
use std::path::Path;

use acf_tables_core::{Field, FieldGroup, FieldKind, FieldProvider, ValidationError};
use acf_tables_db::{DatabaseError, DefinitionSource, FieldGroupSet, StoreConfig};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn faq_group() -> FieldGroup {
    FieldGroup::new("group_faq", "FAQ")
        .with_table("faq")
        .with_field(Field::new("field_title", "title", FieldKind::Text).with_max_length(120))
        .with_field(
            Field::new("field_faq", "faq", FieldKind::Repeater)
                .with_sub_field(Field::new("field_question", "question", FieldKind::Text))
                .with_sub_field(Field::new("field_answer", "answer", FieldKind::Wysiwyg)),
        )
}

fn write_group(dir: &Path, group: &FieldGroup) {
    let path = dir.join(format!("{}.json", group.key));
    let mut f = std::fs::File::create(path).unwrap();
    serde_json::to_writer_pretty(&mut f, group).unwrap();
    f.flush().unwrap();
}

// ---------------------------------------------------------------------------
// Directory loading
// ---------------------------------------------------------------------------

#[test]
fn test_directory_loading() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), &faq_group());
    write_group(dir.path(), &FieldGroup::new("group_event", "Event").with_field(
        Field::new("field_date", "date", FieldKind::DatePicker),
    ));

    let set = FieldGroupSet::from_dir(dir.path()).unwrap();
    assert_eq!(set.len(), 2);
    assert!(set.contains("group_faq"));
    assert!(set.contains("group_event"));
    assert!(set.validate().is_empty());

    // Written and re-read definitions are identical.
    assert_eq!(set.get("group_faq").unwrap(), &faq_group());
}

#[test]
fn test_later_file_overrides_same_key() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.json"),
        r#"{"key": "group_faq", "title": "Old"}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("b.json"),
        r#"{"key": "group_faq", "title": "New"}"#,
    )
    .unwrap();

    let set = FieldGroupSet::from_dir(dir.path()).unwrap();
    assert_eq!(set.len(), 1);
    assert_eq!(set.get("group_faq").unwrap().title, "New");
}

#[test]
fn test_empty_directory() {
    let dir = tempfile::tempdir().unwrap();
    let set = FieldGroupSet::from_dir(dir.path()).unwrap();
    assert!(set.is_empty());
}

// ---------------------------------------------------------------------------
// ACF export shape
// ---------------------------------------------------------------------------

#[test]
fn test_acf_export_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acf-export.json");
    std::fs::write(
        &path,
        r#"[
            {
                "key": "group_5f1a2b3c",
                "title": "Product",
                "fields": [
                    {
                        "key": "field_5f1a2b40",
                        "label": "Price",
                        "name": "price",
                        "type": "number",
                        "instructions": "",
                        "required": 0,
                        "conditional_logic": 0,
                        "wrapper": {"width": "", "class": "", "id": ""},
                        "default_value": "",
                        "min": "",
                        "max": ""
                    },
                    {
                        "key": "field_5f1a2b41",
                        "label": "SKU",
                        "name": "sku",
                        "type": "text",
                        "default_value": "N/A",
                        "maxlength": "32"
                    }
                ],
                "location": [[{"param": "post_type", "operator": "==", "value": "product"}]],
                "menu_order": 0,
                "active": true,
                "custom_table_name": "product"
            }
        ]"#,
    )
    .unwrap();

    let set = FieldGroupSet::from_bundle(&path).unwrap();
    let group = set.get("group_5f1a2b3c").unwrap();
    assert_eq!(group.table_name(), "product");
    assert_eq!(group.fields[0].kind, FieldKind::Number);
    assert_eq!(group.fields[1].max_length, Some(32));
    assert_eq!(
        group.fields[1].default_value,
        Some(serde_json::json!("N/A"))
    );
    assert!(matches!(set.source(), DefinitionSource::Bundle(_)));
}

#[test]
fn test_catalog_from_set_resolves_nested_fields() {
    let set = FieldGroupSet::from_groups([faq_group()]);
    let catalog = set.catalog();

    let question = catalog.field("field_question").unwrap();
    assert_eq!(question.parent.as_deref(), Some("field_faq"));
    assert_eq!(catalog.column_name(question), "faq_question");
    assert_eq!(catalog.table_for(question), Some("faq"));
}

#[test]
fn test_validate_collects_every_group() {
    let bad_table = FieldGroup::new("group_a", "A").with_table("a b");
    let duplicate = FieldGroup::new("group_b", "B")
        .with_field(Field::new("field_x", "x", FieldKind::Text))
        .with_field(Field::new("field_y", "x", FieldKind::Text));

    let set = FieldGroupSet::from_groups([bad_table, duplicate]);
    let errors = set.validate();
    assert_eq!(
        errors,
        vec![
            (
                "group_a".to_string(),
                ValidationError::InvalidTableName("a b".to_string())
            ),
            (
                "group_b".to_string(),
                ValidationError::DuplicateColumn("x".to_string())
            ),
        ]
    );
}

// ---------------------------------------------------------------------------
// Fallback chain
// ---------------------------------------------------------------------------

#[test]
fn test_builder_prefers_first_source() {
    let dir = tempfile::tempdir().unwrap();
    write_group(dir.path(), &faq_group());
    let bundle = dir.path().join("export.bundle");
    std::fs::write(&bundle, r#"{"key": "group_other", "title": "Other"}"#).unwrap();

    let set = FieldGroupSet::builder()
        .from_dir(dir.path())
        .from_bundle(&bundle)
        .build()
        .unwrap();
    assert!(set.contains("group_faq"));
    assert!(!set.contains("group_other"));
}

#[test]
fn test_builder_reports_no_sources() {
    let result = FieldGroupSet::builder()
        .from_dir("/nonexistent/acf-json")
        .build();
    assert!(matches!(result, Err(DatabaseError::NoSourcesAvailable)));
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn test_config_points_at_definitions() {
    let dir = tempfile::tempdir().unwrap();
    let defs = dir.path().join("acf-json");
    std::fs::create_dir(&defs).unwrap();
    write_group(&defs, &faq_group());

    let config_path = dir.path().join("acf-tables.yml");
    std::fs::write(
        &config_path,
        format!(
            "table_prefix: site_\nfield_groups_dir: {}\n",
            defs.display()
        ),
    )
    .unwrap();

    let config = StoreConfig::load(&config_path).unwrap();
    config.validate().unwrap();
    assert_eq!(config.content_id_column, "post_id");

    let set = FieldGroupSet::from_dir(config.field_groups_dir.as_ref().unwrap()).unwrap();
    let group = set.get("group_faq").unwrap();
    assert_eq!(config.table_name(group.table_name()), "site_faq");
}
