//! Schema synchronization and value mapping example.
//!
//! Demonstrates the full lifecycle behind the host hooks: registering a
//! field group (which creates its table), saving submitted values,
//! loading them back, and correcting a column after the definition
//! changes.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p acf-tables-demos --example sync_and_save
//! ```

use acf_tables_core::{Field, FieldCatalog, FieldGroup, FieldKind, FieldProvider};
use acf_tables_sqlite::{AcfTables, Gateway, SaveEvent, SqliteGateway};
use rusqlite::Connection;
use serde_json::{Value, json};

fn main() {
    // === Step 1: Register a field group ===
    println!("=== Synchronization ===");
    let conn = Connection::open_in_memory().unwrap();
    let gateway = SqliteGateway::new(&conn, "wp_").unwrap();
    let mut tables = AcfTables::new(gateway, FieldCatalog::new());

    let report = tables.register_group(create_event_group()).unwrap();
    println!("Table: wp_{}", report.table);
    println!("  Tables created: {}", report.tables_created);
    println!("  Columns added: {}", report.columns_added);

    for column in tables.gateway().list_columns("event", None).unwrap() {
        println!("  {} {}", column.name, column.declared_type);
    }

    // Synchronizing an unchanged group issues no DDL
    let again = tables.register_group(create_event_group()).unwrap();
    println!("Second run DDL statements: {}", again.ddl_statements());

    // === Step 2: Save submitted values ===
    println!("\n=== Saving ===");
    let submitted = json!({
        "field_event_title": "Rust meetup",
        "field_event_seats": "40",
        "field_event_venue": {
            "field_venue_name": "Library",
            "field_venue_city": "Tampere"
        },
        "field_event_talks": [
            {"field_talk_title": "Ownership", "field_talk_speaker": "Aino"},
            {"field_talk_title": "Async", "field_talk_speaker": "Eero"}
        ],
        "field_not_in_group": "dropped"
    });
    let mut event = SaveEvent::new(101, submitted.as_object().cloned().unwrap_or_default());
    let saved = tables.on_content_saved(&mut event).unwrap();
    println!("Tables written: {}", saved.tables_written);
    println!("Columns written: {}", saved.columns_written);
    println!("Skipped keys: {:?}", saved.skipped_keys);
    println!("Event consumed: {}", event.is_consumed());

    // === Step 3: Load values back ===
    println!("\n=== Loading ===");
    for key in [
        "field_event_title",
        "field_event_seats",
        "field_event_venue",
        "field_event_talks",
    ] {
        let field = tables.provider().field(key).unwrap().clone();
        let value = tables.on_load_value(Value::Null, 101, &field).unwrap();
        println!("  {}: {value}", field.name);
    }

    // A single repeater item, as the host asks for it while rendering
    let mut speaker = tables.provider().field("field_talk_speaker").unwrap().clone();
    speaker.name = "talks_1_speaker".into();
    let value = tables.on_load_value(Value::Null, 101, &speaker).unwrap();
    println!("  talks_1_speaker: {value}");

    // === Step 4: Change the definition ===
    println!("\n=== Drift correction ===");
    let mut changed = create_event_group();
    changed.fields[0] = Field::new("field_event_title", "title", FieldKind::Textarea);
    let report = tables.register_group(changed).unwrap();
    println!("Columns altered: {}", report.columns_altered);

    let title = tables.provider().field("field_event_title").unwrap().clone();
    let value = tables.on_load_value(Value::Null, 101, &title).unwrap();
    println!("Title survived the rebuild: {value}");
}

fn create_event_group() -> FieldGroup {
    FieldGroup::new("group_event", "Event")
        .with_table("event")
        .with_field(Field::new("field_event_title", "title", FieldKind::Text).with_max_length(120))
        .with_field(Field::new("field_event_seats", "seats", FieldKind::Number).with_default(0))
        .with_field(
            Field::new("field_event_venue", "venue", FieldKind::Group)
                .with_sub_field(Field::new("field_venue_name", "name", FieldKind::Text))
                .with_sub_field(Field::new("field_venue_city", "city", FieldKind::Text)),
        )
        .with_field(
            Field::new("field_event_talks", "talks", FieldKind::Repeater)
                .with_sub_field(Field::new("field_talk_title", "title", FieldKind::Text))
                .with_sub_field(Field::new("field_talk_speaker", "speaker", FieldKind::Text)),
        )
}
