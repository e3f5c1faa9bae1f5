//! Field-group definition loading example.
//!
//! Demonstrates how ACF local JSON exports are read from a directory,
//! validated, and synchronized into tables through a YAML store
//! configuration.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p acf-tables-demos --example load_definitions
//! ```
//!
//! This example creates temporary definition files to demonstrate the API.

use acf_tables_db::{FieldGroupSet, StoreConfig};
use acf_tables_sqlite::{AcfTables, Gateway};
use rusqlite::Connection;
use serde_json::json;

fn main() {
    // Create a temporary directory with ACF exports
    let root = std::env::temp_dir().join("acf_tables_example_defs");
    let defs = root.join("acf-json");
    std::fs::create_dir_all(&defs).unwrap();

    let exports = [
        json!({
            "key": "group_product",
            "title": "Product",
            "custom_table_name": "product",
            "fields": [
                {"key": "field_sku", "label": "SKU", "name": "sku", "type": "text", "maxlength": 32},
                {"key": "field_price", "label": "Price", "name": "price", "type": "number"},
                {"key": "field_images", "label": "Images", "name": "images", "type": "gallery"}
            ]
        }),
        json!({
            "key": "group_seo",
            "title": "SEO",
            "fields": [
                {"key": "field_seo_title", "label": "Title", "name": "seo_title", "type": "text", "maxlength": ""},
                {"key": "field_seo_desc", "label": "Description", "name": "seo_description", "type": "textarea"}
            ]
        }),
    ];
    for export in &exports {
        let path = defs.join(format!("{}.json", export["key"].as_str().unwrap()));
        std::fs::write(&path, serde_json::to_string_pretty(export).unwrap()).unwrap();
    }

    // Load and validate the definitions on their own
    let set = FieldGroupSet::from_dir(&defs).unwrap();
    println!("Loaded {} field groups", set.len());
    for group in set.groups() {
        println!("  {} -> table {}", group.key, group.table_name());
    }
    let problems = set.validate();
    println!("Validation problems: {}", problems.len());

    // Save a store configuration and build the facade from it
    let config_path = root.join("acf-tables.yaml");
    let config = StoreConfig {
        field_groups_dir: Some(defs.clone()),
        ..StoreConfig::default()
    };
    config.save(&config_path).unwrap();

    let config = StoreConfig::load(&config_path).unwrap();
    let conn = Connection::open_in_memory().unwrap();
    let tables = AcfTables::from_config(&conn, &config).unwrap();

    println!();
    println!("Tables after startup:");
    for table in tables.gateway().list_tables().unwrap() {
        let columns = tables.gateway().list_columns(&table, None).unwrap();
        println!("  {}{table}: {} columns", config.table_prefix, columns.len());
    }

    // Cleanup
    std::fs::remove_dir_all(&root).ok();
}
