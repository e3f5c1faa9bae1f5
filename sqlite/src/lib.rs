//! SQLite storage for ACF field groups.
//!
//! Each field group gets its own table, keyed by content id, with one
//! column per field. This crate keeps those tables in step with the group
//! definitions and maps submitted values into rows and back.
//!
//! # Architecture
//!
//! - **`schema`**: DDL and DML generation with validated, quoted identifiers
//! - **`gateway`**: the [`Gateway`] seam and its SQLite implementation
//! - **`sync`**: derives desired columns and reconciles the store
//! - **`codec`**: per-kind value conversion, including repeaters
//! - **`save`** / **`load`**: the value pipelines
//! - **`tables`**: the [`AcfTables`] facade with the host hooks
//!
//! # Quick start
//!
//! ```no_run
//! use acf_tables_db::StoreConfig;
//! use acf_tables_sqlite::{AcfTables, SaveEvent};
//! use rusqlite::Connection;
//! use serde_json::json;
//!
//! let conn = Connection::open("site.db").unwrap();
//! let config = StoreConfig::load("acf-tables.yaml").unwrap();
//! let tables = AcfTables::from_config(&conn, &config).unwrap();
//!
//! let submitted = json!({"field_title": "Hello"}).as_object().unwrap().clone();
//! let report = tables.on_content_saved(&mut SaveEvent::new(42, submitted)).unwrap();
//! println!("wrote {} columns", report.columns_written);
//! ```
//!
//! # Table prefix
//!
//! Table names are logical; the gateway prepends its prefix (`wp_` by
//! default in [`StoreConfig`](acf_tables_db::StoreConfig)). The prefix may
//! be empty and must otherwise satisfy the identifier allow-list.

mod codec;
mod error;
mod gateway;
mod load;
mod save;
pub mod schema;
mod sync;
mod tables;

pub use codec::{
    CLONE_INDEX, CodecContext, CodecRegistry, DefaultCodec, FieldCodec, JsonCodec,
    JsonOrScalarCodec, LoadRequest, NumberCodec, ParentColumn, RepeaterCodec, RichTextCodec,
    Saved, strip_slashes,
};
pub use error::{Result, SqliteError};
pub use gateway::{Gateway, SqliteGateway};
pub use load::load_field_value;
pub use save::{SaveEvent, SaveReport, TableRows, collect_rows, save_content_values};
pub use sync::{SyncReport, Synchronizer};
pub use tables::AcfTables;
