//! Field-group definition loading and store configuration.
//!
//! This crate loads ACF field-group definitions from their local JSON
//! exports (a directory of `group_*.json` files or a single export bundle)
//! and reads the YAML settings that decide where custom tables live.
//!
//! # Quick start
//!
//! ```no_run
//! use acf_tables_db::{FieldGroupSet, StoreConfig};
//!
//! let config = StoreConfig::load("acf-tables.yml").unwrap();
//! config.validate().unwrap();
//!
//! // Load definitions from a directory
//! let set = FieldGroupSet::from_dir("acf-json/").unwrap();
//! if let Some(group) = set.get("group_faq") {
//!     println!("{} stores into {}", group.title, config.table_name(group.table_name()));
//! }
//!
//! // Use the builder for fallback chains
//! let set = FieldGroupSet::builder()
//!     .from_dir("acf-json/")
//!     .from_bundle("acf-export.json")
//!     .build()
//!     .unwrap();
//! for (group, error) in set.validate() {
//!     eprintln!("{group}: {error}");
//! }
//! ```

mod config;
mod error;
mod loader;

pub use config::StoreConfig;
pub use error::{DatabaseError, Result};
pub use loader::{DefinitionSource, FieldGroupSet, FieldGroupSetBuilder};
