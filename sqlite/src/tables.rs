//! The host-facing facade.
//!
//! [`AcfTables`] bundles a [`Gateway`], a [`FieldProvider`] and a
//! [`CodecRegistry`] and exposes the three hooks a host CMS calls:
//! field group saved, content saved, and field value loaded.
//!
//! # Example
//!
//! ```
//! use acf_tables_core::{Field, FieldCatalog, FieldGroup, FieldKind};
//! use acf_tables_sqlite::{AcfTables, SaveEvent, SqliteGateway};
//! use rusqlite::Connection;
//! use serde_json::{Value, json};
//!
//! let conn = Connection::open_in_memory().unwrap();
//! let gateway = SqliteGateway::new(&conn, "wp_").unwrap();
//! let mut tables = AcfTables::new(gateway, FieldCatalog::new());
//!
//! tables
//!     .register_group(
//!         FieldGroup::new("group_page", "Page")
//!             .with_table("page")
//!             .with_field(Field::new("field_title", "title", FieldKind::Text)),
//!     )
//!     .unwrap();
//!
//! let submitted = json!({"field_title": "Hello"}).as_object().unwrap().clone();
//! let mut event = SaveEvent::new(42, submitted);
//! tables.on_content_saved(&mut event).unwrap();
//! assert!(event.is_consumed());
//!
//! let title = Field::new("field_title", "title", FieldKind::Text);
//! assert_eq!(tables.on_load_value(Value::Null, 42, &title).unwrap(), json!("Hello"));
//! ```

use acf_tables_core::{
    Field, FieldCatalog, FieldGroup, FieldProvider, ValidationError, validate_group,
};
use acf_tables_db::{FieldGroupSet, StoreConfig};
use rusqlite::Connection;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::codec::{CodecContext, CodecRegistry, FieldCodec};
use crate::error::{Result, SqliteError};
use crate::gateway::{Gateway, SqliteGateway};
use crate::load::load_field_value;
use crate::save::{SaveEvent, SaveReport, save_content_values};
use crate::sync::{SyncReport, Synchronizer};

/// Schema synchronization and value mapping behind the host hooks.
pub struct AcfTables<G, P> {
    gateway: G,
    provider: P,
    codecs: CodecRegistry,
}

impl<G: Gateway, P: FieldProvider> AcfTables<G, P> {
    /// Creates the facade with the built-in codecs.
    pub fn new(gateway: G, provider: P) -> Self {
        Self::with_codecs(gateway, provider, CodecRegistry::builtin())
    }

    /// Creates the facade with a caller-assembled codec registry.
    pub fn with_codecs(gateway: G, provider: P, codecs: CodecRegistry) -> Self {
        Self {
            gateway,
            provider,
            codecs,
        }
    }

    /// Registers an extra codec, returning the one it replaces.
    pub fn register_codec(
        &mut self,
        kind: acf_tables_core::FieldKind,
        codec: Box<dyn FieldCodec>,
    ) -> Option<Box<dyn FieldCodec>> {
        self.codecs.register(kind, codec)
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    fn ctx(&self) -> CodecContext<'_> {
        CodecContext {
            gateway: &self.gateway,
            provider: &self.provider,
            codecs: &self.codecs,
        }
    }

    /// Hook: a field group definition was saved.
    ///
    /// Validates the group and synchronizes its table. Two fields mapping
    /// to one column are tolerated (the first wins); every other
    /// validation problem rejects the group before any DDL is issued.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::InvalidDefinition`] for an unusable group,
    /// or any store error raised while synchronizing.
    pub fn on_field_group_saved(&self, group: &FieldGroup) -> Result<SyncReport> {
        check_group(group)?;
        Synchronizer::new(&self.gateway, &self.codecs).synchronize(group)
    }

    /// Hook: a content item was saved with submitted field values.
    ///
    /// On success the event is consumed, so the host stores nothing in its
    /// own metadata. An already consumed event is a no-op.
    pub fn on_content_saved(&self, event: &mut SaveEvent) -> Result<SaveReport> {
        let Some(values) = event.values() else {
            debug!(content_id = event.content_id, "save event already consumed");
            return Ok(SaveReport::default());
        };

        let report = save_content_values(&self.ctx(), event.content_id, values)?;
        event.consume();
        debug!(
            content_id = event.content_id,
            tables = report.tables_written,
            columns = report.columns_written,
            "saved content values"
        );
        Ok(report)
    }

    /// Hook: the host is loading one field's value.
    ///
    /// Returns `previous` unchanged when the field's group is unknown.
    pub fn on_load_value(&self, previous: Value, post_id: i64, field: &Field) -> Result<Value> {
        load_field_value(&self.ctx(), previous, post_id, field)
    }

    /// Synchronizes every group, stopping at the first failure.
    pub fn synchronize_all<'g>(
        &self,
        groups: impl IntoIterator<Item = &'g FieldGroup>,
    ) -> Result<Vec<SyncReport>> {
        let mut reports = Vec::new();
        for group in groups {
            reports.push(self.on_field_group_saved(group)?);
        }
        let ddl: usize = reports.iter().map(SyncReport::ddl_statements).sum();
        info!(groups = reports.len(), ddl, "synchronized field groups");
        Ok(reports)
    }
}

impl<G: Gateway> AcfTables<G, FieldCatalog> {
    /// Adds (or replaces) a group in the catalog and synchronizes it.
    ///
    /// The catalog is left untouched if the group is rejected.
    pub fn register_group(&mut self, group: FieldGroup) -> Result<SyncReport> {
        check_group(&group)?;
        let group = self.provider.insert_group(group);
        Synchronizer::new(&self.gateway, &self.codecs).synchronize(group)
    }
}

impl<'c> AcfTables<SqliteGateway<'c>, FieldCatalog> {
    /// Builds the facade from store settings.
    ///
    /// When `field_groups_dir` is set, every definition found there is
    /// loaded into the catalog and synchronized.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::LoaderError`] if the settings are invalid or
    /// the definitions cannot be read.
    pub fn from_config(conn: &'c Connection, config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let gateway = SqliteGateway::from_config(conn, config)?;
        let mut tables = Self::new(gateway, FieldCatalog::new());

        if let Some(dir) = &config.field_groups_dir {
            let set = FieldGroupSet::from_dir(dir)?;
            info!(dir = %dir.display(), groups = set.len(), "loading field groups");
            for group in set.groups() {
                tables.register_group(group.clone())?;
            }
        }
        Ok(tables)
    }
}

fn check_group(group: &FieldGroup) -> Result<()> {
    let mut problems = Vec::new();
    for error in validate_group(group) {
        match error {
            ValidationError::DuplicateColumn(column) => {
                warn!(group = %group.key, column = %column, "duplicate column in field group");
            }
            other => problems.push(other.to_string()),
        }
    }
    if problems.is_empty() {
        Ok(())
    } else {
        Err(SqliteError::InvalidDefinition(format!(
            "{}: {}",
            group.key,
            problems.join("; ")
        )))
    }
}
