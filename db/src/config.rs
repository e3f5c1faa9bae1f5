//! Store configuration.
//!
//! Defines the YAML-serializable settings that decide where custom tables
//! live and where field-group definitions are read from.
//!
//! # Example YAML
//!
//! ```yaml
//! table_prefix: wp_
//! content_id_column: post_id
//! field_groups_dir: acf-json
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use acf_tables_core::validate_identifier;
use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, Result};

/// Settings shared by the gateway and the engine.
///
/// Missing keys fall back to WordPress's conventions (`wp_` prefix,
/// `post_id` key column).
///
/// # Examples
///
/// ```
/// use acf_tables_db::StoreConfig;
///
/// let config: StoreConfig = serde_yaml::from_str("table_prefix: site2_").unwrap();
/// assert_eq!(config.table_prefix, "site2_");
/// assert_eq!(config.content_id_column, "post_id");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prepended to every field-group table name.
    pub table_prefix: String,
    /// Primary-key column holding the content identifier.
    pub content_id_column: String,
    /// Directory of ACF local JSON exports, if definitions come from disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_groups_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_prefix: "wp_".to_string(),
            content_id_column: "post_id".to_string(),
            field_groups_dir: None,
        }
    }
}

impl StoreConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::DatabaseError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::DatabaseError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks that the prefix and key column are usable identifiers.
    ///
    /// An empty prefix is allowed.
    pub fn validate(&self) -> Result<()> {
        if !self.table_prefix.is_empty() {
            validate_identifier(&self.table_prefix)
                .map_err(|e| DatabaseError::InvalidDefinition(format!("table_prefix: {e}")))?;
        }
        validate_identifier(&self.content_id_column)
            .map_err(|e| DatabaseError::InvalidDefinition(format!("content_id_column: {e}")))?;
        Ok(())
    }

    /// Returns the physical name of a group table.
    pub fn table_name(&self, table: &str) -> String {
        format!("{}{}", self.table_prefix, table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acf-tables.yml");

        let config = StoreConfig {
            table_prefix: "blog_".to_string(),
            content_id_column: "object_id".to_string(),
            field_groups_dir: Some(PathBuf::from("acf-json")),
        };
        config.save(&path).unwrap();

        let loaded = StoreConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: StoreConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());
        assert_eq!(config.table_name("faq"), "wp_faq");
    }

    #[test]
    fn test_validate_rejects_bad_identifiers() {
        let config = StoreConfig {
            table_prefix: "wp_; --".to_string(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DatabaseError::InvalidDefinition(_))
        ));

        let config = StoreConfig {
            content_id_column: String::new(),
            ..StoreConfig::default()
        };
        assert!(config.validate().is_err());

        let config = StoreConfig {
            table_prefix: String::new(),
            ..StoreConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            StoreConfig::load("/nonexistent/acf-tables.yml"),
            Err(DatabaseError::IoError(_))
        ));
    }
}
