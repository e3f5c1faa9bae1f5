//! Field-group definition loading with builder pattern and fallback chains.
//!
//! ACF can mirror every field group to disk as "local JSON": one
//! `group_*.json` file per group, or a single export file holding an array
//! of groups. [`FieldGroupSet`] loads either shape; [`FieldGroupSetBuilder`]
//! tries several sources in order.
//!
//! ```no_run
//! use acf_tables_db::FieldGroupSet;
//!
//! let set = FieldGroupSet::from_dir("wp-content/themes/site/acf-json").unwrap();
//! for group in set.groups() {
//!     println!("{} -> {}", group.key, group.table_name());
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use acf_tables_core::{FieldCatalog, FieldGroup, ValidationError, validate_group};
use serde::Deserialize;

use crate::error::{DatabaseError, Result};

/// Describes where a [`FieldGroupSet`] was loaded from.
#[derive(Debug, Clone)]
pub enum DefinitionSource {
    /// A directory of local JSON files.
    Directory(PathBuf),
    /// A single export file.
    Bundle(PathBuf),
    /// Groups constructed in memory.
    Memory,
    /// Loaded via a fallback chain of multiple sources.
    Multiple(Vec<DefinitionSource>),
}

/// A file holds either one group or an export array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExportFile {
    Many(Vec<FieldGroup>),
    One(Box<FieldGroup>),
}

impl ExportFile {
    fn into_groups(self) -> Vec<FieldGroup> {
        match self {
            ExportFile::Many(groups) => groups,
            ExportFile::One(group) => vec![*group],
        }
    }
}

/// Field groups keyed by group key, iterated in key order.
///
/// # Examples
///
/// ```
/// use acf_tables_core::{Field, FieldGroup, FieldKind, FieldProvider};
/// use acf_tables_db::FieldGroupSet;
///
/// let set = FieldGroupSet::from_groups([
///     FieldGroup::new("group_b", "B"),
///     FieldGroup::new("group_a", "A")
///         .with_field(Field::new("field_title", "title", FieldKind::Text)),
/// ]);
///
/// let keys: Vec<_> = set.groups().map(|g| g.key.as_str()).collect();
/// assert_eq!(keys, ["group_a", "group_b"]);
/// assert!(set.catalog().field("field_title").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct FieldGroupSet {
    groups: BTreeMap<String, FieldGroup>,
    source: DefinitionSource,
}

impl FieldGroupSet {
    /// Returns a new [`FieldGroupSetBuilder`] for configuring a fallback chain.
    pub fn builder() -> FieldGroupSetBuilder {
        FieldGroupSetBuilder::new()
    }

    /// Builds a set from groups already in memory.
    pub fn from_groups(groups: impl IntoIterator<Item = FieldGroup>) -> Self {
        let mut set = Self {
            groups: BTreeMap::new(),
            source: DefinitionSource::Memory,
        };
        for group in groups {
            set.insert(group);
        }
        set
    }

    /// Loads every `*.json` file in `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::IoError`] if the directory or a file cannot
    /// be read, or [`DatabaseError::JsonError`] if a file is not a group or
    /// group array.
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(file_path);
            }
        }
        files.sort();

        let mut set = Self::from_groups(Vec::new());
        for file_path in files {
            for group in read_export(&file_path)? {
                set.insert(group);
            }
        }
        set.source = DefinitionSource::Directory(path.to_path_buf());
        Ok(set)
    }

    /// Loads a single export file (one group or an array of groups).
    pub fn from_bundle(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut set = Self::from_groups(read_export(path)?);
        set.source = DefinitionSource::Bundle(path.to_path_buf());
        Ok(set)
    }

    /// Inserts a group, replacing any previous definition with the same key.
    pub fn insert(&mut self, group: FieldGroup) {
        self.groups.insert(group.key.clone(), group);
    }

    /// Looks up a group by key.
    pub fn get(&self, key: &str) -> Option<&FieldGroup> {
        self.groups.get(key)
    }

    /// Returns `true` if a group with `key` is loaded.
    pub fn contains(&self, key: &str) -> bool {
        self.groups.contains_key(key)
    }

    /// Iterates over groups in key order.
    pub fn groups(&self) -> impl Iterator<Item = &FieldGroup> {
        self.groups.values()
    }

    /// Returns the number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if no group is loaded.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns where the set was loaded from.
    pub fn source(&self) -> &DefinitionSource {
        &self.source
    }

    /// Validates every group, returning `(group key, error)` pairs.
    pub fn validate(&self) -> Vec<(String, ValidationError)> {
        self.groups
            .values()
            .flat_map(|group| {
                validate_group(group)
                    .into_iter()
                    .map(|error| (group.key.clone(), error))
            })
            .collect()
    }

    /// Indexes all groups into a [`FieldCatalog`].
    pub fn catalog(&self) -> FieldCatalog {
        FieldCatalog::from_groups(self.groups.values().cloned())
    }
}

fn read_export(path: &Path) -> Result<Vec<FieldGroup>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let export: ExportFile = serde_json::from_reader(reader)?;
    let groups = export.into_groups();
    if let Some(group) = groups.iter().find(|g| g.key.trim().is_empty()) {
        return Err(DatabaseError::InvalidDefinition(format!(
            "{}: field group '{}' has no key",
            path.display(),
            group.title
        )));
    }
    Ok(groups)
}

/// Builder for constructing a [`FieldGroupSet`] with a fallback chain.
///
/// Sources are tried in the order they are added. The first successful load
/// wins; if all fail, [`DatabaseError::NoSourcesAvailable`] is returned.
///
/// ```no_run
/// use acf_tables_db::FieldGroupSet;
///
/// let set = FieldGroupSet::builder()
///     .from_dir("acf-json")
///     .from_bundle("acf-export.json")
///     .build()
///     .unwrap();
/// ```
pub struct FieldGroupSetBuilder {
    sources: Vec<DefinitionSource>,
}

impl FieldGroupSetBuilder {
    /// Creates a new builder with no sources.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Adds a local JSON directory as a source.
    pub fn from_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DefinitionSource::Directory(path.into()));
        self
    }

    /// Adds an export file as a source.
    pub fn from_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(DefinitionSource::Bundle(path.into()));
        self
    }

    /// Attempts to load groups from configured sources in order.
    pub fn build(self) -> Result<FieldGroupSet> {
        if self.sources.is_empty() {
            return Err(DatabaseError::NoSourcesAvailable);
        }

        let all_sources = self.sources.clone();

        for source in &self.sources {
            let result = match source {
                DefinitionSource::Directory(path) => FieldGroupSet::from_dir(path),
                DefinitionSource::Bundle(path) => FieldGroupSet::from_bundle(path),
                DefinitionSource::Memory | DefinitionSource::Multiple(_) => continue,
            };

            if let Ok(mut set) = result {
                set.source = DefinitionSource::Multiple(all_sources);
                return Ok(set);
            }
        }

        Err(DatabaseError::NoSourcesAvailable)
    }
}

impl Default for FieldGroupSetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acf_tables_core::FieldKind;

    const FAQ_GROUP: &str = r#"{
        "key": "group_faq",
        "title": "FAQ",
        "custom_table_name": "faq",
        "fields": [
            {"key": "field_title", "label": "Title", "name": "title", "type": "text", "maxlength": 80},
            {"key": "field_items", "label": "Items", "name": "items", "type": "repeater",
             "sub_fields": [
                {"key": "field_question", "label": "Question", "name": "question", "type": "text"}
             ]}
        ]
    }"#;

    #[test]
    fn test_from_dir_reads_single_group_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("group_faq.json"), FAQ_GROUP).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let set = FieldGroupSet::from_dir(dir.path()).unwrap();
        assert_eq!(set.len(), 1);
        let group = set.get("group_faq").unwrap();
        assert_eq!(group.table_name(), "faq");
        assert_eq!(group.fields[1].kind, FieldKind::Repeater);
        assert!(matches!(set.source(), DefinitionSource::Directory(_)));
    }

    #[test]
    fn test_from_bundle_reads_export_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acf-export.json");
        std::fs::write(
            &path,
            format!("[{FAQ_GROUP}, {{\"key\": \"group_other\", \"title\": \"Other\"}}]"),
        )
        .unwrap();

        let set = FieldGroupSet::from_bundle(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("group_other"));
        assert!(set.get("group_other").unwrap().fields.is_empty());
    }

    #[test]
    fn test_group_without_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"key": "", "title": "Nameless"}"#).unwrap();

        assert!(matches!(
            FieldGroupSet::from_bundle(&path),
            Err(DatabaseError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("group_x.json"), "{ not json").unwrap();
        assert!(matches!(
            FieldGroupSet::from_dir(dir.path()),
            Err(DatabaseError::JsonError(_))
        ));
    }

    #[test]
    fn test_builder_falls_back_to_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("acf-export.json");
        std::fs::write(&path, FAQ_GROUP).unwrap();

        let set = FieldGroupSet::builder()
            .from_dir("/nonexistent/acf-json")
            .from_bundle(&path)
            .build()
            .unwrap();
        assert!(set.contains("group_faq"));
        assert!(matches!(set.source(), DefinitionSource::Multiple(_)));
    }

    #[test]
    fn test_builder_all_fail() {
        assert!(matches!(
            FieldGroupSet::builder()
                .from_dir("/nonexistent/a")
                .from_bundle("/nonexistent/b.json")
                .build(),
            Err(DatabaseError::NoSourcesAvailable)
        ));
        assert!(FieldGroupSet::builder().build().is_err());
    }

    #[test]
    fn test_validate_reports_group_key() {
        let set = FieldGroupSet::from_groups([FieldGroup::new("group_bad", "Bad")
            .with_table("bad table")]);
        let errors = set.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "group_bad");
    }
}
