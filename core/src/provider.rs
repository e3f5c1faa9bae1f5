//! Field metadata lookup.
//!
//! The host CMS owns field definitions; the storage engine only needs to
//! resolve a field key to its [`Field`] and a group key to its
//! [`FieldGroup`]. [`FieldProvider`] is that seam, and [`FieldCatalog`] is
//! the in-memory implementation built from loaded group definitions.

use std::collections::{HashMap, HashSet};

use crate::{Field, FieldGroup, join_column};

/// Resolves field and group metadata by key.
pub trait FieldProvider {
    /// Looks up a field (at any nesting depth) by key.
    fn field(&self, key: &str) -> Option<&Field>;

    /// Looks up a field group by key.
    fn group(&self, key: &str) -> Option<&FieldGroup>;

    /// Returns the parent field, if `field` is nested.
    fn parent_of(&self, field: &Field) -> Option<&Field> {
        field.parent.as_deref().and_then(|key| self.field(key))
    }

    /// Returns the destination table of the group owning `field`.
    fn table_for(&self, field: &Field) -> Option<&str> {
        self.group(&field.group).map(FieldGroup::table_name)
    }

    /// Derives the hierarchical column name of `field` from its declared
    /// name and the declared names of its ancestors.
    fn column_name(&self, field: &Field) -> String {
        let mut ancestors = Vec::new();
        let mut seen = HashSet::from([field.key.clone()]);
        let mut parent = field.parent.as_deref();
        while let Some(key) = parent {
            let Some(ancestor) = self.field(key) else {
                break;
            };
            if !seen.insert(ancestor.key.clone()) {
                break;
            }
            ancestors.push(ancestor.name.clone());
            parent = ancestor.parent.as_deref();
        }
        ancestors.reverse();
        join_column(&ancestors, &field.name)
    }
}

/// In-memory [`FieldProvider`] indexed from whole field groups.
///
/// Inserting a group fills in every field's `parent` and `group`
/// back-references, then indexes each field by key.
///
/// # Examples
///
/// ```
/// use acf_tables_core::{Field, FieldCatalog, FieldGroup, FieldKind, FieldProvider};
///
/// let group = FieldGroup::new("group_page", "Page")
///     .with_table("page_fields")
///     .with_field(
///         Field::new("field_faq", "faq", FieldKind::Group)
///             .with_sub_field(Field::new("field_q", "question", FieldKind::Text)),
///     );
///
/// let catalog = FieldCatalog::from_groups([group]);
/// let question = catalog.field("field_q").unwrap();
///
/// assert_eq!(question.parent.as_deref(), Some("field_faq"));
/// assert_eq!(catalog.column_name(question), "faq_question");
/// assert_eq!(catalog.table_for(question), Some("page_fields"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct FieldCatalog {
    groups: HashMap<String, FieldGroup>,
    fields: HashMap<String, Field>,
}

impl FieldCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a set of groups.
    pub fn from_groups(groups: impl IntoIterator<Item = FieldGroup>) -> Self {
        let mut catalog = Self::new();
        for group in groups {
            catalog.insert_group(group);
        }
        catalog
    }

    /// Inserts or replaces a group, returning the normalized copy.
    ///
    /// Fields indexed from a previous version of the same group are
    /// dropped first, so removed fields stop resolving.
    pub fn insert_group(&mut self, mut group: FieldGroup) -> &FieldGroup {
        if let Some(previous) = self.groups.remove(&group.key) {
            let mut stale = Vec::new();
            collect_keys(&previous.fields, &mut stale);
            for key in stale {
                self.fields.remove(&key);
            }
        }

        link_fields(&mut group.fields, &group.key, None);
        index_fields(&group.fields, &mut self.fields);

        let key = group.key.clone();
        self.groups.entry(key).or_insert(group)
    }

    /// Iterates over all groups in unspecified order.
    pub fn groups(&self) -> impl Iterator<Item = &FieldGroup> {
        self.groups.values()
    }

    /// Returns the number of indexed fields, at every depth.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns the number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if no group has been inserted.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl FieldProvider for FieldCatalog {
    fn field(&self, key: &str) -> Option<&Field> {
        self.fields.get(key)
    }

    fn group(&self, key: &str) -> Option<&FieldGroup> {
        self.groups.get(key)
    }
}

fn link_fields(fields: &mut [Field], group: &str, parent: Option<&str>) {
    for field in fields {
        field.group = group.to_string();
        field.parent = parent.map(String::from);
        let key = field.key.clone();
        link_fields(&mut field.sub_fields, group, Some(&key));
    }
}

fn index_fields(fields: &[Field], index: &mut HashMap<String, Field>) {
    for field in fields {
        index.insert(field.key.clone(), field.clone());
        index_fields(&field.sub_fields, index);
    }
}

fn collect_keys(fields: &[Field], keys: &mut Vec<String>) {
    for field in fields {
        keys.push(field.key.clone());
        collect_keys(&field.sub_fields, keys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldKind;

    fn page_group() -> FieldGroup {
        FieldGroup::new("group_page", "Page")
            .with_field(Field::new("field_title", "title", FieldKind::Text))
            .with_field(
                Field::new("field_hero", "hero", FieldKind::Group).with_sub_field(
                    Field::new("field_cta", "cta", FieldKind::Group)
                        .with_sub_field(Field::new("field_label", "label", FieldKind::Text)),
                ),
            )
    }

    #[test]
    fn test_catalog_indexes_every_depth() {
        let catalog = FieldCatalog::from_groups([page_group()]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.field_count(), 4);

        let label = catalog.field("field_label").unwrap();
        assert_eq!(label.group, "group_page");
        assert_eq!(catalog.column_name(label), "hero_cta_label");
        assert_eq!(catalog.parent_of(label).unwrap().key, "field_cta");
    }

    #[test]
    fn test_top_level_column_is_own_name() {
        let catalog = FieldCatalog::from_groups([page_group()]);
        let title = catalog.field("field_title").unwrap();
        assert_eq!(catalog.column_name(title), "title");
        assert!(catalog.parent_of(title).is_none());
        // No declared table: the group key is used.
        assert_eq!(catalog.table_for(title), Some("group_page"));
    }

    #[test]
    fn test_reinserting_group_drops_removed_fields() {
        let mut catalog = FieldCatalog::from_groups([page_group()]);
        let trimmed = FieldGroup::new("group_page", "Page")
            .with_field(Field::new("field_title", "title", FieldKind::Text));
        catalog.insert_group(trimmed);

        assert!(catalog.field("field_title").is_some());
        assert!(catalog.field("field_label").is_none());
        assert_eq!(catalog.field_count(), 1);
    }

    #[test]
    fn test_nested_group_embedded_copy_is_linked() {
        let catalog = FieldCatalog::from_groups([page_group()]);
        let hero = catalog.field("field_hero").unwrap();
        let cta = hero.find_sub_field("field_cta").unwrap();
        assert_eq!(cta.parent.as_deref(), Some("field_hero"));
        assert_eq!(cta.sub_fields[0].parent.as_deref(), Some("field_cta"));
    }

    #[test]
    fn test_column_name_survives_parent_cycle() {
        let mut a = Field::new("field_a", "a", FieldKind::Group);
        a.parent = Some("field_b".to_string());
        let mut b = Field::new("field_b", "b", FieldKind::Group);
        b.parent = Some("field_a".to_string());

        let mut catalog = FieldCatalog::new();
        catalog.fields.insert(a.key.clone(), a.clone());
        catalog.fields.insert(b.key.clone(), b);
        assert_eq!(catalog.column_name(&a), "b_a");
    }

    #[test]
    fn test_column_name_matches_join_column() {
        let group = FieldGroup::new("group_landing", "Landing").with_field(
            Field::new("field_seo", "seo", FieldKind::Group)
                .with_sub_field(Field::new("field_st", "seo_title", FieldKind::Text)),
        );
        let catalog = FieldCatalog::from_groups([group]);
        let title = catalog.field("field_st").unwrap();
        assert_eq!(
            catalog.column_name(title),
            join_column(&["seo".to_string()], "seo_title")
        );
        assert_eq!(catalog.column_name(title), "seo_seo_title");
    }
}
