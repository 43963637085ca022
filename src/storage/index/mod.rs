//! Secondary indices holding per-node metadata keyed by node label.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::{GraphError, Result};

use super::types::Metadata;

/// Field name -> values, as reported by [`MetadataIndex::list_fields`].
pub type MetadataFields = BTreeMap<String, Vec<String>>;

/// Extracts searchable fields from a metadata value.
pub type FieldExtractor<M> = Arc<dyn Fn(&M) -> MetadataFields + Send + Sync>;

/// Named side store the graph pushes node metadata into.
///
/// The graph treats every call as best effort: failed mutations are logged and
/// never abort a commit.
pub trait MetadataIndex<M>: Send + Sync {
    /// Name under which nodes bind to this index.
    fn name(&self) -> &str;
    /// Stores metadata for a label that is not indexed yet.
    fn put(&self, label: &str, value: &M) -> Result<()>;
    /// Replaces metadata stored for `label`.
    fn update(&self, label: &str, value: &M) -> Result<()>;
    /// Removes the entry for `label`; missing labels are ignored.
    fn delete(&self, label: &str) -> Result<()>;
    /// Returns the metadata stored for `label`.
    fn get(&self, label: &str) -> Option<M>;
    /// All indexed labels in sorted order.
    fn list_all_names(&self) -> Vec<String>;
    /// Searchable fields of the entry stored for `label`.
    fn list_fields(&self, label: &str) -> MetadataFields;
}

/// In-memory [`MetadataIndex`] with an optional field extractor.
pub struct MemoryIndex<M> {
    name: String,
    entries: RwLock<BTreeMap<String, M>>,
    fields: Option<FieldExtractor<M>>,
}

impl<M: Metadata> MemoryIndex<M> {
    /// Creates an empty index without searchable fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(BTreeMap::new()),
            fields: None,
        }
    }

    /// Creates an empty index whose entries expose the fields returned by `extract`.
    pub fn with_fields<F>(name: impl Into<String>, extract: F) -> Self
    where
        F: Fn(&M) -> MetadataFields + Send + Sync + 'static,
    {
        Self {
            fields: Some(Arc::new(extract)),
            ..Self::new(name)
        }
    }

    /// Labels whose entry carries `value` under `field`.
    pub fn lookup_by_field(&self, field: &str, value: &str) -> Vec<String> {
        let Some(extract) = &self.fields else {
            return Vec::new();
        };
        self.entries
            .read()
            .iter()
            .filter(|(_, meta)| {
                extract(meta)
                    .get(field)
                    .is_some_and(|values| values.iter().any(|v| v == value))
            })
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// Number of indexed labels.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<M: Metadata> MetadataIndex<M> for MemoryIndex<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn put(&self, label: &str, value: &M) -> Result<()> {
        self.entries.write().insert(label.to_owned(), value.clone());
        Ok(())
    }

    fn update(&self, label: &str, value: &M) -> Result<()> {
        let mut entries = self.entries.write();
        match entries.get_mut(label) {
            Some(slot) => {
                *slot = value.clone();
                Ok(())
            }
            None => Err(GraphError::IndexEntryMissing {
                index: self.name.clone(),
                label: label.to_owned(),
            }),
        }
    }

    fn delete(&self, label: &str) -> Result<()> {
        self.entries.write().remove(label);
        Ok(())
    }

    fn get(&self, label: &str) -> Option<M> {
        self.entries.read().get(label).cloned()
    }

    fn list_all_names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    fn list_fields(&self, label: &str) -> MetadataFields {
        match (&self.fields, self.entries.read().get(label)) {
            (Some(extract), Some(meta)) => extract(meta),
            _ => MetadataFields::new(),
        }
    }
}

impl<M> fmt::Debug for MemoryIndex<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryIndex")
            .field("name", &self.name)
            .field("entries", &self.entries.read().len())
            .finish()
    }
}
