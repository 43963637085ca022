use std::mem;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::primitives::concurrency::WriterGuard;
use crate::storage::flags::FlagSelector;
use crate::storage::index::MetadataIndex;
use crate::storage::node::{NodeRecord, NodeRef};
use crate::storage::types::{Metadata, Payload};
use crate::types::Result;

use super::editor::NodeEditor;
use super::reader;
use super::shadow::Shadow;
use super::{GraphState, IndexMap, StoreInner};

/// Copy-on-write transaction over the graph.
///
/// Edits accumulate in a private shadow; [`GraphWriter::commit`] publishes
/// them and may be called repeatedly. [`GraphWriter::release`] records
/// history for everything committed and frees the writer slot. Dropping the
/// writer instead discards uncommitted edits and records nothing.
pub struct GraphWriter<V: Payload, M: Metadata> {
    store: Arc<StoreInner<V, M>>,
    pub(super) shadow: Shadow<V, M>,
    record: bool,
    /// Committed keys awaiting a revision; true if data (not only edges) changed.
    new_revs: FxHashMap<String, bool>,
    released: bool,
    _guard: WriterGuard,
}

impl<V: Payload, M: Metadata> GraphWriter<V, M> {
    pub(crate) fn new(
        store: Arc<StoreInner<V, M>>,
        state: &GraphState<V, M>,
        record: bool,
        guard: WriterGuard,
    ) -> Self {
        Self {
            store,
            shadow: Shadow::from_state(state),
            record,
            new_revs: FxHashMap::default(),
            released: false,
            _guard: guard,
        }
    }

    /// Returns an editor for `key`, creating an empty node if it does not exist.
    pub fn set_node(&mut self, key: &str) -> NodeEditor<'_, V, M> {
        self.shadow.ensure_node(key);
        NodeEditor::new(&mut self.shadow, key)
    }

    /// Returns an editor for an existing node.
    pub fn edit_node(&mut self, key: &str) -> Option<NodeEditor<'_, V, M>> {
        if !self.shadow.nodes.contains_key(key) {
            return None;
        }
        Some(NodeEditor::new(&mut self.shadow, key))
    }

    /// Deletes `key` and all its edges; returns false if the node does not exist.
    pub fn delete_node(&mut self, key: &str) -> bool {
        self.shadow.delete_node(key)
    }

    /// Makes `index` available to nodes binding to its name.
    pub fn register_metadata_map(&mut self, index: Arc<dyn MetadataIndex<M>>) {
        self.shadow.register_index(index);
    }

    /// Returns the node stored under `key`, including uncommitted edits.
    pub fn get_node(&self, key: &str) -> Option<NodeRef<'_, V, M>> {
        reader::get_node(&self.shadow.nodes, key)
    }

    /// Filtered scan over the writer's view, ordered by key.
    pub fn get_nodes(
        &self,
        keys: Option<&dyn Fn(&str) -> bool>,
        flags: &[FlagSelector],
    ) -> Vec<NodeRef<'_, V, M>> {
        reader::get_nodes(&self.shadow.nodes, keys, flags)
    }

    /// All keys in the writer's view, sorted.
    pub fn get_keys(&self) -> Vec<&str> {
        reader::get_keys(&self.shadow.nodes)
    }

    /// Returns the metadata index registered under `name`, including
    /// registrations not committed yet.
    pub fn get_metadata_map(&self, name: &str) -> Option<Arc<dyn MetadataIndex<M>>> {
        reader::get_metadata_map(&self.shadow.indices, name)
    }

    /// Checks edge symmetry of the writer's view.
    pub fn verify_edges(&self) -> Result<()> {
        reader::verify_edges(&self.shadow.nodes)
    }

    /// Returns true if there is anything left to commit.
    pub fn has_changes(&self) -> bool {
        self.shadow.has_changes()
    }

    /// Publishes all pending edits to the live graph.
    ///
    /// Readers opened before the commit keep their old view. Metadata index
    /// updates are best effort; failures are logged and do not stop the commit.
    pub fn commit(&mut self) {
        if !self.shadow.has_changes() {
            return;
        }
        let mut live = self.store.live.write();
        let state = Arc::make_mut(&mut live);

        for index in self.shadow.new_indices.drain(..) {
            state.indices.insert(index.name().to_owned(), index);
        }

        let mut deleted = 0;
        for key in mem::take(&mut self.shadow.deleted) {
            if let Some(node) = state.nodes.remove(&key) {
                drop_metadata(&state.indices, &node);
                deleted += 1;
            }
            self.new_revs.insert(key, true);
        }

        let mut written = 0;
        for (key, dirty) in mem::take(&mut self.shadow.dirty) {
            let Some(node) = self.shadow.nodes.get_mut(&key) else {
                continue;
            };
            if dirty.metadata {
                sync_metadata(&state.indices, Arc::make_mut(node));
            }
            state.nodes.insert(key.clone(), Arc::clone(node));
            written += 1;
            if dirty.needs_revision() {
                *self.new_revs.entry(key).or_insert(false) |= dirty.data;
            }
        }
        drop(live);

        self.store.options.metrics.commit(written, deleted);
        debug!(written, deleted, "graph.commit.completed");
    }

    /// Ends the transaction, recording revisions for committed changes if
    /// requested, and trims history when due.
    pub fn release(mut self) {
        self.released = true;
        let changed = if self.record {
            mem::take(&mut self.new_revs)
        } else {
            FxHashMap::default()
        };
        let stats = self.store.record_history(changed);
        debug!(
            recorded = stats.recorded,
            trimmed = stats.trimmed,
            uncommitted = self.shadow.has_changes(),
            "graph.release.recorded"
        );
    }
}

impl<V: Payload, M: Metadata> Drop for GraphWriter<V, M> {
    fn drop(&mut self) {
        if !self.released {
            debug!(
                uncommitted = self.shadow.has_changes(),
                unrecorded = self.new_revs.len(),
                "graph.writer.discarded"
            );
        }
    }
}

fn drop_metadata<V, M>(indices: &IndexMap<M>, node: &NodeRecord<V, M>) {
    let (Some(map), Some(label)) = (&node.metadata_map, &node.metadata_label) else {
        return;
    };
    match indices.get(map) {
        Some(index) => {
            if let Err(err) = index.delete(label) {
                warn!(key = %node.key, map = %map, error = %err, "graph.metadata.sync_failed");
            }
        }
        None => warn!(key = %node.key, map = %map, "graph.metadata.map_missing"),
    }
}

/// Pushes the node's metadata to its bound index and records the label it
/// was stored under.
fn sync_metadata<V, M: Metadata>(indices: &IndexMap<M>, node: &mut NodeRecord<V, M>) {
    let Some(map) = node.metadata_map.as_deref() else {
        return;
    };
    let Some(index) = indices.get(map) else {
        warn!(key = %node.key, map, "graph.metadata.map_missing");
        return;
    };
    let stored = node.metadata_label.clone();
    let result = match (&node.metadata, stored) {
        (None, None) => return,
        (None, Some(stored)) => index.delete(&stored).map(|()| None),
        (Some(meta), None) => index
            .put(&node.label, meta)
            .map(|()| Some(node.label.clone())),
        (Some(meta), Some(stored)) if stored == node.label => {
            let unchanged = index.get(&stored).as_ref() == Some(meta);
            if unchanged {
                Ok(Some(stored))
            } else {
                index.update(&stored, meta).map(|()| Some(stored))
            }
        }
        (Some(meta), Some(stored)) => index
            .delete(&stored)
            .and_then(|()| index.put(&node.label, meta))
            .map(|()| Some(node.label.clone())),
    };
    match result {
        Ok(label) => node.metadata_label = label,
        Err(err) => warn!(key = %node.key, map, error = %err, "graph.metadata.sync_failed"),
    }
}
