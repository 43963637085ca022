use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::storage::edge::{RelationTargetDef, TargetSpec};
use crate::storage::index::MetadataIndex;
use crate::storage::node::{NodeMap, NodeRecord};
use crate::storage::types::{Metadata, Payload};

use super::{GraphState, IndexMap};

/// What changed on a node since the writer's last commit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Dirty {
    /// Label, value, flags, metadata or target definitions.
    pub(crate) data: bool,
    /// Resolved target keys.
    pub(crate) targets: bool,
    /// Reverse (source) entries.
    pub(crate) sources: bool,
    /// Metadata must be pushed to the bound index.
    pub(crate) metadata: bool,
}

impl Dirty {
    pub(crate) fn needs_revision(&self) -> bool {
        self.data || self.targets
    }
}

/// A writer's private copy of the graph.
///
/// Records stay shared with the live graph until first modified.
pub(crate) struct Shadow<V, M> {
    pub(crate) nodes: NodeMap<V, M>,
    pub(crate) dirty: FxHashMap<String, Dirty>,
    pub(crate) deleted: Vec<String>,
    pub(crate) indices: IndexMap<M>,
    pub(crate) new_indices: Vec<Arc<dyn MetadataIndex<M>>>,
}

impl<V: Payload, M: Metadata> Shadow<V, M> {
    pub(crate) fn from_state(state: &GraphState<V, M>) -> Self {
        Self {
            nodes: state.nodes.clone(),
            dirty: FxHashMap::default(),
            deleted: Vec::new(),
            indices: state.indices.clone(),
            new_indices: Vec::new(),
        }
    }

    pub(crate) fn has_changes(&self) -> bool {
        !self.dirty.is_empty() || !self.deleted.is_empty() || !self.new_indices.is_empty()
    }

    pub(crate) fn mark(&mut self, key: &str, update: impl FnOnce(&mut Dirty)) {
        match self.dirty.get_mut(key) {
            Some(dirty) => update(dirty),
            None => {
                let mut dirty = Dirty::default();
                update(&mut dirty);
                self.dirty.insert(key.to_owned(), dirty);
            }
        }
    }

    /// Private, writable copy of the node's record.
    pub(crate) fn node_mut(&mut self, key: &str) -> Option<&mut NodeRecord<V, M>> {
        self.nodes.get_mut(key).map(Arc::make_mut)
    }

    pub(crate) fn register_index(&mut self, index: Arc<dyn MetadataIndex<M>>) {
        self.indices
            .insert(index.name().to_owned(), Arc::clone(&index));
        self.new_indices.push(index);
    }

    /// Inserts an empty node for `key` unless present; returns true if created.
    ///
    /// Every other node's target definitions are checked against the new key.
    pub(crate) fn ensure_node(&mut self, key: &str) -> bool {
        if self.nodes.contains_key(key) {
            return false;
        }
        self.nodes
            .insert(key.to_owned(), Arc::new(NodeRecord::new(key)));
        self.mark(key, |dirty| dirty.data = true);

        let edges: Vec<(String, String, String, Option<String>)> = self
            .nodes
            .values()
            .filter(|node| node.key != key)
            .flat_map(|node| {
                node.target_defs_for_key(key, None).map(move |def| {
                    (
                        node.key.clone(),
                        def.relation.clone(),
                        def.label.clone(),
                        def.expected_key().map(str::to_owned),
                    )
                })
            })
            .collect();
        for (source, relation, label, expected) in edges {
            self.add_to_targets(&source, &relation, &label, expected.as_deref(), key);
        }
        true
    }

    /// Replaces the target definitions of `key` and re-resolves its edges.
    pub(crate) fn set_targets(&mut self, key: &str, defs: Vec<RelationTargetDef>) {
        let Some(node) = self.node_mut(key) else {
            return;
        };
        let previous = node.targets.edges();
        node.target_defs = defs;
        let pruned = prune_targets(node);
        let detached: Vec<(String, String)> = previous
            .into_iter()
            .filter(|(relation, target)| !node.targets.reaches(relation, target))
            .collect();
        let defs = node.target_defs.clone();
        self.mark(key, |dirty| {
            dirty.data = true;
            dirty.targets |= pruned;
        });

        for (relation, target) in detached {
            self.remove_from_sources(&target, &relation, key);
        }
        for def in &defs {
            self.resolve(key, def);
        }
    }

    fn resolve(&mut self, key: &str, def: &RelationTargetDef) {
        if let Some(node) = self.node_mut(key) {
            node.targets
                .entry(&def.relation, &def.label, def.expected_key());
        }
        match &def.target {
            TargetSpec::Key(target) => {
                if self.nodes.contains_key(target.as_str()) {
                    self.add_to_targets(
                        key,
                        &def.relation,
                        &def.label,
                        Some(target.as_str()),
                        target,
                    );
                }
            }
            TargetSpec::Selector(selector) => {
                let matched: Vec<String> = self
                    .nodes
                    .keys()
                    .filter(|candidate| candidate.as_str() != key && selector(candidate.as_str()))
                    .cloned()
                    .collect();
                trace!(
                    source = key,
                    relation = %def.relation,
                    label = %def.label,
                    scanned = self.nodes.len(),
                    matched = matched.len(),
                    "graph.targets.selector_scan"
                );
                for target in matched {
                    self.add_to_targets(key, &def.relation, &def.label, None, &target);
                }
            }
        }
    }

    /// Adds `target` under (relation, label) of `source` and the reverse entry.
    pub(crate) fn add_to_targets(
        &mut self,
        source: &str,
        relation: &str,
        label: &str,
        expected_key: Option<&str>,
        target: &str,
    ) {
        let present = self
            .nodes
            .get(source)
            .is_some_and(|node| node.targets.contains(relation, label, target));
        if !present {
            if let Some(node) = self.node_mut(source) {
                node.targets
                    .entry(relation, label, expected_key)
                    .matching
                    .insert(target);
                self.mark(source, |dirty| dirty.targets = true);
            }
        }
        let linked = self
            .nodes
            .get(target)
            .is_some_and(|node| node.sources.contains(relation, source));
        if !linked {
            if let Some(node) = self.node_mut(target) {
                node.sources.insert(relation, source);
                self.mark(target, |dirty| dirty.sources = true);
            }
        }
    }

    /// Drops `source` from the sources of `target` under `relation`.
    pub(crate) fn remove_from_sources(&mut self, target: &str, relation: &str, source: &str) {
        let linked = self
            .nodes
            .get(target)
            .is_some_and(|node| node.sources.contains(relation, source));
        if linked {
            if let Some(node) = self.node_mut(target) {
                node.sources.remove(relation, source);
                self.mark(target, |dirty| dirty.sources = true);
            }
        }
    }

    /// Drops `target` from every target set of `source`.
    pub(crate) fn remove_from_targets(&mut self, source: &str, target: &str) {
        let reached = self
            .nodes
            .get(source)
            .is_some_and(|node| node.targets.contains_anywhere(target));
        if reached {
            if let Some(node) = self.node_mut(source) {
                node.targets.remove_everywhere(target);
                self.mark(source, |dirty| dirty.targets = true);
            }
        }
    }

    /// Removes `key` and every edge touching it; returns false if it did not exist.
    pub(crate) fn delete_node(&mut self, key: &str) -> bool {
        let Some(node) = self.nodes.remove(key) else {
            return false;
        };
        self.dirty.remove(key);
        if !self.deleted.iter().any(|deleted| deleted == key) {
            self.deleted.push(key.to_owned());
        }
        for (relation, target) in node.targets.edges() {
            if target != key {
                self.remove_from_sources(&target, &relation, key);
            }
        }
        for (_, sources) in node.sources.iter() {
            for source in sources.iter() {
                if source != key {
                    self.remove_from_targets(source, key);
                }
            }
        }
        true
    }
}

/// Drops labels without a definition and keys no definition admits anymore.
///
/// Returns true if any target key or label was removed.
fn prune_targets<V, M>(node: &mut NodeRecord<V, M>) -> bool {
    let NodeRecord {
        key,
        target_defs,
        targets,
        ..
    } = node;
    let key = key.as_str();
    let mut changed = false;
    let relations = targets.relations_mut();
    for rel in relations.iter_mut() {
        let rel_defs: Vec<&RelationTargetDef> = target_defs
            .iter()
            .filter(|def| def.relation == rel.relation)
            .collect();
        let labels_before = rel.targets.len();
        rel.targets
            .retain(|t| rel_defs.iter().any(|def| def.label == t.label));
        changed |= rel.targets.len() != labels_before;

        for label_targets in rel.targets.iter_mut() {
            let stale: Vec<String> = label_targets
                .matching
                .iter()
                .filter(|target| {
                    !rel_defs
                        .iter()
                        .filter(|def| def.label == label_targets.label)
                        .any(|def| admits(def, key, target))
                })
                .map(str::to_owned)
                .collect();
            for target in stale {
                changed |= label_targets.matching.remove(&target);
            }
        }
    }
    relations.retain(|rel| !rel.targets.is_empty());
    changed
}

/// Returns true if `def` on node `source` resolves to `target`.
///
/// Selectors never match their own node; literal keys may.
fn admits(def: &RelationTargetDef, source: &str, target: &str) -> bool {
    match &def.target {
        TargetSpec::Key(key) => key == target,
        TargetSpec::Selector(selector) => target != source && selector(target),
    }
}
