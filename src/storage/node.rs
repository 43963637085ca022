use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use super::edge::{RelationTargetDef, RelationTargets, SourcesByRelation, TargetsByRelation};
use super::flags::{find_flag, Flag};
use super::keyset::KeySet;
use super::types::{Metadata, Payload};

/// Key -> node record, shared between the live graph and writer shadows.
pub(crate) type NodeMap<V, M> = FxHashMap<String, Arc<NodeRecord<V, M>>>;

/// Attribute values of one node.
///
/// Records are shared through `Arc` and only cloned when a writer touches them.
#[derive(Clone, Debug)]
pub(crate) struct NodeRecord<V, M> {
    pub(crate) key: String,
    pub(crate) label: String,
    pub(crate) value: Option<V>,
    pub(crate) flags: SmallVec<[Flag; 4]>,
    pub(crate) metadata: Option<M>,
    pub(crate) metadata_map: Option<String>,
    /// Label under which the metadata currently sits in the index.
    pub(crate) metadata_label: Option<String>,
    pub(crate) target_defs: Vec<RelationTargetDef>,
    pub(crate) targets: TargetsByRelation,
    pub(crate) sources: SourcesByRelation,
}

impl<V, M> NodeRecord<V, M> {
    pub(crate) fn new(key: &str) -> Self {
        Self {
            key: key.to_owned(),
            label: key.to_owned(),
            value: None,
            flags: SmallVec::new(),
            metadata: None,
            metadata_map: None,
            metadata_label: None,
            target_defs: Vec::new(),
            targets: TargetsByRelation::default(),
            sources: SourcesByRelation::default(),
        }
    }

    /// Target definitions selecting `key`, optionally restricted to one relation.
    pub(crate) fn target_defs_for_key<'a>(
        &'a self,
        key: &'a str,
        relation: Option<&'a str>,
    ) -> impl Iterator<Item = &'a RelationTargetDef> + 'a {
        self.target_defs.iter().filter(move |def| {
            relation.map_or(true, |relation| def.relation == relation) && def.selects(key)
        })
    }
}

/// Read-only handle to a node.
///
/// Obtained from a [`super::GraphReader`] or a [`super::GraphWriter`]; it never
/// exposes mutation. Edges resolve against the same node set the handle came from.
pub struct NodeRef<'a, V, M> {
    record: &'a NodeRecord<V, M>,
    nodes: &'a NodeMap<V, M>,
}

impl<V, M> Clone for NodeRef<'_, V, M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V, M> Copy for NodeRef<'_, V, M> {}

impl<'a, V: Payload, M: Metadata> NodeRef<'a, V, M> {
    pub(crate) fn new(record: &'a NodeRecord<V, M>, nodes: &'a NodeMap<V, M>) -> Self {
        Self { record, nodes }
    }

    /// Unique key of the node.
    pub fn key(&self) -> &'a str {
        &self.record.key
    }

    /// Label used to key the node's metadata; defaults to the key.
    pub fn label(&self) -> &'a str {
        &self.record.label
    }

    /// Node value, `None` until one is set.
    pub fn value(&self) -> Option<&'a V> {
        self.record.value.as_ref()
    }

    /// All flags, in the order they were set.
    pub fn flags(&self) -> &'a [Flag] {
        &self.record.flags
    }

    /// Returns the flag named `name`, if assigned.
    pub fn flag(&self, name: &str) -> Option<&'a Flag> {
        find_flag(&self.record.flags, name)
    }

    /// Metadata associated with the node.
    pub fn metadata(&self) -> Option<&'a M> {
        self.record.metadata.as_ref()
    }

    /// Name of the metadata index the node is bound to.
    pub fn metadata_map(&self) -> Option<&'a str> {
        self.record.metadata_map.as_deref()
    }

    /// Current target definitions.
    pub fn target_defs(&self) -> &'a [RelationTargetDef] {
        &self.record.target_defs
    }

    /// Target keys of `relation`, grouped by label.
    pub fn target_keys(&self, relation: &str) -> Option<&'a RelationTargets> {
        self.record.targets.for_relation(relation)
    }

    /// All target keys, grouped by relation and label.
    pub fn all_targets(&self) -> &'a TargetsByRelation {
        &self.record.targets
    }

    /// Target nodes of `relation`, grouped by label.
    pub fn targets(&self, relation: &str) -> RuntimeTargetsByLabel<'a, V, M> {
        let Some(rel) = self.record.targets.for_relation(relation) else {
            return RuntimeTargetsByLabel(Vec::new());
        };
        let nodes = self.nodes;
        RuntimeTargetsByLabel(
            rel.targets
                .iter()
                .map(|targets| RuntimeTargets {
                    label: &targets.label,
                    nodes: resolve(nodes, &targets.matching),
                })
                .collect(),
        )
    }

    /// Keys of nodes pointing at this node under `relation`.
    pub fn source_keys(&self, relation: &str) -> Option<&'a KeySet> {
        self.record.sources.for_relation(relation)
    }

    /// Nodes pointing at this node under `relation`.
    pub fn sources(&self, relation: &str) -> Vec<NodeRef<'a, V, M>> {
        match self.record.sources.for_relation(relation) {
            Some(sources) => resolve(self.nodes, sources),
            None => Vec::new(),
        }
    }

    pub(crate) fn record(&self) -> &'a NodeRecord<V, M> {
        self.record
    }
}

impl<V: Payload, M: Metadata> fmt::Debug for NodeRef<'_, V, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", &self.record.key)
            .field("label", &self.record.label)
            .field("value", &self.record.value)
            .field("flags", &self.record.flags)
            .finish_non_exhaustive()
    }
}

fn resolve<'a, V: Payload, M: Metadata>(
    nodes: &'a NodeMap<V, M>,
    keys: &KeySet,
) -> Vec<NodeRef<'a, V, M>> {
    keys.iter()
        .filter_map(|key| nodes.get(key))
        .map(|record| NodeRef::new(record, nodes))
        .collect()
}

/// Target nodes sharing one label.
pub struct RuntimeTargets<'a, V, M> {
    /// Edge label.
    pub label: &'a str,
    /// Currently matched nodes, ordered by key.
    pub nodes: Vec<NodeRef<'a, V, M>>,
}

/// Target nodes of one relation, grouped by label.
pub struct RuntimeTargetsByLabel<'a, V, M>(Vec<RuntimeTargets<'a, V, M>>);

impl<'a, V, M> RuntimeTargetsByLabel<'a, V, M> {
    /// Returns the group stored under `label`.
    pub fn for_label(&self, label: &str) -> Option<&RuntimeTargets<'a, V, M>> {
        self.0.iter().find(|targets| targets.label == label)
    }

    /// Iterates label groups in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &RuntimeTargets<'a, V, M>> + '_ {
        self.0.iter()
    }

    /// Number of labels defined for the relation.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the relation has no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
