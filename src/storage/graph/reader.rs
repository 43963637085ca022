use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;

use crate::primitives::concurrency::ReaderGuard;
use crate::storage::flags::FlagSelector;
use crate::storage::index::MetadataIndex;
use crate::storage::node::{NodeMap, NodeRef};
use crate::storage::record::{FlagStats, RecordedNode};
use crate::storage::types::{Metadata, Payload};
use crate::types::{GraphError, Result};

use super::{dump, GraphState, IndexMap};

/// Read-only view of the graph as it was when the reader was opened.
///
/// Commits made after [`super::GraphStore::read`] returned are never visible
/// through this handle.
pub struct GraphReader<V: Payload, M: Metadata> {
    state: Arc<GraphState<V, M>>,
    _guard: ReaderGuard,
}

impl<V: Payload, M: Metadata> GraphReader<V, M> {
    pub(crate) fn new(state: Arc<GraphState<V, M>>, guard: ReaderGuard) -> Self {
        Self {
            state,
            _guard: guard,
        }
    }

    /// Returns the node stored under `key`.
    pub fn get_node(&self, key: &str) -> Option<NodeRef<'_, V, M>> {
        get_node(&self.state.nodes, key)
    }

    /// Returns nodes accepted by `keys` (if given) and by every flag selector,
    /// ordered by key.
    pub fn get_nodes(
        &self,
        keys: Option<&dyn Fn(&str) -> bool>,
        flags: &[FlagSelector],
    ) -> Vec<NodeRef<'_, V, M>> {
        get_nodes(&self.state.nodes, keys, flags)
    }

    /// All live keys in sorted order.
    pub fn get_keys(&self) -> Vec<&str> {
        get_keys(&self.state.nodes)
    }

    /// Returns the metadata index registered under `name`.
    pub fn get_metadata_map(&self, name: &str) -> Option<Arc<dyn MetadataIndex<M>>> {
        get_metadata_map(&self.state.indices, name)
    }

    /// Counts recorded revisions carrying `flag`, skipping edge-only revisions.
    ///
    /// Deleted nodes still contribute while their history is retained.
    pub fn get_flag_stats(&self, flag: &str, keys: Option<&dyn Fn(&str) -> bool>) -> FlagStats {
        let mut stats = FlagStats::default();
        for (key, timeline) in &self.state.timeline {
            if keys.is_some_and(|accept| !accept(key.as_str())) {
                continue;
            }
            timeline
                .iter()
                .filter(|record| !record.target_update_only)
                .filter_map(|record| record.flag(flag))
                .for_each(|found| stats.count(found));
        }
        stats
    }

    /// Recorded revisions of `key`, oldest first.
    pub fn get_node_timeline(&self, key: &str) -> &[Arc<RecordedNode<V>>] {
        self.state
            .timeline
            .get(key)
            .map(|timeline| timeline.as_slice())
            .unwrap_or_default()
    }

    /// The revision of every key that was valid at `at`, ordered by key.
    pub fn get_snapshot(&self, at: SystemTime) -> Vec<Arc<RecordedNode<V>>> {
        let mut snapshot: Vec<Arc<RecordedNode<V>>> = self
            .state
            .timeline
            .values()
            .filter_map(|timeline| timeline.iter().rev().find(|record| record.valid_at(at)))
            .cloned()
            .collect();
        snapshot.sort_by(|a, b| a.key.cmp(&b.key));
        snapshot
    }

    /// Human-readable listing of every live node.
    pub fn dump(&self) -> String {
        dump::render(&self.state.nodes, &self.state.indices)
    }

    /// Checks that every edge has both endpoints and a matching reverse entry.
    pub fn verify_edges(&self) -> Result<()> {
        verify_edges(&self.state.nodes)
    }

    /// Ends the read. Equivalent to dropping the reader.
    pub fn release(self) {}
}

impl<V: Payload + Serialize, M: Metadata> GraphReader<V, M> {
    /// JSON array with the revisions of `key`.
    pub fn timeline_json(&self, key: &str) -> Result<String> {
        let records: Vec<&RecordedNode<V>> =
            self.get_node_timeline(key).iter().map(Arc::as_ref).collect();
        Ok(serde_json::to_string(&records)?)
    }

    /// JSON array with the revisions valid at `at`.
    pub fn snapshot_json(&self, at: SystemTime) -> Result<String> {
        let snapshot = self.get_snapshot(at);
        let records: Vec<&RecordedNode<V>> = snapshot.iter().map(Arc::as_ref).collect();
        Ok(serde_json::to_string(&records)?)
    }
}

pub(crate) fn get_node<'a, V: Payload, M: Metadata>(
    nodes: &'a NodeMap<V, M>,
    key: &str,
) -> Option<NodeRef<'a, V, M>> {
    nodes.get(key).map(|record| NodeRef::new(record, nodes))
}

pub(crate) fn get_nodes<'a, V: Payload, M: Metadata>(
    nodes: &'a NodeMap<V, M>,
    keys: Option<&dyn Fn(&str) -> bool>,
    flags: &[FlagSelector],
) -> Vec<NodeRef<'a, V, M>> {
    let mut matched: Vec<NodeRef<'a, V, M>> = nodes
        .values()
        .filter(|record| keys.map_or(true, |accept| accept(record.key.as_str())))
        .filter(|record| flags.iter().all(|selector| selector.matches(&record.flags)))
        .map(|record| NodeRef::new(record, nodes))
        .collect();
    matched.sort_by(|a, b| a.key().cmp(b.key()));
    matched
}

pub(crate) fn get_keys<V, M>(nodes: &NodeMap<V, M>) -> Vec<&str> {
    let mut keys: Vec<&str> = nodes.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

pub(crate) fn get_metadata_map<M>(
    indices: &IndexMap<M>,
    name: &str,
) -> Option<Arc<dyn MetadataIndex<M>>> {
    indices.get(name).cloned()
}

pub(crate) fn verify_edges<V, M>(nodes: &NodeMap<V, M>) -> Result<()> {
    for node in nodes.values() {
        for (relation, target) in node.targets.edges() {
            let Some(target_node) = nodes.get(&target) else {
                return Err(GraphError::Inconsistent(format!(
                    "{} targets missing node {} under {}",
                    node.key, target, relation
                )));
            };
            if !target_node.sources.contains(&relation, &node.key) {
                return Err(GraphError::Inconsistent(format!(
                    "{} targets {} under {} without a source entry",
                    node.key, target, relation
                )));
            }
        }
        for (relation, sources) in node.sources.iter() {
            for source in sources.iter() {
                let reached = nodes
                    .get(source)
                    .is_some_and(|source_node| source_node.targets.reaches(relation, &node.key));
                if !reached {
                    return Err(GraphError::Inconsistent(format!(
                        "{} lists {} as source under {} without a matching target",
                        node.key, source, relation
                    )));
                }
            }
        }
    }
    Ok(())
}
