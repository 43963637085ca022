//! In-memory, versioned key/relation graph.
//!
//! Nodes are keyed items carrying a label, an opaque value, flags and
//! metadata. Directed labeled edges are declared per node, either towards a
//! literal key or towards every key matched by a selector, and the reverse
//! (source) index is kept in sync automatically. Readers work on immutable
//! snapshots, a single copy-on-write writer publishes changes on commit, and
//! every node keeps a trimmed timeline of its past revisions.

#![warn(missing_docs)]

pub mod primitives;
pub mod storage;
pub mod types;

pub use storage::{
    Flag, FlagSelector, FlagStats, GraphOptions, GraphReader, GraphStore, GraphWriter,
    HistoryCfg, KeySelector, KeySet, MemoryIndex, Metadata, MetadataIndex, NodeEditor, NodeRef,
    Payload, RecordedNode, RelationTargetDef, TargetSpec,
};
pub use types::{GraphError, Result};
