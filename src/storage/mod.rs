//! Graph storage engine and core data structures.
//!
//! Holds the node model, edge bookkeeping, secondary metadata indices and the
//! versioned store with its readers and copy-on-write writers.

/// Secondary metadata indices.
///
/// Nodes push their metadata into a named index chosen once per node.
pub mod index;

mod edge;
mod flags;
mod graph;
mod keyset;
mod metrics;
mod node;
mod options;
mod record;
mod types;

/// Edge definitions and resolved target sets.
pub use edge::{RelationTargetDef, RelationTargets, TargetSpec, Targets, TargetsByRelation};

/// Flags and flag-based node selection.
pub use flags::{Flag, FlagSelector};

/// Store, transaction handles and node editing.
pub use graph::{GraphReader, GraphStore, GraphWriter, NodeEditor};

/// Secondary index capability and the built-in in-memory index.
pub use index::{MemoryIndex, MetadataFields, MetadataIndex};

/// Sorted key sets used for every edge listing.
pub use keyset::KeySet;

/// Metrics sinks.
pub use metrics::{default_metrics, CounterMetrics, GraphMetrics, NoopMetrics};

/// Read-only node handles.
pub use node::{NodeRef, RuntimeTargets, RuntimeTargetsByLabel};

/// Store configuration.
pub use options::{GraphOptions, HistoryCfg};

/// Revision history entries.
pub use record::{FlagStats, RecordedNode};

/// Caller-supplied value, metadata and selector types.
pub use types::{KeySelector, Metadata, Payload};
