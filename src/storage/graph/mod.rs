use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::primitives::concurrency::{LockSnapshot, SingleWriter};
use crate::types::Result;

use super::index::MetadataIndex;
use super::node::NodeMap;
use super::options::GraphOptions;
use super::record::RecordedNode;
use super::types::{Metadata, Payload};

mod dump;
mod editor;
mod reader;
mod shadow;
mod vacuum;
mod writer;

pub use editor::NodeEditor;
pub use reader::GraphReader;
pub use writer::GraphWriter;

pub(crate) type IndexMap<M> = FxHashMap<String, Arc<dyn MetadataIndex<M>>>;
pub(crate) type Timeline<V> = Arc<Vec<Arc<RecordedNode<V>>>>;

/// Everything a reader can observe. Replaced as a whole, never mutated while shared.
pub(crate) struct GraphState<V, M> {
    pub(crate) nodes: NodeMap<V, M>,
    pub(crate) indices: IndexMap<M>,
    pub(crate) timeline: FxHashMap<String, Timeline<V>>,
}

impl<V, M> Clone for GraphState<V, M> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            indices: self.indices.clone(),
            timeline: self.timeline.clone(),
        }
    }
}

impl<V, M> Default for GraphState<V, M> {
    fn default() -> Self {
        Self {
            nodes: NodeMap::default(),
            indices: IndexMap::default(),
            timeline: FxHashMap::default(),
        }
    }
}

pub(crate) struct StoreInner<V, M> {
    pub(crate) live: RwLock<Arc<GraphState<V, M>>>,
    pub(crate) options: GraphOptions,
    pub(crate) started: SystemTime,
    pub(crate) last_trim: Mutex<SystemTime>,
    pub(crate) lock: SingleWriter,
}

/// Owner of the live graph.
///
/// Hands out snapshot readers and at most one copy-on-write writer at a time.
/// Cloning the store yields another handle to the same graph.
pub struct GraphStore<V: Payload, M: Metadata = ()> {
    inner: Arc<StoreInner<V, M>>,
}

impl<V: Payload, M: Metadata> Clone for GraphStore<V, M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Payload, M: Metadata> GraphStore<V, M> {
    /// Creates an empty graph; the start time is taken from the configured clock.
    pub fn new(options: GraphOptions) -> Self {
        let started = options.clock.now();
        Self {
            inner: Arc::new(StoreInner {
                live: RwLock::new(Arc::new(GraphState::default())),
                options,
                started,
                last_trim: Mutex::new(started),
                lock: SingleWriter::new(),
            }),
        }
    }

    /// Opens a reader over the current live graph.
    ///
    /// The reader keeps seeing this exact state, whatever is committed later.
    pub fn read(&self) -> GraphReader<V, M> {
        let guard = self.inner.lock.acquire_reader();
        let state = Arc::clone(&self.inner.live.read());
        GraphReader::new(state, guard)
    }

    /// Opens a writer over a private shadow of the live graph.
    ///
    /// With `record` set, nodes changed by the writer's commits get a new
    /// revision when the writer is released. Fails with
    /// [`crate::GraphError::WriterActive`] while another writer is alive.
    pub fn write(&self, record: bool) -> Result<GraphWriter<V, M>> {
        let guard = match self.inner.lock.try_acquire_writer() {
            Ok(guard) => guard,
            Err(err) => {
                warn!("graph.writer.rejected");
                self.inner.options.metrics.writer_rejected();
                return Err(err);
            }
        };
        let state = Arc::clone(&self.inner.live.read());
        Ok(GraphWriter::new(
            Arc::clone(&self.inner),
            &state,
            record,
            guard,
        ))
    }

    /// Active reader count and writer presence.
    pub fn lock_snapshot(&self) -> LockSnapshot {
        self.inner.lock.snapshot()
    }

    /// Options the store was created with.
    pub fn options(&self) -> &GraphOptions {
        &self.inner.options
    }

    /// Creation time of the store, as reported by its clock.
    pub fn started_at(&self) -> SystemTime {
        self.inner.started
    }
}

impl<V: Payload, M: Metadata> Default for GraphStore<V, M> {
    fn default() -> Self {
        Self::new(GraphOptions::default())
    }
}

impl<V: Payload, M: Metadata> fmt::Debug for GraphStore<V, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let live = self.inner.live.read();
        f.debug_struct("GraphStore")
            .field("nodes", &live.nodes.len())
            .field("indices", &live.indices.len())
            .field("lock", &self.inner.lock.snapshot())
            .finish()
    }
}
