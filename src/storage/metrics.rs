use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters reported by the graph store for monitoring.
///
/// Called after the live graph lock is released, from the thread that
/// committed, released or was refused a writer.
pub trait GraphMetrics: Send + Sync {
    /// Records a commit that published `nodes_written` nodes and removed
    /// `nodes_deleted` nodes.
    fn commit(&self, nodes_written: usize, nodes_deleted: usize);

    /// Records revisions appended to node timelines on release.
    fn revisions_recorded(&self, count: usize);

    /// Records revisions dropped by a trimming pass.
    fn revisions_trimmed(&self, count: usize);

    /// Records a `write()` call refused because another writer was active.
    fn writer_rejected(&self);
}

/// A [`GraphMetrics`] implementation that discards everything.
#[derive(Default)]
pub struct NoopMetrics;

impl GraphMetrics for NoopMetrics {
    fn commit(&self, _nodes_written: usize, _nodes_deleted: usize) {}
    fn revisions_recorded(&self, _count: usize) {}
    fn revisions_trimmed(&self, _count: usize) {}
    fn writer_rejected(&self) {}
}

/// Atomic counters for every [`GraphMetrics`] event.
#[derive(Default, Debug)]
pub struct CounterMetrics {
    /// Commits that changed the live graph.
    pub commits: AtomicU64,
    /// Nodes published by commits.
    pub nodes_written: AtomicU64,
    /// Nodes removed by commits.
    pub nodes_deleted: AtomicU64,
    /// Revisions appended to timelines.
    pub revisions_recorded: AtomicU64,
    /// Revisions removed by trimming.
    pub revisions_trimmed: AtomicU64,
    /// Writers refused with [`crate::GraphError::WriterActive`].
    pub writers_rejected: AtomicU64,
}

impl CounterMetrics {
    /// Loads one counter.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

impl GraphMetrics for CounterMetrics {
    fn commit(&self, nodes_written: usize, nodes_deleted: usize) {
        self.commits.fetch_add(1, Ordering::Relaxed);
        self.nodes_written
            .fetch_add(nodes_written as u64, Ordering::Relaxed);
        self.nodes_deleted
            .fetch_add(nodes_deleted as u64, Ordering::Relaxed);
    }

    fn revisions_recorded(&self, count: usize) {
        self.revisions_recorded
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    fn revisions_trimmed(&self, count: usize) {
        self.revisions_trimmed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    fn writer_rejected(&self) {
        self.writers_rejected.fetch_add(1, Ordering::Relaxed);
    }
}

/// Returns the default metrics sink, a [`NoopMetrics`].
pub fn default_metrics() -> Arc<dyn GraphMetrics> {
    Arc::new(NoopMetrics)
}
