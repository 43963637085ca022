use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::storage::options::HistoryCfg;
use crate::storage::record::RecordedNode;
use crate::storage::types::{Metadata, Payload};

use super::dump::metadata_fields;
use super::{GraphState, StoreInner};

/// Outcome of the history work done when a writer is released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct ReleaseStats {
    pub(crate) recorded: usize,
    pub(crate) trimmed: usize,
    pub(crate) timelines_dropped: usize,
}

impl<V: Payload, M: Metadata> StoreInner<V, M> {
    /// Appends revisions for `changed` (key -> data updated) and, when due,
    /// trims history. Takes the live graph lock only if there is work.
    pub(crate) fn record_history(&self, changed: FxHashMap<String, bool>) -> ReleaseStats {
        let cfg = &self.options.history;
        if !cfg.record {
            return ReleaseStats::default();
        }
        let now = self.options.clock.now();
        let trim_due = self.trim_due(now, cfg.trim_interval);
        if changed.is_empty() && !trim_due {
            return ReleaseStats::default();
        }

        let mut live = self.live.write();
        let state = Arc::make_mut(&mut live);
        let mut stats = ReleaseStats {
            recorded: append_revisions(state, changed, now),
            ..ReleaseStats::default()
        };
        if trim_due {
            let (trimmed, dropped) = trim(state, self.started, now, cfg);
            stats.trimmed = trimmed;
            stats.timelines_dropped = dropped;
        }
        drop(live);

        if stats.recorded > 0 {
            self.options.metrics.revisions_recorded(stats.recorded);
        }
        if stats.trimmed > 0 {
            self.options.metrics.revisions_trimmed(stats.trimmed);
            info!(
                trimmed = stats.trimmed,
                timelines_dropped = stats.timelines_dropped,
                "graph.history.trimmed"
            );
        } else if trim_due {
            debug!("graph.history.noop");
        }
        stats
    }

    fn trim_due(&self, now: SystemTime, interval: Duration) -> bool {
        let mut last = self.last_trim.lock();
        let due = now
            .duration_since(*last)
            .is_ok_and(|elapsed| elapsed >= interval);
        if due {
            *last = now;
        }
        due
    }
}

/// Closes the open revision of every changed key and appends the node's
/// current state if it is still live. Returns the number of appended revisions.
pub(crate) fn append_revisions<V: Payload, M: Metadata>(
    state: &mut GraphState<V, M>,
    changed: FxHashMap<String, bool>,
    now: SystemTime,
) -> usize {
    let mut changed: Vec<(String, bool)> = changed.into_iter().collect();
    changed.sort_unstable();

    let mut appended = 0;
    for (key, data_updated) in changed {
        let node = state.nodes.get(&key);
        if node.is_none() && !state.timeline.contains_key(&key) {
            continue;
        }
        let timeline = Arc::make_mut(state.timeline.entry(key).or_default());
        if let Some(last) = timeline.last_mut() {
            if last.until.is_none() {
                Arc::make_mut(last).until = Some(now);
            }
        }
        if let Some(node) = node {
            let fields = metadata_fields(&state.indices, node);
            timeline.push(Arc::new(RecordedNode::capture(
                node,
                fields,
                now,
                !data_updated,
            )));
            appended += 1;
        }
    }
    appended
}

/// Drops closed revisions older than the retention window, keeping those that
/// started within the permanent initial period. Returns the number of removed
/// revisions and of timelines that became empty.
pub(crate) fn trim<V: Payload, M>(
    state: &mut GraphState<V, M>,
    started: SystemTime,
    now: SystemTime,
    cfg: &HistoryCfg,
) -> (usize, usize) {
    let permanent_until = started.checked_add(cfg.permanent_init_period);
    let horizon = now.checked_sub(cfg.retention);
    let keep = |record: &Arc<RecordedNode<V>>| {
        permanent_until.map_or(true, |until| record.since < until)
            || match (record.until, horizon) {
                (None, _) | (_, None) => true,
                (Some(until), Some(horizon)) => until >= horizon,
            }
    };

    let mut removed = 0;
    let mut dropped = 0;
    state.timeline.retain(|_, timeline| {
        let stale = timeline.iter().filter(|&record| !keep(record)).count();
        if stale > 0 {
            Arc::make_mut(timeline).retain(|record| keep(record));
            removed += stale;
        }
        if timeline.is_empty() {
            dropped += 1;
            return false;
        }
        true
    });
    (removed, dropped)
}
