use std::collections::BTreeMap;
use std::time::SystemTime;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::edge::TargetsByRelation;
use super::flags::{find_flag, Flag};
use super::node::NodeRecord;
use super::types::{Metadata, Payload};

/// Immutable snapshot of one node revision.
#[derive(Clone, Debug, Serialize)]
pub struct RecordedNode<V> {
    /// Time the revision became current.
    pub since: SystemTime,
    /// Time the revision was superseded; `None` while it is current.
    pub until: Option<SystemTime>,
    /// Node key.
    pub key: String,
    /// Node label at `since`.
    pub label: String,
    /// Value as transformed by [`Payload::record`].
    pub value: Option<V>,
    /// Flags at `since`.
    #[serde(serialize_with = "serialize_flags")]
    pub flags: Vec<Flag>,
    /// Secondary fields reported by the metadata index.
    pub metadata_fields: BTreeMap<String, Vec<String>>,
    /// Edge targets at `since`.
    pub targets: TargetsByRelation,
    /// True if only edge membership changed since the previous revision.
    pub target_update_only: bool,
}

impl<V: Payload> RecordedNode<V> {
    pub(crate) fn capture<M: Metadata>(
        node: &NodeRecord<V, M>,
        metadata_fields: BTreeMap<String, Vec<String>>,
        since: SystemTime,
        target_update_only: bool,
    ) -> Self {
        Self {
            since,
            until: None,
            key: node.key.clone(),
            label: node.label.clone(),
            value: node.value.as_ref().map(Payload::record),
            flags: node.flags.to_vec(),
            metadata_fields,
            targets: node.targets.clone(),
            target_update_only,
        }
    }
}

impl<V> RecordedNode<V> {
    /// Returns the flag named `name` as it was recorded.
    pub fn flag(&self, name: &str) -> Option<&Flag> {
        find_flag(&self.flags, name)
    }

    /// Returns true if `at` falls into `[since, until)`; an open interval
    /// extends to the present.
    pub fn valid_at(&self, at: SystemTime) -> bool {
        self.since <= at && self.until.map_or(true, |until| at < until)
    }

    /// Returns true while this revision is the current one.
    pub fn is_open(&self) -> bool {
        self.until.is_none()
    }
}

fn serialize_flags<S: Serializer>(flags: &[Flag], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(flags.len()))?;
    for flag in flags {
        map.serialize_entry(flag.name(), flag.value().unwrap_or(""))?;
    }
    map.end()
}

/// Usage summary of one flag across recorded revisions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FlagStats {
    /// Number of revisions carrying the flag.
    pub total: u64,
    /// Revisions per flag value; valueless flags count under `""`.
    pub per_value: BTreeMap<String, u64>,
}

impl FlagStats {
    pub(crate) fn count(&mut self, flag: &Flag) {
        self.total += 1;
        *self
            .per_value
            .entry(flag.value().unwrap_or_default().to_owned())
            .or_insert(0) += 1;
    }
}
