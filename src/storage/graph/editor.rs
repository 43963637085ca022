use crate::storage::edge::RelationTargetDef;
use crate::storage::flags::Flag;
use crate::storage::node::{NodeRecord, NodeRef};
use crate::storage::types::{Metadata, Payload};

use super::shadow::{Dirty, Shadow};

/// Mutable access to one node inside a [`super::GraphWriter`].
///
/// Changes land in the writer's shadow and become visible to readers on the
/// next commit. Every setter returns the editor for chaining.
pub struct NodeEditor<'w, V: Payload, M: Metadata> {
    shadow: &'w mut Shadow<V, M>,
    key: String,
}

impl<'w, V: Payload, M: Metadata> NodeEditor<'w, V, M> {
    /// Callers guarantee that `key` exists in `shadow`.
    pub(crate) fn new(shadow: &'w mut Shadow<V, M>, key: &str) -> Self {
        debug_assert!(shadow.nodes.contains_key(key), "editor for missing node");
        Self {
            shadow,
            key: key.to_owned(),
        }
    }

    /// Key of the edited node.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current (uncommitted) state of the node.
    pub fn view(&self) -> NodeRef<'_, V, M> {
        let record = &self.shadow.nodes[self.key.as_str()];
        NodeRef::new(record, &self.shadow.nodes)
    }

    /// Sets the label under which metadata is indexed.
    pub fn set_label(&mut self, label: impl Into<String>) -> &mut Self {
        let label = label.into();
        if self.current().is_some_and(|node| node.label == label) {
            return self;
        }
        self.update(|node| {
            node.label = label;
            Some(Dirty {
                data: true,
                metadata: true,
                ..Dirty::default()
            })
        })
    }

    /// Replaces the node value.
    pub fn set_value(&mut self, value: V) -> &mut Self {
        self.update(|node| {
            node.value = Some(value);
            Some(Dirty {
                data: true,
                ..Dirty::default()
            })
        })
    }

    /// Adds flags, replacing any existing flag with the same name.
    pub fn set_flags(&mut self, flags: impl IntoIterator<Item = Flag>) -> &mut Self {
        let flags: Vec<Flag> = flags.into_iter().collect();
        let unchanged = self
            .current()
            .is_some_and(|node| flags.iter().all(|flag| node.flags.contains(flag)));
        if unchanged {
            return self;
        }
        self.update(|node| {
            for flag in flags {
                match node.flags.iter_mut().find(|f| f.name() == flag.name()) {
                    Some(slot) => *slot = flag,
                    None => node.flags.push(flag),
                }
            }
            Some(Dirty {
                data: true,
                ..Dirty::default()
            })
        })
    }

    /// Removes flags by name; unknown names are ignored.
    pub fn del_flags<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        let present = self.current().is_some_and(|node| {
            names
                .iter()
                .any(|name| node.flags.iter().any(|f| f.name() == name.as_ref()))
        });
        if !present {
            return self;
        }
        self.update(|node| {
            node.flags
                .retain(|flag| !names.iter().any(|name| flag.name() == name.as_ref()));
            Some(Dirty {
                data: true,
                ..Dirty::default()
            })
        })
    }

    /// Binds the node to the metadata index `name`.
    ///
    /// Only the first call for a node takes effect.
    pub fn set_metadata_map(&mut self, name: impl Into<String>) -> &mut Self {
        if self.current().is_some_and(|node| node.metadata_map.is_some()) {
            return self;
        }
        let name = name.into();
        self.update(|node| {
            node.metadata_map = Some(name);
            Some(Dirty {
                data: true,
                metadata: true,
                ..Dirty::default()
            })
        })
    }

    /// Attaches metadata; it is pushed to the bound index on commit.
    pub fn set_metadata(&mut self, metadata: M) -> &mut Self {
        self.update(|node| {
            node.metadata = Some(metadata);
            Some(Dirty {
                data: true,
                metadata: true,
                ..Dirty::default()
            })
        })
    }

    /// Removes the metadata; the index entry is deleted on commit.
    pub fn clear_metadata(&mut self) -> &mut Self {
        if self.current().is_some_and(|node| node.metadata.is_none()) {
            return self;
        }
        self.update(|node| {
            node.metadata = None;
            Some(Dirty {
                data: true,
                metadata: true,
                ..Dirty::default()
            })
        })
    }

    /// Replaces all target definitions and re-resolves the node's edges.
    pub fn set_targets(&mut self, defs: impl IntoIterator<Item = RelationTargetDef>) -> &mut Self {
        self.shadow
            .set_targets(&self.key, defs.into_iter().collect());
        self
    }

    /// Record as the writer currently sees it, without copying it.
    fn current(&self) -> Option<&NodeRecord<V, M>> {
        self.shadow.nodes.get(self.key.as_str()).map(|node| &**node)
    }

    /// Applies `edit` to a private copy of the record and merges the returned
    /// dirty bits. Callers skip no-op edits before calling, so the shared
    /// record is only copied for real changes.
    fn update(&mut self, edit: impl FnOnce(&mut NodeRecord<V, M>) -> Option<Dirty>) -> &mut Self {
        let Some(node) = self.shadow.node_mut(&self.key) else {
            debug_assert!(false, "editor for missing node");
            return self;
        };
        if let Some(changed) = edit(node) {
            self.shadow.mark(&self.key, |dirty| {
                dirty.data |= changed.data;
                dirty.metadata |= changed.metadata;
            });
        }
        self
    }
}
