use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::keyset::KeySet;
use super::types::KeySelector;

/// How a target definition picks its target nodes.
#[derive(Clone)]
pub enum TargetSpec {
    /// Exactly one expected key. Resolved with a direct lookup.
    Key(String),
    /// Every other node whose key satisfies the predicate. Resolved by
    /// scanning all nodes.
    Selector(KeySelector),
}

impl fmt::Debug for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetSpec::Key(key) => f.debug_tuple("Key").field(key).finish(),
            TargetSpec::Selector(_) => f.write_str("Selector(..)"),
        }
    }
}

/// Definition of one labeled edge (or edge family) leaving a node.
#[derive(Clone, Debug)]
pub struct RelationTargetDef {
    /// Relation name.
    pub relation: String,
    /// Label, unique for a given (source node, relation).
    pub label: String,
    /// Target key or selector.
    pub target: TargetSpec,
}

impl RelationTargetDef {
    /// Edge towards the node with the given key.
    pub fn key(
        relation: impl Into<String>,
        label: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            relation: relation.into(),
            label: label.into(),
            target: TargetSpec::Key(key.into()),
        }
    }

    /// Edges towards every node whose key satisfies `selector`.
    pub fn selector<F>(relation: impl Into<String>, label: impl Into<String>, selector: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            relation: relation.into(),
            label: label.into(),
            target: TargetSpec::Selector(Arc::new(selector)),
        }
    }

    /// Literal target key, if this definition is not selector-based.
    pub fn expected_key(&self) -> Option<&str> {
        match &self.target {
            TargetSpec::Key(key) => Some(key),
            TargetSpec::Selector(_) => None,
        }
    }

    /// Returns true if this definition selects `key`.
    pub fn selects(&self, key: &str) -> bool {
        match &self.target {
            TargetSpec::Key(expected) => expected == key,
            TargetSpec::Selector(selector) => selector(key),
        }
    }
}

/// Targets of one relation sharing the same label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Targets {
    /// Edge label.
    pub label: String,
    /// Literal key from the definition, `None` for selector-based labels.
    pub expected_key: Option<String>,
    /// Keys of the nodes currently matched.
    pub matching: KeySet,
}

/// All targets of a single relation, grouped by label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RelationTargets {
    /// Relation name.
    pub relation: String,
    /// Targets per label, in definition order.
    pub targets: Vec<Targets>,
}

impl RelationTargets {
    /// Returns the targets stored under `label`.
    pub fn for_label(&self, label: &str) -> Option<&Targets> {
        self.targets.iter().find(|targets| targets.label == label)
    }
}

/// Every target of a node, grouped by relation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TargetsByRelation(Vec<RelationTargets>);

impl TargetsByRelation {
    /// Returns the targets of `relation`.
    pub fn for_relation(&self, relation: &str) -> Option<&RelationTargets> {
        self.0.iter().find(|rel| rel.relation == relation)
    }

    /// Iterates relations in the order they were first defined.
    pub fn iter(&self) -> impl Iterator<Item = &RelationTargets> + '_ {
        self.0.iter()
    }

    /// Number of relations with at least one label.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no relation is defined.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `key` is a target under (relation, label).
    pub(crate) fn contains(&self, relation: &str, label: &str, key: &str) -> bool {
        self.for_relation(relation)
            .and_then(|rel| rel.for_label(label))
            .is_some_and(|targets| targets.matching.contains(key))
    }

    /// Returns true if `key` is a target under any relation and label.
    pub(crate) fn contains_anywhere(&self, key: &str) -> bool {
        self.0
            .iter()
            .flat_map(|rel| rel.targets.iter())
            .any(|targets| targets.matching.contains(key))
    }

    /// Returns the entry for (relation, label), creating it if missing.
    pub(crate) fn entry(
        &mut self,
        relation: &str,
        label: &str,
        expected_key: Option<&str>,
    ) -> &mut Targets {
        let rel_idx = match self.0.iter().position(|rel| rel.relation == relation) {
            Some(idx) => idx,
            None => {
                self.0.push(RelationTargets {
                    relation: relation.to_owned(),
                    targets: Vec::new(),
                });
                self.0.len() - 1
            }
        };
        let rel = &mut self.0[rel_idx];
        let label_idx = match rel.targets.iter().position(|t| t.label == label) {
            Some(idx) => idx,
            None => {
                rel.targets.push(Targets {
                    label: label.to_owned(),
                    expected_key: None,
                    matching: KeySet::new(),
                });
                rel.targets.len() - 1
            }
        };
        let targets = &mut rel.targets[label_idx];
        targets.expected_key = expected_key.map(str::to_owned);
        targets
    }

    /// Returns true if `key` is a target of `relation` under any label.
    pub(crate) fn reaches(&self, relation: &str, key: &str) -> bool {
        self.for_relation(relation).is_some_and(|rel| {
            rel.targets
                .iter()
                .any(|targets| targets.matching.contains(key))
        })
    }

    /// Distinct (relation, target key) pairs.
    pub(crate) fn edges(&self) -> Vec<(String, String)> {
        let mut edges = Vec::new();
        for rel in &self.0 {
            let keys: KeySet = rel
                .targets
                .iter()
                .flat_map(|targets| targets.matching.iter())
                .collect();
            edges.extend(keys.iter().map(|key| (rel.relation.clone(), key.to_owned())));
        }
        edges
    }

    pub(crate) fn relations_mut(&mut self) -> &mut Vec<RelationTargets> {
        &mut self.0
    }

    /// Removes `key` from every label of every relation.
    pub(crate) fn remove_everywhere(&mut self, key: &str) -> bool {
        let mut changed = false;
        for rel in &mut self.0 {
            for targets in &mut rel.targets {
                changed |= targets.matching.remove(key);
            }
        }
        changed
    }
}

impl fmt::Display for TargetsByRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<NONE>");
        }
        for (idx, rel) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "[{}]{{", rel.relation)?;
            for (label_idx, targets) in rel.targets.iter().enumerate() {
                if label_idx > 0 {
                    f.write_str(", ")?;
                }
                if targets.matching.len() == 1 && targets.matching.contains(&targets.label) {
                    f.write_str(&targets.label)?;
                } else {
                    write!(f, "{} -> {}", targets.label, targets.matching)?;
                }
            }
            f.write_str("}")?;
        }
        Ok(())
    }
}

/// Keys of nodes pointing at this node under one relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RelationSources {
    pub(crate) relation: String,
    pub(crate) sources: KeySet,
}

/// Reverse edge index of a node, grouped by relation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct SourcesByRelation(Vec<RelationSources>);

impl SourcesByRelation {
    pub(crate) fn for_relation(&self, relation: &str) -> Option<&KeySet> {
        self.0
            .iter()
            .find(|rel| rel.relation == relation)
            .map(|rel| &rel.sources)
    }

    pub(crate) fn contains(&self, relation: &str, key: &str) -> bool {
        self.for_relation(relation)
            .is_some_and(|sources| sources.contains(key))
    }

    pub(crate) fn insert(&mut self, relation: &str, key: &str) -> bool {
        match self.0.iter_mut().find(|rel| rel.relation == relation) {
            Some(rel) => rel.sources.insert(key),
            None => {
                let mut sources = KeySet::new();
                sources.insert(key);
                self.0.push(RelationSources {
                    relation: relation.to_owned(),
                    sources,
                });
                true
            }
        }
    }

    pub(crate) fn remove(&mut self, relation: &str, key: &str) -> bool {
        let Some(idx) = self.0.iter().position(|rel| rel.relation == relation) else {
            return false;
        };
        let changed = self.0[idx].sources.remove(key);
        if self.0[idx].sources.is_empty() {
            self.0.remove(idx);
        }
        changed
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &KeySet)> + '_ {
        self.0
            .iter()
            .map(|rel| (rel.relation.as_str(), &rel.sources))
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SourcesByRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<NONE>");
        }
        for (idx, rel) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            write!(f, "[{}]{}", rel.relation, rel.sources)?;
        }
        Ok(())
    }
}
