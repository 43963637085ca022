use std::fmt::Write;

use crate::storage::index::MetadataFields;
use crate::storage::node::{NodeMap, NodeRecord};
use crate::storage::types::{Metadata, Payload};

use super::IndexMap;

const WIDTH: usize = 118;

pub(crate) fn render<V: Payload, M: Metadata>(nodes: &NodeMap<V, M>, indices: &IndexMap<M>) -> String {
    let mut keys: Vec<&String> = nodes.keys().collect();
    keys.sort_unstable();

    let thick = format!("+{}+\n", "=".repeat(WIDTH));
    let thin = format!("+{}+\n", "-".repeat(WIDTH));
    let mut out = String::new();
    out.push_str(&thick);
    line(&mut out, "GRAPH DUMP", &format!("{} nodes", keys.len()));
    out.push_str(&thick);

    for (idx, key) in keys.iter().enumerate() {
        let node = &nodes[key.as_str()];
        line(&mut out, "Key:", &format!("{key:?}"));
        if node.label != node.key {
            line(&mut out, "Label:", &node.label);
        }
        let value = node
            .value
            .as_ref()
            .map_or_else(|| "<NONE>".to_owned(), |value| format!("{value:?}"));
        line(&mut out, "Value:", &value);
        line(&mut out, "Flags:", &flags(node));
        if !node.targets.is_empty() {
            line(&mut out, "Targets:", &node.targets.to_string());
        }
        if !node.sources.is_empty() {
            line(&mut out, "Sources:", &node.sources.to_string());
        }
        let fields = metadata_fields(indices, node);
        if !fields.is_empty() {
            line(&mut out, "Metadata:", &format!("{fields:?}"));
        }
        if idx + 1 != keys.len() {
            out.push_str(&thin);
        }
    }
    out.push_str(&thin);
    out
}

/// Fields the bound index reports for the node, empty if unbound.
pub(crate) fn metadata_fields<V, M>(indices: &IndexMap<M>, node: &NodeRecord<V, M>) -> MetadataFields {
    match (&node.metadata_map, &node.metadata_label) {
        (Some(map), Some(label)) => indices
            .get(map)
            .map(|index| index.list_fields(label))
            .unwrap_or_default(),
        _ => MetadataFields::new(),
    }
}

fn flags<V, M>(node: &NodeRecord<V, M>) -> String {
    if node.flags.is_empty() {
        return "<NONE>".to_owned();
    }
    node.flags
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn line(out: &mut String, name: &str, value: &str) {
    let pad = WIDTH.saturating_sub(name.len() + 3);
    let _ = writeln!(out, "| {name} {value:>pad$} |");
}
