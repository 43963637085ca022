mod common;

use keygraph::{Flag, FlagSelector, GraphStore, Metadata, NodeRef, Payload, RelationTargetDef};

use common::manual_store;

fn populated() -> GraphStore<String> {
    let (store, _clock) = manual_store();
    let mut writer = store.write(false).unwrap();
    writer
        .set_node("/vpp/if/loop0")
        .set_flags([Flag::new("state", "up"), Flag::named("derived")]);
    writer
        .set_node("/vpp/if/eth0")
        .set_flags([Flag::new("state", "down")]);
    writer.set_node("/vpp/route/1").set_flags([Flag::named("derived")]);
    writer.set_node("/linux/if/tap0");
    writer.commit();
    writer.release();
    store
}

fn keys<V: Payload, M: Metadata>(nodes: Vec<NodeRef<'_, V, M>>) -> Vec<String> {
    nodes.iter().map(|node| node.key().to_owned()).collect()
}

#[test]
fn key_selector_and_flag_selectors_are_anded() {
    let store = populated();
    let reader = store.read();
    let vpp = |key: &str| key.starts_with("/vpp/");

    assert_eq!(
        keys(reader.get_nodes(Some(&vpp), &[])),
        vec!["/vpp/if/eth0", "/vpp/if/loop0", "/vpp/route/1"]
    );
    assert_eq!(
        keys(reader.get_nodes(
            Some(&vpp),
            &[FlagSelector::with([Flag::named("derived")])]
        )),
        vec!["/vpp/if/loop0", "/vpp/route/1"]
    );
    assert_eq!(
        keys(reader.get_nodes(
            None,
            &[
                FlagSelector::with([Flag::named("state")]),
                FlagSelector::without([Flag::new("state", "down")]),
            ]
        )),
        vec!["/vpp/if/loop0"]
    );
}

#[test]
fn with_requires_every_flag_and_wildcard_matches_any_value() {
    let store = populated();
    let reader = store.read();
    let both = FlagSelector::with([Flag::named("state"), Flag::named("derived")]);
    assert_eq!(keys(reader.get_nodes(None, &[both])), vec!["/vpp/if/loop0"]);

    let wrong_value = FlagSelector::with([Flag::new("state", "unknown")]);
    assert!(reader.get_nodes(None, &[wrong_value]).is_empty());

    let stateless = FlagSelector::without([Flag::named("state")]);
    assert_eq!(
        keys(reader.get_nodes(None, &[stateless])),
        vec!["/linux/if/tap0", "/vpp/route/1"]
    );
}

#[test]
fn selector_targets_follow_node_set() {
    let store = populated();
    let mut writer = store.write(false).unwrap();
    writer.set_node("/bridge").set_targets([RelationTargetDef::selector(
        "member",
        "interfaces",
        |key| key.contains("/if/"),
    )]);
    writer.commit();
    {
        let reader = store.read();
        let bridge = reader.get_node("/bridge").unwrap();
        let members = bridge.targets("member");
        let found: Vec<&str> = members
            .for_label("interfaces")
            .unwrap()
            .nodes
            .iter()
            .map(|node| node.key())
            .collect();
        assert_eq!(found, vec!["/linux/if/tap0", "/vpp/if/eth0", "/vpp/if/loop0"]);
        let eth0 = reader.get_node("/vpp/if/eth0").unwrap();
        assert!(eth0.source_keys("member").unwrap().contains("/bridge"));
        reader.verify_edges().unwrap();
    }

    writer.delete_node("/vpp/if/eth0");
    writer.set_node("/vpp/if/eth1");
    writer.commit();
    writer.release();

    let reader = store.read();
    let bridge = reader.get_node("/bridge").unwrap();
    let matching = &bridge
        .target_keys("member")
        .unwrap()
        .for_label("interfaces")
        .unwrap()
        .matching;
    assert_eq!(
        matching.iter().collect::<Vec<_>>(),
        vec!["/linux/if/tap0", "/vpp/if/eth1", "/vpp/if/loop0"]
    );
    assert_eq!(matching.to_string(), "{/linux/if/tap0, /vpp/if/eth1, /vpp/if/loop0}");
    reader.verify_edges().unwrap();
}

#[test]
fn always_false_selector_yields_empty_label() {
    let store = populated();
    let mut writer = store.write(false).unwrap();
    writer
        .set_node("/lonely")
        .set_targets([RelationTargetDef::selector("r", "none", |_| false)]);
    writer.commit();
    writer.release();

    let reader = store.read();
    let node = reader.get_node("/lonely").unwrap();
    let targets = node.target_keys("r").unwrap().for_label("none").unwrap();
    assert!(targets.matching.is_empty());
    assert!(targets.expected_key.is_none());
    assert_eq!(node.target_defs().len(), 1);
}
