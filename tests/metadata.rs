mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use keygraph::{GraphOptions, GraphStore, MemoryIndex, MetadataIndex};

#[derive(Clone, Debug, PartialEq)]
struct Interface {
    mtu: u32,
    vrf: String,
}

fn interfaces_index() -> Arc<MemoryIndex<Interface>> {
    Arc::new(MemoryIndex::with_fields("interfaces", |iface: &Interface| {
        BTreeMap::from([("vrf".to_owned(), vec![iface.vrf.clone()])])
    }))
}

fn iface(mtu: u32, vrf: &str) -> Interface {
    Interface {
        mtu,
        vrf: vrf.to_owned(),
    }
}

#[test]
fn metadata_is_synced_and_recorded_as_fields() {
    common::init_tracing();
    let store: GraphStore<String, Interface> = GraphStore::new(GraphOptions::new());
    let index = interfaces_index();

    let mut writer = store.write(true).unwrap();
    writer.register_metadata_map(index.clone());
    writer
        .set_node("/if/eth0")
        .set_label("eth0")
        .set_metadata_map("interfaces")
        .set_metadata(iface(1500, "red"));
    writer.commit();
    writer.release();

    assert_eq!(index.get("eth0"), Some(iface(1500, "red")));
    assert_eq!(index.lookup_by_field("vrf", "red"), vec!["eth0"]);

    let reader = store.read();
    let node = reader.get_node("/if/eth0").unwrap();
    assert_eq!(node.metadata(), Some(&iface(1500, "red")));
    let timeline = reader.get_node_timeline("/if/eth0");
    assert_eq!(timeline[0].metadata_fields["vrf"], vec!["red"]);
    let registered = reader.get_metadata_map("interfaces").unwrap();
    assert_eq!(registered.list_all_names(), vec!["eth0"]);
    assert!(reader.dump().contains("vrf"));
}

#[test]
fn metadata_waits_for_its_index() {
    common::init_tracing();
    let store: GraphStore<String, Interface> = GraphStore::default();
    let index = interfaces_index();

    let mut writer = store.write(false).unwrap();
    writer
        .set_node("/if/eth1")
        .set_metadata_map("interfaces")
        .set_metadata(iface(9000, "blue"));
    writer.commit();
    assert!(index.is_empty());

    writer.register_metadata_map(index.clone());
    writer
        .edit_node("/if/eth1")
        .unwrap()
        .set_metadata(iface(9000, "green"));
    writer.commit();
    writer.release();
    assert_eq!(index.get("/if/eth1"), Some(iface(9000, "green")));
}

#[test]
fn metadata_sync_compares_against_index_contents() {
    common::init_tracing();
    let store: GraphStore<String, Interface> = GraphStore::default();
    let index = interfaces_index();
    let mut writer = store.write(false).unwrap();
    writer.register_metadata_map(index.clone());
    writer
        .set_node("/if/eth2")
        .set_metadata_map("interfaces")
        .set_metadata(iface(1500, "red"));
    writer.commit();

    index.put("/if/eth2", &iface(1, "external")).unwrap();
    writer
        .edit_node("/if/eth2")
        .unwrap()
        .set_metadata(iface(1500, "red"));
    writer.commit();
    writer.release();
    assert_eq!(index.get("/if/eth2"), Some(iface(1500, "red")));

    let mut writer = store.write(false).unwrap();
    writer.delete_node("/if/eth2");
    writer.commit();
    writer.release();
    assert!(index.is_empty());
}
