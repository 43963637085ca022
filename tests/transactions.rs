mod common;

use keygraph::{Flag, GraphError};

use common::manual_store;

#[test]
fn reader_keeps_view_across_commits() {
    let (store, _clock) = manual_store();
    let mut writer = store.write(true).unwrap();
    writer.set_node("/a").set_value("old".to_owned());
    writer.commit();

    let before = store.read();
    writer.edit_node("/a").unwrap().set_value("new".to_owned());
    writer.set_node("/b");
    writer.commit();
    let after = store.read();
    writer.release();

    assert_eq!(before.get_node("/a").unwrap().value().unwrap(), "old");
    assert!(before.get_node("/b").is_none());
    assert_eq!(before.get_keys(), vec!["/a"]);
    assert_eq!(after.get_node("/a").unwrap().value().unwrap(), "new");
    assert_eq!(after.get_keys(), vec!["/a", "/b"]);
}

#[test]
fn uncommitted_edits_are_invisible() {
    let (store, _clock) = manual_store();
    let mut writer = store.write(false).unwrap();
    writer.set_node("/pending");
    assert!(writer.get_node("/pending").is_some());
    assert!(store.read().get_node("/pending").is_none());
    writer.release();
    assert!(store.read().get_node("/pending").is_none());
}

#[test]
fn flags_accumulate_across_commits_and_writers() {
    let (store, _clock) = manual_store();
    let mut writer = store.write(true).unwrap();
    writer
        .set_node("/n")
        .set_value("v".to_owned())
        .set_flags([Flag::named("A")]);
    writer.commit();
    writer.edit_node("/n").unwrap().set_flags([Flag::named("B")]);
    writer.commit();
    writer.release();

    let mut writer = store.write(true).unwrap();
    writer.set_node("/n").set_flags([Flag::named("C")]);
    writer.commit();
    writer.release();

    let reader = store.read();
    let node = reader.get_node("/n").unwrap();
    let names: Vec<&str> = node.flags().iter().map(|flag| flag.name()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(node.value().map(String::as_str), Some("v"));
}

#[test]
fn repeated_set_flags_records_one_revision() {
    let (store, clock) = manual_store();
    let mut writer = store.write(true).unwrap();
    writer.set_node("/n");
    writer.commit();
    writer.release();

    for _ in 0..2 {
        clock.advance(std::time::Duration::from_secs(1));
        let mut writer = store.write(true).unwrap();
        writer
            .edit_node("/n")
            .unwrap()
            .set_flags([Flag::new("state", "up")]);
        writer.commit();
        writer.release();
    }

    let reader = store.read();
    let timeline = reader.get_node_timeline("/n");
    assert_eq!(timeline.len(), 2);
    assert_eq!(timeline[1].flag("state").unwrap().value(), Some("up"));
}

#[test]
fn flag_upsert_replaces_value_and_delete_ignores_missing() {
    let (store, _clock) = manual_store();
    let mut writer = store.write(false).unwrap();
    writer
        .set_node("/n")
        .set_flags([Flag::new("color", "red"), Flag::named("keep")])
        .set_flags([Flag::new("color", "blue")])
        .del_flags(["missing", "keep"]);
    writer.commit();
    writer.release();

    let reader = store.read();
    let node = reader.get_node("/n").unwrap();
    assert_eq!(node.flags().len(), 1);
    assert_eq!(node.flag("color").unwrap().value(), Some("blue"));
    assert!(node.flag("keep").is_none());
}

#[test]
fn concurrent_writer_fails_fast() {
    let (store, _clock) = manual_store();
    let first = store.write(false).unwrap();
    let err = store.write(true).err().unwrap();
    assert!(matches!(err, GraphError::WriterActive));
    assert_eq!(err.to_string(), "a writer is already active on this graph");
    drop(first);
    store.write(true).unwrap().release();
}
