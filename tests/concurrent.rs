mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use keygraph::{GraphError, GraphStore};

const READERS: usize = 4;
const COMMITS: usize = 200;

#[test]
fn readers_never_observe_partial_commits() {
    common::init_tracing();
    let store: GraphStore<String> = GraphStore::default();
    {
        let mut writer = store.write(false).unwrap();
        writer.set_node("/x").set_value("0".to_owned());
        writer.set_node("/y").set_value("0".to_owned());
        writer.commit();
        writer.release();
    }

    let barrier = Arc::new(Barrier::new(READERS + 1));
    let done = Arc::new(AtomicBool::new(false));
    let mut handles = Vec::new();
    for _ in 0..READERS {
        let store = store.clone();
        let barrier = Arc::clone(&barrier);
        let done = Arc::clone(&done);
        handles.push(thread::spawn(move || {
            barrier.wait();
            let mut last = 0usize;
            let mut reads = 0usize;
            while !done.load(Ordering::Acquire) || reads == 0 {
                let reader = store.read();
                let x = reader.get_node("/x").unwrap().value().unwrap().clone();
                let y = reader.get_node("/y").unwrap().value().unwrap().clone();
                assert_eq!(x, y, "reader saw a half-applied commit");
                let seen: usize = x.parse().unwrap();
                assert!(seen >= last, "reader went back in time");
                last = seen;
                reads += 1;
                reader.release();
            }
            last
        }));
    }

    barrier.wait();
    let mut writer = store.write(false).unwrap();
    for round in 1..=COMMITS {
        let value = round.to_string();
        writer.edit_node("/x").unwrap().set_value(value.clone());
        writer.edit_node("/y").unwrap().set_value(value);
        writer.commit();
    }
    writer.release();
    done.store(true, Ordering::Release);

    for handle in handles {
        let last = handle.join().unwrap();
        assert!(last <= COMMITS);
    }
    assert_eq!(store.lock_snapshot().readers, 0);
    store.read().verify_edges().unwrap();
}

#[test]
fn only_one_thread_obtains_the_writer() {
    common::init_tracing();
    let store: GraphStore<String> = GraphStore::default();
    let threads = 8;
    let start = Arc::new(Barrier::new(threads));
    let hold = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let store = store.clone();
            let start = Arc::clone(&start);
            let hold = Arc::clone(&hold);
            thread::spawn(move || {
                start.wait();
                let outcome = store.write(false);
                let won = match &outcome {
                    Ok(_) => true,
                    Err(GraphError::WriterActive) => false,
                    Err(other) => panic!("unexpected error: {other}"),
                };
                hold.wait();
                drop(outcome);
                won
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert!(!store.lock_snapshot().writer);
}

#[test]
fn old_reader_survives_many_commits() {
    common::init_tracing();
    let store: GraphStore<String> = GraphStore::default();
    let mut writer = store.write(false).unwrap();
    writer.set_node("/seed");
    writer.commit();
    let pinned = store.read();

    let handle = {
        let store = store.clone();
        thread::spawn(move || {
            let reader = store.read();
            reader.get_keys().len()
        })
    };
    for idx in 0..50 {
        writer.set_node(&format!("/n/{idx:02}"));
        writer.commit();
    }
    writer.release();
    assert!(handle.join().unwrap() >= 1);

    assert_eq!(pinned.get_keys(), vec!["/seed"]);
    assert_eq!(store.read().get_keys().len(), 51);
}
