#![allow(dead_code)]

use std::sync::{Arc, Once};

use keygraph::primitives::clock::ManualClock;
use keygraph::{GraphOptions, GraphStore, HistoryCfg};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("keygraph=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init();
    });
}

/// Store with default history policy driven by a manual clock.
pub fn manual_store() -> (GraphStore<String>, Arc<ManualClock>) {
    manual_store_with(HistoryCfg::default())
}

pub fn manual_store_with(history: HistoryCfg) -> (GraphStore<String>, Arc<ManualClock>) {
    init_tracing();
    let clock = Arc::new(ManualClock::default());
    let options = GraphOptions::new().history(history).clock(clock.clone());
    (GraphStore::new(options), clock)
}
