use std::io::Write;
use std::time::Duration;

use keygraph::{GraphError, GraphOptions, GraphStore, HistoryCfg};
use tempfile::NamedTempFile;

#[test]
fn options_load_from_toml_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[history]\nrecord = true\nage_limit_minutes = 30\npermanent_init_minutes = 0\ntrim_interval_secs = 10"
    )
    .unwrap();

    let options = GraphOptions::load(file.path()).unwrap();
    assert_eq!(
        options.history,
        HistoryCfg {
            record: true,
            retention: Duration::from_secs(30 * 60),
            permanent_init_period: Duration::ZERO,
            trim_interval: Duration::from_secs(10),
        }
    );
    let store: GraphStore<String> = GraphStore::new(options);
    assert_eq!(store.options().history.trim_interval, Duration::from_secs(10));
}

#[test]
fn disabled_history_from_file_records_nothing() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[history]\nrecord = false").unwrap();
    let store: GraphStore<String> = GraphStore::new(GraphOptions::load(file.path()).unwrap());

    let mut writer = store.write(true).unwrap();
    writer.set_node("/a");
    writer.commit();
    writer.release();
    assert!(store.read().get_node("/a").is_some());
    assert!(store.read().get_node_timeline("/a").is_empty());
}

#[test]
fn missing_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    let err = GraphOptions::load(&path).unwrap_err();
    match err {
        GraphError::ConfigRead { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_file_is_a_parse_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[history\nrecord = ").unwrap();
    assert!(matches!(
        GraphOptions::load(file.path()),
        Err(GraphError::ConfigParse { .. })
    ));

    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[history]\nage_limit_minutes = \"soon\"").unwrap();
    assert!(matches!(
        GraphOptions::load(file.path()),
        Err(GraphError::ConfigParse { .. })
    ));
}
