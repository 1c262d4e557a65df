//! Tests for scheme files and device reports

use devicegraph::prelude::*;
use devicegraph::SchemeCodec;
use std::path::PathBuf;

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("data")
}

fn wired_workspace() -> (Workspace, Vec<String>) {
    let mut ws = Workspace::open(Settings::default().with_data_dir(fixture_dir()));
    let battery = ws.add_node("sources", "battery", Position::new(10, 20)).unwrap();
    let and = ws.add_node("gates", "g1", Position::new(-30, 45)).unwrap();
    let not = ws.add_node("gates", "g3", Position::new(200, 0)).unwrap();
    let and2 = ws.add_node("gates", "g1", Position::new(0, 0)).unwrap();
    ws.bind(Endpoint::new(battery.clone(), 0), Endpoint::new(and.clone(), 1)).unwrap();
    ws.bind(Endpoint::new(not.clone(), 0), Endpoint::new(and2.clone(), 0)).unwrap();
    (ws, vec![battery, and, not, and2])
}

#[test]
fn test_scheme_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let (ws, ids) = wired_workspace();

    let saved = ws.save_scheme(&dir.path().join("board")).expect("Should save");
    assert_eq!(saved.extension().and_then(|e| e.to_str()), Some("sch"));

    let mut restored = Workspace::open(Settings::default().with_data_dir(fixture_dir()));
    restored.load_scheme(&dir.path().join("board")).expect("Should load");

    assert_eq!(restored.graph(), ws.graph());
    assert_eq!(restored.graph().links().len(), 2);
    assert_eq!(restored.graph().node(&ids[1]).unwrap().position, Position::new(-30, 45));
    assert_eq!(restored.tick().states, ws.tick().states);
}

#[test]
fn test_failed_load_keeps_current_graph() {
    let dir = tempfile::tempdir().unwrap();
    let (mut ws, _) = wired_workspace();
    let before = ws.graph().clone();

    let bytes = SchemeCodec::save(ws.graph()).unwrap();
    let broken = dir.path().join("broken.sch");
    std::fs::write(&broken, &bytes[..bytes.len() - 3]).unwrap();

    let err = ws.load_scheme(&broken).unwrap_err();
    assert!(matches!(err, DeviceGraphError::Scheme(_)));
    assert_eq!(ws.graph(), &before);

    assert!(ws.load_scheme(&dir.path().join("missing.sch")).is_err());
    assert_eq!(ws.graph(), &before);
}

#[test]
fn test_load_resets_dangling_connections() {
    let (ws, ids) = wired_workspace();
    let bytes = SchemeCodec::save(ws.graph()).unwrap();

    // Drop the link table entries but keep the inputs pointing at them.
    let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    value[1] = serde_json::json!({});
    let tampered = serde_json::to_vec(&value).unwrap();

    let graph = SchemeCodec::load(&tampered).expect("Consistency problems are repaired, not fatal");
    assert!(graph.links().is_empty());
    for id in &ids {
        let node = graph.node(id).unwrap();
        assert!(node.inputs().iter().all(|i| !i.is_connected()));
    }
}

#[test]
fn test_report_counts_instances() {
    let dir = tempfile::tempdir().unwrap();
    let (ws, _) = wired_workspace();

    let path = ws.write_report(&dir.path().join("devices")).unwrap();
    assert_eq!(path.extension().and_then(|e| e.to_str()), Some("txt"));

    let text = std::fs::read_to_string(path).unwrap();
    assert_eq!(text.matches("//============ Device #").count(), 3);
    assert!(text.contains("Items: 2\nDevice name: AND\n"));
    assert!(text.contains("Items: 1\nDevice name: NOT\n"));
    assert!(text.contains("Items: 1\nDevice name: Battery\n"));
}
