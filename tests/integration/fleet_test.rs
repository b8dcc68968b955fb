// End-to-end tests over a fleet inventory file

use std::fs;
use std::path::Path;

use fleetmon::core::fleet::{FleetInventory, FleetSpec};
use fleetmon::core::monitor_tree::{StateDirs, TreeOptions};
use fleetmon::ui::{flatten_tree, render_tree};
use fleetmon::AlertLevel;
use tempfile::TempDir;

use super::support::{assert_levels_consistent, keys_of};

const FLEET: &str = r#"{
    "name": "Production",
    "hosts": [
        {
            "id": "web1",
            "name": "Web 1",
            "services": [
                {"id": "http", "level": "low"},
                {"id": "smtp", "name": "Mail", "level": "high", "detail": "listed on 1 blacklist"}
            ]
        },
        {
            "id": "db1",
            "services": [
                {"id": "pg", "fail": true, "detail": "connection refused"}
            ]
        }
    ]
}"#;

fn write_fleet(dir: &Path, contents: &str) -> FleetSpec {
    let path = dir.join("fleet.json");
    fs::write(&path, contents).unwrap();
    FleetSpec::load(&path).unwrap()
}

fn check_all(tree: &fleetmon::core::monitor_tree::MonitorTree) {
    for node in tree.descendants() {
        if let Some(leaf) = node.as_leaf() {
            leaf.check_now();
        }
    }
}

#[test]
fn test_fleet_file_builds_tree() {
    let dir = TempDir::new().unwrap();
    let spec = write_fleet(dir.path(), FLEET);

    let fleet = FleetInventory::new();
    fleet.apply(&spec).unwrap();
    let tree = fleet.tree(spec.root_resource(), TreeOptions::default());
    tree.start().unwrap();
    check_all(&tree);

    let hosts = tree.root().children();
    assert_eq!(keys_of(&hosts), vec!["web1", "db1"]);
    assert_eq!(hosts[0].label(), "Web 1");
    assert_eq!(keys_of(&hosts[0].children()), vec!["http", "smtp"]);
    assert_eq!(hosts[0].current_level(), AlertLevel::High);

    // A failing check degrades to Unknown, which dominates everything else
    let pg = hosts[1].children()[0].clone();
    assert_eq!(pg.current_level(), AlertLevel::Unknown);
    assert!(pg.detail().unwrap_or_default().contains("connection refused"));
    assert_eq!(tree.level(), AlertLevel::Unknown);
    assert_levels_consistent(&tree.root_node());

    tree.stop();
    assert_eq!(tree.counter().live(), 0);
}

#[test]
fn test_reapplied_file_reshapes_running_tree() {
    let dir = TempDir::new().unwrap();
    let spec = write_fleet(dir.path(), FLEET);

    let fleet = FleetInventory::new();
    fleet.apply(&spec).unwrap();
    let tree = fleet.tree(spec.root_resource(), TreeOptions::default());
    tree.start().unwrap();
    check_all(&tree);
    let http_before = tree.root().children()[0].children()[0].clone();

    let updated = write_fleet(
        dir.path(),
        r#"{
            "hosts": [
                {
                    "id": "web1",
                    "name": "Web 1",
                    "services": [
                        {"id": "http", "level": "low"},
                        {"id": "smtp", "name": "Outbound mail", "level": "none"},
                        {"id": "imap", "level": "medium"}
                    ]
                }
            ]
        }"#,
    );
    fleet.apply(&updated).unwrap();

    let hosts = tree.root().children();
    assert_eq!(keys_of(&hosts), vec!["web1"]);
    let services = hosts[0].children();
    assert_eq!(keys_of(&services), vec!["http", "smtp", "imap"]);
    assert!(services[0].same_node(&http_before));
    assert_eq!(services[1].label(), "Outbound mail");

    // db1 is gone, smtp was rebuilt unchecked and imap is new
    assert_eq!(tree.level(), AlertLevel::Low);
    check_all(&tree);
    assert_eq!(tree.level(), AlertLevel::Medium);
    assert_eq!(tree.counter().live(), 4);

    tree.stop();
}

#[test]
fn test_render_lists_every_node() {
    colored::control::set_override(false);
    let dir = TempDir::new().unwrap();
    let spec = write_fleet(dir.path(), FLEET);

    let fleet = FleetInventory::new();
    fleet.apply(&spec).unwrap();
    let tree = fleet.tree(spec.root_resource(), TreeOptions::default());
    tree.start().unwrap();
    check_all(&tree);

    let state_dirs = StateDirs::new(dir.path().join("state"));
    let rows = flatten_tree(&tree.root_node(), Some(&state_dirs));
    assert_eq!(rows.len(), 6);
    assert_eq!(rows[0].depth, 0);
    assert!(rows.iter().all(|row| row.state_dir.is_some()));

    let out = render_tree(&rows);
    assert!(out.starts_with("Production [UNKNOWN]"));
    assert!(out.contains("├─Web 1 [HIGH] (web1)"));
    assert!(out.contains("Mail [HIGH] (smtp) - listed on 1 blacklist"));
    assert!(out.contains("└─db1 [UNKNOWN]"));

    tree.stop();
}

#[test]
fn test_invalid_fleet_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fleet.json");

    fs::write(&path, r#"{"hosts":[{"id":"a"},{"id":"a"}]}"#).unwrap();
    assert!(FleetSpec::load(&path).is_err());

    fs::write(&path, "not json").unwrap();
    assert!(FleetSpec::load(&path).is_err());

    assert!(FleetSpec::load(&dir.path().join("missing.json")).is_err());
}
