use std::sync::Arc;
use std::time::Duration;

use fleetmon::core::monitor_tree::{Inventory, ResourceKey};
use fleetmon::{AlertLevel, MonitorConfig};
use tempfile::TempDir;

use super::support::{descriptors, manual_tree, LeafFactory};

#[test]
fn test_config_default() {
    let config = MonitorConfig::default();
    assert_eq!(config.check_interval(), Duration::from_secs(30));
    assert_eq!(config.reload_interval(), Duration::from_secs(5));
    assert_eq!(config.notify_threshold, AlertLevel::High);
    assert!(config.state_dir.is_none());
}

#[test]
fn test_zero_intervals_are_clamped() {
    let config = MonitorConfig {
        check_interval_secs: 0,
        reload_interval_secs: 0,
        ..Default::default()
    };
    assert_eq!(config.check_interval(), Duration::from_secs(1));
    assert_eq!(config.reload_interval(), Duration::from_secs(1));
}

#[test]
fn test_notify_threshold() {
    let config = MonitorConfig {
        notify_threshold: AlertLevel::Medium,
        ..Default::default()
    };
    assert!(!AlertLevel::Low.meets(config.notify_threshold));
    assert!(AlertLevel::Medium.meets(config.notify_threshold));
    assert!(AlertLevel::Unknown.meets(config.notify_threshold));
}

#[test]
fn test_state_dirs_follow_tree_path() {
    let temp_dir = TempDir::new().unwrap();
    let config = MonitorConfig {
        state_dir: Some(temp_dir.path().to_string_lossy().to_string()),
        ..Default::default()
    };
    let state_dirs = config.state_dirs();
    assert_eq!(state_dirs.base(), temp_dir.path());

    let inventory = Arc::new(Inventory::with_items(descriptors(&["web/1"])));
    let tree = manual_tree(inventory, LeafFactory::new());
    tree.start().unwrap();

    let leaf = tree.root().children()[0].clone();
    let expected =
        state_dirs.dir_for_path(&[ResourceKey::new("root"), ResourceKey::new("web/1")]);
    assert_eq!(state_dirs.node_dir(&leaf), expected);
    // Keys never escape the base directory
    assert_eq!(expected.parent().unwrap().parent().unwrap(), temp_dir.path());

    tree.stop();
}

#[test]
fn test_saved_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("fleetmon").join("config.json");

    let config = MonitorConfig {
        probe_threads: 4,
        notify_threshold: AlertLevel::Critical,
        ..Default::default()
    };
    config.save_to(&path).unwrap();

    let loaded = MonitorConfig::load_from(&path).unwrap();
    assert_eq!(loaded.probe_threads, 4);
    assert_eq!(loaded, config);
}
