// Integration tests for child reconciliation against a live inventory

use std::sync::atomic::Ordering;
use std::sync::Arc;

use fleetmon::core::monitor_tree::{Inventory, Lifecycle, ResourceDescriptor, ResourceKey};
use fleetmon::{AlertLevel, FleetError};

use super::support::{descriptors, keys_of, manual_tree, record, LeafFactory};

#[test]
fn test_empty_to_two_children() {
    let inventory = Arc::new(Inventory::new());
    let tree = manual_tree(Arc::clone(&inventory), LeafFactory::new());
    tree.start().unwrap();
    assert_eq!(tree.root().child_count(), 0);
    assert_eq!(tree.level(), AlertLevel::None);

    inventory.replace(descriptors(&["a", "b"])).unwrap();

    let children = tree.root().children();
    assert_eq!(keys_of(&children), vec!["a", "b"]);
    assert_eq!(tree.counter().added(), 2);
    assert_eq!(tree.counter().removed(), 0);

    record(&children[0], AlertLevel::Low);
    record(&children[1], AlertLevel::High);
    assert_eq!(tree.level(), AlertLevel::High);

    tree.stop();
}

#[test]
fn test_tail_removal_recomputes_level() {
    let inventory = Arc::new(Inventory::with_items(descriptors(&["a", "b"])));
    let tree = manual_tree(Arc::clone(&inventory), LeafFactory::new());
    tree.start().unwrap();

    let children = tree.root().children();
    record(&children[0], AlertLevel::Medium);
    record(&children[1], AlertLevel::Critical);
    assert_eq!(tree.level(), AlertLevel::Critical);

    inventory.remove(&ResourceKey::new("b")).unwrap();

    assert_eq!(keys_of(&tree.root().children()), vec!["a"]);
    assert_eq!(tree.counter().removed(), 1);
    assert_eq!(tree.level(), AlertLevel::Medium);
    assert_eq!(children[1].lifecycle(), Lifecycle::Stopped);
    assert_eq!(children[0].lifecycle(), Lifecycle::Started);

    tree.stop();
}

#[test]
fn test_rename_replaces_node_at_same_position() {
    let inventory = Arc::new(Inventory::with_items(vec![
        ResourceDescriptor::named("a", "x"),
        ResourceDescriptor::new("b"),
    ]));
    let tree = manual_tree(Arc::clone(&inventory), LeafFactory::new());
    tree.start().unwrap();
    let before = tree.root().children();

    inventory
        .rename(&ResourceKey::new("a"), Some("y".to_string()))
        .unwrap();

    let after = tree.root().children();
    assert_eq!(keys_of(&after), vec!["a", "b"]);
    assert_eq!(after[0].label(), "y");
    assert!(!after[0].same_node(&before[0]));
    assert!(after[1].same_node(&before[1]));
    assert_eq!(before[0].lifecycle(), Lifecycle::Stopped);

    // One removal and one addition on top of the initial two
    assert_eq!(tree.counter().added(), 3);
    assert_eq!(tree.counter().removed(), 1);
    assert_eq!(tree.counter().live(), 2);

    tree.stop();
}

#[test]
fn test_unchanged_snapshot_is_idempotent() {
    let inventory = Arc::new(Inventory::with_items(descriptors(&["a", "b", "c"])));
    let factory = LeafFactory::new();
    let tree = manual_tree(Arc::clone(&inventory), factory.clone());
    tree.start().unwrap();
    let before = tree.root().children();

    let first = tree.root().reconcile().unwrap();
    let second = tree.root().reconcile().unwrap();

    assert!(first.is_noop());
    assert!(second.is_noop());
    assert_eq!(factory.created.load(Ordering::SeqCst), 3);

    let after = tree.root().children();
    for (old, new) in before.iter().zip(after.iter()) {
        assert!(old.same_node(new));
    }

    tree.stop();
}

#[test]
fn test_append_preserves_existing_nodes() {
    let inventory = Arc::new(Inventory::with_items(descriptors(&["a"])));
    let tree = manual_tree(Arc::clone(&inventory), LeafFactory::new());
    tree.start().unwrap();
    let first = tree.root().children()[0].clone();
    record(&first, AlertLevel::Low);

    inventory.push(ResourceDescriptor::new("b")).unwrap();

    let children = tree.root().children();
    assert!(children[0].same_node(&first));
    assert_eq!(children[0].current_level(), AlertLevel::Low);
    assert_eq!(keys_of(&children), vec!["a", "b"]);

    tree.stop();
}

#[test]
fn test_children_follow_snapshot_order() {
    let inventory = Arc::new(Inventory::new());
    let tree = manual_tree(Arc::clone(&inventory), LeafFactory::new());
    tree.start().unwrap();

    let sequences: Vec<Vec<&str>> = vec![
        vec!["a", "b", "c"],
        vec!["b", "c"],
        vec!["c", "b", "a"],
        vec!["a", "c", "d", "e"],
        vec!["e"],
        vec![],
        vec!["x", "y"],
        vec!["y", "x", "y"],
    ];

    for sequence in sequences {
        inventory.replace(descriptors(&sequence)).unwrap();
        assert_eq!(keys_of(&tree.root().children()), sequence);
        assert_eq!(tree.counter().live(), sequence.len() as u64);
    }

    tree.stop();
    assert_eq!(tree.counter().live(), 0);
}

#[test]
fn test_swap_recreates_moved_node() {
    let inventory = Arc::new(Inventory::with_items(descriptors(&["a", "b"])));
    let tree = manual_tree(Arc::clone(&inventory), LeafFactory::new());
    tree.start().unwrap();
    let before = tree.root().children();

    inventory.replace(descriptors(&["b", "a"])).unwrap();

    let after = tree.root().children();
    assert_eq!(keys_of(&after), vec!["b", "a"]);
    assert!(!after[0].same_node(&before[1]));
    assert!(after[1].same_node(&before[0]));
    assert_eq!(tree.counter().added(), 3);
    assert_eq!(tree.counter().removed(), 1);

    tree.stop();
}

#[test]
fn test_fetch_failure_keeps_previous_children() {
    let inventory = Arc::new(Inventory::with_items(descriptors(&["a"])));
    let tree = manual_tree(Arc::clone(&inventory), LeafFactory::new());
    tree.start().unwrap();
    let before = tree.root().children();

    inventory.set_reachable(false).unwrap();
    let err = tree.root().reconcile().unwrap_err();
    assert!(matches!(err, FleetError::Fetch(_)));

    // Notification-driven passes swallow the fetch error and keep the list
    inventory.push(ResourceDescriptor::new("b")).unwrap();
    let during = tree.root().children();
    assert_eq!(keys_of(&during), vec!["a"]);
    assert!(during[0].same_node(&before[0]));

    inventory.set_reachable(true).unwrap();
    assert_eq!(keys_of(&tree.root().children()), vec!["a", "b"]);

    tree.stop();
}

#[test]
fn test_start_with_unreachable_source_fills_in_later() {
    let inventory = Arc::new(Inventory::with_items(descriptors(&["a", "b"])));
    inventory.set_reachable(false).unwrap();
    let tree = manual_tree(Arc::clone(&inventory), LeafFactory::new());

    tree.start().unwrap();
    assert_eq!(tree.root().core().lifecycle(), Lifecycle::Started);
    assert_eq!(tree.root().child_count(), 0);
    assert_eq!(inventory.subscriber_count(), 1);

    inventory.set_reachable(true).unwrap();
    assert_eq!(keys_of(&tree.root().children()), vec!["a", "b"]);
    assert_eq!(tree.counter().added(), 2);

    tree.stop();
}

#[test]
fn test_child_start_failure_keeps_applied_removals() {
    let inventory = Arc::new(Inventory::with_items(descriptors(&["old", "a"])));
    let factory = LeafFactory::new();
    let tree = manual_tree(Arc::clone(&inventory), factory.clone());
    tree.start().unwrap();

    factory.refuse("b");
    let err = inventory
        .replace(descriptors(&["a", "b", "c"]))
        .unwrap_err();

    match err {
        FleetError::ChildStart { key, .. } => assert_eq!(key.as_str(), "b"),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(keys_of(&tree.root().children()), vec!["a"]);
    assert_eq!(tree.counter().removed(), 1);
    assert_eq!(tree.counter().live(), 1);

    // Not retried until the next change
    factory.accept_all();
    assert_eq!(keys_of(&tree.root().children()), vec!["a"]);

    inventory.push(ResourceDescriptor::new("d")).unwrap();
    assert_eq!(keys_of(&tree.root().children()), vec!["a", "b", "c", "d"]);
    assert_eq!(tree.counter().live(), 4);

    tree.stop();
}
