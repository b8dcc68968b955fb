// Stress tests: concurrent reshaping, level updates and shutdown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fleetmon::core::monitor_tree::Inventory;
use fleetmon::AlertLevel;

use super::support::{
    assert_levels_consistent, descriptors, keys_of, nested_fleet, record, wait_until,
};

const ROUNDS: usize = 200;

fn shapes() -> Vec<Vec<&'static str>> {
    vec![
        vec!["a", "b", "c"],
        vec!["c"],
        vec!["b", "a"],
        vec![],
        vec!["a", "b", "c", "d", "e"],
        vec!["e", "a"],
    ]
}

fn reshape(inventory: Arc<Inventory>, offset: usize) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let shapes = shapes();
        for round in 0..ROUNDS {
            let shape = &shapes[(round + offset) % shapes.len()];
            inventory.replace(descriptors(shape)).unwrap();
        }
    })
}

/// Runs `work` on a helper thread and fails instead of hanging on deadlock
fn finishes_within<F>(timeout: Duration, work: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    let done = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&done);
    thread::spawn(move || {
        work();
        flag.store(true, Ordering::SeqCst);
    });
    wait_until(timeout, || done.load(Ordering::SeqCst))
}

#[test]
fn test_sibling_containers_reshape_concurrently() {
    let fleet = Arc::new(nested_fleet(&[("h1", &["a"]), ("h2", &["a"])]));
    fleet.tree.start().unwrap();

    let in_work = Arc::clone(&fleet);
    let finished = finishes_within(Duration::from_secs(60), move || {
        let stop = Arc::new(AtomicBool::new(false));

        // Leaf updates race against the structural changes
        let recorder = {
            let fleet = Arc::clone(&in_work);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut n = 0usize;
                while !stop.load(Ordering::SeqCst) {
                    for host in fleet.tree.root().children() {
                        for leaf in host.children() {
                            record(&leaf, AlertLevel::ALL[n % AlertLevel::ALL.len()]);
                            n += 1;
                        }
                    }
                }
            })
        };

        let writers = vec![
            reshape(Arc::clone(&in_work.services["h1"]), 0),
            reshape(Arc::clone(&in_work.services["h2"]), 3),
        ];
        for writer in writers {
            writer.join().unwrap();
        }
        stop.store(true, Ordering::SeqCst);
        recorder.join().unwrap();
    });
    assert!(finished, "reshaping did not finish; possible deadlock");

    fleet.services["h1"].replace(descriptors(&["x", "y"])).unwrap();
    fleet.services["h2"].replace(descriptors(&["z"])).unwrap();

    let hosts = fleet.tree.root().children();
    assert_eq!(keys_of(&hosts[0].children()), vec!["x", "y"]);
    assert_eq!(keys_of(&hosts[1].children()), vec!["z"]);
    assert_eq!(fleet.tree.counter().live(), 5);

    record(&hosts[0].children()[1], AlertLevel::Medium);
    assert_levels_consistent(&fleet.tree.root_node());
    assert_eq!(fleet.tree.level(), AlertLevel::Medium);

    fleet.tree.stop();
    assert_eq!(fleet.tree.counter().live(), 0);
}

#[test]
fn test_concurrent_writers_on_one_container_converge() {
    let fleet = Arc::new(nested_fleet(&[("h1", &[])]));
    fleet.tree.start().unwrap();

    let in_work = Arc::clone(&fleet);
    let finished = finishes_within(Duration::from_secs(60), move || {
        let writers: Vec<_> = (0..4)
            .map(|offset| reshape(Arc::clone(&in_work.services["h1"]), offset))
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
    });
    assert!(finished, "writers did not finish; possible deadlock");

    // Whatever the last write was, the children must mirror it
    let expected: Vec<String> = fleet.services["h1"]
        .items()
        .iter()
        .map(|item| item.key.to_string())
        .collect();
    let host = fleet.tree.root().children()[0].clone();
    assert_eq!(keys_of(&host.children()), expected);
    assert_eq!(fleet.tree.counter().live(), 1 + expected.len() as u64);

    fleet.tree.stop();
}

#[test]
fn test_stop_during_reshaping() {
    let fleet = Arc::new(nested_fleet(&[("h1", &["a"]), ("h2", &["b"])]));
    fleet.tree.start().unwrap();

    let in_work = Arc::clone(&fleet);
    let finished = finishes_within(Duration::from_secs(60), move || {
        let writers = vec![
            reshape(Arc::clone(&in_work.services["h1"]), 1),
            reshape(Arc::clone(&in_work.services["h2"]), 2),
        ];
        thread::sleep(Duration::from_millis(2));
        in_work.tree.stop();
        for writer in writers {
            writer.join().unwrap();
        }
    });
    assert!(finished, "stop did not finish; possible deadlock");

    assert_eq!(fleet.tree.root().child_count(), 0);
    assert_eq!(fleet.tree.counter().live(), 0);
    assert_eq!(fleet.tree.level(), AlertLevel::None);
    for services in fleet.services.values() {
        assert_eq!(services.subscriber_count(), 0);
    }
}
