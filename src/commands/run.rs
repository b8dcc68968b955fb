//! Continuous monitoring of a fleet inventory file.
//!
//! Probes run on the worker runtime while this loop reloads the inventory
//! file when it changes and redraws the tree whenever it looks different.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::core::alert_level::AlertLevel;
use crate::core::config::MonitorConfig;
use crate::core::fleet::{FleetInventory, FleetSpec};
use crate::core::monitor_tree::{TreeOptions, WorkerRuntime};
use crate::ui::{flatten_tree, render_tree};

const REFRESH_INTERVAL: Duration = Duration::from_millis(250);

/// Execute the run command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let inventory_path = matches
        .get_one::<String>("inventory")
        .context("Inventory path is required")?;
    let duration = matches
        .get_one::<u64>("duration")
        .copied()
        .map(Duration::from_secs);

    let mut config = MonitorConfig::load()?;
    if let Some(&interval) = matches.get_one::<u64>("interval") {
        config.check_interval_secs = interval;
    }

    let path = Path::new(inventory_path);
    let spec = FleetSpec::load(path)
        .with_context(|| format!("Failed to load inventory: {}", inventory_path))?;

    let runtime = WorkerRuntime::new(config.probe_threads)?;
    let fleet = FleetInventory::new();
    fleet.apply(&spec)?;

    let tree = fleet.tree(
        spec.root_resource(),
        TreeOptions {
            probes: Some(runtime.handle()),
            check_interval: config.check_interval(),
        },
    );
    tree.start().context("Failed to start monitoring tree")?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .context("Failed to install Ctrl-C handler")?;
    }

    let started = Instant::now();
    let mut last_reload = Instant::now();
    let mut last_modified = modified_at(path);
    let mut last_render = String::new();
    let mut last_level: Option<AlertLevel> = None;

    while running.load(Ordering::SeqCst) {
        if duration.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }

        if last_reload.elapsed() >= config.reload_interval() {
            last_reload = Instant::now();
            let modified = modified_at(path);
            if modified != last_modified {
                last_modified = modified;
                reload(&fleet, path);
            }
        }

        let rendered = render_tree(&flatten_tree(&tree.root_node(), None));
        if rendered != last_render {
            println!(
                "{} {} nodes",
                chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
                tree.counter().live()
            );
            print!("{}", rendered);
            last_render = rendered;
        }

        let level = tree.level();
        if last_level != Some(level) {
            if level.meets(config.notify_threshold) {
                log::warn!("Fleet level raised to {}", level);
                println!("{} fleet level is {}", "ALERT".red().bold(), level.colorize());
            }
            last_level = Some(level);
        }

        thread::sleep(REFRESH_INTERVAL);
    }

    tree.stop();
    runtime.shutdown();
    Ok(())
}

/// Re-read the inventory; a bad file keeps the previous fleet.
fn reload(fleet: &FleetInventory, path: &Path) {
    match FleetSpec::load(path) {
        Ok(spec) => match fleet.apply(&spec) {
            Ok(()) => log::info!("Reloaded inventory {:?}", path),
            Err(e) => log::warn!("Inventory {:?} applied with errors: {}", path, e),
        },
        Err(e) => log::warn!("Keeping previous inventory, {:?} is unreadable: {}", path, e),
    }
}

fn modified_at(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
