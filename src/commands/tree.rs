//! One-shot rendering of a fleet inventory.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::path::Path;

use crate::core::config::MonitorConfig;
use crate::core::fleet::{FleetInventory, FleetSpec};
use crate::core::monitor_tree::TreeOptions;
use crate::ui::{flatten_tree, render_tree};

/// Build the tree once, run every check a single time and print it
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let inventory_path = matches
        .get_one::<String>("inventory")
        .context("Inventory path is required")?;
    let show_state_dirs = matches.get_flag("state-dirs");

    let config = MonitorConfig::load()?;
    let spec = FleetSpec::load(Path::new(inventory_path))
        .with_context(|| format!("Failed to load inventory: {}", inventory_path))?;

    let fleet = FleetInventory::new();
    fleet.apply(&spec)?;

    let tree = fleet.tree(
        spec.root_resource(),
        TreeOptions {
            probes: None,
            check_interval: config.check_interval(),
        },
    );
    tree.start().context("Failed to build monitoring tree")?;

    for node in tree.descendants() {
        if let Some(leaf) = node.as_leaf() {
            leaf.check_now();
        }
    }

    let state_dirs = config.state_dirs();
    let rows = flatten_tree(&tree.root_node(), show_state_dirs.then_some(&state_dirs));
    print!("{}", render_tree(&rows));

    println!(
        "\n{} nodes, fleet level {}",
        tree.counter().live().to_string().bold(),
        tree.level().colorize()
    );

    tree.stop();
    Ok(())
}
