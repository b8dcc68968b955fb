use anyhow::{Context, Result};
use colored::Colorize;

use crate::core::config::MonitorConfig;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("path", _)) => path(),
        Some(("init", sub_matches)) => init(sub_matches.get_flag("force")),
        _ => {
            println!("Use 'fleetmon config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let config = MonitorConfig::load()?;
    let json = serde_json::to_string_pretty(&config).context("Failed to serialize config")?;
    println!("{}", json);
    Ok(())
}

fn path() -> Result<()> {
    println!("{}", MonitorConfig::get_config_path()?.display());
    Ok(())
}

fn init(force: bool) -> Result<()> {
    let config_path = MonitorConfig::get_config_path()?;

    if config_path.exists() && !force {
        println!(
            "{} {}",
            "Config already exists:".yellow(),
            config_path.display()
        );
        println!("{}", "Use --force to overwrite it with defaults.".dimmed());
        return Ok(());
    }

    MonitorConfig::default().save_to(&config_path)?;
    println!(
        "{} {}",
        "✓ Config written to".green(),
        config_path.display()
    );
    Ok(())
}
