use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use fleetmon::commands;

fn main() -> Result<()> {
    fleetmon::init_logging();

    let matches = Command::new("fleetmon")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live health tree for a managed server fleet")
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .short_alias('V')
                .long("version")
                .help("Print version information")
                .action(ArgAction::SetTrue)
        )
        .subcommand(
            Command::new("run")
                .about("Monitor a fleet continuously, following changes to its inventory file")
                .arg(
                    Arg::new("inventory")
                        .short('i')
                        .long("inventory")
                        .value_name("FILE")
                        .help("Fleet inventory JSON file")
                        .required(true)
                )
                .arg(
                    Arg::new("duration")
                        .short('d')
                        .long("duration")
                        .value_name("SECS")
                        .help("Stop after this many seconds (default: until Ctrl-C)")
                        .value_parser(clap::value_parser!(u64))
                )
                .arg(
                    Arg::new("interval")
                        .long("interval")
                        .value_name("SECS")
                        .help("Override the configured check interval")
                        .value_parser(clap::value_parser!(u64))
                )
        )
        .subcommand(
            Command::new("tree")
                .about("Check every service once and print the fleet tree")
                .arg(
                    Arg::new("inventory")
                        .short('i')
                        .long("inventory")
                        .value_name("FILE")
                        .help("Fleet inventory JSON file")
                        .required(true)
                )
                .arg(
                    Arg::new("state-dirs")
                        .long("state-dirs")
                        .help("Show the state directory of every node")
                        .action(ArgAction::SetTrue)
                )
        )
        .subcommand(
            Command::new("config")
                .about("Inspect or initialise the configuration (use 'fleetmon config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("path").about("Print the configuration file path"))
                .subcommand(
                    Command::new("init")
                        .about("Write a default configuration file")
                        .arg(
                            Arg::new("force")
                                .short('f')
                                .long("force")
                                .help("Overwrite an existing file")
                                .action(ArgAction::SetTrue)
                        )
                )
        )
        .get_matches();

    if matches.get_flag("version") {
        println!("fleetmon version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    match matches.subcommand() {
        Some(("run", sub_matches)) => commands::run(sub_matches)?,
        Some(("tree", sub_matches)) => commands::tree(sub_matches)?,
        Some(("config", sub_matches)) => commands::config(sub_matches)?,
        _ => {
            println!("Welcome to fleetmon!");
            println!("Use 'fleetmon --help' for more information.");
        }
    }

    Ok(())
}
