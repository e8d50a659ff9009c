//! Tideline migration CLI
//!
//! Runs the sample migrations bundled from the workspace `migrations/`
//! directory. Applications build their own binary around
//! [`tideline_cli::run`] with their own catalog.

use clap::Parser;
use colored::Colorize;
use std::process;
use tideline_cli::{init_logging, run, Cli};

#[path = "../../migrations/mod.rs"]
mod migrations;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let catalog = migrations::catalog();
    match run(&cli, &catalog) {
        Ok(true) => process::exit(0),
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            process::exit(1);
        }
    }
}
