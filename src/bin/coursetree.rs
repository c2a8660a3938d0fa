//! coursetree CLI Binary
//!
//! Command-line interface for browsing a remote course hierarchy.

use anyhow::Context;
use clap::Parser;
use coursetree::logging::init_logging;
use coursetree::tooling::cli::{Cli, CliContext};
use std::process;

fn run(cli: &Cli) -> anyhow::Result<String> {
    let context = CliContext::new(cli.workspace.clone(), cli.config.clone())
        .context("Error initializing configuration")?;

    let logging = cli.logging_config(&context.config().logging);
    init_logging(Some(&logging)).context("Error initializing logging")?;

    Ok(context.execute(&cli.command)?)
}

fn main() {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}
