mod cli;
mod commands;
mod config;
mod paths;
mod prompt;
mod runner;
mod signal;
mod sudo;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use playbook::Action;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
    };

    match cli.command {
        Command::Install(args) => commands::apply::run(&ctx, Action::Install, args),
        Command::Uninstall(args) => commands::apply::run(&ctx, Action::Uninstall, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "i3-xfce", &mut io::stdout());
            Ok(())
        }
    }
}
