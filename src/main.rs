mod cli;
mod commands;
mod config;
mod controllers;
mod error;
mod journal;
mod notify;
mod paths;
mod progress;
mod prompt;
mod rollback;
mod runner;
mod server_context;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match dispatch(&ctx, cli.command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            ui::error(&format!("{e:#}"));
            std::process::exit(1);
        }
    }
}

/// Run one command; `Ok(false)` means it already reported its failure.
fn dispatch(ctx: &Context, command: Command) -> Result<bool> {
    match command {
        Command::Align(args) => commands::align::run(ctx, args).map(|()| true),
        Command::Rollback(args) => commands::rollback::run(ctx, args).map(|()| true),
        Command::Backup => {
            let mut reporter = ui::TerminalReporter::new(ctx.verbose > 0);
            commands::backup::run(&mut reporter).map(|()| true)
        }
        Command::History => commands::history::run().map(|()| true),
        Command::Server(args) => commands::server::run(args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "sharp", &mut io::stdout());
            Ok(true)
        }
    }
}
