mod cli;
mod commands;
mod compress;
mod config;
mod discover;
mod error;
mod job;
mod logging;
mod report;
mod runner;
mod tools;
mod ui;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use console::Style;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Command::Convert(opts) => commands::convert(config, opts.into()).await,
        Command::Check => commands::check(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", Style::new().red().bold().apply_to("error:"));
            ExitCode::from(e.exit_code())
        }
    }
}
