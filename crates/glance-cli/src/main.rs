//! glance - browser-driven verification for dashboards.
//!
//! Parses arguments, sets up logging and colors, dispatches the command and
//! maps the result to an exit code: 0 passed, 1 failed, 2 fatal.

use clap::Parser;
use glance_cli::{cli, commands, error, logger, ui};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors(args.no_color);

    let result = match args.command {
        cli::Command::Run(run_args) => commands::run_execute(run_args).await,
        cli::Command::List => commands::list_execute(),
        cli::Command::Show(show_args) => commands::show_execute(show_args),
    };

    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            // miette's Debug output is the rendered diagnostic
            eprintln!("{:?}", error::cli_error_to_miette(err));
            ExitCode::from(commands::EXIT_FATAL)
        }
    }
}
