mod cli;
mod config;
mod error;
mod model;
mod monitor;
mod providers;
mod reconcile;
mod report;
mod snapshot;
mod sync;
mod util;

use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    match cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
