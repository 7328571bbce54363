mod cache;
mod case_study;
mod cli;
mod commands;
mod extension;
mod history;
mod paper_config;
mod release;
mod report;
mod results;
mod revision;
mod sampling;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Extend(args) => commands::extend::run(args),
        Commands::Status(args) => commands::status::run(args),
        Commands::Table(args) => commands::table::run(args),
        Commands::Cleanup(args) => commands::cleanup::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
