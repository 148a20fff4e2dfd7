//! buildline CLI - resolve build settings into compiler command lines

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("buildline=debug")
    } else {
        EnvFilter::new("buildline=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args),
        Commands::Command(args) => commands::command::execute(args),
        Commands::OutputName(args) => commands::output_name::execute(args),
        Commands::Toolchain(args) => commands::toolchain::execute(args),
    }
}
