//! Metamodel CLI: the `metamodel` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            registry,
            config,
            types,
            json,
        } => commands::validate::run(registry, config, types, json),

        Commands::Members {
            registry,
            type_name,
            json,
        } => commands::members::run(registry, type_name, json),

        Commands::Facets {
            registry,
            type_name,
            config,
            json,
        } => commands::facets::run(registry, type_name, config, json),
    }
}
