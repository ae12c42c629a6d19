//! Cephlite: deterministic placement of placement groups onto devices.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cephlite_crush::Placement;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
mod commands;
mod config;

use cli::{Cli, Commands};
use config::{Config, LogFormat};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = cli.command {
        println!("cephlite {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = load_config(&cli.config)?;
    init_logging(&config)?;

    let topology = config.build_topology().context("Failed to build topology")?;
    debug!(
        devices = topology.device_count(),
        buckets = topology.bucket_count(),
        rules = topology.rule_count(),
        "Topology loaded"
    );

    let placement = Placement::new(topology, config.placement.rule.clone());

    match cli.command {
        Commands::Place(args) => commands::handle_place(&placement, &config, args, cli.format),
        Commands::Object(args) => commands::handle_object(&placement, &config, args, cli.format),
        Commands::Map(args) => commands::handle_map(&placement, &config, args, cli.format),
        Commands::Show => commands::handle_show(placement.topology(), cli.format),
        Commands::Version => Ok(()),
    }
}

fn load_config(path: &Option<PathBuf>) -> Result<Config> {
    Config::load(path.as_deref()).context("Failed to load configuration")
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    // Results go to stdout, so logs must not.
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::registry().with(filter).with(fmt_layer.json()).init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
    }

    Ok(())
}
