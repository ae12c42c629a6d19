//! Command line interface definition.

use std::path::PathBuf;

use cephlite_crush::PgId;
use clap::{Args, Parser, Subcommand};

/// Cephlite: deterministic placement of placement groups onto devices.
#[derive(Parser)]
#[command(name = "cephlite")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    ///
    /// The built-in four-device reference topology is used when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text, json).
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Compute the devices for one placement group.
    Place(PlaceArgs),
    /// Hash an object name to its placement group and place it.
    Object(ObjectArgs),
    /// Map a range of placement groups and report the per-device spread.
    Map(MapArgs),
    /// Print a summary of the loaded topology.
    Show,
    /// Print version information.
    Version,
}

/// Arguments for the place command.
#[derive(Args)]
pub struct PlaceArgs {
    /// Placement group ID.
    #[arg(long)]
    pub pg: PgId,

    /// Rule to apply (overrides config).
    #[arg(short, long)]
    pub rule: Option<String>,
}

/// Arguments for the object command.
#[derive(Args)]
pub struct ObjectArgs {
    /// Pool the object belongs to.
    #[arg(long)]
    pub pool: String,

    /// Object name.
    #[arg(long)]
    pub object: String,

    /// Rule to apply (overrides config).
    #[arg(short, long)]
    pub rule: Option<String>,

    /// Number of placement groups in the pool (overrides config).
    #[arg(long)]
    pub pg_count: Option<PgId>,
}

/// Arguments for the map command.
#[derive(Args)]
pub struct MapArgs {
    /// Rule to apply (overrides config).
    #[arg(short, long)]
    pub rule: Option<String>,

    /// Map placement groups `0..pgs` (defaults to the configured count).
    #[arg(long)]
    pub pgs: Option<PgId>,
}

/// Output format for CLI commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
