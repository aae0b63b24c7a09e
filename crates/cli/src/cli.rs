//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use contracts::DistanceUnits;
use std::path::PathBuf;

/// Kinefeed - buffered, throttled motion sensor fusion
#[derive(Parser, Debug)]
#[command(
    name = "kinefeed",
    author,
    version,
    about = "Replay recorded motion sensor feeds through the fusion engine",
    long_about = "Buffers acceleration, orientation, location and heading readings,\n\
                  averages and throttles them per channel, and fuses them into\n\
                  attitude, earth-frame acceleration and travel direction."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "KINEFEED_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "KINEFEED_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay recorded channels through the fusion engine
    Replay(ReplayArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `replay` command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "kinefeed.toml",
        env = "KINEFEED_CONFIG"
    )]
    pub config: PathBuf,

    /// Recording directory (overrides `replay.directory`)
    #[arg(long, env = "KINEFEED_REPLAY_DIR")]
    pub dir: Option<PathBuf>,

    /// Replay speed multiplier (overrides `replay.speed`)
    #[arg(long, env = "KINEFEED_REPLAY_SPEED")]
    pub speed: Option<f64>,

    /// Distance units for display readings (overrides `session.distance_units`)
    #[arg(long, value_name = "miles|kilometers")]
    pub units: Option<DistanceUnits>,

    /// Write every fused snapshot as a JSON line to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Stop after this many seconds (0 = run until the recordings end)
    #[arg(long, default_value = "0", env = "KINEFEED_TIMEOUT")]
    pub timeout: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "KINEFEED_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "kinefeed.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "kinefeed.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
