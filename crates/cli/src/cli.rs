//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// AoII Gateway - predictive synchronization gateway for low-power sensor nodes
#[derive(Parser, Debug)]
#[command(
    name = "aoii-gateway",
    author,
    version,
    about = "Predictive temperature/humidity synchronization gateway",
    long_about = "Gateway side of an Age-of-Incorrect-Information sensing link.\n\n\
                  Reads reading lines from a sensor node over serial or TCP, keeps a \n\
                  mirrored predictor in sync, answers clock-sync requests and \n\
                  dispatches RX/EST event records to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "AOII_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "AOII_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the gateway
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),

    /// Replay a recorded dataset through the edge transmission policy
    Audit(AuditArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "gateway.toml", env = "AOII_CONFIG")]
    pub config: PathBuf,

    /// Override the transport with a serial device
    #[arg(long, env = "AOII_SERIAL", conflicts_with = "tcp")]
    pub serial: Option<String>,

    /// Baud rate used with --serial
    #[arg(long, default_value = "115200", env = "AOII_BAUD_RATE")]
    pub baud_rate: u32,

    /// Override the transport with a TCP serial bridge (host:port)
    #[arg(long, env = "AOII_TCP")]
    pub tcp: Option<String>,

    /// Stop after this many received readings (0 = unlimited)
    #[arg(long, default_value = "0", env = "AOII_MAX_RX")]
    pub max_rx: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "AOII_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without opening the transport
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "AOII_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "gateway.toml", env = "AOII_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "gateway.toml", env = "AOII_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink parameters
    #[arg(long)]
    pub sinks: bool,
}

/// Arguments for the `audit` command
#[derive(Parser, Debug, Clone)]
pub struct AuditArgs {
    /// Recorded dataset (CSV: Timestamp,Time_n,Temperature,Humidity)
    #[arg(short, long)]
    pub dataset: PathBuf,

    /// Audit log to write
    #[arg(short, long, default_value = "edge_audit.csv")]
    pub output: PathBuf,

    /// Baseline the edge compares each reading against
    #[arg(long, value_enum, default_value = "model")]
    pub mode: AuditMode,

    /// Configuration supplying policy, model and learning rate
    #[arg(short, long, env = "AOII_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the temperature threshold
    #[arg(long)]
    pub beta_temp: Option<f64>,

    /// Override the humidity threshold
    #[arg(long)]
    pub beta_hum: Option<f64>,

    /// Override the heartbeat tick limit
    #[arg(long)]
    pub heartbeat_ticks: Option<u32>,
}

/// Edge baseline selection
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditMode {
    /// Last transmitted reading (threshold-only compare group)
    LastSent,
    /// Edge rollout prediction
    Model,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
