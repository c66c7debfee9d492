//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// depth-annotate - Per-frame depth units annotation
#[derive(Parser, Debug)]
#[command(
    name = "depth-annotate",
    author,
    version,
    about = "Per-frame depth units annotation",
    long_about = "Attaches depth units to depth frames.\n\n\
                  Each frame takes its value from frame metadata when present, otherwise \n\
                  from the device option (cached or queried), otherwise from the configured default."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "DEPTH_ANNOTATE_VERBOSE")]
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
        env = "DEPTH_ANNOTATE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay recorded frames through the annotation pipeline
    Replay(ReplayArgs),

    /// Validate configuration file
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `replay` command
#[derive(Parser, Debug, Clone)]
pub struct ReplayArgs {
    /// Path to configuration file (TOML or JSON); built-in defaults when omitted
    #[arg(short, long, env = "DEPTH_ANNOTATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Recorded frames, one JSON object per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Value the simulated device reports for the depth units option
    #[arg(long, env = "DEPTH_ANNOTATE_OPTION_VALUE")]
    pub option_value: Option<f32>,

    /// How the device exposes the depth units option
    #[arg(long, value_enum, default_value = "auto")]
    pub option_mode: OptionMode,

    /// Shorthand for `--option-mode query-only`
    #[arg(long, conflicts_with_all = ["option_mode", "no_option"])]
    pub query_only: bool,

    /// Shorthand for `--option-mode absent`
    #[arg(long, conflicts_with = "option_mode")]
    pub no_option: bool,

    /// Simulated control round trip in milliseconds
    #[arg(long, default_value = "0")]
    pub query_latency_ms: u64,

    /// Background refresh of the cached option value in milliseconds (0 = disabled)
    #[arg(long, default_value = "0")]
    pub report_interval_ms: u64,

    /// Print annotated frames as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Metrics server port (overrides configuration, 0 = disabled)
    #[arg(long, env = "DEPTH_ANNOTATE_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

impl ReplayArgs {
    /// Option mode after applying the shorthand flags
    pub fn effective_option_mode(&self) -> OptionMode {
        if self.no_option {
            OptionMode::Absent
        } else if self.query_only {
            OptionMode::QueryOnly
        } else {
            self.option_mode
        }
    }
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// How the simulated device exposes the depth units option
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OptionMode {
    /// Option reports its value on its own; readers use the cached copy
    #[default]
    Auto,
    /// Option must be queried on every read
    QueryOnly,
    /// Device does not expose the option
    Absent,
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

impl From<LogFormat> for contracts::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
