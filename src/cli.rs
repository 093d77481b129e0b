use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::history::DEFAULT_DATA_FILE;
use crate::range::TimeRange;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sample network speed, record history and show the live dashboard
    Watch(Watch),
    /// Print recorded speed history
    History(History),
    /// Delete the recorded speed history
    Clear(Clear),
}

#[derive(Parser, Clone, Debug)]
pub struct Watch {
    /// Poll interval for the byte counters, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// How often the latest sample is written to the history file, in seconds
    #[arg(long, default_value_t = 60)]
    pub save_interval_secs: u64,

    /// Days of history to keep; older points are pruned on every save
    #[arg(long, default_value_t = 7)]
    pub retention_days: u64,

    /// History file path
    #[arg(long, default_value = DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,

    /// Record samples even when both directions are at zero
    #[arg(long)]
    pub record_idle: bool,

    /// Log throughput to the console instead of drawing the dashboard
    #[arg(long)]
    pub no_tui: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct History {
    /// Time range to show
    #[arg(long, value_enum, default_value_t = RangeOpt::Last24h)]
    pub range: RangeOpt,

    /// Output format
    #[arg(long, value_enum, default_value_t = FormatOpt::Text)]
    pub format: FormatOpt,

    /// History file path
    #[arg(long, default_value = DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,
}

#[derive(Parser, Clone, Debug)]
pub struct Clear {
    /// History file path
    #[arg(long, default_value = DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RangeOpt {
    /// Last 24 hours
    #[value(name = "24h")]
    Last24h,
    /// Last 7 days
    #[value(name = "7d")]
    Last7d,
}

impl From<RangeOpt> for TimeRange {
    fn from(v: RangeOpt) -> Self {
        match v {
            RangeOpt::Last24h => TimeRange::Last24h,
            RangeOpt::Last7d => TimeRange::Last7d,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum FormatOpt {
    Text,
    Json,
}
