mod cli;
mod counters;
mod history;
mod metrics;
#[cfg(test)]
mod mock;
mod range;
mod sampler;
mod state;
mod ui;
mod units;
mod watch;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, FormatOpt};
use crate::history::{HistoryStore, StoreError, DEFAULT_RETENTION};
use crate::range::{filter_recent, TimeRange};
use crate::units::{format_speed, format_timestamp};
use crate::watch::run_watch;

fn print_history(args: cli::History) -> Result<()> {
    let store = HistoryStore::new(&args.data_file, DEFAULT_RETENTION);
    let all = store.load()?;
    let shown = filter_recent(&all, TimeRange::from(args.range));

    match args.format {
        FormatOpt::Text => {
            if shown.is_empty() {
                eprintln!("<no data in range>");
                return Ok(());
            }
            for point in &shown {
                println!(
                    "{}  down {:>12}  up {:>12}",
                    format_timestamp(point.timestamp),
                    format_speed(point.download),
                    format_speed(point.upload),
                );
            }
        }
        FormatOpt::Json => {
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
    }
    Ok(())
}

fn clear_history(args: cli::Clear) -> Result<()> {
    let store = HistoryStore::new(&args.data_file, DEFAULT_RETENTION);
    store.clear()?;
    println!("Network speed history cleared.");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let result: Result<()> = match cli.command {
        Some(Commands::Watch(args)) => run_watch(args),
        Some(Commands::History(args)) => print_history(args),
        Some(Commands::Clear(args)) => clear_history(args),
        None => {
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(err) = result {
        // Map to stable exit codes
        let code = exit_code_for_error(&err);
        eprintln!("error: {err:?}");
        std::process::exit(code);
    }
}

pub(crate) fn exit_code_for_error(err: &anyhow::Error) -> i32 {
    // 2: corrupt history file, 4: history I/O failure, 1: other
    for cause in err.chain() {
        if let Some(store) = cause.downcast_ref::<StoreError>() {
            return match store {
                StoreError::Corrupt { .. } => 2,
                StoreError::Io { .. } => 4,
                StoreError::Encode(_) => 1,
            };
        }
    }
    1
}
