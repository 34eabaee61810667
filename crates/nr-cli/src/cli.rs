//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Live reward tracker for game chat logs.
///
/// Follows a combat log, totals rewards between session markers and reports
/// how fast they are coming in.
#[derive(Debug, Parser)]
#[command(name = "nr", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Follow a log file and show rewards as they arrive.
    Watch {
        /// Log file to follow. Defaults to `log_path` from the config.
        path: Option<PathBuf>,

        /// Do not save a summary when a session ends.
        #[arg(long)]
        no_save: bool,
    },

    /// Total the rewards in a log file once, without following it.
    Summarize {
        /// Log file to read.
        path: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Save a summary for every finished session, as `watch` would.
        #[arg(long)]
        save: bool,
    },

    /// Build a CSV report from saved session summaries.
    Report {
        /// Directory holding the summaries. Defaults to `save_dir`.
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Reward to report on. Defaults to `rate_field`.
        #[arg(short, long)]
        field: Option<String>,

        /// Write the CSV here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Hours played per day, used for the PD, PW and PM columns.
        #[arg(long)]
        per_day: Option<f64>,
    },
}
