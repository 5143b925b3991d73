//! Command-line interface for the tollgate daemon.

use std::path::PathBuf;

use clap::Parser;

/// Timed, payment-gated access to private chat groups.
#[derive(Debug, Parser)]
#[command(name = "tollgate", version, about)]
pub struct Cli {
    /// Path to the config file (default: platform config dir).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
