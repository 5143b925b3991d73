//! Daemon error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Exit codes for process termination.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(
        code(tollgate::config),
        help(
            "Check the config file (default: ~/.config/tollgate/tollgate.toml)\n\
             and TOLLGATE_* environment variables."
        )
    )]
    Config(#[from] tollgate_config::ConfigError),

    #[error("Bot API connection failed: {0}")]
    #[diagnostic(
        code(tollgate::connection),
        help("Check the api_url setting and network reachability.")
    )]
    Transport(#[from] tollgate_transport::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_code::CONFIG,
            Self::Transport(_) => exit_code::CONNECTION,
            Self::Io(_) => exit_code::GENERAL,
        }
    }
}
