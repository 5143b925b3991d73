mod cli;
mod error;

use std::sync::Arc;

use clap::Parser;
use secrecy::ExposeSecret;
use tracing_subscriber::EnvFilter;

use tollgate_config::Config;
use tollgate_core::Gatekeeper;
use tollgate_transport::BotClient;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let token = config.token()?;

    let client = BotClient::new(config.api_url()?, token.expose_secret())?;
    let gatekeeper = Gatekeeper::new(config.service_config(), Arc::new(client));

    for destination in config.destination_ids() {
        let registered = gatekeeper.register_destination(destination).await;
        tracing::info!(id = %registered.id, title = %registered.title, "destination registered");
    }

    gatekeeper.start().await;
    tracing::info!("tollgate running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    gatekeeper.shutdown().await;

    Ok(())
}
