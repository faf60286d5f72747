//! fhir-courier - SMART-on-FHIR batch messaging CLI
//!
//! Main entry point: initializes tracing, parses the command line and
//! dispatches to the command handlers.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fhir_courier::cli::{Cli, Commands};
use fhir_courier::commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    match cli.command {
        Commands::Send { path, out } => {
            tracing::info!("submitting messages from {}", path.display());
            commands::send::run_send(path, out).await?;
            Ok(())
        }
        Commands::Convert {
            pkcs12,
            password,
            out,
        } => {
            tracing::info!("converting {} to a private JWK", pkcs12.display());
            commands::convert::run_convert(&pkcs12, &password, out)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "fhir_courier=debug"
    } else {
        "fhir_courier=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
