//! `webwire` command-line entry point.
//!
//! ```text
//! webwire [--config FILE] serve [--address A] [--port P]
//! webwire [--config FILE] check
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webwire::{Bootstrap, Config, ConfigError};

#[derive(Debug, Parser)]
#[command(name = "webwire", version, about = "Serve static files and routes over HTTP/1.1")]
struct Cli {
    /// Configuration file (TOML, or JSON with a `.json` extension).
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the server (default).
    Serve {
        /// Override `server.address`.
        #[arg(long)]
        address: Option<String>,

        /// Override `server.port`.
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate the configuration and print the effective settings.
    Check,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load(path),
        None => Ok(Config::default()),
    }
}

async fn serve(
    mut config: Config,
    address: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(address) = address {
        config.server.address = address;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let service = Bootstrap::new(config).bind().await?;
    info!(
        address = %service.local_addr(),
        tls = service.is_tls(),
        "accepting connections"
    );
    service.serve().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webwire=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };

    let command = cli.command.unwrap_or(Command::Serve {
        address: None,
        port: None,
    });

    match command {
        Command::Check => match config.validate().and_then(|()| config.to_toml_string()) {
            Ok(rendered) => {
                print!("{rendered}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = %e, "configuration rejected");
                ExitCode::FAILURE
            }
        },
        Command::Serve { address, port } => match serve(config, address, port).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!(error = %e, "startup failed");
                ExitCode::FAILURE
            }
        },
    }
}
