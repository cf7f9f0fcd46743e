use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gitfit::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over the level picked from the flags
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Compress(args) => {
            let code = cli::compress_command(&cli.config, args).await?;
            Ok(ExitCode::from(code))
        }
        Command::Serve(args) => {
            info!("Starting gitfit v{}", env!("CARGO_PKG_VERSION"));
            cli::serve_command(&cli.config, args).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
