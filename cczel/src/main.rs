//! cczel - incremental build orchestrator for C and C++ trees

mod commands;

use clap::Parser;
use commands::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "cczel=debug" } else { "cczel=info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = commands::load_config(&cli.config)?;

    match cli.command.unwrap_or(Commands::Build {
        jobs: None,
        strict_link: false,
    }) {
        Commands::Build { jobs, strict_link } => {
            if !commands::build::execute(config, jobs, strict_link).await? {
                std::process::exit(1);
            }
        }
        Commands::Status => commands::status::execute(&config)?,
        Commands::Deps { path } => commands::deps::execute(&config, &path)?,
        Commands::Clean => commands::clean::execute(&config)?,
    }

    Ok(())
}
