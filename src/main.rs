//! Visibility - Main Entry Point

use clap::Parser;
use visibility_ml::cli::{
    cmd_evaluate, cmd_ingest, cmd_predict, cmd_run, cmd_train, cmd_transform, Cli, Commands,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visibility_ml=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Ingest { args, store } => cmd_ingest(&args, &store)?,
        Commands::Transform { args } => cmd_transform(&args)?,
        Commands::Train { args } => cmd_train(&args)?,
        Commands::Evaluate { args } => cmd_evaluate(&args)?,
        Commands::Run { args, store } => cmd_run(&args, &store)?,
        Commands::Predict { lat, lon, observation, base, fallback } => {
            cmd_predict(lat, lon, observation.as_deref(), &base, fallback).await?;
        }
    }

    Ok(())
}
