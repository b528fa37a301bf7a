use crate::generator::workflow::launch;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod generator;
mod llm;
mod memory;
mod types;
mod web;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let topic = args.topic.clone();
    let config = args.into_config()?;

    let default_level = if config.verbose {
        "deep_research_rs=debug"
    } else {
        "deep_research_rs=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    launch(&config, &topic).await
}
