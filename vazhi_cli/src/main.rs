use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};
use commands::*;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose > 0 {
        "vazhi_cli=debug,vazhi_core=debug"
    } else {
        "vazhi_cli=info,vazhi_core=warn"
    };

    // Logs go to stderr so json/yaml on stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::Ask { query } => ask::run(&cli, query).await,
        Commands::Retrieve { query } => retrieve::run(&cli, query).await,
        Commands::Multilingual { query } => multilingual::run(&cli, query).await,
        Commands::Digest { topic } => digest::run(&cli, topic).await,
        Commands::FactCheck { statement } => fact_check::run(&cli, statement).await,
        Commands::Papers { query, count } => papers::run(&cli, query, *count).await,
        Commands::Bindings => bindings::run(&cli).await,
        Commands::Config { action } => config::run(&cli, action.clone()).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}
