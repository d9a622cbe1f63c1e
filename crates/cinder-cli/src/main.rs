//! Cinder CI CLI entrypoint.

use clap::Parser;

mod commands;
mod config;
mod handlers;

use commands::{Commands, ConfigCommands};
use config::CliConfig;

#[derive(Parser)]
#[command(name = "cinder")]
#[command(author, version, about = "Cinder CI command-line interface", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = CliConfig::load().unwrap_or_default();

    match cli.command {
        Commands::Init => handlers::init().await?,
        Commands::Validate { path } => handlers::validate(&path).await?,
        Commands::Jobs { path } => handlers::list_jobs(&path).await?,
        Commands::Run {
            path,
            event,
            branch,
            workers,
            vars,
            json,
        } => {
            let succeeded =
                handlers::run_workflow(&config, &path, &event, &branch, workers, vars, json)
                    .await?;
            if !succeeded {
                std::process::exit(1);
            }
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => handlers::show_config(&config)?,
            ConfigCommands::Set { key, value } => handlers::set_config(&key, &value)?,
        },
    }

    Ok(())
}
