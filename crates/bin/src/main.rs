use clap::Parser;
use tracing_subscriber::EnvFilter;

mod backend;
mod cli;
mod commands;
mod output;

use cli::{Cli, Commands, UserCommands};
use output::OutputFormat;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("castgate=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_json_flag(cli.json);

    match cli.command {
        Some(Commands::Serve(args)) => commands::serve::run(&args).await,
        Some(Commands::User { command }) => match command {
            UserCommands::Add(args) => commands::user::add(&args, format).await,
            UserCommands::Remove(args) => commands::user::remove(&args, format).await,
            UserCommands::List(args) => commands::user::list(&args, format).await,
            UserCommands::Passwd(args) => commands::user::passwd(&args, format).await,
            UserCommands::RotateKey(args) => commands::user::rotate_key(&args, format).await,
        },
        Some(Commands::Health(args)) => commands::health::run(&args).await,
        None => {
            // Default to serve with default args
            let cli = Cli::parse_from(["castgate", "serve"]);
            match cli.command {
                Some(Commands::Serve(args)) => commands::serve::run(&args).await,
                _ => Err("failed to build default serve arguments".into()),
            }
        }
    }
}
