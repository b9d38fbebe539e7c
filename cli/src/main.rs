use bulkid::{setup_logger, LevelFilter};
use clap::Parser;

use crate::{
    cli_interface::{Commands, CLI},
    commands::{explain::handle_explain_command, run::handle_run_command},
};

mod cli_interface;
mod commands;
mod console;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CLI::parse();

    match &cli.command {
        Commands::Explain { args } => {
            setup_logger(LevelFilter::WARN);
            handle_explain_command(args).await
        }
        Commands::Run { args } => {
            setup_logger(LevelFilter::INFO);
            handle_run_command(args).await
        }
    }
}
