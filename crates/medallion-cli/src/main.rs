//! Medallion CLI
//!
//! Command-line interface for the Bronze/Silver/Gold pipeline

use clap::{Parser, Subcommand};
use medallion_core::logging_facility::{self, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "medallion")]
#[command(about = "Medallion - Bronze/Silver/Gold ELT pipeline", long_about = None)]
struct Cli {
    #[command(flatten)]
    roots: commands::RootArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Ingest new or changed raw files into a Bronze run
    Bronze,
    /// Normalize one Bronze run into a Silver run
    Silver(commands::silver::SilverArgs),
    /// Build the Gold mart catalog from one Silver run
    Gold(commands::gold::GoldArgs),
    /// Run every layer end to end with gating
    Orchestrate(commands::orchestrate::OrchestrateArgs),
    /// Write a cross-layer summary report
    Summary(commands::summary::SummaryArgs),
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    logging_facility::init(Profile::from_name(&cli.roots.log_profile));

    let result = cli.roots.load_config().and_then(|cfg| match cli.command {
        Commands::Bronze => commands::bronze::execute(&cfg),
        Commands::Silver(args) => commands::silver::execute(args, &cfg),
        Commands::Gold(args) => commands::gold::execute(args, &cfg),
        Commands::Orchestrate(args) => commands::orchestrate::execute(args, &cfg),
        Commands::Summary(args) => commands::summary::execute(args, &cfg),
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
