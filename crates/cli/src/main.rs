//! UB Carpool CLI - database migrations and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Create the document table
//! carpool-cli migrate
//!
//! # Load a demo driver, passenger and a few routes
//! carpool-cli seed
//!
//! # Same, with a different password for the demo accounts
//! carpool-cli seed --password "correct horse"
//! ```
//!
//! Both commands read `CARPOOL_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "carpool-cli")]
#[command(author, version, about = "UB Carpool CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Create demo accounts and routes
    Seed {
        /// Password for the demo driver and passenger
        #[arg(short, long, default_value = commands::seed::DEFAULT_PASSWORD)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { password } => commands::seed::run(&password).await?,
    }
    Ok(())
}
