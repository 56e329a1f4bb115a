//! Guarded Wallet CLI Application
//!
//! Runs reentrancy scenarios against the single-use transfer wallet.

use clap::{Parser, Subcommand};
use guarded_wallet::cli::{self, RunOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "guarded-wallet")]
#[command(version = "0.1.0")]
#[command(about = "Single-use transfer wallet and reentrancy simulator", long_about = None)]
struct Cli {
    /// Data directory for saved wallet state
    #[arg(short, long, default_value = ".wallet_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the built-in multi-owner reentrancy attack
    Demo {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Save the final state to the data directory
        #[arg(long)]
        save: bool,
    },

    /// Run a scenario from a JSON file
    Run {
        /// Scenario file path
        #[arg(short, long)]
        scenario: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Save the final state to the data directory
        #[arg(long)]
        save: bool,
    },

    /// Show the saved wallet state
    Inspect,

    /// Export the saved state to a file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List saved backups
    Backups,

    /// Restore a backup as the current state
    Restore {
        /// Backup index (0 is the most recent)
        #[arg(short, long, default_value = "0")]
        index: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { json, save } => {
            let options = RunOptions {
                data_dir: cli.data_dir,
                json,
                save,
            };
            cli::cmd_demo(&options)?;
        }

        Commands::Run {
            scenario,
            json,
            save,
        } => {
            let options = RunOptions {
                data_dir: cli.data_dir,
                json,
                save,
            };
            cli::cmd_run(&scenario, &options)?;
        }

        Commands::Inspect => {
            cli::cmd_inspect(&cli.data_dir)?;
        }

        Commands::Export { output } => {
            cli::cmd_export(&cli.data_dir, &output)?;
        }

        Commands::Backups => {
            cli::cmd_backups(&cli.data_dir)?;
        }

        Commands::Restore { index } => {
            cli::cmd_restore(&cli.data_dir, index)?;
        }
    }

    Ok(())
}
