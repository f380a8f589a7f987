//! Command-line interface for strictly_bingo_server.

use clap::{Parser, Subcommand};

/// Strictly Bingo - crowd-sourced bingo board server
#[derive(Parser, Debug)]
#[command(name = "strictly_bingo_server")]
#[command(about = "Bingo board server with per-player cards", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Path to a TOML config file
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,

        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the database file (overrides config)
        #[arg(long)]
        db_path: Option<String>,
    },

    /// Apply pending database migrations and exit
    Migrate {
        /// Path to the database file (created if it doesn't exist)
        #[arg(long, default_value = "strictly_bingo.db")]
        db_path: String,
    },
}
