//! Strictly Bingo - server binary

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use strictly_bingo_server::{BingoRepository, BingoService, ServerConfig, run_migrations, serve};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            host,
            port,
            db_path,
        } => {
            let mut settings = match config {
                Some(path) => ServerConfig::from_file(path)?,
                None => ServerConfig::default(),
            };
            if let Some(host) = host {
                settings = settings.with_host(host);
            }
            if let Some(port) = port {
                settings = settings.with_port(port);
            }
            if let Some(db_path) = db_path {
                settings = settings.with_db_path(db_path);
            }
            run_server(settings).await
        }
        Command::Migrate { db_path } => {
            let applied = run_migrations(&db_path)?;
            info!(applied, db_path = %db_path, "Database up to date");
            Ok(())
        }
    }
}

/// Migrate the database and serve the API.
#[instrument(skip_all, fields(addr = %settings.bind_addr()))]
async fn run_server(settings: ServerConfig) -> Result<()> {
    info!("Starting Strictly Bingo server");

    run_migrations(settings.db_path())?;
    let repository = BingoRepository::new(settings.db_path().clone())?;
    let service = BingoService::new(repository);

    serve(service, &settings.bind_addr()).await?;
    Ok(())
}
