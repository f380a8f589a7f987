//! SQLite persistence for boards, topics, players, cards and win events.

mod error;
mod models;
mod repository;
mod schema;

pub use error::DbError;
pub use models::{
    BingoEvent, Board, BoardStatus, BoardTopic, CardCell, NewBingoEvent, NewBoard, NewCardCell,
    NewPlayer, NewTopic, Player,
};
pub use repository::BingoRepository;

use diesel::Connection;
use diesel::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{info, instrument};

/// Schema migrations bundled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies any pending migrations to the database at `db_path`.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be opened or a migration fails.
#[instrument]
pub fn run_migrations(db_path: &str) -> Result<usize, DbError> {
    let mut conn = SqliteConnection::establish(db_path)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DbError::new(format!("Migration failed: {}", e)))?
        .len();
    info!(applied, "Migrations applied");
    Ok(applied)
}
