//! Storage seams consumed by the card and marking flows.
//!
//! [`BingoRepository`] implements all three against SQLite. The flows in
//! [`crate::service`] only see these traits.

use strictly_bingo::{Card, Topic};
use tracing::instrument;

use crate::db::{BingoEvent, BingoRepository, CardCell, DbError};

/// Reads a board's topic pool.
pub trait TopicSource {
    /// All topics of a board in stable creation order.
    fn board_topics(&self, board_id: i32) -> Result<Vec<Topic>, DbError>;
}

/// Stores player cards.
pub trait CardStore {
    /// Atomically replaces the player's card on the board.
    fn replace_card(&self, player_id: i32, board_id: i32, card: &Card) -> Result<(), DbError>;

    /// All stored cells of the player's card, ordered by index.
    fn card_cells(&self, player_id: i32, board_id: i32) -> Result<Vec<CardCell>, DbError>;

    /// One stored cell of the player's card, if it exists.
    fn get_cell(&self, player_id: i32, board_id: i32, cell_index: i32) -> Result<Option<CardCell>, DbError>;

    /// Writes the marked flag of one stored cell.
    fn set_marked(&self, cell_id: i32, marked: bool) -> Result<(), DbError>;
}

/// Append-only log of wins.
pub trait WinEventSink {
    /// Records that `player_id` completed `line`.
    fn record_bingo(&self, board_id: i32, player_id: i32, line: &[usize]) -> Result<BingoEvent, DbError>;
}

impl TopicSource for BingoRepository {
    #[instrument(skip(self))]
    fn board_topics(&self, board_id: i32) -> Result<Vec<Topic>, DbError> {
        Ok(self.list_topics(board_id)?.iter().map(|t| t.to_topic()).collect())
    }
}

impl CardStore for BingoRepository {
    fn replace_card(&self, player_id: i32, board_id: i32, card: &Card) -> Result<(), DbError> {
        BingoRepository::replace_card(self, player_id, board_id, card)
    }

    fn card_cells(&self, player_id: i32, board_id: i32) -> Result<Vec<CardCell>, DbError> {
        BingoRepository::card_cells(self, player_id, board_id)
    }

    fn get_cell(&self, player_id: i32, board_id: i32, cell_index: i32) -> Result<Option<CardCell>, DbError> {
        BingoRepository::get_cell(self, player_id, board_id, cell_index)
    }

    fn set_marked(&self, cell_id: i32, marked: bool) -> Result<(), DbError> {
        BingoRepository::set_marked(self, cell_id, marked)
    }
}

impl WinEventSink for BingoRepository {
    fn record_bingo(&self, board_id: i32, player_id: i32, line: &[usize]) -> Result<BingoEvent, DbError> {
        BingoRepository::record_bingo(self, board_id, player_id, line)
    }
}
