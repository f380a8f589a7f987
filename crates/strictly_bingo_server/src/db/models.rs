//! Database models for boards, topics, players, cards and win events.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use strictly_bingo::{CellState, Topic};
use tracing::instrument;

use crate::db::{DbError, schema};

/// Lifecycle of a board.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BoardStatus {
    /// Collecting topics and players.
    Lobby,
    /// Cards are being played.
    Playing,
}

/// Board database model.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Getters, serde::Serialize)]
#[serde(rename_all = "camelCase")]
#[diesel(table_name = schema::boards)]
pub struct Board {
    id: i32,
    title: String,
    created_by: String,
    status: String,
    reward: Option<String>,
    created_at: NaiveDateTime,
}

impl Board {
    /// Parses the stored status string.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the column holds an unknown status.
    #[instrument(skip(self), fields(status = %self.status))]
    pub fn parse_status(&self) -> Result<BoardStatus, DbError> {
        self.status
            .parse()
            .map_err(|_| DbError::new(format!("Invalid board status: '{}'", self.status)))
    }

    /// Whether `user_id` is the board's host.
    pub fn is_host(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }
}

/// Insertable board model.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::boards)]
pub struct NewBoard {
    title: String,
    created_by: String,
    status: String,
}

/// Topic database model.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters, serde::Serialize)]
#[serde(rename_all = "camelCase")]
#[diesel(table_name = schema::topics)]
#[diesel(belongs_to(Board))]
pub struct BoardTopic {
    id: i32,
    board_id: i32,
    text: String,
    created_by: String,
    created_at: NaiveDateTime,
}

impl BoardTopic {
    /// Converts the row into the core topic type.
    pub fn to_topic(&self) -> Topic {
        Topic::new(self.id, self.text.clone())
    }
}

/// Insertable topic model.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::topics)]
pub struct NewTopic {
    board_id: i32,
    text: String,
    created_by: String,
}

/// Player database model.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters, serde::Serialize)]
#[serde(rename_all = "camelCase")]
#[diesel(table_name = schema::players)]
#[diesel(belongs_to(Board))]
pub struct Player {
    id: i32,
    board_id: i32,
    user_id: String,
    name: String,
    color: String,
    created_at: NaiveDateTime,
}

/// Insertable player model.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::players)]
pub struct NewPlayer {
    board_id: i32,
    user_id: String,
    name: String,
    color: String,
}

/// One stored cell of a player's card.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::player_cards)]
#[diesel(belongs_to(Player))]
pub struct CardCell {
    id: i32,
    player_id: i32,
    board_id: i32,
    grid_size: i32,
    cell_index: i32,
    topic_id: Option<i32>,
    marked: bool,
}

impl CardCell {
    /// Projects the row onto the win-detection input.
    pub fn state(&self) -> CellState {
        CellState::new(self.cell_index as usize, self.marked)
    }

    /// Whether this is the free center cell.
    pub fn is_free(&self) -> bool {
        self.topic_id.is_none()
    }
}

/// Insertable card cell.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::player_cards)]
pub struct NewCardCell {
    player_id: i32,
    board_id: i32,
    grid_size: i32,
    cell_index: i32,
    topic_id: Option<i32>,
    marked: bool,
}

/// Recorded bingo.
#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable, Getters)]
#[diesel(table_name = schema::bingo_events)]
#[diesel(belongs_to(Board))]
#[diesel(belongs_to(Player))]
pub struct BingoEvent {
    id: i32,
    board_id: i32,
    player_id: i32,
    winning_line: String,
    created_at: NaiveDateTime,
}

impl BingoEvent {
    /// Decodes the stored JSON winning line.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the column is not a JSON array of indices.
    #[instrument(skip(self), fields(event_id = self.id))]
    pub fn line(&self) -> Result<Vec<usize>, DbError> {
        Ok(serde_json::from_str(&self.winning_line)?)
    }
}

/// Insertable bingo event.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::bingo_events)]
pub struct NewBingoEvent {
    board_id: i32,
    player_id: i32,
    winning_line: String,
}
