//! Database repository for boards, topics, players, cards and win events.

use diesel::prelude::*;
use strictly_bingo::Card;
use tracing::{debug, info, instrument, warn};

use crate::db::{
    BingoEvent, Board, BoardStatus, BoardTopic, CardCell, DbError, NewBingoEvent, NewBoard,
    NewCardCell, NewPlayer, NewTopic, Player, schema,
};

/// Database repository for bingo boards.
///
/// Opens a fresh SQLite connection per call, so clones can be handed to
/// concurrent request handlers freely.
#[derive(Debug, Clone)]
pub struct BingoRepository {
    db_path: String,
}

impl BingoRepository {
    /// Creates a new repository connected to the database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the path is empty.
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Result<Self, DbError> {
        if db_path.trim().is_empty() {
            return Err(DbError::new("Database path is empty"));
        }
        info!(path = %db_path, "Creating BingoRepository");
        Ok(Self { db_path })
    }

    /// Establishes a database connection.
    #[instrument(skip(self))]
    pub(crate) fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        SqliteConnection::establish(&self.db_path)
            .map_err(|e| DbError::new(format!("Failed to connect to '{}': {}", self.db_path, e)))
    }

    // ─────────────────────────────────────────────────────────────
    //  Boards
    // ─────────────────────────────────────────────────────────────

    /// Creates a board hosted by `created_by`, starting in the lobby.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn create_board(&self, title: String, created_by: String) -> Result<Board, DbError> {
        let mut conn = self.connection()?;
        let new_board = NewBoard::new(title, created_by, BoardStatus::Lobby.to_string());

        let board = diesel::insert_into(schema::boards::table)
            .values(&new_board)
            .returning(Board::as_returning())
            .get_result(&mut conn)?;

        info!(board_id = board.id(), "Board created");
        Ok(board)
    }

    /// Gets a board by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_board(&self, board_id: i32) -> Result<Option<Board>, DbError> {
        let mut conn = self.connection()?;
        let board = schema::boards::table
            .find(board_id)
            .first::<Board>(&mut conn)
            .optional()?;
        if board.is_none() {
            debug!("Board not found");
        }
        Ok(board)
    }

    /// Updates a board's status.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the board does not exist or a database error occurs.
    #[instrument(skip(self))]
    pub fn set_board_status(&self, board_id: i32, status: BoardStatus) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let updated = diesel::update(schema::boards::table.find(board_id))
            .set(schema::boards::status.eq(status.as_ref()))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DbError::new(format!("Board {} not found", board_id)));
        }
        info!(%status, "Board status updated");
        Ok(())
    }

    /// Sets or clears the stakes shown on a board.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the board does not exist or a database error occurs.
    #[instrument(skip(self))]
    pub fn set_board_reward(&self, board_id: i32, reward: Option<String>) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let updated = diesel::update(schema::boards::table.find(board_id))
            .set(schema::boards::reward.eq(reward))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DbError::new(format!("Board {} not found", board_id)));
        }
        debug!("Board reward updated");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    //  Topics
    // ─────────────────────────────────────────────────────────────

    /// Adds a topic to a board.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub fn add_topic(
        &self,
        board_id: i32,
        text: String,
        created_by: String,
    ) -> Result<BoardTopic, DbError> {
        let mut conn = self.connection()?;
        let topic = diesel::insert_into(schema::topics::table)
            .values(&NewTopic::new(board_id, text, created_by))
            .returning(BoardTopic::as_returning())
            .get_result(&mut conn)?;
        debug!(topic_id = topic.id(), "Topic added");
        Ok(topic)
    }

    /// Gets a topic by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_topic(&self, topic_id: i32) -> Result<Option<BoardTopic>, DbError> {
        let mut conn = self.connection()?;
        Ok(schema::topics::table
            .find(topic_id)
            .first::<BoardTopic>(&mut conn)
            .optional()?)
    }

    /// Deletes a topic. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn delete_topic(&self, topic_id: i32) -> Result<bool, DbError> {
        let mut conn = self.connection()?;
        let deleted = diesel::delete(schema::topics::table.find(topic_id)).execute(&mut conn)?;
        debug!(deleted, "Topic delete");
        Ok(deleted > 0)
    }

    /// Lists a board's topics in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_topics(&self, board_id: i32) -> Result<Vec<BoardTopic>, DbError> {
        let mut conn = self.connection()?;
        let topics = schema::topics::table
            .filter(schema::topics::board_id.eq(board_id))
            .order((schema::topics::created_at.asc(), schema::topics::id.asc()))
            .load::<BoardTopic>(&mut conn)?;
        debug!(count = topics.len(), "Topics loaded");
        Ok(topics)
    }

    /// Counts a board's topics.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn count_topics(&self, board_id: i32) -> Result<usize, DbError> {
        let mut conn = self.connection()?;
        let count: i64 = schema::topics::table
            .filter(schema::topics::board_id.eq(board_id))
            .count()
            .get_result(&mut conn)?;
        Ok(count as usize)
    }

    // ─────────────────────────────────────────────────────────────
    //  Players
    // ─────────────────────────────────────────────────────────────

    /// Adds `user_id` to a board's roster.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the user already joined or a database error occurs.
    #[instrument(skip(self))]
    pub fn add_player(
        &self,
        board_id: i32,
        user_id: String,
        name: String,
        color: String,
    ) -> Result<Player, DbError> {
        let mut conn = self.connection()?;
        let player = diesel::insert_into(schema::players::table)
            .values(&NewPlayer::new(board_id, user_id, name, color))
            .returning(Player::as_returning())
            .get_result(&mut conn)?;
        info!(player_id = player.id(), "Player joined");
        Ok(player)
    }

    /// Gets a player by id. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_player(&self, player_id: i32) -> Result<Option<Player>, DbError> {
        let mut conn = self.connection()?;
        Ok(schema::players::table
            .find(player_id)
            .first::<Player>(&mut conn)
            .optional()?)
    }

    /// Lists a board's players in join order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_players(&self, board_id: i32) -> Result<Vec<Player>, DbError> {
        let mut conn = self.connection()?;
        Ok(schema::players::table
            .filter(schema::players::board_id.eq(board_id))
            .order(schema::players::id.asc())
            .load::<Player>(&mut conn)?)
    }

    // ─────────────────────────────────────────────────────────────
    //  Cards
    // ─────────────────────────────────────────────────────────────

    /// Replaces a player's card on a board.
    ///
    /// The old cells are deleted and the new ones inserted in a single
    /// transaction, so a board never holds two cards for one player.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs; nothing is written then.
    #[instrument(skip(self, card), fields(grid_size = card.grid_size()))]
    pub fn replace_card(&self, player_id: i32, board_id: i32, card: &Card) -> Result<(), DbError> {
        let grid_size = *card.grid_size() as i32;
        let rows: Vec<NewCardCell> = card
            .cells()
            .iter()
            .map(|cell| {
                NewCardCell::new(
                    player_id,
                    board_id,
                    grid_size,
                    *cell.index() as i32,
                    cell.topic_id(),
                    *cell.marked(),
                )
            })
            .collect();

        let mut conn = self.connection()?;
        conn.transaction::<_, DbError, _>(|conn| {
            let removed = diesel::delete(
                schema::player_cards::table
                    .filter(schema::player_cards::player_id.eq(player_id))
                    .filter(schema::player_cards::board_id.eq(board_id)),
            )
            .execute(conn)?;
            if removed > 0 {
                debug!(removed, "Previous card deleted");
            }
            diesel::insert_into(schema::player_cards::table)
                .values(&rows)
                .execute(conn)?;
            Ok(())
        })?;

        info!(cells = rows.len(), "Card stored");
        Ok(())
    }

    /// Loads a player's card cells ordered by index.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn card_cells(&self, player_id: i32, board_id: i32) -> Result<Vec<CardCell>, DbError> {
        let mut conn = self.connection()?;
        let cells = schema::player_cards::table
            .filter(schema::player_cards::player_id.eq(player_id))
            .filter(schema::player_cards::board_id.eq(board_id))
            .order(schema::player_cards::cell_index.asc())
            .load::<CardCell>(&mut conn)?;
        debug!(count = cells.len(), "Card cells loaded");
        Ok(cells)
    }

    /// Loads a player's card cells with the text of each placed topic.
    ///
    /// The text is `None` on the free cell and on cells whose topic has
    /// since been deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn card_with_text(
        &self,
        player_id: i32,
        board_id: i32,
    ) -> Result<Vec<(CardCell, Option<String>)>, DbError> {
        let mut conn = self.connection()?;
        let rows = schema::player_cards::table
            .left_join(schema::topics::table)
            .filter(schema::player_cards::player_id.eq(player_id))
            .filter(schema::player_cards::board_id.eq(board_id))
            .order(schema::player_cards::cell_index.asc())
            .select((CardCell::as_select(), schema::topics::text.nullable()))
            .load::<(CardCell, Option<String>)>(&mut conn)?;
        debug!(count = rows.len(), "Card loaded with text");
        Ok(rows)
    }

    /// Gets one cell of a player's card. Returns `None` if not found.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_cell(
        &self,
        player_id: i32,
        board_id: i32,
        cell_index: i32,
    ) -> Result<Option<CardCell>, DbError> {
        let mut conn = self.connection()?;
        Ok(schema::player_cards::table
            .filter(schema::player_cards::player_id.eq(player_id))
            .filter(schema::player_cards::board_id.eq(board_id))
            .filter(schema::player_cards::cell_index.eq(cell_index))
            .first::<CardCell>(&mut conn)
            .optional()?)
    }

    /// Sets the marked flag of a stored cell.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the cell does not exist or a database error occurs.
    #[instrument(skip(self))]
    pub fn set_marked(&self, cell_id: i32, marked: bool) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let updated = diesel::update(schema::player_cards::table.find(cell_id))
            .set(schema::player_cards::marked.eq(marked))
            .execute(&mut conn)?;
        if updated == 0 {
            warn!("Cell vanished before update");
            return Err(DbError::new(format!("Card cell {} not found", cell_id)));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    //  Win events
    // ─────────────────────────────────────────────────────────────

    /// Appends a bingo event for a player.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn record_bingo(
        &self,
        board_id: i32,
        player_id: i32,
        line: &[usize],
    ) -> Result<BingoEvent, DbError> {
        let encoded = serde_json::to_string(line)?;
        let mut conn = self.connection()?;
        let event = diesel::insert_into(schema::bingo_events::table)
            .values(&NewBingoEvent::new(board_id, player_id, encoded))
            .returning(BingoEvent::as_returning())
            .get_result(&mut conn)?;
        info!(event_id = event.id(), "Bingo recorded");
        Ok(event)
    }

    /// Lists a board's bingo events, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_bingo_events(&self, board_id: i32) -> Result<Vec<BingoEvent>, DbError> {
        let mut conn = self.connection()?;
        Ok(schema::bingo_events::table
            .filter(schema::bingo_events::board_id.eq(board_id))
            .order(schema::bingo_events::id.asc())
            .load::<BingoEvent>(&mut conn)?)
    }

    /// Counts bingo events per player on a board, as `(player_id, wins)`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn win_counts(&self, board_id: i32) -> Result<Vec<(i32, i64)>, DbError> {
        let mut conn = self.connection()?;
        Ok(schema::bingo_events::table
            .filter(schema::bingo_events::board_id.eq(board_id))
            .group_by(schema::bingo_events::player_id)
            .select((schema::bingo_events::player_id, diesel::dsl::count_star()))
            .load::<(i32, i64)>(&mut conn)?)
    }

    /// Deletes every card and bingo event on a board.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs; nothing is deleted then.
    #[instrument(skip(self))]
    pub fn reset_board(&self, board_id: i32) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let (events, cells) = conn.transaction::<_, DbError, _>(|conn| {
            let events = diesel::delete(
                schema::bingo_events::table.filter(schema::bingo_events::board_id.eq(board_id)),
            )
            .execute(conn)?;
            let cells = diesel::delete(
                schema::player_cards::table.filter(schema::player_cards::board_id.eq(board_id)),
            )
            .execute(conn)?;
            Ok((events, cells))
        })?;
        info!(events, cells, "Board reset");
        Ok(())
    }
}
