//! Game flows: dealing cards, toggling marks, starting and resetting rounds.
//!
//! Callers arrive already authenticated; the service only checks that the
//! user may act on the board or player named in the request.

use rand::Rng;
use serde::Serialize;
use strictly_bingo::{
    BingoError, BingoResult, Card, Cell, CellState, FREE_LABEL, MIN_TOPICS, assemble_card_with,
    check_bingo, grid_size_for, topics_remaining,
};
use tracing::{debug, info, instrument, warn};

use crate::db::{BingoEvent, BingoRepository, Board, BoardStatus, BoardTopic, CardCell, DbError, Player};
use crate::store::{CardStore, TopicSource, WinEventSink};

/// Colors handed to joining players, first free one wins.
pub const PLAYER_COLORS: [&str; 8] = [
    "#FF6B35", "#DAA520", "#6B8E23", "#B7410E", "#3b82f6", "#ec4899", "#06b6d4", "#D4A574",
];

/// Leaderboard color for wins whose player is gone.
const UNKNOWN_COLOR: &str = "#999";

/// First [`PLAYER_COLORS`] entry not in `taken`, wrapping to the first when all are used.
pub fn pick_color<'a>(taken: impl IntoIterator<Item = &'a str>) -> &'static str {
    let taken: Vec<&str> = taken.into_iter().collect();
    PLAYER_COLORS
        .iter()
        .copied()
        .find(|c| !taken.contains(c))
        .unwrap_or(PLAYER_COLORS[0])
}

/// Why a game operation was refused.
#[derive(Debug, Clone, derive_more::Display)]
pub enum ServiceError {
    /// The named board, player, topic or cell does not exist.
    #[display("{} not found", _0)]
    NotFound(&'static str),

    /// The caller may not act on this resource.
    #[display("{}", _0)]
    Forbidden(String),

    /// The request is malformed or inconsistent.
    #[display("{}", _0)]
    BadRequest(String),

    /// The board's pool is below the minimum for dealing cards.
    #[display("Need at least {needed} topics ({remaining} more to go)")]
    NotEnoughTopics {
        /// Minimum pool size.
        needed: usize,
        /// Topics still missing.
        remaining: usize,
    },

    /// The core rejected its input.
    #[display("{}", _0)]
    Core(BingoError),

    /// Storage failed.
    #[display("{}", _0)]
    Db(DbError),
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Core(e) => Some(e),
            Self::Db(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        Self::Db(err)
    }
}

impl From<BingoError> for ServiceError {
    fn from(err: BingoError) -> Self {
        Self::Core(err)
    }
}

/// One cell of a dealt card as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    /// Row-major cell index.
    pub cell_index: usize,
    /// Placed topic, absent on the free cell.
    pub topic_id: Option<i32>,
    /// Whether the cell is marked.
    pub marked: bool,
    /// Topic text, or `FREE`.
    pub text: String,
}

/// A player's card with topic text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    /// Owner of the card.
    pub player_id: i32,
    /// Board the card was dealt on.
    pub board_id: i32,
    /// Side length.
    pub grid_size: usize,
    /// Cells in row-major order.
    pub cells: Vec<CellView>,
}

impl From<&Cell> for CellView {
    fn from(cell: &Cell) -> Self {
        Self {
            cell_index: *cell.index(),
            topic_id: cell.topic_id(),
            marked: *cell.marked(),
            text: cell.display_text().to_string(),
        }
    }
}

impl CardView {
    /// Renders a card for the wire.
    pub fn new(player_id: i32, board_id: i32, card: &Card) -> Self {
        Self {
            player_id,
            board_id,
            grid_size: *card.grid_size(),
            cells: card.cells().iter().map(CellView::from).collect(),
        }
    }
}

impl CardView {
    /// Renders stored card rows, as loaded by
    /// [`BingoRepository::card_with_text`]. Returns `None` for an empty card.
    pub fn from_rows(player_id: i32, board_id: i32, rows: &[(CardCell, Option<String>)]) -> Option<Self> {
        let (first, _) = rows.first()?;
        let cells = rows
            .iter()
            .map(|(cell, text)| CellView {
                cell_index: *cell.cell_index() as usize,
                topic_id: *cell.topic_id(),
                marked: *cell.marked(),
                text: if cell.is_free() {
                    FREE_LABEL.to_string()
                } else {
                    text.clone().unwrap_or_default()
                },
            })
            .collect();
        Some(Self {
            player_id,
            board_id,
            grid_size: *first.grid_size() as usize,
            cells,
        })
    }
}

/// Another player's card: marks only, no topic text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarksView {
    /// Owner of the card.
    pub player_id: i32,
    /// Side length.
    pub grid_size: usize,
    /// Marked state per cell, row-major.
    pub cells: Vec<CellState>,
}

/// One row of a board's win table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// Winner.
    pub player_id: i32,
    /// Display name, `Unknown` if the player is gone.
    pub name: String,
    /// Roster color.
    pub color: String,
    /// Bingo events recorded for the player.
    pub wins: u64,
}

/// Result of toggling one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkOutcome {
    /// The toggled cell.
    pub cell_index: usize,
    /// Its new marked state.
    pub marked: bool,
    /// Win check over the card after the write.
    pub bingo: BingoResult,
}

/// Deals a new card for `player_id` from the board's topic pool and stores it,
/// replacing any previous card.
///
/// # Errors
///
/// [`ServiceError::NotEnoughTopics`] below [`MIN_TOPICS`]; storage errors otherwise.
#[instrument(skip(store, rng))]
pub fn deal_card<S, R>(
    store: &S,
    board_id: i32,
    player_id: i32,
    rng: &mut R,
) -> Result<Card, ServiceError>
where
    S: TopicSource + CardStore + ?Sized,
    R: Rng + ?Sized,
{
    let topics = store.board_topics(board_id)?;
    if topics.len() < MIN_TOPICS {
        warn!(have = topics.len(), "Pool too small to deal");
        return Err(ServiceError::NotEnoughTopics {
            needed: MIN_TOPICS,
            remaining: topics_remaining(topics.len()),
        });
    }

    let grid_size = grid_size_for(topics.len());
    let card = assemble_card_with(&topics, grid_size, rng)?;
    store.replace_card(player_id, board_id, &card)?;

    info!(grid_size, pool = topics.len(), "Card dealt");
    Ok(card)
}

/// Toggles one cell of a stored card and checks the card for bingo.
///
/// The win check runs on a fresh read of every cell after the write. A win
/// event is appended when this toggle marks a cell that lies on the reported
/// line, so re-checking an already-won card does not log it twice. Only the
/// first complete line is reported: completing a second line while an
/// earlier one stays complete logs nothing, since the earlier line is the
/// one reported.
///
/// # Errors
///
/// [`ServiceError::NotFound`] for a missing cell, [`BingoError::FreeCell`]
/// for the center, storage errors otherwise.
#[instrument(skip(store))]
pub fn toggle_cell<S>(
    store: &S,
    board_id: i32,
    player_id: i32,
    cell_index: usize,
) -> Result<MarkOutcome, ServiceError>
where
    S: CardStore + WinEventSink + ?Sized,
{
    let index = i32::try_from(cell_index).map_err(|_| ServiceError::NotFound("Cell"))?;
    let cell = store
        .get_cell(player_id, board_id, index)?
        .ok_or(ServiceError::NotFound("Cell"))?;
    if cell.is_free() {
        return Err(BingoError::FreeCell.into());
    }

    let marked = !*cell.marked();
    store.set_marked(*cell.id(), marked)?;

    let states: Vec<CellState> = store
        .card_cells(player_id, board_id)?
        .iter()
        .map(CardCell::state)
        .collect();
    let bingo = check_bingo(&states, *cell.grid_size() as usize)?;

    if let Some(line) = bingo.winning_line() {
        if marked && line.contains(&cell_index) {
            store.record_bingo(board_id, player_id, line)?;
            info!(?line, "Bingo!");
        } else {
            debug!(?line, "Card already holds a winning line");
        }
    }

    Ok(MarkOutcome {
        cell_index,
        marked,
        bingo,
    })
}

/// Board, topic and card operations on top of [`BingoRepository`].
#[derive(Debug, Clone)]
pub struct BingoService {
    repository: BingoRepository,
}

impl BingoService {
    /// Creates a service backed by the given repository.
    #[instrument(skip(repository))]
    pub fn new(repository: BingoRepository) -> Self {
        info!("Creating BingoService");
        Self { repository }
    }

    /// Returns the underlying repository.
    pub fn repository(&self) -> &BingoRepository {
        &self.repository
    }

    #[instrument(skip(self))]
    fn board(&self, board_id: i32) -> Result<Board, ServiceError> {
        self.repository
            .get_board(board_id)?
            .ok_or(ServiceError::NotFound("Board"))
    }

    #[instrument(skip(self))]
    fn hosted_board(&self, board_id: i32, user_id: &str, action: &str) -> Result<Board, ServiceError> {
        let board = self.board(board_id)?;
        if !board.is_host(user_id) {
            warn!("Non-host attempted host action");
            return Err(ServiceError::Forbidden(format!("Only the host can {}", action)));
        }
        Ok(board)
    }

    #[instrument(skip(self))]
    fn own_player(&self, board_id: i32, player_id: i32, user_id: &str) -> Result<Player, ServiceError> {
        let player = self
            .repository
            .get_player(player_id)?
            .ok_or(ServiceError::NotFound("Player"))?;
        if player.user_id() != user_id {
            return Err(ServiceError::Forbidden("Not your player".to_string()));
        }
        if *player.board_id() != board_id {
            return Err(ServiceError::BadRequest("Player not on this board".to_string()));
        }
        Ok(player)
    }

    #[instrument(skip(self))]
    fn board_member(&self, board_id: i32, user_id: &str) -> Result<Vec<Player>, ServiceError> {
        let board = self.board(board_id)?;
        let players = self.repository.list_players(board_id)?;
        if !board.is_host(user_id) && !players.iter().any(|p| p.user_id() == user_id) {
            return Err(ServiceError::Forbidden("Join the board first".to_string()));
        }
        Ok(players)
    }

    /// Looks up a board.
    pub fn get_board(&self, board_id: i32) -> Result<Board, ServiceError> {
        self.board(board_id)
    }

    /// Creates a board hosted by `user_id`.
    #[instrument(skip(self))]
    pub fn create_board(&self, user_id: &str, title: &str) -> Result<Board, ServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::BadRequest("title required".to_string()));
        }
        Ok(self
            .repository
            .create_board(title.to_string(), user_id.to_string())?)
    }

    /// Adds a topic to a board. Topic text is stored as given, trimmed.
    #[instrument(skip(self, text))]
    pub fn add_topic(&self, board_id: i32, user_id: &str, text: &str) -> Result<BoardTopic, ServiceError> {
        self.board(board_id)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::BadRequest("text required".to_string()));
        }
        Ok(self
            .repository
            .add_topic(board_id, text.to_string(), user_id.to_string())?)
    }

    /// Deletes a topic. Only its author or the board's host may do so.
    #[instrument(skip(self))]
    pub fn delete_topic(&self, user_id: &str, topic_id: i32) -> Result<(), ServiceError> {
        let topic = self
            .repository
            .get_topic(topic_id)?
            .ok_or(ServiceError::NotFound("Topic"))?;
        let board = self.board(*topic.board_id())?;
        if topic.created_by() != user_id && !board.is_host(user_id) {
            return Err(ServiceError::Forbidden("Not your topic".to_string()));
        }
        self.repository.delete_topic(topic_id)?;
        Ok(())
    }

    /// Topics of a board in creation order.
    #[instrument(skip(self))]
    pub fn topics(&self, board_id: i32) -> Result<Vec<BoardTopic>, ServiceError> {
        self.board(board_id)?;
        Ok(self.repository.list_topics(board_id)?)
    }

    /// Sets the stakes shown on a board; blank text clears them. Host only.
    #[instrument(skip(self))]
    pub fn set_reward(&self, board_id: i32, user_id: &str, reward: &str) -> Result<Board, ServiceError> {
        self.hosted_board(board_id, user_id, "set the stakes")?;
        let reward = Some(reward.trim()).filter(|r| !r.is_empty()).map(str::to_string);
        self.repository.set_board_reward(board_id, reward)?;
        self.board(board_id)
    }

    /// Adds `user_id` to a board under `name`, with the first color no
    /// other player on the board has.
    #[instrument(skip(self))]
    pub fn join_board(&self, board_id: i32, user_id: &str, name: &str) -> Result<Player, ServiceError> {
        self.board(board_id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::BadRequest("name required".to_string()));
        }
        let players = self.repository.list_players(board_id)?;
        let color = pick_color(players.iter().map(|p| p.color().as_str()));
        Ok(self
            .repository
            .add_player(board_id, user_id.to_string(), name.to_string(), color.to_string())?)
    }

    /// Players of a board in join order.
    #[instrument(skip(self))]
    pub fn players(&self, board_id: i32) -> Result<Vec<Player>, ServiceError> {
        self.board(board_id)?;
        Ok(self.repository.list_players(board_id)?)
    }

    /// Moves a board from the lobby into play once it has enough topics.
    #[instrument(skip(self))]
    pub fn start_game(&self, board_id: i32, user_id: &str) -> Result<(), ServiceError> {
        self.hosted_board(board_id, user_id, "start the game")?;
        let count = self.repository.count_topics(board_id)?;
        if count < MIN_TOPICS {
            return Err(ServiceError::NotEnoughTopics {
                needed: MIN_TOPICS,
                remaining: topics_remaining(count),
            });
        }
        self.repository.set_board_status(board_id, BoardStatus::Playing)?;
        info!(topics = count, "Game started");
        Ok(())
    }

    /// Deals (or re-deals) the caller's card on a board.
    #[instrument(skip(self))]
    pub fn generate_card(&self, board_id: i32, player_id: i32, user_id: &str) -> Result<CardView, ServiceError> {
        self.own_player(board_id, player_id, user_id)?;
        let card = deal_card(&self.repository, board_id, player_id, &mut rand::thread_rng())?;
        Ok(CardView::new(player_id, board_id, &card))
    }

    /// The caller's stored card with topic text, for reloading a game in progress.
    #[instrument(skip(self))]
    pub fn my_card(&self, board_id: i32, player_id: i32, user_id: &str) -> Result<CardView, ServiceError> {
        self.own_player(board_id, player_id, user_id)?;
        let rows = self.repository.card_with_text(player_id, board_id)?;
        CardView::from_rows(player_id, board_id, &rows).ok_or(ServiceError::NotFound("Card"))
    }

    /// Another player's marks on the same board. The caller must be the host
    /// or have joined the board.
    #[instrument(skip(self))]
    pub fn player_marks(&self, board_id: i32, player_id: i32, user_id: &str) -> Result<MarksView, ServiceError> {
        let players = self.board_member(board_id, user_id)?;
        if !players.iter().any(|p| *p.id() == player_id) {
            return Err(ServiceError::NotFound("Player"));
        }
        let cells = self.repository.card_cells(player_id, board_id)?;
        let first = cells.first().ok_or(ServiceError::NotFound("Card"))?;
        Ok(MarksView {
            player_id,
            grid_size: *first.grid_size() as usize,
            cells: cells.iter().map(CardCell::state).collect(),
        })
    }

    /// Toggles a cell on the caller's card and reports any bingo.
    #[instrument(skip(self))]
    pub fn mark_cell(
        &self,
        board_id: i32,
        player_id: i32,
        user_id: &str,
        cell_index: usize,
    ) -> Result<MarkOutcome, ServiceError> {
        self.own_player(board_id, player_id, user_id)?;
        toggle_cell(&self.repository, board_id, player_id, cell_index)
    }

    /// Deletes every card and bingo event on the board.
    #[instrument(skip(self))]
    pub fn reset_game(&self, board_id: i32, user_id: &str) -> Result<(), ServiceError> {
        self.hosted_board(board_id, user_id, "reset")?;
        self.repository.reset_board(board_id)?;
        Ok(())
    }

    /// Wins per player on the board, most wins first, ties by join order.
    #[instrument(skip(self))]
    pub fn leaderboard(&self, board_id: i32) -> Result<Vec<LeaderboardEntry>, ServiceError> {
        self.board(board_id)?;
        let players = self.repository.list_players(board_id)?;
        let mut entries: Vec<LeaderboardEntry> = self
            .repository
            .win_counts(board_id)?
            .into_iter()
            .map(|(player_id, wins)| {
                let player = players.iter().find(|p| *p.id() == player_id);
                LeaderboardEntry {
                    player_id,
                    name: player.map_or_else(|| "Unknown".to_string(), |p| p.name().clone()),
                    color: player.map_or(UNKNOWN_COLOR, |p| p.color().as_str()).to_string(),
                    wins: wins.max(0) as u64,
                }
            })
            .collect();
        entries.sort_by(|a, b| b.wins.cmp(&a.wins).then(a.player_id.cmp(&b.player_id)));
        Ok(entries)
    }

    /// Bingo events on the board, oldest first.
    #[instrument(skip(self))]
    pub fn bingo_events(&self, board_id: i32) -> Result<Vec<BingoEvent>, ServiceError> {
        self.board(board_id)?;
        Ok(self.repository.list_bingo_events(board_id)?)
    }
}
