//! Strictly Bingo server - boards, cards and win events over HTTP
//!
//! Wraps the pure [`strictly_bingo`] core with everything a running game
//! needs around it.
//!
//! # Architecture
//!
//! - **Db**: SQLite persistence via diesel (boards, topics, players, cards, bingo events)
//! - **Store**: the topic, card and win-event seams the game flows depend on
//! - **Service**: host and player operations with ownership checks, roster
//!   colors, card reloads and the win leaderboard
//! - **Http**: axum REST API, including the stateless size/assemble/check calls
//! - **Config**: TOML server configuration

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod db;
mod http;
mod service;
mod store;

pub use config::{ConfigError, ServerConfig};
pub use db::{
    BingoEvent, BingoRepository, Board, BoardStatus, BoardTopic, CardCell, DbError, MIGRATIONS,
    NewBingoEvent, NewBoard, NewCardCell, NewPlayer, NewTopic, Player, run_migrations,
};
pub use http::{
    AddTopicRequest, ApiError, AssembleRequest, AssembleResponse, BoardRequest, Caller,
    CheckRequest, CreateBoardRequest, EventView, GenerateCardRequest, JoinRequest,
    MarkCellRequest, RewardRequest, SizeRequest, USER_HEADER, router, serve,
};
pub use service::{
    BingoService, CardView, CellView, LeaderboardEntry, MarkOutcome, MarksView, PLAYER_COLORS,
    ServiceError, deal_card, pick_color, toggle_cell,
};
pub use store::{CardStore, TopicSource, WinEventSink};
