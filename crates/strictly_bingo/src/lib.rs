//! Strictly Bingo - card generation and win detection
//!
//! Pure, synchronous building blocks for a crowd-sourced bingo game. A host
//! collects topics, every player is dealt a unique card from that pool, and
//! each mark toggle is checked for a completed line.
//!
//! # Architecture
//!
//! - **Tiers**: map the topic pool size to a grid side length
//! - **Shuffle**: uniform Fisher-Yates over a copy, with an injectable RNG
//! - **Card**: deal the shuffled pool onto a grid around a free center cell
//! - **Lines / Win**: enumerate rows, columns and diagonals in a fixed order
//!   and report the first fully marked one
//!
//! Nothing here holds state or does I/O, so every function can be called
//! from any number of request handlers at once.
//!
//! # Example
//!
//! ```
//! use strictly_bingo::{Topic, assemble_card, grid_size_for};
//!
//! # fn example() -> Result<(), strictly_bingo::BingoError> {
//! let topics: Vec<Topic> = (1..=8)
//!     .map(|i| Topic::new(i, format!("prediction {i}")))
//!     .collect();
//!
//! let mut card = assemble_card(&topics, grid_size_for(topics.len()))?;
//! card.toggle(3)?;
//! card.toggle(5)?;
//! let result = card.check()?;
//! assert_eq!(result.winning_line(), Some(&[3, 4, 5][..]));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod card;
mod error;
mod lines;
mod shuffle;
mod tiers;
mod win;

pub use card::{Card, Cell, FREE_LABEL, Topic, TopicId, assemble_card, assemble_card_with, center_index};
pub use error::BingoError;
pub use lines::{LineKind, WinningLine, line_kinds, lines};
pub use shuffle::{shuffle, shuffle_with};
pub use tiers::{
    GRID_TIERS, GridTier, MIN_TOPICS, cell_count, grid_size_for, is_tier_size, topics_needed, topics_remaining,
};
pub use win::{BingoResult, CellState, check_bingo};
