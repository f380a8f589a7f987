//! Card assembly: one player's grid dealt from the board's topic pool.

use derive_getters::Getters;
use derive_new::new;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{BingoError, BingoResult, CellState, cell_count, check_bingo, shuffle_with, topics_needed};

/// Label shown on the free center cell.
pub const FREE_LABEL: &str = "FREE";

/// Topic identifier as issued by the topic store.
pub type TopicId = i32;

/// A crowd-sourced phrase that can be placed on a card.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Getters, new)]
pub struct Topic {
    id: TopicId,
    text: String,
}

/// One grid position on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct Cell {
    index: usize,
    topic: Option<Topic>,
    marked: bool,
}

impl Cell {
    /// The pre-marked free cell.
    fn free(index: usize) -> Self {
        Self {
            index,
            topic: None,
            marked: true,
        }
    }

    /// An unmarked cell carrying `topic`.
    fn with_topic(index: usize, topic: Topic) -> Self {
        Self {
            index,
            topic: Some(topic),
            marked: false,
        }
    }

    /// Whether this is the free cell.
    pub fn is_free(&self) -> bool {
        self.topic.is_none()
    }

    /// Identifier of the placed topic, absent on the free cell.
    pub fn topic_id(&self) -> Option<TopicId> {
        self.topic.as_ref().map(|t| t.id)
    }

    /// Text to render in the cell.
    pub fn display_text(&self) -> &str {
        self.topic.as_ref().map_or(FREE_LABEL, |t| t.text.as_str())
    }
}

/// Index of the free cell on a `grid_size` grid.
pub fn center_index(grid_size: usize) -> usize {
    grid_size.saturating_mul(grid_size) / 2
}

/// A player's card: `grid_size * grid_size` cells in row-major order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Getters)]
pub struct Card {
    grid_size: usize,
    cells: Vec<Cell>,
}

impl Card {
    /// Index of this card's free cell.
    pub fn center_index(&self) -> usize {
        center_index(self.grid_size)
    }

    /// The free cell.
    pub fn free_cell(&self) -> &Cell {
        &self.cells[self.center_index()]
    }

    /// Cell at `index`, if it exists.
    pub fn cell(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index)
    }

    /// Flips the marked state of a topic cell and returns the new state.
    ///
    /// # Errors
    ///
    /// [`BingoError::CellOutOfRange`] for a missing cell,
    /// [`BingoError::FreeCell`] for the center.
    #[instrument(skip(self), fields(grid_size = self.grid_size))]
    pub fn toggle(&mut self, index: usize) -> Result<bool, BingoError> {
        let grid_size = self.grid_size;
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(BingoError::CellOutOfRange { index, grid_size })?;
        if cell.is_free() {
            return Err(BingoError::FreeCell);
        }
        cell.marked = !cell.marked;
        Ok(cell.marked)
    }

    /// Marked state of every cell, ready for [`check_bingo`].
    pub fn cell_states(&self) -> Vec<CellState> {
        self.cells
            .iter()
            .map(|c| CellState::new(c.index, c.marked))
            .collect()
    }

    /// Runs win detection on the card's current marks.
    pub fn check(&self) -> Result<BingoResult, BingoError> {
        check_bingo(&self.cell_states(), self.grid_size)
    }
}

/// Deals a card from `topics` using the thread RNG.
///
/// See [`assemble_card_with`].
pub fn assemble_card(topics: &[Topic], grid_size: usize) -> Result<Card, BingoError> {
    assemble_card_with(topics, grid_size, &mut rand::thread_rng())
}

/// Deals a card from `topics`, drawing the shuffle from `rng`.
///
/// The pool is shuffled and the first `grid_size² - 1` topics fill every
/// cell except the center, which is the free cell and starts marked.
/// Dealing twice from the same pool gives different cards.
///
/// # Errors
///
/// [`BingoError::InvalidGridSize`] for a zero or overflowing grid size and
/// [`BingoError::InsufficientTopics`] when the pool cannot fill the card.
#[instrument(skip(topics, rng), fields(pool = topics.len()))]
pub fn assemble_card_with<R: Rng + ?Sized>(
    topics: &[Topic],
    grid_size: usize,
    rng: &mut R,
) -> Result<Card, BingoError> {
    let total = match cell_count(grid_size) {
        Some(total) if total > 0 => total,
        _ => return Err(BingoError::InvalidGridSize),
    };
    let needed = topics_needed(grid_size);
    if topics.len() < needed {
        return Err(BingoError::InsufficientTopics {
            needed,
            available: topics.len(),
        });
    }

    let center = center_index(grid_size);
    let mut picked = shuffle_with(topics, rng).into_iter().take(needed);

    let mut cells = Vec::with_capacity(total);
    for index in 0..total {
        if index == center {
            cells.push(Cell::free(index));
        } else if let Some(topic) = picked.next() {
            cells.push(Cell::with_topic(index, topic));
        }
    }

    debug!(total, center, "Card assembled");
    Ok(Card { grid_size, cells })
}
