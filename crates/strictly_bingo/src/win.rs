//! Win detection over a player's marked cells.

use std::collections::HashSet;

use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{BingoError, WinningLine, cell_count, line_kinds};

/// Marked state of one cell, as read back from the card store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, new)]
#[serde(rename_all = "camelCase")]
pub struct CellState {
    /// Row-major cell index.
    pub cell_index: usize,
    /// Whether the cell is marked.
    pub marked: bool,
}

/// Outcome of a bingo check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoResult {
    bingo: bool,
    winning_line: Option<Vec<usize>>,
}

impl BingoResult {
    /// No line is complete.
    pub fn none() -> Self {
        Self {
            bingo: false,
            winning_line: None,
        }
    }

    /// `line` is fully marked.
    pub fn won(line: WinningLine) -> Self {
        Self {
            bingo: true,
            winning_line: Some(line.into_cells()),
        }
    }

    /// Whether some line is complete.
    pub fn bingo(&self) -> bool {
        self.bingo
    }

    /// The reported line, present exactly when [`bingo`](Self::bingo) is true.
    pub fn winning_line(&self) -> Option<&[usize]> {
        self.winning_line.as_deref()
    }
}

/// Checks whether the marked cells complete any line of a `grid_size` grid.
///
/// Unmarked cells may be left out of `cells`. Returns the first complete
/// line in row, column, main diagonal, anti-diagonal order.
///
/// # Errors
///
/// [`BingoError::InvalidGridSize`] for a zero grid size or one whose cell
/// count overflows,
/// [`BingoError::EmptyCard`] when `cells` is empty, and
/// [`BingoError::CellOutOfRange`] for an index past the last cell.
#[instrument(skip(cells), fields(cells = cells.len()))]
pub fn check_bingo(cells: &[CellState], grid_size: usize) -> Result<BingoResult, BingoError> {
    let total = match cell_count(grid_size) {
        Some(total) if total > 0 => total,
        _ => return Err(BingoError::InvalidGridSize),
    };
    if cells.is_empty() {
        return Err(BingoError::EmptyCard);
    }

    let mut marked = HashSet::with_capacity(cells.len());
    for cell in cells {
        if cell.cell_index >= total {
            return Err(BingoError::CellOutOfRange {
                index: cell.cell_index,
                grid_size,
            });
        }
        if cell.marked {
            marked.insert(cell.cell_index);
        }
    }

    // Every line has grid_size cells.
    if marked.len() < grid_size {
        return Ok(BingoResult::none());
    }

    let winner = line_kinds(grid_size)
        .find(|kind| kind.cell_indices(grid_size).all(|i| marked.contains(&i)));

    match winner {
        Some(kind) => {
            let line = WinningLine::new(kind, grid_size);
            debug!(%kind, cells = ?line.cells(), "Line complete");
            Ok(BingoResult::won(line))
        }
        None => Ok(BingoResult::none()),
    }
}
