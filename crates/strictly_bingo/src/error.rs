//! Invalid-input errors for card assembly and win detection.

/// Precondition violation reported by the pure bingo operations.
///
/// None of these are transient. Callers surface them to the user
/// (typically as "not enough topics yet") and never retry.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
pub enum BingoError {
    /// Grid side length was zero, or too large to count its cells.
    #[display("Grid size must be at least 1 and small enough to fit its cells")]
    InvalidGridSize,

    /// Topic pool cannot fill every non-free cell.
    #[display("Need {needed} topics for this card, have {available}")]
    InsufficientTopics {
        /// Topics required (grid size squared, minus the free cell).
        needed: usize,
        /// Topics supplied.
        available: usize,
    },

    /// No cells were supplied for a non-empty grid.
    #[display("Card has no cells")]
    EmptyCard,

    /// A cell index does not fit the grid.
    #[display("Cell {index} is outside a {grid_size}x{grid_size} grid")]
    CellOutOfRange {
        /// Offending cell index.
        index: usize,
        /// Grid side length.
        grid_size: usize,
    },

    /// The free cell is always marked and cannot be toggled.
    #[display("Cannot toggle FREE cell")]
    FreeCell,
}

impl std::error::Error for BingoError {}
