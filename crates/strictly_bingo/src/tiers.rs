//! Grid sizing: how big a card the topic pool can support.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// A sizing rule: a pool of at least `need` topics gets a `size`x`size` card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridTier {
    /// Side length of the grid.
    pub size: usize,
    /// Minimum topic count for this tier.
    pub need: usize,
}

/// Sizing tiers, ascending by `need`.
pub const GRID_TIERS: [GridTier; 3] = [
    GridTier { size: 3, need: 8 },
    GridTier { size: 4, need: 15 },
    GridTier { size: 5, need: 24 },
];

/// Topics a board needs before the first card can be dealt.
pub const MIN_TOPICS: usize = GRID_TIERS[0].need;

/// Returns the grid side length for a pool of `topic_count` topics.
///
/// Scans from the largest tier down and picks the first one whose `need`
/// is met. Pools below the smallest tier still get the smallest size;
/// enforcing [`MIN_TOPICS`] is the caller's job.
#[instrument]
pub fn grid_size_for(topic_count: usize) -> usize {
    GRID_TIERS
        .iter()
        .rev()
        .find(|tier| topic_count >= tier.need)
        .unwrap_or(&GRID_TIERS[0])
        .size
}

/// Whether `size` is the side length of one of the [`GRID_TIERS`].
pub fn is_tier_size(size: usize) -> bool {
    GRID_TIERS.iter().any(|tier| tier.size == size)
}

/// Number of cells on a `grid_size` grid, `None` if it overflows `usize`.
pub fn cell_count(grid_size: usize) -> Option<usize> {
    grid_size.checked_mul(grid_size)
}

/// Topics consumed by a card of the given side length (every cell but the free one).
///
/// Saturates at `usize::MAX` for side lengths whose cell count overflows.
pub fn topics_needed(grid_size: usize) -> usize {
    grid_size.saturating_mul(grid_size).saturating_sub(1)
}

/// How many more topics a board needs before play can start.
pub fn topics_remaining(topic_count: usize) -> usize {
    MIN_TOPICS.saturating_sub(topic_count)
}
