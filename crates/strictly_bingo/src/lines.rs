//! Line enumeration for square grids.
//!
//! Lines come out in a fixed order: rows top to bottom, columns left to
//! right, the main diagonal, then the anti-diagonal. Win detection reports
//! the first fully marked line in this order, so when one toggle completes
//! several lines the row wins over the column and both win over diagonals.

use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Which row, column or diagonal a line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum LineKind {
    /// Row `r`, counted from the top.
    #[display("row {}", _0)]
    Row(usize),
    /// Column `c`, counted from the left.
    #[display("column {}", _0)]
    Column(usize),
    /// Top-left to bottom-right.
    #[display("main diagonal")]
    MainDiagonal,
    /// Top-right to bottom-left.
    #[display("anti-diagonal")]
    AntiDiagonal,
}

impl LineKind {
    /// Row-major cell indices along this line of a `grid_size` grid, in walk order.
    ///
    /// Indices are produced on demand, so a scan can stop at the first
    /// unmarked cell without building the line.
    pub fn cell_indices(self, grid_size: usize) -> impl Iterator<Item = usize> {
        let n = grid_size;
        (0..n).map(move |i| match self {
            LineKind::Row(r) => r * n + i,
            LineKind::Column(c) => i * n + c,
            LineKind::MainDiagonal => i * n + i,
            LineKind::AntiDiagonal => i * n + (n - 1 - i),
        })
    }
}

/// Every line kind of a `grid_size` grid, lazily, in win-priority order.
pub fn line_kinds(grid_size: usize) -> impl Iterator<Item = LineKind> {
    let rows = (0..grid_size).map(LineKind::Row);
    let cols = (0..grid_size).map(LineKind::Column);
    rows.chain(cols).chain([LineKind::MainDiagonal, LineKind::AntiDiagonal])
}

/// A full row, column or diagonal, as row-major cell indices in walk order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WinningLine {
    kind: LineKind,
    cells: Vec<usize>,
}

impl WinningLine {
    /// Builds the line of the given kind on a `grid_size` grid.
    pub fn new(kind: LineKind, grid_size: usize) -> Self {
        Self {
            kind,
            cells: kind.cell_indices(grid_size).collect(),
        }
    }

    /// Which line this is.
    pub fn kind(&self) -> LineKind {
        self.kind
    }

    /// Cell indices along the line.
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// Consumes the line, returning its cell indices.
    pub fn into_cells(self) -> Vec<usize> {
        self.cells
    }
}

/// Every line of a `grid_size` grid, `2 * grid_size + 2` in total, in win-priority order.
#[instrument]
pub fn lines(grid_size: usize) -> Vec<WinningLine> {
    line_kinds(grid_size)
        .map(|kind| WinningLine::new(kind, grid_size))
        .collect()
}
