//! Tile ownership and closed-rectangle detection.

use crate::game::{PlayerId, MAX_PLAYERS};

/// Dense boolean matrix stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl BoolMatrix {
    /// Create an all-false matrix.
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![false; rows * cols],
        }
    }

    /// Build a matrix from rows of 0/1 values.
    #[must_use]
    pub fn from_rows<const N: usize>(rows: &[[u8; N]]) -> Self {
        let mut matrix = Self::new(rows.len(), N);
        for (i, row) in rows.iter().enumerate() {
            for (j, &value) in row.iter().enumerate() {
                matrix.set(i, j, value != 0);
            }
        }
        matrix
    }

    /// Number of rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Value at `(row, col)`; out-of-range reads are `false`.
    #[must_use]
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        row < self.rows && col < self.cols && self.cells[row * self.cols + col]
    }

    /// Set the value at `(row, col)`. Out-of-range writes are ignored.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        if row < self.rows && col < self.cols {
            self.cells[row * self.cols + col] = value;
        }
    }

    /// Number of `true` cells.
    #[must_use]
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }
}

/// Outcome of [`find_smallest_rectangle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RectangleSearch {
    /// `(row, col)` of the top-left corner, or `(-1, -1)` when nothing was found.
    pub anchor: (isize, isize),
    /// Width in columns.
    pub width: usize,
    /// Height in rows.
    pub height: usize,
    /// `(row, col)` of every border cell: top row left to right, right column
    /// top to bottom, bottom row left to right, left column top to bottom.
    /// Corners appear once, in the row segments.
    pub perimeter: Vec<(usize, usize)>,
}

impl RectangleSearch {
    /// The "no rectangle" result.
    pub const NOT_FOUND: Self = Self {
        anchor: (-1, -1),
        width: 0,
        height: 0,
        perimeter: Vec::new(),
    };

    /// Whether a rectangle was found.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        self.anchor.0 >= 0
    }

    /// Enclosed area, which is the score awarded for closing it.
    #[must_use]
    pub const fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Find the smallest rectangle whose border cells are all set.
///
/// Candidates are tried by height, then width, then anchor row, then anchor
/// column, all ascending; the first match is returned. Interior cells are
/// not inspected. The scan is exhaustive (`O(rows² · cols²)` candidates),
/// which is fine for board-sized matrices.
#[must_use]
#[allow(clippy::cast_possible_wrap)]
pub fn find_smallest_rectangle(
    matrix: &BoolMatrix,
    min_height: usize,
    min_width: usize,
) -> RectangleSearch {
    let rows = matrix.rows();
    let cols = matrix.cols();

    for height in min_height.max(1)..=rows {
        for width in min_width.max(1)..=cols {
            for i in 0..=rows - height {
                for j in 0..=cols - width {
                    if is_closed(matrix, i, j, height, width) {
                        return RectangleSearch {
                            anchor: (i as isize, j as isize),
                            width,
                            height,
                            perimeter: perimeter(i, j, height, width),
                        };
                    }
                }
            }
        }
    }

    RectangleSearch::NOT_FOUND
}

fn is_closed(matrix: &BoolMatrix, i: usize, j: usize, height: usize, width: usize) -> bool {
    let bottom = i + height - 1;
    let right = j + width - 1;
    (0..width).all(|x| matrix.get(i, j + x))
        && (0..width).all(|x| matrix.get(bottom, j + x))
        && (1..height.saturating_sub(1)).all(|y| matrix.get(i + y, j))
        && (1..height.saturating_sub(1)).all(|y| matrix.get(i + y, right))
}

fn perimeter(i: usize, j: usize, height: usize, width: usize) -> Vec<(usize, usize)> {
    let bottom = i + height - 1;
    let right = j + width - 1;
    let sides = 1..height.saturating_sub(1);

    let mut cells = Vec::with_capacity(2 * width + 2 * sides.len());
    cells.extend((0..width).map(|x| (i, j + x)));
    // A one-row rectangle has the same top and bottom row.
    cells.extend(sides.clone().map(|y| (i + y, right)));
    if bottom != i {
        cells.extend((0..width).map(|x| (bottom, j + x)));
    }
    if right != j {
        cells.extend(sides.map(|y| (i + y, j)));
    }
    cells
}

/// Result of a claim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// Whether the tile changed hands.
    pub changed: bool,
    /// Owner before the claim.
    pub previous: Option<PlayerId>,
}

/// Per-player occupancy matrices over the playable territory.
///
/// Matrices are indexed `[x][y]`: rows run along the board's x axis. At most
/// one player owns any cell.
#[derive(Debug, Clone)]
pub struct TerritoryGrid {
    width: usize,
    height: usize,
    status: [BoolMatrix; MAX_PLAYERS],
}

impl TerritoryGrid {
    /// Create an unclaimed grid.
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            status: std::array::from_fn(|_| BoolMatrix::new(width, height)),
        }
    }

    /// Width in cells.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    fn slot(player: PlayerId) -> Option<usize> {
        let idx = usize::from(player).checked_sub(1)?;
        (idx < MAX_PLAYERS).then_some(idx)
    }

    /// Occupancy matrix of a player.
    #[must_use]
    pub fn matrix(&self, player: PlayerId) -> Option<&BoolMatrix> {
        Self::slot(player).map(|idx| &self.status[idx])
    }

    /// Owner of a cell, if any.
    #[must_use]
    pub fn owner(&self, x: usize, y: usize) -> Option<PlayerId> {
        self.status
            .iter()
            .position(|m| m.get(x, y))
            .and_then(|idx| PlayerId::try_from(idx + 1).ok())
    }

    /// Mark a cell as claimed by `player`, clearing every other claim on it.
    ///
    /// Unknown players and out-of-range cells leave the grid untouched.
    pub fn claim(&mut self, player: PlayerId, x: usize, y: usize) -> Claim {
        let previous = self.owner(x, y);
        let Some(slot) = Self::slot(player) else {
            return Claim { changed: false, previous };
        };
        if x >= self.width || y >= self.height || previous == Some(player) {
            return Claim { changed: false, previous };
        }

        for (idx, matrix) in self.status.iter_mut().enumerate() {
            matrix.set(x, y, idx == slot);
        }
        Claim { changed: true, previous }
    }

    /// Clear a player's claim on a cell.
    pub fn release(&mut self, player: PlayerId, x: usize, y: usize) {
        if let Some(slot) = Self::slot(player) {
            self.status[slot].set(x, y, false);
        }
    }

    /// Number of cells held by a player.
    #[must_use]
    pub fn claimed_count(&self, player: PlayerId) -> usize {
        self.matrix(player).map_or(0, BoolMatrix::count)
    }

    /// Search a player's matrix for the smallest closed rectangle.
    #[must_use]
    pub fn closed_rectangle(
        &self,
        player: PlayerId,
        min_height: usize,
        min_width: usize,
    ) -> RectangleSearch {
        self.matrix(player).map_or(RectangleSearch::NOT_FOUND, |m| {
            find_smallest_rectangle(m, min_height, min_width)
        })
    }
}
