//! Board geometry and collision shapes.
//!
//! The field is a grid of square cells. Entities live in continuous pixel
//! space where cell `(x, y)` covers `[x * tile, (x + 1) * tile)` on each
//! axis. Only the playable sub-rectangle can be claimed; the ring of cells
//! around it is a collidable border.

use serde::Serialize;

use crate::config::BoardConfig;
use crate::game::PlayerId;

/// A cell on the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Cell {
    /// Column.
    pub x: u16,
    /// Row.
    pub y: u16,
}

impl Cell {
    /// Create a new cell coordinate.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl Hitbox {
    /// Create a new hitbox.
    #[must_use]
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Whether the two rectangles overlap with positive area.
    ///
    /// Touching edges do not count as a collision.
    #[must_use]
    pub fn intersects(&self, other: &Hitbox) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    /// The same rectangle moved by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.w, self.h)
    }
}

/// Everything that takes part in collision and overlap checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entity {
    /// A player token with its current hitbox.
    Player {
        /// Owner of the token.
        id: PlayerId,
        /// Current hitbox.
        hitbox: Hitbox,
    },
    /// A claimable tile of the playable territory.
    Tile(Cell),
    /// A pickup lying on a tile.
    PowerUp(Cell),
    /// One cell of the border ring.
    BorderSegment(Cell),
}

impl Entity {
    /// Pixel bounds of the entity.
    ///
    /// Tiles and pickups use a small box at the cell centre so that a player
    /// token overlaps at most one of them at a time. Border segments fill
    /// their whole cell.
    #[must_use]
    pub fn bounds(&self, board: &Board) -> Hitbox {
        match *self {
            Entity::Player { hitbox, .. } => hitbox,
            Entity::Tile(cell) | Entity::PowerUp(cell) => board.center_marker(cell),
            Entity::BorderSegment(cell) => board.cell_bounds(cell),
        }
    }

    /// Whether a moving player is blocked by this entity.
    #[must_use]
    pub const fn is_solid(&self) -> bool {
        matches!(self, Entity::Player { .. } | Entity::BorderSegment(_))
    }
}

/// Immutable field geometry.
#[derive(Debug, Clone)]
pub struct Board {
    cols: u16,
    rows: u16,
    origin: Cell,
    width: u16,
    height: u16,
    tile_size: f32,
    border: Vec<Cell>,
}

impl Board {
    /// Build the board described by a validated [`BoardConfig`].
    #[must_use]
    pub fn new(config: &BoardConfig) -> Self {
        let [ox, oy] = config.playable_origin;
        let [width, height] = config.playable_size;
        let origin = Cell::new(ox, oy);

        // Ring of cells one step outside the playable territory, corners included.
        // Saturating so an unvalidated config degrades instead of panicking.
        let (left, top) = (ox.saturating_sub(1), oy.saturating_sub(1));
        let (right, bottom) = (ox.saturating_add(width), oy.saturating_add(height));
        let mut border = Vec::with_capacity(2 * (usize::from(width) + usize::from(height)) + 4);
        for x in left..=right {
            border.push(Cell::new(x, top));
            border.push(Cell::new(x, bottom));
        }
        for y in oy..bottom {
            border.push(Cell::new(left, y));
            border.push(Cell::new(right, y));
        }

        Self {
            cols: config.cols,
            rows: config.rows,
            origin,
            width,
            height,
            tile_size: config.tile_size,
            border,
        }
    }

    /// Columns of the whole field.
    #[must_use]
    pub const fn cols(&self) -> u16 {
        self.cols
    }

    /// Rows of the whole field.
    #[must_use]
    pub const fn rows(&self) -> u16 {
        self.rows
    }

    /// Width of the playable territory in cells.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Height of the playable territory in cells.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// Top-left cell of the playable territory.
    #[must_use]
    pub const fn origin(&self) -> Cell {
        self.origin
    }

    /// Edge length of a cell in pixels.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// The border ring.
    #[must_use]
    pub fn border(&self) -> &[Cell] {
        &self.border
    }

    /// Whether the cell belongs to the playable territory.
    #[must_use]
    pub const fn is_playable(&self, cell: Cell) -> bool {
        cell.x >= self.origin.x
            && cell.y >= self.origin.y
            && cell.x - self.origin.x < self.width
            && cell.y - self.origin.y < self.height
    }

    /// Whether the cell is part of the border ring.
    #[must_use]
    pub fn is_border(&self, cell: Cell) -> bool {
        self.border.contains(&cell)
    }

    /// Index of a playable cell in the occupancy matrices.
    #[must_use]
    pub fn local(&self, cell: Cell) -> Option<(usize, usize)> {
        self.is_playable(cell).then(|| {
            (
                usize::from(cell.x - self.origin.x),
                usize::from(cell.y - self.origin.y),
            )
        })
    }

    /// Field cell for an occupancy-matrix index.
    ///
    /// Indices come from matrices sized to the playable territory, so they
    /// always fit in `u16`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn field(&self, x: usize, y: usize) -> Cell {
        Cell::new(self.origin.x.saturating_add(x as u16), self.origin.y.saturating_add(y as u16))
    }

    /// Iterate over every playable cell, column-major like the occupancy matrices.
    pub fn playable_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..usize::from(self.width))
            .flat_map(move |x| (0..usize::from(self.height)).map(move |y| self.field(x, y)))
    }

    /// Full pixel bounds of a cell.
    #[must_use]
    pub fn cell_bounds(&self, cell: Cell) -> Hitbox {
        let t = self.tile_size;
        Hitbox::new(f32::from(cell.x) * t, f32::from(cell.y) * t, t, t)
    }

    /// 2×2 px marker at the centre of a cell.
    #[must_use]
    pub fn center_marker(&self, cell: Cell) -> Hitbox {
        let b = self.cell_bounds(cell);
        let half = self.tile_size / 2.0;
        Hitbox::new(b.x + half - 1.0, b.y + half - 1.0, 2.0, 2.0)
    }

    /// Player token hitbox when standing on `cell`: the cell inset by one pixel.
    #[must_use]
    pub fn token_at(&self, cell: Cell) -> Hitbox {
        let b = self.cell_bounds(cell);
        Hitbox::new(b.x + 1.0, b.y + 1.0, b.w - 2.0, b.h - 2.0)
    }

    /// Solid border entities.
    pub fn border_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.border.iter().copied().map(Entity::BorderSegment)
    }

    /// The playable tile under a token, if its hitbox covers a tile centre.
    #[must_use]
    pub fn tile_under(&self, hitbox: &Hitbox) -> Option<Cell> {
        self.playable_cells()
            .find(|&cell| Entity::Tile(cell).bounds(self).intersects(hitbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> Board {
        Board::new(&BoardConfig::default())
    }

    #[test]
    fn test_unvalidated_extremes_do_not_panic() {
        let config = BoardConfig {
            playable_origin: [0, u16::MAX],
            playable_size: [2, u16::MAX],
            ..BoardConfig::default()
        };
        let board = Board::new(&config);
        assert!(board.is_playable(Cell::new(1, u16::MAX)));
        assert!(!board.is_playable(Cell::new(2, u16::MAX)));
        assert_eq!(board.field(0, 1), Cell::new(0, u16::MAX));
    }

    #[test]
    fn test_border_ring_surrounds_territory() {
        let board = board();
        // 8x8 territory: 10 cells on top and bottom rows, 8 on each side.
        assert_eq!(board.border().len(), 36);
        assert!(board.is_border(Cell::new(8, 4)));
        assert!(board.is_border(Cell::new(17, 13)));
        assert!(board.is_border(Cell::new(8, 9)));
        assert!(!board.is_border(Cell::new(9, 5)));
        for cell in board.border() {
            assert!(!board.is_playable(*cell));
        }
    }

    #[test]
    fn test_local_and_field_round_trip() {
        let board = board();
        assert_eq!(board.local(Cell::new(9, 5)), Some((0, 0)));
        assert_eq!(board.local(Cell::new(16, 12)), Some((7, 7)));
        assert_eq!(board.local(Cell::new(17, 12)), None);
        assert_eq!(board.field(7, 7), Cell::new(16, 12));
        assert_eq!(board.playable_cells().count(), 64);
    }

    #[test]
    fn test_hitbox_edges_do_not_collide() {
        let a = Hitbox::new(0.0, 0.0, 10.0, 10.0);
        let b = Hitbox::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
        assert!(a.translated(0.5, 0.0).intersects(&b));
    }

    #[test]
    fn test_token_covers_exactly_its_tile() {
        let board = board();
        let cell = Cell::new(12, 8);
        let token = board.token_at(cell);
        assert_eq!(board.tile_under(&token), Some(cell));

        // Half way between two tiles the token sees neither centre.
        let between = token.translated(12.0, 0.0);
        assert_eq!(board.tile_under(&between), None);
        assert_eq!(board.tile_under(&token.translated(24.0, 0.0)), Some(Cell::new(13, 8)));
    }

    #[test]
    fn test_token_on_edge_tile_clears_border() {
        let board = board();
        let token = board.token_at(Cell::new(9, 5));
        assert!(!board.border_entities().any(|e| e.bounds(&board).intersects(&token)));
        let pushed = token.translated(-2.0, 0.0);
        assert!(board.border_entities().any(|e| e.bounds(&board).intersects(&pushed)));
    }

    #[test]
    fn test_entity_solidity() {
        assert!(Entity::BorderSegment(Cell::new(0, 0)).is_solid());
        assert!(!Entity::Tile(Cell::new(0, 0)).is_solid());
        assert!(!Entity::PowerUp(Cell::new(0, 0)).is_solid());
    }
}
