//! Deterministic pseudo-random numbers for pickup placement.

use crate::game::{Board, Cell};

/// Seeded xorshift64 stream; the same seed places pickups identically.
#[derive(Debug, Clone)]
pub(crate) struct Rng {
    state: u64,
}

impl Rng {
    /// Zero is a fixed point of xorshift, so it is swapped for a constant.
    #[must_use]
    pub(crate) const fn new(seed: u64) -> Self {
        let state = if seed == 0 { 0x5555_5555_5555_5555 } else { seed };
        Self { state }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform-ish index in `[0, bound)`; `0` when `bound` is zero.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn below(&mut self, bound: u16) -> u16 {
        if bound == 0 {
            return 0;
        }
        (self.next_u64() % u64::from(bound)) as u16
    }

    /// A playable cell, column drawn before row.
    pub(crate) fn playable_cell(&mut self, board: &Board) -> Cell {
        let x = self.below(board.width());
        let y = self.below(board.height());
        board.field(usize::from(x), usize::from(y))
    }
}
