//! Timed pickups.
//!
//! One pickup appears on every multiple of the spawn interval (never twice
//! for the same second) at a random playable cell, and disappears when
//! collected or when its validity countdown reaches zero.

use serde::Serialize;

use crate::config::PowerUpConfig;
use crate::game::player::remaining;
use crate::game::rng::Rng;
use crate::game::{Board, Cell};

/// A pickup lying on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PowerUp {
    /// Cell the pickup occupies.
    pub cell: Cell,
    /// Elapsed second at which it appeared.
    pub spawned_at: u32,
    /// Initial validity in seconds.
    pub validity: u32,
}

impl PowerUp {
    /// Seconds until the pickup disappears.
    #[must_use]
    pub const fn remaining(&self, now: u32) -> u32 {
        remaining(self.validity, self.spawned_at, now)
    }
}

/// The set of pickups currently on the board.
#[derive(Debug, Clone)]
pub struct PowerUpPool {
    pickups: Vec<PowerUp>,
    last_spawn: Option<u32>,
    interval: u32,
    validity: u32,
    rng: Rng,
}

impl PowerUpPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new(config: &PowerUpConfig, seed: u64) -> Self {
        Self {
            pickups: Vec::new(),
            last_spawn: None,
            interval: config.spawn_interval_secs,
            validity: config.pickup_validity_secs,
            rng: Rng::new(seed),
        }
    }

    /// Spawn a pickup if `now` is a fresh spawn boundary.
    pub fn maybe_spawn(&mut self, now: u32, board: &Board) -> Option<PowerUp> {
        if now == 0 || self.interval == 0 || now % self.interval != 0 || self.last_spawn == Some(now) {
            return None;
        }
        self.last_spawn = Some(now);

        let cell = self.rng.playable_cell(board);
        let pickup = PowerUp {
            cell,
            spawned_at: now,
            validity: self.validity,
        };
        self.pickups.push(pickup);
        Some(pickup)
    }

    /// Remove every pickup whose validity has run out, returning them.
    pub fn decay(&mut self, now: u32) -> Vec<PowerUp> {
        let (expired, live): (Vec<_>, Vec<_>) =
            self.pickups.drain(..).partition(|p| p.remaining(now) == 0);
        self.pickups = live;
        expired
    }

    /// Remove and return the pickup on `cell`, if any.
    pub fn take_at(&mut self, cell: Cell) -> Option<PowerUp> {
        let idx = self.pickups.iter().position(|p| p.cell == cell)?;
        Some(self.pickups.remove(idx))
    }

    /// Remove every pickup.
    pub fn clear(&mut self) -> Vec<PowerUp> {
        std::mem::take(&mut self.pickups)
    }

    /// Pickups currently on the board.
    pub fn iter(&self) -> impl Iterator<Item = &PowerUp> {
        self.pickups.iter()
    }

    /// Number of pickups on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pickups.len()
    }

    /// Whether the board has no pickups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pickups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;

    fn setup() -> (PowerUpPool, Board) {
        (
            PowerUpPool::new(&PowerUpConfig::default(), 7),
            Board::new(&BoardConfig::default()),
        )
    }

    #[test]
    fn test_spawns_once_per_boundary() {
        let (mut pool, board) = setup();
        assert!(pool.maybe_spawn(0, &board).is_none());
        assert!(pool.maybe_spawn(14, &board).is_none());
        let pickup = pool.maybe_spawn(15, &board).unwrap();
        assert!(board.is_playable(pickup.cell));
        // Sixty ticks land in the same second.
        for _ in 0..59 {
            assert!(pool.maybe_spawn(15, &board).is_none());
        }
        assert_eq!(pool.len(), 1);
        assert!(pool.maybe_spawn(30, &board).is_some());
    }

    #[test]
    fn test_spawned_cells_are_playable() {
        let (mut pool, board) = setup();
        for boundary in 1..200 {
            if let Some(p) = pool.maybe_spawn(boundary * 15, &board) {
                assert!(board.is_playable(p.cell));
            }
        }
        assert_eq!(pool.len(), 199);
    }

    #[test]
    fn test_pickup_decays_after_validity() {
        let (mut pool, board) = setup();
        pool.maybe_spawn(15, &board);
        assert!(pool.decay(21).is_empty());
        assert_eq!(pool.iter().next().unwrap().remaining(21), 1);
        let expired = pool.decay(22);
        assert_eq!(expired.len(), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_take_and_clear() {
        let (mut pool, board) = setup();
        let a = pool.maybe_spawn(15, &board).unwrap();
        pool.maybe_spawn(30, &board);
        assert_eq!(pool.take_at(a.cell).map(|p| p.spawned_at), Some(15));
        assert_eq!(pool.clear().len(), 1);
        assert!(pool.is_empty());
    }
}
