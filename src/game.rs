//! Game layer for LED-A-Gogo.
//!
//! Implements the territory-capture rules on a fixed grid:
//! - Board geometry, hitboxes and collision dispatch
//! - Per-player occupancy matrices and rectangle-closure search
//! - Players with movement, score ladder and power-up timers
//! - Timed pickups
//! - The per-tick session update

mod board;
mod events;
mod invariants;
mod player;
mod powerup;
mod rng;
mod scoring;
mod state;
mod territory;

pub use board::{Board, Cell, Entity, Hitbox};
pub use events::{EndReason, GameEvent};
pub use invariants::{assert_invariants, check_invariants, InvariantViolation};
pub use player::{Direction, InputSource, KeyboardInput, Player, PlayerId, PowerUpState};
pub use powerup::{PowerUp, PowerUpPool};
pub use scoring::{ScoreLadder, ScoreUpdate, ThresholdPolicy};
pub use state::SessionState;
pub use territory::{find_smallest_rectangle, BoolMatrix, Claim, RectangleSearch, TerritoryGrid};

/// Maximum number of players in a session.
pub const MAX_PLAYERS: usize = 4;

/// Number of LEDs on the threshold ladder.
pub const LED_COUNT: usize = 8;
