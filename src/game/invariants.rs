//! Session invariants - sanity checks that detect bugs.
//!
//! None of these can be violated through normal play. They exist so tests
//! and long-running drivers can verify the tick logic after the fact.

use crate::game::{PowerUpState, SessionState};

/// Invariant violation error.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Description of the violated invariant.
    pub message: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invariant violation: {}", self.message)
    }
}

impl std::error::Error for InvariantViolation {}

/// Check all session invariants.
///
/// Returns a list of violations found, or empty if all invariants hold.
#[must_use]
pub fn check_invariants(state: &SessionState) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    let board = state.board();
    let grid = state.grid();
    let ladder = state.ladder();

    // Exclusive ownership
    for x in 0..grid.width() {
        for y in 0..grid.height() {
            let owners = state
                .players()
                .iter()
                .filter(|p| grid.matrix(p.id).is_some_and(|m| m.get(x, y)))
                .count();
            if owners > 1 {
                violations.push(InvariantViolation {
                    message: format!("Cell {:?} claimed by {owners} players", board.field(x, y)),
                });
            }
        }
    }

    for player in state.players() {
        if player.score > ladder.cap() {
            violations.push(InvariantViolation {
                message: format!(
                    "Player {} score {} exceeds cap {}",
                    player.id,
                    player.score,
                    ladder.cap()
                ),
            });
        }

        // The lit count may lag the score under single-step awards, never lead it.
        if player.active_leds > ladder.leds_for(player.score) {
            violations.push(InvariantViolation {
                message: format!(
                    "Player {} has {} LEDs lit with score {}",
                    player.id, player.active_leds, player.score
                ),
            });
        }

        let hitbox = player.hitbox();
        if board
            .border_entities()
            .any(|e| e.bounds(board).intersects(&hitbox))
        {
            violations.push(InvariantViolation {
                message: format!("Player {} overlaps the border", player.id),
            });
        }
        for other in state.players().iter().filter(|o| o.id > player.id) {
            if other.hitbox().intersects(&hitbox) {
                violations.push(InvariantViolation {
                    message: format!("Players {} and {} overlap", player.id, other.id),
                });
            }
        }

        let timers = state.power_up_config();
        let left = player.power_remaining(
            state.elapsed(),
            timers.held_validity_secs,
            timers.boost_duration_secs,
        );
        if left == Some(0) {
            let phase = match player.power {
                PowerUpState::Held { .. } => "held power-up",
                _ => "boost",
            };
            violations.push(InvariantViolation {
                message: format!("Player {} {phase} outlived its timer", player.id),
            });
        }
    }

    for pickup in state.pool().iter() {
        if !board.is_playable(pickup.cell) {
            violations.push(InvariantViolation {
                message: format!("Power-up at {:?} is off the playable territory", pickup.cell),
            });
        }
    }

    violations
}

/// Assert all session invariants hold, panicking if any are violated.
///
/// Only active in debug builds. No-op in release builds.
///
/// # Panics
///
/// Panics with detailed message if any invariant is violated.
#[cfg(debug_assertions)]
pub fn assert_invariants(state: &SessionState) {
    let violations = check_invariants(state);
    if !violations.is_empty() {
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        panic!("Session invariant violations:\n  - {}", messages.join("\n  - "));
    }
}

/// No-op in release builds.
#[cfg(not(debug_assertions))]
pub fn assert_invariants(_state: &SessionState) {}
