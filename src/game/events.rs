//! Observable outcomes of a tick.
//!
//! The simulation never renders or drives hardware itself. Everything an
//! outside collaborator needs (board view, LED ladder, event log) is
//! reported as a [`GameEvent`].

use std::fmt;

use serde::Serialize;

use crate::game::{Cell, PlayerId};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The time budget ran out.
    TimeUp,
    /// A player reached the top of the threshold ladder.
    MaxScore,
    /// The session was stopped from outside.
    Stopped,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EndReason::TimeUp => "time up",
            EndReason::MaxScore => "max score",
            EndReason::Stopped => "stopped",
        })
    }
}

/// Something that happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A tile changed owner (`None` = released).
    Occupancy {
        /// Field cell.
        cell: Cell,
        /// New owner.
        owner: Option<PlayerId>,
    },
    /// A closed rectangle was scored.
    ScoreAwarded {
        /// Scoring player.
        player: PlayerId,
        /// Top-left field cell of the rectangle.
        anchor: Cell,
        /// Field columns spanned.
        cols: usize,
        /// Field rows spanned.
        rows: usize,
        /// Points added (the enclosed area).
        points: u32,
        /// Score after the award.
        score: u32,
    },
    /// One more LED of the ladder is lit.
    ThresholdReached {
        /// Player whose ladder advanced.
        player: PlayerId,
        /// LED number, 1-8.
        led: u8,
    },
    /// A pickup appeared.
    PowerUpSpawned {
        /// Where it lies.
        cell: Cell,
    },
    /// A pickup vanished uncollected.
    PowerUpExpired {
        /// Where it lay.
        cell: Cell,
    },
    /// A player picked up a power-up.
    PowerUpCollected {
        /// Collecting player.
        player: PlayerId,
        /// Where it lay.
        cell: Cell,
    },
    /// A held power-up was triggered.
    BoostActivated {
        /// Boosted player.
        player: PlayerId,
    },
    /// A boost ran out.
    BoostEnded {
        /// Player that was boosted.
        player: PlayerId,
    },
    /// A held power-up lapsed unused.
    PowerUpLapsed {
        /// Player that held it.
        player: PlayerId,
    },
    /// A sensor feed was attached to a player.
    SensorAttached {
        /// Player now driven by a sensor.
        player: PlayerId,
    },
    /// The session is over.
    SessionEnded {
        /// Why it ended.
        reason: EndReason,
        /// Highest scorer, lowest id on ties.
        winner: Option<PlayerId>,
    },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::Occupancy { cell, owner: Some(p) } => {
                write!(f, "P{p} claims ({}, {})", cell.x, cell.y)
            }
            GameEvent::Occupancy { cell, owner: None } => {
                write!(f, "({}, {}) released", cell.x, cell.y)
            }
            GameEvent::ScoreAwarded {
                player,
                anchor,
                cols,
                rows,
                points,
                score,
            } => write!(
                f,
                "P{player} closes {cols}x{rows} at ({}, {}): +{points} = {score}",
                anchor.x, anchor.y
            ),
            GameEvent::ThresholdReached { player, led } => write!(f, "P{player} lights LED {led}"),
            GameEvent::PowerUpSpawned { cell } => write!(f, "power-up at ({}, {})", cell.x, cell.y),
            GameEvent::PowerUpExpired { cell } => {
                write!(f, "power-up at ({}, {}) expired", cell.x, cell.y)
            }
            GameEvent::PowerUpCollected { player, cell } => {
                write!(f, "P{player} collects power-up at ({}, {})", cell.x, cell.y)
            }
            GameEvent::BoostActivated { player } => write!(f, "P{player} boost on"),
            GameEvent::BoostEnded { player } => write!(f, "P{player} boost off"),
            GameEvent::PowerUpLapsed { player } => write!(f, "P{player} power-up lapsed"),
            GameEvent::SensorAttached { player } => write!(f, "P{player} sensor attached"),
            GameEvent::SessionEnded { reason, winner: Some(p) } => {
                write!(f, "session over ({reason}), winner P{p}")
            }
            GameEvent::SessionEnded { reason, winner: None } => {
                write!(f, "session over ({reason}), no winner")
            }
        }
    }
}
