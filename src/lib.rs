// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! LED-A-Gogo: a four-player territory-capture game core.
//!
//! Players steer tokens across a grid, claim the tiles they cross and score
//! by closing rectangles of their own territory. Input comes from the
//! keyboard or from motion-sensor boards over a serial link; each board also
//! shows its player's progress on an eight-LED ladder.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Session (clock, connector, LEDs)  │
//! ├──────────────────┬──────────────────┤
//! │    Game rules    │  Sensor pipeline │
//! │  (SessionState)  │ (receiver, mbox) │
//! ├──────────────────┴──────────────────┤
//! │     Config (serde) / Errors         │
//! └─────────────────────────────────────┘
//! ```
//!
//! The game layer is single-threaded and deterministic for a given seed and
//! input sequence. Only the sensor receivers and the connector run on their
//! own threads; they talk to the simulation through lock-free mailboxes.

pub mod config;
pub mod error;
pub mod game;
pub mod sensor;
pub mod session;

pub use config::GameConfig;
pub use error::{ConfigError, SensorError, SensorResult};

// Re-export key game types at crate root for convenience
pub use game::{Cell, Direction, EndReason, GameEvent, Player, PlayerId, SessionState};
pub use session::{Session, SimulationClock};
