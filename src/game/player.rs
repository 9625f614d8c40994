//! Player state management.

use serde::Serialize;

use crate::config::MovementConfig;
use crate::game::{Cell, Entity, Hitbox, ScoreLadder, ScoreUpdate};
use crate::sensor::MailboxConsumer;

/// Unique identifier for a player (1-4).
pub type PlayerId = u8;

/// Facing of a player token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Towards row 0.
    Up,
    /// Towards higher columns.
    Right,
    /// Towards higher rows.
    Down,
    /// Towards column 0.
    Left,
}

impl Direction {
    /// Unit displacement in screen space.
    #[must_use]
    pub const fn unit(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Right => (1.0, 0.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
        }
    }

    /// Facing for a displacement: the dominant axis wins, x on ties.
    /// A zero vector has no facing.
    #[must_use]
    pub fn from_vector(dx: f32, dy: f32) -> Option<Self> {
        if dx.abs() <= f32::EPSILON && dy.abs() <= f32::EPSILON {
            return None;
        }
        Some(if dx.abs() >= dy.abs() {
            if dx > 0.0 { Direction::Right } else { Direction::Left }
        } else if dy > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        })
    }
}

/// Power-up lifecycle. Marks are elapsed whole seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PowerUpState {
    /// Nothing held.
    #[default]
    Idle,
    /// A collected power-up waiting to be triggered.
    Held {
        /// Second of collection.
        since: u32,
    },
    /// Boost running.
    Active {
        /// Second of activation.
        since: u32,
    },
}

/// Seconds left on a countdown started at `since`.
#[must_use]
pub(crate) const fn remaining(initial: u32, since: u32, now: u32) -> u32 {
    initial.saturating_sub(now.saturating_sub(since))
}

/// Latest key state for a keyboard-driven player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardInput {
    /// Direction key currently held, if any.
    pub held: Option<Direction>,
    /// Set by a boost key press, cleared when the tick reads it.
    pub boost_requested: bool,
}

impl KeyboardInput {
    /// Hold a direction key.
    pub fn press(&mut self, direction: Direction) {
        self.held = Some(direction);
    }

    /// Release all direction keys.
    pub fn release(&mut self) {
        self.held = None;
    }

    /// Register a boost key press.
    pub fn request_boost(&mut self) {
        self.boost_requested = true;
    }
}

/// Where a player's movement comes from.
#[derive(Debug, Default)]
pub enum InputSource {
    /// No input; the token stays put.
    #[default]
    Idle,
    /// Discrete key events.
    Keyboard(KeyboardInput),
    /// Orientation samples and boost commands from a sensor receiver.
    Sensor(MailboxConsumer),
}

/// State for a single player.
#[derive(Debug)]
pub struct Player {
    /// Unique identifier for this player.
    pub id: PlayerId,
    /// Starting cell.
    pub start: Cell,
    /// Current facing.
    pub direction: Direction,
    /// Accumulated score.
    pub score: u32,
    /// Number of lit threshold LEDs (0-8).
    pub active_leds: u8,
    /// Power-up lifecycle state.
    pub power: PowerUpState,
    /// Input feed.
    pub input: InputSource,
    hitbox: Hitbox,
}

impl Player {
    /// Create a player standing on `start` with the given token hitbox.
    #[must_use]
    pub fn new(id: PlayerId, start: Cell, hitbox: Hitbox) -> Self {
        Self {
            id,
            start,
            direction: Direction::Down,
            score: 0,
            active_leds: 0,
            power: PowerUpState::Idle,
            input: InputSource::Idle,
            hitbox,
        }
    }

    /// Current token hitbox.
    #[must_use]
    pub const fn hitbox(&self) -> Hitbox {
        self.hitbox
    }

    /// Top-left corner of the token in pixels.
    #[must_use]
    pub const fn position(&self) -> (f32, f32) {
        (self.hitbox.x, self.hitbox.y)
    }

    /// Move the token, returning the hitbox it had before.
    pub fn move_by(&mut self, dx: f32, dy: f32) -> Hitbox {
        let before = self.hitbox;
        self.hitbox = before.translated(dx, dy);
        before
    }

    /// Put the token back where it was before a blocked move.
    pub fn revert_to(&mut self, hitbox: Hitbox) {
        self.hitbox = hitbox;
    }

    /// This player as a collision entity.
    #[must_use]
    pub const fn entity(&self) -> Entity {
        Entity::Player {
            id: self.id,
            hitbox: self.hitbox,
        }
    }

    /// Whether a boost is running.
    #[must_use]
    pub const fn is_boosted(&self) -> bool {
        matches!(self.power, PowerUpState::Active { .. })
    }

    /// Whether the player is driven by a sensor receiver.
    #[must_use]
    pub const fn has_sensor(&self) -> bool {
        matches!(self.input, InputSource::Sensor(_))
    }

    /// Keyboard state, if this player is keyboard-driven.
    pub fn keyboard_mut(&mut self) -> Option<&mut KeyboardInput> {
        match &mut self.input {
            InputSource::Keyboard(keys) => Some(keys),
            _ => None,
        }
    }

    /// Consume this tick's boost trigger.
    ///
    /// A keyboard press is always consumed. A sensor command is only taken
    /// from the mailbox while a power-up is held, so a press made before
    /// collecting one fires on collection.
    pub fn take_boost_trigger(&mut self) -> bool {
        let held = matches!(self.power, PowerUpState::Held { .. });
        match &mut self.input {
            InputSource::Idle => false,
            InputSource::Keyboard(keys) => std::mem::take(&mut keys.boost_requested) && held,
            InputSource::Sensor(mailbox) => held && mailbox.take_command().is_some(),
        }
    }

    /// Displacement requested for this tick, updating the facing.
    ///
    /// Sensor players use the newest sample drained this tick, with the
    /// y axis flipped from sensor frame to screen frame. No sample means no
    /// movement.
    pub fn next_displacement(&mut self, movement: &MovementConfig) -> Option<(f32, f32)> {
        let boosted = self.is_boosted();
        let (dx, dy) = match &mut self.input {
            InputSource::Idle => return None,
            InputSource::Keyboard(keys) => {
                let direction = keys.held?;
                self.direction = direction;
                let speed = if boosted { movement.key_speed_boosted } else { movement.key_speed };
                let (ux, uy) = direction.unit();
                (ux * speed, uy * speed)
            }
            InputSource::Sensor(mailbox) => {
                let sample = mailbox.latest()?;
                let scale = if boosted {
                    movement.sensor_scale_boosted
                } else {
                    movement.sensor_scale
                };
                let (dx, dy) = (sample.x * scale, -sample.y * scale);
                if let Some(direction) = Direction::from_vector(dx, dy) {
                    self.direction = direction;
                }
                (dx, dy)
            }
        };
        Some((dx, dy))
    }

    /// Idle → Held.
    pub fn collect_power_up(&mut self, now: u32) -> bool {
        if self.power == PowerUpState::Idle {
            self.power = PowerUpState::Held { since: now };
            true
        } else {
            false
        }
    }

    /// Held → Active.
    pub fn activate_boost(&mut self, now: u32) -> bool {
        if matches!(self.power, PowerUpState::Held { .. }) {
            self.power = PowerUpState::Active { since: now };
            true
        } else {
            false
        }
    }

    /// Seconds left in the current power-up state, if any.
    #[must_use]
    pub const fn power_remaining(&self, now: u32, held_validity: u32, boost_duration: u32) -> Option<u32> {
        match self.power {
            PowerUpState::Idle => None,
            PowerUpState::Held { since } => Some(remaining(held_validity, since, now)),
            PowerUpState::Active { since } => Some(remaining(boost_duration, since, now)),
        }
    }

    /// Return to Idle once the running countdown reaches zero.
    ///
    /// Returns the state that lapsed, if any.
    pub fn expire_power_up(&mut self, now: u32, held_validity: u32, boost_duration: u32) -> Option<PowerUpState> {
        match self.power_remaining(now, held_validity, boost_duration) {
            Some(0) => Some(std::mem::take(&mut self.power)),
            _ => None,
        }
    }

    /// Add points and advance the LED ladder.
    pub fn award(&mut self, ladder: &ScoreLadder, points: u32) -> ScoreUpdate {
        let update = ladder.apply(self.score, self.active_leds, points);
        self.score = update.score;
        self.active_leds = update.active_leds;
        update
    }
}
