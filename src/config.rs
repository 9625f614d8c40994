//! Session configuration.
//!
//! Every tuned constant of the game lives here rather than in the systems
//! that use it. The defaults describe the stock board: a 26×15 field of
//! 24 px cells with an 8×8 playable territory at cell (9, 5), a 120 s time
//! budget, a 60 Hz tick and a 64-sample sensor buffer per player.
//!
//! A config file is plain JSON; every section and field is optional:
//!
//! ```json
//! {
//!   "timing": { "session_secs": 90 },
//!   "scoring": { "policy": "all_crossed" },
//!   "sensor": { "ports": ["/dev/rfcomm0", null, null, null] }
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::game::{LED_COUNT, MAX_PLAYERS, ThresholdPolicy};

/// Complete configuration for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Board geometry.
    pub board: BoardConfig,
    /// Tick rate and time budget.
    pub timing: TimingConfig,
    /// Displacement per tick for each input kind.
    pub movement: MovementConfig,
    /// Threshold ladder.
    pub scoring: ScoringConfig,
    /// Pickup cadence and power-up timers.
    pub power_ups: PowerUpConfig,
    /// Serial link parameters.
    pub sensor: SensorConfig,
    /// Seed for pickup placement (`None` = derive from the wall clock).
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::default(),
            timing: TimingConfig::default(),
            movement: MovementConfig::default(),
            scoring: ScoringConfig::default(),
            power_ups: PowerUpConfig::default(),
            sensor: SensorConfig::default(),
            seed: None,
        }
    }
}

/// Board geometry, in cells unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Columns of the whole field.
    pub cols: u16,
    /// Rows of the whole field.
    pub rows: u16,
    /// Top-left cell of the playable territory.
    pub playable_origin: [u16; 2],
    /// Width and height of the playable territory.
    pub playable_size: [u16; 2],
    /// Edge length of one cell in pixels.
    pub tile_size: f32,
    /// Minimum (height, width) of a closed rectangle.
    pub min_rectangle: [usize; 2],
    /// Starting cell of each player, indexed by `player_id - 1`.
    pub starting_cells: [[u16; 2]; MAX_PLAYERS],
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            cols: 26,
            rows: 15,
            playable_origin: [9, 5],
            playable_size: [8, 8],
            tile_size: 24.0,
            min_rectangle: [3, 3],
            starting_cells: [[10, 6], [15, 6], [10, 11], [15, 11]],
        }
    }
}

/// Tick rate and session time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Wall-clock seconds before the session force-terminates.
    pub session_secs: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            session_secs: 120,
        }
    }
}

impl TimingConfig {
    /// Duration of one tick.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_rate.max(1)
    }
}

/// Displacement factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Pixels per tick for a held direction key.
    pub key_speed: f32,
    /// Pixels per tick for a held direction key while boosted.
    pub key_speed_boosted: f32,
    /// Scale applied to orientation samples.
    pub sensor_scale: f32,
    /// Scale applied to orientation samples while boosted.
    pub sensor_scale_boosted: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            key_speed: 1.0,
            key_speed_boosted: 2.0,
            sensor_scale: 7.5,
            sensor_scale_boosted: 15.0,
        }
    }
}

/// Threshold ladder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Increasing score values, one per LED. The last one is the score cap.
    pub thresholds: [u32; LED_COUNT],
    /// How many LEDs a single award may light.
    pub policy: ThresholdPolicy,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            thresholds: [50, 150, 300, 500, 750, 1100, 1500, 1950],
            policy: ThresholdPolicy::SingleStep,
        }
    }
}

/// Pickup cadence and power-up timers, all in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerUpConfig {
    /// A pickup spawns on every multiple of this many elapsed seconds.
    pub spawn_interval_secs: u32,
    /// How long an uncollected pickup stays on the board.
    pub pickup_validity_secs: u32,
    /// How long a collected power-up can be held before it lapses.
    pub held_validity_secs: u32,
    /// How long an activated boost lasts.
    pub boost_duration_secs: u32,
}

impl Default for PowerUpConfig {
    fn default() -> Self {
        Self {
            spawn_interval_secs: 15,
            pickup_validity_secs: 7,
            held_validity_secs: 15,
            boost_duration_secs: 5,
        }
    }
}

/// Serial link parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Serial device for each player, indexed by `player_id - 1`.
    pub ports: [Option<String>; MAX_PLAYERS],
    /// Link speed.
    pub baud_rate: u32,
    /// Timeout used when opening a device.
    pub connect_timeout_ms: u64,
    /// Capacity of each player's orientation buffer.
    pub buffer_capacity: usize,
    /// Receiver sleep when no bytes are waiting.
    pub poll_interval_ms: u64,
    /// Delay before the connector retries a port that failed to open.
    pub reconnect_backoff_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            ports: [None, None, None, None],
            baud_rate: 9600,
            connect_timeout_ms: 2000,
            buffer_capacity: 64,
            poll_interval_ms: 10,
            reconnect_backoff_ms: 1000,
        }
    }
}

impl SensorConfig {
    /// Timeout used when opening a device.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Receiver sleep when no bytes are waiting.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Connector back-off after a failed open.
    #[must_use]
    pub const fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }
}

impl GameConfig {
    /// Load and validate a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`GameConfig::validate`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let board = &self.board;
        let [ox, oy] = board.playable_origin.map(u32::from);
        let [w, h] = board.playable_size.map(u32::from);
        let (cols, rows) = (u32::from(board.cols), u32::from(board.rows));

        if w == 0 || h == 0 {
            return Err(invalid("playable territory must not be empty"));
        }
        // The border ring needs one cell on every side.
        if ox == 0 || oy == 0 || ox + w >= cols || oy + h >= rows {
            return Err(invalid(format!(
                "playable territory {w}x{h} at ({ox},{oy}) leaves no border inside a {cols}x{rows} board"
            )));
        }
        if !(board.tile_size.is_finite() && board.tile_size > 2.0) {
            return Err(invalid("tile_size must be a finite value above 2"));
        }
        if board.min_rectangle.contains(&0) {
            return Err(invalid("min_rectangle dimensions must be at least 1"));
        }
        for (i, cell) in board.starting_cells.iter().enumerate() {
            let [x, y] = cell.map(u32::from);
            if x < ox || y < oy || x >= ox + w || y >= oy + h {
                return Err(invalid(format!(
                    "starting cell ({x},{y}) of player {} is outside the playable territory",
                    i + 1
                )));
            }
            if let Some(other) = board.starting_cells[..i].iter().position(|c| c == cell) {
                return Err(invalid(format!(
                    "players {} and {} share starting cell ({x},{y})",
                    other + 1,
                    i + 1
                )));
            }
        }

        if self.timing.tick_rate == 0 {
            return Err(invalid("tick_rate must be positive"));
        }

        let m = &self.movement;
        for speed in [
            m.key_speed,
            m.key_speed_boosted,
            m.sensor_scale,
            m.sensor_scale_boosted,
        ] {
            if !(speed.is_finite() && speed >= 0.0) {
                return Err(invalid("movement factors must be finite and non-negative"));
            }
        }

        let thresholds = &self.scoring.thresholds;
        if thresholds[0] == 0 || thresholds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(invalid("score thresholds must be positive and strictly increasing"));
        }

        if self.power_ups.spawn_interval_secs == 0 {
            return Err(invalid("spawn_interval_secs must be positive"));
        }

        if self.sensor.buffer_capacity == 0 {
            return Err(invalid("sensor buffer_capacity must be positive"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timing.tick_rate, 60);
        assert_eq!(config.sensor.buffer_capacity, 64);
        assert_eq!(config.scoring.thresholds[LED_COUNT - 1], 1950);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "timing": { "session_secs": 30 }, "scoring": { "policy": "all_crossed" } }"#;
        let config: GameConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.timing.session_secs, 30);
        assert_eq!(config.timing.tick_rate, 60);
        assert_eq!(config.scoring.policy, ThresholdPolicy::AllCrossed);
        assert_eq!(config.board, BoardConfig::default());
    }

    #[test]
    fn test_rejects_territory_without_border() {
        let mut config = GameConfig::default();
        config.board.playable_origin = [0, 5];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_unordered_thresholds() {
        let mut config = GameConfig::default();
        config.scoring.thresholds[3] = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_start_outside_territory() {
        let mut config = GameConfig::default();
        config.board.starting_cells[2] = [1, 1];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("player 3"));
    }

    #[test]
    fn test_rejects_shared_starting_cells() {
        let mut config = GameConfig::default();
        config.board.starting_cells = [[10, 6], [10, 6], [10, 11], [15, 11]];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("players 1 and 2"));
    }

    #[test]
    fn test_huge_territory_does_not_overflow() {
        let mut config = GameConfig::default();
        config.board.playable_origin = [u16::MAX, u16::MAX];
        config.board.playable_size = [u16::MAX, u16::MAX];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_tick_interval() {
        let timing = TimingConfig {
            tick_rate: 50,
            session_secs: 10,
        };
        assert_eq!(timing.tick_interval(), Duration::from_millis(20));
    }
}
