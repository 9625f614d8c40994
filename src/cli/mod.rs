//! CLI command implementations for LED-A-Gogo.

pub(crate) mod probe;
pub(crate) mod run;
pub(crate) mod watch;

mod output;

use clap::{Args, ValueEnum};
use ledagogo::game::{PlayerId, MAX_PLAYERS};
use ledagogo::{ConfigError, GameConfig, SensorError};
use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Output format for the `run` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// One JSON object per line.
    Json,
}

/// Options shared by every command that starts a session.
#[derive(Args, Debug)]
pub(crate) struct SessionArgs {
    /// JSON config file (default: built-in defaults)
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// Sensor device for a player, as PLAYER=PATH (repeatable)
    #[arg(long = "port", value_name = "PLAYER=PATH", value_parser = parse_port)]
    pub(crate) ports: Vec<(PlayerId, String)>,

    /// Random seed (default: config value, then random)
    #[arg(short, long)]
    pub(crate) seed: Option<u64>,
}

impl SessionArgs {
    /// Load the config file and apply the command-line overrides.
    pub(crate) fn load_config(&self) -> Result<GameConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => GameConfig::load(path)?,
            None => GameConfig::default(),
        };
        for (player, path) in &self.ports {
            config.sensor.ports[usize::from(*player) - 1] = Some(path.clone());
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.validate()?;
        Ok(config)
    }
}

/// The configured seed, or one derived from the wall clock.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn resolve_seed(config: &GameConfig) -> u64 {
    config.seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    })
}

fn parse_port(value: &str) -> Result<(PlayerId, String), String> {
    let (player, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected PLAYER=PATH, got '{value}'"))?;
    let player: PlayerId = player
        .trim()
        .parse()
        .map_err(|_| format!("invalid player number '{player}'"))?;
    if player == 0 || usize::from(player) > MAX_PLAYERS {
        return Err(format!("player must be between 1 and {MAX_PLAYERS}"));
    }
    if path.is_empty() {
        return Err("device path must not be empty".to_string());
    }
    Ok((player, path.to_string()))
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<SensorError> for CliError {
    fn from(e: SensorError) -> Self {
        Self::new(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(e.to_string())
    }
}
